//! Task → numeric feature vector.
//!
//! - f1: `(10 - subjective) / 10`
//! - f2: `(10 - objective) / 10`
//! - f3: `ln(1 + duration) / ln(241)`, so a 240-minute task maps to 1.0
//!
//! f1 and f2 stay in [0, 1]. f3 is never negative and exceeds 1 only for
//! durations above 240 minutes; those values are passed through unclamped.

use crate::task::{Task, DIFFICULTY_RANGE};

/// Number of features produced per task.
pub const FEATURE_COUNT: usize = 3;

/// Duration that maps to a feature value of exactly 1.0.
pub const DURATION_ANCHOR_MINUTES: f64 = 240.0;

pub type FeatureVector = [f64; FEATURE_COUNT];

/// Pure feature extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn extract(task: &Task) -> FeatureVector {
        [
            difficulty_feature(task.subjective_difficulty()),
            difficulty_feature(task.objective_difficulty()),
            duration_feature(task.duration_minutes()),
        ]
    }

    pub fn extract_all<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<FeatureVector> {
        tasks.into_iter().map(Self::extract).collect()
    }
}

/// Out-of-range difficulty counts as maximum effort (10), i.e. 0.0.
fn difficulty_feature(difficulty: u8) -> f64 {
    let d = i64::from(difficulty);
    if !DIFFICULTY_RANGE.contains(&d) {
        return 0.0;
    }
    (10.0 - d as f64) / 10.0
}

fn duration_feature(minutes: f64) -> f64 {
    let minutes = if minutes.is_finite() { minutes.max(0.0) } else { 0.0 };
    (1.0 + minutes).ln() / (1.0 + DURATION_ANCHOR_MINUTES).ln()
}
