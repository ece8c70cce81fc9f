//! Ordering and proportional one-day timeline layout.
//!
//! Tasks are ordered by descending score with a stable sort, so equal scores
//! keep their input order. The layout splits the unit interval in proportion
//! to each task's duration:
//!
//! ```text
//! offset_i = sum(duration_j, j < i) / total
//! width_i  = duration_i / total
//! ```

use serde::{Deserialize, Serialize};

use crate::scoring::ScoredTask;

/// Layout options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Duration used for zero-minute tasks. `None` lays them out as zero
    /// width; an all-zero schedule then collapses to offset 0 everywhere.
    #[serde(default = "default_zero_duration_fallback")]
    pub zero_duration_fallback: Option<f64>,
}

fn default_zero_duration_fallback() -> Option<f64> {
    Some(crate::task::DEFAULT_DURATION_MINUTES)
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            zero_duration_fallback: default_zero_duration_fallback(),
        }
    }
}

/// Scored tasks in execution order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    pub entries: Vec<ScoredTask>,
}

/// One task's slot on the timeline, as fractions of the whole day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSegment {
    pub title: String,
    pub score: f64,
    /// Minutes that went into the proportion
    pub duration_minutes: f64,
    pub offset: f64,
    pub width: f64,
    /// Presentation hint: `200 - score * 120` degrees
    pub hue: i32,
}

impl TimelineSegment {
    pub fn end(&self) -> f64 {
        self.offset + self.width
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleBuilder {
    config: LayoutConfig,
}

impl ScheduleBuilder {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Order by descending score; ties keep input order.
    pub fn build(&self, mut scored: Vec<ScoredTask>) -> Schedule {
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        Schedule { entries: scored }
    }

    pub fn layout(&self, schedule: &Schedule) -> Vec<TimelineSegment> {
        let durations: Vec<f64> = schedule
            .entries
            .iter()
            .map(|e| self.effective_duration(e.task.duration_minutes()))
            .collect();
        let total: f64 = durations.iter().sum();

        let mut elapsed = 0.0;
        schedule
            .entries
            .iter()
            .zip(durations)
            .map(|(entry, duration)| {
                let (offset, width) = if total > 0.0 {
                    (elapsed / total, duration / total)
                } else {
                    (0.0, 0.0)
                };
                elapsed += duration;
                TimelineSegment {
                    title: entry.task.title().to_string(),
                    score: entry.score,
                    duration_minutes: duration,
                    offset,
                    width,
                    hue: priority_hue(entry.score),
                }
            })
            .collect()
    }

    fn effective_duration(&self, minutes: f64) -> f64 {
        let minutes = if minutes.is_finite() { minutes.max(0.0) } else { 0.0 };
        match self.config.zero_duration_fallback {
            Some(fallback) if minutes == 0.0 => fallback.max(0.0),
            _ => minutes,
        }
    }
}

/// Warmer hue for higher scores.
pub fn priority_hue(score: f64) -> i32 {
    (200.0 - score * 120.0).round() as i32
}
