//! Per-round task scoring.
//!
//! With a trained model every task is scored by one batched inference call
//! against a single model snapshot. Without one, each task draws an
//! independent score from a narrow band around 0.5 so that the initial order
//! is arbitrary but never extreme.

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ModelError;
use crate::features::FeatureExtractor;
use crate::model::PriorityModel;
use crate::task::Task;

/// Fallback band and randomness source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_fallback_min")]
    pub fallback_min: f64,
    #[serde(default = "default_fallback_max")]
    pub fallback_max: f64,
    /// Seed for fallback scores (None = entropy)
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_fallback_min() -> f64 {
    0.25
}
fn default_fallback_max() -> f64 {
    0.75
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            fallback_min: default_fallback_min(),
            fallback_max: default_fallback_max(),
            seed: None,
        }
    }
}

/// Source of uniform samples in `[0, 1)` for fallback scores.
pub trait UnitSampler: Send {
    fn sample_unit(&mut self) -> f64;
}

impl<R: RngCore + Send> UnitSampler for R {
    fn sample_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Where a round's scores came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Model,
    Fallback,
}

/// A task annotated with its score for one round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTask {
    /// Position of the task in the input list
    pub index: usize,
    pub task: Task,
    pub score: f64,
}

pub struct ScoringService {
    config: ScoringConfig,
    sampler: Box<dyn UnitSampler>,
}

impl std::fmt::Debug for ScoringService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ScoringService {
    pub fn new(config: ScoringConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self::with_sampler(config, Box::new(rng))
    }

    pub fn with_sampler(config: ScoringConfig, sampler: Box<dyn UnitSampler>) -> Self {
        Self { config, sampler }
    }

    /// Score `tasks` in input order.
    pub fn score(
        &mut self,
        tasks: &[Task],
        model: &PriorityModel,
    ) -> Result<(Vec<ScoredTask>, ScoreSource), ModelError> {
        let (scores, source) = if model.is_trained() {
            let features = FeatureExtractor::extract_all(tasks);
            (model.predict_batch(&features)?, ScoreSource::Model)
        } else {
            debug!(tasks = tasks.len(), "model untrained, using fallback scores");
            let scores = tasks.iter().map(|_| self.fallback_score()).collect();
            (scores, ScoreSource::Fallback)
        };

        let scored = tasks
            .iter()
            .zip(scores)
            .enumerate()
            .map(|(index, (task, score))| ScoredTask {
                index,
                task: task.clone(),
                score,
            })
            .collect();
        Ok((scored, source))
    }

    fn fallback_score(&mut self) -> f64 {
        let (lo, hi) = (self.config.fallback_min, self.config.fallback_max);
        let u = self.sampler.sample_unit().clamp(0.0, 1.0);
        lo + u * (hi - lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Record;
    use crate::model::TrainingConfig;
    use crate::task::TaskDraft;

    struct Sequence(Vec<f64>, usize);

    impl UnitSampler for Sequence {
        fn sample_unit(&mut self) -> f64 {
            let v = self.0[self.1 % self.0.len()];
            self.1 += 1;
            v
        }
    }

    fn tasks(n: usize) -> Vec<Task> {
        (0..n)
            .map(|i| {
                TaskDraft::new(format!("task {i}"))
                    .with_duration(10.0 * (i + 1) as f64)
                    .validate()
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn fallback_uses_injected_sequence() {
        let mut svc = ScoringService::with_sampler(
            ScoringConfig::default(),
            Box::new(Sequence(vec![0.0, 0.5, 1.0], 0)),
        );
        let (scored, source) = svc.score(&tasks(3), &PriorityModel::Untrained).unwrap();
        assert_eq!(source, ScoreSource::Fallback);
        let scores: Vec<f64> = scored.iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![0.25, 0.5, 0.75]);
    }

    #[test]
    fn fallback_stays_in_band() {
        let mut svc = ScoringService::new(ScoringConfig {
            seed: Some(99),
            ..Default::default()
        });
        let (scored, _) = svc.score(&tasks(200), &PriorityModel::Untrained).unwrap();
        assert!(scored.iter().all(|s| (0.25..=0.75).contains(&s.score)));
    }

    #[test]
    fn output_order_matches_input() {
        let input = tasks(4);
        let mut svc = ScoringService::new(ScoringConfig::default());
        let (scored, _) = svc.score(&input, &PriorityModel::Untrained).unwrap();
        for (i, s) in scored.iter().enumerate() {
            assert_eq!(s.index, i);
            assert_eq!(s.task, input[i]);
        }
    }

    #[test]
    fn trained_model_scores_match_predictions() {
        let input = tasks(3);
        let mut model = PriorityModel::Untrained;
        model.train(
            &[Record::feedback(&input[0], 1, 12.0)],
            &TrainingConfig {
                seed: Some(1),
                ..Default::default()
            },
        );

        let mut svc = ScoringService::with_sampler(
            ScoringConfig::default(),
            Box::new(Sequence(vec![0.0], 0)),
        );
        let (scored, source) = svc.score(&input, &model).unwrap();
        assert_eq!(source, ScoreSource::Model);
        for s in &scored {
            let expected = model.predict(&FeatureExtractor::extract(&s.task)).unwrap();
            assert_eq!(s.score, expected);
        }
    }

    #[test]
    fn empty_task_list_scores_nothing() {
        let mut svc = ScoringService::new(ScoringConfig::default());
        let (scored, _) = svc.score(&[], &PriorityModel::Untrained).unwrap();
        assert!(scored.is_empty());
    }
}
