//! Completion-likelihood model.
//!
//! [`PriorityModel`] is either `Untrained` or `Trained`. A training run always
//! starts from freshly initialised weights and fresh optimizer state and walks
//! the whole history; there is no incremental update. An empty training set is
//! a no-op that keeps the previous state.
//!
//! [`SharedModel`] wraps the state for concurrent use by the engine.

mod network;
mod optimizer;
mod shared;

pub use network::{Activation, Dense, Network};
pub use shared::{ContentionPolicy, SharedModel, TrainingRun};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ModelError;
use crate::features::{FeatureExtractor, FeatureVector, FEATURE_COUNT};
use crate::history::Record;
use optimizer::Adam;

/// Training hyper-parameters and data policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Passes over the full history
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// Examples per optimizer step
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Adam step size
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Seed for weight init and shuffling (None = entropy)
    #[serde(default)]
    pub seed: Option<u64>,
    /// Train on `added`/`scheduled` placeholder records too.
    ///
    /// Placeholders are labelled "not completed", so every generated schedule
    /// adds negative weight to the tasks in it.
    #[serde(default = "default_true")]
    pub include_placeholders: bool,
}

fn default_epochs() -> usize {
    15
}
fn default_batch_size() -> usize {
    8
}
fn default_learning_rate() -> f64 {
    0.001
}
fn default_true() -> bool {
    true
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            seed: None,
            include_placeholders: true,
        }
    }
}

/// Parameters produced by a successful training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    network: Network,
    examples: usize,
    final_loss: f64,
}

impl TrainedModel {
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Number of records the model was fitted on.
    pub fn examples(&self) -> usize {
        self.examples
    }

    /// Mean cross-entropy over the training set after the last epoch.
    pub fn final_loss(&self) -> f64 {
        self.final_loss
    }
}

/// Model lifecycle state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PriorityModel {
    #[default]
    Untrained,
    Trained(TrainedModel),
}

/// Result of a `train()` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrainOutcome {
    /// New parameters were installed
    Trained { examples: usize, final_loss: f64 },
    /// No usable records; previous state kept
    Skipped,
    /// Superseded by a newer completed training; result dropped
    Discarded,
    /// Another training was running and the policy rejects waiting
    Refused,
}

/// Serializable summary of the model state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub trained: bool,
    pub examples: Option<usize>,
    pub final_loss: Option<f64>,
}

impl PriorityModel {
    pub fn is_trained(&self) -> bool {
        matches!(self, PriorityModel::Trained(_))
    }

    pub fn status(&self) -> ModelStatus {
        match self {
            PriorityModel::Untrained => ModelStatus {
                trained: false,
                examples: None,
                final_loss: None,
            },
            PriorityModel::Trained(m) => ModelStatus {
                trained: true,
                examples: Some(m.examples),
                final_loss: Some(m.final_loss),
            },
        }
    }

    /// Retrain from scratch over `records`, replacing the current state.
    ///
    /// Leaves the state untouched when no record is usable.
    pub fn train(&mut self, records: &[Record], config: &TrainingConfig) -> TrainOutcome {
        match Self::fit(records, config) {
            Some(model) => {
                let outcome = TrainOutcome::Trained {
                    examples: model.examples,
                    final_loss: model.final_loss,
                };
                *self = PriorityModel::Trained(model);
                outcome
            }
            None => TrainOutcome::Skipped,
        }
    }

    /// Fit a fresh network. `None` when the filtered history is empty.
    pub fn fit(records: &[Record], config: &TrainingConfig) -> Option<TrainedModel> {
        let examples = training_examples(records, config.include_placeholders);
        if examples.is_empty() {
            debug!(records = records.len(), "no usable records, training skipped");
            return None;
        }

        let mut rng = match config.seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        let mut network = Network::priority(FEATURE_COUNT, &mut rng);
        let mut adam = Adam::new(&network, config.learning_rate);
        let batch_size = config.batch_size.max(1);
        let mut order: Vec<usize> = (0..examples.len()).collect();

        for epoch in 0..config.epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;
            let mut batches = 0usize;
            for chunk in order.chunks(batch_size) {
                let batch: Vec<&(Vec<f64>, f64)> = chunk.iter().map(|&i| &examples[i]).collect();
                let (grads, loss) = network.gradients(&batch);
                adam.apply(&mut network, &grads);
                epoch_loss += loss;
                batches += 1;
            }
            debug!(epoch, loss = epoch_loss / batches.max(1) as f64, "epoch finished");
        }

        let final_loss = network.loss(&examples);
        info!(examples = examples.len(), final_loss, "priority model trained");
        Some(TrainedModel {
            network,
            examples: examples.len(),
            final_loss,
        })
    }

    /// Completion probability for one feature vector.
    pub fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        let PriorityModel::Trained(model) = self else {
            return Err(ModelError::Untrained);
        };
        let expected = model.network.input_width();
        if features.len() != expected {
            return Err(ModelError::FeatureMismatch {
                expected,
                actual: features.len(),
            });
        }
        Ok(model.network.forward(features))
    }

    /// Completion probabilities for a batch, all against this same state.
    pub fn predict_batch(&self, batch: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        batch.iter().map(|f| self.predict(f)).collect()
    }
}

/// `(features, label)` pairs for every record that carries a task snapshot.
pub fn training_examples(records: &[Record], include_placeholders: bool) -> Vec<(Vec<f64>, f64)> {
    records
        .iter()
        .filter(|r| include_placeholders || !r.origin.is_placeholder())
        .filter_map(|r| {
            r.task
                .as_ref()
                .map(|t| (FeatureExtractor::extract(t).to_vec(), r.label()))
        })
        .collect()
}
