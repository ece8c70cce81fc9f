//! Process-wide model handle.
//!
//! Readers take a cheap `Arc` snapshot of the current state. At most one
//! training runs at a time: later requests either wait on the gate or are
//! rejected, depending on [`ContentionPolicy`].
//!
//! The history is append-only, so the number of records a training saw
//! identifies how recent it is. A finished run is installed only if no run
//! over a longer history has been installed already; whichever order the
//! requests reach the gate in, the model never goes back to older data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use super::{PriorityModel, TrainOutcome, TrainingConfig};
use crate::error::ModelError;
use crate::history::Record;

/// What to do with a training request while another one is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentionPolicy {
    /// Wait for the running training, then run
    #[default]
    Queue,
    /// Fail immediately with `TrainingInProgress`
    Reject,
}

/// Outcome of one `retrain` request and the model state it produced.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub outcome: TrainOutcome,
    /// The freshly fitted model, even when a newer one was installed first.
    /// On `Skipped`, the state that was current when the run finished.
    pub model: Arc<PriorityModel>,
}

#[derive(Debug, Default)]
pub struct SharedModel {
    current: RwLock<Arc<PriorityModel>>,
    gate: Mutex<()>,
    /// History length behind the installed model
    installed: AtomicU64,
}

impl SharedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently installed state.
    pub async fn snapshot(&self) -> Arc<PriorityModel> {
        Arc::clone(&*self.current.read().await)
    }

    /// Full retrain on the blocking pool.
    ///
    /// `records` must be the whole history as of the request; its length is
    /// the run's version.
    pub async fn retrain(
        &self,
        records: Vec<Record>,
        config: &TrainingConfig,
        policy: ContentionPolicy,
    ) -> Result<TrainingRun, ModelError> {
        let version = records.len() as u64;

        let _guard = match policy {
            ContentionPolicy::Queue => self.gate.lock().await,
            ContentionPolicy::Reject => self.gate.try_lock().map_err(|_| {
                warn!(version, "training request rejected, another run is in flight");
                ModelError::TrainingInProgress
            })?,
        };

        let config = config.clone();
        let fitted =
            tokio::task::spawn_blocking(move || PriorityModel::fit(&records, &config)).await?;

        let Some(fitted) = fitted else {
            return Ok(TrainingRun {
                outcome: TrainOutcome::Skipped,
                model: self.snapshot().await,
            });
        };
        let trained = TrainOutcome::Trained {
            examples: fitted.examples(),
            final_loss: fitted.final_loss(),
        };
        let model = Arc::new(PriorityModel::Trained(fitted));
        let outcome = if self.install(version, Arc::clone(&model)).await {
            trained
        } else {
            TrainOutcome::Discarded
        };
        Ok(TrainingRun { outcome, model })
    }

    async fn install(&self, version: u64, model: Arc<PriorityModel>) -> bool {
        let mut current = self.current.write().await;
        let installed = self.installed.load(Ordering::SeqCst);
        if version < installed {
            debug!(version, installed, "discarding stale training result");
            return false;
        }
        *current = model;
        self.installed.store(version, Ordering::SeqCst);
        true
    }

    #[cfg(test)]
    pub(crate) async fn hold_gate_for_tests(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.gate.lock().await
    }
}
