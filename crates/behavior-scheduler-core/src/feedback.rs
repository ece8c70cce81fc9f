//! Real-world outcome reporting.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::engine::Snapshot;
use crate::error::{ModelError, Result, ValidationError};
use crate::history::Record;
use crate::model::{ContentionPolicy, SharedModel, TrainOutcome, TrainingConfig};
use crate::task::{validate_duration, Task};

/// An outcome report for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub task_index: usize,
    /// Defaults to the task's estimated duration
    #[serde(default)]
    pub actual_duration: Option<f64>,
    /// 0 = not completed
    pub completed: u8,
}

impl Feedback {
    pub fn new(task_index: usize, completed: u8) -> Self {
        Self {
            task_index,
            actual_duration: None,
            completed,
        }
    }

    pub fn with_actual_duration(mut self, minutes: f64) -> Self {
        self.actual_duration = Some(minutes);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackReceipt {
    pub record: Record,
    pub history_len: usize,
    pub training: TrainOutcome,
}

/// Appends outcome records and retrains before returning.
#[derive(Debug, Clone)]
pub struct FeedbackRecorder {
    model: Arc<SharedModel>,
    training: TrainingConfig,
    policy: ContentionPolicy,
}

impl FeedbackRecorder {
    pub fn new(model: Arc<SharedModel>, training: TrainingConfig, policy: ContentionPolicy) -> Self {
        Self {
            model,
            training,
            policy,
        }
    }

    /// Build the outcome record without touching any state.
    pub fn outcome_record(tasks: &[Task], feedback: &Feedback) -> Result<Record, ValidationError> {
        let task = tasks
            .get(feedback.task_index)
            .ok_or(ValidationError::UnknownTask {
                index: feedback.task_index,
                len: tasks.len(),
            })?;
        let actual = match feedback.actual_duration {
            Some(minutes) => validate_duration("actual_duration", minutes)?,
            None => task.duration_minutes(),
        };
        Ok(Record::feedback(task, feedback.completed, actual))
    }

    /// Validate, append, then retrain over the whole updated history.
    ///
    /// Under [`ContentionPolicy::Reject`] a busy model does not fail the call:
    /// the record stays in the history and the receipt reports `Refused`.
    pub async fn record(&self, state: &RwLock<Snapshot>, feedback: Feedback) -> Result<FeedbackReceipt> {
        let (record, records) = {
            let mut snapshot = state.write().await;
            let record = Self::outcome_record(&snapshot.tasks, &feedback)?;
            snapshot.records.append(record.clone());
            (record, snapshot.records.records().to_vec())
        };
        let history_len = records.len();

        let training = match self.model.retrain(records, &self.training, self.policy).await {
            Ok(run) => run.outcome,
            Err(ModelError::TrainingInProgress) => {
                warn!(history_len, "retrain refused, record kept for the next training");
                TrainOutcome::Refused
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            task_index = feedback.task_index,
            completed = feedback.completed,
            history_len,
            "feedback recorded"
        );

        Ok(FeedbackReceipt {
            record,
            history_len,
            training,
        })
    }
}
