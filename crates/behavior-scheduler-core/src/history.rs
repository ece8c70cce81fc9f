//! Append-only outcome history.
//!
//! A [`Record`] pairs a value copy of a task with what was observed about it.
//! Records are only ever appended; the full log is the training corpus.

use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Why a record was appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOrigin {
    /// Placeholder written when the task was first added
    Added,
    /// Placeholder written for every task each time a schedule is generated
    Scheduled,
    /// Real outcome submitted by the user
    Feedback,
}

impl RecordOrigin {
    pub fn is_placeholder(&self) -> bool {
        !matches!(self, RecordOrigin::Feedback)
    }
}

/// An immutable historical fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRecord", rename_all = "camelCase")]
pub struct Record {
    /// Snapshot of the task when the record was written. Absent only in
    /// hand-edited or legacy snapshots; such records are never trained on.
    pub task: Option<Task>,
    /// 0 = unknown / not completed, anything else = completed.
    pub completed: u8,
    /// Observed duration in minutes, when reported.
    pub actual_duration: Option<f64>,
    /// Score the task carried in the round that wrote this record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub origin: RecordOrigin,
}

impl Record {
    /// Placeholder written when a task is added.
    pub fn added(task: &Task) -> Self {
        Self {
            task: Some(task.clone()),
            completed: 0,
            actual_duration: None,
            score: None,
            origin: RecordOrigin::Added,
        }
    }

    /// Placeholder written for a task included in a generated schedule.
    pub fn scheduled(task: &Task, score: f64) -> Self {
        Self {
            task: Some(task.clone()),
            completed: 0,
            actual_duration: None,
            score: Some(score),
            origin: RecordOrigin::Scheduled,
        }
    }

    /// Real outcome reported by the user.
    pub fn feedback(task: &Task, completed: u8, actual_duration: f64) -> Self {
        Self {
            task: Some(task.clone()),
            completed,
            actual_duration: Some(actual_duration),
            score: None,
            origin: RecordOrigin::Feedback,
        }
    }

    /// Binary training label.
    pub fn label(&self) -> f64 {
        if self.completed != 0 {
            1.0
        } else {
            0.0
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    #[serde(default)]
    task: Option<Task>,
    #[serde(default)]
    completed: Option<RawCompleted>,
    #[serde(default)]
    actual_duration: Option<f64>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    origin: Option<RecordOrigin>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCompleted {
    Flag(bool),
    Level(f64),
}

impl From<RawRecord> for Record {
    fn from(raw: RawRecord) -> Self {
        let completed = match raw.completed {
            None => 0,
            Some(RawCompleted::Flag(flag)) => u8::from(flag),
            Some(RawCompleted::Level(level)) if level.is_finite() => {
                level.round().clamp(0.0, u8::MAX as f64) as u8
            }
            Some(RawCompleted::Level(_)) => 0,
        };
        let origin = raw.origin.unwrap_or(if raw.actual_duration.is_some() {
            RecordOrigin::Feedback
        } else {
            RecordOrigin::Added
        });
        Self {
            task: raw.task,
            completed,
            actual_duration: raw.actual_duration,
            score: raw.score,
            origin,
        }
    }
}

/// The append-only record log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    records: Vec<Record>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn append(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = Record>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }
}
