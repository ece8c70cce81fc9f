//! # Behavior Scheduler Core Library
//!
//! This library orders a personal task list by predicted likelihood of
//! completion and lays the result out on a proportional one-day timeline. A
//! small neural network learns from the user's own outcome history; every
//! reported outcome triggers a full retrain. A standalone CLI binary drives
//! the same engine.
//!
//! ## Architecture
//!
//! - **Features**: Task attributes normalised into a 3-component vector
//! - **Model**: Feed-forward network (3 → 8 → 4 → 1) with an `Untrained` /
//!   `Trained` lifecycle, shared across requests through [`SharedModel`]
//! - **Scoring**: Batched model inference, or a seeded fallback band before
//!   any training
//! - **Schedule**: Stable descending order and proportional timeline segments
//! - **Storage**: TOML configuration and a JSON snapshot of tasks and history
//!
//! ## Key Components
//!
//! - [`Engine`]: Request/response surface (add, delete, generate, feedback)
//! - [`PriorityModel`]: Completion-likelihood predictor
//! - [`ScheduleBuilder`]: Ordering and layout
//! - [`Config`]: Configuration management
//! - [`SnapshotStore`]: Snapshot persistence for collaborators

pub mod engine;
pub mod error;
pub mod features;
pub mod feedback;
pub mod history;
pub mod model;
pub mod schedule;
pub mod scoring;
pub mod storage;
pub mod task;

pub use engine::{Engine, EngineConfig, GeneratedSchedule, Snapshot};
pub use error::{ConfigError, CoreError, ModelError, StorageError, ValidationError};
pub use features::{FeatureExtractor, FeatureVector};
pub use feedback::{Feedback, FeedbackReceipt, FeedbackRecorder};
pub use history::{History, Record, RecordOrigin};
pub use model::{
    ContentionPolicy, ModelStatus, PriorityModel, SharedModel, TrainOutcome, TrainingConfig,
    TrainingRun,
};
pub use schedule::{LayoutConfig, Schedule, ScheduleBuilder, TimelineSegment};
pub use scoring::{ScoreSource, ScoredTask, ScoringConfig, ScoringService, UnitSampler};
pub use storage::{data_dir, Config, SnapshotStore};
pub use task::{Task, TaskDraft};
