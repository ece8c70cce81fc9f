//! Request/response engine.
//!
//! The engine owns the in-memory snapshot (tasks plus history) and the shared
//! model. Every user action is one async method; a successful mutation leaves
//! an updated snapshot that the caller is expected to persist. Failed requests
//! leave the snapshot and the model untouched.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{Result, ValidationError};
use crate::features::FeatureExtractor;
use crate::feedback::{Feedback, FeedbackReceipt, FeedbackRecorder};
use crate::history::{History, Record};
use crate::model::{ContentionPolicy, ModelStatus, SharedModel, TrainOutcome, TrainingConfig};
use crate::schedule::{Schedule, ScheduleBuilder, TimelineSegment};
use crate::scoring::{ScoreSource, ScoredTask, ScoringService};
use crate::storage::Config;
use crate::task::{Task, TaskDraft};

/// The persisted state: active tasks and the outcome log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub records: History,
}

/// Engine-level options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Behaviour when a training request meets a running one
    #[serde(default)]
    pub contention: ContentionPolicy,
}

/// Result of one `generate_schedule` round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedSchedule {
    pub schedule: Schedule,
    pub segments: Vec<TimelineSegment>,
    pub source: ScoreSource,
    /// Training run just before scoring, if one was needed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainOutcome>,
}

#[derive(Debug)]
pub struct Engine {
    state: RwLock<Snapshot>,
    model: Arc<SharedModel>,
    scoring: Mutex<ScoringService>,
    builder: ScheduleBuilder,
    recorder: FeedbackRecorder,
    training: TrainingConfig,
    contention: ContentionPolicy,
}

impl Engine {
    pub fn new(snapshot: Snapshot, config: &Config) -> Self {
        Self::with_scoring(snapshot, config, ScoringService::new(config.scoring.clone()))
    }

    /// Build with a caller-supplied scoring service, e.g. one with a fixed sampler.
    pub fn with_scoring(snapshot: Snapshot, config: &Config, scoring: ScoringService) -> Self {
        let model = Arc::new(SharedModel::new());
        let contention = config.engine.contention;
        Self {
            state: RwLock::new(snapshot),
            recorder: FeedbackRecorder::new(Arc::clone(&model), config.model.clone(), contention),
            model,
            scoring: Mutex::new(scoring),
            builder: ScheduleBuilder::new(config.layout.clone()),
            training: config.model.clone(),
            contention,
        }
    }

    /// Handle to the shared model, for callers that score outside the engine.
    pub fn model(&self) -> Arc<SharedModel> {
        Arc::clone(&self.model)
    }

    /// Copy of the current tasks and records.
    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.clone()
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.state.read().await.tasks.clone()
    }

    /// Validate and append a task. Returns its index.
    pub async fn add_task(&self, draft: TaskDraft) -> Result<usize> {
        let task = draft.validate()?;
        let mut state = self.state.write().await;
        state.records.append(Record::added(&task));
        state.tasks.push(task);
        let index = state.tasks.len() - 1;
        info!(index, tasks = state.tasks.len(), "task added");
        Ok(index)
    }

    /// Remove the task at `index`. History is left as is.
    pub async fn delete_task(&self, index: usize) -> Result<Task> {
        let mut state = self.state.write().await;
        if index >= state.tasks.len() {
            return Err(ValidationError::UnknownTask {
                index,
                len: state.tasks.len(),
            }
            .into());
        }
        let task = state.tasks.remove(index);
        info!(index, tasks = state.tasks.len(), "task deleted");
        Ok(task)
    }

    /// Tasks whose deadline falls on `date`, with their indices.
    pub async fn tasks_due_on(&self, date: NaiveDate) -> Vec<(usize, Task)> {
        self.state
            .read()
            .await
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_due_on(date))
            .map(|(i, t)| (i, t.clone()))
            .collect()
    }

    /// Score, order and lay out every current task.
    ///
    /// An untrained model with a non-empty history is trained first. Every
    /// task is then scored against one model snapshot, and a `scheduled`
    /// record is appended per task.
    pub async fn generate_schedule(&self) -> Result<GeneratedSchedule> {
        let (tasks, records) = {
            let state = self.state.read().await;
            if state.tasks.is_empty() {
                return Err(ValidationError::NoTasks.into());
            }
            (state.tasks.clone(), state.records.records().to_vec())
        };

        // Score against this request's own training result, not whatever a
        // concurrent request installed since.
        let current = self.model.snapshot().await;
        let (model, training) = if !current.is_trained() && !records.is_empty() {
            debug!(records = records.len(), "untrained model, training before scoring");
            let run = self
                .model
                .retrain(records, &self.training, self.contention)
                .await?;
            (run.model, Some(run.outcome))
        } else {
            (current, None)
        };

        let (scored, source) = self.scoring.lock().await.score(&tasks, &model)?;
        let schedule = self.builder.build(scored);
        let segments = self.builder.layout(&schedule);

        {
            let mut state = self.state.write().await;
            state.records.extend(
                schedule
                    .entries
                    .iter()
                    .map(|e| Record::scheduled(&e.task, e.score)),
            );
        }
        info!(tasks = schedule.entries.len(), ?source, "schedule generated");

        Ok(GeneratedSchedule {
            schedule,
            segments,
            source,
            training,
        })
    }

    /// Record an outcome and retrain over the updated history.
    pub async fn submit_feedback(&self, feedback: Feedback) -> Result<FeedbackReceipt> {
        self.recorder.record(&self.state, feedback).await
    }

    /// Retrain over the current history without adding anything.
    pub async fn train(&self) -> Result<TrainOutcome> {
        let records = self.state.read().await.records.records().to_vec();
        let run = self
            .model
            .retrain(records, &self.training, self.contention)
            .await?;
        Ok(run.outcome)
    }

    /// Every task with its model score, highest first. `None` while untrained.
    pub async fn learned_priorities(&self) -> Result<Option<Vec<ScoredTask>>> {
        let model = self.model.snapshot().await;
        if !model.is_trained() {
            return Ok(None);
        }
        let tasks = self.tasks().await;
        let scores = model.predict_batch(&FeatureExtractor::extract_all(&tasks))?;
        let scored = tasks
            .into_iter()
            .zip(scores)
            .enumerate()
            .map(|(index, (task, score))| ScoredTask { index, task, score })
            .collect();
        Ok(Some(self.builder.build(scored).entries))
    }

    pub async fn model_status(&self) -> ModelStatus {
        self.model.snapshot().await.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ModelError};
    use crate::history::RecordOrigin;
    use crate::scoring::{ScoringConfig, UnitSampler};

    struct Constant(f64);

    impl UnitSampler for Constant {
        fn sample_unit(&mut self) -> f64 {
            self.0
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.model.seed = Some(3);
        config.scoring.seed = Some(3);
        config
    }

    fn engine() -> Engine {
        Engine::with_scoring(
            Snapshot::default(),
            &config(),
            ScoringService::with_sampler(ScoringConfig::default(), Box::new(Constant(0.5))),
        )
    }

    #[tokio::test]
    async fn add_task_appends_placeholder() {
        let engine = engine();
        let index = engine
            .add_task(TaskDraft::new("read").with_duration(20.0))
            .await
            .unwrap();
        assert_eq!(index, 0);

        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records.records()[0].origin, RecordOrigin::Added);
    }

    #[tokio::test]
    async fn invalid_task_mutates_nothing() {
        let engine = engine();
        let err = engine.add_task(TaskDraft::new("   ")).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::EmptyTitle)));
        let err = engine
            .add_task(TaskDraft::new("ok").with_duration(-1.0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::NegativeDuration { .. })
        ));
        assert_eq!(engine.snapshot().await, Snapshot::default());
    }

    #[tokio::test]
    async fn delete_task_keeps_history() {
        let engine = engine();
        engine.add_task(TaskDraft::new("a")).await.unwrap();
        engine.add_task(TaskDraft::new("b")).await.unwrap();

        let removed = engine.delete_task(0).await.unwrap();
        assert_eq!(removed.title(), "a");
        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(snapshot.records.len(), 2);

        assert!(matches!(
            engine.delete_task(5).await,
            Err(CoreError::Validation(ValidationError::UnknownTask { index: 5, len: 1 }))
        ));
    }

    #[tokio::test]
    async fn generate_without_tasks_is_rejected() {
        let engine = engine();
        assert!(matches!(
            engine.generate_schedule().await,
            Err(CoreError::Validation(ValidationError::NoTasks))
        ));
        assert!(engine.snapshot().await.records.is_empty());
    }

    #[tokio::test]
    async fn fallback_round_when_history_is_taskless() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{"tasks":[{"title":"a","duration":30},{"title":"b","duration":90}],
                "records":[{"completed":0}]}"#,
        )
        .unwrap();
        let engine = Engine::with_scoring(
            snapshot,
            &config(),
            ScoringService::with_sampler(ScoringConfig::default(), Box::new(Constant(0.5))),
        );

        let generated = engine.generate_schedule().await.unwrap();
        assert_eq!(generated.source, ScoreSource::Fallback);
        assert_eq!(generated.training, Some(TrainOutcome::Skipped));
        assert!(generated.schedule.entries.iter().all(|e| e.score == 0.5));
        // equal scores keep input order
        assert_eq!(generated.segments[0].title, "a");
        assert_eq!(generated.segments[1].offset, 0.25);
        assert_eq!(generated.segments[1].width, 0.75);
        assert_eq!(engine.snapshot().await.records.len(), 3);
    }

    #[tokio::test]
    async fn generate_trains_first_when_history_exists() {
        let engine = engine();
        engine.add_task(TaskDraft::new("a")).await.unwrap();
        engine.add_task(TaskDraft::new("b").with_duration(90.0)).await.unwrap();

        let generated = engine.generate_schedule().await.unwrap();
        assert_eq!(generated.source, ScoreSource::Model);
        assert!(matches!(
            generated.training,
            Some(TrainOutcome::Trained { examples: 2, .. })
        ));

        let records = engine.snapshot().await.records;
        assert_eq!(records.len(), 4);
        let scheduled: Vec<_> = records
            .records()
            .iter()
            .filter(|r| r.origin == RecordOrigin::Scheduled)
            .collect();
        assert_eq!(scheduled.len(), 2);
        assert!(scheduled.iter().all(|r| r.score.is_some()));

        // already trained: no second training
        let again = engine.generate_schedule().await.unwrap();
        assert_eq!(again.training, None);
    }

    #[tokio::test]
    async fn feedback_appends_exact_snapshot() {
        let engine = engine();
        engine
            .add_task(
                TaskDraft::new("report")
                    .with_subjective(7)
                    .with_objective(4)
                    .with_duration(60.0),
            )
            .await
            .unwrap();
        let before = engine.snapshot().await;

        let receipt = engine
            .submit_feedback(Feedback::new(0, 1).with_actual_duration(45.0))
            .await
            .unwrap();

        let after = engine.snapshot().await;
        assert_eq!(after.records.len(), before.records.len() + 1);
        let last = after.records.last().unwrap();
        assert_eq!(last.task.as_ref(), Some(&before.tasks[0]));
        assert_eq!(last.completed, 1);
        assert_eq!(last.actual_duration, Some(45.0));
        assert_eq!(receipt.record, *last);
        assert!(engine.model_status().await.trained);
    }

    #[tokio::test]
    async fn feedback_for_unknown_task_is_rejected() {
        let engine = engine();
        engine.add_task(TaskDraft::new("a")).await.unwrap();
        let err = engine.submit_feedback(Feedback::new(1, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::UnknownTask { index: 1, len: 1 })
        ));
        assert_eq!(engine.snapshot().await.records.len(), 1);
        assert!(!engine.model_status().await.trained);
    }

    #[tokio::test]
    async fn learned_priorities_need_a_trained_model() {
        let engine = engine();
        engine.add_task(TaskDraft::new("a")).await.unwrap();
        engine.add_task(TaskDraft::new("b")).await.unwrap();
        assert_eq!(engine.learned_priorities().await.unwrap(), None);

        engine.submit_feedback(Feedback::new(1, 1)).await.unwrap();
        let priorities = engine.learned_priorities().await.unwrap().unwrap();
        assert_eq!(priorities.len(), 2);
        assert!(priorities[0].score >= priorities[1].score);
    }

    #[tokio::test]
    async fn due_date_query() {
        let engine = engine();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        engine.add_task(TaskDraft::new("undated")).await.unwrap();
        engine
            .add_task(TaskDraft::new("due").with_deadline(day))
            .await
            .unwrap();

        let due = engine.tasks_due_on(day).await;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0, 1);
        assert!(engine.tasks_due_on(day.succ_opt().unwrap()).await.is_empty());
    }

    #[tokio::test]
    async fn reject_policy_trains_when_idle() {
        let mut cfg = config();
        cfg.engine.contention = ContentionPolicy::Reject;
        let engine = Engine::new(Snapshot::default(), &cfg);
        engine.add_task(TaskDraft::new("a")).await.unwrap();

        assert!(matches!(
            engine.train().await,
            Ok(TrainOutcome::Trained { examples: 1, .. })
        ));
        assert!(matches!(
            engine.train().await,
            Ok(TrainOutcome::Trained { examples: 1, .. })
        ));
    }

    #[tokio::test]
    async fn reject_policy_reports_busy_while_training_runs() {
        let mut cfg = config();
        cfg.engine.contention = ContentionPolicy::Reject;
        let engine = Engine::new(Snapshot::default(), &cfg);
        engine.add_task(TaskDraft::new("a")).await.unwrap();

        let model = engine.model();
        let _busy = model.hold_gate_for_tests().await;
        assert!(matches!(
            engine.train().await,
            Err(CoreError::Model(ModelError::TrainingInProgress))
        ));
    }

    #[tokio::test]
    async fn feedback_while_busy_is_kept_for_the_next_training() {
        let mut cfg = config();
        cfg.engine.contention = ContentionPolicy::Reject;
        let engine = Engine::new(Snapshot::default(), &cfg);
        engine.add_task(TaskDraft::new("a")).await.unwrap();

        let model = engine.model();
        {
            let _busy = model.hold_gate_for_tests().await;
            let receipt = engine.submit_feedback(Feedback::new(0, 1)).await.unwrap();
            assert_eq!(receipt.training, TrainOutcome::Refused);
        }
        assert_eq!(engine.snapshot().await.records.len(), 2);
        assert!(matches!(
            engine.train().await,
            Ok(TrainOutcome::Trained { examples: 2, .. })
        ));
    }
}
