//! End-to-end engine tests: snapshot load, user actions, persistence.

use std::sync::Arc;

use behavior_scheduler_core::{
    Config, CoreError, Engine, Feedback, RecordOrigin, ScoreSource, SnapshotStore, TaskDraft,
    TrainOutcome, ValidationError,
};
use tempfile::TempDir;

fn seeded_config() -> Config {
    let mut config = Config::default();
    config.model.seed = Some(17);
    config.scoring.seed = Some(17);
    config
}

#[tokio::test]
async fn first_session_uses_fallback_band() {
    let config = seeded_config();
    let engine = Engine::new(Default::default(), &config);

    // No history at all: nothing to train on, so the fallback band applies.
    let err = engine.generate_schedule().await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(ValidationError::NoTasks)));

    let snapshot: behavior_scheduler_core::Snapshot = serde_json::from_str(
        r#"{"tasks":[{"title":"a"},{"title":"b"},{"title":"c"}]}"#,
    )
    .unwrap();
    let engine = Engine::new(snapshot, &config);
    let generated = engine.generate_schedule().await.unwrap();
    assert_eq!(generated.source, ScoreSource::Fallback);
    assert!(generated
        .schedule
        .entries
        .iter()
        .all(|e| (0.25..=0.75).contains(&e.score)));
    let end = generated.segments.last().unwrap().end();
    assert!((end - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn session_survives_a_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::at(dir.path().join("db.json"));
    let config = seeded_config();

    let engine = Engine::new(store.load().unwrap(), &config);
    engine
        .add_task(TaskDraft::new("reading").with_subjective(3).with_duration(30.0))
        .await
        .unwrap();
    engine
        .add_task(TaskDraft::new("taxes").with_subjective(9).with_duration(120.0))
        .await
        .unwrap();
    engine.generate_schedule().await.unwrap();
    engine
        .submit_feedback(Feedback::new(0, 1).with_actual_duration(25.0))
        .await
        .unwrap();
    store.save(&engine.snapshot().await).unwrap();

    let reloaded = store.load().unwrap();
    assert_eq!(reloaded, engine.snapshot().await);
    let origins: Vec<_> = reloaded.records.records().iter().map(|r| r.origin).collect();
    assert_eq!(
        origins,
        vec![
            RecordOrigin::Added,
            RecordOrigin::Added,
            RecordOrigin::Scheduled,
            RecordOrigin::Scheduled,
            RecordOrigin::Feedback,
        ]
    );

    // A fresh process starts untrained and trains from the reloaded history.
    let engine = Engine::new(reloaded, &config);
    assert!(!engine.model_status().await.trained);
    let generated = engine.generate_schedule().await.unwrap();
    assert_eq!(generated.source, ScoreSource::Model);
    assert!(matches!(
        generated.training,
        Some(TrainOutcome::Trained { examples: 5, .. })
    ));
}

#[tokio::test]
async fn feedback_only_policy_ignores_placeholders() {
    let mut config = seeded_config();
    config.model.include_placeholders = false;
    let engine = Engine::new(Default::default(), &config);
    engine.add_task(TaskDraft::new("a")).await.unwrap();

    // Only placeholders so far: nothing to learn from.
    let generated = engine.generate_schedule().await.unwrap();
    assert_eq!(generated.training, Some(TrainOutcome::Skipped));
    assert_eq!(generated.source, ScoreSource::Fallback);

    let receipt = engine.submit_feedback(Feedback::new(0, 0)).await.unwrap();
    assert!(matches!(
        receipt.training,
        TrainOutcome::Trained { examples: 1, .. }
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_keep_history_consistent() {
    let engine = Arc::new(Engine::new(Default::default(), &seeded_config()));
    for title in ["a", "b", "c"] {
        engine.add_task(TaskDraft::new(title)).await.unwrap();
    }

    let mut handles = Vec::new();
    for i in 0..6 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                engine.generate_schedule().await.map(|g| g.schedule.entries.len())
            } else {
                engine
                    .submit_feedback(Feedback::new(i % 3, 1))
                    .await
                    .map(|_| 1)
            }
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    let snapshot = engine.snapshot().await;
    // 3 added + 3 rounds x 3 scheduled + 3 feedback
    assert_eq!(snapshot.records.len(), 3 + 9 + 3);
    assert!(engine.model_status().await.trained);
}
