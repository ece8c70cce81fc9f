pub mod completions;
pub mod config;
pub mod feedback;
pub mod model;
pub mod schedule;
pub mod task;

use behavior_scheduler_core::{Config, Engine, SnapshotStore, Task};
use tracing::debug;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// One CLI invocation's view of the data directory.
pub struct Session {
    store: SnapshotStore,
    pub engine: Engine,
}

impl Session {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let store = SnapshotStore::open()?;
        let snapshot = store.load()?;
        debug!(
            path = %store.path().display(),
            tasks = snapshot.tasks.len(),
            records = snapshot.records.len(),
            "snapshot loaded"
        );
        let engine = Engine::new(snapshot, &config);
        Ok(Self { store, engine })
    }

    /// Write the engine's snapshot back. Call after every successful mutation.
    pub async fn persist(&self) -> CmdResult {
        self.store.save(&self.engine.snapshot().await)?;
        Ok(())
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn task_line(index: usize, task: &Task) -> String {
    let deadline = task
        .deadline()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "[{index}] {title:<20}  {minutes:>5.0} min  due {deadline}  genre {genre}  difficulty {s}/{o}",
        title = task.title(),
        minutes = task.duration_minutes(),
        genre = task.genre(),
        s = task.subjective_difficulty(),
        o = task.objective_difficulty(),
    )
}
