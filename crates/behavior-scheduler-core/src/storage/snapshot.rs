//! JSON snapshot file (`db.json`).

use std::path::{Path, PathBuf};

use tracing::debug;

use super::data_dir;
use crate::engine::Snapshot;
use crate::error::{Result, StorageError};

const SNAPSHOT_FILE: &str = "db.json";

/// Reads and writes the `{ "tasks": [...], "records": [...] }` snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Store at `<data dir>/db.json`.
    pub fn open() -> Result<Self> {
        Ok(Self::at(data_dir()?.join(SNAPSHOT_FILE)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty snapshot.
    pub fn load(&self) -> Result<Snapshot> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot yet, starting empty");
                return Ok(Snapshot::default());
            }
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Snapshot::default());
        }
        serde_json::from_str(&content).map_err(|e| {
            StorageError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Write through a temporary sibling file renamed into place.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(snapshot)?;
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, data)?;
        std::fs::rename(&temp_path, &self.path)?;
        debug!(
            path = %self.path.display(),
            tasks = snapshot.tasks.len(),
            records = snapshot.records.len(),
            "snapshot saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::features::FeatureExtractor;
    use crate::history::{History, Record, RecordOrigin};
    use crate::task::TaskDraft;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::at(dir.path().join("db.json"));
        assert_eq!(store.load().unwrap(), Snapshot::default());
    }

    #[test]
    fn save_then_load_preserves_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::at(dir.path().join("nested").join("db.json"));
        let task = TaskDraft::new("write").with_duration(40.0).validate().unwrap();
        let snapshot = Snapshot {
            records: History::from_records(vec![
                Record::added(&task),
                Record::feedback(&task, 1, 35.0),
            ]),
            tasks: vec![task],
        };

        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap(), snapshot);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn legacy_snapshot_is_accepted() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::at(dir.path().join("db.json"));
        std::fs::write(
            store.path(),
            r#"{
                "tasks": [
                    {"title": "math", "deadline": "", "subjective": 3, "objective": 6, "duration": 45},
                    {"title": "chores", "subjective": -2, "objective": 7.5},
                    {"title": "piano", "subjective": 300, "objective": 4}
                ],
                "records": [
                    {"task": {"title": "math", "duration": 45}, "completed": 0},
                    {"task": {"title": "math", "duration": 45}, "completed": 1, "actualDuration": 50}
                ]
            }"#,
        )
        .unwrap();

        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.tasks[0].subjective_difficulty(), 3);
        assert_eq!(snapshot.tasks[0].deadline(), None);
        assert_eq!(snapshot.tasks.len(), 3);
        let chores = FeatureExtractor::extract(&snapshot.tasks[1]);
        assert_eq!((chores[0], chores[1]), (0.0, 0.0));
        let piano = FeatureExtractor::extract(&snapshot.tasks[2]);
        assert_eq!(piano[0], 0.0);
        assert_eq!(piano[1], 0.6);
        let origins: Vec<_> = snapshot.records.records().iter().map(|r| r.origin).collect();
        assert_eq!(origins, vec![RecordOrigin::Added, RecordOrigin::Feedback]);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::at(dir.path().join("db.json"));
        std::fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(
            store.load(),
            Err(CoreError::Storage(StorageError::Corrupt { .. }))
        ));
    }
}
