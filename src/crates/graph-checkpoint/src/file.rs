//! File-backed checkpoint store: one file per workflow id, written via
//! write-to-temp + atomic rename so a crash mid-write never leaves a
//! torn file behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::checkpoint::Checkpoint;
use crate::error::Result;
use crate::store::CheckpointStore;

pub struct FileCheckpointStore {
    base_dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, workflow_id: &str) -> PathBuf {
        self.base_dir.join(format!("{workflow_id}.json"))
    }

    fn tmp_path_for(&self, workflow_id: &str) -> PathBuf {
        self.base_dir.join(format!("{workflow_id}.json.tmp"))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, checkpoint: Checkpoint) -> Result<()> {
        fs::create_dir_all(&self.base_dir).await?;
        let encoded = serde_json::to_vec_pretty(&checkpoint)?;
        let tmp_path = self.tmp_path_for(&checkpoint.workflow_id);
        fs::write(&tmp_path, &encoded).await?;
        fs::rename(&tmp_path, self.path_for(&checkpoint.workflow_id)).await?;
        Ok(())
    }

    async fn load(&self, workflow_id: &str) -> Result<Option<Checkpoint>> {
        let path = self.path_for(workflow_id);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = match fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(id) = workflow_id_from_path(&entry.path()) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    async fn delete(&self, workflow_id: &str) -> Result<()> {
        match fs::remove_file(self.path_for(workflow_id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn workflow_id_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(".json").map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("graph-checkpoint-test-{label}-{}", std::process::id()))
    }

    #[tokio::test]
    async fn save_then_load_round_trips_across_processes() {
        let dir = temp_dir("roundtrip");
        let store = FileCheckpointStore::new(&dir);
        let checkpoint = Checkpoint::new("wf-file", 2, json!({"a": 1}))
            .with_completed_nodes(vec!["a".to_string()]);
        store.save(checkpoint).await.unwrap();

        let loaded = store.load("wf-file").await.unwrap().unwrap();
        assert_eq!(loaded.step, 2);
        assert_eq!(loaded.completed_nodes, vec!["a"]);

        fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn load_of_missing_file_returns_none_not_error() {
        let dir = temp_dir("missing");
        let store = FileCheckpointStore::new(&dir);
        assert!(store.load("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent_on_missing_file() {
        let dir = temp_dir("delete");
        let store = FileCheckpointStore::new(&dir);
        store.delete("never-saved").await.unwrap();
    }

    #[tokio::test]
    async fn list_reflects_saved_workflow_ids() {
        let dir = temp_dir("list");
        let store = FileCheckpointStore::new(&dir);
        store.save(Checkpoint::new("wf-a", 0, json!({}))).await.unwrap();
        store.save(Checkpoint::new("wf-b", 0, json!({}))).await.unwrap();

        let mut ids = store.list().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["wf-a".to_string(), "wf-b".to_string()]);

        fs::remove_dir_all(&dir).await.ok();
    }
}
