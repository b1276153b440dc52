//! JSON file task store
//!
//! One file per task: `{dir}/{task_id}.json` holding the task record (if
//! saved) and its sub-tasks. Writes go to a temp file and are renamed into
//! place so a crash never leaves a half-written record.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{StoreError, StoreResult, TaskStore};
use crate::domain::{SubTask, Task, slugify};

#[derive(Debug, Default, Serialize, Deserialize)]
struct TaskFile {
    #[serde(default)]
    task: Option<Task>,
    #[serde(default)]
    subtasks: Vec<SubTask>,
}

pub struct JsonStore {
    dir: PathBuf,
    /// Serialises read-modify-write cycles
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        debug!(?dir, "JsonStore::open: called");
        std::fs::create_dir_all(&dir)?;
        info!("Task store at {}", dir.display());
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, task_id: &str) -> PathBuf {
        let name = slugify(task_id);
        let name = if name.is_empty() { "task".to_string() } else { name };
        self.dir.join(format!("{}.json", name))
    }

    async fn read(&self, task_id: &str) -> StoreResult<TaskFile> {
        let path = self.path_for(task_id);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TaskFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, task_id: &str, file: &TaskFile) -> StoreResult<()> {
        let path = self.path_for(task_id);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(file)?;
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(?path, "JsonStore::write: done");
        Ok(())
    }
}

#[async_trait]
impl TaskStore for JsonStore {
    async fn list_subtasks(&self, task_id: &str) -> StoreResult<Vec<SubTask>> {
        debug!(%task_id, "JsonStore::list_subtasks: called");
        let mut subtasks = self.read(task_id).await?.subtasks;
        subtasks.sort_by_key(|s| s.order_index);
        Ok(subtasks)
    }

    async fn upsert_subtask(&self, task_id: &str, subtask: &SubTask) -> StoreResult<()> {
        debug!(%task_id, subtask_id = %subtask.id, "JsonStore::upsert_subtask: called");
        let _guard = self.write_lock.lock().await;
        let mut file = self.read(task_id).await?;
        match file.subtasks.iter_mut().find(|s| s.id == subtask.id) {
            Some(existing) => *existing = subtask.clone(),
            None => file.subtasks.push(subtask.clone()),
        }
        self.write(task_id, &file).await
    }

    async fn delete_subtask(&self, task_id: &str, subtask_id: &str) -> StoreResult<()> {
        debug!(%task_id, %subtask_id, "JsonStore::delete_subtask: called");
        let _guard = self.write_lock.lock().await;
        let mut file = self.read(task_id).await?;
        let before = file.subtasks.len();
        file.subtasks.retain(|s| s.id != subtask_id);
        if file.subtasks.len() == before {
            return Err(StoreError::NotFound(format!("SubTask {}", subtask_id)));
        }
        self.write(task_id, &file).await
    }

    async fn save_task(&self, task: &Task) -> StoreResult<()> {
        debug!(task_id = %task.id, "JsonStore::save_task: called");
        let _guard = self.write_lock.lock().await;
        let mut file = self.read(&task.id).await?;
        file.task = Some(task.clone());
        self.write(&task.id, &file).await
    }

    async fn load_task(&self, task_id: &str) -> StoreResult<Option<Task>> {
        debug!(%task_id, "JsonStore::load_task: called");
        Ok(self.read(task_id).await?.task)
    }
}
