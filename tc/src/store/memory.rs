//! In-process task store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{StoreError, StoreResult, TaskStore};
use crate::domain::{SubTask, Task};

#[derive(Debug, Default)]
struct Inner {
    tasks: HashMap<String, Task>,
    subtasks: HashMap<String, Vec<SubTask>>,
}

/// Keeps everything in memory; lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_subtasks(&self, task_id: &str) -> StoreResult<Vec<SubTask>> {
        debug!(%task_id, "MemoryStore::list_subtasks: called");
        let inner = self.inner.lock().await;
        let mut list = inner.subtasks.get(task_id).cloned().unwrap_or_default();
        list.sort_by_key(|s| s.order_index);
        Ok(list)
    }

    async fn upsert_subtask(&self, task_id: &str, subtask: &SubTask) -> StoreResult<()> {
        debug!(%task_id, subtask_id = %subtask.id, "MemoryStore::upsert_subtask: called");
        let mut inner = self.inner.lock().await;
        let list = inner.subtasks.entry(task_id.to_string()).or_default();
        match list.iter_mut().find(|s| s.id == subtask.id) {
            Some(existing) => *existing = subtask.clone(),
            None => list.push(subtask.clone()),
        }
        Ok(())
    }

    async fn delete_subtask(&self, task_id: &str, subtask_id: &str) -> StoreResult<()> {
        debug!(%task_id, %subtask_id, "MemoryStore::delete_subtask: called");
        let mut inner = self.inner.lock().await;
        let list = inner
            .subtasks
            .get_mut(task_id)
            .ok_or_else(|| StoreError::NotFound(format!("SubTask {}", subtask_id)))?;
        let before = list.len();
        list.retain(|s| s.id != subtask_id);
        if list.len() == before {
            return Err(StoreError::NotFound(format!("SubTask {}", subtask_id)));
        }
        Ok(())
    }

    async fn save_task(&self, task: &Task) -> StoreResult<()> {
        debug!(task_id = %task.id, "MemoryStore::save_task: called");
        self.inner.lock().await.tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn load_task(&self, task_id: &str) -> StoreResult<Option<Task>> {
        Ok(self.inner.lock().await.tasks.get(task_id).cloned())
    }
}
