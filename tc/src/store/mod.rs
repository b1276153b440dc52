//! Task persistence
//!
//! The orchestrator is the only writer of a task's sub-tasks during a card
//! session. It talks to storage through `TaskStore` so tests can substitute a
//! store that fails on demand.

mod json;
mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{SubTask, Task};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Remote persistence for tasks and their sub-tasks
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Sub-tasks of a task, ordered by order index
    async fn list_subtasks(&self, task_id: &str) -> StoreResult<Vec<SubTask>>;

    /// Insert or replace one sub-task
    async fn upsert_subtask(&self, task_id: &str, subtask: &SubTask) -> StoreResult<()>;

    async fn delete_subtask(&self, task_id: &str, subtask_id: &str) -> StoreResult<()>;

    /// Insert or replace the task record itself
    async fn save_task(&self, task: &Task) -> StoreResult<()>;

    async fn load_task(&self, task_id: &str) -> StoreResult<Option<Task>>;
}
