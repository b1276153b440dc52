//! Domain types for TaskCard
//!
//! Core domain types: Task, SubTask, and the facet results the enrichment
//! orchestrator produces for a task (strategy, duration, resources, schedule).
//! All are plain serde types; persistence lives behind the `store` module.

mod emotion;
mod facets;
mod id;
mod priority;
mod subtask;
mod task;

pub use emotion::{CheckIn, Emotion};
pub use facets::{
    Confidence, DurationEstimate, FacetKind, ResourceSuggestion, ScheduleRank, ScheduleSuggestion, Strategy,
};
pub use id::{generate_id, slugify};
pub use priority::Priority;
pub use subtask::{SubTask, SubTaskDraft, SubTaskStatus, renumber};
pub use task::{Recurrence, Task, TaskType};
