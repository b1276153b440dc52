//! Task domain type
//!
//! The work item a card enriches. Tasks are created outside the orchestrator;
//! the orchestrator edits a shadow copy and commits it back on save.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::emotion::Emotion;
use super::priority::Priority;

/// Category of a task, used to bias offline heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Work,
    Study,
    Personal,
    Health,
    Errand,
    Creative,
    #[default]
    Other,
}

impl TaskType {
    /// Preset duration used when nothing better is known
    pub fn default_minutes(self) -> u32 {
        match self {
            Self::Work => 45,
            Self::Study => 60,
            Self::Personal => 30,
            Self::Health => 30,
            Self::Errand => 20,
            Self::Creative => 60,
            Self::Other => 30,
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Work => write!(f, "work"),
            Self::Study => write!(f, "study"),
            Self::Personal => write!(f, "personal"),
            Self::Health => write!(f, "health"),
            Self::Errand => write!(f, "errand"),
            Self::Creative => write!(f, "creative"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// How a task repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekdays,
    Weekly,
    Monthly,
}

/// A single work item surfaced in a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Stable identifier
    pub id: String,

    pub title: String,

    /// Free-text notes
    #[serde(default)]
    pub notes: String,

    /// User-entered duration estimate in minutes
    #[serde(default)]
    pub duration_minutes: Option<u32>,

    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub recurrence: Recurrence,

    /// How many times the task has been pushed to a later slot
    #[serde(default)]
    pub reschedule_count: u32,

    /// Persisted emotional blocker, if the user recorded one
    #[serde(default)]
    pub emotional_blocker: Option<Emotion>,

    #[serde(default)]
    pub task_type: TaskType,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a task with defaults for everything but id and title
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let id = id.into();
        debug!(%id, "Task::new: called");
        Self {
            id,
            title: title.into(),
            notes: String::new(),
            duration_minutes: None,
            scheduled_at: None,
            priority: Priority::default(),
            recurrence: Recurrence::default(),
            reschedule_count: 0,
            emotional_blocker: None,
            task_type: TaskType::default(),
            updated_at: None,
        }
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    /// Duration to plan around: the user's estimate, else the type preset
    pub fn effective_minutes(&self) -> u32 {
        self.duration_minutes.unwrap_or_else(|| self.task_type.default_minutes())
    }

    /// Short context line handed to the reasoning service alongside the title
    pub fn context_line(&self) -> String {
        if self.notes.trim().is_empty() {
            format!("{} task, priority {}", self.task_type, self.priority)
        } else {
            format!("{} task, priority {}: {}", self.task_type, self.priority, self.notes.trim())
        }
    }
}
