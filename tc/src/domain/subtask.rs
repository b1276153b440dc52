//! SubTask domain type
//!
//! Checklist items owned by a task. Order indices are dense and 1-based.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::id::generate_id;

/// Sub-task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubTaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl std::fmt::Display for SubTaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// A step proposed by a generator before it has an id or position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTaskDraft {
    pub title: String,
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
    #[serde(default)]
    pub rationale: Option<String>,
}

impl SubTaskDraft {
    pub fn new(title: impl Into<String>, estimated_minutes: u32) -> Self {
        Self {
            title: title.into(),
            estimated_minutes: Some(estimated_minutes),
            rationale: None,
        }
    }
}

/// A checklist item under a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub status: SubTaskStatus,

    /// 1-based position in the checklist
    pub order_index: u32,

    #[serde(default)]
    pub estimated_minutes: Option<u32>,

    /// Why this step sits where it does (generated checklists only)
    #[serde(default)]
    pub rationale: Option<String>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SubTask {
    /// Create a pending sub-task at the given position
    pub fn new(title: impl Into<String>, order_index: u32) -> Self {
        let title = title.into();
        debug!(%title, order_index, "SubTask::new: called");
        Self {
            id: generate_id("st", &title),
            title,
            status: SubTaskStatus::Pending,
            order_index,
            estimated_minutes: None,
            rationale: None,
            completed_at: None,
        }
    }

    /// Materialise a draft at the given position
    pub fn from_draft(draft: SubTaskDraft, order_index: u32) -> Self {
        let mut subtask = Self::new(draft.title, order_index);
        subtask.estimated_minutes = draft.estimated_minutes;
        subtask.rationale = draft.rationale;
        subtask
    }

    pub fn is_completed(&self) -> bool {
        self.status == SubTaskStatus::Completed
    }

    /// Flip between pending and completed, stamping or clearing the completion time
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        debug!(id = %self.id, status = %self.status, "SubTask::toggle: called");
        if self.is_completed() {
            self.status = SubTaskStatus::Pending;
            self.completed_at = None;
        } else {
            self.status = SubTaskStatus::Completed;
            self.completed_at = Some(now);
        }
    }
}

/// Sort by order index and rewrite indices to 1..=n
pub fn renumber(subtasks: &mut [SubTask]) {
    debug!(count = subtasks.len(), "renumber: called");
    subtasks.sort_by_key(|s| s.order_index);
    for (i, subtask) in subtasks.iter_mut().enumerate() {
        subtask.order_index = (i + 1) as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_stamps_and_clears_completion() {
        let now = Utc::now();
        let mut subtask = SubTask::new("Outline", 1);
        assert_eq!(subtask.status, SubTaskStatus::Pending);

        subtask.toggle(now);
        assert!(subtask.is_completed());
        assert_eq!(subtask.completed_at, Some(now));

        subtask.toggle(now);
        assert_eq!(subtask.status, SubTaskStatus::Pending);
        assert!(subtask.completed_at.is_none());
    }

    #[test]
    fn test_toggle_in_progress_completes() {
        let mut subtask = SubTask::new("Draft", 2);
        subtask.status = SubTaskStatus::InProgress;
        subtask.toggle(Utc::now());
        assert!(subtask.is_completed());
    }

    #[test]
    fn test_renumber_closes_gaps() {
        let mut list = vec![SubTask::new("c", 5), SubTask::new("a", 1), SubTask::new("b", 3)];
        renumber(&mut list);
        let titles: Vec<_> = list.iter().map(|s| s.title.as_str()).collect();
        let indices: Vec<_> = list.iter().map(|s| s.order_index).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_from_draft_carries_estimate_and_rationale() {
        let draft = SubTaskDraft {
            title: "Review".to_string(),
            estimated_minutes: Some(15),
            rationale: Some("Review last".to_string()),
        };
        let subtask = SubTask::from_draft(draft, 4);
        assert_eq!(subtask.order_index, 4);
        assert_eq!(subtask.estimated_minutes, Some(15));
        assert_eq!(subtask.rationale.as_deref(), Some("Review last"));
    }
}
