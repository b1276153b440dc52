//! Event types for task card activity

use serde::{Deserialize, Serialize};

use crate::domain::{Emotion, FacetKind};
use crate::orchestrator::FacetPhase;

/// Everything observable that happens on a task card
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CardEvent {
    /// A facet moved to a new phase
    FacetChanged {
        task_id: String,
        facet: FacetKind,
        phase: FacetPhase,
    },
    /// Every facet launched by the bulk load has settled
    InitialLoadCompleted { task_id: String },
    /// The sub-task list changed locally
    SubTasksChanged { task_id: String, count: usize },
    /// A sub-task change could not be persisted
    SubTaskSyncFailed { task_id: String, error: String },
    /// The user picked a feeling in the check-in
    EmotionSelected { task_id: String, emotion: Emotion },
    /// The micro-challenge countdown reached 3, 2 or 1
    ChallengeTick { task_id: String, remaining: u32 },
    ChallengeCompleted { task_id: String, early: bool },
    /// A chat message was sent
    MessageSent { task_id: String },
    /// The assistant answered, or failed to
    ChatSettled { task_id: String, replied: bool },
    /// Edited fields were committed to the task
    Saved { task_id: String },
}

impl CardEvent {
    pub fn task_id(&self) -> &str {
        match self {
            Self::FacetChanged { task_id, .. }
            | Self::InitialLoadCompleted { task_id }
            | Self::SubTasksChanged { task_id, .. }
            | Self::SubTaskSyncFailed { task_id, .. }
            | Self::EmotionSelected { task_id, .. }
            | Self::ChallengeTick { task_id, .. }
            | Self::ChallengeCompleted { task_id, .. }
            | Self::MessageSent { task_id }
            | Self::ChatSettled { task_id, .. }
            | Self::Saved { task_id } => task_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::FacetChanged { .. } => "FacetChanged",
            Self::InitialLoadCompleted { .. } => "InitialLoadCompleted",
            Self::SubTasksChanged { .. } => "SubTasksChanged",
            Self::SubTaskSyncFailed { .. } => "SubTaskSyncFailed",
            Self::EmotionSelected { .. } => "EmotionSelected",
            Self::ChallengeTick { .. } => "ChallengeTick",
            Self::ChallengeCompleted { .. } => "ChallengeCompleted",
            Self::MessageSent { .. } => "MessageSent",
            Self::ChatSettled { .. } => "ChatSettled",
            Self::Saved { .. } => "Saved",
        }
    }

    /// Events the feedback layer reacts to with haptics or sound
    pub fn is_feedback(&self) -> bool {
        matches!(
            self,
            Self::EmotionSelected { .. }
                | Self::ChallengeTick { .. }
                | Self::ChallengeCompleted { .. }
                | Self::MessageSent { .. }
        )
    }
}
