//! Reasoning service contract
//!
//! The orchestrator asks for every remote facet through `ReasoningClient`.
//! It only ever distinguishes success from failure; the error detail is kept
//! for diagnostic logging.

mod llm;

pub use llm::LlmReasoningClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::chat::ChatMessage;
use crate::domain::{DurationEstimate, ResourceSuggestion, Strategy, SubTaskDraft, Task};
use crate::llm::LlmError;
use crate::prompts::PromptError;

/// Errors from a reasoning call
#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("Reasoning service unavailable: {0}")]
    Unavailable(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    #[error("Could not parse reply: {0}")]
    Parse(String),
}

/// Remote capability producing AI-derived facets
///
/// Every call may fail; `is_ready` lets callers skip straight to an offline
/// fallback without paying for an attempt.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Whether a call can currently be attempted
    fn is_ready(&self) -> bool;

    async fn generate_strategy(&self, task: &Task) -> Result<Strategy, ReasoningError>;

    async fn estimate_duration(&self, task: &Task) -> Result<DurationEstimate, ReasoningError>;

    async fn generate_resource_searches(
        &self,
        title: &str,
        context: &str,
        max_results: usize,
    ) -> Result<Vec<ResourceSuggestion>, ReasoningError>;

    /// Propose an ordered checklist for the task
    async fn decompose(&self, task: &Task) -> Result<Vec<SubTaskDraft>, ReasoningError>;

    /// Continue a conversation; `history` excludes `message`
    async fn converse(&self, history: &[ChatMessage], message: &str) -> Result<ChatMessage, ReasoningError>;
}

/// A client that is never ready, for offline runs
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledReasoning;

#[async_trait]
impl ReasoningClient for DisabledReasoning {
    fn is_ready(&self) -> bool {
        false
    }

    async fn generate_strategy(&self, _task: &Task) -> Result<Strategy, ReasoningError> {
        Err(ReasoningError::Unavailable("offline".to_string()))
    }

    async fn estimate_duration(&self, _task: &Task) -> Result<DurationEstimate, ReasoningError> {
        Err(ReasoningError::Unavailable("offline".to_string()))
    }

    async fn generate_resource_searches(
        &self,
        _title: &str,
        _context: &str,
        _max_results: usize,
    ) -> Result<Vec<ResourceSuggestion>, ReasoningError> {
        Err(ReasoningError::Unavailable("offline".to_string()))
    }

    async fn decompose(&self, _task: &Task) -> Result<Vec<SubTaskDraft>, ReasoningError> {
        Err(ReasoningError::Unavailable("offline".to_string()))
    }

    async fn converse(&self, _history: &[ChatMessage], _message: &str) -> Result<ChatMessage, ReasoningError> {
        Err(ReasoningError::Unavailable("offline".to_string()))
    }
}

#[cfg(test)]
pub mod mock {
    //! Scripted reasoning client for orchestrator tests

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::domain::Confidence;

    /// Operation names used for call counting
    pub const STRATEGY: &str = "strategy";
    pub const DURATION: &str = "duration";
    pub const RESOURCES: &str = "resources";
    pub const DECOMPOSE: &str = "decompose";
    pub const CONVERSE: &str = "converse";

    /// Reasoning client that answers from fixed values and counts calls
    pub struct MockReasoning {
        pub ready: bool,
        pub fail: bool,
        /// Simulated latency per call
        pub delay: Duration,
        pub strategy: Strategy,
        pub duration: DurationEstimate,
        pub resources: Vec<ResourceSuggestion>,
        pub drafts: Vec<SubTaskDraft>,
        pub reply: String,
        calls: Mutex<HashMap<&'static str, usize>>,
    }

    impl MockReasoning {
        pub fn ready() -> Self {
            Self {
                ready: true,
                fail: false,
                delay: Duration::from_millis(10),
                strategy: Strategy {
                    overview: "Remote overview".to_string(),
                    key_points: vec!["Focus".to_string()],
                    steps: vec!["Step one".to_string(), "Step two".to_string()],
                    obstacles: Some(vec!["Distraction".to_string()]),
                    estimated_minutes: None,
                    confidence: Some(Confidence::High),
                },
                duration: DurationEstimate {
                    minutes: 50,
                    confidence: Confidence::Medium,
                    reasoning: Some("Remote estimate".to_string()),
                },
                resources: vec![ResourceSuggestion {
                    title: "Remote tutorial".to_string(),
                    query: "remote tutorial query".to_string(),
                    relevance: Some("high".to_string()),
                    icon: Some("play".to_string()),
                    rationale: None,
                }],
                drafts: vec![SubTaskDraft::new("Remote step A", 5), SubTaskDraft::new("Remote step B", 10)],
                reply: "Start with the outline.".to_string(),
                calls: Mutex::new(HashMap::new()),
            }
        }

        pub fn not_ready() -> Self {
            Self {
                ready: false,
                ..Self::ready()
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::ready()
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self, op: &str) -> usize {
            self.calls.lock().map(|c| c.get(op).copied().unwrap_or(0)).unwrap_or(0)
        }

        pub fn total_calls(&self) -> usize {
            self.calls.lock().map(|c| c.values().sum()).unwrap_or(0)
        }

        async fn call<T: Clone>(&self, op: &'static str, value: &T) -> Result<T, ReasoningError> {
            if let Ok(mut calls) = self.calls.lock() {
                *calls.entry(op).or_default() += 1;
            }
            tokio::time::sleep(self.delay).await;
            if self.fail {
                Err(ReasoningError::Unavailable("scripted failure".to_string()))
            } else {
                Ok(value.clone())
            }
        }
    }

    #[async_trait]
    impl ReasoningClient for MockReasoning {
        fn is_ready(&self) -> bool {
            self.ready
        }

        async fn generate_strategy(&self, _task: &Task) -> Result<Strategy, ReasoningError> {
            self.call(STRATEGY, &self.strategy).await
        }

        async fn estimate_duration(&self, _task: &Task) -> Result<DurationEstimate, ReasoningError> {
            self.call(DURATION, &self.duration).await
        }

        async fn generate_resource_searches(
            &self,
            _title: &str,
            _context: &str,
            max_results: usize,
        ) -> Result<Vec<ResourceSuggestion>, ReasoningError> {
            let mut resources = self.call(RESOURCES, &self.resources).await?;
            resources.truncate(max_results);
            Ok(resources)
        }

        async fn decompose(&self, _task: &Task) -> Result<Vec<SubTaskDraft>, ReasoningError> {
            self.call(DECOMPOSE, &self.drafts).await
        }

        async fn converse(&self, _history: &[ChatMessage], _message: &str) -> Result<ChatMessage, ReasoningError> {
            let reply = self.call(CONVERSE, &self.reply).await?;
            Ok(ChatMessage::assistant(reply))
        }
    }
}
