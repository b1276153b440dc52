//! TaskCard - per-task enrichment for a personal task manager
//!
//! Each task card is backed by a `TaskEnrichmentOrchestrator` that fills in
//! AI-derived facets (strategy, duration, tutorial resources, checklist,
//! schedule) and degrades to local heuristics whenever the reasoning
//! service is unreachable.
//!
//! # Core Concepts
//!
//! - **Facets load independently**: every facet has its own state slot and
//!   finishes on its own schedule
//! - **Cache before network**: successful results are cached per task and
//!   reused until invalidated
//! - **Fallback is never an error**: failures resolve to deterministic
//!   offline values marked with lower trust
//! - **Optimistic edits**: sub-task changes apply locally at once and are
//!   persisted in the background
//!
//! # Modules
//!
//! - [`orchestrator`] - Facet state machines and card entry points
//! - [`cache`] - Shared facet cache keyed by task and facet kind
//! - [`fallback`] - Offline heuristics for every facet
//! - [`reasoning`] - Reasoning service contract and LLM-backed client
//! - [`llm`] - LLM transport (Anthropic)
//! - [`challenge`] - Micro-challenge countdown
//! - [`chat`] - Chat session log
//! - [`store`] - Task and sub-task persistence
//! - [`events`] - Card event bus for rendering and feedback layers
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cache;
pub mod challenge;
pub mod chat;
pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod fallback;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod reasoning;
pub mod schedule;
pub mod store;

// Re-export commonly used types
pub use cache::{FacetCache, FacetValue};
pub use challenge::{ChallengeError, ChallengeState, ChallengeTimer, MicroChallenge};
pub use chat::{ChatMessage, ChatRole, ChatSession, SendRejected};
pub use config::{Config, LlmConfig};
pub use domain::{
    CheckIn, Confidence, DurationEstimate, Emotion, FacetKind, Priority, Recurrence, ResourceSuggestion,
    ScheduleRank, ScheduleSuggestion, Strategy, SubTask, SubTaskDraft, SubTaskStatus, Task, TaskType,
};
pub use events::{CardEmitter, CardEvent, CardEventBus};
pub use llm::{LlmClient, LlmError, create_client};
pub use orchestrator::{CardServices, CardSettings, FacetPhase, FacetState, TaskEnrichmentOrchestrator};
pub use prompts::{PromptContext, PromptLoader};
pub use reasoning::{DisabledReasoning, LlmReasoningClient, ReasoningClient, ReasoningError};
pub use store::{JsonStore, MemoryStore, StoreError, TaskStore};
