//! Per-task enrichment
//!
//! `TaskEnrichmentOrchestrator` drives one task card: it loads every facet
//! through cache, reasoning service and local fallback, applies optimistic
//! sub-task edits, and runs the check-in, micro-challenge and chat flows.

mod card;
mod facet;
mod subtasks;
mod sync;

pub use card::TaskEnrichmentOrchestrator;
pub use facet::{FacetPhase, FacetState};

use std::sync::Arc;

use crate::cache::FacetCache;
use crate::config::Config;
use crate::events::CardEventBus;
use crate::reasoning::ReasoningClient;
use crate::store::TaskStore;

/// Collaborators shared by every card
#[derive(Clone)]
pub struct CardServices {
    pub cache: Arc<FacetCache>,
    pub reasoning: Arc<dyn ReasoningClient>,
    pub store: Arc<dyn TaskStore>,
    pub bus: CardEventBus,
}

/// Per-card tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardSettings {
    /// Micro-challenge length
    pub challenge_seconds: u32,
    /// Upper bound on resource suggestions requested
    pub max_resources: usize,
}

impl Default for CardSettings {
    fn default() -> Self {
        Self {
            challenge_seconds: 30,
            max_resources: 5,
        }
    }
}

impl From<&Config> for CardSettings {
    fn from(config: &Config) -> Self {
        Self {
            challenge_seconds: config.challenge.total_seconds,
            max_resources: config.resources.max_results,
        }
    }
}
