//! Per-facet state slots

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::{FacetCache, FacetValue};
use crate::domain::{DurationEstimate, FacetKind, ResourceSuggestion, Strategy, Task};
use crate::fallback;
use crate::reasoning::{ReasoningClient, ReasoningError};

/// Where a facet is in its load cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacetPhase {
    #[default]
    Unloaded,
    Loading,
    /// Value came from the reasoning service, the cache, or the store
    Loaded,
    /// Value was computed locally after the service was skipped or failed
    Fallback,
}

impl FacetPhase {
    /// Loaded or Fallback
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Loaded | Self::Fallback)
    }
}

impl std::fmt::Display for FacetPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unloaded => write!(f, "unloaded"),
            Self::Loading => write!(f, "loading"),
            Self::Loaded => write!(f, "loaded"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// A facet's phase together with its value once settled
#[derive(Debug, Clone, PartialEq)]
pub enum FacetState<T> {
    Unloaded,
    Loading,
    Loaded(T),
    Fallback(T),
}

impl<T> Default for FacetState<T> {
    fn default() -> Self {
        Self::Unloaded
    }
}

impl<T> FacetState<T> {
    pub fn phase(&self) -> FacetPhase {
        match self {
            Self::Unloaded => FacetPhase::Unloaded,
            Self::Loading => FacetPhase::Loading,
            Self::Loaded(_) => FacetPhase::Loaded,
            Self::Fallback(_) => FacetPhase::Fallback,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) | Self::Fallback(value) => Some(value),
            Self::Unloaded | Self::Loading => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// A facet that goes through cache, reasoning service and fallback
#[async_trait]
pub(crate) trait CachedFacet: Clone + Send + Sync + Sized + 'static {
    const KIND: FacetKind;

    fn cached(cache: &FacetCache, task_id: &str) -> Option<Self>;

    fn into_value(self) -> FacetValue;

    fn fallback(task: &Task) -> Self;

    async fn fetch(
        client: &dyn ReasoningClient,
        task: &Task,
        max_results: usize,
    ) -> Result<Self, ReasoningError>;
}

#[async_trait]
impl CachedFacet for Strategy {
    const KIND: FacetKind = FacetKind::Strategy;

    fn cached(cache: &FacetCache, task_id: &str) -> Option<Self> {
        cache.strategy(task_id)
    }

    fn into_value(self) -> FacetValue {
        FacetValue::Strategy(self)
    }

    fn fallback(task: &Task) -> Self {
        fallback::strategy(task)
    }

    async fn fetch(client: &dyn ReasoningClient, task: &Task, _max_results: usize) -> Result<Self, ReasoningError> {
        client.generate_strategy(task).await
    }
}

#[async_trait]
impl CachedFacet for DurationEstimate {
    const KIND: FacetKind = FacetKind::Duration;

    fn cached(cache: &FacetCache, task_id: &str) -> Option<Self> {
        cache.duration(task_id)
    }

    fn into_value(self) -> FacetValue {
        FacetValue::Duration(self)
    }

    fn fallback(task: &Task) -> Self {
        fallback::duration(task)
    }

    async fn fetch(client: &dyn ReasoningClient, task: &Task, _max_results: usize) -> Result<Self, ReasoningError> {
        client.estimate_duration(task).await
    }
}

#[async_trait]
impl CachedFacet for Vec<ResourceSuggestion> {
    const KIND: FacetKind = FacetKind::Resources;

    fn cached(cache: &FacetCache, task_id: &str) -> Option<Self> {
        cache.resources(task_id)
    }

    fn into_value(self) -> FacetValue {
        FacetValue::Resources(self)
    }

    fn fallback(task: &Task) -> Self {
        fallback::resources(task)
    }

    async fn fetch(client: &dyn ReasoningClient, task: &Task, max_results: usize) -> Result<Self, ReasoningError> {
        client
            .generate_resource_searches(&task.title, &task.context_line(), max_results)
            .await
    }
}
