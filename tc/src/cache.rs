//! FacetCache - shared store of previously computed facet results
//!
//! Keyed by (task id, facet kind). At most one live entry per key; invalidation
//! removes the entry so the next access re-fetches. Shared across every card
//! through an `Arc`, so all access goes through an `RwLock`.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::domain::{DurationEstimate, FacetKind, ResourceSuggestion, Strategy};

/// A cached facet value
#[derive(Debug, Clone, PartialEq)]
pub enum FacetValue {
    Strategy(Strategy),
    Duration(DurationEstimate),
    Resources(Vec<ResourceSuggestion>),
}

impl FacetValue {
    pub fn kind(&self) -> FacetKind {
        match self {
            Self::Strategy(_) => FacetKind::Strategy,
            Self::Duration(_) => FacetKind::Duration,
            Self::Resources(_) => FacetKind::Resources,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: FacetValue,
    inserted_at: Instant,
}

/// Process-wide facet cache
#[derive(Debug, Default)]
pub struct FacetCache {
    entries: RwLock<HashMap<(String, FacetKind), CacheEntry>>,
    /// Entries older than this read as absent (None = never expire)
    ttl: Option<Duration>,
}

impl FacetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache whose entries expire after `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        debug!(ttl_secs = ttl.as_secs(), "FacetCache::with_ttl: called");
        Self {
            entries: RwLock::default(),
            ttl: Some(ttl),
        }
    }

    /// Look up a live entry
    pub fn get(&self, task_id: &str, kind: FacetKind) -> Option<FacetValue> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(&(task_id.to_string(), kind))?;
        if let Some(ttl) = self.ttl
            && entry.inserted_at.elapsed() > ttl
        {
            debug!(%task_id, %kind, "FacetCache::get: entry expired");
            return None;
        }
        debug!(%task_id, %kind, "FacetCache::get: hit");
        Some(entry.value.clone())
    }

    /// Insert or replace the entry for (task id, value kind)
    pub fn set(&self, task_id: &str, value: FacetValue) {
        let kind = value.kind();
        debug!(%task_id, %kind, "FacetCache::set: called");
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                (task_id.to_string(), kind),
                CacheEntry {
                    value,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Remove one facet for a task, or every facet when `kind` is None
    pub fn invalidate(&self, task_id: &str, kind: Option<FacetKind>) {
        debug!(%task_id, ?kind, "FacetCache::invalidate: called");
        if let Ok(mut entries) = self.entries.write() {
            match kind {
                Some(kind) => {
                    entries.remove(&(task_id.to_string(), kind));
                }
                None => entries.retain(|(id, _), _| id != task_id),
            }
        }
    }

    /// Number of entries held for a task (expired ones included)
    pub fn count_for(&self, task_id: &str) -> usize {
        self.entries
            .read()
            .map(|entries| entries.keys().filter(|(id, _)| id == task_id).count())
            .unwrap_or(0)
    }

    pub fn strategy(&self, task_id: &str) -> Option<Strategy> {
        match self.get(task_id, FacetKind::Strategy)? {
            FacetValue::Strategy(strategy) => Some(strategy),
            _ => None,
        }
    }

    pub fn duration(&self, task_id: &str) -> Option<DurationEstimate> {
        match self.get(task_id, FacetKind::Duration)? {
            FacetValue::Duration(estimate) => Some(estimate),
            _ => None,
        }
    }

    pub fn resources(&self, task_id: &str) -> Option<Vec<ResourceSuggestion>> {
        match self.get(task_id, FacetKind::Resources)? {
            FacetValue::Resources(resources) => Some(resources),
            _ => None,
        }
    }
}
