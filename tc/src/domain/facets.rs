//! Facet result types
//!
//! Each facet is an independently loadable product attached to a task.
//! Results are immutable once produced and are replaced wholesale on refresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The independently loadable facets of a task card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetKind {
    Strategy,
    Duration,
    Resources,
    Schedule,
    SubTasks,
}

impl FacetKind {
    /// Facets whose remote results are kept in the shared cache
    pub fn is_cacheable(self) -> bool {
        matches!(self, Self::Strategy | Self::Duration | Self::Resources)
    }
}

impl std::fmt::Display for FacetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strategy => write!(f, "strategy"),
            Self::Duration => write!(f, "duration"),
            Self::Resources => write!(f, "resources"),
            Self::Schedule => write!(f, "schedule"),
            Self::SubTasks => write!(f, "subtasks"),
        }
    }
}

/// How much the producer trusts a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// A breakdown of how to approach a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub overview: String,

    #[serde(default)]
    pub key_points: Vec<String>,

    /// Ordered, actionable steps
    #[serde(default)]
    pub steps: Vec<String>,

    #[serde(default)]
    pub obstacles: Option<Vec<String>>,

    #[serde(default)]
    pub estimated_minutes: Option<u32>,

    #[serde(default)]
    pub confidence: Option<Confidence>,
}

impl Strategy {
    /// The duration estimate embedded in this strategy, if any
    pub fn embedded_duration(&self) -> Option<DurationEstimate> {
        self.estimated_minutes.map(|minutes| DurationEstimate {
            minutes,
            confidence: self.confidence.unwrap_or_default(),
            reasoning: Some("Estimated alongside the strategy".to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationEstimate {
    pub minutes: u32,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// A lead towards tutorial material, expressed as a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSuggestion {
    /// Display title
    pub title: String,

    /// Query to hand to a search engine
    pub query: String,

    #[serde(default)]
    pub relevance: Option<String>,

    /// Icon hint for the view (e.g. "play", "book")
    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleRank {
    Best,
    Good,
    Okay,
}

impl std::fmt::Display for ScheduleRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Best => write!(f, "best"),
            Self::Good => write!(f, "good"),
            Self::Okay => write!(f, "okay"),
        }
    }
}

/// A proposed time slot for a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSuggestion {
    pub rank: ScheduleRank,
    pub at: DateTime<Utc>,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parses_with_missing_optionals() {
        let json = r#"{"overview": "Start small", "steps": ["Open the doc"]}"#;
        let strategy: Strategy = serde_json::from_str(json).unwrap();
        assert_eq!(strategy.overview, "Start small");
        assert!(strategy.key_points.is_empty());
        assert_eq!(strategy.steps, vec!["Open the doc"]);
        assert!(strategy.embedded_duration().is_none());
    }

    #[test]
    fn test_embedded_duration_uses_strategy_confidence() {
        let strategy = Strategy {
            overview: "x".to_string(),
            key_points: vec![],
            steps: vec![],
            obstacles: None,
            estimated_minutes: Some(40),
            confidence: Some(Confidence::High),
        };
        let estimate = strategy.embedded_duration().unwrap();
        assert_eq!(estimate.minutes, 40);
        assert_eq!(estimate.confidence, Confidence::High);
    }

    #[test]
    fn test_cacheable_facets() {
        assert!(FacetKind::Strategy.is_cacheable());
        assert!(FacetKind::Duration.is_cacheable());
        assert!(FacetKind::Resources.is_cacheable());
        assert!(!FacetKind::Schedule.is_cacheable());
        assert!(!FacetKind::SubTasks.is_cacheable());
    }
}
