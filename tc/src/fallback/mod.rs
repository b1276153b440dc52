//! FallbackGenerator - offline substitutes for every remote facet
//!
//! Pure functions of the task's own attributes. No I/O, no failure modes:
//! these run whenever the reasoning service is not ready or a call fails.

mod decompose;

pub use decompose::{TemplateFamily, classify, decompose};

use tracing::debug;

use crate::domain::{Confidence, DurationEstimate, ResourceSuggestion, Strategy, Task};

/// Templated strategy built from the title and the task-type default duration
pub fn strategy(task: &Task) -> Strategy {
    debug!(task_id = %task.id, "fallback::strategy: called");
    let family = classify(&task.title);
    let minutes = task.task_type.default_minutes();
    let steps = decompose(task).into_iter().map(|d| d.title).collect();

    Strategy {
        overview: format!(
            "Break \"{}\" into small steps and start with the easiest one. Plan for about {} minutes.",
            task.title.trim(),
            minutes
        ),
        key_points: family.key_points().iter().map(|p| p.to_string()).collect(),
        steps,
        obstacles: None,
        estimated_minutes: Some(minutes),
        confidence: Some(Confidence::Low),
    }
}

/// Task-type preset duration, always low confidence
pub fn duration(task: &Task) -> DurationEstimate {
    debug!(task_id = %task.id, task_type = %task.task_type, "fallback::duration: called");
    DurationEstimate {
        minutes: task.task_type.default_minutes(),
        confidence: Confidence::Low,
        reasoning: Some(format!("Typical length of a {} task", task.task_type)),
    }
}

/// A small fixed set of generic searches derived from the title
pub fn resources(task: &Task) -> Vec<ResourceSuggestion> {
    debug!(task_id = %task.id, "fallback::resources: called");
    let title = task.title.trim();
    vec![
        ResourceSuggestion {
            title: format!("{} tutorial", title),
            query: format!("{} tutorial", title),
            relevance: Some("general".to_string()),
            icon: Some("play".to_string()),
            rationale: None,
        },
        ResourceSuggestion {
            title: format!("How to {}", lowercase_first(title)),
            query: format!("how to {} step by step", title.to_lowercase()),
            relevance: Some("general".to_string()),
            icon: Some("list".to_string()),
            rationale: None,
        },
        ResourceSuggestion {
            title: format!("Tips for {}", lowercase_first(title)),
            query: format!("{} tips", title.to_lowercase()),
            relevance: Some("general".to_string()),
            icon: Some("lightbulb".to_string()),
            rationale: None,
        },
    ]
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskType;

    #[test]
    fn test_strategy_fallback_uses_type_default() {
        let task = Task::new("t1", "Prepare quarterly report")
            .with_type(TaskType::Work)
            .with_duration(90);
        let strategy = strategy(&task);

        assert!(strategy.overview.contains("Prepare quarterly report"));
        assert_eq!(strategy.estimated_minutes, Some(45));
        assert_eq!(strategy.confidence, Some(Confidence::Low));
        assert_eq!(strategy.steps.len(), 5);
        assert!(!strategy.key_points.is_empty());
    }

    #[test]
    fn test_duration_fallback_is_low_confidence() {
        let task = Task::new("t1", "Buy groceries").with_type(TaskType::Errand);
        let estimate = duration(&task);
        assert_eq!(estimate.minutes, 20);
        assert_eq!(estimate.confidence, Confidence::Low);
    }

    #[test]
    fn test_resources_fallback_derives_from_title() {
        let task = Task::new("t1", "Learn Rust lifetimes");
        let resources = resources(&task);
        assert_eq!(resources.len(), 3);
        assert_eq!(resources[0].query, "Learn Rust lifetimes tutorial");
        assert_eq!(resources[1].title, "How to learn Rust lifetimes");
        assert!(resources.iter().all(|r| r.query.to_lowercase().contains("learn rust lifetimes")));
    }

    #[test]
    fn test_fallbacks_are_deterministic() {
        let task = Task::new("t1", "Reply to landlord email");
        assert_eq!(strategy(&task), strategy(&task));
        assert_eq!(resources(&task), resources(&task));
    }
}
