//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to the
//! embedded defaults, then renders them with Handlebars.

use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;
use crate::domain::Task;

/// Errors from loading or rendering a prompt
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Prompt template not found: {0}")]
    NotFound(String),

    #[error("Failed to read prompt {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render prompt {name}: {message}")]
    Render { name: String, message: String },
}

/// Values available to every prompt template
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext {
    pub title: String,
    pub task_type: String,
    pub priority: String,
    pub notes: Option<String>,
    pub duration: Option<u32>,
    pub context: Option<String>,
    pub max_results: Option<usize>,
}

impl PromptContext {
    /// Context built from a task's own attributes
    pub fn for_task(task: &Task) -> Self {
        debug!(task_id = %task.id, "PromptContext::for_task: called");
        let notes = task.notes.trim();
        Self {
            title: task.title.trim().to_string(),
            task_type: task.task_type.to_string(),
            priority: task.priority.to_string(),
            notes: if notes.is_empty() { None } else { Some(notes.to_string()) },
            duration: task.duration_minutes,
            context: None,
            max_results: None,
        }
    }

    /// Context for a resource search, which only sees a title and free-form context
    pub fn for_search(title: &str, context: &str, max_results: usize) -> Self {
        Self {
            title: title.trim().to_string(),
            task_type: String::new(),
            priority: String::new(),
            notes: None,
            duration: None,
            context: Some(context.to_string()),
            max_results: Some(max_results),
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    /// User override directory (e.g. `~/.config/taskcard/prompts/`)
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that checks `dir` for `{name}.pmt` overrides first
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let exists = dir.exists();
        debug!(?dir, %exists, "PromptLoader::new: called");
        Self {
            hbs: Self::engine(),
            override_dir: if exists { Some(dir.to_path_buf()) } else { None },
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            override_dir: None,
        }
    }

    /// Loader using the user config directory for overrides
    pub fn from_user_config() -> Self {
        match dirs::config_dir() {
            Some(dir) => Self::new(dir.join("taskcard").join("prompts")),
            None => Self::embedded_only(),
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // prompts are plain text, not HTML
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    fn load_template(&self, name: &str) -> Result<String, PromptError> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found override");
                return std::fs::read_to_string(&path).map_err(|source| PromptError::Read { path, source });
            }
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| PromptError::NotFound(name.to_string()))
    }

    /// Render a template with the given context
    pub fn render(&self, name: &str, context: &PromptContext) -> Result<String, PromptError> {
        debug!(%name, title = %context.title, "PromptLoader::render: called");
        let template = self.load_template(name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| PromptError::Render {
                name: name.to_string(),
                message: e.to_string(),
            })
    }
}

impl Default for PromptLoader {
    fn default() -> Self {
        Self::embedded_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskType;

    #[test]
    fn test_render_strategy_includes_task_fields() {
        let loader = PromptLoader::embedded_only();
        let task = Task::new("t1", "Prepare quarterly report")
            .with_type(TaskType::Work)
            .with_notes("Q3 numbers & charts");
        let prompt = loader.render("strategy", &PromptContext::for_task(&task)).unwrap();

        assert!(prompt.contains("Task: Prepare quarterly report"));
        assert!(prompt.contains("Category: work"));
        // not HTML-escaped
        assert!(prompt.contains("Q3 numbers & charts"));
        assert!(!prompt.contains("expects it to take"));
    }

    #[test]
    fn test_render_resources_uses_search_context() {
        let loader = PromptLoader::embedded_only();
        let ctx = PromptContext::for_search("Learn Rust", "study task", 4);
        let prompt = loader.render("resources", &ctx).unwrap();
        assert!(prompt.contains("at most 4 searches"));
        assert!(prompt.contains("Context: study task"));
    }

    #[test]
    fn test_override_dir_wins() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("chat.pmt"), "Custom chat for {{title}}").unwrap();

        let loader = PromptLoader::new(dir.path());
        let task = Task::new("t1", "Walk the dog");
        let prompt = loader.render("chat", &PromptContext::for_task(&task)).unwrap();
        assert_eq!(prompt, "Custom chat for Walk the dog");

        // templates missing from the override dir still come from the binary
        assert!(loader.render("duration", &PromptContext::for_task(&task)).is_ok());
    }

    #[test]
    fn test_unknown_template() {
        let loader = PromptLoader::embedded_only();
        let task = Task::new("t1", "x");
        assert!(matches!(
            loader.render("nope", &PromptContext::for_task(&task)),
            Err(PromptError::NotFound(_))
        ));
    }
}
