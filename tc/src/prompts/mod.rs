//! Prompt templates for the reasoning service
//!
//! Templates are embedded from `prompts/*.pmt` and may be overridden per user.

pub mod embedded;
mod loader;

pub use loader::{PromptContext, PromptError, PromptLoader};
