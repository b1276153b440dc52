//! Embedded prompts
//!
//! Compiled into the binary from .pmt files.

use tracing::debug;

pub const STRATEGY: &str = include_str!("../../prompts/strategy.pmt");

pub const DURATION: &str = include_str!("../../prompts/duration.pmt");

pub const RESOURCES: &str = include_str!("../../prompts/resources.pmt");

pub const DECOMPOSE: &str = include_str!("../../prompts/decompose.pmt");

pub const CHAT: &str = include_str!("../../prompts/chat.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "strategy" => Some(STRATEGY),
        "duration" => Some(DURATION),
        "resources" => Some(RESOURCES),
        "decompose" => Some(DECOMPOSE),
        "chat" => Some(CHAT),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
