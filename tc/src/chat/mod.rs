//! ChatSession - append-only conversation about one task
//!
//! The session never holds a lock across the remote call: `begin` records the
//! user turn and raises the thinking flag, the caller awaits the reply, and
//! `finish` appends it (if any) and clears the flag.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::{Message, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the conversation; order is append order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ChatMessage> for Message {
    fn from(msg: &ChatMessage) -> Self {
        Message {
            role: match msg.role {
                ChatRole::User => Role::User,
                ChatRole::Assistant => Role::Assistant,
            },
            content: msg.content.clone(),
        }
    }
}

/// Why a send was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    /// Blank or whitespace-only text
    Empty,
    /// A previous send is still waiting for its reply
    InFlight,
}

#[derive(Debug, Default, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    thinking: bool,
    last_failed: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// True while a reply is outstanding
    pub fn is_thinking(&self) -> bool {
        self.thinking
    }

    /// True when the most recent send got no reply
    pub fn last_failed(&self) -> bool {
        self.last_failed
    }

    /// Record a user turn and return the history that preceded it
    pub fn begin(&mut self, text: &str) -> Result<(Vec<ChatMessage>, String), SendRejected> {
        let text = text.trim();
        if text.is_empty() {
            debug!("ChatSession::begin: rejected empty message");
            return Err(SendRejected::Empty);
        }
        if self.thinking {
            debug!("ChatSession::begin: rejected, send already in flight");
            return Err(SendRejected::InFlight);
        }

        let history = self.messages.clone();
        self.messages.push(ChatMessage::user(text));
        self.thinking = true;
        self.last_failed = false;
        debug!(history_len = history.len(), "ChatSession::begin: user message appended");
        Ok((history, text.to_string()))
    }

    /// Settle the in-flight send; `None` means the call failed
    pub fn finish(&mut self, reply: Option<ChatMessage>) {
        debug!(success = reply.is_some(), "ChatSession::finish: called");
        match reply {
            Some(reply) => self.messages.push(reply),
            None => self.last_failed = true,
        }
        self.thinking = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_rejects_blank() {
        let mut session = ChatSession::new();
        assert_eq!(session.begin("   \n").unwrap_err(), SendRejected::Empty);
        assert!(session.messages().is_empty());
        assert!(!session.is_thinking());
    }

    #[test]
    fn test_begin_rejects_while_thinking() {
        let mut session = ChatSession::new();
        session.begin("first").unwrap();
        assert_eq!(session.begin("second").unwrap_err(), SendRejected::InFlight);
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_successful_turn() {
        let mut session = ChatSession::new();
        let (history, text) = session.begin("  What should I do first? ").unwrap();
        assert!(history.is_empty());
        assert_eq!(text, "What should I do first?");
        assert!(session.is_thinking());

        session.finish(Some(ChatMessage::assistant("Open the document.")));
        assert!(!session.is_thinking());
        assert!(!session.last_failed());
        assert_eq!(
            session.messages(),
            &[
                ChatMessage::user("What should I do first?"),
                ChatMessage::assistant("Open the document.")
            ]
        );
    }

    #[test]
    fn test_failed_turn_appends_nothing() {
        let mut session = ChatSession::new();
        session.begin("hello").unwrap();
        session.finish(None);

        assert_eq!(session.messages().len(), 1);
        assert!(!session.is_thinking());
        assert!(session.last_failed());

        // next send clears the failure marker
        let (history, _) = session.begin("again").unwrap();
        assert_eq!(history.len(), 1);
        assert!(!session.last_failed());
    }

    #[test]
    fn test_into_llm_message() {
        let msg: Message = (&ChatMessage::assistant("hi")).into();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "hi");
    }
}
