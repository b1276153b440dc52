//! Micro-challenge - a short cooperative countdown for the first tiny action
//!
//! `MicroChallenge` is the pure state machine (idle -> running -> completed);
//! `ChallengeTimer` drives it with a one-second tick task that can be
//! cancelled explicitly through its handle.

mod timer;

pub use timer::{ChallengeTimer, TickHandle};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Remaining-second marks that trigger a feedback tick
pub const FEEDBACK_MARKS: [u32; 3] = [3, 2, 1];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChallengeError {
    #[error("Challenge is already running")]
    AlreadyRunning,

    #[error("Challenge length must be at least one second")]
    ZeroLength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeState {
    #[default]
    Idle,
    Running,
    Completed,
}

/// Countdown state
///
/// `remaining_seconds` never increases while running; it only resets on an
/// explicit `reset` or `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroChallenge {
    pub total_seconds: u32,
    pub remaining_seconds: u32,
    pub state: ChallengeState,
}

impl MicroChallenge {
    pub fn new(total_seconds: u32) -> Self {
        Self {
            total_seconds,
            remaining_seconds: total_seconds,
            state: ChallengeState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == ChallengeState::Running
    }

    /// Begin the countdown from the full length
    pub fn start(&mut self) -> Result<(), ChallengeError> {
        debug!(state = ?self.state, total = self.total_seconds, "MicroChallenge::start: called");
        if self.is_running() {
            return Err(ChallengeError::AlreadyRunning);
        }
        if self.total_seconds == 0 {
            return Err(ChallengeError::ZeroLength);
        }
        self.remaining_seconds = self.total_seconds;
        self.state = ChallengeState::Running;
        Ok(())
    }

    /// Advance one second; returns the new remaining count, or None when not running
    ///
    /// Reaching zero completes the challenge.
    pub fn tick(&mut self) -> Option<u32> {
        if !self.is_running() {
            return None;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.state = ChallengeState::Completed;
        }
        Some(self.remaining_seconds)
    }

    /// Finish early; returns false if the challenge was not running
    pub fn complete(&mut self) -> bool {
        debug!(remaining = self.remaining_seconds, "MicroChallenge::complete: called");
        if !self.is_running() {
            return false;
        }
        self.state = ChallengeState::Completed;
        true
    }

    /// Return to idle with the full length; refused while running
    pub fn reset(&mut self) -> Result<(), ChallengeError> {
        if self.is_running() {
            return Err(ChallengeError::AlreadyRunning);
        }
        self.remaining_seconds = self.total_seconds;
        self.state = ChallengeState::Idle;
        Ok(())
    }
}
