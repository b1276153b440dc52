//! One-second tick driver for a micro-challenge

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{ChallengeError, FEEDBACK_MARKS, MicroChallenge};
use crate::events::CardEmitter;

const TICK: Duration = Duration::from_secs(1);

/// Handle to a running tick task
///
/// Cancelling (or dropping) the handle stops further decrements.
pub struct TickHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TickHandle {
    pub fn cancel(mut self) {
        debug!("TickHandle::cancel: called");
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

/// Drives a shared `MicroChallenge` with a cancellable tick task
pub struct ChallengeTimer {
    challenge: Arc<Mutex<MicroChallenge>>,
    tick: Mutex<Option<TickHandle>>,
    emitter: CardEmitter,
}

impl ChallengeTimer {
    pub fn new(total_seconds: u32, emitter: CardEmitter) -> Self {
        debug!(total_seconds, task_id = %emitter.task_id(), "ChallengeTimer::new: called");
        Self {
            challenge: Arc::new(Mutex::new(MicroChallenge::new(total_seconds))),
            tick: Mutex::new(None),
            emitter,
        }
    }

    /// Current countdown state
    pub fn snapshot(&self) -> MicroChallenge {
        match self.challenge.lock() {
            Ok(challenge) => *challenge,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Start counting down; rejected while already running
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), ChallengeError> {
        debug!("ChallengeTimer::start: called");
        {
            let mut challenge = self.challenge.lock().unwrap_or_else(|p| p.into_inner());
            challenge.start()?;
        }

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(run_ticks(Arc::clone(&self.challenge), self.emitter.clone(), cancel_rx));
        self.replace_tick(Some(TickHandle {
            cancel: Some(cancel_tx),
            task,
        }));
        info!(task_id = %self.emitter.task_id(), "Micro-challenge started");
        Ok(())
    }

    /// Finish early ("I did it"); cancels the tick. Returns false if not running.
    pub fn complete(&self) -> bool {
        debug!("ChallengeTimer::complete: called");
        self.replace_tick(None);
        let completed = self.challenge.lock().map(|mut c| c.complete()).unwrap_or(false);
        if completed {
            info!(task_id = %self.emitter.task_id(), "Micro-challenge completed early");
            self.emitter.challenge_completed(true);
        }
        completed
    }

    /// Return a finished or idle challenge to idle
    pub fn reset(&self) -> Result<(), ChallengeError> {
        debug!("ChallengeTimer::reset: called");
        let mut challenge = self.challenge.lock().unwrap_or_else(|p| p.into_inner());
        challenge.reset()
    }

    /// Stop ticking without completing (card teardown)
    pub fn cancel(&self) {
        debug!("ChallengeTimer::cancel: called");
        self.replace_tick(None);
    }

    fn replace_tick(&self, next: Option<TickHandle>) {
        let previous = match self.tick.lock() {
            Ok(mut tick) => std::mem::replace(&mut *tick, next),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), next),
        };
        if let Some(previous) = previous {
            previous.cancel();
        }
    }
}

async fn run_ticks(challenge: Arc<Mutex<MicroChallenge>>, emitter: CardEmitter, mut cancel: oneshot::Receiver<()>) {
    debug!(task_id = %emitter.task_id(), "run_ticks: called");
    loop {
        tokio::select! {
            _ = &mut cancel => {
                debug!("run_ticks: cancelled");
                return;
            }
            _ = tokio::time::sleep(TICK) => {
                let ticked = challenge.lock().ok().and_then(|mut c| c.tick());
                match ticked {
                    None => return,
                    Some(0) => {
                        info!(task_id = %emitter.task_id(), "Micro-challenge finished");
                        emitter.challenge_completed(false);
                        return;
                    }
                    Some(remaining) => {
                        if FEEDBACK_MARKS.contains(&remaining) {
                            emitter.challenge_tick(remaining);
                        }
                    }
                }
            }
        }
    }
}
