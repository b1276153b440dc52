//! Ordered background writes for sub-task changes
//!
//! Every change of one card goes through a single queue drained by one
//! writer task, so the store applies changes in the order they were made
//! locally. The writer owns its collaborators rather than the card, so a
//! dropped card closes the queue and the writer exits once it is drained.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::{Notify, mpsc, oneshot};
use tracing::{debug, warn};

use super::card::lock;
use crate::domain::SubTask;
use crate::events::CardEmitter;
use crate::store::{StoreError, StoreResult, TaskStore};

/// A change to mirror into the store
#[derive(Debug, Clone)]
pub(super) enum Persist {
    Upsert(Vec<SubTask>),
    /// Remove one sub-task and rewrite the siblings whose index moved
    Delete { id: String, moved: Vec<SubTask> },
}

impl Persist {
    fn ids(&self) -> Vec<String> {
        match self {
            Persist::Upsert(subtasks) => subtasks.iter().map(|s| s.id.clone()).collect(),
            Persist::Delete { id, moved } => std::iter::once(id.clone())
                .chain(moved.iter().map(|s| s.id.clone()))
                .collect(),
        }
    }
}

struct WriteJob {
    change: Persist,
    done: oneshot::Sender<()>,
}

/// Queued writes and the sub-tasks whose last write failed
#[derive(Debug, Default)]
struct Ledger {
    pending: usize,
    unsynced: HashSet<String>,
}

#[derive(Default)]
struct SyncState {
    ledger: Mutex<Ledger>,
    idle: Notify,
}

struct Writer {
    task_id: String,
    store: Arc<dyn TaskStore>,
    emitter: CardEmitter,
    state: Arc<SyncState>,
    jobs: mpsc::UnboundedReceiver<WriteJob>,
}

/// Per-card handle onto the writer queue
pub(super) struct SubTaskSync {
    queue: mpsc::UnboundedSender<WriteJob>,
    /// Taken when the first change is submitted
    writer: Mutex<Option<Writer>>,
    state: Arc<SyncState>,
}

impl SubTaskSync {
    pub(super) fn new(task_id: &str, store: Arc<dyn TaskStore>, emitter: CardEmitter) -> Self {
        let (queue, jobs) = mpsc::unbounded_channel();
        let state = Arc::new(SyncState::default());
        let writer = Writer {
            task_id: task_id.to_string(),
            store,
            emitter,
            state: Arc::clone(&state),
            jobs,
        };
        Self {
            queue,
            writer: Mutex::new(Some(writer)),
            state,
        }
    }

    /// Queue a change behind every earlier one
    ///
    /// Must be called from within a tokio runtime. The receiver resolves once
    /// the change has been written or has failed.
    pub(super) fn submit(&self, change: Persist) -> oneshot::Receiver<()> {
        let (done, receipt) = oneshot::channel();
        if let Some(writer) = lock(&self.writer).take() {
            debug!(task_id = %writer.task_id, "SubTaskSync::submit: starting writer");
            tokio::spawn(writer.run());
        }

        lock(&self.state.ledger).pending += 1;
        if let Err(mpsc::error::SendError(job)) = self.queue.send(WriteJob { change, done }) {
            warn!("Sub-task writer has stopped, change not persisted");
            let mut ledger = lock(&self.state.ledger);
            ledger.pending -= 1;
            ledger.unsynced.extend(job.change.ids());
            drop(ledger);
            self.state.idle.notify_waiters();
        }
        receipt
    }

    /// True while some sub-task's last write failed
    pub(super) fn needs_resync(&self) -> bool {
        !lock(&self.state.ledger).unsynced.is_empty()
    }

    /// Forget failed writes after local state was replaced from the store
    pub(super) fn reloaded(&self) {
        lock(&self.state.ledger).unsynced.clear();
    }

    pub(super) async fn wait_idle(&self) {
        loop {
            let idle = self.state.idle.notified();
            if lock(&self.state.ledger).pending == 0 {
                return;
            }
            idle.await;
        }
    }

    #[cfg(test)]
    pub(super) fn mark_unsynced(&self, id: &str) {
        lock(&self.state.ledger).unsynced.insert(id.to_string());
    }
}

impl Writer {
    async fn run(mut self) {
        while let Some(job) = self.jobs.recv().await {
            self.write(job.change).await;
            let idle = {
                let mut ledger = lock(&self.state.ledger);
                ledger.pending -= 1;
                ledger.pending == 0
            };
            if idle {
                self.state.idle.notify_waiters();
            }
            let _ = job.done.send(());
        }
        debug!(task_id = %self.task_id, "Writer::run: queue closed");
    }

    async fn write(&self, change: Persist) {
        debug!(task_id = %self.task_id, ?change, "Writer::write: called");
        let ids = change.ids();
        let result = match change {
            Persist::Upsert(subtasks) => self.upsert_all(&subtasks).await,
            Persist::Delete { id, moved } => match self.store.delete_subtask(&self.task_id, &id).await {
                // already absent, which is what the card shows
                Ok(()) | Err(StoreError::NotFound(_)) => self.upsert_all(&moved).await,
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(()) => {
                let mut ledger = lock(&self.state.ledger);
                for id in &ids {
                    ledger.unsynced.remove(id);
                }
            }
            Err(e) => {
                warn!(task_id = %self.task_id, error = %e, "Sub-task change not persisted");
                lock(&self.state.ledger).unsynced.extend(ids);
                self.emitter.subtask_sync_failed(&e.to_string());
            }
        }
    }

    async fn upsert_all(&self, subtasks: &[SubTask]) -> StoreResult<()> {
        for subtask in subtasks {
            self.store.upsert_subtask(&self.task_id, subtask).await?;
        }
        Ok(())
    }
}
