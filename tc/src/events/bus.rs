//! Event Bus - pub/sub for task card events
//!
//! Uses a tokio broadcast channel so every subscriber (view, feedback layer,
//! tests) sees every event emitted after it subscribed.

use tokio::sync::broadcast;
use tracing::debug;

use super::types::CardEvent;
use crate::domain::{Emotion, FacetKind};
use crate::orchestrator::FacetPhase;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Central event bus shared by every card in the process
#[derive(Clone)]
pub struct CardEventBus {
    tx: broadcast::Sender<CardEvent>,
}

impl CardEventBus {
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "CardEventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped; when the
    /// channel is full the oldest events are dropped.
    pub fn emit(&self, event: CardEvent) {
        debug!(event_type = event.event_type(), task_id = event.task_id(), "CardEventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<CardEvent> {
        debug!("CardEventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter bound to one task
    pub fn emitter_for(&self, task_id: impl Into<String>) -> CardEmitter {
        let task_id = task_id.into();
        debug!(%task_id, "CardEventBus::emitter_for: creating emitter");
        CardEmitter {
            tx: self.tx.clone(),
            task_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for CardEventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for emitting events for one task without owning the bus
#[derive(Clone)]
pub struct CardEmitter {
    tx: broadcast::Sender<CardEvent>,
    task_id: String,
}

impl CardEmitter {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn emit(&self, event: CardEvent) {
        debug!(event_type = event.event_type(), "CardEmitter::emit");
        let _ = self.tx.send(event);
    }

    // === Convenience methods ===

    pub fn facet_changed(&self, facet: FacetKind, phase: FacetPhase) {
        self.emit(CardEvent::FacetChanged {
            task_id: self.task_id.clone(),
            facet,
            phase,
        });
    }

    pub fn initial_load_completed(&self) {
        self.emit(CardEvent::InitialLoadCompleted {
            task_id: self.task_id.clone(),
        });
    }

    pub fn subtasks_changed(&self, count: usize) {
        self.emit(CardEvent::SubTasksChanged {
            task_id: self.task_id.clone(),
            count,
        });
    }

    pub fn subtask_sync_failed(&self, error: &str) {
        self.emit(CardEvent::SubTaskSyncFailed {
            task_id: self.task_id.clone(),
            error: error.to_string(),
        });
    }

    pub fn emotion_selected(&self, emotion: Emotion) {
        self.emit(CardEvent::EmotionSelected {
            task_id: self.task_id.clone(),
            emotion,
        });
    }

    pub fn challenge_tick(&self, remaining: u32) {
        self.emit(CardEvent::ChallengeTick {
            task_id: self.task_id.clone(),
            remaining,
        });
    }

    pub fn challenge_completed(&self, early: bool) {
        self.emit(CardEvent::ChallengeCompleted {
            task_id: self.task_id.clone(),
            early,
        });
    }

    pub fn message_sent(&self) {
        self.emit(CardEvent::MessageSent {
            task_id: self.task_id.clone(),
        });
    }

    pub fn chat_settled(&self, replied: bool) {
        self.emit(CardEvent::ChatSettled {
            task_id: self.task_id.clone(),
            replied,
        });
    }

    pub fn saved(&self) {
        self.emit(CardEvent::Saved {
            task_id: self.task_id.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_event_bus_subscribe() {
        let bus = CardEventBus::new(16);
        assert_eq!(bus.subscriber_count(), 0);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_event_bus_no_subscribers() {
        let bus = CardEventBus::new(16);
        // This should not panic even with no subscribers
        bus.emitter_for("t1").saved();
    }

    #[tokio::test]
    async fn test_emitter_binds_task_id() {
        let bus = CardEventBus::new(16);
        let mut rx = bus.subscribe();
        let emitter = bus.emitter_for("task-456");

        emitter.challenge_tick(2);
        emitter.facet_changed(FacetKind::Strategy, FacetPhase::Loading);
        emitter.message_sent();

        for _ in 0..3 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.task_id(), "task-456");
        }
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = CardEventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emitter_for("t1").emotion_selected(Emotion::Ready);

        assert_eq!(rx1.recv().await.unwrap().event_type(), "EmotionSelected");
        assert_eq!(rx2.recv().await.unwrap().event_type(), "EmotionSelected");
    }
}
