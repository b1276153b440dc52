//! Card event bus
//!
//! Every observable change in a task card is emitted as a [`CardEvent`]:
//! facet transitions for the rendering layer, and discrete moments (emotion
//! picked, countdown tick, message sent) for the feedback layer (haptics,
//! sounds). Emission is fire-and-forget; the orchestrator never waits on or
//! inspects a consumer.
//!
//! ```rust,ignore
//! let bus = CardEventBus::with_default_capacity();
//! let mut rx = bus.subscribe();
//! let emitter = bus.emitter_for("task-123");
//! emitter.challenge_tick(3);
//! ```

mod bus;
mod types;

pub use bus::{CardEmitter, CardEventBus, DEFAULT_CHANNEL_CAPACITY};
pub use types::CardEvent;
