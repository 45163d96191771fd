//! Cross-cutting services module
//!
//! Holds the persisted guard state, the write guard that reads it, and the
//! event hooks fired around every guarded call.

pub mod events;
pub mod guard;
pub mod state;

// Re-export commonly used types
pub use events::{
    BlockedEvent, ChallengeEvent, ErrorEvent, EventDispatcher, EventHandler, GuardEvent,
    LoggingHandler, RequestEvent, ResponseEvent,
};
pub use guard::{GuardBlock, GuardPolicy, evaluate};
pub use state::{
    Cooldowns, GuardState, JsonFileStateStore, MemoryStateStore, PendingVerification,
    RedbStateStore, StateError, StateStore, Suspension, SweepReport,
};
