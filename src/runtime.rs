//! Events emitted by the assistant for UI and observability.
//!
//! Kept lightweight (no heavy payloads) so sessions can publish them on a
//! broadcast channel without ever waiting for a slow subscriber.

use tokio::sync::broadcast;

use crate::session::{Origin, SessionState};

/// Capacity of the event channel. Slow subscribers lag rather than block
/// sessions.
pub const EVENT_CAPACITY: usize = 256;

/// Create the assistant event channel.
pub fn event_channel() -> broadcast::Sender<AssistantEvent> {
    broadcast::channel(EVENT_CAPACITY).0
}

/// Events that describe what the assistant is doing "right now".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantEvent {
    /// The session gate moved to a new state.
    StateChanged(SessionState),
    /// Text the user said or typed, as handed to the router.
    UserInput { origin: Origin, text: String },
    /// The spoken reply that closed a turn.
    Response { text: String },
    /// One display line accompanying a reply (file or application listings).
    Message { text: String },
    /// The file skill's working directory changed.
    DirectoryChanged,
    /// Whether speech output is currently playing.
    Speaking { active: bool },
}
