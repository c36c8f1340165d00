//! The transcript event envelope (§6.5).

use rye_core::id::{DirectiveId, ThreadId};
use serde::{Deserialize, Serialize};

/// Whether a dropped write is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criticality {
    /// Must be appended; a failure here fails the thread.
    Critical,
    /// Fire-and-forget; may be dropped under load.
    Droppable,
}

/// One line of a thread's transcript. `payload` carries the type-specific
/// fields from the event-type catalog (§6.5) — this crate doesn't
/// enumerate every payload shape as its own type, since the catalog is
/// large and still growing; callers build the `serde_json::Value` that
/// matches the type they're writing.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptEvent {
    /// Strictly monotonic within a thread.
    pub seq: u64,
    /// Milliseconds since the Unix epoch.
    pub ts: u64,
    /// The thread this event belongs to.
    pub thread_id: ThreadId,
    /// The directive the thread is executing.
    pub directive: DirectiveId,
    /// Event type name (`thread_started`, `step_start`, `cognition_out`, ...).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Type-specific payload.
    pub payload: serde_json::Value,
}
