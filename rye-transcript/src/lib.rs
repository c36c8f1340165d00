#![deny(missing_docs)]
//! The Transcript Writer — an append-only per-thread event journal (§4.4).
//!
//! Every turn of the Thread Runner loop, and every tool dispatch, writes
//! one event here. Events are classified `critical` (the write must
//! succeed or the thread fails) or `droppable` (best-effort streaming
//! deltas, bounded queue, oldest dropped on overflow). The journal
//! itself — a JSONL file — is the only source of truth; the accompanying
//! human-readable rendering is a derived view, never read back.

pub mod event;
pub mod fs;
pub mod memory;

pub use event::{Criticality, TranscriptEvent};
pub use fs::FsTranscript;
pub use memory::MemoryTranscript;

use async_trait::async_trait;
use rye_core::id::{DirectiveId, ThreadId};
use thiserror::Error;

/// Errors from transcript writes.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// A critical event failed to append.
    #[error("critical write failed for thread {thread_id}: {message}")]
    WriteFailed {
        /// Thread the write was for.
        thread_id: String,
        /// What went wrong.
        message: String,
    },

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Appends events to a per-thread transcript and assigns them strictly
/// monotonic sequence numbers.
///
/// Implementations:
/// - [`FsTranscript`]: JSONL file per thread, single-writer serialized
///   append, plus an incrementally-updated Markdown rendering.
/// - [`MemoryTranscript`]: in-memory `Vec`, used in tests.
#[async_trait]
pub trait TranscriptWriter: Send + Sync {
    /// Append a critical event. The thread must treat a failure here as
    /// fatal — the event is load-bearing for resume and for the
    /// registry row it corresponds to.
    async fn write_critical(
        &self,
        thread_id: &ThreadId,
        directive: &DirectiveId,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<u64, TranscriptError>;

    /// Append a droppable event, best-effort. Implementations MAY drop
    /// this event (e.g. a bounded queue is full) without returning an
    /// error — callers must not depend on droppable events landing.
    async fn write_droppable(
        &self,
        thread_id: &ThreadId,
        directive: &DirectiveId,
        event_type: &str,
        payload: serde_json::Value,
    );

    /// The highest sequence number written so far for this thread, or 0
    /// if nothing has been written yet.
    async fn last_seq(&self, thread_id: &ThreadId) -> u64;
}
