//! In-memory [`TranscriptWriter`] for tests.

use crate::event::TranscriptEvent;
use crate::{TranscriptError, TranscriptWriter};
use async_trait::async_trait;
use rye_core::id::{DirectiveId, ThreadId};
use std::collections::HashMap;
use std::sync::Mutex;

/// Stores every event in memory, keyed by thread. Never drops droppable
/// events — tests that need to assert on them can rely on `events()`
/// returning everything written.
#[derive(Default)]
pub struct MemoryTranscript {
    threads: Mutex<HashMap<String, Vec<TranscriptEvent>>>,
}

impl MemoryTranscript {
    /// An empty transcript store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded for `thread_id`, in write order.
    pub fn events(&self, thread_id: &ThreadId) -> Vec<TranscriptEvent> {
        self.threads
            .lock()
            .unwrap()
            .get(thread_id.as_str())
            .cloned()
            .unwrap_or_default()
    }

    fn push(
        &self,
        thread_id: &ThreadId,
        directive: &DirectiveId,
        event_type: &str,
        payload: serde_json::Value,
    ) -> u64 {
        let mut threads = self.threads.lock().unwrap();
        let events = threads.entry(thread_id.as_str().to_string()).or_default();
        let seq = events.len() as u64 + 1;
        events.push(TranscriptEvent {
            seq,
            ts: 0,
            thread_id: thread_id.clone(),
            directive: directive.clone(),
            event_type: event_type.to_string(),
            payload,
        });
        seq
    }
}

#[async_trait]
impl TranscriptWriter for MemoryTranscript {
    async fn write_critical(
        &self,
        thread_id: &ThreadId,
        directive: &DirectiveId,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<u64, TranscriptError> {
        Ok(self.push(thread_id, directive, event_type, payload))
    }

    async fn write_droppable(
        &self,
        thread_id: &ThreadId,
        directive: &DirectiveId,
        event_type: &str,
        payload: serde_json::Value,
    ) {
        self.push(thread_id, directive, event_type, payload);
    }

    async fn last_seq(&self, thread_id: &ThreadId) -> u64 {
        self.threads
            .lock()
            .unwrap()
            .get(thread_id.as_str())
            .map(|events| events.len() as u64)
            .unwrap_or(0)
    }
}
