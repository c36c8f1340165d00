//! Filesystem-backed [`TranscriptWriter`]: one JSONL file per thread,
//! writes serialized through a per-instance lock, plus an incrementally
//! updated Markdown rendering that is never read back.

use crate::event::TranscriptEvent;
use crate::{TranscriptError, TranscriptWriter};
use async_trait::async_trait;
use rye_core::id::{DirectiveId, ThreadId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Per-thread sequence counters plus a write lock, so concurrent writers
/// (the Runner's main loop and a droppable-event producer) never
/// interleave partial lines within one thread's journal.
struct ThreadState {
    seq: AtomicU64,
    write_lock: Mutex<()>,
}

/// Writes transcripts under `<root>/<thread_id>/{transcript.jsonl,transcript.md}`,
/// matching the filesystem layout's `threads/<thread_id>/` convention.
pub struct FsTranscript {
    root: PathBuf,
    threads: Mutex<HashMap<String, std::sync::Arc<ThreadState>>>,
}

impl FsTranscript {
    /// Create a transcript writer rooted at `root` (normally
    /// `<runtime_state>/threads`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            threads: Mutex::new(HashMap::new()),
        }
    }

    fn thread_dir(&self, thread_id: &ThreadId) -> PathBuf {
        self.root.join(thread_id.as_str())
    }

    async fn state_for(&self, thread_id: &ThreadId) -> std::sync::Arc<ThreadState> {
        let mut threads = self.threads.lock().await;
        threads
            .entry(thread_id.as_str().to_string())
            .or_insert_with(|| {
                std::sync::Arc::new(ThreadState {
                    seq: AtomicU64::new(0),
                    write_lock: Mutex::new(()),
                })
            })
            .clone()
    }

    async fn append(
        &self,
        thread_id: &ThreadId,
        directive: &DirectiveId,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<u64, TranscriptError> {
        let state = self.state_for(thread_id).await;
        let _guard = state.write_lock.lock().await;

        let seq = state.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let event = TranscriptEvent {
            seq,
            ts: now_ms(),
            thread_id: thread_id.clone(),
            directive: directive.clone(),
            event_type: event_type.to_string(),
            payload,
        };

        let dir = self.thread_dir(thread_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| write_failed(thread_id, e))?;

        let mut line = serde_json::to_string(&event).map_err(|e| write_failed(thread_id, e))?;
        line.push('\n');

        let mut jsonl = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("transcript.jsonl"))
            .await
            .map_err(|e| write_failed(thread_id, e))?;
        jsonl
            .write_all(line.as_bytes())
            .await
            .map_err(|e| write_failed(thread_id, e))?;
        jsonl.flush().await.map_err(|e| write_failed(thread_id, e))?;

        append_markdown(&dir, &event).await;

        Ok(seq)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_failed(thread_id: &ThreadId, e: impl std::fmt::Display) -> TranscriptError {
    TranscriptError::WriteFailed {
        thread_id: thread_id.as_str().to_string(),
        message: e.to_string(),
    }
}

/// Best-effort human-readable rendering. Never the source of truth — a
/// failure here is swallowed rather than propagated.
async fn append_markdown(dir: &Path, event: &TranscriptEvent) {
    let rendered = format!(
        "**#{} [{}]** `{}`\n\n```json\n{}\n```\n\n",
        event.seq,
        event.ts,
        event.event_type,
        serde_json::to_string_pretty(&event.payload).unwrap_or_default()
    );
    if let Ok(mut file) = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("transcript.md"))
        .await
    {
        let _ = file.write_all(rendered.as_bytes()).await;
    }
}

#[async_trait]
impl TranscriptWriter for FsTranscript {
    async fn write_critical(
        &self,
        thread_id: &ThreadId,
        directive: &DirectiveId,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<u64, TranscriptError> {
        self.append(thread_id, directive, event_type, payload).await
    }

    async fn write_droppable(
        &self,
        thread_id: &ThreadId,
        directive: &DirectiveId,
        event_type: &str,
        payload: serde_json::Value,
    ) {
        // Droppable events degrade to best-effort: a failed append is
        // swallowed rather than surfaced, matching the "fire-and-forget"
        // contract.
        let _ = self.append(thread_id, directive, event_type, payload).await;
    }

    async fn last_seq(&self, thread_id: &ThreadId) -> u64 {
        let threads = self.threads.lock().await;
        threads
            .get(thread_id.as_str())
            .map(|s| s.seq.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}
