#![deny(missing_docs)]
//! State checkpointing for the thread runner loop.
//!
//! After every turn the runner serializes its loop-local state to a
//! checkpoint via write-temp-then-rename, so a crashed or killed
//! thread can resume from the last completed turn instead of restarting
//! the directive from scratch. Checkpoints are written through
//! `rye-core`'s `StateStore` trait, so the same `Checkpointer` works
//! against an in-memory store in tests and a filesystem store in
//! production — the atomicity guarantee lives in the store
//! implementation, not here.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rye_core::effect::Scope;
use rye_core::error::StateError;
use rye_core::id::{DirectiveId, ThreadId};
use rye_core::state::StateStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const CHECKPOINT_KEY: &str = "checkpoint";

/// The turn-limit configuration a thread was started with.
///
/// Captured verbatim in every checkpoint so resume doesn't need the
/// caller to re-supply limits that may have changed since the thread
/// was spawned.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LimitConfig {
    /// Maximum number of LLM turns, if bounded.
    pub max_turns: Option<u32>,
    /// Maximum cumulative spend, if bounded.
    pub max_spend: Option<Decimal>,
    /// Maximum input+output tokens, if bounded.
    pub max_tokens: Option<u64>,
}

/// A resumable snapshot of one thread's loop-local state.
///
/// Everything needed to reconstruct the runner loop without
/// re-invoking the LLM: cumulative costs, the limits the thread is
/// running under, the hook configuration in effect, accumulated
/// messages, the last transcript sequence number observed, and the
/// id of the thread this one continues from (if any).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    /// The thread this checkpoint belongs to.
    pub thread_id: ThreadId,
    /// The directive the thread is executing.
    pub directive_id: DirectiveId,
    /// Turns completed so far.
    pub turns_completed: u32,
    /// Cumulative spend so far.
    pub cumulative_spend: Decimal,
    /// Cumulative input tokens so far.
    pub cumulative_input_tokens: u64,
    /// Cumulative output tokens so far.
    pub cumulative_output_tokens: u64,
    /// The limits this thread is running under.
    pub limits: LimitConfig,
    /// Opaque hook configuration, serialized as the Hook Engine defines it.
    pub hook_config: serde_json::Value,
    /// Accumulated provider messages, serialized as the Thread Runner defines them.
    pub messages: serde_json::Value,
    /// The highest transcript sequence number this thread has written.
    pub last_transcript_seq: u64,
    /// The thread this one is a continuation of, if any.
    pub continuation_of: Option<ThreadId>,
}

/// Error conditions surfaced by the checkpointer.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// The underlying store rejected the read or write.
    #[error("state store error: {0}")]
    Store(#[from] StateError),
    /// A stored checkpoint failed to deserialize.
    #[error("corrupt checkpoint for {thread_id}: {message}")]
    Corrupt {
        /// The thread the checkpoint belongs to.
        thread_id: String,
        /// What went wrong deserializing it.
        message: String,
    },
}

/// Saves and resumes thread checkpoints against a `StateStore` backend.
pub struct Checkpointer {
    store: Arc<dyn StateStore>,
}

impl Checkpointer {
    /// Wrap a `StateStore` backend as a checkpointer.
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Persist a checkpoint, overwriting any prior checkpoint for the same thread.
    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let scope = Scope::Thread(checkpoint.thread_id.clone());
        let value = serde_json::to_value(checkpoint).map_err(|e| CheckpointError::Corrupt {
            thread_id: checkpoint.thread_id.as_str().to_string(),
            message: e.to_string(),
        })?;
        self.store.write(&scope, CHECKPOINT_KEY, value).await?;
        Ok(())
    }

    /// Load the most recent checkpoint for a thread, if one exists.
    pub async fn resume(&self, thread_id: &ThreadId) -> Result<Option<Checkpoint>, CheckpointError> {
        let scope = Scope::Thread(thread_id.clone());
        match self.store.read(&scope, CHECKPOINT_KEY).await? {
            None => Ok(None),
            Some(value) => {
                let checkpoint: Checkpoint =
                    serde_json::from_value(value).map_err(|e| CheckpointError::Corrupt {
                        thread_id: thread_id.as_str().to_string(),
                        message: e.to_string(),
                    })?;
                Ok(Some(checkpoint))
            }
        }
    }

    /// Drop the checkpoint for a completed thread.
    ///
    /// Called once a thread reaches a terminal status so the store
    /// doesn't accumulate checkpoints for threads that will never
    /// resume.
    pub async fn clear(&self, thread_id: &ThreadId) -> Result<(), CheckpointError> {
        let scope = Scope::Thread(thread_id.clone());
        self.store.delete(&scope, CHECKPOINT_KEY).await?;
        Ok(())
    }
}

/// Anything that can produce a checkpoint of its current loop state.
///
/// Implemented by the Thread Runner and the State Graph Walker so the
/// Checkpointer doesn't need to know which kind of loop it's saving.
#[async_trait]
pub trait Checkpointable {
    /// Produce a checkpoint capturing the current loop state.
    fn checkpoint(&self) -> Checkpoint;
}
