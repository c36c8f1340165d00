//! Effect system — side-effects declared by a thread for external execution.

use crate::id::*;
use serde::{Deserialize, Serialize};

/// A side-effect declared by a thread step. NOT executed by the thread
/// itself — the calling layer (the Orchestrator, §4.10) decides when and
/// how to execute it.
///
/// This is the key composability mechanism: the Thread Runner loop only
/// ever *returns* effects (`spawn_thread`, `write_memory`, ...); it never
/// reaches into the registry or budget ledger directly. A thread running
/// in-process has its effects executed by a simple loop
/// (`rye_orch_kit::OrchestratedRunner`); a thread running under a
/// different host can serialize effects into whatever durable log that
/// host uses.
///
/// The `Custom` variant ensures future effect types can be represented
/// without changing the enum.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Write a knowledge artifact to persistent state.
    WriteMemory {
        /// The scope to write into.
        scope: Scope,
        /// The key to write.
        key: String,
        /// The value to store.
        value: serde_json::Value,
    },

    /// Delete a knowledge artifact from persistent state.
    DeleteMemory {
        /// The scope to delete from.
        scope: Scope,
        /// The key to delete.
        key: String,
    },

    /// Send a fire-and-forget signal to another thread.
    Signal {
        /// The target thread to signal.
        target: ThreadId,
        /// The signal payload.
        payload: SignalPayload,
    },

    /// Request that the orchestrator spawn a child thread.
    /// The current thread doesn't spawn the child directly — it asks
    /// the orchestrator to, so that budget reservation, registry
    /// insertion, and capability minting happen under one authority.
    Delegate {
        /// The directive to run as a child thread.
        directive: DirectiveId,
        /// The input to send to the child thread.
        input: Box<crate::thread::ThreadInput>,
    },

    /// Hand the current thread's work off to a successor thread. Unlike
    /// `Delegate`, the current thread is done — the successor continues
    /// under `continuation_of`/`continuation_next` (§4.11).
    Handoff {
        /// The directive the successor thread runs (normally identical
        /// to the current thread's directive).
        directive: DirectiveId,
        /// Seed state handed to the successor. This is NOT the full
        /// conversation — it's the summary and whatever else the
        /// Continuation Manager decided the successor needs.
        state: serde_json::Value,
    },

    /// Emit a log/trace event. Observers and telemetry consume these.
    Log {
        /// Severity level.
        level: LogLevel,
        /// Log message.
        message: String,
        /// Optional structured data.
        data: Option<serde_json::Value>,
    },

    /// Future effect types. Named string + arbitrary payload.
    Custom {
        /// The custom effect type identifier.
        effect_type: String,
        /// Arbitrary payload.
        data: serde_json::Value,
    },
}

/// Where state lives. Scopes are hierarchical — a thread scope is
/// narrower than a directive scope, which is narrower than global.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Per-thread (this run only).
    Thread(ThreadId),
    /// Shared by every thread running a given directive.
    Directive(DirectiveId),
    /// Shared across all directives.
    Global,
    /// Future scopes.
    Custom(String),
}

/// Payload for inter-thread signals.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalPayload {
    /// The type of signal being sent.
    pub signal_type: String,
    /// Signal data.
    pub data: serde_json::Value,
}

impl SignalPayload {
    /// Create a new signal payload.
    pub fn new(signal_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            signal_type: signal_type.into(),
            data,
        }
    }
}

/// Log severity levels, mirrored onto `tracing`'s levels (§10).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Finest-grained tracing.
    Trace,
    /// Debug-level detail.
    Debug,
    /// Informational messages.
    Info,
    /// Warnings.
    Warn,
    /// Errors.
    Error,
}
