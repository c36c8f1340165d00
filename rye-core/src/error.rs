//! Shared error vocabulary for the protocol layer.
//!
//! Each downstream component (`rye-runner`, `rye-orch`, `rye-registry`, ...)
//! defines its own local `thiserror` enum for its own boundary (§12 of
//! SPEC_FULL.md); this module holds only the handful of error types that
//! cross the protocol traits themselves, plus the error-category taxonomy
//! (§7) that the Safety Harness classifies every failure into.

use thiserror::Error;

/// Errors from a [`crate::thread::Thread`] execution.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ThreadError {
    /// An error from the model/LLM provider.
    #[error("model error: {0}")]
    Model(String),

    /// An error during tool dispatch.
    #[error("tool error in {tool}: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Error message.
        message: String,
    },

    /// Context/prompt assembly failed before the model call.
    #[error("context assembly failed: {0}")]
    ContextAssembly(String),

    /// The thread failed but retrying might succeed; the caller's retry
    /// policy (driven by `ErrorCategory`) decides.
    #[error("retryable: {0}")]
    Retryable(String),

    /// The thread failed and retrying won't help (budget exceeded,
    /// invalid input, integrity failure).
    #[error("non-retryable: {0}")]
    NonRetryable(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Orchestration errors (§4.10).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum OrchError {
    /// The requested thread was not found in the registry.
    #[error("thread not found: {0}")]
    ThreadNotFound(String),

    /// The requested directive was not found.
    #[error("directive not found: {0}")]
    DirectiveNotFound(String),

    /// Spawning a child thread failed.
    #[error("spawn failed: {0}")]
    SpawnFailed(String),

    /// Signal delivery failed.
    #[error("signal delivery failed: {0}")]
    SignalFailed(String),

    /// A thread error propagated through orchestration.
    #[error("thread error: {0}")]
    ThreadError(#[from] ThreadError),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// State-store errors (backs both the Thread Registry and the State
/// Checkpointer, §4.3/§4.5).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StateError {
    /// Key not found in the given scope.
    #[error("not found: {scope}/{key}")]
    NotFound {
        /// The scope that was searched.
        scope: String,
        /// The key that was not found.
        key: String,
    },

    /// A write operation failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Hook errors. These are logged but do NOT halt the thread — the Hook
/// Engine falls back to the built-in default action for the event
/// (use `HookAction::Fail`/`Abort` from inside a hook to halt deliberately).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook execution failed.
    #[error("hook failed: {0}")]
    Failed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// The error taxonomy of §7, named by category. Every failure observed
/// by the Safety Harness's `classify_error` is mapped onto exactly one
/// of these; the category drives both the default hook action and the
/// retry policy.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Recoverable with retry (network blips, 5xx, timeouts).
    Transient,
    /// Retry with backoff, honoring provider-supplied retry-after if present.
    RateLimited,
    /// Blocks retry until external state changes; default action suspend.
    Quota,
    /// Non-retryable (auth, malformed request); default action fail.
    Permanent,
    /// Safety-harness limit reached; default action suspend with escalation.
    LimitHit,
    /// Budget ledger denied a reservation; default action fail.
    Budget,
    /// External cancellation observed; terminate with status `cancelled`.
    Cancelled,
    /// Signature or hash verification failed; always fatal, no retry.
    Integrity,
    /// Capability check failed. NOT thread-terminating — routed back to
    /// the model as a structured tool-result.
    PermissionDenied,
}

impl ErrorCategory {
    /// Whether this category is, in principle, retryable at all. Even
    /// when `true`, the Hook Engine's configured `max_attempts` still
    /// bounds the number of retries.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorCategory::Transient | ErrorCategory::RateLimited)
    }

    /// Whether this category terminates the thread by default (§7's
    /// propagation policy), absent a hook override.
    pub fn is_fatal_by_default(self) -> bool {
        matches!(
            self,
            ErrorCategory::Integrity | ErrorCategory::Permanent | ErrorCategory::Budget
        )
    }
}
