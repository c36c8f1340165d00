//! Errors from item resolution and dispatch.

use thiserror::Error;

/// Errors surfaced while resolving, verifying, or invoking an item.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No item matched `item_type`/`dotted_id` in any space.
    #[error("item not found: {item_type}/{dotted_id}")]
    NotFound {
        /// The item type searched for (e.g. `tool`).
        item_type: String,
        /// The dotted id searched for.
        dotted_id: String,
    },

    /// The item's signature failed verification and the space's trust
    /// policy does not opt in to unsigned/tampered items.
    #[error("signature verification failed for {0}")]
    UntrustedItem(String),

    /// The executor chain starting at an item referenced itself, directly
    /// or transitively.
    #[error("executor chain cycle detected at {0}")]
    ExecutorCycle(String),

    /// An `executor_id` pointed at an item that doesn't exist.
    #[error("executor not found: {0}")]
    ExecutorNotFound(String),

    /// The capability token does not authorize this action.
    #[error("capability denied: {0}")]
    CapabilityDenied(String),

    /// The underlying executor (subprocess, http_client, ...) failed.
    #[error("executor failed: {0}")]
    ExecutionFailed(String),

    /// Catch-all for errors from a custom executor implementation.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
