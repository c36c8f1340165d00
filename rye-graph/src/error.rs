//! Errors surfaced by the walker, composing its collaborators' errors
//! the way the rest of the workspace composes component-boundary errors.

use rye_core::error::{StateError, ThreadError};
use rye_dispatch::DispatchError;
use thiserror::Error;

/// Errors from constructing or resuming a [`crate::GraphWalker`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum GraphError {
    /// The graph has no node named `start`, or an edge points at a
    /// node that doesn't exist.
    #[error("no such node: {0}")]
    NoSuchNode(String),

    /// A dispatch against the Tool Dispatcher failed.
    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// Reading or writing the persisted artifact failed.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Catch-all, also convertible into [`ThreadError`] at the `Thread`
    /// boundary.
    #[error("{0}")]
    Other(String),
}

impl From<GraphError> for ThreadError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Dispatch(e) => ThreadError::Tool { tool: "graph_action".to_string(), message: e.to_string() },
            other => ThreadError::NonRetryable(other.to_string()),
        }
    }
}
