#![deny(missing_docs)]
//! The State Graph Walker (§4.13): a deterministic node-graph executor
//! implementing `rye_core::thread::Thread` alongside `rye_runner::ThreadRunner`.
//!
//! A directive can declare its process as a graph of nodes instead of a
//! model loop — each node dispatches at most one action through the Tool
//! Dispatcher, assigns results into state, and follows the first edge
//! whose condition is true. The walker persists a signed artifact after
//! every step and resumes from the latest one, the same role the Thread
//! Runner's checkpoint plays in the model-loop executor.

mod artifact;
mod error;
mod types;
mod walker;

pub use artifact::GraphArtifact;
pub use error::GraphError;
pub use types::{is_truthy, Edge, GraphDefinition, Node, NodeAction};
pub use walker::GraphWalker;
