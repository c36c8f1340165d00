#![deny(missing_docs)]
//! Provider-facing message types, content conversion, and context
//! strategy for the rye thread runner (§4.9).
//!
//! This crate does not implement `rye_core::thread::Thread` itself —
//! that's `rye-runner`, which is generic over the [`Provider`] trait
//! defined here. What lives here is the internal lingua franca a
//! runner needs regardless of which model backend it talks to: request
//! and response shapes, content conversion to and from `rye_core`, and
//! the context-compaction seam.
//!
//! Key traits defined here:
//! - [`Provider`] — LLM provider interface (not object-safe, uses RPITIT)
//! - [`ContextStrategy`] — context window management

pub mod config;
pub mod context;
pub mod convert;
pub mod provider;
pub mod types;

// Re-exports
pub use config::RunnerConfig;
pub use context::{ContextStrategy, NoCompaction};
pub use convert::{
    content_block_to_part, content_part_to_block, content_to_parts, content_to_user_message,
    parts_to_content,
};
pub use provider::{Provider, ProviderError};
pub use types::*;
