//! # rye-core — protocol traits for the rye thread-orchestration runtime
//!
//! This crate defines the protocol boundaries that the rest of the
//! workspace implements against. Nothing in here talks to a model
//! provider, a filesystem, or a network socket — it's the shared
//! vocabulary that lets `rye-runner`, `rye-orch`, `rye-registry`, and the
//! rest compose without depending on each other's concrete types.
//!
//! ## The Protocols
//!
//! | Protocol | Trait | What it does |
//! |----------|-------|-------------|
//! | ① Thread | [`Thread`] | Run one directive to a terminal status (§4.9) |
//! | ② Orchestration | [`Orchestrator`] | Compose directives into trees of threads (§4.10) |
//! | ③ State | [`StateStore`] | Persist thread records, checkpoints, knowledge artifacts |
//!
//! ## The Interfaces
//!
//! | Interface | Types | What it does |
//! |-----------|-------|-------------|
//! | ④ Hooks | [`Hook`], [`HookEvent`], [`HookAction`] | Observation + intervention (§4.7) |
//! | ⑤ Lifecycle | [`BudgetEvent`], [`CompactionEvent`], [`ObservableEvent`] | Cross-component coordination |
//!
//! ## Design Principle
//!
//! Every protocol trait is operation-defined, not mechanism-defined.
//! [`Thread::execute`] means "run this directive to completion" — not
//! "call an LLM API" or "walk a graph." An LLM tool-use loop
//! (`rye_runner::ThreadRunner`) and a deterministic node-graph executor
//! (`rye_graph::GraphWalker`) both implement the same trait; the
//! Orchestrator spawns either without knowing which it got.
//!
//! ## Dependency Notes
//!
//! This crate depends on `serde_json::Value` for extension data fields
//! (directive inputs/outputs, hook context extras, custom payloads).
//! JSON is the interchange format directive files and transcript events
//! already use (§6), so this isn't adding a format, just typing the one
//! already in play. The alternative (generic `T: Serialize`) would
//! complicate trait object safety without practical benefit.
//!
//! ## Future: Native Async Traits
//!
//! Protocol traits currently use `async-trait` (heap-allocated futures).
//! When Rust stabilizes `async fn` in `dyn Trait` with `Send` bounds,
//! these traits will migrate to native async. This will be a breaking
//! change in a minor version bump before v1.0.

#![deny(missing_docs)]

pub mod content;
pub mod duration;
pub mod effect;
pub mod error;
pub mod hook;
pub mod id;
pub mod interpolate;
pub mod lifecycle;
pub mod orchestrator;
pub mod state;
pub mod thread;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use content::{Content, ContentBlock, ImageSource};
pub use duration::DurationMs;
pub use effect::{Effect, LogLevel, Scope, SignalPayload};
pub use error::{ErrorCategory, HookError, OrchError, StateError, ThreadError};
pub use hook::{Hook, HookAction, HookContext, HookEvent};
pub use id::{ApprovalId, DirectiveId, ReservationId, ThreadId, TokenId};
pub use interpolate::{resolve_input_placeholders, resolve_path_placeholders, Namespaces};
pub use lifecycle::{BudgetDecision, BudgetEvent, CompactionEvent, EventSource, ObservableEvent};
pub use orchestrator::{Orchestrator, SpawnOverrides, WaitOutcome};
pub use state::{SearchResult, StateReader, StateStore};
pub use thread::{
    ExitReason, Thread, ThreadCost, ThreadInput, ThreadMetadata, ThreadOutput, ThreadStatus,
    ToolCallRecord,
};
