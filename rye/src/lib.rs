#![deny(missing_docs)]
//! # rye — umbrella crate
//!
//! Provides a single import surface for the rye agent thread runtime.
//! Re-exports protocol and key implementations behind feature flags, plus a
//! `prelude` for the happy path.

#[cfg(feature = "core")]
pub use rye_capability;
#[cfg(feature = "core")]
pub use rye_core;
#[cfg(feature = "core")]
pub use rye_dispatch;
#[cfg(feature = "core")]
pub use rye_runner;
#[cfg(feature = "core")]
pub use rye_turn;
#[cfg(feature = "continuation")]
pub use rye_continuation;
#[cfg(feature = "graph")]
pub use rye_graph;
#[cfg(feature = "hooks")]
pub use rye_hooks;
#[cfg(feature = "orch-local")]
pub use rye_orch;
#[cfg(feature = "orch-kit")]
pub use rye_orch_kit;
#[cfg(feature = "provider-anthropic")]
pub use rye_provider_anthropic;
#[cfg(feature = "provider-ollama")]
pub use rye_provider_ollama;
#[cfg(feature = "provider-openai")]
pub use rye_provider_openai;
#[cfg(feature = "registry-fs")]
pub use rye_registry;
#[cfg(feature = "registry-memory")]
pub use rye_registry_memory;
#[cfg(feature = "budget")]
pub use rye_budget;
#[cfg(feature = "checkpoint")]
pub use rye_checkpoint;
#[cfg(feature = "safety")]
pub use rye_safety;
#[cfg(feature = "transcript")]
pub use rye_transcript;

/// Happy-path imports for composing rye-based agent systems.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use rye_capability::{CapabilityToken, Pattern, RatedPattern, RiskTier};
    #[cfg(feature = "core")]
    pub use rye_core::effect::{Effect, Scope};
    #[cfg(feature = "core")]
    pub use rye_core::id::ThreadId;
    #[cfg(feature = "core")]
    pub use rye_core::state::StateStore;
    #[cfg(feature = "core")]
    pub use rye_core::thread::{ExitReason, Thread, ThreadInput, ThreadOutput, ThreadStatus};

    #[cfg(feature = "core")]
    pub use rye_dispatch::{Dispatcher, DispatchResult, Executor, ExecutorRegistry, ItemStore};

    #[cfg(feature = "core")]
    pub use rye_turn::provider::{Provider, ProviderError};

    #[cfg(feature = "core")]
    pub use rye_runner::{DirectiveSpec, ThreadRunner};

    #[cfg(feature = "hooks")]
    pub use rye_hooks::HookRegistry;

    #[cfg(feature = "graph")]
    pub use rye_graph::GraphWalker;

    #[cfg(feature = "orch-local")]
    pub use rye_orch::LocalOrchestrator;

    #[cfg(feature = "orch-kit")]
    pub use rye_orch_kit::{Kit, OrchestratedRunner};

    #[cfg(feature = "registry-memory")]
    pub use rye_registry_memory::MemoryStore;

    #[cfg(feature = "registry-fs")]
    pub use rye_registry::FsStore;
}
