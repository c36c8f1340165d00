#![deny(missing_docs)]
//! The Thread Runner — model + tools in a capability- and budget-bounded
//! loop (§4.9).
//!
//! A [`ThreadRunner`] implements `rye_core::thread::Thread` by driving a
//! single directive through repeated turns: assemble a request, call the
//! provider, dispatch any tool calls it asks for, record usage against a
//! [`rye_safety::SafetyHarness`], checkpoint, and check limits — until the
//! model stops asking for tools, a limit is hit, or the context window
//! fills enough to hand off to a successor thread.
//!
//! The loop is generic over `rye_turn::Provider` rather than boxing it,
//! since `Provider::complete` returns `impl Future` and isn't object-safe;
//! `Thread` itself is the object-safe boundary callers (the Orchestrator,
//! the State Graph Walker) actually hold onto.

pub mod directive;
pub mod effects;
pub mod prompt;
pub mod registry;
pub mod runner;

pub use directive::{DirectiveSpec, InputSpec};
pub use effects::{effect_action_string, effect_tool_schemas, try_as_effect, EFFECT_TOOL_NAMES};
pub use prompt::build_system_prompt;
pub use registry::{
    create, get, list_active, list_by_parent, resolve_chain, set_continuation_next, update_status,
    write_entry, RegistryEntry, RegistryError, RegistryStatus, REGISTRY_KEY,
};
pub use runner::ThreadRunner;
