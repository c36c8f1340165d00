#![deny(missing_docs)]
//! Effect-execution glue (§4.14).
//!
//! A thread only ever *returns* effects — `WriteMemory`, `Delegate`,
//! `Signal`, ... — it never reaches into the registry, budget ledger, or
//! state store itself. Something has to turn those declared effects into
//! actual `Orchestrator`/`StateStore` calls. For an in-process deployment
//! that's this crate: [`OrchestratedRunner`] dispatches a directive,
//! collects the resulting effects, and interprets them (directly for
//! memory effects, as new dispatches for `Delegate`/`Handoff`) through a
//! pluggable [`EffectExecutor`] until nothing is left to follow up on.
//!
//! A host running threads out-of-process would serialize the same effects
//! onto whatever durable log or queue it uses instead of executing them
//! inline — this crate only covers the local, single-process shape.

mod kit;
mod runner;

pub use kit::Kit;
pub use runner::{
    default_wait, EffectExecutor, ExecutionEvent, ExecutionTrace, KitError, LocalEffectExecutor,
    OrchestratedRunner,
};
