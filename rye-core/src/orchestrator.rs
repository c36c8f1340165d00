//! The Orchestrator protocol — how directives compose into trees of threads (§4.10).

use crate::{
    duration::DurationMs,
    effect::SignalPayload,
    error::OrchError,
    id::*,
    thread::{ThreadInput, ThreadOutput, ThreadStatus},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Overrides a caller may apply when spawning a child thread — a subset
/// of `ThreadConfig` the parent is allowed to narrow but never widen
/// (the Capability Matcher still governs the actual ceiling, §4.1).
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnOverrides {
    /// Narrow the child's max turns below the directive default.
    pub max_turns: Option<u32>,
    /// Narrow the child's max spend below the directive default.
    pub max_spend: Option<rust_decimal::Decimal>,
    /// Run detached: `spawn_thread` returns as soon as the thread is
    /// registered, without waiting for a terminal status.
    pub detached: bool,
}

/// Outcome of waiting on one or more threads (§4.10's `wait_threads`).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitOutcome {
    /// Per-thread result, in the same order as the ids given to `wait_threads`.
    /// `None` means the thread did not reach a terminal status before the
    /// timeout elapsed.
    pub results: Vec<Option<ThreadOutput>>,
    /// True only if every thread in `results` completed with
    /// `ThreadStatus::Completed`.
    pub aggregate_success: bool,
}

/// Protocol ② — Orchestration (§4.10).
///
/// How directives compose into trees of threads, and how a parent waits
/// on, aggregates, or kills its children. The Orchestrator doesn't run
/// threads itself — it holds a `Thread` implementation (via whatever
/// wiring the embedding crate chooses, see `rye_orch_kit::Kit`) and a
/// `StateStore`-backed Thread Registry, and coordinates between them.
///
/// Implementations:
/// - `rye_orch::LocalOrchestrator`: in-process, tokio tasks, no durability
///   beyond what the Thread Registry persists.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Start a new thread running `directive` with `input`, applying
    /// `overrides` on top of the directive's declared defaults. Registers
    /// the thread (Thread Registry, §4.3) before returning.
    ///
    /// When `overrides.detached` is false (the default), the returned id
    /// identifies a thread that is running or about to run; the caller
    /// must still `wait_threads` to observe its terminal status.
    async fn spawn_thread(
        &self,
        directive: &DirectiveId,
        input: ThreadInput,
        overrides: SpawnOverrides,
    ) -> Result<ThreadId, OrchError>;

    /// Block until every thread in `ids` reaches a terminal status, or
    /// `timeout` elapses, whichever comes first. Threads that finish
    /// before the timeout are included in `WaitOutcome::results`; threads
    /// still running at timeout map to `None`.
    async fn wait_threads(
        &self,
        ids: &[ThreadId],
        timeout: DurationMs,
    ) -> Result<WaitOutcome, OrchError>;

    /// Collect the outputs of threads that have already reached a
    /// terminal status, without waiting. Threads still running, or not
    /// found, map to `None`.
    async fn aggregate_results(
        &self,
        ids: &[ThreadId],
    ) -> Result<Vec<Option<ThreadOutput>>, OrchError>;

    /// Current status of a single thread, from the Thread Registry.
    async fn get_status(&self, id: &ThreadId) -> Result<ThreadStatus, OrchError>;

    /// All threads not yet in a terminal status.
    async fn list_active(&self) -> Result<Vec<ThreadId>, OrchError>;

    /// Terminate a running thread. The thread transitions to
    /// `ThreadStatus::Cancelled`; any children it spawned are not
    /// automatically killed (callers that want cascading cancellation
    /// call `kill_thread` on each descendant themselves).
    async fn kill_thread(&self, id: &ThreadId) -> Result<(), OrchError>;

    /// Fire-and-forget signal to a running thread — inter-thread
    /// messaging, budget adjustments, user feedback injection.
    ///
    /// Returns `Ok(())` once the signal is accepted, not once it's
    /// processed (that happens asynchronously, observed at the next
    /// `StepStart` hook event).
    async fn signal(&self, target: &ThreadId, signal: SignalPayload) -> Result<(), OrchError>;
}
