//! The Thread protocol — what the Thread Runner does per directive execution (§4.9).
//!
//! This is protocol boundary ① from the teacher design: an
//! operation-defined trait, not a mechanism-defined one. `Thread::execute`
//! means "run this directive to a terminal status" — not "make an HTTP
//! call" or "spawn a subprocess." `rye_runner::ThreadRunner` is the one
//! real implementation in this workspace; a deterministic test double or
//! a future alternate executor (the State Graph Walker wraps a different
//! loop around the same trait) can stand in without the Orchestrator
//! knowing the difference.

use crate::{
    duration::DurationMs,
    effect::Effect,
    error::ThreadError,
    id::{DirectiveId, ThreadId},
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Thread status (§3). A thread is created in `Running` and transitions
/// to a terminal state in exactly one place: the Runner's cleanup step.
/// Only `Paused` → `Running` reopens a terminal-looking state (resume).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    /// Actively looping.
    Running,
    /// Suspended by the caller, resumable without losing state.
    Paused,
    /// Reached a terminal success state.
    Completed,
    /// Reached a terminal failure state.
    Error,
    /// Suspended by the runtime (limit hit awaiting escalation, or a
    /// hook's explicit `suspend` action).
    Suspended,
    /// Terminated by external cancellation.
    Cancelled,
}

/// Why a thread reached its terminal (or suspended) status. More granular
/// than [`ThreadStatus`] — several `ExitReason`s map onto `ThreadStatus::Error`
/// or `::Suspended`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExitReason {
    /// Model reached `end_turn` with no pending tool calls.
    Complete,
    /// `max_turns` reached without an override.
    MaxTurns,
    /// Budget ledger denied further spend.
    BudgetExhausted,
    /// A safety-harness limit was hit and no hook overrode the default.
    LimitHit {
        /// Which limit (`max_turns`, `max_tokens`, `max_spend`, ...).
        limit_code: String,
    },
    /// Context pressure crossed the handoff threshold; work continues
    /// on a successor thread (§4.11).
    ContinuationHandoff {
        /// The successor thread's id.
        successor: ThreadId,
    },
    /// A hook fired `HookAction::Abort`/`Fail`/observer tripwire.
    ObserverHalt {
        /// Reason given by the hook.
        reason: String,
    },
    /// An `escalate` approval request was denied.
    ApprovalDenied {
        /// Message from the approval response, if any.
        message: Option<String>,
    },
    /// Integrity check failed (signature/hash mismatch) — always fatal.
    Integrity,
    /// External cancellation observed.
    Cancelled,
    /// Any other classified error not covered above.
    Error {
        /// Error category from the taxonomy (§7).
        category: String,
        /// Error message.
        message: String,
    },
}

/// Input to a single thread execution (§4.9 contract).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadInput {
    /// The directive to run.
    pub directive: DirectiveId,
    /// Directive input values, keyed by input name.
    pub inputs: serde_json::Value,
    /// The parent's capability token, serialized opaquely — `rye-core`
    /// doesn't know the token format, only that it gets threaded through
    /// to whoever mints the child token (`rye-capability`).
    pub parent_token: Option<Vec<u8>>,
    /// The budget reservation the parent made for this thread before
    /// spawning it (absent for the root thread).
    pub parent_reservation: Option<crate::id::ReservationId>,
    /// Opaque checkpoint state to resume from, if this is a resume
    /// rather than a fresh start.
    pub resume_state: Option<serde_json::Value>,
}

/// Accumulated cost for a thread (§3 cost totals).
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadCost {
    /// Number of turns executed.
    pub turns: u32,
    /// Cumulative input tokens.
    pub input_tokens: u64,
    /// Cumulative output tokens.
    pub output_tokens: u64,
    /// Cumulative spend in USD.
    pub spend: Decimal,
    /// Wall-clock duration.
    pub duration: DurationMs,
}

/// Record of one tool call within a thread's execution.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Correlates `tool_call_start` with `tool_call_result` (§6.5).
    pub call_id: String,
    /// Tool name.
    pub tool: String,
    /// Tool input.
    pub input: serde_json::Value,
    /// Tool output, if it completed.
    pub output: Option<String>,
    /// Error message, if it failed or was denied.
    pub error: Option<String>,
    /// Wall-clock duration of the dispatch.
    pub duration: DurationMs,
}

/// Metadata about how the execution went, beyond cost (§3/§6.4).
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadMetadata {
    /// Every tool call made during this execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Effects declared but not yet executed by the caller (§4.9's
    /// note that the thread declares effects, it does not execute them).
    pub effects: Vec<Effect>,
}

/// Output of a single thread execution (§4.9 contract).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadOutput {
    /// Terminal (or suspended) status.
    pub status: ThreadStatus,
    /// Why that status was reached.
    pub exit_reason: ExitReason,
    /// Structured outputs parsed from the final assistant message against
    /// the directive's declared schema. `None` on parse failure — parse
    /// failure does not fail the thread (§4.9, "Output extraction").
    pub outputs: Option<serde_json::Value>,
    /// Present when `outputs` is `None` because parsing failed.
    pub parse_error: Option<String>,
    /// Accumulated cost.
    pub cost: ThreadCost,
    /// Execution metadata.
    pub metadata: ThreadMetadata,
}

/// Protocol ① — Thread.
///
/// Implementations:
/// - `rye_runner::ThreadRunner`: the LLM tool-use loop (§4.9).
/// - `rye_graph::GraphWalker`: the deterministic node-graph executor (§4.13).
///
/// Both implement the same trait so the Orchestrator (§4.10) can spawn
/// either kind of thread without knowing which executor a directive uses.
#[async_trait]
pub trait Thread: Send + Sync {
    /// Run the directive to a terminal status and return its outcome.
    async fn execute(&self, input: ThreadInput) -> Result<ThreadOutput, ThreadError>;
}
