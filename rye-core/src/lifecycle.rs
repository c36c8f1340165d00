//! Lifecycle events — cross-component coordination vocabulary.
//!
//! These are NOT a trait — they're a shared vocabulary. The Budget Ledger,
//! Safety Harness, and Continuation Manager each emit and/or consume these
//! events through whatever mechanism is appropriate (an mpsc channel, a
//! direct call, the transcript). There is no separate "lifecycle service":
//! lifecycle coordination is the Orchestrator's job (§4.10), listening for
//! these events and applying policy.

use crate::{content::Content, duration::DurationMs, effect::Scope, id::*};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Budget-related events (§4.2).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BudgetEvent {
    /// Emitted by the Thread Runner after each model call.
    CostIncurred {
        /// The thread that incurred the cost.
        thread: ThreadId,
        /// Cost of this individual turn.
        cost: Decimal,
        /// Cumulative spend so far for this thread.
        cumulative: Decimal,
    },
    /// Emitted by the Safety Harness when nearing a limit.
    BudgetWarning {
        /// The thread approaching its spend limit.
        thread: ThreadId,
        /// Amount spent so far.
        spent: Decimal,
        /// The spend limit.
        limit: Decimal,
    },
    /// Decision reached about budget pressure, typically via the `limit`
    /// hook event (§4.7).
    BudgetAction {
        /// The thread the decision applies to.
        thread: ThreadId,
        /// The budget decision.
        action: BudgetDecision,
    },
}

/// What the runtime decides to do about budget pressure.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetDecision {
    /// Continue as normal.
    Continue,
    /// Switch to a cheaper model for subsequent turns.
    DowngradeModel {
        /// The model being switched from.
        from: String,
        /// The model being switched to.
        to: String,
    },
    /// Suspend the thread pending approval (`escalate` hook action, §6.6).
    Suspend,
    /// Request more budget from the caller (`escalate` hook action,
    /// raises `proposed_max` from `limit_escalation_requested`).
    RequestIncrease {
        /// The additional amount requested.
        amount: Decimal,
    },
}

/// Context-pressure events — for Continuation Manager coordination (§4.11).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompactionEvent {
    /// Emitted by the Thread Runner when the context window is filling
    /// (`context_window_pressure` hook event, fires at fill ≥ 0.8).
    ContextPressure {
        /// The thread experiencing context pressure.
        thread: ThreadId,
        /// Fraction of the context window used, in `[0.0, 1.0]`.
        fill_ratio: f64,
        /// Tokens currently used.
        tokens_used: u64,
        /// Tokens still available.
        tokens_available: u64,
    },
    /// Emitted before compaction runs, to let observers flush anything
    /// that depends on seeing the pre-compaction scope.
    PreCompactionFlush {
        /// The thread about to compact.
        thread: ThreadId,
        /// The scope being flushed.
        scope: Scope,
    },
    /// Emitted after client-side compaction (sliding window, tool-result
    /// clearing, summarization) completes without a full handoff.
    CompactionComplete {
        /// The thread that completed compaction.
        thread: ThreadId,
        /// The compaction strategy used (e.g. `"sliding_window"`).
        strategy: String,
        /// Number of tokens freed.
        tokens_freed: u64,
    },
    /// Fill ratio crossed the handoff threshold (default 0.9): the
    /// Continuation Manager created a successor thread instead of
    /// compacting in place.
    HandoffCreated {
        /// The thread that completed via continuation.
        thread: ThreadId,
        /// The successor thread.
        successor: ThreadId,
        /// Summary content seeded into the successor, if any.
        summary: Option<Content>,
    },
}

/// Observability events — the common vocabulary every component emits
/// toward the facade's optional tracing/otel bridge (§10).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservableEvent {
    /// Which component emitted this.
    pub source: EventSource,
    /// Event type (free-form, namespaced by convention — usually one of
    /// the §6.5 transcript event type names).
    pub event_type: String,
    /// When it happened (milliseconds since thread start, not wall clock).
    pub timestamp: DurationMs,
    /// Event payload.
    pub data: serde_json::Value,
    /// Correlation ID across components.
    pub trace_id: Option<String>,
    /// Thread context.
    pub thread_id: Option<ThreadId>,
    /// Directive context.
    pub directive_id: Option<DirectiveId>,
}

/// Which component emitted an event.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// From the Thread Runner.
    Runner,
    /// From the Orchestrator.
    Orchestrator,
    /// From the Budget Ledger.
    Budget,
    /// From the Safety Harness.
    Safety,
    /// From the Hook Engine.
    Hook,
    /// From the Continuation Manager.
    Continuation,
}

impl ObservableEvent {
    /// Create a new observable event with required fields.
    pub fn new(
        source: EventSource,
        event_type: impl Into<String>,
        timestamp: DurationMs,
        data: serde_json::Value,
    ) -> Self {
        Self {
            source,
            event_type: event_type.into(),
            timestamp,
            data,
            trace_id: None,
            thread_id: None,
            directive_id: None,
        }
    }
}
