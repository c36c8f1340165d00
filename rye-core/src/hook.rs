//! The Hook interface — observation and intervention in the thread's inner loop (§4.7).

use crate::{content::Content, error::HookError, id::ThreadId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Points in the Thread Runner loop (§4.9) and State Graph Walker loop
/// (§4.13) where a hook event fires.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    /// Thread created, registry entry written, transcript opened.
    ThreadStarted,
    /// Beginning of a turn, before the model is invoked.
    StepStart,
    /// A turn finished (tool calls dispatched, usage recorded).
    AfterStep,
    /// The thread reached a terminal status.
    AfterComplete,
    /// A dispatch or inference error was classified (§7).
    Error,
    /// An accumulator crossed its configured ceiling (§4.6).
    Limit,
    /// Context-window fill ratio crossed the compaction threshold (§4.11).
    ContextWindowPressure,
    /// A directive invoked synchronously via `call_directive` returned.
    DirectiveReturn,
    /// A State Graph Walker run started.
    GraphStarted,
    /// A State Graph Walker run completed.
    GraphCompleted,
}

/// Read-only context available to a hook at its firing point. Hooks
/// observe and decide; they don't mutate state directly — mutation is
/// expressed through the returned [`HookAction`].
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookContext {
    /// Which event fired.
    pub event: HookEvent,
    /// The thread this event concerns.
    pub thread_id: ThreadId,
    /// Current turn number, if applicable.
    pub turn_number: Option<u32>,
    /// Tool under consideration (only at tool-adjacent events, surfaced
    /// through the `error` payload when a dispatch fails).
    pub tool_name: Option<String>,
    /// Model output for the current turn, if any.
    pub model_output: Option<Content>,
    /// Running count of tokens used by this thread.
    pub tokens_used: u64,
    /// Running spend in USD for this thread.
    pub cost: rust_decimal::Decimal,
    /// Time elapsed since the thread started.
    pub elapsed: crate::duration::DurationMs,
    /// Error-classification category, set only for the `error` event.
    pub error_category: Option<String>,
    /// Limit code (`max_turns`, `max_tokens`, `max_spend`, ...), set only
    /// for the `limit` event.
    pub limit_code: Option<String>,
    /// Context-window fill ratio in `[0.0, 1.0]`, set only for
    /// `context_window_pressure`.
    pub fill_ratio: Option<f64>,
    /// Arbitrary extra fields a condition may reference by dotted path
    /// (§4.8) that don't warrant a named field above.
    pub extra: serde_json::Value,
}

impl HookContext {
    /// Create a new context with only the event and thread set.
    pub fn new(event: HookEvent, thread_id: ThreadId) -> Self {
        Self {
            event,
            thread_id,
            turn_number: None,
            tool_name: None,
            model_output: None,
            tokens_used: 0,
            cost: rust_decimal::Decimal::ZERO,
            elapsed: crate::duration::DurationMs::ZERO,
            error_category: None,
            limit_code: None,
            fill_ratio: None,
            extra: serde_json::Value::Null,
        }
    }
}

/// What a matched hook rule decides the Runner should do (§4.7).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HookAction {
    /// Re-run the failed step up to `max_attempts` with the declared backoff.
    Retry {
        /// Maximum retry attempts.
        max_attempts: u32,
    },
    /// Terminal: thread transitions to `error`.
    Fail {
        /// Human-readable reason.
        reason: String,
    },
    /// Terminal without cleanup hooks: thread transitions to `error`
    /// immediately (used for `integrity` failures, §7).
    Abort {
        /// Human-readable reason.
        reason: String,
    },
    /// Swallow the signal and proceed. Only valid for non-critical events.
    Continue,
    /// Create an approval request and suspend pending a human response
    /// (§6.6).
    Escalate {
        /// Prompt shown to the approver.
        prompt: String,
        /// Seconds to wait before the request times out.
        timeout_seconds: u64,
    },
    /// Synchronously execute another directive in-line, within the
    /// current capability envelope, and use its structured return as
    /// this hook's result.
    CallDirective {
        /// The directive to invoke.
        directive: String,
        /// Inputs to pass.
        inputs: serde_json::Value,
    },
    /// Serialize state and exit the loop with status `suspended`.
    Suspend {
        /// Human-readable reason recorded on the `thread_suspended` event.
        reason: String,
    },
    /// Write a custom transcript event and continue.
    EmitEvent {
        /// Event type name.
        event_type: String,
        /// Event payload.
        payload: serde_json::Value,
    },
}

/// A hook that observes and intervenes in the thread's inner loop.
///
/// Hooks are registered by layer (system default, project override,
/// directive-declared — §3) and composed by the Hook Engine
/// (`rye_hooks::HookRegistry`). The Runner doesn't know who's watching.
///
/// Hook handlers SHOULD complete quickly — they run inline in the loop,
/// once per matching event.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Which events this hook fires at.
    fn events(&self) -> &[HookEvent];

    /// Called at each registered event. Returning an error does not by
    /// itself halt the thread — the Hook Engine logs it and falls back
    /// to the built-in default for that event (§4.7).
    async fn on_event(&self, ctx: &HookContext) -> Result<HookAction, HookError>;
}
