//! Continuation handoff planning (§4.11).
//!
//! When context pressure crosses the handoff threshold, a thread doesn't
//! keep compacting in place — it hands its work to a successor thread
//! running the same directive, seeded with a summary instead of the full
//! conversation. [`ContinuationManager`] builds the pieces of that
//! handoff (the knowledge-artifact write, the successor's input, the
//! outgoing thread's exit reason) as plain data; producing the summary
//! text itself means running a `thread_summary` directive, which is the
//! caller's job — this manager doesn't spawn threads or call a provider.

use rye_core::effect::{Effect, Scope};
use rye_core::id::{DirectiveId, ThreadId};
use rye_core::thread::{ExitReason, ThreadInput};
use rye_turn::context::ContextStrategy;
use rye_turn::types::ProviderMessage;

/// The state key a handoff summary is written under, scoped to the
/// directive so every thread in the chain can find its predecessor's
/// summary.
pub const SUMMARY_KEY_PREFIX: &str = "continuation_summary";

/// Decides when a thread should hand off, and builds the handoff once a
/// summary is available.
pub struct ContinuationManager<S: ContextStrategy> {
    strategy: S,
    handoff_threshold: f64,
    context_window_tokens: usize,
}

impl<S: ContextStrategy> ContinuationManager<S> {
    /// Create a manager with the given compaction strategy, handoff
    /// threshold (fraction of `context_window_tokens`, e.g. `0.9`), and
    /// the model's context window size in tokens.
    pub fn new(strategy: S, handoff_threshold: f64, context_window_tokens: usize) -> Self {
        Self {
            strategy,
            handoff_threshold,
            context_window_tokens,
        }
    }

    /// Current fill ratio, `estimated tokens / context_window_tokens`.
    pub fn fill_ratio(&self, messages: &[ProviderMessage]) -> f64 {
        self.strategy.token_estimate(messages) as f64 / self.context_window_tokens as f64
    }

    /// Whether `messages` has crossed the handoff threshold.
    pub fn should_handoff(&self, messages: &[ProviderMessage]) -> bool {
        self.fill_ratio(messages) >= self.handoff_threshold
    }

    /// Build the handoff: a `WriteMemory` effect storing the summary as a
    /// knowledge artifact, a `Handoff` effect seeding the successor with
    /// that summary, and the exit reason the outgoing thread should
    /// report. `summary` is the already-produced output of running a
    /// `thread_summary` directive over `messages`.
    pub fn plan_handoff(
        &self,
        thread_id: &ThreadId,
        directive: &DirectiveId,
        successor_id: &ThreadId,
        summary: String,
    ) -> HandoffPlan {
        let summary_key = format!("{SUMMARY_KEY_PREFIX}/{thread_id}");
        let summary_value = serde_json::json!({ "summary": summary });

        HandoffPlan {
            write_summary: Effect::WriteMemory {
                scope: Scope::Directive(directive.clone()),
                key: summary_key,
                value: summary_value.clone(),
            },
            handoff: Effect::Handoff {
                directive: directive.clone(),
                state: summary_value,
            },
            successor_input: ThreadInput {
                directive: directive.clone(),
                inputs: serde_json::json!({ "continuation_summary": summary }),
                parent_token: None,
                parent_reservation: None,
                resume_state: None,
            },
            exit_reason: ExitReason::ContinuationHandoff {
                successor: successor_id.clone(),
            },
        }
    }
}

/// The effects and bookkeeping a caller needs to actually perform a
/// continuation handoff.
#[derive(Debug, Clone)]
pub struct HandoffPlan {
    /// Writes the summary as a knowledge artifact under the directive's scope.
    pub write_summary: Effect,
    /// Seeds the successor thread with the summary (§4.11 step 3).
    pub handoff: Effect,
    /// The input the successor thread should actually be spawned with.
    pub successor_input: ThreadInput,
    /// The exit reason the outgoing thread reports once it hands off.
    pub exit_reason: ExitReason,
}
