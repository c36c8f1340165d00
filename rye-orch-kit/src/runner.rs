use async_trait::async_trait;
use rye_core::duration::DurationMs;
use rye_core::effect::Effect;
use rye_core::error::{OrchError, StateError};
use rye_core::id::{DirectiveId, ThreadId};
use rye_core::orchestrator::{Orchestrator, SpawnOverrides};
use rye_core::state::StateStore;
use rye_core::thread::{ThreadInput, ThreadOutput};
use std::sync::Arc;
use thiserror::Error;

/// Default timeout `OrchestratedRunner` waits for a dispatched thread to
/// reach a terminal status before giving up on reading its effects.
pub fn default_wait() -> DurationMs {
    DurationMs::from_secs(600)
}

/// Errors returned by `rye-orch-kit`.
#[derive(Debug, Error)]
pub enum KitError {
    /// Orchestrator error.
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] OrchError),
    /// State backend error.
    #[error("state error: {0}")]
    State(#[from] StateError),
    /// Effect execution failed.
    #[error("effect execution failed: {0}")]
    Effect(String),
    /// The runner detected a loop or exceeded a safety bound.
    #[error("execution exceeded safety bounds: {0}")]
    Safety(String),
}

/// An observable event emitted by the runner while interpreting effects.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// A directive was dispatched as a thread.
    Dispatched {
        /// Directive that was dispatched.
        directive: DirectiveId,
    },
    /// A memory write was executed.
    MemoryWritten {
        /// State key written.
        key: String,
    },
    /// A memory delete was executed.
    MemoryDeleted {
        /// State key deleted.
        key: String,
    },
    /// A delegate task was enqueued.
    DelegateEnqueued {
        /// Directive enqueued for follow-up dispatch.
        directive: DirectiveId,
    },
    /// A handoff task was enqueued.
    HandoffEnqueued {
        /// Directive enqueued for follow-up dispatch.
        directive: DirectiveId,
    },
    /// A signal was sent.
    Signaled {
        /// Thread id signaled.
        target: ThreadId,
        /// Signal type sent.
        signal_type: String,
    },
}

/// Trace of a single orchestrated run (initial dispatch plus any followups).
#[derive(Debug, Clone, Default)]
pub struct ExecutionTrace {
    /// Outputs in dispatch order (first element is the initial dispatch output),
    /// `None` when a dispatch never reached a terminal status before the
    /// runner's wait timeout elapsed (see [`default_wait`]).
    pub outputs: Vec<Option<ThreadOutput>>,
    /// Events recorded while interpreting effects.
    pub events: Vec<ExecutionEvent>,
}

impl ExecutionTrace {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Effect execution policy.
///
/// The default `OrchestratedRunner` uses this trait as the single seam where
/// a product built on this workspace can override effect semantics without
/// adopting a DSL.
#[async_trait]
pub trait EffectExecutor: Send + Sync {
    /// Execute a single effect and optionally enqueue follow-up dispatches.
    async fn execute_effect(
        &self,
        effect: &Effect,
        followups: &mut Vec<(DirectiveId, ThreadInput)>,
        trace: &mut ExecutionTrace,
    ) -> Result<(), KitError>;
}

/// Default effect executor for local composition.
///
/// Executes state effects directly against the supplied state store and
/// turns `Delegate`/`Handoff` into follow-up dispatches on the same
/// orchestrator.
pub struct LocalEffectExecutor<S: StateStore + ?Sized> {
    /// State backend used for memory effects.
    pub state: Arc<S>,
}

impl<S: StateStore + ?Sized> LocalEffectExecutor<S> {
    /// Create a new local effect executor.
    pub fn new(state: Arc<S>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl<S: StateStore + ?Sized + 'static> EffectExecutor for LocalEffectExecutor<S> {
    async fn execute_effect(
        &self,
        effect: &Effect,
        followups: &mut Vec<(DirectiveId, ThreadInput)>,
        trace: &mut ExecutionTrace,
    ) -> Result<(), KitError> {
        match effect {
            Effect::WriteMemory { scope, key, value } => {
                self.state.write(scope, key, value.clone()).await?;
                trace
                    .events
                    .push(ExecutionEvent::MemoryWritten { key: key.clone() });
            }
            Effect::DeleteMemory { scope, key } => {
                self.state.delete(scope, key).await?;
                trace
                    .events
                    .push(ExecutionEvent::MemoryDeleted { key: key.clone() });
            }
            Effect::Signal { target, payload } => {
                trace.events.push(ExecutionEvent::Signaled {
                    target: target.clone(),
                    signal_type: payload.signal_type.clone(),
                });
                // The runner sends signals via the Orchestrator; this executor only records.
            }
            Effect::Delegate { directive, input } => {
                followups.push((directive.clone(), input.as_ref().clone()));
                trace.events.push(ExecutionEvent::DelegateEnqueued {
                    directive: directive.clone(),
                });
            }
            Effect::Handoff { directive, state } => {
                // The successor starts from the handoff state as its sole
                // input; it doesn't inherit the predecessor's conversation,
                // only what the Continuation Manager decided to carry
                // forward. Recording `continuation_of` against the new
                // thread's checkpoint is the successor's own first-turn
                // concern, not something this executor can set up front —
                // `ThreadInput` carries no lineage field.
                let input = ThreadInput {
                    directive: directive.clone(),
                    inputs: state.clone(),
                    parent_token: None,
                    parent_reservation: None,
                    resume_state: None,
                };
                followups.push((directive.clone(), input));
                trace.events.push(ExecutionEvent::HandoffEnqueued {
                    directive: directive.clone(),
                });
            }
            Effect::Log { .. } | Effect::Custom { .. } => {
                // Ignored by default; a product-specific executor can override.
            }
            _ => {
                // `Effect` is non_exhaustive; ignore forward-compatible variants by default.
            }
        }
        Ok(())
    }
}

/// A small runner that executes an initial dispatch, then interprets effects
/// into follow-up dispatches until the queue is empty.
///
/// This is the "glue" that proves the effect vocabulary (§4.14) is
/// executable without forcing a workflow DSL: a thread only ever *returns*
/// effects, it never reaches into the registry or budget ledger itself.
pub struct OrchestratedRunner<E: EffectExecutor> {
    orch: Arc<dyn Orchestrator>,
    effects: Arc<E>,
    max_followups: usize,
    wait: DurationMs,
}

impl<E: EffectExecutor> OrchestratedRunner<E> {
    /// Create a new orchestrated runner.
    pub fn new(orch: Arc<dyn Orchestrator>, effects: Arc<E>) -> Self {
        Self {
            orch,
            effects,
            max_followups: 128,
            wait: default_wait(),
        }
    }

    /// Set a safety bound on the number of follow-up dispatches.
    pub fn with_max_followups(mut self, max_followups: usize) -> Self {
        self.max_followups = max_followups;
        self
    }

    /// Override how long the runner waits for each dispatch to reach a
    /// terminal status before moving on.
    pub fn with_wait(mut self, wait: DurationMs) -> Self {
        self.wait = wait;
        self
    }

    /// Dispatch a directive and interpret its effects until the follow-up
    /// queue is empty.
    pub async fn run(
        &self,
        directive: DirectiveId,
        input: ThreadInput,
    ) -> Result<ExecutionTrace, KitError> {
        let mut trace = ExecutionTrace::new();
        let mut queue: Vec<(DirectiveId, ThreadInput)> = vec![(directive, input)];
        let mut followups_dispatched = 0usize;

        while let Some((directive, thread_input)) = queue.pop() {
            trace.events.push(ExecutionEvent::Dispatched {
                directive: directive.clone(),
            });
            let thread_id = self
                .orch
                .spawn_thread(&directive, thread_input, SpawnOverrides::default())
                .await?;
            let outcome = self.orch.wait_threads(&[thread_id], self.wait).await?;
            let output = outcome.results.into_iter().next().flatten();

            let mut followups: Vec<(DirectiveId, ThreadInput)> = vec![];
            if let Some(output) = &output {
                for effect in &output.metadata.effects {
                    if let Effect::Signal { target, payload } = effect {
                        self.orch.signal(target, payload.clone()).await?;
                    }
                    self.effects
                        .execute_effect(effect, &mut followups, &mut trace)
                        .await?;
                }
            }

            trace.outputs.push(output);

            if !followups.is_empty() {
                followups_dispatched = followups_dispatched.saturating_add(followups.len());
                if followups_dispatched > self.max_followups {
                    return Err(KitError::Safety(format!(
                        "followup dispatch count exceeded max_followups={}",
                        self.max_followups
                    )));
                }
                queue.extend(followups);
            }
        }

        Ok(trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rye_core::error::ThreadError;
    use rye_core::test_utils::{EchoThread, InMemoryStore, LocalOrchestrator};
    use rye_core::thread::{ExitReason, Thread, ThreadCost, ThreadMetadata, ThreadStatus};

    fn input_for(directive: &str, inputs: serde_json::Value) -> ThreadInput {
        ThreadInput {
            directive: DirectiveId::new(directive),
            inputs,
            parent_token: None,
            parent_reservation: None,
            resume_state: None,
        }
    }

    #[tokio::test]
    async fn run_dispatches_once_with_no_effects() {
        let mut orch = LocalOrchestrator::new();
        orch.register(DirectiveId::new("greet"), Arc::new(EchoThread));
        let orch: Arc<dyn Orchestrator> = Arc::new(orch);
        let state: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let executor = Arc::new(LocalEffectExecutor::new(state));
        let runner = OrchestratedRunner::new(orch, executor);

        let trace = runner
            .run(
                DirectiveId::new("greet"),
                input_for("greet", serde_json::json!({"name": "Amy"})),
            )
            .await
            .unwrap();

        assert_eq!(trace.outputs.len(), 1);
        let output = trace.outputs[0].as_ref().unwrap();
        assert_eq!(output.status, ThreadStatus::Completed);
        assert!(trace
            .events
            .iter()
            .any(|e| matches!(e, ExecutionEvent::Dispatched { .. })));
    }

    /// A thread whose single turn declares a `WriteMemory` effect followed
    /// by a `Delegate` to a second directive, so the follow-up queue has
    /// exactly one thing to pick up.
    struct DelegatingThread {
        target: DirectiveId,
    }

    #[async_trait]
    impl Thread for DelegatingThread {
        async fn execute(&self, input: ThreadInput) -> Result<ThreadOutput, ThreadError> {
            let child_input = ThreadInput {
                directive: self.target.clone(),
                inputs: serde_json::json!({}),
                parent_token: None,
                parent_reservation: None,
                resume_state: None,
            };
            Ok(ThreadOutput {
                status: ThreadStatus::Completed,
                exit_reason: ExitReason::Complete,
                outputs: Some(input.inputs),
                parse_error: None,
                cost: ThreadCost::default(),
                metadata: ThreadMetadata {
                    tool_calls: vec![],
                    effects: vec![
                        Effect::WriteMemory {
                            scope: rye_core::effect::Scope::Global,
                            key: "seen".into(),
                            value: serde_json::json!(true),
                        },
                        Effect::Delegate {
                            directive: self.target.clone(),
                            input: Box::new(child_input),
                        },
                    ],
                },
            })
        }
    }

    #[tokio::test]
    async fn run_interprets_write_memory_and_follows_up_on_delegate() {
        let mut orch = LocalOrchestrator::new();
        orch.register(
            DirectiveId::new("parent"),
            Arc::new(DelegatingThread {
                target: DirectiveId::new("child"),
            }),
        );
        orch.register(DirectiveId::new("child"), Arc::new(EchoThread));
        let orch: Arc<dyn Orchestrator> = Arc::new(orch);
        let state = Arc::new(InMemoryStore::new());
        let store_dyn: Arc<dyn StateStore> = Arc::clone(&state);
        let executor = Arc::new(LocalEffectExecutor::new(store_dyn));
        let runner = OrchestratedRunner::new(orch, executor);

        let trace = runner
            .run(DirectiveId::new("parent"), input_for("parent", serde_json::json!({})))
            .await
            .unwrap();

        // parent dispatch, then the delegated child dispatch.
        assert_eq!(trace.outputs.len(), 2);
        assert!(trace
            .events
            .iter()
            .any(|e| matches!(e, ExecutionEvent::MemoryWritten { key } if key == "seen")));
        assert!(trace
            .events
            .iter()
            .any(|e| matches!(e, ExecutionEvent::DelegateEnqueued { .. })));
        assert_eq!(
            state
                .read(&rye_core::effect::Scope::Global, "seen")
                .await
                .unwrap(),
            Some(serde_json::json!(true))
        );
    }

    #[tokio::test]
    async fn run_rejects_unregistered_directive() {
        let orch: Arc<dyn Orchestrator> = Arc::new(LocalOrchestrator::new());
        let state: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let executor = Arc::new(LocalEffectExecutor::new(state));
        let runner = OrchestratedRunner::new(orch, executor);

        let result = runner
            .run(DirectiveId::new("ghost"), input_for("ghost", serde_json::json!({})))
            .await;
        assert!(matches!(result, Err(KitError::Orchestrator(_))));
    }
}
