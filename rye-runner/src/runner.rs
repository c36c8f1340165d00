//! The Thread Runner: an LLM tool-use loop implementing `rye_core::thread::Thread` (§4.9).

use crate::directive::DirectiveSpec;
use crate::effects::{effect_action_string, effect_tool_schemas, try_as_effect, EFFECT_TOOL_NAMES};
use crate::prompt::build_system_prompt;
use crate::registry::{self, RegistryEntry, RegistryStatus};
use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use rye_budget::BudgetLedger;
use rye_capability::matcher::{self, Decision};
use rye_capability::token::{check_acknowledgments, mint, verify, CapabilityToken};
use rye_checkpoint::{Checkpoint, Checkpointer, LimitConfig};
use rye_core::duration::DurationMs;
use rye_core::effect::Effect;
use rye_core::error::ThreadError;
use rye_core::hook::{HookAction, HookContext, HookEvent};
use rye_core::id::{ReservationId, ThreadId};
use rye_core::state::StateStore;
use rye_core::thread::{
    ExitReason, Thread, ThreadCost, ThreadInput, ThreadMetadata, ThreadOutput, ThreadStatus,
    ToolCallRecord,
};
use rye_dispatch::{Dispatcher, DispatchResult, ItemRef, ItemStore, Space};
use rye_hooks::HookRegistry;
use rye_safety::{LimitStatus, SafetyHarness, TurnUsage};
use rye_transcript::TranscriptWriter;
use rye_turn::context::ContextStrategy;
use rye_turn::convert::parts_to_content;
use rye_turn::provider::Provider;
use rye_turn::types::{ContentPart, ProviderMessage, ProviderRequest, Role, StopReason, ToolSchema};
use rye_turn::RunnerConfig;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Rough context-window ceiling used to compute fill ratio for the
/// `context_window_pressure` hook (§4.9 step 7k). Directives don't
/// currently declare a model's real context window, so this is a
/// conservative stand-in rather than a per-model lookup table.
const DEFAULT_CONTEXT_WINDOW_TOKENS: usize = 180_000;

/// Fraction of the context window at which compaction is attempted.
const COMPACTION_THRESHOLD: f64 = 0.8;

/// Fraction of the context window at which a continuation handoff is
/// created instead of (or in addition to) compacting.
const HANDOFF_THRESHOLD: f64 = 0.9;

/// The LLM tool-use loop (§4.9). Generic over `P: Provider` and
/// `S: ItemStore` — not object-safe itself; the object-safe boundary is
/// `rye_core::thread::Thread`, which `ThreadRunner<P, S>` implements.
/// Tool calls run through the Tool Dispatcher (§4.12) the same way
/// `rye_graph::GraphWalker` dispatches node actions: resolve → verify →
/// capability-check → execute, via a signed-item `Dispatcher<S>`.
pub struct ThreadRunner<P: Provider, S: ItemStore> {
    provider: P,
    dispatcher: Dispatcher<S>,
    tool_catalog: Vec<ToolSchema>,
    context_strategy: Box<dyn ContextStrategy>,
    hooks: HookRegistry,
    checkpointer: Arc<Checkpointer>,
    budget: Arc<dyn BudgetLedger>,
    transcript: Arc<dyn TranscriptWriter>,
    registry: Arc<dyn StateStore>,
    signing_key: SigningKey,
    directive: DirectiveSpec,
    config: RunnerConfig,
    parent_id: Option<ThreadId>,
    chain_root_id: Option<ThreadId>,
    continuation_of: Option<ThreadId>,
    depth: u32,
    origin_space: Space,
}

impl<P: Provider, S: ItemStore> ThreadRunner<P, S> {
    /// Wire up a runner bound to one directive. `tool_catalog` is the
    /// set of tool schemas advertised to the model (filtered by
    /// `directive.allowed_tools`); `dispatcher` is what actually resolves
    /// and executes a tool call once the model picks one from that list —
    /// the two are independent because resolving a signed item doesn't
    /// require enumerating the space it might come from.
    ///
    /// `parent_id`/`chain_root_id`/`continuation_of`/`depth`/
    /// `origin_space` seed this thread's registry row lineage (§6.4);
    /// pass `None`/`0`/`Space::Project` for a root thread with no parent.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: P,
        dispatcher: Dispatcher<S>,
        tool_catalog: Vec<ToolSchema>,
        context_strategy: Box<dyn ContextStrategy>,
        hooks: HookRegistry,
        checkpointer: Arc<Checkpointer>,
        budget: Arc<dyn BudgetLedger>,
        transcript: Arc<dyn TranscriptWriter>,
        registry: Arc<dyn StateStore>,
        signing_key: SigningKey,
        directive: DirectiveSpec,
        config: RunnerConfig,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            tool_catalog,
            context_strategy,
            hooks,
            checkpointer,
            budget,
            transcript,
            registry,
            signing_key,
            directive,
            config,
            parent_id: None,
            chain_root_id: None,
            continuation_of: None,
            depth: 0,
            origin_space: Space::Project,
        }
    }

    /// Set this thread's lineage for the registry row it writes at
    /// start — who spawned it, what chain it belongs to, and whether
    /// it's a continuation successor. Used by an orchestrator spawning a
    /// non-root thread; a directly-spawned root thread leaves these at
    /// their `new` defaults.
    pub fn with_lineage(
        mut self,
        parent_id: Option<ThreadId>,
        chain_root_id: Option<ThreadId>,
        continuation_of: Option<ThreadId>,
        depth: u32,
    ) -> Self {
        self.parent_id = parent_id;
        self.chain_root_id = chain_root_id;
        self.continuation_of = continuation_of;
        self.depth = depth;
        self
    }

    /// Set which space this thread's directive was resolved from, for
    /// the registry row's `origin_space` field.
    pub fn with_origin_space(mut self, origin_space: Space) -> Self {
        self.origin_space = origin_space;
        self
    }

    fn model(&self) -> Option<String> {
        self.directive.model.clone().or_else(|| {
            if self.config.default_model.is_empty() {
                None
            } else {
                Some(self.config.default_model.clone())
            }
        })
    }

    fn max_turns(&self) -> u32 {
        self.directive.max_turns.unwrap_or(self.config.default_max_turns)
    }

    fn limit_config(&self) -> LimitConfig {
        LimitConfig {
            max_turns: Some(self.max_turns()),
            max_spend: self.directive.max_spend,
            max_tokens: self.directive.max_tokens,
        }
    }

    fn tool_schemas(&self) -> Vec<ToolSchema> {
        let mut schemas = self.tool_catalog.clone();
        schemas.extend(effect_tool_schemas());

        if let Some(allowed) = &self.directive.allowed_tools {
            schemas.retain(|s| allowed.contains(&s.name));
        }
        schemas
    }

    async fn mint_thread_token(
        &self,
        input: &ThreadInput,
        thread_id: &ThreadId,
        now_ms: u64,
    ) -> Result<CapabilityToken, ThreadError> {
        let parent: Option<CapabilityToken> = match &input.parent_token {
            Some(bytes) => {
                let token: CapabilityToken = serde_json::from_slice(bytes)
                    .map_err(|e| ThreadError::NonRetryable(format!("malformed parent token: {e}")))?;
                verify(&token, &self.signing_key.verifying_key(), now_ms)
                    .map_err(|e| ThreadError::NonRetryable(format!("parent token invalid: {e}")))?;
                Some(token)
            }
            None => None,
        };

        let parent_token_id = parent.as_ref().map(|t| t.token_id.clone());
        let parent_patterns = parent.as_ref().map(|t| t.patterns.as_slice());

        let token = mint(
            &self.signing_key,
            parent_token_id,
            parent_patterns,
            self.directive.permissions.clone(),
            thread_id.clone(),
            DurationMs::from_secs(3600),
            now_ms,
        )
        .map_err(|e| ThreadError::NonRetryable(format!("capability mint failed: {e}")))?;

        check_acknowledgments(&token.patterns, &self.directive.risk_acknowledgments)
            .map_err(|e| ThreadError::NonRetryable(format!("risk acknowledgment missing: {e}")))?;

        Ok(token)
    }

    async fn create_registry_row(&self, thread_id: &ThreadId, now_ms: u64) {
        let mut entry = RegistryEntry::root(
            thread_id.clone(),
            self.directive.id.clone(),
            self.model(),
            self.origin_space,
            self.directive.permissions.clone(),
            self.limit_config(),
            now_ms,
        );
        entry.parent_id = self.parent_id.clone();
        entry.chain_root_id = self.chain_root_id.clone().unwrap_or_else(|| thread_id.clone());
        entry.continuation_of = self.continuation_of.clone();
        entry.depth = self.depth;
        let _ = registry::create(self.registry.as_ref(), &entry).await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn update_registry_status(
        &self,
        thread_id: &ThreadId,
        status: RegistryStatus,
        turns: u32,
        input_tokens: u64,
        output_tokens: u64,
        spend: Decimal,
        duration_seconds: f64,
        now_ms: u64,
    ) {
        let _ = registry::update_status(
            self.registry.as_ref(),
            thread_id,
            status,
            turns,
            input_tokens,
            output_tokens,
            spend,
            duration_seconds,
            now_ms,
        )
        .await;
    }

    fn build_hook_context(
        &self,
        event: HookEvent,
        thread_id: &ThreadId,
        turn_number: u32,
        harness: &SafetyHarness,
        elapsed: DurationMs,
    ) -> HookContext {
        let mut ctx = HookContext::new(event, thread_id.clone());
        ctx.turn_number = Some(turn_number);
        ctx.tokens_used = harness.accumulators().input_tokens + harness.accumulators().output_tokens;
        ctx.cost = harness.accumulators().spend;
        ctx.elapsed = elapsed;
        ctx
    }

    fn extract_outputs(last_text: &str) -> (Option<serde_json::Value>, Option<String>) {
        match serde_json::from_str::<serde_json::Value>(last_text) {
            Ok(value) => (Some(value), None),
            Err(e) => (None, Some(e.to_string())),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[async_trait]
impl<P: Provider + Send + Sync + 'static, S: ItemStore + Send + Sync + 'static> Thread for ThreadRunner<P, S> {
    async fn execute(&self, input: ThreadInput) -> Result<ThreadOutput, ThreadError> {
        let start = Instant::now();
        let start_ms = now_ms();
        let thread_id = ThreadId::new(format!("{}-{}", input.directive.as_str(), start_ms / 1000));

        // Steps 2-3: mint + verify the thread's capability token.
        let token = self.mint_thread_token(&input, &thread_id, start_ms).await?;

        // Step 4: open (or reuse) this thread's budget account.
        let limit = self.directive.max_spend.unwrap_or(Decimal::MAX);
        self.budget
            .open_account(thread_id.clone(), limit)
            .await
            .map_err(|e| ThreadError::NonRetryable(format!("budget account: {e}")))?;

        // Step 5: registry row + transcript open.
        self.create_registry_row(&thread_id, start_ms).await;
        self.transcript
            .write_critical(
                &thread_id,
                &input.directive,
                "thread_started",
                serde_json::json!({ "directive": self.directive.name, "model": self.model() }),
            )
            .await
            .map_err(|e| ThreadError::NonRetryable(format!("transcript: {e}")))?;

        let mut harness = SafetyHarness::new(self.limit_config())
            .with_required_capabilities(
                self.directive
                    .permissions
                    .iter()
                    .map(|p| p.pattern.as_str().to_string())
                    .collect(),
            )
            .with_acknowledged_risk_tiers(self.directive.risk_acknowledgments.clone());

        let tools = self.tool_schemas();
        let system = build_system_prompt(&self.config.system_prompt, &self.directive, &tools);

        let mut messages: Vec<ProviderMessage> = vec![ProviderMessage {
            role: Role::User,
            content: vec![ContentPart::Text {
                text: input.inputs.to_string(),
            }],
        }];

        let mut tool_records: Vec<ToolCallRecord> = Vec::new();
        let mut effects: Vec<Effect> = Vec::new();
        let mut last_text = String::new();
        let mut turn_number: u32 = 0;

        let outcome: (ThreadStatus, ExitReason) = loop {
            turn_number += 1;
            let elapsed = DurationMs::from(start.elapsed());

            // 7a
            self.transcript
                .write_droppable(&thread_id, &input.directive, "step_start", serde_json::json!({ "turn": turn_number }))
                .await;
            let started_ctx = self.build_hook_context(HookEvent::StepStart, &thread_id, turn_number, &harness, elapsed);
            let _ = self.hooks.dispatch(&started_ctx).await;

            // 7b/7c
            let request = ProviderRequest {
                model: self.model(),
                messages: messages.clone(),
                tools: tools.clone(),
                max_tokens: Some(self.directive.max_tokens.unwrap_or(self.config.default_max_tokens as u64) as u32),
                temperature: None,
                system: Some(system.clone()),
                extra: serde_json::Value::Null,
            };

            let response = match self.provider.complete(request).await {
                Ok(r) => r,
                Err(e) => {
                    let category = harness.classify_error(&e.to_string());
                    self.transcript
                        .write_critical(
                            &thread_id,
                            &input.directive,
                            "thread_error",
                            serde_json::json!({ "category": format!("{category:?}"), "message": e.to_string() }),
                        )
                        .await
                        .ok();
                    break (
                        ThreadStatus::Error,
                        ExitReason::Error {
                            category: format!("{category:?}").to_lowercase(),
                            message: e.to_string(),
                        },
                    );
                }
            };

            harness.record_turn(TurnUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
                spend: response.cost.unwrap_or(Decimal::ZERO),
                duration: start.elapsed(),
            });

            self.transcript
                .write_critical(
                    &thread_id,
                    &input.directive,
                    "cognition_out",
                    serde_json::json!({ "stop_reason": format!("{:?}", response.stop_reason) }),
                )
                .await
                .ok();

            let rendered = parts_to_content(&response.content);
            if let Some(text) = rendered.as_text() {
                last_text = text.to_string();
            }

            messages.push(ProviderMessage {
                role: Role::Assistant,
                content: response.content.clone(),
            });

            // 7d: parse tool calls
            let tool_calls: Vec<(String, String, serde_json::Value)> = response
                .content
                .iter()
                .filter_map(|part| match part {
                    ContentPart::ToolUse { id, name, input } => Some((id.clone(), name.clone(), input.clone())),
                    _ => None,
                })
                .collect();

            if tool_calls.is_empty() {
                if response.stop_reason == StopReason::EndTurn {
                    break (ThreadStatus::Completed, ExitReason::Complete);
                }
                if response.stop_reason == StopReason::MaxTokens
                    || response.stop_reason == StopReason::ContentFilter
                {
                    break (
                        ThreadStatus::Error,
                        ExitReason::Error {
                            category: "permanent".into(),
                            message: format!("stopped with {:?} and no tool calls", response.stop_reason),
                        },
                    );
                }
            }

            let mut tool_results = Vec::new();
            for (call_id, name, tool_input) in tool_calls {
                // Effect tools never reach the Tool Dispatcher — they're
                // recorded as `Effect`s for the orchestrator to execute,
                // so their own capability check happens here rather than
                // inside `Dispatcher::dispatch`.
                if EFFECT_TOOL_NAMES.contains(&name.as_str()) {
                    let action = effect_action_string(&name, &tool_input);
                    if matcher::check(&token, &action) == Decision::Deny {
                        tool_results.push(ContentPart::ToolResult {
                            tool_use_id: call_id.clone(),
                            content: format!("permission denied: {action}"),
                            is_error: true,
                        });
                        tool_records.push(ToolCallRecord {
                            call_id,
                            tool: name,
                            input: tool_input,
                            output: None,
                            error: Some(format!("permission denied: {action}")),
                            duration: DurationMs::ZERO,
                        });
                        continue;
                    }

                    let recorded = try_as_effect(&name, &tool_input);
                    let is_error = recorded.is_none();
                    let content = if is_error {
                        format!("{name} call malformed: missing required fields")
                    } else {
                        format!("{name} effect recorded.")
                    };
                    if let Some(effect) = recorded {
                        effects.push(effect);
                    }
                    tool_results.push(ContentPart::ToolResult {
                        tool_use_id: call_id.clone(),
                        content: content.clone(),
                        is_error,
                    });
                    tool_records.push(ToolCallRecord {
                        call_id,
                        tool: name,
                        input: tool_input,
                        output: if is_error { None } else { Some(content.clone()) },
                        error: if is_error { Some(content) } else { None },
                        duration: DurationMs::ZERO,
                    });
                    continue;
                }

                let tool_start = Instant::now();
                self.transcript
                    .write_critical(&thread_id, &input.directive, "tool_call_start", serde_json::json!({ "tool": name, "call_id": call_id }))
                    .await
                    .ok();

                // Dispatcher::dispatch (§4.12) does its own capability
                // check before resolving the item, then resolves across
                // project→user→system (§4.12, S5), verifies the item's
                // signature, and follows the executor chain — no
                // separate pre-check needed here.
                let item_ref = ItemRef::new("tool", &name);
                let dispatch_result = self.dispatcher.dispatch(&token, "execute", &item_ref, tool_input.clone()).await;
                let duration = DurationMs::from(tool_start.elapsed());

                let (content, is_error) = match &dispatch_result {
                    Ok(DispatchResult::Completed(value)) => (serde_json::to_string(value).unwrap_or_default(), false),
                    Ok(DispatchResult::Denied(denial)) => (format!("permission denied: {}", denial.reason), true),
                    Err(e) => (e.to_string(), true),
                };

                if is_error {
                    let category = harness.classify_error(&content);
                    let error_ctx = self.build_hook_context(HookEvent::Error, &thread_id, turn_number, &harness, DurationMs::from(start.elapsed()));
                    match self.hooks.dispatch(&error_ctx).await {
                        HookAction::Fail { reason } | HookAction::Abort { reason } => {
                            break (
                                ThreadStatus::Error,
                                ExitReason::Error {
                                    category: format!("{category:?}").to_lowercase(),
                                    message: reason,
                                },
                            );
                        }
                        _ => {}
                    }
                }

                self.transcript
                    .write_critical(
                        &thread_id,
                        &input.directive,
                        "tool_call_result",
                        serde_json::json!({ "tool": name, "call_id": call_id, "is_error": is_error }),
                    )
                    .await
                    .ok();

                tool_results.push(ContentPart::ToolResult {
                    tool_use_id: call_id.clone(),
                    content: content.clone(),
                    is_error,
                });
                tool_records.push(ToolCallRecord {
                    call_id,
                    tool: name,
                    input: tool_input,
                    output: if is_error { None } else { Some(content.clone()) },
                    error: if is_error { Some(content) } else { None },
                    duration,
                });
            }

            if !tool_results.is_empty() {
                messages.push(ProviderMessage {
                    role: Role::User,
                    content: tool_results,
                });
            }

            // 7h: step_finish
            self.transcript
                .write_droppable(
                    &thread_id,
                    &input.directive,
                    "step_finish",
                    serde_json::json!({ "turn": turn_number }),
                )
                .await;

            // 7i: checkpoint
            let checkpoint = Checkpoint {
                thread_id: thread_id.clone(),
                directive_id: input.directive.clone(),
                turns_completed: turn_number,
                cumulative_spend: harness.accumulators().spend,
                cumulative_input_tokens: harness.accumulators().input_tokens,
                cumulative_output_tokens: harness.accumulators().output_tokens,
                limits: self.limit_config(),
                hook_config: serde_json::Value::Null,
                messages: serde_json::to_value(&messages).unwrap_or(serde_json::Value::Null),
                last_transcript_seq: self.transcript.last_seq(&thread_id).await,
                continuation_of: None,
            };
            self.checkpointer
                .save(&checkpoint)
                .await
                .map_err(|e| ThreadError::NonRetryable(format!("checkpoint: {e}")))?;

            // 7j: limits
            match harness.check_limits() {
                LimitStatus::LimitHit(hit) => {
                    let limit_ctx = self.build_hook_context(HookEvent::Limit, &thread_id, turn_number, &harness, DurationMs::from(start.elapsed()));
                    match self.hooks.dispatch(&limit_ctx).await {
                        HookAction::Suspend { reason: _ } => {
                            break (ThreadStatus::Suspended, ExitReason::LimitHit { limit_code: hit.limit_code.to_string() });
                        }
                        HookAction::Fail { reason } | HookAction::Abort { reason } => {
                            break (
                                ThreadStatus::Error,
                                ExitReason::Error {
                                    category: "limit_hit".into(),
                                    message: reason,
                                },
                            );
                        }
                        _ => {
                            let exit = if hit.limit_code == "max_spend" {
                                ExitReason::BudgetExhausted
                            } else if hit.limit_code == "max_turns" {
                                ExitReason::MaxTurns
                            } else {
                                ExitReason::LimitHit { limit_code: hit.limit_code.to_string() }
                            };
                            break (ThreadStatus::Error, exit);
                        }
                    }
                }
                LimitStatus::Ok => {}
            }

            // 7k: context window pressure
            let estimate = self.context_strategy.token_estimate(&messages);
            let fill_ratio = estimate as f64 / DEFAULT_CONTEXT_WINDOW_TOKENS as f64;
            if fill_ratio >= COMPACTION_THRESHOLD {
                let mut pressure_ctx = self.build_hook_context(HookEvent::ContextWindowPressure, &thread_id, turn_number, &harness, DurationMs::from(start.elapsed()));
                pressure_ctx.fill_ratio = Some(fill_ratio);
                let _ = self.hooks.dispatch(&pressure_ctx).await;

                if fill_ratio >= HANDOFF_THRESHOLD {
                    // The successor's own registry row doesn't exist yet —
                    // it's only created once the orchestrator actually
                    // spawns a thread at this id. Linking
                    // `continuation_next` is the orchestrator's job, after
                    // that spawn, via `registry::set_continuation_next`
                    // (§4.3's atomic-after-successor rule).
                    let successor = ThreadId::new(format!("{}-{}-cont", input.directive.as_str(), start_ms));
                    effects.push(Effect::Handoff {
                        directive: input.directive.clone(),
                        state: serde_json::json!({ "messages": messages }),
                    });
                    break (
                        ThreadStatus::Completed,
                        ExitReason::ContinuationHandoff { successor },
                    );
                }
                messages = self.context_strategy.compact(messages);
            }
        };

        let (status, exit_reason) = outcome;

        // Step 8: emit terminal event, report budget, update registry, close out.
        let terminal_event = match status {
            ThreadStatus::Error => "thread_error",
            _ => "thread_completed",
        };
        self.transcript
            .write_critical(
                &thread_id,
                &input.directive,
                terminal_event,
                serde_json::json!({ "status": format!("{status:?}") }),
            )
            .await
            .ok();

        if let Some(reservation) = &input.parent_reservation {
            report_or_forfeit(self.budget.as_ref(), reservation, harness.accumulators().spend, &status).await;
        }

        self.update_registry_status(
            &thread_id,
            RegistryStatus::from(status),
            turn_number,
            harness.accumulators().input_tokens,
            harness.accumulators().output_tokens,
            harness.accumulators().spend,
            start.elapsed().as_secs_f64(),
            now_ms(),
        )
        .await;

        if status != ThreadStatus::Suspended {
            self.checkpointer.clear(&thread_id).await.ok();
        }

        let (outputs, parse_error) = if status == ThreadStatus::Completed {
            Self::extract_outputs(&last_text)
        } else {
            (None, None)
        };

        Ok(ThreadOutput {
            status,
            exit_reason,
            outputs,
            parse_error,
            cost: ThreadCost {
                turns: turn_number,
                input_tokens: harness.accumulators().input_tokens,
                output_tokens: harness.accumulators().output_tokens,
                spend: harness.accumulators().spend,
                duration: DurationMs::from(start.elapsed()),
            },
            metadata: ThreadMetadata { tool_calls: tool_records, effects },
        })
    }
}

async fn report_or_forfeit(
    budget: &dyn BudgetLedger,
    reservation: &ReservationId,
    actual: Decimal,
    status: &ThreadStatus,
) {
    if *status == ThreadStatus::Error && actual == Decimal::ZERO {
        let _ = budget.forfeit(reservation).await;
    } else {
        let _ = budget.report(reservation, actual).await;
    }
}
