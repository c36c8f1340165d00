//! The State Graph Walker (§4.13): a deterministic alternative to the
//! Thread Runner's model loop. Same [`Thread`] contract, different
//! mechanism — each step executes one node's action through the Tool
//! Dispatcher instead of calling a model.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use serde_json::Value;

use rye_capability::token::CapabilityToken;
use rye_core::duration::DurationMs;
use rye_core::effect::Scope;
use rye_core::error::ThreadError;
use rye_core::id::ThreadId;
use rye_core::interpolate::{resolve_path_placeholders, Namespaces};
use rye_core::state::StateStore;
use rye_core::thread::{
    ExitReason, Thread, ThreadCost, ThreadInput, ThreadMetadata, ThreadOutput, ThreadStatus,
};
use rye_dispatch::{Dispatcher, DispatchResult, ItemStore};

use crate::artifact::GraphArtifact;
use crate::types::{is_truthy, GraphDefinition};

const ARTIFACT_KEY: &str = "graph_walk";

/// Deterministic node-graph executor (§4.13), generic over the
/// [`ItemStore`] its [`Dispatcher`] resolves tool items from.
pub struct GraphWalker<S: ItemStore> {
    graph: GraphDefinition,
    dispatcher: Dispatcher<S>,
    state: Arc<dyn StateStore>,
    signing_key: Option<SigningKey>,
}

impl<S: ItemStore> GraphWalker<S> {
    /// Wire a walker to one graph definition. `signing_key` is optional —
    /// an unsigned deployment still persists and resumes artifacts, it
    /// just can't attest to their origin.
    pub fn new(
        graph: GraphDefinition,
        dispatcher: Dispatcher<S>,
        state: Arc<dyn StateStore>,
        signing_key: Option<SigningKey>,
    ) -> Self {
        Self { graph, dispatcher, state, signing_key }
    }

    fn capability_token(&self, input: &ThreadInput) -> Result<CapabilityToken, ThreadError> {
        let raw = input
            .inputs
            .get("capability_token")
            .ok_or_else(|| ThreadError::NonRetryable("missing capability_token input".to_string()))?;
        serde_json::from_value(raw.clone())
            .map_err(|e| ThreadError::NonRetryable(format!("malformed capability_token: {e}")))
    }

    fn build_artifact(&self, current_node: String, state: Value, step: u32) -> GraphArtifact {
        match &self.signing_key {
            Some(key) => GraphArtifact::signed(key, current_node, state, step, now_ms()),
            None => GraphArtifact::unsigned(current_node, state, step),
        }
    }

    async fn save_artifact(&self, thread_id: &ThreadId, artifact: &GraphArtifact) -> Result<(), ThreadError> {
        let value = serde_json::to_value(artifact)
            .map_err(|e| ThreadError::NonRetryable(format!("artifact serialization: {e}")))?;
        self.state
            .write(&Scope::Thread(thread_id.clone()), ARTIFACT_KEY, value)
            .await
            .map_err(|e| ThreadError::NonRetryable(format!("artifact write: {e}")))
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Unwrap an executor's result envelope, lifting its `data` field to the
/// top when present (§4.13) so node `assign`/edge expressions see the
/// payload directly rather than having to reach through `result.data`.
fn lift_data(value: Value) -> Value {
    match value {
        Value::Object(ref map) if map.contains_key("data") => map.get("data").cloned().unwrap_or(Value::Null),
        other => other,
    }
}

fn resolve_params(template: &Value, namespaces: &Namespaces) -> Value {
    match template {
        Value::String(s) => resolve_path_placeholders(s, namespaces),
        Value::Object(map) => Value::Object(
            map.iter().map(|(k, v)| (k.clone(), resolve_params(v, namespaces))).collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_params(v, namespaces)).collect()),
        other => other.clone(),
    }
}

#[async_trait]
impl<S: ItemStore + Send + Sync> Thread for GraphWalker<S> {
    async fn execute(&self, input: ThreadInput) -> Result<ThreadOutput, ThreadError> {
        let start = Instant::now();
        let thread_id = ThreadId::new(format!("{}-{}", input.directive.as_str(), now_ms() / 1000));
        let token = self.capability_token(&input)?;

        let (mut current_node, mut state, mut step) = match &input.resume_state {
            Some(resume) => {
                let artifact: GraphArtifact = serde_json::from_value(resume.clone())
                    .map_err(|e| ThreadError::NonRetryable(format!("malformed resume_state: {e}")))?;
                (artifact.current_node, artifact.state, artifact.step)
            }
            None => (self.graph.start.clone(), Value::Object(serde_json::Map::new()), 0),
        };

        let mut last_result = Value::Null;

        let (status, exit_reason) = loop {
            if step >= self.graph.max_steps {
                break (ThreadStatus::Error, ExitReason::LimitHit { limit_code: "max_steps".to_string() });
            }

            let Some(node) = self.graph.nodes.get(&current_node) else {
                break (
                    ThreadStatus::Error,
                    ExitReason::Error {
                        category: "permanent".to_string(),
                        message: format!("no such node: {current_node}"),
                    },
                );
            };

            if node.is_return {
                break (ThreadStatus::Completed, ExitReason::Complete);
            }

            if let Some(action) = &node.action {
                let namespaces = Namespaces {
                    inputs: input.inputs.clone(),
                    state: state.clone(),
                    result: last_result.clone(),
                    event: Value::Null,
                };
                let params = resolve_params(&action.params, &namespaces);

                let dispatch = self
                    .dispatcher
                    .dispatch(&token, &action.primary, &action.item, params)
                    .await
                    .map_err(|e| ThreadError::Tool { tool: action.item.dotted_id.clone(), message: e.to_string() })?;

                match dispatch {
                    DispatchResult::Completed(value) => last_result = lift_data(value),
                    DispatchResult::Denied(denial) => {
                        break (
                            ThreadStatus::Error,
                            ExitReason::Error { category: "permission_denied".to_string(), message: denial.reason },
                        );
                    }
                }
            }

            for (key, expr) in &node.assign {
                let namespaces = Namespaces {
                    inputs: input.inputs.clone(),
                    state: state.clone(),
                    result: last_result.clone(),
                    event: Value::Null,
                };
                let resolved = resolve_path_placeholders(expr, &namespaces);
                match &mut state {
                    Value::Object(map) => {
                        map.insert(key.clone(), resolved);
                    }
                    _ => {
                        let mut map = serde_json::Map::new();
                        map.insert(key.clone(), resolved);
                        state = Value::Object(map);
                    }
                }
            }

            let namespaces = Namespaces {
                inputs: input.inputs.clone(),
                state: state.clone(),
                result: last_result.clone(),
                event: Value::Null,
            };
            let next = node.edges.iter().find(|edge| match &edge.when {
                Some(cond) => is_truthy(&resolve_path_placeholders(cond, &namespaces)),
                None => true,
            });

            step += 1;
            let artifact = self.build_artifact(current_node.clone(), state.clone(), step);
            self.save_artifact(&thread_id, &artifact).await?;

            match next {
                Some(edge) => current_node = edge.next.clone(),
                None => {
                    break (
                        ThreadStatus::Error,
                        ExitReason::Error {
                            category: "permanent".to_string(),
                            message: format!("node {current_node} has no matching edge"),
                        },
                    );
                }
            }
        };

        Ok(ThreadOutput {
            status,
            exit_reason,
            outputs: Some(state),
            parse_error: None,
            cost: ThreadCost { turns: step, duration: DurationMs::from(start.elapsed()), ..Default::default() },
            metadata: ThreadMetadata::default(),
        })
    }
}
