//! Effect-tool recognition: tool names the model can call that the
//! Runner turns into a declared [`Effect`] instead of dispatching
//! through the Tool Dispatcher.

use rye_core::effect::{Effect, Scope, SignalPayload};
use rye_core::id::{DirectiveId, ThreadId};
use rye_turn::ToolSchema;
use serde_json::json;

/// Tool names that produce `Effect`s instead of executing locally.
pub const EFFECT_TOOL_NAMES: &[&str] = &["write_memory", "delete_memory", "delegate", "handoff", "signal"];

/// Parse one effect tool's call arguments into an [`Effect`]. Returns
/// `None` on malformed input — the caller reports that back to the
/// model as a tool error rather than silently dropping the effect.
pub fn try_as_effect(name: &str, input: &serde_json::Value) -> Option<Effect> {
    match name {
        "write_memory" => {
            let scope = parse_scope(input.get("scope")?.as_str()?);
            let key = input.get("key")?.as_str()?.to_string();
            let value = input.get("value")?.clone();
            Some(Effect::WriteMemory { scope, key, value })
        }
        "delete_memory" => {
            let scope = parse_scope(input.get("scope")?.as_str()?);
            let key = input.get("key")?.as_str()?.to_string();
            Some(Effect::DeleteMemory { scope, key })
        }
        "delegate" => {
            let directive = DirectiveId::new(input.get("directive")?.as_str()?);
            let inputs = input.get("inputs").cloned().unwrap_or(serde_json::Value::Null);
            let thread_input = rye_core::thread::ThreadInput {
                directive: directive.clone(),
                inputs,
                parent_token: None,
                parent_reservation: None,
                resume_state: None,
            };
            Some(Effect::Delegate {
                directive,
                input: Box::new(thread_input),
            })
        }
        "handoff" => {
            let directive = DirectiveId::new(input.get("directive")?.as_str()?);
            let state = input.get("state").cloned().unwrap_or(serde_json::Value::Null);
            Some(Effect::Handoff { directive, state })
        }
        "signal" => {
            let target = ThreadId::new(input.get("target")?.as_str()?);
            let signal_type = input
                .get("signal_type")
                .and_then(|s| s.as_str())
                .unwrap_or("default");
            let data = input.get("data").cloned().unwrap_or(serde_json::Value::Null);
            Some(Effect::Signal {
                target,
                payload: SignalPayload::new(signal_type, data),
            })
        }
        _ => None,
    }
}

/// The capability action string an effect tool call is checked against.
/// Effect tools draw from `write`/`execute`/`signal` primaries rather
/// than `execute.tool`, since they name a different kind of operation
/// than a registered tool dispatch.
pub fn effect_action_string(name: &str, input: &serde_json::Value) -> String {
    match name {
        "write_memory" | "delete_memory" => {
            let key = input.get("key").and_then(|k| k.as_str()).unwrap_or("*");
            rye_capability::matcher::action_string("write", "memory", key)
        }
        "delegate" | "handoff" => {
            let directive = input.get("directive").and_then(|d| d.as_str()).unwrap_or("*");
            rye_capability::matcher::action_string("execute", "directive", directive)
        }
        "signal" => {
            let target = input.get("target").and_then(|t| t.as_str()).unwrap_or("*");
            rye_capability::matcher::action_string("signal", "thread", target)
        }
        _ => rye_capability::matcher::action_string("execute", "tool", name),
    }
}

fn parse_scope(s: &str) -> Scope {
    match s {
        "global" => Scope::Global,
        other => {
            if let Some(rest) = other.strip_prefix("thread:") {
                Scope::Thread(ThreadId::new(rest))
            } else if let Some(rest) = other.strip_prefix("directive:") {
                Scope::Directive(DirectiveId::new(rest))
            } else {
                Scope::Custom(other.to_string())
            }
        }
    }
}

/// JSON-Schema tool declarations for the effect tools, appended to the
/// provider request's tool list alongside whatever's in the registry.
pub fn effect_tool_schemas() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: "write_memory".into(),
            description: "Write a knowledge artifact to persistent state.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "scope": {"type": "string"},
                    "key": {"type": "string"},
                    "value": {}
                },
                "required": ["scope", "key", "value"]
            }),
        },
        ToolSchema {
            name: "delete_memory".into(),
            description: "Delete a knowledge artifact from persistent state.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "scope": {"type": "string"},
                    "key": {"type": "string"}
                },
                "required": ["scope", "key"]
            }),
        },
        ToolSchema {
            name: "delegate".into(),
            description: "Ask the orchestrator to spawn a child thread running another directive.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "directive": {"type": "string"},
                    "inputs": {}
                },
                "required": ["directive"]
            }),
        },
        ToolSchema {
            name: "handoff".into(),
            description: "Hand this thread's work off to a successor thread.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "directive": {"type": "string"},
                    "state": {}
                },
                "required": ["directive"]
            }),
        },
        ToolSchema {
            name: "signal".into(),
            description: "Send a fire-and-forget signal to another thread.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "target": {"type": "string"},
                    "signal_type": {"type": "string"},
                    "data": {}
                },
                "required": ["target"]
            }),
        },
    ]
}
