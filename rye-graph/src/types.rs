//! Graph definition types (§4.13): nodes, edges, and the action each
//! node runs through the Tool Dispatcher.

use std::collections::HashMap;

use rye_dispatch::ItemRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node graph, as declared by a directive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDefinition {
    /// Every node in the graph, keyed by name.
    pub nodes: HashMap<String, Node>,
    /// The node to start at on a fresh (non-resumed) run.
    pub start: String,
    /// Walk terminates with an error once this many steps have executed
    /// without reaching a `return` node.
    pub max_steps: u32,
}

/// One node: the action it runs (if any), state it assigns afterward,
/// and the edges it considers next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// The action this node executes via the Tool Dispatcher. Absent for
    /// a `return` node, which terminates the walk instead.
    #[serde(default)]
    pub action: Option<NodeAction>,
    /// Mutations applied into graph state after the action completes,
    /// keyed by the state key to set and valued by a `${...}` expression
    /// resolved against `inputs`/`state`/`result`.
    #[serde(default)]
    pub assign: HashMap<String, String>,
    /// Outgoing edges, considered in declaration order.
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Whether this node terminates the walk.
    #[serde(default)]
    pub is_return: bool,
}

/// The dispatchable action a node runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAction {
    /// The capability primary this action is checked under (e.g. `execute`).
    pub primary: String,
    /// The item to dispatch.
    pub item: ItemRef,
    /// Parameters passed to the executor. Values may contain `${...}`
    /// placeholders resolved against `inputs`/`state`/`result` before
    /// dispatch.
    #[serde(default)]
    pub params: Value,
}

/// An outgoing edge from a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// `${...}` boolean expression. The first edge whose condition
    /// resolves truthy is taken; an edge with no condition matches
    /// unconditionally.
    #[serde(default)]
    pub when: Option<String>,
    /// The node to move to.
    pub next: String,
}

/// Resolve a JSON [`Value`] as a graph-condition truth value: `null`,
/// `false`, `0`, empty strings, empty arrays, and empty objects are
/// falsy; everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn falsy_values() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([1])));
        assert!(is_truthy(&json!({"a": 1})));
    }
}
