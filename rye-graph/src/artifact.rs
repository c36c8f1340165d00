//! Per-step signed knowledge artifacts (§4.13): the walker's resumption
//! mechanism. Every step persists the current node and state; resuming
//! means loading the latest artifact and continuing from there.

use ed25519_dalek::SigningKey;
use rye_dispatch::{sign_content, SignatureHeader};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A persisted snapshot of the walker's position and state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphArtifact {
    /// The node to resume at.
    pub current_node: String,
    /// Graph state at this step.
    pub state: Value,
    /// How many steps have executed so far.
    pub step: u32,
    /// Present when the walker was constructed with a signing key.
    pub signature: Option<SignatureHeader>,
}

impl GraphArtifact {
    fn payload(current_node: &str, state: &Value, step: u32) -> Value {
        serde_json::json!({"current_node": current_node, "state": state, "step": step})
    }

    /// Build an unsigned artifact.
    pub fn unsigned(current_node: String, state: Value, step: u32) -> Self {
        Self { current_node, state, step, signature: None }
    }

    /// Build an artifact signed with `key`.
    pub fn signed(key: &SigningKey, current_node: String, state: Value, step: u32, timestamp: u64) -> Self {
        let payload = Self::payload(&current_node, &state, step);
        let signature = sign_content(key, &payload, timestamp);
        Self { current_node, state, step, signature: Some(signature) }
    }
}
