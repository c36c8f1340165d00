//! The resolved directive a [`crate::ThreadRunner`] executes.
//!
//! Directive authoring — parsing directive files, walking an `extends`
//! chain, composing permissions/context/hooks across that chain — is a
//! separate concern this workspace doesn't implement a component for.
//! `DirectiveSpec` is the shape the Runner needs once all of that has
//! already happened: permissions already merged (leaf wins), context
//! already composed, hook rules already layered. Whoever builds one
//! (a directive loader, or a test) owns the composition step.

use rye_capability::{RatedPattern, RiskTier};
use rye_core::id::DirectiveId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One declared directive input (§3's input schema: name, type, required,
/// default, description).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSpec {
    /// Input name, referenced by `{input:name}` in the process body.
    pub name: String,
    /// Whether the caller must supply this input.
    pub required: bool,
    /// Default value substituted when absent and not required.
    pub default: Option<serde_json::Value>,
    /// Human-readable description (surfaced in the system prompt, not enforced).
    pub description: String,
}

/// A directive, already resolved to its final (post-`extends`,
/// post-composition) form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveSpec {
    /// The directive's id, used for registry rows and transcript events.
    pub id: DirectiveId,
    /// The directive's declared name.
    pub name: String,
    /// Declared version string.
    pub version: String,
    /// Free-text description, used in the system prompt.
    pub description: String,
    /// Model override; falls back to `RunnerConfig::default_model` when absent.
    pub model: Option<String>,
    /// Turn ceiling; falls back to `RunnerConfig::default_max_turns` when absent.
    pub max_turns: Option<u32>,
    /// Token ceiling (input + output combined), if bounded.
    pub max_tokens: Option<u64>,
    /// Spend ceiling in USD, if bounded. Also used as the thread's
    /// Budget Ledger account limit.
    pub max_spend: Option<Decimal>,
    /// The permission patterns this directive requests, each rated by
    /// risk tier. Minted into the thread's capability token, attenuated
    /// against the caller's token for non-root threads.
    pub permissions: Vec<RatedPattern>,
    /// Risk tiers the directive author has acknowledged, satisfying
    /// `elevated`/`unrestricted` patterns in `permissions`.
    pub risk_acknowledgments: Vec<RiskTier>,
    /// Declared inputs.
    pub inputs: Vec<InputSpec>,
    /// Declared outputs: name to description, mirrored into the
    /// system prompt's `<returns>` block.
    pub outputs: std::collections::BTreeMap<String, String>,
    /// Free-form process steps (natural language plus optional
    /// structured action elements), interpolated into the system prompt.
    pub process_body: String,
    /// Restricts available tools to this list when present; all
    /// registered tools are offered when absent.
    pub allowed_tools: Option<Vec<String>>,
}

impl DirectiveSpec {
    /// A minimal directive: a name, a process body, and a single
    /// safe-tier wildcard permission (enough to satisfy the
    /// non-empty-root-capabilities rule in tests and examples).
    pub fn minimal(name: impl Into<String>, process_body: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: DirectiveId::new(name.clone()),
            name,
            version: "0.1.0".into(),
            description: String::new(),
            model: None,
            max_turns: None,
            max_tokens: None,
            max_spend: None,
            permissions: vec![RatedPattern::new("rye.execute.tool.*", RiskTier::Safe)],
            risk_acknowledgments: Vec::new(),
            inputs: Vec::new(),
            outputs: std::collections::BTreeMap::new(),
            process_body: process_body.into(),
            allowed_tools: None,
        }
    }
}
