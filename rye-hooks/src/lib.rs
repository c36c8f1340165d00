#![deny(missing_docs)]
//! Hook registry, declarative rules, and condition evaluation (§4.7).
//!
//! Three layers compose here:
//! - [`condition`]: the `{path, op, value}` / `{all|any}` / `{not}`
//!   boolean expression language evaluated against an event-context object.
//! - [`rule`]: `HookRule { event, priority, condition, action }`,
//!   compiled from a directive's declared hook configuration.
//! - [`HookRegistry`]: composes [`DeclarativeHook`] alongside any
//!   programmatic `rye_core::hook::Hook` implementations (e.g.
//!   `rye-safety`'s limit tracker) into one ordered pipeline the
//!   Runner dispatches through.

pub mod condition;
pub mod rule;

use async_trait::async_trait;
use rye_core::error::HookError;
use rye_core::hook::{Hook, HookAction, HookContext};
use rule::{select_action, HookRule};
use std::sync::Arc;

/// A [`Hook`] implementation backed entirely by declarative rules —
/// no code, just data. Rules are grouped by event at construction so
/// dispatch doesn't rescan the whole table on every call.
pub struct DeclarativeHook {
    rules: Vec<HookRule>,
}

impl DeclarativeHook {
    /// Build a declarative hook from a rule set.
    pub fn new(rules: Vec<HookRule>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl Hook for DeclarativeHook {
    fn events(&self) -> &[rye_core::hook::HookEvent] {
        // A declarative hook's rules can name any event; it is always
        // dispatched and filters internally via `select_action`, so it
        // advertises the full event set.
        use rye_core::hook::HookEvent::*;
        &[
            ThreadStarted,
            StepStart,
            AfterStep,
            AfterComplete,
            Error,
            Limit,
            ContextWindowPressure,
            DirectiveReturn,
            GraphStarted,
            GraphCompleted,
        ]
    }

    async fn on_event(&self, ctx: &HookContext) -> Result<HookAction, HookError> {
        Ok(select_action(&self.rules, ctx).unwrap_or(HookAction::Continue))
    }
}

/// A registry that dispatches hook events to an ordered pipeline of hooks.
///
/// Hooks are called in registration order. The pipeline short-circuits
/// on the first action other than `Continue`; a hook error is logged
/// (by the caller, via the returned `Err`'s `Display`) and treated as
/// `Continue` so one misbehaving hook doesn't take down the thread.
pub struct HookRegistry {
    hooks: Vec<Arc<dyn Hook>>,
}

impl HookRegistry {
    /// Create a new empty hook registry.
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Add a hook to the end of the pipeline.
    pub fn add(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.push(hook);
    }

    /// Dispatch a hook event through the pipeline.
    ///
    /// Returns the final action. If every hook returns `Continue` (or
    /// errors, or isn't registered for this event), the result is
    /// `Continue` and the Runner falls back to its built-in default.
    pub async fn dispatch(&self, ctx: &HookContext) -> HookAction {
        for hook in &self.hooks {
            if !hook.events().contains(&ctx.event) {
                continue;
            }

            match hook.on_event(ctx).await {
                Ok(HookAction::Continue) => continue,
                Ok(action) => return action,
                Err(_e) => continue,
            }
        }

        HookAction::Continue
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
