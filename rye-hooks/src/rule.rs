//! Declarative hook rules: `{event, priority, condition?, action}`,
//! compiled from a directive's hook configuration.

use crate::condition::{evaluate, Condition};
use rye_core::hook::{HookAction, HookContext, HookEvent};
use serde::{Deserialize, Serialize};

/// One declarative rule. Rules for the same event are evaluated in
/// descending priority order; the first whose condition matches (or
/// which has no condition at all) wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookRule {
    /// The event this rule applies to.
    pub event: HookEvent,
    /// Higher priority rules are tried first. Ties keep declaration order.
    #[serde(default)]
    pub priority: i32,
    /// Condition gating this rule. `None` always matches.
    #[serde(default)]
    pub condition: Option<Condition>,
    /// The action to take when this rule matches.
    pub action: HookAction,
}

impl HookRule {
    /// An unconditional rule for `event` that always fires `action`.
    pub fn unconditional(event: HookEvent, action: HookAction) -> Self {
        Self {
            event,
            priority: 0,
            condition: None,
            action,
        }
    }

    /// Does this rule match the given context?
    fn matches(&self, ctx: &HookContext) -> bool {
        if self.event != ctx.event {
            return false;
        }
        match &self.condition {
            None => true,
            Some(condition) => {
                let context_json =
                    serde_json::to_value(ctx).unwrap_or(serde_json::Value::Null);
                evaluate(condition, &context_json)
            }
        }
    }
}

/// Select the first matching rule for `ctx` out of `rules`, trying
/// rules in descending-priority order (ties preserve input order).
pub fn select_action(rules: &[HookRule], ctx: &HookContext) -> Option<HookAction> {
    let mut candidates: Vec<&HookRule> = rules.iter().filter(|r| r.matches(ctx)).collect();
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
    candidates.first().map(|r| r.action.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Op;
    use rye_core::id::ThreadId;
    use serde_json::json;

    fn ctx(event: HookEvent) -> HookContext {
        HookContext::new(event, ThreadId::new("t1"))
    }

    #[test]
    fn unconditional_rule_matches_its_event() {
        let rule = HookRule::unconditional(HookEvent::Limit, HookAction::Continue);
        assert!(rule.matches(&ctx(HookEvent::Limit)));
        assert!(!rule.matches(&ctx(HookEvent::Error)));
    }

    #[test]
    fn select_action_picks_highest_priority_match() {
        let rules = vec![
            HookRule {
                event: HookEvent::Limit,
                priority: 1,
                condition: None,
                action: HookAction::Suspend {
                    reason: "low priority".into(),
                },
            },
            HookRule {
                event: HookEvent::Limit,
                priority: 10,
                condition: None,
                action: HookAction::Fail {
                    reason: "high priority".into(),
                },
            },
        ];
        let action = select_action(&rules, &ctx(HookEvent::Limit)).unwrap();
        match action {
            HookAction::Fail { reason } => assert_eq!(reason, "high priority"),
            other => panic!("expected Fail, got {other:?}"),
        }
    }

    #[test]
    fn select_action_respects_condition() {
        let mut context = ctx(HookEvent::Error);
        context.error_category = Some("rate_limited".into());

        let rules = vec![HookRule {
            event: HookEvent::Error,
            priority: 0,
            condition: Some(Condition::Clause {
                path: "error_category".into(),
                op: Op::Eq,
                value: json!("permanent"),
            }),
            action: HookAction::Fail {
                reason: "permanent error".into(),
            },
        }];

        assert!(select_action(&rules, &context).is_none());
    }

    #[test]
    fn select_action_returns_none_when_nothing_matches() {
        let rules = vec![HookRule::unconditional(
            HookEvent::Limit,
            HookAction::Continue,
        )];
        assert!(select_action(&rules, &ctx(HookEvent::Error)).is_none());
    }
}
