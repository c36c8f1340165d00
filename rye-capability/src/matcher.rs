//! The Capability Matcher: checks a requested action against a token's
//! patterns (§4.1).

use crate::token::CapabilityToken;

/// Result of a capability check. Denials are ordinary values, never
/// errors — `rye.<primary>.<item_type>.<dotted.id>` denials get injected
/// back into the conversation as a structured tool-result (§4.9 step 7e),
/// they don't terminate the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The action is covered by the token's patterns.
    Allow,
    /// The action is not covered by any pattern.
    Deny,
}

impl Decision {
    /// True if this decision is `Allow`.
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Check whether `token` authorizes `action_string`
/// (`rye.<primary>.<item_type>.<dotted.id>`).
///
/// Fail closed: a token with no patterns denies every action, including
/// on an expired or otherwise-unverified token (callers are expected to
/// call [`crate::token::verify`] before reaching here).
pub fn check(token: &CapabilityToken, action_string: &str) -> Decision {
    if token.patterns.is_empty() {
        return Decision::Deny;
    }
    let allowed = token
        .patterns
        .iter()
        .any(|rated| rated.pattern.covers_action(action_string));
    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Build the canonical action string the matcher and dispatcher both
/// use: `rye.<primary>.<item_type>.<dotted_id>`.
pub fn action_string(primary: &str, item_type: &str, dotted_id: &str) -> String {
    format!("rye.{primary}.{item_type}.{dotted_id}")
}
