//! Permission patterns and the risk tiers they carry (§3, §4.1).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A hierarchical permission pattern: `rye.<primary>.<item_type>.<dotted.item.id>`,
/// with `*` allowed at any segment or as a terminal suffix meaning "and
/// everything under this prefix."
///
/// Patterns are compared segment-wise, never as opaque strings — `rye.execute.tool.*`
/// and `rye.execute.tool.foo` are unrelated strings but the former covers
/// the latter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pattern(String);

impl Pattern {
    /// Wrap a raw pattern string. Does not validate segment syntax —
    /// malformed patterns simply never match anything.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw pattern string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segments(&self) -> Vec<&str> {
        self.0.split('.').collect()
    }

    /// Whether `self` covers `action` — every concrete segment of `action`
    /// is matched by the corresponding segment of `self` (literal equality
    /// or `*`), and a trailing `*` in `self` covers any remaining segments
    /// of `action`.
    pub fn covers_action(&self, action: &str) -> bool {
        let pattern_segs = self.segments();
        let action_segs: Vec<&str> = action.split('.').collect();

        for (i, pseg) in pattern_segs.iter().enumerate() {
            if *pseg == "*" && i == pattern_segs.len() - 1 {
                // Terminal wildcard: covers this segment and everything after.
                return i <= action_segs.len();
            }
            match action_segs.get(i) {
                Some(aseg) => {
                    if *pseg != "*" && pseg != aseg {
                        return false;
                    }
                }
                None => return false,
            }
        }
        // No trailing wildcard consumed the rest: segment counts must match exactly.
        pattern_segs.len() == action_segs.len()
    }

    /// Whether `self` is covered by `parent` — used at mint time to check
    /// attenuation (§4.1: "every concrete segment is matched by some
    /// parent pattern under wildcard expansion").
    ///
    /// A pattern with a wildcard segment is covered by `parent` only if
    /// `parent` has a wildcard (or terminal wildcard) in at least as
    /// permissive a position — we never let a child widen a constraint the
    /// parent narrowed.
    pub fn covered_by(&self, parent: &Pattern) -> bool {
        let child_segs = self.segments();
        let parent_segs = parent.segments();

        for (i, pseg) in parent_segs.iter().enumerate() {
            if *pseg == "*" && i == parent_segs.len() - 1 {
                return i <= child_segs.len();
            }
            match child_segs.get(i) {
                Some(cseg) => {
                    if *pseg != "*" && pseg != cseg {
                        return false;
                    }
                    if *cseg == "*" && *pseg != "*" {
                        // Child claims a wildcard where parent pinned a literal: widening, not allowed.
                        return false;
                    }
                }
                None => return false,
            }
        }
        parent_segs.len() == child_segs.len()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Static risk classification carried by a permission pattern (§4.1).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// No acknowledgment required.
    Safe,
    /// Mutates state; no acknowledgment required.
    Write,
    /// Requires a matching `<acknowledge risk="elevated">` in the
    /// directive; warn-only if present, hard-fail if absent.
    Elevated,
    /// Always requires an acknowledgment; blocked otherwise regardless
    /// of directive declarations.
    Unrestricted,
}

/// A permission pattern paired with its risk tier, as declared in a
/// directive's permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedPattern {
    /// The pattern itself.
    pub pattern: Pattern,
    /// Its risk classification.
    pub risk: RiskTier,
}

impl RatedPattern {
    /// Create a new rated pattern.
    pub fn new(pattern: impl Into<Pattern>, risk: RiskTier) -> Self {
        Self {
            pattern: pattern.into(),
            risk,
        }
    }
}
