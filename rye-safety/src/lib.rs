#![deny(missing_docs)]
//! Per-thread limit tracking and error classification (§4.6).
//!
//! A [`SafetyHarness`] owns one thread's dynamic accumulators (turns,
//! tokens, spend, elapsed time) plus its static configuration (limits,
//! required capabilities, acknowledged risk tiers). The Thread Runner
//! calls [`SafetyHarness::record_turn`] after every turn and
//! [`SafetyHarness::check_limits`] before starting the next one;
//! [`SafetyHarness::classify_error`] turns a raw failure into one of
//! the categories in `rye_core::error::ErrorCategory`, deterministically,
//! via a data-driven rule table rather than a match on error variants —
//! so a project can extend or reorder the rules without a recompile of
//! the classification logic itself.

use rust_decimal::Decimal;
use rye_capability::RiskTier;
use rye_checkpoint::LimitConfig;
use rye_core::error::ErrorCategory;
use std::time::Duration;

/// Accumulated usage for one thread, updated after every turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulators {
    /// Turns completed.
    pub turns: u32,
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens produced.
    pub output_tokens: u64,
    /// Cumulative spend.
    pub spend: Decimal,
    /// Wall-clock time elapsed since the thread started.
    pub elapsed: Duration,
}

/// One turn's usage, as reported by the Thread Runner.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnUsage {
    /// Input tokens consumed by this turn.
    pub input_tokens: u64,
    /// Output tokens produced by this turn.
    pub output_tokens: u64,
    /// Spend incurred by this turn.
    pub spend: Decimal,
    /// Wall-clock time the turn took.
    pub duration: Duration,
}

/// Which accumulator crossed its ceiling, and by how much.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct LimitHit {
    /// The limit that was crossed (`max_turns`, `max_tokens`, `max_spend`, `max_wall_seconds`).
    pub limit_code: &'static str,
    /// The accumulator's value at the time of the check, as a string
    /// (accumulators have mixed numeric types; this keeps the struct
    /// uniform for the `limit_escalation_requested` event payload).
    pub current_value: String,
    /// The configured ceiling that was crossed.
    pub current_max: String,
}

/// Result of a limit check.
#[derive(Debug, Clone, PartialEq)]
pub enum LimitStatus {
    /// No accumulator has crossed its ceiling.
    Ok,
    /// An accumulator crossed its ceiling.
    LimitHit(LimitHit),
}

/// One rule in the error-classification table: a substring to match
/// against the error's display text, and the category it maps to.
/// Rules are tried in order; the first match wins.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    /// Substring to search for in the error's `Display` output.
    pub pattern: String,
    /// Category to classify a match as.
    pub category: ErrorCategory,
}

impl ClassificationRule {
    /// Build a rule matching `pattern` to `category`.
    pub fn new(pattern: impl Into<String>, category: ErrorCategory) -> Self {
        Self {
            pattern: pattern.into(),
            category,
        }
    }
}

/// Built-in rules covering common provider error shapes. Projects can
/// prepend project-specific rules ahead of these via
/// [`SafetyHarness::with_rules`] — the first match wins, so more
/// specific rules should come first.
pub fn default_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule::new("rate limit", ErrorCategory::RateLimited),
        ClassificationRule::new("429", ErrorCategory::RateLimited),
        ClassificationRule::new("quota", ErrorCategory::Quota),
        ClassificationRule::new("insufficient_quota", ErrorCategory::Quota),
        ClassificationRule::new("timeout", ErrorCategory::Transient),
        ClassificationRule::new("timed out", ErrorCategory::Transient),
        ClassificationRule::new("connection reset", ErrorCategory::Transient),
        ClassificationRule::new("503", ErrorCategory::Transient),
        ClassificationRule::new("502", ErrorCategory::Transient),
        ClassificationRule::new("overloaded", ErrorCategory::Transient),
        ClassificationRule::new("unauthorized", ErrorCategory::Permanent),
        ClassificationRule::new("401", ErrorCategory::Permanent),
        ClassificationRule::new("invalid request", ErrorCategory::Permanent),
        ClassificationRule::new("signature", ErrorCategory::Integrity),
        ClassificationRule::new("checksum", ErrorCategory::Integrity),
        ClassificationRule::new("cancelled", ErrorCategory::Cancelled),
        ClassificationRule::new("canceled", ErrorCategory::Cancelled),
        ClassificationRule::new("permission denied", ErrorCategory::PermissionDenied),
        ClassificationRule::new("not covered by capability", ErrorCategory::PermissionDenied),
    ]
}

/// Per-thread limit tracking and error classification.
pub struct SafetyHarness {
    accumulators: Accumulators,
    limits: LimitConfig,
    max_wall: Option<Duration>,
    rules: Vec<ClassificationRule>,
    required_capabilities: Vec<String>,
    acknowledged_risk_tiers: Vec<RiskTier>,
}

impl SafetyHarness {
    /// Create a harness for a thread bounded by `limits`, using the
    /// built-in classification rule table.
    pub fn new(limits: LimitConfig) -> Self {
        Self {
            accumulators: Accumulators::default(),
            limits,
            max_wall: None,
            rules: default_rules(),
            required_capabilities: Vec::new(),
            acknowledged_risk_tiers: Vec::new(),
        }
    }

    /// Also bound wall-clock duration.
    pub fn with_max_wall_seconds(mut self, seconds: u64) -> Self {
        self.max_wall = Some(Duration::from_secs(seconds));
        self
    }

    /// Replace the classification rule table (e.g. with project-specific
    /// rules prepended ahead of [`default_rules`]).
    pub fn with_rules(mut self, rules: Vec<ClassificationRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Declare the capability action patterns this thread's directive
    /// requires up front, so a missing capability surfaces at spawn
    /// time rather than mid-run.
    pub fn with_required_capabilities(mut self, patterns: Vec<String>) -> Self {
        self.required_capabilities = patterns;
        self
    }

    /// Record which risk tiers the operator has acknowledged for this
    /// thread, for use with `rye_capability::check_acknowledgments`.
    pub fn with_acknowledged_risk_tiers(mut self, tiers: Vec<RiskTier>) -> Self {
        self.acknowledged_risk_tiers = tiers;
        self
    }

    /// Capability action patterns this thread's directive requires.
    pub fn required_capabilities(&self) -> &[String] {
        &self.required_capabilities
    }

    /// Risk tiers the operator has acknowledged for this thread.
    pub fn acknowledged_risk_tiers(&self) -> &[RiskTier] {
        &self.acknowledged_risk_tiers
    }

    /// Current accumulated usage.
    pub fn accumulators(&self) -> &Accumulators {
        &self.accumulators
    }

    /// Fold one turn's usage into the accumulators.
    pub fn record_turn(&mut self, usage: TurnUsage) {
        self.accumulators.turns += 1;
        self.accumulators.input_tokens += usage.input_tokens;
        self.accumulators.output_tokens += usage.output_tokens;
        self.accumulators.spend += usage.spend;
        self.accumulators.elapsed += usage.duration;
    }

    /// Check every configured ceiling against the current accumulators.
    /// Returns the first limit crossed, checked in a fixed order
    /// (turns, tokens, spend, wall time) so repeated calls are stable.
    pub fn check_limits(&self) -> LimitStatus {
        if let Some(max_turns) = self.limits.max_turns {
            if self.accumulators.turns >= max_turns {
                return LimitStatus::LimitHit(LimitHit {
                    limit_code: "max_turns",
                    current_value: self.accumulators.turns.to_string(),
                    current_max: max_turns.to_string(),
                });
            }
        }

        if let Some(max_tokens) = self.limits.max_tokens {
            let total = self.accumulators.input_tokens + self.accumulators.output_tokens;
            if total >= max_tokens {
                return LimitStatus::LimitHit(LimitHit {
                    limit_code: "max_tokens",
                    current_value: total.to_string(),
                    current_max: max_tokens.to_string(),
                });
            }
        }

        if let Some(max_spend) = self.limits.max_spend {
            if self.accumulators.spend >= max_spend {
                return LimitStatus::LimitHit(LimitHit {
                    limit_code: "max_spend",
                    current_value: self.accumulators.spend.to_string(),
                    current_max: max_spend.to_string(),
                });
            }
        }

        if let Some(max_wall) = self.max_wall {
            if self.accumulators.elapsed >= max_wall {
                return LimitStatus::LimitHit(LimitHit {
                    limit_code: "max_wall_seconds",
                    current_value: self.accumulators.elapsed.as_secs().to_string(),
                    current_max: max_wall.as_secs().to_string(),
                });
            }
        }

        LimitStatus::Ok
    }

    /// Classify an error's display text into a category, trying rules
    /// in order and falling back to `Transient` if nothing matches —
    /// an unrecognized failure is assumed retryable rather than fatal,
    /// so a new provider error shape degrades to "retry a few times"
    /// instead of silently killing the thread.
    pub fn classify_error(&self, error_text: &str) -> ErrorCategory {
        let lowercase = error_text.to_lowercase();
        for rule in &self.rules {
            if lowercase.contains(&rule.pattern.to_lowercase()) {
                return rule.category;
            }
        }
        ErrorCategory::Transient
    }
}
