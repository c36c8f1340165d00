//! [`ContextStrategy`] implementations beyond `rye_turn`'s built-in
//! `NoCompaction` passthrough.

use rye_turn::context::ContextStrategy;
use rye_turn::types::{ContentPart, ProviderMessage, Role};

use crate::counter::TokenCounter;

/// Keeps system messages plus the most recent `window_size` non-system
/// messages, working backwards from the end until roughly half the
/// original token budget is kept.
///
/// This is the simplest strategy and the one `rye_runner::ThreadRunner`
/// falls back to when no richer strategy is configured.
pub struct SlidingWindow {
    counter: TokenCounter,
}

impl SlidingWindow {
    /// Create a new sliding window strategy with the default token counter.
    pub fn new() -> Self {
        Self { counter: TokenCounter::new() }
    }

    /// Create with a custom token counter.
    pub fn with_counter(counter: TokenCounter) -> Self {
        Self { counter }
    }
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStrategy for SlidingWindow {
    fn token_estimate(&self, messages: &[ProviderMessage]) -> usize {
        self.counter.estimate_messages(messages)
    }

    fn should_compact(&self, messages: &[ProviderMessage], limit: usize) -> bool {
        self.token_estimate(messages) > limit
    }

    fn compact(&self, messages: Vec<ProviderMessage>) -> Vec<ProviderMessage> {
        if messages.len() <= 2 {
            return messages;
        }

        let (system, rest): (Vec<_>, Vec<_>) =
            messages.into_iter().partition(|m| m.role == Role::System);

        let total_tokens = self.counter.estimate_messages(&system)
            + rest.iter().map(|m| self.counter.estimate_message(m)).sum::<usize>();
        let target = total_tokens / 2;

        let mut kept = Vec::new();
        let mut current_tokens: usize = system.iter().map(|m| self.counter.estimate_message(m)).sum();

        for msg in rest.iter().rev() {
            let msg_tokens = self.counter.estimate_message(msg);
            if current_tokens + msg_tokens > target && !kept.is_empty() {
                break;
            }
            kept.push(msg.clone());
            current_tokens += msg_tokens;
        }

        kept.reverse();
        let mut result = system;
        result.extend(kept);
        result
    }
}

/// Replaces old tool result content with a placeholder, keeping the most
/// recent `keep_recent_n` tool results intact.
///
/// Preserves `tool_use_id` so the conversation still reads coherently —
/// only the bulky result payload is dropped.
pub struct ToolResultClearing {
    keep_recent_n: usize,
    counter: TokenCounter,
}

impl ToolResultClearing {
    /// Create a new strategy keeping the `keep_recent_n` most recent
    /// tool results untouched.
    pub fn new(keep_recent_n: usize) -> Self {
        Self { keep_recent_n, counter: TokenCounter::new() }
    }
}

impl ContextStrategy for ToolResultClearing {
    fn token_estimate(&self, messages: &[ProviderMessage]) -> usize {
        self.counter.estimate_messages(messages)
    }

    fn should_compact(&self, messages: &[ProviderMessage], limit: usize) -> bool {
        self.token_estimate(messages) > limit
    }

    fn compact(&self, mut messages: Vec<ProviderMessage>) -> Vec<ProviderMessage> {
        let mut positions: Vec<(usize, usize)> = Vec::new();
        for (msg_idx, msg) in messages.iter().enumerate() {
            for (part_idx, part) in msg.content.iter().enumerate() {
                if matches!(part, ContentPart::ToolResult { .. }) {
                    positions.push((msg_idx, part_idx));
                }
            }
        }

        let to_clear_count = positions.len().saturating_sub(self.keep_recent_n);
        if to_clear_count == 0 {
            return messages;
        }

        for &(msg_idx, part_idx) in &positions[..to_clear_count] {
            if let ContentPart::ToolResult { content, is_error, .. } =
                &mut messages[msg_idx].content[part_idx]
            {
                *content = "[tool result cleared]".to_string();
                *is_error = false;
            }
        }

        messages
    }
}

/// Chains multiple strategies, applying each in order until the estimated
/// token count falls at or below `limit` (or the strategies are exhausted).
pub struct Composite {
    strategies: Vec<Box<dyn ContextStrategy>>,
    counter: TokenCounter,
}

impl Composite {
    /// Create a composite strategy from an ordered list of strategies.
    /// Earlier strategies are tried first.
    pub fn new(strategies: Vec<Box<dyn ContextStrategy>>) -> Self {
        Self { strategies, counter: TokenCounter::new() }
    }
}

impl ContextStrategy for Composite {
    fn token_estimate(&self, messages: &[ProviderMessage]) -> usize {
        self.counter.estimate_messages(messages)
    }

    fn should_compact(&self, messages: &[ProviderMessage], limit: usize) -> bool {
        self.token_estimate(messages) > limit
    }

    fn compact(&self, messages: Vec<ProviderMessage>) -> Vec<ProviderMessage> {
        let mut current = messages;
        for strategy in &self.strategies {
            current = strategy.compact(current);
        }
        current
    }
}
