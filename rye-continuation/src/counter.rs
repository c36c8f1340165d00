//! Heuristic token estimation shared by every strategy in this crate.

use rye_turn::types::{ContentPart, ProviderMessage};

/// Estimates token counts from a chars-per-token ratio.
///
/// This is a heuristic, not a tokenizer: it exists so strategies can
/// decide *whether* to compact without depending on a provider-specific
/// tokenizer crate. A thread's actual usage (from the provider's
/// response) is always the authoritative count; this estimator only
/// needs to be in the right ballpark ahead of that response.
#[derive(Debug, Clone, Copy)]
pub struct TokenCounter {
    chars_per_token: usize,
}

impl TokenCounter {
    /// Create a counter with the default ratio (4 chars per token).
    pub fn new() -> Self {
        Self { chars_per_token: 4 }
    }

    /// Create a counter with a custom chars-per-token ratio.
    pub fn with_ratio(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    /// Estimate the token count of a single message.
    pub fn estimate_message(&self, message: &ProviderMessage) -> usize {
        message
            .content
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => text.len() / self.chars_per_token,
                ContentPart::ToolUse { input, .. } => {
                    input.to_string().len() / self.chars_per_token
                }
                ContentPart::ToolResult { content, .. } => content.len() / self.chars_per_token,
                ContentPart::Image { .. } => 1000,
            })
            .sum::<usize>()
            + 4 // per-message overhead (role, formatting)
    }

    /// Estimate the token count of a full message list.
    pub fn estimate_messages(&self, messages: &[ProviderMessage]) -> usize {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rye_turn::types::Role;

    fn text_message(role: Role, text: &str) -> ProviderMessage {
        ProviderMessage {
            role,
            content: vec![ContentPart::Text { text: text.to_string() }],
        }
    }

    #[test]
    fn estimates_by_chars_per_token_plus_overhead() {
        let counter = TokenCounter::new();
        let messages = vec![text_message(Role::User, &"a".repeat(400))];
        assert_eq!(counter.estimate_messages(&messages), 104);
    }

    #[test]
    fn custom_ratio_changes_the_estimate() {
        let counter = TokenCounter::with_ratio(2);
        let messages = vec![text_message(Role::User, &"a".repeat(400))];
        assert_eq!(counter.estimate_messages(&messages), 204);
    }

    #[test]
    fn zero_ratio_clamps_to_one() {
        let counter = TokenCounter::with_ratio(0);
        let messages = vec![text_message(Role::User, "ab")];
        assert_eq!(counter.estimate_messages(&messages), 2 + 4);
    }
}
