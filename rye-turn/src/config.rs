//! Static defaults for a thread runner instance.

/// Static configuration for a thread runner instance.
///
/// Per-directive overrides (model, token/turn limits) come from the
/// directive's own declaration; this struct only holds the fallback
/// defaults applied when a directive doesn't declare its own.
pub struct RunnerConfig {
    /// Base system prompt used when a directive doesn't supply its own.
    pub system_prompt: String,

    /// Default model identifier.
    pub default_model: String,

    /// Default maximum output tokens per provider call.
    pub default_max_tokens: u32,

    /// Default maximum turns per thread.
    pub default_max_turns: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant.".into(),
            default_model: String::new(),
            default_max_tokens: 4096,
            default_max_turns: 25,
        }
    }
}
