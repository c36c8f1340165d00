//! Create a conversation, check token counts, and compact with SlidingWindow.
//!
//! Run with: `cargo run --example compaction -p rye-continuation`

use rye_continuation::{ContextStrategy, SlidingWindow, TokenCounter};
use rye_turn::types::{ContentPart, ProviderMessage, Role};

fn message(role: Role, text: &str) -> ProviderMessage {
    ProviderMessage {
        role,
        content: vec![ContentPart::Text { text: text.to_string() }],
    }
}

fn main() {
    let counter = TokenCounter::new();

    let messages = vec![
        message(Role::System, "You are a helpful coding assistant."),
        message(Role::User, "Can you explain what a HashMap is in Rust?"),
        message(
            Role::Assistant,
            "A HashMap in Rust is a collection that stores key-value pairs. \
             It uses a hashing algorithm to map keys to their associated values, \
             providing O(1) average-case lookup, insertion, and deletion.",
        ),
        message(Role::User, "How do I iterate over a HashMap?"),
        message(
            Role::Assistant,
            "You can iterate over a HashMap using a for loop: \
             `for (key, value) in &map { ... }`. You can also use `.keys()`, \
             `.values()`, or `.iter()` for more specific iteration patterns.",
        ),
        message(Role::User, "What about BTreeMap? When should I use it instead?"),
        message(
            Role::Assistant,
            "Use BTreeMap when you need keys in sorted order. BTreeMap provides \
             O(log n) operations but maintains ordering. HashMap is faster for \
             unsorted access patterns.",
        ),
    ];

    let total_tokens = counter.estimate_messages(&messages);
    println!("Conversation has {} messages", messages.len());
    println!("Estimated token count: {total_tokens}");

    let strategy = SlidingWindow::new();
    let should = strategy.should_compact(&messages, 100);
    println!("\nShould compact (threshold=100, current={total_tokens}): {should}");

    if should {
        let compacted = strategy.compact(messages.clone());
        let compacted_tokens = counter.estimate_messages(&compacted);

        println!("\nBefore compaction:");
        println!("  Messages: {}", messages.len());
        println!("  Tokens:   {total_tokens}");

        println!("\nAfter compaction:");
        println!("  Messages: {}", compacted.len());
        println!("  Tokens:   {compacted_tokens}");

        for msg in &compacted {
            let role = match msg.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
                Role::System => "System",
            };
            let text = msg
                .content
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("");
            let display = if text.len() > 60 { format!("{}...", &text[..60]) } else { text };
            println!("  [{role}] {display}");
        }
    } else {
        println!("No compaction needed.");
    }
}
