//! Integration tests for ToolResultClearing.

use rye_continuation::{ContextStrategy, ToolResultClearing};
use rye_turn::types::{ContentPart, ProviderMessage, Role};

fn tool_result(id: &str, content: &str) -> ProviderMessage {
    ProviderMessage {
        role: Role::User,
        content: vec![ContentPart::ToolResult {
            tool_use_id: id.to_string(),
            content: content.to_string(),
            is_error: false,
        }],
    }
}

#[test]
fn clears_all_but_the_most_recent_n() {
    let strategy = ToolResultClearing::new(2);
    let messages = vec![
        tool_result("a", "first output"),
        tool_result("b", "second output"),
        tool_result("c", "third output"),
    ];

    let compacted = strategy.compact(messages);

    let ContentPart::ToolResult { content, .. } = &compacted[0].content[0] else {
        panic!("expected tool result");
    };
    assert_eq!(content, "[tool result cleared]");

    for msg in &compacted[1..] {
        let ContentPart::ToolResult { content, .. } = &msg.content[0] else {
            panic!("expected tool result");
        };
        assert_ne!(content, "[tool result cleared]");
    }
}

#[test]
fn leaves_everything_when_under_the_keep_count() {
    let strategy = ToolResultClearing::new(5);
    let messages = vec![tool_result("a", "output one"), tool_result("b", "output two")];

    let compacted = strategy.compact(messages.clone());
    assert_eq!(compacted, messages);
}

#[test]
fn clears_error_flag_on_cleared_results() {
    let strategy = ToolResultClearing::new(0);
    let messages = vec![ProviderMessage {
        role: Role::User,
        content: vec![ContentPart::ToolResult {
            tool_use_id: "call-1".into(),
            content: "boom".into(),
            is_error: true,
        }],
    }];

    let compacted = strategy.compact(messages);
    let ContentPart::ToolResult { is_error, content, .. } = &compacted[0].content[0] else {
        panic!("expected tool result");
    };
    assert!(!is_error);
    assert_eq!(content, "[tool result cleared]");
}

#[test]
fn ignores_messages_with_no_tool_results() {
    let strategy = ToolResultClearing::new(0);
    let messages = vec![ProviderMessage {
        role: Role::Assistant,
        content: vec![ContentPart::Text { text: "just talking".into() }],
    }];

    let compacted = strategy.compact(messages.clone());
    assert_eq!(compacted, messages);
}

#[test]
fn multiple_tool_results_in_one_message() {
    let strategy = ToolResultClearing::new(1);
    let messages = vec![ProviderMessage {
        role: Role::User,
        content: vec![
            ContentPart::ToolResult { tool_use_id: "a".into(), content: "result a".into(), is_error: false },
            ContentPart::ToolResult { tool_use_id: "b".into(), content: "result b".into(), is_error: false },
        ],
    }];

    let compacted = strategy.compact(messages);
    let ContentPart::ToolResult { content: first, .. } = &compacted[0].content[0] else {
        panic!("expected tool result");
    };
    let ContentPart::ToolResult { content: second, .. } = &compacted[0].content[1] else {
        panic!("expected tool result");
    };
    assert_eq!(first, "[tool result cleared]");
    assert_eq!(second, "result b");
}
