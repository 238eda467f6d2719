use super::*;
use chrono::{TimeZone, Utc};

fn stored(id: i64, role: MessageRole, content: &str) -> StoredMessage {
    StoredMessage {
        id,
        conversation_id: 1,
        role,
        content: content.to_string(),
        created_at: Utc::now(),
    }
}

#[test]
fn test_system_prompt_states_date_and_role() {
    let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
    let prompt = ContextBuilder::system_prompt(&now);
    assert!(prompt.contains("Today is Friday, March 14, 2025."));
    assert!(prompt.contains("task assistant"));
}

#[test]
fn test_transcript_is_system_plus_history() {
    let history = vec![
        stored(1, MessageRole::User, "add milk"),
        stored(2, MessageRole::Assistant, "Added."),
        stored(3, MessageRole::User, "show my tasks"),
    ];
    let messages = ContextBuilder::build_messages(&history);
    assert_eq!(messages.len(), history.len() + 1);
    assert_eq!(messages[0].role, "system");
    let roles: Vec<_> = messages[1..].iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, ["user", "assistant", "user"]);
    assert_eq!(messages[3].content, "show my tasks");
}

#[test]
fn test_stored_tool_output_replayed_as_assistant() {
    let history = vec![
        stored(1, MessageRole::User, "what's left?"),
        stored(2, MessageRole::Tool, r#"[{"id":1,"title":"buy milk"}]"#),
    ];
    let messages = ContextBuilder::build_messages(&history);
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2].role, "assistant");
    assert!(messages[2].tool_call_id.is_none());
    assert!(messages[2].tool_calls.is_none());
    assert_eq!(messages[2].content, history[1].content);
}

#[test]
fn test_empty_history_is_system_only() {
    let messages = ContextBuilder::build_messages(&[]);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, "system");
}

#[test]
fn test_tool_exchange_helpers() {
    let mut messages = ContextBuilder::build_messages(&[]);
    ContextBuilder::add_assistant_message(
        &mut messages,
        None,
        Some(vec![ToolCallRequest {
            id: "c1".into(),
            name: "list_tasks".into(),
            arguments: serde_json::json!({}),
        }]),
    );
    ContextBuilder::add_tool_result(&mut messages, "c1", "[]", false);
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].content, "");
    assert_eq!(messages[2].tool_call_id.as_deref(), Some("c1"));
}
