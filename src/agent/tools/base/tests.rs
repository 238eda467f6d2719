use super::*;

#[test]
fn test_error_payload_shape() {
    let result = ToolResult::error_payload("NOT_FOUND", "Task with ID 5 not found.");
    assert!(result.is_error);
    let parsed: Value = serde_json::from_str(&result.content).unwrap();
    assert_eq!(parsed["error"], true);
    assert_eq!(parsed["code"], "NOT_FOUND");
    assert_eq!(parsed["message"], "Task with ID 5 not found.");
}

#[test]
fn test_display_is_content() {
    assert_eq!(ToolResult::new("done").to_string(), "done");
}
