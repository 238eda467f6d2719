use super::*;
use crate::errors::TaskpilotError;
use async_trait::async_trait;
use serde_json::{Map, json};
use std::sync::Mutex;
use std::time::Duration;

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "echo back"
    }
    fn parameters(&self) -> Value {
        json!({"type": "object"})
    }
    async fn execute(&self, params: Value, _ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
        Ok(ToolResult::new(params.to_string()))
    }
}

struct SlowTool;

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }
    fn description(&self) -> &str {
        "never finishes in time"
    }
    fn parameters(&self) -> Value {
        json!({"type": "object"})
    }
    async fn execute(&self, _params: Value, _ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(ToolResult::new("late"))
    }
    fn execution_timeout(&self) -> Duration {
        Duration::from_millis(20)
    }
}

struct PanicTool;

#[async_trait]
impl Tool for PanicTool {
    fn name(&self) -> &str {
        "boom"
    }
    fn description(&self) -> &str {
        "panics"
    }
    fn parameters(&self) -> Value {
        json!({"type": "object"})
    }
    async fn execute(&self, _params: Value, _ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
        panic!("kaboom");
    }
}

/// Records forwarded calls and answers every one with an UNKNOWN_TOOL payload.
#[derive(Default)]
struct RecordingSession {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ToolHostSession for RecordingSession {
    async fn discover(&self) -> Result<Vec<ToolDescriptor>, TaskpilotError> {
        Ok(vec![])
    }
    async fn call_tool(
        &self,
        name: &str,
        _arguments: Map<String, Value>,
    ) -> Result<ToolResult, TaskpilotError> {
        self.calls.lock().unwrap().push(name.to_string());
        Ok(ToolResult::error_payload("UNKNOWN_TOOL", format!("Unknown tool: {}", name)))
    }
    async fn shutdown(&self) {}
}

#[test]
fn test_register_rejects_invalid_names() {
    struct Nameless;
    #[async_trait]
    impl Tool for Nameless {
        fn name(&self) -> &str {
            ""
        }
        fn description(&self) -> &str {
            ""
        }
        fn parameters(&self) -> Value {
            json!({})
        }
        async fn execute(&self, _p: Value, _c: &ExecutionContext) -> anyhow::Result<ToolResult> {
            Ok(ToolResult::new(""))
        }
    }
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(Nameless));
    assert!(registry.is_empty());
}

#[test]
fn test_definitions_sorted_from_descriptors() {
    let session: Arc<dyn ToolHostSession> = Arc::new(RecordingSession::default());
    let registry = ToolRegistry::from_session(
        &session,
        vec![
            ToolDescriptor {
                name: "list_tasks".into(),
                description: "List tasks".into(),
                input_schema: json!({"type": "object", "properties": {"status": {"type": "string"}}}),
            },
            ToolDescriptor {
                name: "add_task".into(),
                description: "Add a task".into(),
                input_schema: json!({"type": "object", "required": ["title"]}),
            },
        ],
    );
    let defs = registry.get_tool_definitions();
    assert_eq!(
        defs.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
        ["add_task", "list_tasks"]
    );
    assert_eq!(defs[0].parameters["required"][0], "title");
    assert_eq!(registry.tool_names(), ["add_task", "list_tasks"]);
}

#[tokio::test]
async fn test_execute_registered_tool() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool));
    let result = registry
        .execute("echo", json!({"a": 1}), &ExecutionContext::default())
        .await
        .unwrap();
    assert_eq!(result.content, r#"{"a":1}"#);
}

struct WhoAmITool;

#[async_trait]
impl Tool for WhoAmITool {
    fn name(&self) -> &str {
        "whoami"
    }
    fn description(&self) -> &str {
        "report the execution context"
    }
    fn parameters(&self) -> Value {
        json!({"type": "object"})
    }
    async fn execute(&self, _params: Value, ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
        Ok(ToolResult::new(format!("{}/{}", ctx.owner_id, ctx.conversation_id)))
    }
}

#[tokio::test]
async fn test_execution_context_reaches_tool() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(WhoAmITool));
    let ctx = ExecutionContext {
        owner_id: "alice".into(),
        conversation_id: 42,
    };
    let result = registry.execute("whoami", json!({}), &ctx).await.unwrap();
    assert_eq!(result.content, "alice/42");
}

#[tokio::test]
async fn test_unknown_tool_forwarded_to_host() {
    let session = Arc::new(RecordingSession::default());
    let dyn_session: Arc<dyn ToolHostSession> = session.clone();
    let registry = ToolRegistry::from_session(&dyn_session, vec![]);
    let result = registry
        .execute("fly_to_moon", json!({}), &ExecutionContext::default())
        .await
        .unwrap();
    assert!(result.is_error);
    assert!(result.content.contains("UNKNOWN_TOOL"));
    assert_eq!(*session.calls.lock().unwrap(), ["fly_to_moon"]);
}

#[tokio::test]
async fn test_unknown_tool_without_host() {
    let registry = ToolRegistry::new();
    let result = registry
        .execute("missing", json!({}), &ExecutionContext::default())
        .await
        .unwrap();
    assert!(result.is_error);
    assert!(result.content.contains("UNKNOWN_TOOL"));
}

#[tokio::test]
async fn test_timeout_becomes_error_result() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SlowTool));
    let result = registry
        .execute("slow", json!({}), &ExecutionContext::default())
        .await
        .unwrap();
    assert!(result.is_error);
    assert!(result.content.contains("TIMEOUT"));
}

#[tokio::test]
async fn test_panic_becomes_error_result() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(PanicTool));
    let result = registry
        .execute("boom", json!({}), &ExecutionContext::default())
        .await
        .unwrap();
    assert!(result.is_error);
    assert!(result.content.contains("kaboom"));
}

#[tokio::test]
async fn test_hosted_tool_rejects_non_object_arguments() {
    let session: Arc<dyn ToolHostSession> = Arc::new(RecordingSession::default());
    let tool = HostedTool::unlisted(session, "add_task");
    let result = tool
        .execute(json!([1, 2]), &ExecutionContext::default())
        .await
        .unwrap();
    assert!(result.content.contains("INVALID_ARGUMENTS"));
}
