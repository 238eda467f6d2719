use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }

    /// Structured error payload in the shape the task tools use:
    /// `{"error": true, "code": ..., "message": ...}`.
    pub fn error_payload(code: &str, message: impl Into<String>) -> Self {
        Self::error(error_payload(code, &message.into()))
    }
}

impl std::fmt::Display for ToolResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

pub fn error_payload(code: &str, message: &str) -> String {
    json!({"error": true, "code": code, "message": message}).to_string()
}

/// Identity of the exchange a tool runs in.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub owner_id: String,
    pub conversation_id: i64,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value; // JSON Schema

    /// `Err` means the tool could not be reached at all; tool-level failures
    /// come back as `Ok(ToolResult::error(..))`.
    async fn execute(&self, params: Value, ctx: &ExecutionContext) -> anyhow::Result<ToolResult>;

    /// Per-tool execution timeout.
    fn execution_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
}

#[cfg(test)]
mod tests;
