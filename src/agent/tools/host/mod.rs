//! Seams between the agent loop and whatever process hosts the task tools.

use crate::agent::tools::base::{ExecutionContext, Tool, ToolResult};
use crate::errors::TaskpilotError;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A tool as advertised by the host: name, description, JSON input schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Opens one tool host session per exchange, scoped to the acting user.
#[async_trait]
pub trait ToolHostConnector: Send + Sync {
    async fn connect(&self, owner_id: &str) -> Result<Arc<dyn ToolHostSession>, TaskpilotError>;
}

/// A live connection to a tool host.
///
/// `call_tool` returns `Err` only for transport failures; a tool that ran and
/// failed is `Ok` with `is_error` set.
#[async_trait]
pub trait ToolHostSession: Send + Sync {
    async fn discover(&self) -> Result<Vec<ToolDescriptor>, TaskpilotError>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolResult, TaskpilotError>;

    /// Release the host. Safe to call more than once.
    async fn shutdown(&self);

    fn call_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
}

/// A host-provided tool exposed through the `Tool` trait.
pub struct HostedTool {
    session: Arc<dyn ToolHostSession>,
    descriptor: ToolDescriptor,
}

impl HostedTool {
    pub fn new(session: Arc<dyn ToolHostSession>, descriptor: ToolDescriptor) -> Self {
        Self {
            session,
            descriptor,
        }
    }

    /// A tool the host never listed. Calls are still forwarded so the host
    /// can answer with its own error.
    pub fn unlisted(session: Arc<dyn ToolHostSession>, name: &str) -> Self {
        Self::new(
            session,
            ToolDescriptor {
                name: name.to_string(),
                description: String::new(),
                input_schema: json!({"type": "object"}),
            },
        )
    }
}

#[async_trait]
impl Tool for HostedTool {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn parameters(&self) -> Value {
        self.descriptor.input_schema.clone()
    }

    async fn execute(&self, params: Value, ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
        let arguments = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Ok(ToolResult::error_payload(
                    "INVALID_ARGUMENTS",
                    format!("Arguments must be a JSON object, got: {}", other),
                ));
            }
        };
        debug!(
            "forwarding '{}' to tool host (owner {}, conversation {})",
            self.descriptor.name, ctx.owner_id, ctx.conversation_id
        );
        Ok(self
            .session
            .call_tool(&self.descriptor.name, arguments)
            .await?)
    }

    fn execution_timeout(&self) -> Duration {
        self.session.call_timeout()
    }
}
