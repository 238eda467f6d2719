//! MCP client side of the tool host: spawns the host process per exchange and
//! speaks MCP to it over stdio.

use crate::agent::tools::base::ToolResult;
use crate::agent::tools::host::{ToolDescriptor, ToolHostConnector, ToolHostSession};
use crate::config::Config;
use crate::errors::TaskpilotError;
use anyhow::Context;
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, CallToolResult, RawContent};
use rmcp::service::{Peer, RunningService, ServiceError};
use rmcp::transport::TokioChildProcess;
use rmcp::{RoleClient, ServiceExt};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Env var carrying the acting user into the tool host.
pub const USER_ID_ENV: &str = "TASKPILOT_USER_ID";

/// Launches the tool host as a child process speaking MCP over stdio.
#[derive(Debug, Clone)]
pub struct McpToolHost {
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    handshake_timeout: Duration,
    call_timeout: Duration,
}

impl McpToolHost {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: HashMap::new(),
            handshake_timeout: Duration::from_secs(30),
            call_timeout: Duration::from_secs(30),
        }
    }

    /// With no configured command, re-execute the running binary.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let command = match &config.tool_host.command {
            Some(command) => command.clone(),
            None => std::env::current_exe()
                .context("Could not determine current executable for the tool host")?
                .to_string_lossy()
                .into_owned(),
        };
        Ok(Self::new(command, config.tool_host.args.clone())
            .with_env(config.tool_host_env())
            .with_timeouts(
                Duration::from_secs(config.tool_host.handshake_timeout_secs),
                Duration::from_secs(config.tool_host.call_timeout_secs),
            ))
    }

    #[must_use]
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, handshake: Duration, call: Duration) -> Self {
        self.handshake_timeout = handshake;
        self.call_timeout = call;
        self
    }
}

#[async_trait]
impl ToolHostConnector for McpToolHost {
    async fn connect(&self, owner_id: &str) -> Result<Arc<dyn ToolHostSession>, TaskpilotError> {
        let mut cmd = tokio::process::Command::new(&self.command);
        cmd.args(&self.args);
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        cmd.env(USER_ID_ENV, owner_id);

        // stdout is the MCP channel; the host logs to our stderr
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::inherit());

        let transport = TokioChildProcess::new(cmd).map_err(|e| {
            TaskpilotError::ToolHostUnavailable(format!(
                "failed to spawn '{}': {}",
                self.command, e
            ))
        })?;
        let client = tokio::time::timeout(self.handshake_timeout, ().serve(transport))
            .await
            .map_err(|_| {
                TaskpilotError::ToolHostUnavailable(format!(
                    "MCP handshake timed out ({}s)",
                    self.handshake_timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                TaskpilotError::ToolHostUnavailable(format!("MCP handshake failed: {}", e))
            })?;

        debug!("tool host connected for {}", owner_id);
        Ok(Arc::new(McpSession {
            peer: client.peer().clone(),
            client: Mutex::new(Some(client)),
            call_timeout: self.call_timeout,
            list_timeout: self.handshake_timeout,
        }))
    }
}

/// One running tool host process.
pub struct McpSession {
    peer: Peer<RoleClient>,
    client: Mutex<Option<RunningService<RoleClient, ()>>>,
    call_timeout: Duration,
    list_timeout: Duration,
}

#[async_trait]
impl ToolHostSession for McpSession {
    async fn discover(&self) -> Result<Vec<ToolDescriptor>, TaskpilotError> {
        let tools = tokio::time::timeout(self.list_timeout, self.peer.list_all_tools())
            .await
            .map_err(|_| {
                TaskpilotError::ToolHostUnavailable(format!(
                    "tool discovery timed out ({}s)",
                    self.list_timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                TaskpilotError::ToolHostUnavailable(format!("failed to list tools: {}", e))
            })?;

        let descriptors: Vec<ToolDescriptor> = tools
            .into_iter()
            .map(|tool| ToolDescriptor {
                name: tool.name.to_string(),
                description: tool.description.as_deref().unwrap_or("").to_string(),
                input_schema: Value::Object((*tool.input_schema).clone()),
            })
            .collect();
        info!("discovered {} tools from tool host", descriptors.len());
        Ok(descriptors)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolResult, TaskpilotError> {
        let request = CallToolRequestParams::new(Cow::Owned(name.to_string()))
            .with_arguments(arguments);

        match self.peer.call_tool(request).await {
            Ok(result) => Ok(flatten_result(&result)),
            // The host answered with a protocol-level error (unknown tool, bad params)
            Err(ServiceError::McpError(data)) => {
                warn!("tool host rejected '{}': {}", name, data.message);
                Ok(ToolResult::error_payload("TOOL_ERROR", data.message))
            }
            Err(e) => Err(TaskpilotError::ToolHostUnavailable(format!(
                "call to '{}' failed: {}",
                name, e
            ))),
        }
    }

    async fn shutdown(&self) {
        let Some(client) = self.client.lock().await.take() else {
            return;
        };
        if let Err(e) = client.cancel().await {
            warn!("error shutting down tool host: {}", e);
        } else {
            debug!("tool host shut down");
        }
    }

    fn call_timeout(&self) -> Duration {
        self.call_timeout
    }
}

/// Join text blocks with newlines; non-text blocks become short placeholders.
fn flatten_result(result: &CallToolResult) -> ToolResult {
    let mut output = String::new();
    for content in &result.content {
        if !output.is_empty() {
            output.push('\n');
        }
        match &content.raw {
            RawContent::Text(text) => output.push_str(&text.text),
            RawContent::Image(img) => {
                let _ = write!(output, "[Image: {} ({} bytes)]", img.mime_type, img.data.len());
            }
            _ => output.push_str("[Unsupported MCP content type]"),
        }
    }
    if output.is_empty() {
        output = "(no output)".to_string();
    }

    if result.is_error.unwrap_or(false) {
        ToolResult::error(output)
    } else {
        ToolResult::new(output)
    }
}
