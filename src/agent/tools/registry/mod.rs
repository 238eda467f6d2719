use crate::agent::tools::base::{ExecutionContext, Tool, ToolResult};
use crate::agent::tools::host::{HostedTool, ToolDescriptor, ToolHostSession};
use crate::providers::base::ToolDefinition;
use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Per-exchange mapping from tool name to an invocable tool.
///
/// Names the registry does not know are forwarded to the fallback session,
/// so the host gets the chance to report unknown tools itself.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    fallback: Option<Arc<dyn ToolHostSession>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            fallback: None,
        }
    }

    /// Build the registry for one tool host session from its advertised catalog.
    pub fn from_session(session: &Arc<dyn ToolHostSession>, descriptors: Vec<ToolDescriptor>) -> Self {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(Arc::new(HostedTool::new(session.clone(), descriptor)));
        }
        registry.fallback = Some(session.clone());
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if name.is_empty() || name.len() > 256 || name.chars().any(char::is_control) {
            warn!(
                "tool registry: rejecting tool with invalid name (len={}, has_control_chars={})",
                name.len(),
                name.chars().any(char::is_control)
            );
            return;
        }
        if self.tools.contains_key(&name) {
            warn!("tool registry: overwriting duplicate tool '{}'", name);
        }
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Returns a sorted list of all registered tool names.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Catalog in the completion service's function format, sorted by name.
    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self
            .tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool with timeout and panic isolation.
    ///
    /// `Err` is reserved for failures that make the whole exchange unusable
    /// (the tool host went away); everything else is an error `ToolResult`.
    pub async fn execute(
        &self,
        name: &str,
        params: Value,
        ctx: &ExecutionContext,
    ) -> Result<ToolResult> {
        let tool = match (self.tools.get(name), &self.fallback) {
            (Some(tool), _) => tool.clone(),
            (None, Some(session)) => {
                debug!("tool '{}' not in catalog, forwarding to host", name);
                Arc::new(HostedTool::unlisted(session.clone(), name)) as Arc<dyn Tool>
            }
            (None, None) => {
                return Ok(ToolResult::error_payload(
                    "UNKNOWN_TOOL",
                    format!("Tool '{}' is not available.", name),
                ));
            }
        };

        let start = Instant::now();
        let result = self.execute_with_guards(name, tool, params, ctx).await?;
        let elapsed_ms = start.elapsed().as_millis();
        if result.is_error {
            warn!(
                "tool '{}' returned an error in {}ms (conversation {})",
                name, elapsed_ms, ctx.conversation_id
            );
        } else {
            info!(
                "tool '{}' completed in {}ms (conversation {})",
                name, elapsed_ms, ctx.conversation_id
            );
        }
        Ok(result)
    }

    async fn execute_with_guards(
        &self,
        name: &str,
        tool: Arc<dyn Tool>,
        params: Value,
        ctx: &ExecutionContext,
    ) -> Result<ToolResult> {
        let tool_name = name.to_string();
        let ctx = ctx.clone();
        let timeout = tool.execution_timeout();
        let timeout_secs = timeout.as_secs();

        let handle = tokio::task::spawn(async move {
            tokio::time::timeout(timeout, tool.execute(params, &ctx)).await
        });

        match handle.await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                warn!("Tool '{}' timed out after {}s", tool_name, timeout_secs);
                Ok(ToolResult::error_payload(
                    "TIMEOUT",
                    format!("Tool '{}' timed out after {}s", tool_name, timeout_secs),
                ))
            }
            Err(join_err) => {
                if join_err.is_panic() {
                    // into_panic() consumes the JoinError
                    let panic_payload = join_err.into_panic();
                    let panic_msg = panic_payload
                        .downcast_ref::<String>()
                        .map(String::as_str)
                        .or_else(|| panic_payload.downcast_ref::<&str>().copied())
                        .unwrap_or("unknown cause");
                    error!("Tool '{}' panicked: {}", tool_name, panic_msg);
                    Ok(ToolResult::error_payload(
                        "TOOL_CRASHED",
                        format!("Tool '{}' crashed: {}", tool_name, panic_msg),
                    ))
                } else {
                    Err(anyhow::anyhow!("Tool '{}' was cancelled", tool_name))
                }
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
