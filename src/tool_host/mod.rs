//! MCP stdio server exposing the task tools for a single user.
//!
//! The agent spawns this as a child process per exchange. stdout carries the
//! protocol, so all logging goes to stderr.

pub mod tools;

use crate::agent::tools::mcp::USER_ID_ENV;
use crate::config::Config;
use crate::store::Database;
use anyhow::{Context, Result};
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, ListToolsResult, PaginatedRequestParams,
    ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, ServiceExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// Acting user when the host is started without `TASKPILOT_USER_ID`.
pub const DEFAULT_USER_ID: &str = "mcp-user";

#[derive(Clone)]
pub struct TaskToolServer {
    db: Arc<Database>,
    owner_id: String,
}

impl TaskToolServer {
    pub fn new(db: Arc<Database>, owner_id: impl Into<String>) -> Self {
        Self {
            db,
            owner_id: owner_id.into(),
        }
    }

    /// Take the acting user from the environment the agent spawned us with.
    pub fn from_env(db: Arc<Database>) -> Self {
        let owner_id = std::env::var(USER_ID_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_ID.to_string());
        Self::new(db, owner_id)
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn catalog() -> Vec<Tool> {
        tools::definitions()
            .into_iter()
            .map(|spec| {
                let schema = match spec.input_schema {
                    Value::Object(map) => map,
                    _ => serde_json::Map::new(),
                };
                Tool::new(spec.name, spec.description, Arc::new(schema))
            })
            .collect()
    }
}

impl ServerHandler for TaskToolServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info.server_info.name = "taskpilot".to_string();
        info.server_info.version = crate::VERSION.to_string();
        info.instructions = Some(format!("Task tools for user {}", self.owner_id));
        info
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(Self::catalog()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = request.arguments.unwrap_or_default();
        let result = tools::dispatch(&self.db, &self.owner_id, &request.name, arguments)
            .map_err(|e| {
                error!("tool host: {} failed: {:#}", request.name, e);
                McpError::internal_error(format!("{:#}", e), None)
            })?;
        let content = vec![Content::text(result.content)];
        if result.is_error {
            Ok(CallToolResult::error(content))
        } else {
            Ok(CallToolResult::success(content))
        }
    }
}

/// Serve the task tools over stdin/stdout until the client hangs up.
pub async fn serve_stdio(config: &Config) -> Result<()> {
    let db_path = config.database_path();
    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open task database at {}", db_path.display()))?;
    let server = TaskToolServer::from_env(Arc::new(db));
    info!("tool host serving tasks for {}", server.owner_id());

    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .context("MCP initialization failed")?;
    service.waiting().await.context("MCP server stopped abnormally")?;
    info!("tool host: client disconnected");
    Ok(())
}
