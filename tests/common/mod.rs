// Shared test helpers — not all items used by every test binary.
#![allow(unused)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use taskpilot::agent::tools::McpToolHost;
use taskpilot::agent::{AgentLoop, AgentLoopConfig};
use taskpilot::providers::base::{
    ChatRequest, LLMProvider, LLMResponse, Message, ToolCallRequest, ToolDefinition,
};
use taskpilot::store::Database;
use tempfile::TempDir;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub tool_choice: Option<String>,
}

pub struct MockLLMProvider {
    responses: Arc<std::sync::Mutex<VecDeque<LLMResponse>>>,
    pub calls: Arc<std::sync::Mutex<Vec<RecordedCall>>>,
    pub default_response: String,
}

impl MockLLMProvider {
    pub fn with_responses(responses: Vec<LLMResponse>) -> Self {
        Self {
            responses: Arc::new(std::sync::Mutex::new(VecDeque::from(responses))),
            calls: Arc::new(std::sync::Mutex::new(Vec::new())),
            default_response: "Mock response".to_string(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for MockLLMProvider {
    async fn chat(&self, req: ChatRequest<'_>) -> anyhow::Result<LLMResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: req.messages,
            model: req.model.map(|s| s.to_string()),
            tools: req.tools,
            tool_choice: req.tool_choice,
        });

        let response = self.responses.lock().unwrap().pop_front();
        Ok(response.unwrap_or_else(|| text_response(&self.default_response)))
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }
}

// --- Response builders ---

pub fn text_response(content: &str) -> LLMResponse {
    LLMResponse {
        content: Some(content.to_string()),
        ..Default::default()
    }
}

pub fn tool_response(calls: Vec<ToolCallRequest>) -> LLMResponse {
    LLMResponse {
        content: None,
        tool_calls: calls,
        ..Default::default()
    }
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

// --- Real tool host ---

/// A scratch home with its own task database.
pub struct TestEnv {
    pub dir: TempDir,
    pub db: Arc<Database>,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let db = Database::open(dir.path().join("taskpilot.db")).expect("open database");
        Self {
            dir,
            db: Arc::new(db),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("taskpilot.db")
    }

    /// The taskpilot binary re-executed as an MCP tool host over this env's database.
    pub fn tool_host(&self) -> McpToolHost {
        let mut env = HashMap::new();
        env.insert(
            "TASKPILOT_DATABASE_PATH".to_string(),
            self.db_path().to_string_lossy().into_owned(),
        );
        env.insert(
            "TASKPILOT_HOME".to_string(),
            self.dir.path().to_string_lossy().into_owned(),
        );
        env.insert("RUST_LOG".to_string(), "warn".to_string());
        McpToolHost::new(env!("CARGO_BIN_EXE_taskpilot"), vec!["tool-host".into()]).with_env(env)
    }

    pub fn agent(&self, provider: Arc<dyn LLMProvider>) -> AgentLoop {
        let mut config = AgentLoopConfig::test_defaults(
            provider,
            self.db.clone(),
            Arc::new(self.tool_host()),
        );
        config.exchange_timeout = std::time::Duration::from_secs(60);
        AgentLoop::new(config)
    }
}
