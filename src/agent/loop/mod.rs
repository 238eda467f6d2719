mod helpers;

use crate::agent::context::ContextBuilder;
use crate::agent::tools::base::{ExecutionContext, ToolResult};
use crate::agent::tools::{ToolHostConnector, ToolHostSession, ToolRegistry};
use crate::config::Config;
use crate::errors::TaskpilotError;
use crate::providers::base::{
    ChatRequest, LLMProvider, Message, ProviderMetrics, ToolCallRequest,
};
use crate::store::{ConversationStore, MessageRole};
use crate::utils::truncate_chars;
use helpers::prepare_arguments;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Configuration for creating an [`AgentLoop`] instance.
pub struct AgentLoopConfig {
    pub provider: Arc<dyn LLMProvider>,
    pub store: Arc<dyn ConversationStore>,
    pub tool_host: Arc<dyn ToolHostConnector>,
    pub model: Option<String>,
    /// Completion round trips allowed per exchange (default 10)
    pub max_iterations: usize,
    /// Deadline for tool discovery plus the whole completion loop (default 120s)
    pub exchange_timeout: Duration,
    /// Max tokens for completion responses (default 4096)
    pub max_tokens: u32,
    /// Temperature for response generation (default 0.7)
    pub temperature: f32,
    /// Conversation titles are the first message cut to this many characters
    pub title_max_chars: usize,
}

impl AgentLoopConfig {
    pub fn from_config(
        config: &Config,
        provider: Arc<dyn LLMProvider>,
        store: Arc<dyn ConversationStore>,
        tool_host: Arc<dyn ToolHostConnector>,
    ) -> Self {
        let agent = &config.agent;
        Self {
            provider,
            store,
            tool_host,
            model: Some(agent.model.clone()),
            max_iterations: agent.max_tool_iterations,
            exchange_timeout: Duration::from_secs(agent.exchange_timeout_secs),
            max_tokens: agent.max_tokens,
            temperature: agent.temperature,
            title_max_chars: agent.title_max_chars,
        }
    }

    /// Create a config with sensible test defaults. Only the three injected
    /// services are required.
    #[doc(hidden)]
    pub fn test_defaults(
        provider: Arc<dyn LLMProvider>,
        store: Arc<dyn ConversationStore>,
        tool_host: Arc<dyn ToolHostConnector>,
    ) -> Self {
        Self {
            provider,
            store,
            tool_host,
            model: Some("mock-model".to_string()),
            max_iterations: 10,
            exchange_timeout: Duration::from_secs(10),
            max_tokens: 1024,
            temperature: 0.7,
            title_max_chars: 30,
        }
    }
}

/// The reply to one user message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeReply {
    pub conversation_id: i64,
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExchangeState {
    LoadingContext,
    AwaitingCompletion,
    ExecutingTools,
    Done,
}

pub struct AgentLoop {
    provider: Arc<dyn LLMProvider>,
    store: Arc<dyn ConversationStore>,
    tool_host: Arc<dyn ToolHostConnector>,
    model: String,
    max_iterations: usize,
    exchange_timeout: Duration,
    max_tokens: u32,
    temperature: f32,
    title_max_chars: usize,
}

impl AgentLoop {
    pub fn new(config: AgentLoopConfig) -> Self {
        let model = config
            .model
            .unwrap_or_else(|| config.provider.default_model().to_string());
        Self {
            provider: config.provider,
            store: config.store,
            tool_host: config.tool_host,
            model,
            max_iterations: config.max_iterations.max(1),
            exchange_timeout: config.exchange_timeout,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            title_max_chars: config.title_max_chars,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Counters accumulated by the completion provider since startup.
    pub fn provider_metrics(&self) -> ProviderMetrics {
        self.provider.metrics()
    }

    /// Run one user message through the assistant.
    ///
    /// Ownership is checked before anything is persisted or sent to the
    /// completion service. The tool host session opened here is shut down on
    /// every return path after it was connected.
    pub async fn process_exchange(
        &self,
        owner_id: &str,
        message: &str,
        conversation_id: Option<i64>,
    ) -> Result<ExchangeReply, TaskpilotError> {
        let start = Instant::now();
        log_state(ExchangeState::LoadingContext, conversation_id);

        let seed_title = truncate_chars(message.trim(), self.title_max_chars);
        let conversation = self
            .store
            .get_or_create(conversation_id, owner_id, &seed_title)
            .await?;
        self.store
            .append_message(conversation.id, MessageRole::User, message)
            .await?;
        let history = self.store.load_history(conversation.id).await?;
        let messages = ContextBuilder::build_messages(&history);
        debug!(
            "conversation {}: {} persisted messages loaded",
            conversation.id,
            history.len()
        );

        let ctx = ExecutionContext {
            owner_id: owner_id.to_string(),
            conversation_id: conversation.id,
        };
        let session = self.tool_host.connect(owner_id).await?;
        let outcome = tokio::time::timeout(
            self.exchange_timeout,
            self.run_tool_loop(&session, messages, &ctx),
        )
        .await;
        session.shutdown().await;

        let content = match outcome {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    "conversation {}: exchange exceeded {}s deadline",
                    conversation.id,
                    self.exchange_timeout.as_secs()
                );
                return Err(TaskpilotError::CompletionService(format!(
                    "exchange did not finish within {}s",
                    self.exchange_timeout.as_secs()
                )));
            }
        };

        self.store
            .append_message(conversation.id, MessageRole::Assistant, &content)
            .await?;
        log_state(ExchangeState::Done, Some(conversation.id));
        let metrics = self.provider.metrics();
        info!(
            "conversation {}: exchange finished in {}ms (completions: {} requests, {} tokens, {} errors)",
            conversation.id,
            start.elapsed().as_millis(),
            metrics.request_count,
            metrics.token_count,
            metrics.error_count
        );

        Ok(ExchangeReply {
            conversation_id: conversation.id,
            role: MessageRole::Assistant.as_str().to_string(),
            content,
        })
    }

    async fn run_tool_loop(
        &self,
        session: &Arc<dyn ToolHostSession>,
        mut messages: Vec<Message>,
        ctx: &ExecutionContext,
    ) -> Result<String, TaskpilotError> {
        let descriptors = session.discover().await?;
        let registry = Arc::new(ToolRegistry::from_session(session, descriptors));
        let tools_defs = registry.get_tool_definitions();
        debug!("tool catalog: {:?}", registry.tool_names());

        for iteration in 1..=self.max_iterations {
            log_state(ExchangeState::AwaitingCompletion, Some(ctx.conversation_id));
            let response = self
                .provider
                .chat_with_retry(
                    ChatRequest {
                        messages: messages.clone(),
                        tools: (!tools_defs.is_empty()).then(|| tools_defs.clone()),
                        model: Some(self.model.as_str()),
                        max_tokens: self.max_tokens,
                        temperature: self.temperature,
                        tool_choice: Some("auto".to_string()),
                    },
                    None,
                )
                .await
                .map_err(|e| {
                    error!("completion request failed on iteration {}: {:#}", iteration, e);
                    TaskpilotError::CompletionService(format!("{:#}", e))
                })?;

            if !response.has_tool_calls() {
                return Ok(response.content.unwrap_or_default());
            }

            log_state(ExchangeState::ExecutingTools, Some(ctx.conversation_id));
            let tool_calls = response.tool_calls;
            debug!(
                "iteration {}: {} tool call(s) requested",
                iteration,
                tool_calls.len()
            );
            ContextBuilder::add_assistant_message(
                &mut messages,
                response.content.as_deref(),
                Some(tool_calls.clone()),
            );
            let results = execute_tools(&registry, &tool_calls, ctx).await?;
            handle_tool_results(&mut messages, &tool_calls, results);
        }

        Err(TaskpilotError::CompletionService(format!(
            "no final answer after {} completion round trips",
            self.max_iterations
        )))
    }
}

fn log_state(state: ExchangeState, conversation_id: Option<i64>) {
    debug!("exchange state {:?} (conversation {:?})", state, conversation_id);
}

/// Run one batch of tool calls. Calls are dispatched concurrently and the
/// results come back in emission order.
async fn execute_tools(
    registry: &Arc<ToolRegistry>,
    tool_calls: &[ToolCallRequest],
    ctx: &ExecutionContext,
) -> Result<Vec<ToolResult>, TaskpilotError> {
    if tool_calls.len() == 1 {
        return execute_tool_call(registry, &tool_calls[0], ctx).await.map(|r| vec![r]);
    }

    let handles: Vec<_> = tool_calls
        .iter()
        .map(|tc| {
            let registry = registry.clone();
            let tc = tc.clone();
            let ctx = ctx.clone();
            tokio::task::spawn(async move { execute_tool_call(&registry, &tc, &ctx).await })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for join_result in futures_util::future::join_all(handles).await {
        match join_result {
            Ok(result) => results.push(result?),
            Err(join_err) => {
                error!("Tool task panicked: {:?}", join_err);
                results.push(ToolResult::error_payload(
                    "TOOL_CRASHED",
                    "Tool crashed unexpectedly",
                ));
            }
        }
    }
    Ok(results)
}

async fn execute_tool_call(
    registry: &ToolRegistry,
    call: &ToolCallRequest,
    ctx: &ExecutionContext,
) -> Result<ToolResult, TaskpilotError> {
    let params = match prepare_arguments(registry, call) {
        Ok(params) => params,
        Err(rejected) => {
            warn!("tool '{}' arguments rejected: {}", call.name, rejected.content);
            return Ok(rejected);
        }
    };
    info!("invoking tool '{}' (call {})", call.name, call.id);
    registry
        .execute(&call.name, params, ctx)
        .await
        .map_err(TaskpilotError::from_anyhow)
}

/// Append one tool-role message per call, in call order.
fn handle_tool_results(
    messages: &mut Vec<Message>,
    tool_calls: &[ToolCallRequest],
    mut results: Vec<ToolResult>,
) {
    if tool_calls.len() != results.len() {
        error!(
            "tool_calls and results length mismatch: {} vs {}, adding error results for missing entries",
            tool_calls.len(),
            results.len()
        );
        // Every tool call must get a response
        while results.len() < tool_calls.len() {
            results.push(ToolResult::error_payload(
                "TOOL_RESULT_LOST",
                "Tool execution result was lost",
            ));
        }
    }
    for (tc, result) in tool_calls.iter().zip(results) {
        ContextBuilder::add_tool_result(messages, &tc.id, &result.content, result.is_error);
    }
}
