use crate::config::ProviderConfig;
use crate::providers::base::{
    ChatRequest, LLMProvider, LLMResponse, Message, ProviderMetrics, ToolCallRequest,
};
use crate::providers::errors::ProviderErrorHandler;
use crate::providers::provider_http_client;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tracing::warn;

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Chat-completions client for OpenAI and wire-compatible endpoints.
pub struct OpenAIProvider {
    api_key: String,
    default_model: String,
    endpoint: String,
    provider_name: String,
    client: Client,
    metrics: Arc<Mutex<ProviderMetrics>>,
}

impl OpenAIProvider {
    /// Build from config. `apiBase` is the versioned API root, e.g. `http://localhost:11434/v1`.
    pub fn from_config(config: &ProviderConfig, default_model: &str) -> Self {
        let endpoint = config.api_base.as_deref().map_or_else(
            || API_URL.to_string(),
            |base| format!("{}/chat/completions", base.trim_end_matches('/')),
        );
        Self::with_endpoint(config.api_key.clone(), default_model.to_string(), endpoint)
    }

    /// Post directly to `endpoint` without appending a path.
    pub fn with_endpoint(api_key: String, default_model: String, endpoint: String) -> Self {
        Self {
            api_key,
            default_model,
            endpoint,
            provider_name: "OpenAI".to_string(),
            client: provider_http_client(),
            metrics: Arc::new(Mutex::new(ProviderMetrics::default())),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn encode_message(msg: Message) -> Value {
        let mut m = json!({
            "role": msg.role,
            "content": msg.content,
        });

        if let Some(tool_calls) = msg.tool_calls {
            m["tool_calls"] = json!(
                tool_calls
                    .into_iter()
                    .map(|tc| {
                        // Undecodable argument text is echoed back exactly as received
                        let args_str = match tc.arguments {
                            Value::String(raw) => raw,
                            other => serde_json::to_string(&other)
                                .unwrap_or_else(|_| "{}".to_string()),
                        };
                        json!({
                            "id": tc.id,
                            "type": "function",
                            "function": {
                                "name": tc.name,
                                "arguments": args_str
                            }
                        })
                    })
                    .collect::<Vec<_>>()
            );
            // Assistant turns that only carry tool calls send null content
            if msg.content.is_empty() {
                m["content"] = Value::Null;
            }
        }

        if let Some(tool_call_id) = msg.tool_call_id {
            m["tool_call_id"] = json!(tool_call_id);
        }

        m
    }

    fn parse_response(json: &Value) -> Result<LLMResponse> {
        let choice = json["choices"]
            .as_array()
            .and_then(|arr| arr.first())
            .context("No choices in OpenAI response")?;

        let message = &choice["message"];
        let content = message["content"]
            .as_str()
            .map(std::string::ToString::to_string);

        let mut tool_calls = Vec::new();
        if let Some(tool_calls_array) = message["tool_calls"].as_array() {
            for tc in tool_calls_array {
                let Some(function) = tc["function"].as_object() else {
                    continue;
                };
                let name = function
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                let raw = function
                    .get("arguments")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                let arguments = if raw.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(raw).unwrap_or_else(|e| {
                        warn!("tool call '{}' has malformed arguments: {}", name, e);
                        Value::String(raw.to_string())
                    })
                };

                tool_calls.push(ToolCallRequest {
                    id: tc["id"].as_str().unwrap_or("").to_string(),
                    name,
                    arguments,
                });
            }
        }

        let usage = json.get("usage");
        Ok(LLMResponse {
            content,
            tool_calls,
            input_tokens: usage
                .and_then(|u| u.get("prompt_tokens"))
                .and_then(Value::as_u64),
            output_tokens: usage
                .and_then(|u| u.get("completion_tokens"))
                .and_then(Value::as_u64),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn chat(&self, req: ChatRequest<'_>) -> Result<LLMResponse> {
        let openai_messages: Vec<Value> =
            req.messages.into_iter().map(Self::encode_message).collect();

        let mut payload = json!({
            "model": req.model.unwrap_or(&self.default_model),
            "messages": openai_messages,
            "max_tokens": req.max_tokens,
            "temperature": req.temperature,
        });

        if let Some(tools) = req.tools
            && !tools.is_empty()
        {
            payload["tools"] = json!(
                tools
                    .into_iter()
                    .map(|t| json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters
                        }
                    }))
                    .collect::<Vec<_>>()
            );
            if let Some(ref choice) = req.tool_choice {
                payload["tool_choice"] = json!(choice);
            }
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {} API", self.provider_name))?;

        let json =
            ProviderErrorHandler::check_response(resp, &self.provider_name, &self.metrics).await?;

        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.request_count += 1;
            if let Some(tokens) = json
                .get("usage")
                .and_then(|u| u.get("total_tokens"))
                .and_then(Value::as_u64)
            {
                metrics.token_count += tokens;
            }
        }

        Self::parse_response(&json)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn metrics(&self) -> ProviderMetrics {
        self.metrics
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}
