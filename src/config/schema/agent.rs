use serde::{Deserialize, Serialize};

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tool_iterations() -> usize {
    10
}

fn default_exchange_timeout_secs() -> u64 {
    120
}

fn default_title_max_chars() -> usize {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens", rename = "maxTokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on completion round trips within one exchange.
    #[serde(default = "default_max_tool_iterations", rename = "maxToolIterations")]
    pub max_tool_iterations: usize,
    /// Wall-clock deadline for a whole exchange, tool host session included.
    #[serde(
        default = "default_exchange_timeout_secs",
        rename = "exchangeTimeoutSecs"
    )]
    pub exchange_timeout_secs: u64,
    #[serde(default = "default_title_max_chars", rename = "titleMaxChars")]
    pub title_max_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_tool_iterations: default_max_tool_iterations(),
            exchange_timeout_secs: default_exchange_timeout_secs(),
            title_max_chars: default_title_max_chars(),
        }
    }
}
