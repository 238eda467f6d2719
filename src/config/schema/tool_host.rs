use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_args() -> Vec<String> {
    vec!["tool-host".to_string()]
}

fn default_handshake_timeout_secs() -> u64 {
    30
}

fn default_call_timeout_secs() -> u64 {
    30
}

/// How to launch the MCP tool host for an exchange.
///
/// With no `command`, the running binary is re-executed with `args`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolHostConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    #[serde(
        default = "default_handshake_timeout_secs",
        rename = "handshakeTimeoutSecs"
    )]
    pub handshake_timeout_secs: u64,
    #[serde(default = "default_call_timeout_secs", rename = "callTimeoutSecs")]
    pub call_timeout_secs: u64,
}

impl Default for ToolHostConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: default_args(),
            env: HashMap::new(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}
