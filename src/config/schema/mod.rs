use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::errors::TaskpilotError;

/// Generate a `Debug` impl that redacts secret fields.
///
/// `redact(field)` prints `[empty]` or `[REDACTED]` for a `String`;
/// bare field names are printed as-is.
macro_rules! redact_debug {
    (@field $builder:ident, $self:ident, redact($field:ident)) => {
        $builder.field(
            stringify!($field),
            &if $self.$field.is_empty() {
                "[empty]"
            } else {
                "[REDACTED]"
            },
        );
    };
    (@field $builder:ident, $self:ident, $field:ident) => {
        $builder.field(stringify!($field), &$self.$field);
    };

    (@fields $builder:ident, $self:ident,) => {};
    (@fields $builder:ident, $self:ident, redact($field:ident), $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, redact($field));
        redact_debug!(@fields $builder, $self, $($rest)*);
    };
    (@fields $builder:ident, $self:ident, $field:ident, $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, $field);
        redact_debug!(@fields $builder, $self, $($rest)*);
    };

    ($struct_name:ident, $($fields:tt)*) => {
        impl std::fmt::Debug for $struct_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut builder = f.debug_struct(stringify!($struct_name));
                redact_debug!(@fields builder, self, $($fields)*);
                builder.finish()
            }
        }
    };
}

// Submodules are declared after the macro so they can use `redact_debug!`
mod agent;
mod providers;
mod tool_host;

pub use agent::*;
pub use providers::*;
pub use tool_host::*;

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    18790
}

fn default_token_ttl_hours() -> u64 {
    24
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// HS256 secret used to verify bearer tokens. Empty disables the REST API.
    #[serde(default, rename = "authSecret")]
    pub auth_secret: String,
    #[serde(default = "default_token_ttl_hours", rename = "tokenTtlHours")]
    pub token_ttl_hours: u64,
}

redact_debug!(GatewayConfig, host, port, redact(auth_secret), token_ttl_hours,);

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth_secret: String::new(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

fn default_database_path() -> String {
    "~/.taskpilot/taskpilot.db".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default, rename = "toolHost")]
    pub tool_host: ToolHostConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    pub fn database_path(&self) -> PathBuf {
        crate::utils::expand_home(&self.database.path)
    }

    /// Extra environment the tool host needs, beyond the acting user.
    pub fn tool_host_env(&self) -> HashMap<String, String> {
        let mut env = self.tool_host.env.clone();
        env.entry("TASKPILOT_DATABASE_PATH".to_string())
            .or_insert_with(|| self.database_path().to_string_lossy().into_owned());
        env
    }

    pub fn validate(&self) -> Result<(), TaskpilotError> {
        self.validate_agent()?;
        self.validate_gateway()?;
        self.validate_tool_host()?;
        self.validate_database()?;
        Ok(())
    }

    fn validate_agent(&self) -> Result<(), TaskpilotError> {
        let a = &self.agent;

        if a.model.trim().is_empty() {
            return Err(TaskpilotError::Config("agent.model must not be empty".into()));
        }
        if a.max_tokens == 0 {
            return Err(TaskpilotError::Config("agent.maxTokens must be > 0".into()));
        }
        if a.max_tokens > 1_000_000 {
            return Err(TaskpilotError::Config(
                "agent.maxTokens is unreasonably large (> 1,000,000)".into(),
            ));
        }
        if a.temperature.is_nan()
            || a.temperature.is_infinite()
            || a.temperature < 0.0
            || a.temperature > 2.0
        {
            return Err(TaskpilotError::Config(
                "agent.temperature must be a finite number between 0.0 and 2.0".into(),
            ));
        }
        if a.max_tool_iterations == 0 {
            return Err(TaskpilotError::Config(
                "agent.maxToolIterations must be > 0".into(),
            ));
        }
        if a.exchange_timeout_secs == 0 {
            return Err(TaskpilotError::Config(
                "agent.exchangeTimeoutSecs must be > 0".into(),
            ));
        }
        if a.title_max_chars == 0 {
            return Err(TaskpilotError::Config(
                "agent.titleMaxChars must be > 0".into(),
            ));
        }
        Ok(())
    }

    fn validate_gateway(&self) -> Result<(), TaskpilotError> {
        if self.gateway.port == 0 {
            return Err(TaskpilotError::Config("gateway.port must be > 0".into()));
        }
        if self.gateway.token_ttl_hours == 0 {
            return Err(TaskpilotError::Config(
                "gateway.tokenTtlHours must be > 0".into(),
            ));
        }
        Ok(())
    }

    fn validate_tool_host(&self) -> Result<(), TaskpilotError> {
        let t = &self.tool_host;
        if t.command.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(TaskpilotError::Config(
                "toolHost.command must not be blank when set".into(),
            ));
        }
        if t.handshake_timeout_secs == 0 || t.call_timeout_secs == 0 {
            return Err(TaskpilotError::Config(
                "toolHost timeouts must be > 0".into(),
            ));
        }
        if t.env.contains_key("TASKPILOT_USER_ID") {
            return Err(TaskpilotError::Config(
                "toolHost.env must not set TASKPILOT_USER_ID; the acting user is injected per exchange"
                    .into(),
            ));
        }
        Ok(())
    }

    fn validate_database(&self) -> Result<(), TaskpilotError> {
        if self.database.path.trim().is_empty() {
            return Err(TaskpilotError::Config("database.path must not be empty".into()));
        }
        Ok(())
    }
}
