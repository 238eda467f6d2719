use thiserror::Error;

/// Typed error hierarchy for taskpilot.
///
/// Use at module boundaries (provider calls, store access, tool hosting, config validation).
/// Internal/leaf functions can continue using `anyhow::Result`; the `Internal` variant
/// allows seamless conversion via the `?` operator.
#[derive(Debug, Error)]
pub enum TaskpilotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Conversation {conversation_id} not found or access denied")]
    AccessDenied { conversation_id: i64 },

    #[error("Tool host unavailable: {0}")]
    ToolHostUnavailable(String),

    #[error("Completion service error: {0}")]
    CompletionService(String),

    #[error("Provider error: {message}")]
    Provider { message: String, retryable: bool },

    #[error("Rate limit exceeded")]
    RateLimit { retry_after: Option<u64> },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl TaskpilotError {
    /// Whether this error is transient and the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { retryable, .. } => *retryable,
            Self::RateLimit { .. } | Self::Internal(_) => true,
            Self::Auth(_)
            | Self::Config(_)
            | Self::NotFound(_)
            | Self::AccessDenied { .. }
            | Self::ToolHostUnavailable(_)
            | Self::CompletionService(_) => false,
        }
    }

    /// Ownership outcomes are reported to callers as-is; everything else collapses
    /// into a generic exchange failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::AccessDenied { .. })
    }

    /// Recover a typed error from an `anyhow` chain, wrapping anything else as `Internal`.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        match err.downcast::<Self>() {
            Ok(typed) => typed,
            Err(other) => Self::Internal(other),
        }
    }
}
