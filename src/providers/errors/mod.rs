use crate::errors::TaskpilotError;
use crate::providers::base::ProviderMetrics;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{error, warn};

/// Shared HTTP error classification for completion providers.
pub struct ProviderErrorHandler;

impl ProviderErrorHandler {
    /// Build a typed error from an API error body.
    pub fn parse_api_error(status: u16, error_text: &str) -> TaskpilotError {
        let retryable = matches!(status, 500 | 502 | 503 | 504);

        if let Ok(error_json) = serde_json::from_str::<Value>(error_text)
            && let Some(err) = error_json.get("error")
        {
            let error_type = err
                .get("type")
                .or_else(|| err.get("code"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let error_msg = err
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error");

            if error_type == "model_not_found" {
                return TaskpilotError::Provider {
                    message: format!(
                        "{}. Update agent.model in ~/.taskpilot/config.json or remove it to use the default.",
                        error_msg
                    ),
                    retryable: false,
                };
            }

            return TaskpilotError::Provider {
                message: format!("API error ({}): {}", error_type, error_msg),
                retryable,
            };
        }

        TaskpilotError::Provider {
            message: format!("API error ({}): {}", status, error_text),
            retryable,
        }
    }

    pub fn handle_rate_limit(status: u16, retry_after: Option<u64>) -> TaskpilotError {
        if let Some(seconds) = retry_after {
            warn!("Rate limit hit. Retry after {} seconds", seconds);
        } else {
            warn!("Rate limit hit (status: {})", status);
        }
        TaskpilotError::RateLimit { retry_after }
    }

    pub fn handle_auth_error(status: u16, error_text: &str) -> TaskpilotError {
        warn!("Authentication error (status: {}): {}", status, error_text);
        TaskpilotError::Auth(format!(
            "Authentication failed. Please check your API key. Error: {}",
            error_text
        ))
    }

    /// Return the response unchanged on success, otherwise consume the body and
    /// classify the failure.
    pub async fn check_http_status(
        resp: reqwest::Response,
        provider: &str,
    ) -> Result<reqwest::Response, anyhow::Error> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let error_text = resp
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());

        error!("{} provider returned HTTP {}", provider, status.as_u16());

        let err = match status.as_u16() {
            429 => Self::handle_rate_limit(429, retry_after),
            401 | 403 => Self::handle_auth_error(status.as_u16(), &error_text),
            code => Self::parse_api_error(code, &error_text),
        };
        Err(err.into())
    }

    /// Check an HTTP response for errors and decode the JSON body.
    pub async fn check_response(
        resp: reqwest::Response,
        provider: &str,
        metrics: &Arc<Mutex<ProviderMetrics>>,
    ) -> Result<Value, anyhow::Error> {
        let resp = match Self::check_http_status(resp, provider).await {
            Ok(resp) => resp,
            Err(e) => {
                if let Ok(mut m) = metrics.lock() {
                    m.error_count += 1;
                }
                return Err(e);
            }
        };

        let json: Value = resp
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse {} API response: {}", provider, e))?;

        if let Some(error_val) = json.get("error") {
            if let Ok(mut m) = metrics.lock() {
                m.error_count += 1;
            }
            let error_text =
                serde_json::to_string(&serde_json::json!({ "error": error_val }))
                    .unwrap_or_else(|_| "Unknown error".to_string());
            error!("{} provider returned an error body", provider);
            return Err(Self::parse_api_error(200, &error_text).into());
        }

        Ok(json)
    }
}
