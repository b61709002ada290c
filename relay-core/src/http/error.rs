//! HTTP error mapping utilities

use crate::error::LlmError;
use crate::providers::rate_limit::RateLimitPolicy;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;

/// Map a non-2xx status and its body to an [`LlmError`].
///
/// 429 becomes [`LlmError::RateLimited`] carrying the wait computed by the
/// provider's rate-limit policy; every other status becomes
/// [`LlmError::GenericApi`] with the provider's own message when the body
/// has one.
pub fn map_http_error(
    status: StatusCode,
    headers: &HeaderMap,
    body: Option<String>,
    rate_limits: &RateLimitPolicy,
) -> LlmError {
    let message = body
        .as_deref()
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| extract_error_message(&v))
        .or_else(|| body.filter(|b| !b.trim().is_empty()))
        .unwrap_or_else(|| format!("HTTP error {}", status.as_u16()));

    if status == StatusCode::TOO_MANY_REQUESTS {
        return LlmError::RateLimited {
            message,
            retry_after: rate_limits.wait_duration(headers),
        };
    }

    LlmError::GenericApi {
        status: status.as_u16(),
        message,
    }
}

/// Extract a human-readable message from a JSON error body.
///
/// Understands `{"error": {"message": ...}}` (OpenAI, Anthropic, DeepSeek,
/// Groq), `{"message": ...}` and `{"error": "..."}`.
pub fn extract_error_message(json: &Value) -> Option<String> {
    if let Some(message) = json
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
    {
        return Some(message.to_string());
    }

    if let Some(message) = json.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }

    json.get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
}
