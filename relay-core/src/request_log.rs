//! Per-invocation request log

use crate::conversation::Conversation;
use crate::providers::ProviderKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

/// Terminal status of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Success,
    Error,
}

/// Observability record of one top-level call, spanning all of its retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLog {
    /// Correlation id shared by every HTTP attempt of this call
    pub request_id: Uuid,
    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f32,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    /// Wall-clock time from the first attempt to the terminal outcome
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    pub started_at: DateTime<Utc>,
    pub status: RequestStatus,
    pub error: Option<String>,
    /// Outbound prompt texts, oldest first
    pub prompts: Vec<String>,
    pub response: Option<String>,
}

impl RequestLog {
    /// Start a log for a call over `convo`.
    pub(crate) fn start(
        provider: ProviderKind,
        model: &str,
        temperature: f32,
        convo: &Conversation,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            provider,
            model: model.to_string(),
            temperature,
            prompt_tokens: 0,
            completion_tokens: 0,
            duration: Duration::ZERO,
            started_at: Utc::now(),
            status: RequestStatus::Success,
            error: None,
            prompts: convo.iter().map(|m| m.content().to_wire_text()).collect(),
            response: None,
        }
    }

    pub(crate) fn record_error(&mut self, message: impl Into<String>) {
        self.status = RequestStatus::Error;
        self.error = Some(message.into());
    }

    pub(crate) fn record_success(
        &mut self,
        response: &str,
        prompt_tokens: u32,
        completion_tokens: u32,
    ) {
        self.status = RequestStatus::Success;
        self.error = None;
        self.prompt_tokens = prompt_tokens;
        self.completion_tokens = completion_tokens;
        self.response = Some(response.to_string());
    }

    pub(crate) fn finish(&mut self, elapsed: Duration) {
        self.duration = elapsed;
    }

    pub fn is_success(&self) -> bool {
        self.status == RequestStatus::Success
    }

    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Loggable projection without prompt or response bodies.
    pub fn summary(&self) -> Value {
        json!({
            "request_id": self.request_id.to_string(),
            "provider": self.provider.as_str(),
            "model": self.model,
            "temperature": self.temperature,
            "prompt_tokens": self.prompt_tokens,
            "completion_tokens": self.completion_tokens,
            "duration": self.duration.as_secs_f64(),
            "status": self.status,
            "error": self.error,
        })
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
