//! DeepSeek adapter
//!
//! DeepSeek's chat endpoint is OpenAI-shaped but gets no system role: the
//! system text is folded into the first user message and consecutive
//! same-role messages are merged. Replies are requested without streaming
//! and handed to the sink as one fragment.

use super::adapter::{CallOptions, Completion, ProviderAdapter, StreamSink};
use super::openai::types::ResponseFormat;
use super::rate_limit::RateLimitPolicy;
use super::response::parse_chat_completion;
use super::streaming::emit_whole;
use super::transform::{folded_messages, WireMessage};
use super::{join_url, ProviderKind};
use crate::config::LlmConfig;
use crate::conversation::Conversation;
use crate::error::{LlmError, LlmResult};
use crate::http::{build_headers, HttpClient};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_MAX_TOKENS: u64 = 8192;
pub const DEFAULT_TOP_P: f64 = 0.95;

#[derive(Debug, Serialize)]
struct DeepSeekRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u64,
    top_p: f64,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

pub struct DeepSeekAdapter {
    config: Arc<LlmConfig>,
    http: HttpClient,
    endpoint: String,
    headers: HeaderMap,
}

impl DeepSeekAdapter {
    pub fn new(config: Arc<LlmConfig>, http: HttpClient) -> LlmResult<Self> {
        let base = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let endpoint = join_url(base, "chat/completions");

        let api_key = config.api_key().ok_or_else(|| {
            LlmError::Configuration("Provider 'deepseek' requires api_key".to_string())
        })?;
        let bearer = format!("Bearer {}", api_key);
        let headers = build_headers([("authorization", bearer.as_str())])?;

        Ok(Self {
            config,
            http,
            endpoint,
            headers,
        })
    }

    fn build_request<'a>(&'a self, convo: &Conversation, options: &CallOptions) -> DeepSeekRequest<'a> {
        DeepSeekRequest {
            model: &self.config.model,
            messages: folded_messages(convo),
            temperature: options.temperature,
            max_tokens: self
                .config
                .extra_u64("max_tokens")
                .unwrap_or(DEFAULT_MAX_TOKENS),
            top_p: self.config.extra_f64("top_p").unwrap_or(DEFAULT_TOP_P),
            stream: false,
            response_format: options.json_mode.then_some(ResponseFormat::JSON_OBJECT),
        }
    }
}

#[async_trait]
impl ProviderAdapter for DeepSeekAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DeepSeek
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute(
        &self,
        convo: &Conversation,
        options: &CallOptions,
        sink: Option<&dyn StreamSink>,
    ) -> LlmResult<Completion> {
        let request = self.build_request(convo, options);
        debug!(
            "Sending {} folded messages to deepseek [request_id: {}]",
            request.messages.len(),
            options.request_id
        );

        let response = self
            .http
            .post_json(
                &self.endpoint,
                self.headers.clone(),
                &request,
                &RateLimitPolicy::DEEPSEEK,
                options.request_id,
            )
            .await?;

        let body: Value = response.json().await?;
        let completion = parse_chat_completion(&body)?;
        emit_whole(&completion, sink).await;
        Ok(completion)
    }
}
