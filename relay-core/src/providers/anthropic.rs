//! Anthropic Messages API adapter
//!
//! System text travels in the top-level `system` field, function results are
//! sent as user messages and consecutive same-role messages are merged since
//! the API requires alternating roles. Replies are streamed.

use super::adapter::{CallOptions, Completion, ProviderAdapter, StreamSink, Usage};
use super::rate_limit::RateLimitPolicy;
use super::streaming::{emit_whole, is_event_stream, sse_events, StreamCollector};
use super::transform::{split_system_prompt, WireMessage};
use super::{join_url, ProviderKind};
use crate::config::LlmConfig;
use crate::conversation::Conversation;
use crate::error::{LlmError, LlmResult};
use crate::http::{build_headers, HttpClient};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u64 = 4096;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
    max_tokens: u64,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    stream: bool,
}

/// Streamed event payloads; unknown event types are ignored
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    MessageStart { message: MessageStart },
    ContentBlockDelta { delta: ContentDelta },
    MessageDelta {
        #[serde(default)]
        usage: Option<AnthropicUsage>,
    },
    MessageStop,
    Error { error: Value },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageStart {
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: Option<u32>,
    #[serde(default)]
    output_tokens: Option<u32>,
}

impl AnthropicUsage {
    fn apply(&self, usage: &mut Usage) {
        if let Some(input) = self.input_tokens {
            usage.prompt_tokens = input;
        }
        if let Some(output) = self.output_tokens {
            usage.completion_tokens = output;
        }
    }
}

/// Non-streamed reply body
#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicAdapter {
    config: Arc<LlmConfig>,
    http: HttpClient,
    endpoint: String,
    headers: HeaderMap,
}

impl AnthropicAdapter {
    pub fn new(config: Arc<LlmConfig>, http: HttpClient) -> LlmResult<Self> {
        let base = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let endpoint = join_url(base, "messages");

        let api_key = config.api_key().ok_or_else(|| {
            LlmError::Configuration("Provider 'anthropic' requires api_key".to_string())
        })?;
        let headers = build_headers([("x-api-key", api_key), ("anthropic-version", API_VERSION)])?;

        Ok(Self {
            config,
            http,
            endpoint,
            headers,
        })
    }

    fn build_request<'a>(&'a self, convo: &Conversation, temperature: f32) -> MessagesRequest<'a> {
        let (system, messages) = split_system_prompt(convo);
        MessagesRequest {
            model: &self.config.model,
            system,
            messages,
            max_tokens: self
                .config
                .extra_u64("max_tokens")
                .unwrap_or(DEFAULT_MAX_TOKENS),
            temperature,
            top_p: self.config.extra_f64("top_p"),
            stream: true,
        }
    }
}

/// Text and usage of a non-streamed Messages API reply
fn parse_message_body(body: Value) -> LlmResult<Completion> {
    let parsed: MessageBody = serde_json::from_value(body)?;

    let text: String = parsed
        .content
        .into_iter()
        .filter(|block| block.block_type == "text")
        .filter_map(|block| block.text)
        .collect();

    if text.is_empty() {
        return Err(LlmError::MalformedResponse(
            "Response contains no text content".to_string(),
        ));
    }

    let mut usage = Usage::default();
    parsed.usage.apply(&mut usage);
    Ok(Completion { text, usage })
}

async fn collect_stream(response: Response, sink: Option<&dyn StreamSink>) -> LlmResult<Completion> {
    let mut events = sse_events(response);
    let mut collector = StreamCollector::new(sink);

    while let Some(event) = events.next().await {
        let event = event?;
        if event.data.trim().is_empty() {
            continue;
        }

        let parsed: StreamEvent = match serde_json::from_str(&event.data) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Failed to parse stream event '{}': {}", event.event, e);
                continue;
            }
        };

        match parsed {
            StreamEvent::MessageStart { message } => {
                if let Some(usage) = message.usage {
                    usage.apply(collector.usage_mut());
                }
            }
            StreamEvent::ContentBlockDelta { delta } => {
                if let Some(text) = delta.text {
                    collector.push(&text).await;
                }
            }
            StreamEvent::MessageDelta { usage } => {
                if let Some(usage) = usage {
                    usage.apply(collector.usage_mut());
                }
            }
            StreamEvent::MessageStop => break,
            StreamEvent::Error { error } => {
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                return Err(LlmError::MalformedResponse(format!("Stream error: {}", message)));
            }
            StreamEvent::Other => {}
        }
    }

    collector.finish()
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
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
        let request = self.build_request(convo, options.temperature);
        if options.json_mode {
            debug!(
                "Anthropic has no JSON mode toggle; relying on the prompt [request_id: {}]",
                options.request_id
            );
        }

        let response = self
            .http
            .post_json(
                &self.endpoint,
                self.headers.clone(),
                &request,
                &RateLimitPolicy::ANTHROPIC,
                options.request_id,
            )
            .await?;

        if is_event_stream(&response) {
            return collect_stream(response, sink).await;
        }

        let completion = parse_message_body(response.json().await?)?;
        emit_whole(&completion, sink).await;
        Ok(completion)
    }
}
