//! OpenAI-compatible adapter
//!
//! Serves OpenAI itself plus the providers that expose the same chat
//! completions API: Azure OpenAI, Groq and LM Studio. Replies are always
//! requested as a stream; servers that answer with a plain JSON body are
//! handled too.

mod streaming;
pub(crate) mod types;

use self::types::{ChatRequest, ResponseFormat, StreamOptions};
use super::adapter::{CallOptions, Completion, ProviderAdapter, StreamSink};
use super::rate_limit::RateLimitPolicy;
use super::response::parse_chat_completion;
use super::streaming::{emit_whole, is_event_stream};
use super::transform::native_messages;
use super::{join_url, ProviderKind};
use crate::config::LlmConfig;
use crate::conversation::Conversation;
use crate::error::{LlmError, LlmResult};
use crate::http::{build_headers, HttpClient};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Azure API version used when the config does not name one
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-10-21";

/// First Azure API version accepting `stream_options`
const AZURE_STREAM_USAGE_SINCE: &str = "2024-09-01";

/// Provider speaking the OpenAI chat completions dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiFlavor {
    OpenAi,
    /// `base_url` is the deployment URL; `extra.api_version` selects the API version
    Azure,
    Groq,
    /// Local server; the credential is optional
    LmStudio,
}

impl OpenAiFlavor {
    pub fn kind(&self) -> ProviderKind {
        match self {
            OpenAiFlavor::OpenAi => ProviderKind::OpenAi,
            OpenAiFlavor::Azure => ProviderKind::Azure,
            OpenAiFlavor::Groq => ProviderKind::Groq,
            OpenAiFlavor::LmStudio => ProviderKind::LmStudio,
        }
    }

    /// Canonical API root; Azure has none
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            OpenAiFlavor::OpenAi => Some("https://api.openai.com/v1"),
            OpenAiFlavor::Groq => Some("https://api.groq.com/openai/v1"),
            OpenAiFlavor::LmStudio => Some("http://localhost:1234/v1"),
            OpenAiFlavor::Azure => None,
        }
    }

    fn requires_api_key(&self) -> bool {
        !matches!(self, OpenAiFlavor::LmStudio)
    }

    /// Whether `stream_options.include_usage` is understood. Azure
    /// accepts it from [`AZURE_STREAM_USAGE_SINCE`] on.
    fn reports_stream_usage(&self, api_version: &str) -> bool {
        match self {
            OpenAiFlavor::OpenAi => true,
            // versions are ISO dates, optionally suffixed with -preview
            OpenAiFlavor::Azure => api_version >= AZURE_STREAM_USAGE_SINCE,
            OpenAiFlavor::Groq | OpenAiFlavor::LmStudio => false,
        }
    }

    /// Whether named `function` messages are accepted as such
    fn native_function_role(&self) -> bool {
        matches!(self, OpenAiFlavor::OpenAi | OpenAiFlavor::Azure)
    }

    fn rate_limits(&self) -> RateLimitPolicy {
        match self {
            OpenAiFlavor::OpenAi | OpenAiFlavor::Groq => RateLimitPolicy::OPENAI,
            OpenAiFlavor::Azure | OpenAiFlavor::LmStudio => RateLimitPolicy::Default,
        }
    }
}

/// Adapter for the OpenAI chat completions API family
pub struct OpenAiAdapter {
    flavor: OpenAiFlavor,
    config: Arc<LlmConfig>,
    http: HttpClient,
    endpoint: String,
    headers: HeaderMap,
}

impl OpenAiAdapter {
    pub fn new(flavor: OpenAiFlavor, config: Arc<LlmConfig>, http: HttpClient) -> LlmResult<Self> {
        let endpoint = Self::resolve_endpoint(flavor, &config)?;
        let headers = Self::auth_headers(flavor, &config)?;

        Ok(Self {
            flavor,
            config,
            http,
            endpoint,
            headers,
        })
    }

    fn resolve_endpoint(flavor: OpenAiFlavor, config: &LlmConfig) -> LlmResult<String> {
        let base = config
            .base_url
            .as_deref()
            .or(flavor.default_base_url())
            .ok_or_else(|| {
                LlmError::Configuration(format!(
                    "Provider '{}' requires base_url",
                    flavor.kind()
                ))
            })?;

        let url = join_url(base, "chat/completions");
        if flavor == OpenAiFlavor::Azure {
            return Ok(format!("{}?api-version={}", url, azure_api_version(config)));
        }
        Ok(url)
    }

    fn auth_headers(flavor: OpenAiFlavor, config: &LlmConfig) -> LlmResult<HeaderMap> {
        let Some(api_key) = config.api_key() else {
            if flavor.requires_api_key() {
                return Err(LlmError::Configuration(format!(
                    "Provider '{}' requires api_key",
                    flavor.kind()
                )));
            }
            return Ok(HeaderMap::new());
        };

        if flavor == OpenAiFlavor::Azure {
            return build_headers([("api-key", api_key)]);
        }
        let bearer = format!("Bearer {}", api_key);
        build_headers([("authorization", bearer.as_str())])
    }

    pub fn flavor(&self) -> OpenAiFlavor {
        self.flavor
    }

    fn build_request<'a>(&'a self, convo: &Conversation, options: &CallOptions) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: native_messages(convo, self.flavor.native_function_role()),
            temperature: options.temperature,
            max_tokens: self.config.extra_u64("max_tokens"),
            top_p: self.config.extra_f64("top_p"),
            stream: true,
            stream_options: self
                .flavor
                .reports_stream_usage(azure_api_version(&self.config))
                .then_some(StreamOptions {
                    include_usage: true,
                }),
            response_format: options.json_mode.then_some(ResponseFormat::JSON_OBJECT),
        }
    }
}

fn azure_api_version(config: &LlmConfig) -> &str {
    config
        .extra_str("api_version")
        .unwrap_or(DEFAULT_AZURE_API_VERSION)
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        self.flavor.kind()
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
            "Sending {} messages to {} [request_id: {}]",
            request.messages.len(),
            self.flavor.kind(),
            options.request_id
        );

        let response = self
            .http
            .post_json(
                &self.endpoint,
                self.headers.clone(),
                &request,
                &self.flavor.rate_limits(),
                options.request_id,
            )
            .await?;

        if is_event_stream(&response) {
            return streaming::collect_stream(response, sink).await;
        }

        let body: Value = response.json().await?;
        let completion = parse_chat_completion(&body)?;
        emit_whole(&completion, sink).await;
        Ok(completion)
    }
}
