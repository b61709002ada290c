//! Provider adapters
//!
//! Each adapter translates a [`Conversation`](crate::conversation::Conversation)
//! into one provider's wire format, performs the HTTP exchange and turns the
//! reply (streamed or not) back into text and token usage. The retry policy
//! lives in [`LlmClient`](crate::client::LlmClient); adapters only classify
//! failures.

pub mod adapter;
pub mod anthropic;
pub mod deepseek;
pub mod openai;
pub mod rate_limit;
pub mod response;
pub mod streaming;
pub mod transform;

pub use adapter::{CallOptions, Completion, ProviderAdapter, StreamSink, Usage};
pub use anthropic::AnthropicAdapter;
pub use deepseek::DeepSeekAdapter;
pub use openai::{OpenAiAdapter, OpenAiFlavor};
pub use rate_limit::{RateLimitHeaders, RateLimitPolicy, ResetFormat, DEFAULT_RATE_LIMIT_WAIT};

use crate::config::LlmConfig;
use crate::error::{LlmError, LlmResult};
use crate::http::HttpClient;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Supported provider identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "groq")]
    Groq,
    #[serde(rename = "lm-studio")]
    LmStudio,
    #[serde(rename = "azure")]
    Azure,
    #[serde(rename = "deepseek")]
    DeepSeek,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Groq,
        ProviderKind::LmStudio,
        ProviderKind::Azure,
        ProviderKind::DeepSeek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Groq => "groq",
            ProviderKind::LmStudio => "lm-studio",
            ProviderKind::Azure => "azure",
            ProviderKind::DeepSeek => "deepseek",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| LlmError::UnsupportedProvider(s.to_string()))
    }
}

/// Build the adapter for `config.provider`.
///
/// Fails with [`LlmError::UnsupportedProvider`] for unknown identifiers and
/// with [`LlmError::Configuration`] when the provider's mandatory settings
/// (e.g. an Azure endpoint) are missing.
pub fn create_adapter(
    config: Arc<LlmConfig>,
    http: HttpClient,
) -> LlmResult<Arc<dyn ProviderAdapter>> {
    let kind: ProviderKind = config.provider.parse()?;

    let adapter: Arc<dyn ProviderAdapter> = match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiAdapter::new(OpenAiFlavor::OpenAi, config, http)?),
        ProviderKind::Groq => Arc::new(OpenAiAdapter::new(OpenAiFlavor::Groq, config, http)?),
        ProviderKind::LmStudio => {
            Arc::new(OpenAiAdapter::new(OpenAiFlavor::LmStudio, config, http)?)
        }
        ProviderKind::Azure => Arc::new(OpenAiAdapter::new(OpenAiFlavor::Azure, config, http)?),
        ProviderKind::Anthropic => Arc::new(AnthropicAdapter::new(config, http)?),
        ProviderKind::DeepSeek => Arc::new(DeepSeekAdapter::new(config, http)?),
    };

    Ok(adapter)
}

/// Join a base URL and a path without doubling the slash
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
