//! OpenAI chat completions wire types
//!
//! Shared by OpenAI, Azure OpenAI, Groq and LM Studio, which all speak this
//! dialect.

use crate::providers::response::UsageBody;
use crate::providers::transform::WireMessage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage>,
    pub temperature: f32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    pub stream: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StreamOptions {
    pub include_usage: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: &'static str,
}

impl ResponseFormat {
    pub const JSON_OBJECT: ResponseFormat = ResponseFormat {
        format_type: "json_object",
    };
}

/// One `data:` payload of a streamed completion
#[derive(Debug, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,

    /// Final chunk when `stream_options.include_usage` is set
    #[serde(default)]
    pub usage: Option<UsageBody>,

    /// Groq reports usage here instead
    #[serde(default)]
    pub x_groq: Option<GroqExtension>,

    /// Some servers report failures inside the stream
    #[serde(default)]
    pub error: Option<Value>,
}

impl StreamChunk {
    pub fn take_usage(&mut self) -> Option<UsageBody> {
        self.usage
            .take()
            .or_else(|| self.x_groq.as_mut().and_then(|g| g.usage.take()))
    }
}

#[derive(Debug, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GroqExtension {
    #[serde(default)]
    pub usage: Option<UsageBody>,
}
