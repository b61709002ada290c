//! Parsing of non-streamed OpenAI-compatible chat completion bodies

use super::adapter::{Completion, Usage};
use crate::error::{LlmError, LlmResult};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ChatCompletionBody {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// `usage` object shared by OpenAI-compatible providers
#[derive(Debug, Default, Deserialize)]
pub(crate) struct UsageBody {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

impl From<UsageBody> for Usage {
    fn from(body: UsageBody) -> Self {
        Usage {
            prompt_tokens: body.prompt_tokens,
            completion_tokens: body.completion_tokens,
        }
    }
}

/// Extract the reply text and token usage of a chat completion.
///
/// The body must contain a non-empty `choices` list whose first entry has a
/// `message` with non-empty `content`; anything else is a
/// [`LlmError::MalformedResponse`]. Missing usage counts as zero.
pub fn parse_chat_completion(body: &Value) -> LlmResult<Completion> {
    let parsed = ChatCompletionBody::deserialize(body)
        .map_err(|e| LlmError::MalformedResponse(format!("Unexpected response body: {}", e)))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::MalformedResponse("Response contains no choices".to_string()))?;

    let text = choice
        .message
        .and_then(|m| m.content)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| {
            LlmError::MalformedResponse("First choice has no message content".to_string())
        })?;

    Ok(Completion {
        text,
        usage: parsed.usage.map(Usage::from).unwrap_or_default(),
    })
}
