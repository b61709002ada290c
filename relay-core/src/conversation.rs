//! Conversation model
//!
//! A [`Conversation`] is an append-only, ordered list of role-tagged
//! [`Message`]s. Text is normalized on the way in so that templated prompts
//! written with source-code indentation reach the provider flush-left.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while building a conversation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("Invalid message role: '{0}' (expected system, user, assistant or function)")]
    InvalidRole(String),

    #[error("Message content is empty after normalization")]
    EmptyContent,

    #[error("Unsupported content type: {0} (expected text or a mapping)")]
    UnsupportedContentType(&'static str),
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Function => "function",
        }
    }
}

impl FromStr for Role {
    type Err = ConversationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "function" => Ok(Role::Function),
            other => Err(ConversationError::InvalidRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message payload: plain text or a structured JSON mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Structured(Map<String, Value>),
}

impl Content {
    /// Build content from an arbitrary JSON value.
    ///
    /// Strings become [`Content::Text`], objects become
    /// [`Content::Structured`]; anything else is rejected.
    pub fn from_value(value: Value) -> Result<Self, ConversationError> {
        match value {
            Value::String(s) => Ok(Content::Text(s)),
            Value::Object(map) => Ok(Content::Structured(map)),
            Value::Null => Err(ConversationError::UnsupportedContentType("null")),
            Value::Bool(_) => Err(ConversationError::UnsupportedContentType("boolean")),
            Value::Number(_) => Err(ConversationError::UnsupportedContentType("number")),
            Value::Array(_) => Err(ConversationError::UnsupportedContentType("array")),
        }
    }

    /// Text sent over the wire. Structured payloads are serialized as JSON.
    pub fn to_wire_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Structured(map) => Value::Object(map.clone()).to_string(),
        }
    }

    fn normalize(self) -> Result<Self, ConversationError> {
        match self {
            Content::Text(text) => {
                let normalized = normalize_text(&text);
                if normalized.trim().is_empty() {
                    Err(ConversationError::EmptyContent)
                } else {
                    Ok(Content::Text(normalized))
                }
            }
            Content::Structured(map) if map.is_empty() => Err(ConversationError::EmptyContent),
            structured => Ok(structured),
        }
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Text(value)
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Text(value.to_string())
    }
}

impl From<Map<String, Value>> for Content {
    fn from(value: Map<String, Value>) -> Self {
        Content::Structured(value)
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl Message {
    /// Create a normalized message
    pub fn new(
        role: Role,
        content: impl Into<Content>,
        name: Option<String>,
    ) -> Result<Self, ConversationError> {
        Ok(Self {
            role,
            content: content.into().normalize()?,
            name,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Ordered sequence of messages exchanged with a model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, validating the role name and normalizing content.
    pub fn add(
        &mut self,
        role: &str,
        content: impl Into<Content>,
        name: Option<&str>,
    ) -> Result<&mut Self, ConversationError> {
        let role = role.parse::<Role>()?;
        self.push(role, content.into(), name.map(str::to_string))
    }

    /// Append a message whose content arrives as untyped JSON.
    pub fn add_value(
        &mut self,
        role: &str,
        content: Value,
        name: Option<&str>,
    ) -> Result<&mut Self, ConversationError> {
        let role = role.parse::<Role>()?;
        let content = Content::from_value(content)?;
        self.push(role, content, name.map(str::to_string))
    }

    pub fn system(&mut self, content: impl Into<Content>) -> Result<&mut Self, ConversationError> {
        self.push(Role::System, content.into(), None)
    }

    pub fn user(&mut self, content: impl Into<Content>) -> Result<&mut Self, ConversationError> {
        self.push(Role::User, content.into(), None)
    }

    pub fn assistant(
        &mut self,
        content: impl Into<Content>,
    ) -> Result<&mut Self, ConversationError> {
        self.push(Role::Assistant, content.into(), None)
    }

    pub fn function(
        &mut self,
        content: impl Into<Content>,
        name: Option<&str>,
    ) -> Result<&mut Self, ConversationError> {
        self.push(Role::Function, content.into(), name.map(str::to_string))
    }

    fn push(
        &mut self,
        role: Role,
        content: Content,
        name: Option<String>,
    ) -> Result<&mut Self, ConversationError> {
        self.messages.push(Message::new(role, content, name)?);
        Ok(self)
    }

    /// Independent copy of this conversation.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Messages that follow the longest prefix shared with `other`.
    ///
    /// Messages are compared by value (role, content and name). An empty or
    /// unrelated `other` yields a full fork.
    pub fn after(&self, other: &Conversation) -> Self {
        let shared = self
            .messages
            .iter()
            .zip(other.messages.iter())
            .take_while(|(ours, theirs)| ours == theirs)
            .count();

        Self {
            messages: self.messages[shared..].to_vec(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

/// Trim surrounding whitespace and strip the common indentation of all
/// non-blank lines. A leading line break (`\n` or `\r\n`) in the input is
/// kept as a single `\n` at the start of the result.
pub fn normalize_text(text: &str) -> String {
    let head = text.trim_start_matches([' ', '\t']);
    let leading_newline = head.starts_with('\n') || head.starts_with("\r\n");

    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let dedented = text
        .lines()
        .map(|line| {
            let stripped = line.get(indent..).unwrap_or_else(|| line.trim_start());
            stripped.trim_end()
        })
        .collect::<Vec<_>>()
        .join("\n");

    let trimmed = dedented.trim();
    if leading_newline && !trimmed.is_empty() {
        format!("\n{}", trimmed)
    } else {
        trimmed.to_string()
    }
}
