//! Conversation to wire-message translation
//!
//! Providers disagree on how system instructions and roles are carried:
//!
//! - OpenAI-compatible APIs take system, user and assistant roles natively
//!   ([`native_messages`]); function results keep their role only where the
//!   server understands it and a name is present.
//! - DeepSeek gets the system text folded into the first user message and
//!   consecutive same-role messages merged ([`fold_system_prompt`] followed
//!   by [`merge_consecutive`]).
//! - Anthropic takes the system text as a separate field and only accepts
//!   user and assistant roles ([`split_system_prompt`]).

use crate::conversation::{Conversation, Role};
use serde::{Deserialize, Serialize};

/// Separator used when joining message texts
const JOIN_SEPARATOR: &str = "\n\n";

/// Role and text of one outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl WireMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            name: None,
        }
    }
}

/// Wire messages for providers with a native system role.
///
/// A function message keeps its role only when `function_role` is set and
/// it carries a name; otherwise it is sent as a user message. Consecutive
/// same-role messages are merged afterwards.
pub fn native_messages(convo: &Conversation, function_role: bool) -> Vec<WireMessage> {
    let messages = convo
        .iter()
        .map(|m| {
            let content = m.content().to_wire_text();
            match (m.role(), m.name()) {
                (Role::Function, Some(name)) if function_role => WireMessage {
                    role: Role::Function.as_str().to_string(),
                    content,
                    name: Some(name.to_string()),
                },
                (Role::Function, _) => WireMessage::new(Role::User.as_str(), content),
                (role, name) => WireMessage {
                    role: role.as_str().to_string(),
                    content,
                    name: name.map(str::to_string),
                },
            }
        })
        .collect();

    merge_consecutive(messages)
}

/// Fold system instructions into the conversation for providers without a
/// system role.
///
/// All system texts are joined into one system text, which is prefixed to
/// the first user message as `"{system}\n\nHuman: {user}"`. Function
/// messages count as user messages. When no user message exists the system
/// text becomes a leading user message of its own. Message order and count
/// of the remaining messages are preserved; merging is a separate step.
pub fn fold_system_prompt(convo: &Conversation) -> Vec<WireMessage> {
    let system = system_text(convo);
    let mut pending = system.as_deref();
    let mut messages = Vec::with_capacity(convo.len());

    for message in convo.iter() {
        let role = match message.role() {
            Role::System => continue,
            Role::Function => Role::User,
            other => other,
        };
        let text = message.content().to_wire_text();

        let content = match pending.take_if(|_| role == Role::User) {
            Some(system) => format!("{}{}Human: {}", system, JOIN_SEPARATOR, text),
            None => text,
        };
        messages.push(WireMessage::new(role.as_str(), content));
    }

    if let Some(system) = pending {
        messages.insert(0, WireMessage::new(Role::User.as_str(), system));
    }

    messages
}

/// Join consecutive messages with the same role, separated by a blank line.
/// Names cannot survive a merge and are dropped from merged entries.
/// Function messages are never merged.
pub fn merge_consecutive(messages: Vec<WireMessage>) -> Vec<WireMessage> {
    let mut merged: Vec<WireMessage> = Vec::with_capacity(messages.len());

    for message in messages {
        match merged.last_mut() {
            // function results are matched to calls by name
            Some(last) if last.role == message.role && message.role != Role::Function.as_str() => {
                last.content.push_str(JOIN_SEPARATOR);
                last.content.push_str(&message.content);
                last.name = None;
            }
            _ => merged.push(message),
        }
    }

    merged
}

/// Fold then merge
pub fn folded_messages(convo: &Conversation) -> Vec<WireMessage> {
    merge_consecutive(fold_system_prompt(convo))
}

/// Separate the system text from the dialogue for providers that carry it
/// out of band. Function messages become user messages and consecutive
/// same-role messages are merged.
pub fn split_system_prompt(convo: &Conversation) -> (Option<String>, Vec<WireMessage>) {
    let dialogue = convo
        .iter()
        .filter(|m| m.role() != Role::System)
        .map(|m| {
            let role = match m.role() {
                Role::Function => Role::User,
                other => other,
            };
            WireMessage::new(role.as_str(), m.content().to_wire_text())
        })
        .collect();

    (system_text(convo), merge_consecutive(dialogue))
}

fn system_text(convo: &Conversation) -> Option<String> {
    let parts: Vec<String> = convo
        .iter()
        .filter(|m| m.role() == Role::System)
        .map(|m| m.content().to_wire_text())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(JOIN_SEPARATOR))
    }
}
