//! LLM Relay Core Library
//!
//! A provider-agnostic client for chat-style LLM APIs. Build a
//! [`Conversation`], hand it to an [`LlmClient`] created from an
//! [`LlmConfig`], and get back the reply text together with a
//! [`RequestLog`] describing the call. The client retries transient
//! failures, waits out rate limits using the provider's own reset headers
//! and can stream partial output to a [`StreamSink`].
//!
//! ```no_run
//! use relay_core::{Conversation, InvokeOptions, LlmClient, LlmConfig};
//!
//! # async fn run() -> relay_core::LlmResult<()> {
//! let config = LlmConfig::new("deepseek", "deepseek-chat").with_api_key("sk-...");
//! let client = LlmClient::new(config)?;
//!
//! let mut convo = Conversation::new();
//! convo.system("You are terse.")?.user("Name a prime number.")?;
//!
//! let (reply, log) = client.invoke(&convo, InvokeOptions::default()).await?;
//! println!("{} ({} tokens)", reply, log.total_tokens());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod http;
pub mod logging;
pub mod providers;
pub mod request_log;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{DecisionHook, FixedDecision, InvokeOptions, LlmClient};
pub use config::{LlmConfig, RelayConfig};
pub use conversation::{Content, Conversation, ConversationError, Message, Role};
pub use error::{ErrorKind, LlmError, LlmResult};
pub use providers::{ProviderAdapter, ProviderKind, StreamSink};
pub use request_log::{RequestLog, RequestStatus};

/// Returns the version of the LLM Relay Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
