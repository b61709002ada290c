//! Provider adapter trait and call types

use super::ProviderKind;
use crate::conversation::Conversation;
use crate::error::LlmResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Per-attempt parameters resolved by the client
#[derive(Debug, Clone, PartialEq)]
pub struct CallOptions {
    pub temperature: f32,
    /// Ask the provider for a JSON object reply
    pub json_mode: bool,
    /// Correlation id of the top-level call
    pub request_id: Uuid,
}

/// Token accounting reported by the provider; zero when absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Successful reply of one attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

/// Receiver of incremental response text.
///
/// Fragments of a successful attempt arrive in order. A failed attempt may
/// already have emitted fragments before the error; the client does not
/// retract them.
#[async_trait]
pub trait StreamSink: Send + Sync {
    async fn on_fragment(&self, fragment: &str);
}

#[async_trait]
impl StreamSink for mpsc::Sender<String> {
    async fn on_fragment(&self, fragment: &str) {
        // a dropped receiver only means nobody is listening any more
        let _ = self.send(fragment.to_string()).await;
    }
}

#[async_trait]
impl StreamSink for mpsc::UnboundedSender<String> {
    async fn on_fragment(&self, fragment: &str) {
        let _ = self.send(fragment.to_string());
    }
}

/// A provider's wire protocol.
///
/// `execute` performs exactly one HTTP attempt. Failures are classified into
/// [`LlmError`](crate::error::LlmError) variants so the client can decide
/// whether to retry; rate limits carry the adapter's backoff.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Fully resolved URL requests are sent to
    fn endpoint(&self) -> &str;

    async fn execute(
        &self,
        convo: &Conversation,
        options: &CallOptions,
        sink: Option<&dyn StreamSink>,
    ) -> LlmResult<Completion>;
}
