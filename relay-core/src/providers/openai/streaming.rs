//! Streaming support for OpenAI-compatible responses

use super::types::StreamChunk;
use crate::error::{LlmError, LlmResult};
use crate::http::extract_error_message;
use crate::providers::adapter::{Completion, StreamSink};
use crate::providers::streaming::{sse_events, StreamCollector};
use futures::StreamExt;
use reqwest::Response;
use tracing::warn;

/// Read an SSE completion to the end, forwarding text deltas to `sink`.
///
/// The stream ends at `data: [DONE]` or when the connection closes.
/// Chunks that fail to parse are skipped.
pub(super) async fn collect_stream(
    response: Response,
    sink: Option<&dyn StreamSink>,
) -> LlmResult<Completion> {
    let mut events = sse_events(response);
    let mut collector = StreamCollector::new(sink);

    while let Some(event) = events.next().await {
        let event = event?;
        let data = event.data.trim();

        if data == "[DONE]" {
            break;
        }
        if data.is_empty() {
            continue;
        }

        let mut chunk: StreamChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Failed to parse stream chunk: {}", e);
                continue;
            }
        };

        if let Some(error) = chunk.error.take() {
            let message = extract_error_message(&serde_json::json!({ "error": error.clone() }))
                .unwrap_or_else(|| error.to_string());
            return Err(LlmError::MalformedResponse(format!("Stream error: {}", message)));
        }

        if let Some(usage) = chunk.take_usage() {
            *collector.usage_mut() = usage.into();
        }

        for choice in chunk.choices {
            if let Some(content) = choice.delta.content {
                collector.push(&content).await;
            }
        }
    }

    collector.finish()
}
