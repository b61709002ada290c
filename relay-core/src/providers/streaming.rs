//! Server-sent event plumbing shared by the streaming adapters

use super::adapter::{Completion, StreamSink, Usage};
use crate::error::{LlmError, LlmResult};
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Response;
use std::pin::Pin;

pub(crate) type EventStream = Pin<Box<dyn Stream<Item = LlmResult<Event>> + Send>>;

/// Whether the provider answered with an SSE stream (some servers ignore
/// `stream: true` and reply with a plain JSON body)
pub(crate) fn is_event_stream(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"))
}

/// Decode the response body into SSE events
pub(crate) fn sse_events(response: Response) -> EventStream {
    Box::pin(response.bytes_stream().eventsource().map(|item| {
        item.map_err(|e| match e {
            EventStreamError::Transport(e) => LlmError::from(e),
            other => LlmError::MalformedResponse(format!("Stream error: {}", other)),
        })
    }))
}

/// Accumulates streamed text, forwarding each fragment to the sink as it
/// arrives
pub(crate) struct StreamCollector<'a> {
    text: String,
    usage: Usage,
    sink: Option<&'a dyn StreamSink>,
}

impl<'a> StreamCollector<'a> {
    pub(crate) fn new(sink: Option<&'a dyn StreamSink>) -> Self {
        Self {
            text: String::new(),
            usage: Usage::default(),
            sink,
        }
    }

    pub(crate) async fn push(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.text.push_str(fragment);
        if let Some(sink) = self.sink {
            sink.on_fragment(fragment).await;
        }
    }

    pub(crate) fn usage_mut(&mut self) -> &mut Usage {
        &mut self.usage
    }

    /// The full reply; a stream that produced no text is malformed
    pub(crate) fn finish(self) -> LlmResult<Completion> {
        if self.text.is_empty() {
            return Err(LlmError::MalformedResponse(
                "Stream ended without any content".to_string(),
            ));
        }
        Ok(Completion {
            text: self.text,
            usage: self.usage,
        })
    }
}

/// Deliver a non-streamed reply to the sink as a single fragment
pub(crate) async fn emit_whole(completion: &Completion, sink: Option<&dyn StreamSink>) {
    if let Some(sink) = sink {
        sink.on_fragment(&completion.text).await;
    }
}
