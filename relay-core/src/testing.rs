//! Scripted adapter for exercising the retry engine without HTTP

use crate::conversation::Conversation;
use crate::error::{LlmError, LlmResult};
use crate::providers::{CallOptions, Completion, ProviderAdapter, ProviderKind, StreamSink, Usage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted attempt outcome
pub(crate) enum Step {
    /// Stream the fragments, then succeed with their concatenation
    Reply {
        fragments: Vec<String>,
        usage: Usage,
    },
    Fail(LlmError),
    /// Never completes
    Hang,
}

impl Step {
    pub(crate) fn reply(text: &str) -> Self {
        Step::Reply {
            fragments: vec![text.to_string()],
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
            },
        }
    }

    pub(crate) fn streamed(fragments: &[&str]) -> Self {
        Step::Reply {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            usage: Usage::default(),
        }
    }

    pub(crate) fn connectivity() -> Self {
        Step::Fail(LlmError::Connectivity("connection reset by peer".to_string()))
    }

    pub(crate) fn malformed() -> Self {
        Step::Fail(LlmError::MalformedResponse("Response contains no choices".to_string()))
    }

    pub(crate) fn rate_limited(secs: u64) -> Self {
        Step::Fail(LlmError::RateLimited {
            message: "Too many requests".to_string(),
            retry_after: Duration::from_secs(secs),
        })
    }
}

/// Adapter replaying a fixed script, one step per attempt
pub(crate) struct ScriptedAdapter {
    kind: ProviderKind,
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<CallOptions>>,
}

impl ScriptedAdapter {
    pub(crate) fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            kind: ProviderKind::DeepSeek,
            steps: Mutex::new(steps.into_iter().collect()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen_options(&self) -> Vec<CallOptions> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn endpoint(&self) -> &str {
        "scripted://"
    }

    async fn execute(
        &self,
        _convo: &Conversation,
        options: &CallOptions,
        sink: Option<&dyn StreamSink>,
    ) -> LlmResult<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(options.clone());

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply { fragments, usage }) => {
                if let Some(sink) = sink {
                    for fragment in &fragments {
                        sink.on_fragment(fragment).await;
                    }
                }
                Ok(Completion {
                    text: fragments.concat(),
                    usage,
                })
            }
            Some(Step::Fail(err)) => Err(err),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(LlmError::MalformedResponse("script exhausted".to_string())),
        }
    }
}
