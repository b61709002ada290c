//! Caller-supplied retry decisions

use crate::error::ErrorKind;
use async_trait::async_trait;

/// Consulted by [`LlmClient`](super::LlmClient) when a call is about to give
/// up.
///
/// It is asked before waiting out a rate limit and once the retry budget is
/// exhausted. Returning `true` continues (waits, or grants a fresh budget);
/// `false` surfaces the error to the caller. The hook may take as long as it
/// likes, e.g. to ask a human.
#[async_trait]
pub trait DecisionHook: Send + Sync {
    async fn should_retry(&self, kind: ErrorKind, message: &str) -> bool;
}

/// Hook with a fixed answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDecision(pub bool);

#[async_trait]
impl DecisionHook for FixedDecision {
    async fn should_retry(&self, _kind: ErrorKind, _message: &str) -> bool {
        self.0
    }
}

/// Any async-free closure can serve as a hook
#[async_trait]
impl<F> DecisionHook for F
where
    F: Fn(ErrorKind, &str) -> bool + Send + Sync,
{
    async fn should_retry(&self, kind: ErrorKind, message: &str) -> bool {
        self(kind, message)
    }
}
