//! Client core: the retry engine wrapped around a provider adapter
//!
//! [`LlmClient::invoke`] turns a [`Conversation`] into one reply. It owns
//! the [`RequestLog`], resolves per-call options, retries transient failures
//! and waits out rate limits, consulting an optional [`DecisionHook`] before
//! giving up. Dropping the returned future cancels the call, including any
//! in-flight request or rate-limit wait.

mod hooks;
mod retry;

pub use hooks::{DecisionHook, FixedDecision};

use self::retry::RetryBudget;
use crate::config::{LlmConfig, SecretString};
use crate::conversation::Conversation;
use crate::error::{ErrorKind, LlmError, LlmResult};
use crate::http::HttpClient;
use crate::providers::{create_adapter, CallOptions, ProviderAdapter, ProviderKind, StreamSink};
use crate::request_log::RequestLog;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Prompt sent by [`LlmClient::api_check`]
pub const API_CHECK_PROMPT: &str =
    "This is a connection test. If you can see this, please respond only with 'START' and nothing else.";

/// Default attempt budget of one call
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Per-call options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvokeOptions {
    /// Overrides the configured temperature
    pub temperature: Option<f32>,
    pub json_mode: bool,
    /// Attempts allowed before the decision hook is consulted
    pub max_retries: u32,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            temperature: None,
            json_mode: false,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl InvokeOptions {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// A configured LLM client.
///
/// Cheap to clone; clones share the adapter, its connection pool, the sink
/// and the hook. Concurrent calls on one client are independent.
#[derive(Clone)]
pub struct LlmClient {
    config: Arc<LlmConfig>,
    adapter: Arc<dyn ProviderAdapter>,
    stream_sink: Option<Arc<dyn StreamSink>>,
    decision_hook: Option<Arc<dyn DecisionHook>>,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("provider", &self.adapter.kind())
            .field("model", &self.config.model)
            .field("endpoint", &self.adapter.endpoint())
            .field("stream_sink", &self.stream_sink.is_some())
            .field("decision_hook", &self.decision_hook.is_some())
            .finish()
    }
}

impl LlmClient {
    /// Build the client for `config.provider`.
    ///
    /// Fails with [`LlmError::UnsupportedProvider`] for an unknown provider
    /// and [`LlmError::Configuration`] for invalid settings.
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        config
            .validate()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;

        let http = HttpClient::from_config(&config)?;
        let config = Arc::new(config);
        let adapter = create_adapter(Arc::clone(&config), http)?;

        info!(
            "Created {} client for model {} at {} (key: {})",
            adapter.kind(),
            config.model,
            adapter.endpoint(),
            config
                .api_key
                .as_ref()
                .map(SecretString::masked)
                .unwrap_or_else(|| "none".to_string())
        );

        Ok(Self::with_adapter(config, adapter))
    }

    /// Wrap a custom adapter
    pub fn with_adapter(config: Arc<LlmConfig>, adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            config,
            adapter,
            stream_sink: None,
            decision_hook: None,
        }
    }

    pub fn with_stream_sink(mut self, sink: impl StreamSink + 'static) -> Self {
        self.stream_sink = Some(Arc::new(sink));
        self
    }

    pub fn with_decision_hook(mut self, hook: impl DecisionHook + 'static) -> Self {
        self.decision_hook = Some(Arc::new(hook));
        self
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn provider(&self) -> ProviderKind {
        self.adapter.kind()
    }

    /// Send `convo` and return the reply text with its request log.
    ///
    /// Every attempt consumes one credit of `options.max_retries`.
    /// Transient failures (connectivity, malformed replies, API errors) are
    /// retried at once. Rate limits are waited out for the adapter-computed
    /// duration after the decision hook agrees; a declining hook surfaces
    /// [`LlmError::RateLimited`]. Once the budget is spent the hook may grant
    /// a fresh one, otherwise the call fails with
    /// [`LlmError::RetriesExhausted`] carrying the log. Other errors are
    /// returned immediately.
    pub async fn invoke(
        &self,
        convo: &Conversation,
        options: InvokeOptions,
    ) -> LlmResult<(String, RequestLog)> {
        let temperature = options.temperature.unwrap_or(self.config.temperature);
        let mut log = RequestLog::start(self.adapter.kind(), &self.config.model, temperature, convo);
        let call = CallOptions {
            temperature,
            json_mode: options.json_mode,
            request_id: log.request_id,
        };

        let started = Instant::now();
        let mut budget = RetryBudget::new(options.max_retries);
        let mut last_kind = ErrorKind::GenericApiError;

        debug!(
            "Invoking {} with {} messages [request_id: {}]",
            self.adapter.kind(),
            convo.len(),
            log.request_id
        );

        loop {
            if budget.is_exhausted() {
                let message = log
                    .error
                    .clone()
                    .unwrap_or_else(|| "Maximum retries exceeded".to_string());

                if self.ask_hook(last_kind, &message, false).await {
                    info!(
                        "Retry budget renewed after: {} [request_id: {}]",
                        message, log.request_id
                    );
                    budget.reset();
                    continue;
                }

                log.record_error(message.clone());
                log.finish(started.elapsed());
                error!(
                    "Giving up after {} attempts: {} [request_id: {}]",
                    budget.max_attempts(),
                    message,
                    log.request_id
                );
                return Err(LlmError::RetriesExhausted {
                    message,
                    log: Box::new(log),
                });
            }

            let attempt = budget.consume();
            debug!("Attempt {} [request_id: {}]", attempt, log.request_id);

            match self
                .adapter
                .execute(convo, &call, self.stream_sink.as_deref())
                .await
            {
                Ok(completion) => {
                    log.record_success(
                        &completion.text,
                        completion.usage.prompt_tokens,
                        completion.usage.completion_tokens,
                    );
                    log.finish(started.elapsed());
                    info!(
                        "Completed in {:.2}s ({} prompt + {} completion tokens) [request_id: {}]",
                        log.duration.as_secs_f64(),
                        log.prompt_tokens,
                        log.completion_tokens,
                        log.request_id
                    );
                    return Ok((completion.text, log));
                }
                Err(err) if !err.is_retryable() => {
                    log.record_error(err.to_string());
                    log.finish(started.elapsed());
                    error!("Request failed: {} [request_id: {}]", err, log.request_id);
                    return Err(err);
                }
                Err(LlmError::RateLimited {
                    message,
                    retry_after,
                }) => {
                    log.record_error(format!("Rate limited: {}", message));
                    last_kind = ErrorKind::RateLimited;

                    let notice = format!(
                        "Rate limited. Sleeping for {:.1}s...",
                        retry_after.as_secs_f64()
                    );
                    if !self.ask_hook(ErrorKind::RateLimited, &notice, true).await {
                        log.finish(started.elapsed());
                        warn!(
                            "Rate limit not waited out: {} [request_id: {}]",
                            message, log.request_id
                        );
                        return Err(LlmError::RateLimited {
                            message,
                            retry_after,
                        });
                    }

                    warn!("{} [request_id: {}]", notice, log.request_id);
                    tokio::time::sleep(retry_after).await;
                }
                Err(err) => {
                    warn!(
                        "Attempt {} failed: {} [request_id: {}]",
                        attempt, err, log.request_id
                    );
                    log.record_error(err.to_string());
                    last_kind = err.kind();
                }
            }
        }
    }

    /// Lightweight liveness check; any failure yields `false`
    pub async fn api_check(&self) -> bool {
        let mut convo = Conversation::new();
        if convo.user(API_CHECK_PROMPT).is_err() {
            return false;
        }

        match self.invoke(&convo, InvokeOptions::default()).await {
            Ok((reply, _)) => !reply.is_empty(),
            Err(err) => {
                warn!("API check failed for {}: {}", self.adapter.kind(), err);
                false
            }
        }
    }

    /// Hook verdict, or `default` when no hook is registered
    async fn ask_hook(&self, kind: ErrorKind, message: &str, default: bool) -> bool {
        match &self.decision_hook {
            Some(hook) => hook.should_retry(kind, message).await,
            None => default,
        }
    }
}
