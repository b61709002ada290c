//! Pooled HTTP client using reqwest

use crate::config::LlmConfig;
use crate::error::{LlmError, LlmResult};
use crate::providers::rate_limit::RateLimitPolicy;
use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Default user agent
const USER_AGENT: &str = concat!("llm-relay/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with connection pooling.
///
/// Cloning is cheap and clones share the same connection pool, so one
/// instance can serve any number of concurrent calls.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Build a client honoring the connect and read timeouts of `config`.
    /// A zero timeout disables the corresponding limit.
    pub fn from_config(config: &LlmConfig) -> LlmResult<Self> {
        Self::with_timeouts(
            config.connect_timeout_duration(),
            config.read_timeout_duration(),
        )
    }

    pub fn with_timeouts(connect_timeout: Duration, read_timeout: Duration) -> LlmResult<Self> {
        let mut builder = ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(USER_AGENT)
            .gzip(true);

        if !connect_timeout.is_zero() {
            builder = builder.connect_timeout(connect_timeout);
        }
        if !read_timeout.is_zero() {
            builder = builder.read_timeout(read_timeout);
        }

        let client = builder
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// POST a JSON body and return the response if the status is 2xx.
    ///
    /// Transport failures become [`LlmError::Connectivity`]; non-2xx statuses
    /// are classified by [`map_http_error`](super::error::map_http_error)
    /// with the backoff computed from `rate_limits`.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &B,
        rate_limits: &RateLimitPolicy,
        request_id: Uuid,
    ) -> LlmResult<Response> {
        debug!("POST {} [request_id: {}]", url, request_id);

        let response = self
            .client
            .post(url)
            .headers(headers)
            .header("X-Request-ID", request_id.to_string())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("Request error for {} [request_id: {}]: {}", url, request_id, e);
                LlmError::Connectivity(format!("{} [request_id: {}]", e, request_id))
            })?;

        let status = response.status();
        debug!("Response status: {} [request_id: {}]", status, request_id);

        if status.is_success() {
            return Ok(response);
        }

        let response_headers = response.headers().clone();
        let body = response.text().await.ok();

        warn!(
            "Request failed with status {} [request_id: {}]",
            status, request_id
        );

        Err(super::error::map_http_error(
            status,
            &response_headers,
            body,
            rate_limits,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::rate_limit::DEFAULT_RATE_LIMIT_WAIT;
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> HttpClient {
        HttpClient::with_timeouts(Duration::from_secs(5), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_post_json_success_sends_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat"))
            .and(header_exists("X-Request-ID"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let response = client()
            .post_json(
                &format!("{}/v1/chat", server.uri()),
                HeaderMap::new(),
                &json!({"model": "m"}),
                &RateLimitPolicy::Default,
                Uuid::new_v4(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_post_json_maps_429() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = client()
            .post_json(
                &server.uri(),
                HeaderMap::new(),
                &json!({}),
                &RateLimitPolicy::Default,
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        match err {
            LlmError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, DEFAULT_RATE_LIMIT_WAIT)
            }
            other => panic!("expected rate limit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_post_json_connection_refused() {
        // Port 9 (discard) on localhost is closed in test environments
        let err = client()
            .post_json(
                "http://127.0.0.1:9/",
                HeaderMap::new(),
                &json!({}),
                &RateLimitPolicy::Default,
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Connectivity(_)));
    }
}
