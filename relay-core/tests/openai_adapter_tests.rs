//! OpenAI-compatible adapters against a mock server

use relay_core::{Conversation, ErrorKind, InvokeOptions, LlmClient, LlmConfig, LlmError, ProviderKind};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Render `data:` payloads as an SSE body terminated by `[DONE]`
fn sse(chunks: &[serde_json::Value]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn delta(content: &str) -> serde_json::Value {
    json!({"choices": [{"index": 0, "delta": {"content": content}}]})
}

fn openai_client(server: &MockServer) -> LlmClient {
    let config = LlmConfig::new("openai", "gpt-4o-mini")
        .with_base_url(server.uri())
        .with_api_key("sk-test");
    LlmClient::new(config).unwrap()
}

fn hello() -> Conversation {
    let mut convo = Conversation::new();
    convo.system("You are helpful.").unwrap().user("Say hi").unwrap();
    convo
}

fn declining(_: ErrorKind, _: &str) -> bool {
    false
}

#[tokio::test]
async fn test_streamed_reply_reaches_sink_in_order() {
    let server = MockServer::start().await;
    let body = sse(&[
        delta("Hel"),
        delta("lo"),
        delta(" there"),
        json!({"choices": [], "usage": {"prompt_tokens": 12, "completion_tokens": 3}}),
    ]);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "stream": true,
            "stream_options": {"include_usage": true},
            "messages": [
                {"role": "system", "content": "You are helpful."},
                {"role": "user", "content": "Say hi"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let client = openai_client(&server).with_stream_sink(tx);

    let (reply, log) = client.invoke(&hello(), InvokeOptions::default()).await.unwrap();
    assert_eq!(reply, "Hello there");
    assert_eq!(log.prompt_tokens, 12);
    assert_eq!(log.completion_tokens, 3);
    assert_eq!(log.provider, ProviderKind::OpenAi);

    let mut fragments = Vec::new();
    while let Ok(fragment) = rx.try_recv() {
        fragments.push(fragment);
    }
    assert_eq!(fragments, vec!["Hel", "lo", " there"]);
}

#[tokio::test]
async fn test_unparseable_chunks_are_skipped() {
    let server = MockServer::start().await;
    let body = format!(
        "data: {}\n\ndata: {{not json\n\ndata: {}\n\ndata: [DONE]\n\n",
        delta("a"),
        delta("b")
    );

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let (reply, _) = openai_client(&server)
        .invoke(&hello(), InvokeOptions::default())
        .await
        .unwrap();
    assert_eq!(reply, "ab");
}

#[tokio::test]
async fn test_plain_json_reply_is_accepted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "not streamed"}}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2}
        })))
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let (reply, log) = openai_client(&server)
        .with_stream_sink(tx)
        .invoke(&hello(), InvokeOptions::default())
        .await
        .unwrap();

    assert_eq!(reply, "not streamed");
    assert_eq!(log.total_tokens(), 7);
    assert_eq!(rx.recv().await.as_deref(), Some("not streamed"));
}

#[tokio::test]
async fn test_stream_error_event_is_retried() {
    let server = MockServer::start().await;
    let failing = sse(&[json!({"error": {"message": "model overloaded"}})]);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(failing, "text/event-stream"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse(&[delta("fine")]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let (reply, _) = openai_client(&server)
        .invoke(&hello(), InvokeOptions::default())
        .await
        .unwrap();
    assert_eq!(reply, "fine");
}

#[tokio::test]
async fn test_empty_stream_exhausts_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse(&[]), "text/event-stream"))
        .expect(2)
        .mount(&server)
        .await;

    let err = openai_client(&server)
        .invoke(&hello(), InvokeOptions::default().with_max_retries(2))
        .await
        .unwrap_err();

    match err {
        LlmError::RetriesExhausted { message, .. } => {
            assert!(message.contains("without any content"), "{}", message)
        }
        other => panic!("expected exhausted retries, got {:?}", other),
    }
}

#[tokio::test]
async fn test_json_mode_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"response_format": {"type": "json_object"}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse(&[delta("{}")]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (reply, _) = openai_client(&server)
        .invoke(&hello(), InvokeOptions::default().with_json_mode(true))
        .await
        .unwrap();
    assert_eq!(reply, "{}");
}

#[tokio::test]
async fn test_token_window_reset_wins_when_tokens_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("x-ratelimit-remaining-tokens", "0")
                .insert_header("x-ratelimit-reset-tokens", "2h32m54s")
                .insert_header("x-ratelimit-reset-requests", "1s")
                .set_body_json(json!({"error": {"message": "Rate limit reached"}})),
        )
        .mount(&server)
        .await;

    let err = openai_client(&server)
        .with_decision_hook(declining)
        .invoke(&hello(), InvokeOptions::default())
        .await
        .unwrap_err();

    match err {
        LlmError::RateLimited { retry_after, .. } => {
            assert_eq!(retry_after, Duration::from_secs(9174))
        }
        other => panic!("expected rate limit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_request_window_reset_when_tokens_remain() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("x-ratelimit-remaining-tokens", "1200")
                .insert_header("x-ratelimit-reset-tokens", "10m")
                .insert_header("x-ratelimit-reset-requests", "1.5s"),
        )
        .mount(&server)
        .await;

    let err = openai_client(&server)
        .with_decision_hook(declining)
        .invoke(&hello(), InvokeOptions::default())
        .await
        .unwrap_err();

    match err {
        LlmError::RateLimited { retry_after, .. } => {
            assert_eq!(retry_after, Duration::from_millis(1500))
        }
        other => panic!("expected rate limit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_key_is_reported_to_hook() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .expect(2)
        .mount(&server)
        .await;

    let kinds = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let recorder = kinds.clone();
    let hook = move |kind: ErrorKind, _: &str| {
        recorder.lock().unwrap().push(kind);
        false
    };

    let err = openai_client(&server)
        .with_decision_hook(hook)
        .invoke(&hello(), InvokeOptions::default().with_max_retries(2))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Incorrect API key"), "{}", err);
    assert_eq!(*kinds.lock().unwrap(), vec![ErrorKind::KeyExpired]);
}

#[tokio::test]
async fn test_azure_deployment_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/deployments/prod/chat/completions"))
        .and(query_param("api-version", "2024-10-21"))
        .and(header("api-key", "az-key"))
        .and(body_partial_json(json!({"stream_options": {"include_usage": true}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse(&[delta("from azure")]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = LlmConfig::new("azure", "gpt-4o")
        .with_base_url(format!("{}/openai/deployments/prod", server.uri()))
        .with_api_key("az-key");
    let client = LlmClient::new(config).unwrap();
    assert_eq!(client.provider(), ProviderKind::Azure);

    let (reply, _) = client.invoke(&hello(), InvokeOptions::default()).await.unwrap();
    assert_eq!(reply, "from azure");

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_unnamed_function_result_sent_as_user() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "user", "content": "What is 6*7?"},
                {"role": "assistant", "content": "Let me compute it."},
                {"role": "user", "content": "42"}
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse(&[delta("It is 42.")]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut convo = Conversation::new();
    convo
        .user("What is 6*7?")
        .unwrap()
        .assistant("Let me compute it.")
        .unwrap();
    convo.add("function", "42", None).unwrap();

    let (reply, _) = openai_client(&server)
        .invoke(&convo, InvokeOptions::default())
        .await
        .unwrap();
    assert_eq!(reply, "It is 42.");

    let requests = server.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["messages"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_groq_usage_from_extension() {
    let server = MockServer::start().await;
    let body = sse(&[
        delta("fast"),
        json!({
            "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}],
            "x_groq": {"id": "req_1", "usage": {"prompt_tokens": 9, "completion_tokens": 1}}
        }),
    ]);

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer gsk"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let config = LlmConfig::new("groq", "llama-3.1-8b-instant")
        .with_base_url(server.uri())
        .with_api_key("gsk");
    let (reply, log) = LlmClient::new(config)
        .unwrap()
        .invoke(&hello(), InvokeOptions::default())
        .await
        .unwrap();

    assert_eq!(reply, "fast");
    assert_eq!(log.prompt_tokens, 9);
    assert_eq!(log.completion_tokens, 1);

    let requests = server.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(sent.get("stream_options").is_none());
}

#[tokio::test]
async fn test_lm_studio_sends_no_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse(&[delta("local")]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let config = LlmConfig::new("lm-studio", "qwen2.5-7b").with_base_url(server.uri());
    let client = LlmClient::new(config).unwrap();
    assert!(client.api_check().await);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["messages"][0]["content"], relay_core::client::API_CHECK_PROMPT);
}

#[tokio::test]
async fn test_api_check_false_on_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(!openai_client(&server).api_check().await);
}
