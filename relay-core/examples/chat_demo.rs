//! Chat Demo - Conversation, streaming and retry hooks
//!
//! Sends a short conversation to the provider named on the command line,
//! printing streamed fragments as they arrive and asking on stdin before
//! waiting out rate limits.
//!
//! Run with: RELAY_API_KEY=... cargo run --example chat_demo -- deepseek deepseek-chat

use relay_core::{
    Conversation, ErrorKind, InvokeOptions, LlmClient, LlmConfig, LlmResult, StreamSink,
};
use std::io::{self, BufRead, Write};

/// Prints fragments without buffering whole lines
struct StdoutSink;

#[async_trait::async_trait]
impl StreamSink for StdoutSink {
    async fn on_fragment(&self, fragment: &str) {
        print!("{}", fragment);
        let _ = io::stdout().flush();
    }
}

fn ask_operator(kind: ErrorKind, message: &str) -> bool {
    println!("\n⚠️  {:?}: {}", kind, message);
    print!("   Retry? [y/N] ");
    let _ = io::stdout().flush();

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer).is_ok() && answer.trim().eq_ignore_ascii_case("y")
}

#[tokio::main]
async fn main() -> LlmResult<()> {
    let _ = relay_core::logging::init(&Default::default());

    let mut args = std::env::args().skip(1);
    let provider = args.next().unwrap_or_else(|| "deepseek".to_string());
    let model = args.next().unwrap_or_else(|| "deepseek-chat".to_string());

    let mut config = LlmConfig::new(&provider, &model).with_temperature(0.3);
    if let Ok(key) = std::env::var("RELAY_API_KEY") {
        config = config.with_api_key(key);
    }
    if let Ok(base_url) = std::env::var("RELAY_BASE_URL") {
        config = config.with_base_url(base_url);
    }

    println!("\n🚀 LLM Relay Chat Demo ({} / {})\n", provider, model);

    let client = LlmClient::new(config)?
        .with_stream_sink(StdoutSink)
        .with_decision_hook(ask_operator);

    println!("📝 Connection check");
    println!("──────────────────");
    if !client.api_check().await {
        println!("❌ {} did not answer; check the key and base URL", provider);
        return Ok(());
    }
    println!("\n✅ Provider reachable\n");

    let mut convo = Conversation::new();
    convo
        .system("You are a patient tutor. Answer in at most three sentences.")?
        .user("Why does Rust have both String and &str?")?;

    println!("📝 Streamed answer");
    println!("─────────────────");
    let (reply, log) = client.invoke(&convo, InvokeOptions::default()).await?;
    println!("\n");

    convo.assistant(reply.as_str())?;
    let checkpoint = convo.fork();
    convo.user("Summarize that as a JSON object with a single key 'summary'.")?;

    println!("📝 JSON follow-up");
    println!("────────────────");
    let (summary, follow_up) = client
        .invoke(&convo, InvokeOptions::default().with_json_mode(true))
        .await?;
    println!("\n");

    println!("📊 Request logs");
    println!("──────────────");
    for entry in [&log, &follow_up] {
        println!("{}", serde_json::to_string_pretty(&entry.summary()).unwrap_or_default());
    }
    println!("\nAdded since checkpoint: {} message(s)", convo.after(&checkpoint).len());
    println!("Final JSON: {}", summary);

    Ok(())
}
