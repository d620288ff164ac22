//! Basic example of running Go snippets through the sandbox.
//!
//! Run with: cargo run --example basic_execution -- 'fmt.Println("hi")'
//!
//! Note: Requires goimports, go and wasmtime on PATH.

use std::sync::Arc;
use std::time::Duration;

use go_snippet_sandbox::prelude::*;
use tracing_subscriber::EnvFilter;

/// Prints replies to the terminal instead of a chat channel.
struct StdoutWriter;

impl Writer for StdoutWriter {
    fn notify(&self, requester: &Requester, text: &str) -> anyhow::Result<()> {
        // strip the bold markers for terminal output
        println!("-> {}: {}", requester.nick, text.replace('\x02', ""));
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Configure the sandbox
    let config = SandboxConfig::builder()
        .timeout(Duration::from_secs(4))
        .build()?;

    println!("Creating sandbox with config: {:?}", config);

    let dispatcher = Dispatcher::new(Arc::new(GoSandbox::new(config)), CommandRegistry::with_defaults());
    let requester = Requester::new("demo", "#go-nuts");

    let snippet = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "fmt.Println(\"Hello from wasm\")".to_string());

    // Run a statement block
    println!("\n=== Test 1: go ===");
    let report = dispatcher.dispatch("go", &requester, &snippet, &StdoutWriter).await?;
    println!("duration: {:?}", report.metadata.duration);
    println!("states: {:?}", report.metadata.transitions);

    // Print an expression
    println!("\n=== Test 2: gop ===");
    dispatcher
        .dispatch("gop", &requester, "strings.Repeat(\"ab\", 3)", &StdoutWriter)
        .await?;

    // Compile error
    println!("\n=== Test 3: compile error ===");
    dispatcher.dispatch("gop", &requester, "1 +", &StdoutWriter).await?;

    // Timeout
    println!("\n=== Test 4: infinite loop ===");
    dispatcher.dispatch("go", &requester, "for {}", &StdoutWriter).await?;

    Ok(())
}
