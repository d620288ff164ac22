//! Security tests against the real toolchain.
//!
//! These tests submit escape attempts to verify the runtime keeps snippets
//! away from the host. They need `goimports`, `go` (1.21+) and `wasmtime`
//! on `PATH`.

use std::time::{Duration, Instant};

use go_snippet_sandbox::prelude::*;

/// Helper to create a test sandbox.
fn sandbox() -> GoSandbox {
    let config = SandboxConfig::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    GoSandbox::new(config)
}

fn job(template: Template, code: &str) -> SandboxJob {
    SandboxJob::new(template, code, Requester::new("tester", "#sandbox"))
}

async fn stdout_of(template: Template, code: &str) -> String {
    let report = sandbox().execute(&job(template, code)).await.unwrap();
    match report.outcome {
        SandboxOutcome::Success { stdout } => stdout,
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires go, goimports and wasmtime"]
async fn test_print_wrapped_hello() {
    let report = sandbox()
        .execute(&job(Template::PrintWrapped, "\"hi\""))
        .await
        .unwrap();
    let text = go_snippet_sandbox::reply::render(&report.outcome, go_snippet_sandbox::max_reply_length(5));
    assert_eq!(text, "\x02go:\x02 hi");
}

#[tokio::test]
#[ignore = "requires go, goimports and wasmtime"]
async fn test_incomplete_expression_fails_before_run() {
    for _ in 0..2 {
        let report = sandbox()
            .execute(&job(Template::PrintWrapped, "1 +"))
            .await
            .unwrap();
        assert!(matches!(
            report.outcome.failed_stage(),
            Some(Stage::Format) | Some(Stage::Compile)
        ));
    }
}

/// Test that infinite loops are properly terminated.
#[tokio::test]
#[ignore = "requires go, goimports and wasmtime"]
async fn test_infinite_loop_timeout() {
    let config = SandboxConfig::builder()
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    let started = Instant::now();
    let report = GoSandbox::new(config)
        .execute(&job(Template::Bare, "for {}"))
        .await
        .unwrap();

    assert!(report.outcome.is_timeout(), "infinite loop should time out");
    assert!(report.metadata.duration >= Duration::from_millis(500));
    // compile time dominates; the run itself is bounded
    assert!(started.elapsed() < Duration::from_secs(120));
}

/// Test that filesystem access is blocked.
#[tokio::test]
#[ignore = "requires go, goimports and wasmtime"]
async fn test_filesystem_access_blocked() {
    let out = stdout_of(
        Template::Bare,
        r#"
if b, err := os.ReadFile("/etc/passwd"); err == nil {
    fmt.Println("SECURITY_BREACH: file read succeeded", len(b))
} else {
    fmt.Println("BLOCKED:", err)
}"#,
    )
    .await;

    assert!(!out.contains("SECURITY_BREACH"), "filesystem access should be blocked");
    assert!(out.contains("BLOCKED"));
}

/// Test that spawning processes is blocked.
#[tokio::test]
#[ignore = "requires go, goimports and wasmtime"]
async fn test_subprocess_blocked() {
    let out = stdout_of(
        Template::Bare,
        r#"
if err := exec.Command("echo", "BREACH").Run(); err == nil {
    fmt.Println("SECURITY_BREACH: subprocess succeeded")
} else {
    fmt.Println("BLOCKED:", err)
}"#,
    )
    .await;

    assert!(!out.contains("SECURITY_BREACH"), "subprocesses should be blocked");
}

/// Test that network access is blocked.
#[tokio::test]
#[ignore = "requires go, goimports and wasmtime"]
async fn test_network_access_blocked() {
    let out = stdout_of(
        Template::Bare,
        r#"
if c, err := net.Dial("tcp", "8.8.8.8:53"); err == nil {
    c.Close()
    fmt.Println("SECURITY_BREACH: network access succeeded")
} else {
    fmt.Println("BLOCKED:", err)
}"#,
    )
    .await;

    assert!(!out.contains("SECURITY_BREACH"), "network access should be blocked");
}

/// Test that the host environment is not visible.
#[tokio::test]
#[ignore = "requires go, goimports and wasmtime"]
async fn test_environment_hidden() {
    std::env::set_var("SNIPPET_SANDBOX_SECRET", "hunter2");
    let out = stdout_of(
        Template::PrintWrapped,
        r#"os.Getenv("SNIPPET_SANDBOX_SECRET")"#,
    )
    .await;

    assert!(!out.contains("hunter2"), "host environment should not leak");
}
