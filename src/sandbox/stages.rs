//! Format and compile stages: run one external tool to completion.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use super::config::ToolCommand;
use super::io::{finish_drain, CapturedOutput, DRAIN_GRACE};
use super::outcome::{SandboxOutcome, Stage};
use super::workspace::EphemeralWorkspace;

/// Run `tool` against the workspace artifacts and wait for it to exit.
///
/// Only stderr is captured. Without `deadline` the wait is unbounded.
/// Draining stderr after exit never outlasts the deadline or [`DRAIN_GRACE`].
/// On failure the returned outcome carries the tool's diagnostics.
#[instrument(skip(tool, workspace, capacity, deadline), fields(program = %tool.program))]
pub async fn run_tool(
    stage: Stage,
    tool: &ToolCommand,
    workspace: &EphemeralWorkspace,
    capacity: usize,
    deadline: Option<Duration>,
) -> Result<(), SandboxOutcome> {
    let mut command = tool.to_command(workspace.source(), workspace.binary());
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| SandboxOutcome::failed(stage, String::new(), e))?;

    let started = Instant::now();
    let stderr = CapturedOutput::new(capacity);
    let drain = child.stderr.take().map(|pipe| stderr.spawn_drain(pipe));

    let waited = match deadline {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                let _ = child.start_kill();
                if let Some(drain) = drain {
                    drain.abort();
                }
                return Err(SandboxOutcome::failed(
                    stage,
                    stderr.to_string_lossy(),
                    format!("timed out after {limit:?}"),
                ));
            }
        },
        None => child.wait().await,
    };

    if let Some(drain) = drain {
        let grace = deadline
            .map(|limit| limit.saturating_sub(started.elapsed()).min(DRAIN_GRACE))
            .unwrap_or(DRAIN_GRACE);
        finish_drain(drain, grace).await;
    }

    match waited {
        Ok(status) if status.success() => {
            debug!(%status, "tool finished");
            Ok(())
        }
        Ok(status) => Err(SandboxOutcome::failed(stage, stderr.to_string_lossy(), status)),
        Err(e) => Err(SandboxOutcome::failed(stage, stderr.to_string_lossy(), e)),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::sandbox::workspace::JobId;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh").args(["-c", script, "sh", "{source}", "{binary}"])
    }

    #[tokio::test]
    async fn test_successful_tool_can_rewrite_source() {
        let dir = tempfile::tempdir().unwrap();
        let ws = EphemeralWorkspace::acquire(dir.path(), JobId::new());
        ws.materialize("before").await.unwrap();

        run_tool(Stage::Format, &sh("echo after > \"$1\""), &ws, 1024, None)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(ws.source()).unwrap(), "after\n");
    }

    #[tokio::test]
    async fn test_failing_tool_reports_stage_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let ws = EphemeralWorkspace::acquire(dir.path(), JobId::new());
        ws.materialize("x").await.unwrap();

        let outcome = run_tool(
            Stage::Compile,
            &sh("echo './prog.go:5:1: syntax error' >&2; exit 2"),
            &ws,
            1024,
            None,
        )
        .await
        .unwrap_err();

        match outcome {
            SandboxOutcome::StageFailed { stage, stderr, cause } => {
                assert_eq!(stage, Stage::Compile);
                assert!(stderr.contains("syntax error"));
                assert!(cause.contains('2'));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_stage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ws = EphemeralWorkspace::acquire(dir.path(), JobId::new());
        let tool = ToolCommand::new("definitely-not-a-real-formatter-binary");
        let outcome = run_tool(Stage::Format, &tool, &ws, 1024, None)
            .await
            .unwrap_err();
        assert_eq!(outcome.failed_stage(), Some(Stage::Format));
    }

    #[tokio::test]
    async fn test_tool_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let ws = EphemeralWorkspace::acquire(dir.path(), JobId::new());
        let started = std::time::Instant::now();
        let outcome = run_tool(
            Stage::Compile,
            &sh("exec sleep 30"),
            &ws,
            1024,
            Some(Duration::from_millis(200)),
        )
        .await
        .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(5));
        match outcome {
            SandboxOutcome::StageFailed { stage, cause, .. } => {
                assert_eq!(stage, Stage::Compile);
                assert!(cause.starts_with("timed out"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tool_deadline_covers_inherited_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let ws = EphemeralWorkspace::acquire(dir.path(), JobId::new());
        let started = std::time::Instant::now();
        // the backgrounded sleep keeps stderr open after the tool exits
        run_tool(
            Stage::Format,
            &sh("sleep 3 >&2 & exit 0"),
            &ws,
            1024,
            Some(Duration::from_millis(200)),
        )
        .await
        .unwrap();
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "took {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn test_inherited_stderr_without_deadline_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let ws = EphemeralWorkspace::acquire(dir.path(), JobId::new());
        let started = std::time::Instant::now();
        let outcome = run_tool(
            Stage::Compile,
            &sh("echo 'undefined: x' >&2; sleep 3 >&2 & exit 1"),
            &ws,
            1024,
            None,
        )
        .await
        .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));
        match outcome {
            SandboxOutcome::StageFailed { stderr, .. } => assert!(stderr.contains("undefined: x")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
