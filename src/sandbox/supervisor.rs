//! Launch the compiled program under the runtime and race it against a deadline.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::config::ToolCommand;
use super::io::{finish_drain, StreamCapture, DRAIN_GRACE};
use super::outcome::{SandboxOutcome, Stage};
use super::validator::BinaryValidator;
use super::workspace::EphemeralWorkspace;

/// Starts one runtime process per job.
#[derive(Debug, Clone)]
pub struct SandboxSupervisor<'a> {
    runtime: &'a ToolCommand,
    validator: Option<&'a BinaryValidator>,
    capacity: usize,
}

impl<'a> SandboxSupervisor<'a> {
    pub fn new(
        runtime: &'a ToolCommand,
        validator: Option<&'a BinaryValidator>,
        capacity: usize,
    ) -> Self {
        Self {
            runtime,
            validator,
            capacity,
        }
    }

    /// Validate the binary (when enabled) and spawn the runtime on it.
    ///
    /// Any failure here is a `Launch` failure and no process is left behind.
    pub async fn launch(
        &self,
        workspace: &EphemeralWorkspace,
    ) -> Result<RunningProgram, SandboxOutcome> {
        if let Some(validator) = self.validator {
            validator
                .validate_file(workspace.binary())
                .await
                .map_err(|e| {
                    SandboxOutcome::failed(Stage::Launch, String::new(), format!("{e:#}"))
                })?;
        }

        let mut command = self.runtime.to_command(workspace.source(), workspace.binary());
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| SandboxOutcome::failed(Stage::Launch, String::new(), e))?;
        debug!(pid = child.id(), "launched program");

        let capture = StreamCapture::new(self.capacity);
        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drains.push(capture.stdout.spawn_drain(stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(capture.stderr.spawn_drain(stderr));
        }

        Ok(RunningProgram {
            child,
            capture,
            drains,
        })
    }
}

/// Which arm of the race decided the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceResult {
    /// The process exited on its own; carries `Success` or a `Run` failure.
    Completed(SandboxOutcome),
    /// The deadline fired first and the process was killed.
    TimedOut,
}

/// A launched program whose outcome has not been decided yet.
#[derive(Debug)]
pub struct RunningProgram {
    child: Child,
    capture: StreamCapture,
    drains: Vec<JoinHandle<()>>,
}

impl RunningProgram {
    /// OS process id, if the process has not been reaped yet.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for exit or `deadline`, whichever comes first.
    ///
    /// When the deadline wins the process is sent SIGKILL and the pending
    /// wait is dropped; the kill is not awaited.
    pub async fn race(mut self, deadline: Duration) -> RaceResult {
        let exited = tokio::select! {
            status = self.child.wait() => Some(status),
            _ = tokio::time::sleep(deadline) => None,
        };

        let Some(status) = exited else {
            if let Err(e) = self.child.start_kill() {
                warn!(error = %e, "failed to signal timed out program");
            }
            for drain in &self.drains {
                drain.abort();
            }
            return RaceResult::TimedOut;
        };

        self.finish_drains().await;
        let stderr = self.capture.stderr_str();
        let outcome = match status {
            Ok(status) if status.success() => SandboxOutcome::Success {
                stdout: self.capture.stdout_str(),
            },
            Ok(status) => SandboxOutcome::failed(Stage::Run, stderr, status),
            Err(e) => SandboxOutcome::failed(Stage::Run, stderr, e),
        };
        RaceResult::Completed(outcome)
    }

    async fn finish_drains(&mut self) {
        for drain in self.drains.drain(..) {
            finish_drain(drain, DRAIN_GRACE).await;
        }
    }
}
