//! Job outcomes and pipeline states.

use std::fmt;
use std::time::Duration;

use super::limits::ExecutionLimits;
use super::workspace::JobId;

/// A sequential step of the pipeline that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Format,
    Compile,
    Launch,
    Run,
}

impl Stage {
    /// Label shown to the requester.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Format => "Failed to format source",
            Stage::Compile => "Failed to compile",
            Stage::Launch | Stage::Run => "Failed to run",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Format => "format",
            Stage::Compile => "compile",
            Stage::Launch => "launch",
            Stage::Run => "run",
        };
        f.write_str(name)
    }
}

/// Exactly one of these terminates every job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxOutcome {
    /// The program exited cleanly before the deadline.
    Success { stdout: String },
    /// A stage reported failure.
    StageFailed {
        stage: Stage,
        stderr: String,
        cause: String,
    },
    /// The deadline fired first and the program was killed.
    TimedOut,
}

impl SandboxOutcome {
    /// Check if the program ran to a clean exit.
    pub fn is_success(&self) -> bool {
        matches!(self, SandboxOutcome::Success { .. })
    }

    /// Check if the run was cut off by the deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SandboxOutcome::TimedOut)
    }

    /// The failing stage, if any.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            SandboxOutcome::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub(crate) fn failed(stage: Stage, stderr: String, cause: impl ToString) -> Self {
        SandboxOutcome::StageFailed {
            stage,
            stderr,
            cause: cause.to_string(),
        }
    }
}

/// Pipeline states, in the order a job can visit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Created,
    Materialized,
    Formatted,
    Compiled,
    Launched,
    Completed,
    TimedOut,
    Finalized,
}

/// Information about one pipeline run.
#[derive(Debug, Clone)]
pub struct ExecutionMetadata {
    /// Identifier the artifact paths were derived from.
    pub job_id: JobId,
    /// Wall-clock time from creation to finalization.
    pub duration: Duration,
    /// States visited, ending with `Finalized`.
    pub transitions: Vec<JobState>,
    /// Limits the job ran under; the reply must fit `max_reply_length`.
    pub limits: ExecutionLimits,
}

/// Outcome of a job together with its metadata.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub outcome: SandboxOutcome,
    pub metadata: ExecutionMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        assert_eq!(Stage::Format.label(), "Failed to format source");
        assert_eq!(Stage::Compile.label(), "Failed to compile");
        assert_eq!(Stage::Launch.label(), "Failed to run");
        assert_eq!(Stage::Run.label(), "Failed to run");
    }

    #[test]
    fn test_outcome_helpers() {
        let ok = SandboxOutcome::Success {
            stdout: "hi\n".to_string(),
        };
        assert!(ok.is_success());
        assert_eq!(ok.failed_stage(), None);

        let failed = SandboxOutcome::failed(Stage::Compile, String::new(), "exit status: 1");
        assert_eq!(failed.failed_stage(), Some(Stage::Compile));
        assert!(!failed.is_timeout());

        assert!(SandboxOutcome::TimedOut.is_timeout());
    }
}
