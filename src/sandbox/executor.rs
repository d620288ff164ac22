//! Pipeline driver: wrap, materialize, format, compile, launch, run, finalize.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::error::{Result, SandboxError};
use crate::sandbox::config::SandboxConfig;
use crate::sandbox::job::SandboxJob;
use crate::sandbox::limits::ExecutionLimits;
use crate::sandbox::outcome::{ExecutionMetadata, ExecutionReport, JobState, SandboxOutcome, Stage};
use crate::sandbox::stages::run_tool;
use crate::sandbox::supervisor::{RaceResult, SandboxSupervisor};
use crate::sandbox::validator::{global_validator, BinaryValidator};
use crate::sandbox::workspace::EphemeralWorkspace;

/// Extra construction options for [`GoSandbox`].
#[derive(Debug, Clone, Default)]
pub struct SandboxOptions {
    /// Validator to use instead of the process-wide one.
    pub validator: Option<BinaryValidator>,
}

impl SandboxOptions {
    /// Use a dedicated validator.
    pub fn with_validator(validator: BinaryValidator) -> Self {
        Self {
            validator: Some(validator),
        }
    }
}

/// Runs snippet jobs through the full pipeline.
///
/// Jobs share nothing but the scratch directory, so one `GoSandbox` can be
/// driven from many tasks at once.
#[derive(Debug)]
pub struct GoSandbox {
    config: SandboxConfig,
    validator: Option<BinaryValidator>,
    admission: Option<Arc<Semaphore>>,
}

impl GoSandbox {
    /// Create a sandbox with the given configuration.
    pub fn new(config: SandboxConfig) -> Self {
        Self::new_with_options(config, SandboxOptions::default())
    }

    /// Create a sandbox with explicit options.
    pub fn new_with_options(config: SandboxConfig, options: SandboxOptions) -> Self {
        let validator = config
            .validate_binary
            .then(|| options.validator.unwrap_or_else(|| global_validator().clone()));
        let admission = config
            .max_concurrent_jobs
            .map(|jobs| Arc::new(Semaphore::new(jobs)));
        Self {
            config,
            validator,
            admission,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Run one job to exactly one outcome.
    ///
    /// The job's artifacts are removed before this returns, whatever the
    /// outcome. The only error is a workspace that could not be materialized.
    #[instrument(skip(self, job), fields(job_id = %job.id, template = %job.template))]
    pub async fn execute(&self, job: &SandboxJob) -> Result<ExecutionReport> {
        let _permit = match &self.admission {
            Some(gate) => Some(
                Arc::clone(gate)
                    .acquire_owned()
                    .await
                    .map_err(|_| SandboxError::Config("admission gate closed".to_string()))?,
            ),
            None => None,
        };

        let started = Instant::now();
        let limits = ExecutionLimits::for_target(self.config.timeout, &job.requester.target);
        let mut transitions = Transitions::default();
        transitions.enter(JobState::Created);

        let mut workspace = EphemeralWorkspace::acquire(&self.config.scratch_dir, job.id);
        let result = self
            .run_stages(job, &workspace, &limits, &mut transitions)
            .await;
        workspace.release();
        transitions.enter(JobState::Finalized);

        let outcome = result?;
        match &outcome {
            SandboxOutcome::Success { stdout } => {
                debug!(stdout_bytes = stdout.len(), "job succeeded")
            }
            SandboxOutcome::StageFailed { stage, cause, .. } => {
                warn!(%stage, %cause, "job failed")
            }
            SandboxOutcome::TimedOut => {
                warn!(timeout = ?limits.wall_clock_timeout, "job timed out")
            }
        }

        Ok(ExecutionReport {
            outcome,
            metadata: ExecutionMetadata {
                job_id: job.id,
                duration: started.elapsed(),
                transitions: transitions.into_inner(),
                limits,
            },
        })
    }

    async fn run_stages(
        &self,
        job: &SandboxJob,
        workspace: &EphemeralWorkspace,
        limits: &ExecutionLimits,
        transitions: &mut Transitions,
    ) -> Result<SandboxOutcome> {
        let config = &self.config;

        workspace
            .materialize(&job.template.render(&job.source_code))
            .await?;
        transitions.enter(JobState::Materialized);

        let tools = [
            (Stage::Format, &config.formatter, JobState::Formatted),
            (Stage::Compile, &config.compiler, JobState::Compiled),
        ];
        for (stage, tool, reached) in tools {
            if let Err(outcome) = run_tool(
                stage,
                tool,
                workspace,
                config.max_capture_bytes,
                config.tool_timeout,
            )
            .await
            {
                return Ok(outcome);
            }
            transitions.enter(reached);
        }

        let supervisor = SandboxSupervisor::new(
            &config.runtime,
            self.validator.as_ref(),
            config.max_capture_bytes,
        );
        let running = match supervisor.launch(workspace).await {
            Ok(running) => running,
            Err(outcome) => return Ok(outcome),
        };
        transitions.enter(JobState::Launched);

        match running.race(limits.wall_clock_timeout).await {
            RaceResult::Completed(outcome) => {
                transitions.enter(JobState::Completed);
                Ok(outcome)
            }
            RaceResult::TimedOut => {
                transitions.enter(JobState::TimedOut);
                Ok(SandboxOutcome::TimedOut)
            }
        }
    }
}

#[derive(Debug, Default)]
struct Transitions(Vec<JobState>);

impl Transitions {
    fn enter(&mut self, state: JobState) {
        debug!(?state, "job state");
        self.0.push(state);
    }

    fn into_inner(self) -> Vec<JobState> {
        self.0
    }
}
