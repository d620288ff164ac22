//! Sandbox configuration with builder pattern.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SandboxError};

/// Placeholder substituted with the job's source file path.
pub const SOURCE_PLACEHOLDER: &str = "{source}";
/// Placeholder substituted with the job's binary file path.
pub const BINARY_PLACEHOLDER: &str = "{binary}";

/// An external tool invocation: program, argument template and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Program to execute, looked up on `PATH`.
    pub program: String,
    /// Arguments; `{source}` and `{binary}` are replaced per job.
    pub args: Vec<String>,
    /// Variables added on top of the inherited environment.
    pub env: BTreeMap<String, String>,
}

impl ToolCommand {
    /// Create a tool command with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for this tool only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Expand the argument template against a job's artifact paths.
    pub fn expand_args(&self, source: &Path, binary: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(|arg| match arg.as_str() {
                SOURCE_PLACEHOLDER => source.as_os_str().to_owned(),
                BINARY_PLACEHOLDER => binary.as_os_str().to_owned(),
                other => OsString::from(
                    other
                        .replace(SOURCE_PLACEHOLDER, &source.to_string_lossy())
                        .replace(BINARY_PLACEHOLDER, &binary.to_string_lossy()),
                ),
            })
            .collect()
    }

    /// Build a `tokio::process::Command` for the given artifact paths.
    pub fn to_command(&self, source: &Path, binary: &Path) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command.args(self.expand_args(source, binary));
        command.envs(&self.env);
        command
    }

    /// `goimports -w {source}`
    pub fn goimports() -> Self {
        Self::new("goimports").args(["-w", SOURCE_PLACEHOLDER])
    }

    /// `go build -o {binary} {source}` targeting `wasip1/wasm`.
    pub fn go_build_wasip1() -> Self {
        Self::new("go")
            .args(["build", "-o", BINARY_PLACEHOLDER, SOURCE_PLACEHOLDER])
            .env("GOOS", "wasip1")
            .env("GOARCH", "wasm")
    }

    /// `wasmtime run {binary}`
    pub fn wasmtime_run() -> Self {
        Self::new("wasmtime").args(["run", BINARY_PLACEHOLDER])
    }
}

/// Configuration for the snippet sandbox.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Wall-clock limit for the run stage.
    pub timeout: Duration,
    /// Shared directory holding every job's artifacts.
    pub scratch_dir: PathBuf,
    /// Source formatter / import resolver.
    pub formatter: ToolCommand,
    /// Compiler producing the restricted binary.
    pub compiler: ToolCommand,
    /// Isolated-execution runtime.
    pub runtime: ToolCommand,
    /// Validate the binary as a WebAssembly module before launch.
    pub validate_binary: bool,
    /// Capacity of each captured output stream, in bytes.
    pub max_capture_bytes: usize,
    /// Optional deadline for the format and compile stages.
    pub tool_timeout: Option<Duration>,
    /// Optional cap on simultaneously running jobs.
    pub max_concurrent_jobs: Option<usize>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(4),
            scratch_dir: std::env::temp_dir(),
            formatter: ToolCommand::goimports(),
            compiler: ToolCommand::go_build_wasip1(),
            runtime: ToolCommand::wasmtime_run(),
            validate_binary: true,
            max_capture_bytes: 64 * 1024, // 64KB
            tool_timeout: None,
            max_concurrent_jobs: None,
        }
    }
}

impl SandboxConfig {
    /// Create a new builder for SandboxConfig.
    pub fn builder() -> SandboxConfigBuilder {
        SandboxConfigBuilder::default()
    }

    fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(SandboxError::Config("timeout must be non-zero".to_string()));
        }
        if self.tool_timeout.is_some_and(|t| t.is_zero()) {
            return Err(SandboxError::Config(
                "tool timeout must be non-zero".to_string(),
            ));
        }
        for (name, tool) in [
            ("formatter", &self.formatter),
            ("compiler", &self.compiler),
            ("runtime", &self.runtime),
        ] {
            if tool.program.trim().is_empty() {
                return Err(SandboxError::Config(format!("{name} program is empty")));
            }
        }
        if self.max_capture_bytes == 0 {
            return Err(SandboxError::Config(
                "capture capacity must be non-zero".to_string(),
            ));
        }
        if self.max_concurrent_jobs == Some(0) {
            return Err(SandboxError::Config(
                "concurrent job limit must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for creating SandboxConfig instances.
#[derive(Debug, Clone, Default)]
pub struct SandboxConfigBuilder {
    timeout: Option<Duration>,
    scratch_dir: Option<PathBuf>,
    formatter: Option<ToolCommand>,
    compiler: Option<ToolCommand>,
    runtime: Option<ToolCommand>,
    validate_binary: Option<bool>,
    max_capture_bytes: Option<usize>,
    tool_timeout: Option<Duration>,
    max_concurrent_jobs: Option<usize>,
}

impl SandboxConfigBuilder {
    /// Set the run-stage timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the scratch directory for job artifacts.
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Set the formatter invocation.
    pub fn formatter(mut self, tool: ToolCommand) -> Self {
        self.formatter = Some(tool);
        self
    }

    /// Set the compiler invocation.
    pub fn compiler(mut self, tool: ToolCommand) -> Self {
        self.compiler = Some(tool);
        self
    }

    /// Set the runtime invocation.
    pub fn runtime(mut self, tool: ToolCommand) -> Self {
        self.runtime = Some(tool);
        self
    }

    /// Enable or disable pre-launch module validation.
    pub fn validate_binary(mut self, enabled: bool) -> Self {
        self.validate_binary = Some(enabled);
        self
    }

    /// Set the per-stream capture capacity in bytes.
    pub fn max_capture_bytes(mut self, bytes: usize) -> Self {
        self.max_capture_bytes = Some(bytes);
        self
    }

    /// Bound the format and compile stages.
    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// Cap the number of jobs running at once.
    pub fn max_concurrent_jobs(mut self, jobs: usize) -> Self {
        self.max_concurrent_jobs = Some(jobs);
        self
    }

    /// Build and validate the SandboxConfig.
    pub fn build(self) -> Result<SandboxConfig> {
        let default = SandboxConfig::default();
        let config = SandboxConfig {
            timeout: self.timeout.unwrap_or(default.timeout),
            scratch_dir: self.scratch_dir.unwrap_or(default.scratch_dir),
            formatter: self.formatter.unwrap_or(default.formatter),
            compiler: self.compiler.unwrap_or(default.compiler),
            runtime: self.runtime.unwrap_or(default.runtime),
            validate_binary: self.validate_binary.unwrap_or(default.validate_binary),
            max_capture_bytes: self.max_capture_bytes.unwrap_or(default.max_capture_bytes),
            tool_timeout: self.tool_timeout.or(default.tool_timeout),
            max_concurrent_jobs: self.max_concurrent_jobs.or(default.max_concurrent_jobs),
        };
        config.validate()?;
        Ok(config)
    }
}
