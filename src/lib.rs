//! # Go Snippet Sandbox
//!
//! Runs short, untrusted Go snippets submitted over a chat channel.
//!
//! A snippet is wrapped into a complete program, formatted with
//! `goimports`, compiled for `GOOS=wasip1 GOARCH=wasm` and executed under
//! `wasmtime` with a hard wall-clock limit. The captured output (or the
//! reason it failed) comes back as one line that fits the channel's
//! message length.
//!
//! - **Isolation**: the program is a WebAssembly module; it is validated
//!   before launch and runs with no preopened directories or sockets
//! - **Timeout**: the run races a deadline and is killed when it loses
//! - **Cleanup**: source and binary are removed on every exit path
//! - **Bounded output**: captures and replies are both length-limited
//!
//! ## Example
//!
//! ```rust,ignore
//! use go_snippet_sandbox::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SandboxConfig::builder()
//!         .timeout(Duration::from_secs(4))
//!         .build()?;
//!
//!     let sandbox = GoSandbox::new(config);
//!     let job = SandboxJob::new(
//!         Template::PrintWrapped,
//!         "1 + 1",
//!         Requester::new("alice", "#go-nuts"),
//!     );
//!     let report = sandbox.execute(&job).await?;
//!
//!     assert!(report.outcome.is_success());
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! 1. **Template**: the snippet becomes `main`'s body, or `fmt.Println`'s argument
//! 2. **Workspace**: a uniquely named source/binary pair in the scratch directory
//! 3. **Format** and **compile**: external tools; a failure stops the job
//! 4. **Supervise**: launch under the runtime, race exit against the deadline
//! 5. **Reply**: strip control bytes, fold lines, truncate with `...`

pub mod dispatch;
pub mod error;
pub mod prelude;
pub mod reply;
pub mod sandbox;

// Re-export main types at crate root for convenience
pub use dispatch::{CommandRegistry, Dispatcher, SnippetCommand, Writer};
pub use error::{Result, SandboxError};
pub use sandbox::config::{SandboxConfig, SandboxConfigBuilder, ToolCommand};
pub use sandbox::executor::{GoSandbox, SandboxOptions};
pub use sandbox::job::{Requester, SandboxJob};
pub use sandbox::limits::{max_reply_length, ExecutionLimits};
pub use sandbox::outcome::{ExecutionMetadata, ExecutionReport, JobState, SandboxOutcome, Stage};
pub use sandbox::template::Template;
pub use sandbox::validator::{global_validator, BinaryValidator};
