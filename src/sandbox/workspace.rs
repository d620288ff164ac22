//! Per-job artifact paths with guaranteed removal.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, error};
use uuid::Uuid;

use crate::error::{Result, SandboxError};

/// Extension of the materialized source file.
pub const SOURCE_EXTENSION: &str = "go";
/// Extension of the compiled binary.
pub const BINARY_EXTENSION: &str = "wasm";

/// Opaque job identifier; unique across concurrently running jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    /// Draw a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    fn file_stem(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// The source and binary paths owned by one job.
///
/// Both paths are removed by [`release`](Self::release) or, failing that,
/// when the workspace is dropped.
#[derive(Debug)]
pub struct EphemeralWorkspace {
    source: PathBuf,
    binary: PathBuf,
    released: bool,
}

impl EphemeralWorkspace {
    /// Reserve the artifact paths for `id` under `scratch_dir`.
    ///
    /// Nothing is created yet; the paths are only derived from the id.
    pub fn acquire(scratch_dir: &Path, id: JobId) -> Self {
        let stem = id.file_stem();
        Self {
            source: scratch_dir.join(format!("{stem}.{SOURCE_EXTENSION}")),
            binary: scratch_dir.join(format!("{stem}.{BINARY_EXTENSION}")),
            released: false,
        }
    }

    /// Write the program text to the source path.
    ///
    /// The file is created exclusively; an existing file at the path is an error.
    pub async fn materialize(&self, program: &str) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.source)
            .await
            .map_err(SandboxError::Workspace)?;
        file.write_all(program.as_bytes())
            .await
            .map_err(SandboxError::Workspace)?;
        file.flush().await.map_err(SandboxError::Workspace)?;
        debug!(path = %self.source.display(), bytes = program.len(), "materialized source");
        Ok(())
    }

    /// Path of the source file.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Path of the binary file.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Remove both artifacts. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        for path in [&self.source, &self.binary] {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed artifact"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => error!(path = %path.display(), error = %e, "failed to remove artifact"),
            }
        }
    }

    /// Whether the artifacts have already been released.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for EphemeralWorkspace {
    fn drop(&mut self) {
        self.release();
    }
}
