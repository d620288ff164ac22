//! Pre-launch validation of compiled WebAssembly binaries.
//!
//! Compiling a `wasmtime::Engine` is not free, so a single engine is shared
//! by every job in the process. Validation only parses and type-checks the
//! module; nothing is instantiated and no instruction runs. Validating a
//! multi-megabyte module is CPU-bound, so the async path runs it on the
//! blocking pool.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use wasmtime::{Engine, Module};

/// Validates binaries against a shared engine.
#[derive(Clone)]
pub struct BinaryValidator {
    engine: Arc<Engine>,
}

impl std::fmt::Debug for BinaryValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryValidator")
            .field("engine", &"<wasmtime::Engine>")
            .finish()
    }
}

impl BinaryValidator {
    /// Create a validator with its own default engine.
    pub fn new() -> Self {
        Self {
            engine: Arc::new(Engine::default()),
        }
    }

    /// Wrap an existing engine.
    pub fn from_arc(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Check that `bytes` form a module the runtime will accept.
    pub fn validate(&self, bytes: &[u8]) -> anyhow::Result<()> {
        Module::validate(&self.engine, bytes)
    }

    /// Read and validate the binary at `path` off the async workers.
    pub async fn validate_file(&self, path: &Path) -> anyhow::Result<()> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || Module::validate(&engine, &bytes))
            .await
            .map_err(|e| anyhow::anyhow!("validation task failed: {}", e))?
    }
}

impl Default for BinaryValidator {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_VALIDATOR: LazyLock<BinaryValidator> = LazyLock::new(BinaryValidator::new);

/// Get the process-wide validator.
pub fn global_validator() -> &'static BinaryValidator {
    &GLOBAL_VALIDATOR
}
