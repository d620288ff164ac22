//! Prelude module for convenient imports.

pub use crate::dispatch::{CommandRegistry, Dispatcher, Writer};
pub use crate::error::{Result, SandboxError};
pub use crate::sandbox::{
    config::{SandboxConfig, ToolCommand},
    executor::GoSandbox,
    job::{Requester, SandboxJob},
    outcome::{ExecutionReport, SandboxOutcome, Stage},
    template::Template,
};
