//! Sandbox module containing all pipeline components.

pub mod config;
pub mod executor;
pub mod io;
pub mod job;
pub mod limits;
pub mod outcome;
pub mod stages;
pub mod supervisor;
pub mod template;
pub mod validator;
pub mod workspace;
