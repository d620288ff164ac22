//! One execution request.

use super::template::Template;
use super::workspace::JobId;

/// Who asked, and where the answer goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Requester {
    /// Nickname the reply is addressed to.
    pub nick: String,
    /// Channel or user the command arrived on; its length bounds the reply.
    pub target: String,
}

impl Requester {
    pub fn new(nick: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            target: target.into(),
        }
    }
}

/// A snippet waiting to be wrapped, built and run.
#[derive(Debug, Clone)]
pub struct SandboxJob {
    pub id: JobId,
    pub template: Template,
    /// Untrusted snippet text; never inspected by the pipeline.
    pub source_code: String,
    pub requester: Requester,
}

impl SandboxJob {
    /// Create a job with a fresh id.
    pub fn new(template: Template, source_code: impl Into<String>, requester: Requester) -> Self {
        Self {
            id: JobId::new(),
            template,
            source_code: source_code.into(),
            requester,
        }
    }
}
