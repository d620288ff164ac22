//! Command registry and result delivery.
//!
//! Command names are resolved through an explicit table built once at
//! startup. The transport that delivers invocations and replies sits behind
//! the [`Writer`] trait.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{Result, SandboxError};
use crate::reply;
use crate::sandbox::executor::GoSandbox;
use crate::sandbox::job::{Requester, SandboxJob};
use crate::sandbox::outcome::ExecutionReport;
use crate::sandbox::template::Template;

/// Delivers a finished reply to the requester.
pub trait Writer: Send + Sync {
    /// Send `text` as a notice to `requester`.
    fn notify(&self, requester: &Requester, text: &str) -> anyhow::Result<()>;
}

/// A registered command: which skeleton it uses and how it is described.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnippetCommand {
    pub template: Template,
    pub help: &'static str,
}

/// Mapping from command name to handler.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, SnippetCommand>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// `go` runs the snippet as the body of `main`; `gop` prints its value.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.commands.insert(
            "go".to_string(),
            SnippetCommand {
                template: Template::Bare,
                help: "Runs a snippet of sandboxed go code.",
            },
        );
        registry.commands.insert(
            "gop".to_string(),
            SnippetCommand {
                template: Template::PrintWrapped,
                help: "Runs a snippet of sandboxed go code inside fmt.Println().",
            },
        );
        registry
    }

    /// Register `name`; fails if the name is taken.
    pub fn register(&mut self, name: impl Into<String>, command: SnippetCommand) -> Result<()> {
        let name = name.into();
        if self.commands.contains_key(&name) {
            return Err(SandboxError::Config(format!(
                "command {name} is already registered"
            )));
        }
        self.commands.insert(name, command);
        Ok(())
    }

    /// One-line description of a command, for help listings.
    pub fn help(&self, name: &str) -> Option<&'static str> {
        self.commands.get(name).map(|command| command.help)
    }

    /// Look up a command by name.
    pub fn get(&self, name: &str) -> Option<&SnippetCommand> {
        self.commands.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }
}

/// Resolves invocations, runs them and publishes the reply.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    sandbox: Arc<GoSandbox>,
    registry: Arc<CommandRegistry>,
}

impl Dispatcher {
    pub fn new(sandbox: Arc<GoSandbox>, registry: CommandRegistry) -> Self {
        Self {
            sandbox,
            registry: Arc::new(registry),
        }
    }

    /// The command table.
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Run `code` under command `name` and send the reply to `requester`.
    ///
    /// Job failures are delivered as notices and reported as `Ok`. Errors are
    /// limited to unknown commands, workspace materialization and delivery.
    #[instrument(skip(self, code, writer), fields(nick = %requester.nick, target = %requester.target))]
    pub async fn dispatch(
        &self,
        name: &str,
        requester: &Requester,
        code: &str,
        writer: &dyn Writer,
    ) -> Result<ExecutionReport> {
        let command = self
            .registry
            .get(name)
            .ok_or_else(|| SandboxError::UnknownCommand(name.to_string()))?;

        let job = SandboxJob::new(command.template, code, requester.clone());
        let report = self.sandbox.execute(&job).await?;

        let text = reply::render(&report.outcome, report.metadata.limits.max_reply_length);
        debug!(bytes = text.len(), "delivering reply");
        writer
            .notify(&job.requester, &text)
            .map_err(SandboxError::Delivery)?;
        Ok(report)
    }
}
