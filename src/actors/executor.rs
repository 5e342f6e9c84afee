//! CommandExecutor - runs compose up/down for one group
//!
//! Each run is its own tokio task, detached from the request that triggered
//! it. Progress is only visible through `command_output` events on the
//! broadcast channel:
//!
//! ```text
//! docker_action → validate → spawn task
//!                              │
//!                              ├─ "Executing: ..."
//!                              ├─ one event per output line (stdout + stderr)
//!                              ├─ "SUCCESS: ..." | "FAILURE: ..." (after exit)
//!                              └─ status_update (fresh probe)
//! ```
//!
//! Runs are not cancellable and have no timeout: pulling images can take minutes.
//! stdout and stderr are read through one shared pipe, which needs a unix host.

use std::fmt;
use std::os::fd::OwnedFd;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::unix::pipe;
use tokio::process::Command;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use super::messages::{ActionRequest, DashboardEvent};
use crate::{monitors::GroupStatusProber, util::is_safe_component_name};

/// Requested lifecycle change of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeAction {
    Up,
    Down,
}

impl ComposeAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "up" => Some(ComposeAction::Up),
            "down" => Some(ComposeAction::Down),
            _ => None,
        }
    }

    fn compose_args(self) -> &'static [&'static str] {
        match self {
            ComposeAction::Up => &["compose", "up", "-d"],
            ComposeAction::Down => &["compose", "down"],
        }
    }
}

/// Rejected `docker_action` request
///
/// The `Display` output is the line published to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    InvalidAction,
    InvalidConnectorName,
    UnknownTargetType,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::InvalidAction => write!(f, "Error: Invalid action."),
            ActionError::InvalidConnectorName => write!(f, "Error: Invalid connector name."),
            ActionError::UnknownTargetType => write!(f, "Error: Unknown target type."),
        }
    }
}

impl std::error::Error for ActionError {}

/// A command to run inside a group directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRun {
    pub program: String,
    pub args: Vec<String>,
    pub working_directory: PathBuf,
}

impl CommandRun {
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
        working_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_directory: working_directory.into(),
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone)]
pub struct CommandExecutor {
    prober: GroupStatusProber,
    event_tx: broadcast::Sender<DashboardEvent>,
}

impl CommandExecutor {
    pub fn new(prober: GroupStatusProber, event_tx: broadcast::Sender<DashboardEvent>) -> Self {
        Self { prober, event_tx }
    }

    /// Turn a request into the command it would run.
    pub fn plan(&self, request: &ActionRequest) -> Result<CommandRun, ActionError> {
        let action = request
            .action
            .as_deref()
            .and_then(ComposeAction::parse)
            .ok_or(ActionError::InvalidAction)?;

        let group = match request.kind.as_deref() {
            Some("core") => self.prober.core_group(),
            Some("connector") => {
                let name = request.target_name.as_deref().unwrap_or_default();
                if !is_safe_component_name(name) {
                    return Err(ActionError::InvalidConnectorName);
                }
                self.prober.connector_group(name)
            }
            _ => return Err(ActionError::UnknownTargetType),
        };

        Ok(CommandRun::new(
            self.prober.docker_binary(),
            action.compose_args().iter().copied(),
            group.path,
        ))
    }

    /// Validate and launch a request.
    ///
    /// Returns immediately. Invalid requests publish one error line and spawn nothing.
    pub fn handle_action(&self, request: &ActionRequest) -> Option<JoinHandle<()>> {
        match self.plan(request) {
            Ok(run) => Some(self.spawn(run)),
            Err(e) => {
                warn!("rejected docker_action {request:?}: {e}");
                self.publish_line(e.to_string());
                None
            }
        }
    }

    /// Run the command on its own task.
    pub fn spawn(&self, run: CommandRun) -> JoinHandle<()> {
        let executor = self.clone();
        tokio::spawn(async move { executor.run(run).await })
    }

    /// Run the command to completion, streaming its output.
    #[instrument(skip(self), fields(command = %run.command_line()))]
    pub async fn run(&self, run: CommandRun) {
        if !run.working_directory.is_dir() {
            self.publish_line(format!(
                "Error: Directory not found: {}",
                run.working_directory.display()
            ));
            return;
        }

        self.publish_line(format!(
            "Executing: {} in {}",
            run.command_line(),
            run.working_directory.display()
        ));

        match self.stream(&run).await {
            Ok(status) if status.success() => {
                info!("command completed successfully");
                self.publish_line("SUCCESS: Command completed successfully.");
            }
            Ok(status) => {
                let code = status
                    .code()
                    .map_or_else(|| String::from("unknown"), |code| code.to_string());
                info!("command failed with exit code {code}");
                self.publish_line(format!("FAILURE: Command exited with code {code}"));
            }
            Err(e) => {
                warn!("command raised: {e:#}");
                self.publish_line(format!("EXCEPTION: {e:#}"));
                return;
            }
        }

        let status = self.prober.full_status_update().await;
        self.publish(DashboardEvent::StatusUpdate(status));
    }

    async fn stream(&self, run: &CommandRun) -> Result<ExitStatus> {
        // stdout and stderr share one pipe so lines arrive in the order the child wrote them
        let (reader, writer) = std::io::pipe().context("failed to create output pipe")?;
        let stderr_writer = writer.try_clone().context("failed to create output pipe")?;

        // the builder holds the write ends; dropping it right after spawn lets EOF through
        let mut child = Command::new(&run.program)
            .args(&run.args)
            .current_dir(&run.working_directory)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start {}", run.program))?;

        let output = pipe::Receiver::from_owned_fd(OwnedFd::from(reader))
            .context("failed to attach to command output")?;
        let mut lines = BufReader::new(output).split(b'\n');

        while let Some(bytes) = lines
            .next_segment()
            .await
            .context("failed to read command output")?
        {
            let line = String::from_utf8_lossy(&bytes);
            self.publish_line(line.trim());
        }

        child.wait().await.context("failed to wait for command")
    }

    fn publish_line(&self, line: impl Into<String>) {
        let line = line.into();
        trace!("command_output: {line}");
        self.publish(DashboardEvent::command_output(line));
    }

    fn publish(&self, event: DashboardEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("no observers for command event");
        }
    }
}
