//! Compose group discovery and status probing
//!
//! Group identity comes from the filesystem: the core group is a fixed
//! directory, connector groups are the subdirectories of the connectors root
//! that hold a compose descriptor. The set is rescanned on every call rather
//! than cached.
//!
//! Every probe collapses failures (missing directory, missing binary, non-zero
//! exit, timeout) into [`GroupState::Stopped`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures::future::join_all;
use tokio::process::Command;
use tracing::{debug, instrument, trace, warn};

use crate::{ComponentGroup, ContainerInfo, GroupKind, GroupState, GroupStatus, config::Config};

/// Descriptor file names recognised in a group directory, in lookup order
pub const DESCRIPTOR_FILE_NAMES: [&str; 2] = ["docker-compose.yml", "docker-compose.yaml"];

/// Field separator used in the container listing format
const CONTAINER_FIELD_SEPARATOR: char = '|';

const CONTAINER_LIST_FORMAT: &str =
    "{{.ID}}|{{.Names}}|{{.Image}}|{{.Status}}|{{.RunningFor}}";

#[derive(Debug, Clone)]
pub struct GroupStatusProber {
    docker_binary: String,
    core_dir: PathBuf,
    connectors_dir: PathBuf,
    probe_timeout: Duration,
}

impl GroupStatusProber {
    pub fn new(
        docker_binary: impl Into<String>,
        core_dir: impl Into<PathBuf>,
        connectors_dir: impl Into<PathBuf>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            docker_binary: docker_binary.into(),
            core_dir: core_dir.into(),
            connectors_dir: connectors_dir.into(),
            probe_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.docker_binary.clone(),
            config.core_dir.clone(),
            config.connectors_dir.clone(),
            config.monitor.probe_timeout(),
        )
    }

    pub fn docker_binary(&self) -> &str {
        &self.docker_binary
    }

    pub fn core_group(&self) -> ComponentGroup {
        let mut group = ComponentGroup::core(self.core_dir.clone());
        group.has_config = find_descriptor(&self.core_dir).is_some();
        group
    }

    /// Group for a connector name. The name must already be validated.
    pub fn connector_group(&self, name: &str) -> ComponentGroup {
        let path = self.connectors_dir.join(name);
        ComponentGroup {
            kind: GroupKind::Connector,
            name: name.to_string(),
            has_config: find_descriptor(&path).is_some(),
            path,
        }
    }

    /// Whether any service of the compose project in `path` is running.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn probe_group(&self, path: &Path) -> GroupState {
        if !path.exists() {
            trace!("group directory does not exist");
            return GroupState::Stopped;
        }

        let output = self
            .run_bounded(
                &["compose", "ps", "--services", "--filter", "status=running"],
                Some(path),
            )
            .await;

        match output {
            Ok(stdout) if !stdout.trim().is_empty() => GroupState::Running,
            Ok(_) => GroupState::Stopped,
            Err(e) => {
                debug!("status probe failed: {e:#}");
                GroupState::Stopped
            }
        }
    }

    /// Connector groups found under the connectors root, in no particular order.
    pub fn discover_connectors(&self) -> Vec<ComponentGroup> {
        let entries = match std::fs::read_dir(&self.connectors_dir) {
            Ok(entries) => entries,
            Err(e) => {
                trace!(
                    "cannot scan connectors directory {}: {e}",
                    self.connectors_dir.display()
                );
                return vec![];
            }
        };

        entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    warn!("error while scanning connectors: {e}");
                    None
                }
            })
            .filter(|path| path.is_dir() && find_descriptor(path).is_some())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_string();
                Some(ComponentGroup {
                    kind: GroupKind::Connector,
                    name,
                    path,
                    has_config: true,
                })
            })
            .collect()
    }

    /// Probe the core group and every discovered connector.
    pub async fn full_status_update(&self) -> GroupStatus {
        let mut groups = vec![self.core_group()];
        groups.extend(self.discover_connectors());

        let states = join_all(groups.iter().map(|group| self.probe_group(&group.path))).await;

        groups
            .iter()
            .map(ComponentGroup::status_key)
            .zip(states)
            .collect()
    }

    /// All running containers on the host, regardless of group.
    pub async fn list_running_containers(&self) -> Vec<ContainerInfo> {
        match self
            .run_bounded(&["ps", "--format", CONTAINER_LIST_FORMAT], None)
            .await
        {
            Ok(stdout) => parse_container_list(&stdout),
            Err(e) => {
                debug!("container listing failed: {e:#}");
                vec![]
            }
        }
    }

    async fn run_bounded(&self, args: &[&str], cwd: Option<&Path>) -> Result<String> {
        let mut command = Command::new(&self.docker_binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }

        let output = tokio::time::timeout(self.probe_timeout, command.output())
            .await
            .with_context(|| format!("timed out after {:?}", self.probe_timeout))?
            .with_context(|| format!("failed to run {}", self.docker_binary))?;

        if !output.status.success() {
            bail!("{} exited with {}", self.docker_binary, output.status);
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Path of the descriptor inside `dir`, if any.
pub fn find_descriptor(dir: &Path) -> Option<PathBuf> {
    DESCRIPTOR_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Parse `ID|Names|Image|Status|RunningFor` lines; short lines are skipped.
pub fn parse_container_list(output: &str) -> Vec<ContainerInfo> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.trim().splitn(5, CONTAINER_FIELD_SEPARATOR);
            let id = fields.next()?.trim();
            let name = fields.next()?.trim();
            let image = fields.next()?.trim();
            let status_text = fields.next()?.trim();
            let uptime_text = fields.next()?.trim();

            if id.is_empty() || name.is_empty() {
                return None;
            }

            Some(ContainerInfo {
                id: id.to_string(),
                name: name.to_string(),
                image: image.to_string(),
                status_text: status_text.to_string(),
                uptime_text: uptime_text.to_string(),
            })
        })
        .collect()
}
