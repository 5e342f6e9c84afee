//! Message types for actor communication
//!
//! ## Design Principles
//!
//! 1. **Events**: [`DashboardEvent`] is broadcast to every connected observer
//! 2. **Commands**: [`MonitorCommand`] is sent to the monitor actor via mpsc
//! 3. **Requests**: [`ClientMessage`] is what observers send back

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::{ConnectorInfo, ContainerInfo, GroupStatus, MetricSnapshot};

/// Event published to all observers
///
/// Serialises as `{"event": "<name>", "data": <payload>}`. The broadcast
/// channel may drop events for slow subscribers; every event kind is either
/// refreshed on the next cadence or only meaningful live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum DashboardEvent {
    SystemStats(MetricSnapshot),
    StatusUpdate(GroupStatus),
    ContainerList(Vec<ContainerInfo>),
    KnownConnectors(Vec<ConnectorInfo>),
    CommandOutput { line: String },
}

impl DashboardEvent {
    pub fn command_output(line: impl Into<String>) -> Self {
        DashboardEvent::CommandOutput { line: line.into() }
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            DashboardEvent::SystemStats(_) => "system_stats",
            DashboardEvent::StatusUpdate(_) => "status_update",
            DashboardEvent::ContainerList(_) => "container_list",
            DashboardEvent::KnownConnectors(_) => "known_connectors",
            DashboardEvent::CommandOutput { .. } => "command_output",
        }
    }
}

/// Start/stop request for one group
///
/// Fields are kept as raw strings so that invalid values reach validation
/// and produce an error line instead of a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub action: Option<String>,

    #[serde(default)]
    pub target_name: Option<String>,
}

/// Messages sent by observers over the stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    DockerAction(ActionRequest),
}

/// Commands that can be sent to the MonitorActor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Sample and publish stats plus group status right away
    ///
    /// History is not touched. The response is sent once every event of the
    /// tick has been published.
    TickNow { respond_to: oneshot::Sender<()> },
}
