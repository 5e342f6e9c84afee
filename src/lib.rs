pub mod actors;
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod monitors;
pub mod storage;
pub mod util;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One host + broker sample, produced once per monitor tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MetricSnapshot {
    pub cpu_percent: f32,
    pub ram_percent: f32,
    pub ram_used_gb: f64,
    pub ram_total_gb: f64,
    pub disk_percent: f32,
    pub disk_used_gb: f64,
    pub disk_total_gb: f64,
    pub net_in_kbs: f64,
    pub net_out_kbs: f64,
    #[serde(flatten)]
    pub broker: BrokerStatus,
}

impl MetricSnapshot {
    /// All host figures zeroed, keeping whatever broker status was obtained.
    pub fn zeroed(broker: BrokerStatus) -> Self {
        Self {
            broker,
            ..Self::default()
        }
    }
}

/// State of the message broker as seen through its management API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mq_status", rename_all = "lowercase")]
pub enum BrokerStatus {
    Online {
        messages_ready: u64,
        messages_unacked: u64,
        messages_total: u64,
        publish_rate: f64,
        deliver_rate: f64,
    },
    Error {
        http_code: u16,
    },
    Offline {
        reason: String,
    },
}

impl Default for BrokerStatus {
    fn default() -> Self {
        BrokerStatus::Offline {
            reason: String::from("not sampled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Core,
    Connector,
}

/// A directory holding a compose descriptor that can be brought up or down as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentGroup {
    pub kind: GroupKind,
    pub name: String,
    pub path: PathBuf,
    pub has_config: bool,
}

impl ComponentGroup {
    pub fn core(path: PathBuf) -> Self {
        Self {
            kind: GroupKind::Core,
            name: String::from("core"),
            has_config: true,
            path,
        }
    }

    /// Key used in the status mapping (`core` or `connector_<name>`).
    pub fn status_key(&self) -> String {
        match self.kind {
            GroupKind::Core => String::from("core"),
            GroupKind::Connector => format!("connector_{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupState {
    Running,
    Stopped,
}

impl std::fmt::Display for GroupState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupState::Running => write!(f, "running"),
            GroupState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Status of every known group, keyed by [`ComponentGroup::status_key`].
pub type GroupStatus = BTreeMap<String, GroupState>;

/// Connector entry as shown to dashboard clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorInfo {
    pub name: String,
    pub has_config: bool,
}

impl From<&ComponentGroup> for ConnectorInfo {
    fn from(group: &ComponentGroup) -> Self {
        Self {
            name: group.name.clone(),
            has_config: group.has_config,
        }
    }
}

/// One row of the orchestration tool's global container listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status_text: String,
    pub uptime_text: String,
}

/// Compressed form of a [`MetricSnapshot`] kept in the persisted history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub cpu: f32,
    pub ram: f32,
    pub disk: f32,
    pub mq_queued: u64,
    pub mq_total: u64,
    pub mq_rate_in: f64,
    pub mq_rate_out: f64,
}

impl HistoryPoint {
    pub fn from_snapshot(snapshot: &MetricSnapshot, timestamp: DateTime<Utc>) -> Self {
        let (mq_queued, mq_total, mq_rate_in, mq_rate_out) = match snapshot.broker {
            BrokerStatus::Online {
                messages_ready,
                messages_total,
                publish_rate,
                deliver_rate,
                ..
            } => (messages_ready, messages_total, publish_rate, deliver_rate),
            _ => (0, 0, 0.0, 0.0),
        };

        Self {
            timestamp,
            cpu: snapshot.cpu_percent,
            ram: snapshot.ram_percent,
            disk: snapshot.disk_percent,
            mq_queued,
            mq_total,
            mq_rate_in,
            mq_rate_out,
        }
    }
}

/// Ordered history, oldest first.
pub type HistoryLog = Vec<HistoryPoint>;
