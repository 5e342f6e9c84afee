//! Host and broker sampling
//!
//! A sample takes one short measurement window: CPU usage and network
//! counters are refreshed at both ends of the window, and the broker request
//! runs concurrently inside it, so the three measurements share one delay
//! instead of stacking.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use serde_json::Value;
use sysinfo::{Disks, Networks, System};
use tracing::{debug, instrument, trace, warn};

use crate::{BrokerStatus, MetricSnapshot, config::BrokerConfig};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Samples host resource usage and the broker overview endpoint
pub struct MetricsSampler {
    host: HostCounters,
    client: reqwest::Client,
    broker: BrokerConfig,
    window: Duration,
}

struct HostCounters {
    system: System,
    networks: Networks,
    disks: Disks,
}

#[derive(Debug)]
struct HostFigures {
    cpu_percent: f32,
    ram_percent: f32,
    ram_used_gb: f64,
    ram_total_gb: f64,
    disk_percent: f32,
    disk_used_gb: f64,
    disk_total_gb: f64,
    net_in_kbs: f64,
    net_out_kbs: f64,
}

impl MetricsSampler {
    pub fn new(broker: BrokerConfig, window: Duration) -> Self {
        Self {
            host: HostCounters {
                system: System::new(),
                networks: Networks::new_with_refreshed_list(),
                disks: Disks::new_with_refreshed_list(),
            },
            client: reqwest::Client::new(),
            broker,
            window,
        }
    }

    /// Take one snapshot.
    ///
    /// Never fails: host errors yield zeroed host figures, broker errors are
    /// carried in the [`BrokerStatus`] variant.
    #[instrument(skip(self))]
    pub async fn sample(&mut self) -> MetricSnapshot {
        let (host, broker) = tokio::join!(
            self.host.measure(self.window),
            fetch_broker_status(&self.client, &self.broker)
        );

        match host {
            Ok(figures) => MetricSnapshot {
                cpu_percent: figures.cpu_percent,
                ram_percent: figures.ram_percent,
                ram_used_gb: figures.ram_used_gb,
                ram_total_gb: figures.ram_total_gb,
                disk_percent: figures.disk_percent,
                disk_used_gb: figures.disk_used_gb,
                disk_total_gb: figures.disk_total_gb,
                net_in_kbs: figures.net_in_kbs,
                net_out_kbs: figures.net_out_kbs,
                broker,
            },
            Err(e) => {
                warn!("host sampling failed: {e:#}");
                MetricSnapshot::zeroed(broker)
            }
        }
    }
}

impl HostCounters {
    async fn measure(&mut self, window: Duration) -> Result<HostFigures> {
        self.system.refresh_cpu_usage();
        self.networks.refresh(true);
        let (received_before, sent_before) = self.network_totals();
        let started = Instant::now();

        tokio::time::sleep(window).await;

        self.system.refresh_cpu_usage();
        self.networks.refresh(true);
        let (received_after, sent_after) = self.network_totals();
        let elapsed = started.elapsed().as_secs_f64().max(0.001);

        self.system.refresh_memory();
        let total_memory = self.system.total_memory();
        if total_memory == 0 {
            bail!("memory totals unavailable");
        }
        let used_memory = self.system.used_memory();

        self.disks.refresh(true);
        let (disk_used, disk_total) = self
            .disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == Path::new("/"))
            .map(|disk| {
                let total = disk.total_space();
                (total.saturating_sub(disk.available_space()), total)
            })
            .unwrap_or_else(|| {
                trace!("no filesystem mounted at /");
                (0, 0)
            });

        Ok(HostFigures {
            cpu_percent: self.system.global_cpu_usage(),
            ram_percent: percent(used_memory, total_memory),
            ram_used_gb: gigabytes(used_memory),
            ram_total_gb: gigabytes(total_memory),
            disk_percent: percent(disk_used, disk_total),
            disk_used_gb: gigabytes(disk_used),
            disk_total_gb: gigabytes(disk_total),
            net_in_kbs: rate_kbs(received_before, received_after, elapsed),
            net_out_kbs: rate_kbs(sent_before, sent_after, elapsed),
        })
    }

    fn network_totals(&self) -> (u64, u64) {
        self.networks
            .list()
            .iter()
            .fold((0, 0), |(received, sent), (_, data)| {
                (
                    received + data.total_received(),
                    sent + data.total_transmitted(),
                )
            })
    }
}

fn percent(part: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    ((part as f64 / total as f64) * 100.0) as f32
}

fn gigabytes(bytes: u64) -> f64 {
    ((bytes as f64 / BYTES_PER_GB) * 100.0).round() / 100.0
}

fn rate_kbs(before: u64, after: u64, elapsed_secs: f64) -> f64 {
    after.saturating_sub(before) as f64 / elapsed_secs / 1024.0
}

/// Query the broker overview endpoint.
///
/// Bounded by the configured timeout; every outcome maps to a [`BrokerStatus`].
#[instrument(skip_all, fields(url = %config.url))]
pub async fn fetch_broker_status(client: &reqwest::Client, config: &BrokerConfig) -> BrokerStatus {
    let response = client
        .get(&config.url)
        .basic_auth(&config.username, Some(&config.password))
        .timeout(config.timeout())
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            let reason = if e.is_timeout() {
                format!("timed out after {} ms", config.timeout_ms)
            } else {
                e.to_string()
            };
            debug!("broker unreachable: {reason}");
            return BrokerStatus::Offline { reason };
        }
    };

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        debug!("broker answered with {status}");
        return BrokerStatus::Error {
            http_code: status.as_u16(),
        };
    }

    let overview = match response.json::<Value>().await {
        Ok(overview) => overview,
        Err(e) if e.is_timeout() || e.is_body() => {
            return BrokerStatus::Offline {
                reason: e.to_string(),
            };
        }
        Err(e) => {
            debug!("broker overview is not valid JSON: {e}");
            Value::Null
        }
    };

    online_from_overview(&overview)
}

fn online_from_overview(overview: &Value) -> BrokerStatus {
    let queue_count = |field: &str| {
        overview["queue_totals"][field]
            .as_u64()
            .unwrap_or_default()
    };
    let rate = |field: &str| {
        overview["message_stats"][field]["rate"]
            .as_f64()
            .unwrap_or_default()
    };

    BrokerStatus::Online {
        messages_ready: queue_count("messages_ready"),
        messages_unacked: queue_count("messages_unacknowledged"),
        messages_total: queue_count("messages"),
        publish_rate: rate("publish_details"),
        deliver_rate: rate("deliver_get_details"),
    }
}
