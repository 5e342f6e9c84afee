//! MonitorActor - the process-wide sampling and broadcast loop
//!
//! ## Tick schedule
//!
//! ```text
//! every tick             → sample → system_stats
//! every `status_every`   → status_update → container_list → known_connectors
//! every `history_every`  → append snapshot of this tick to history
//! ```
//!
//! The steps of one tick always run in this order, so a history point always
//! carries the metrics sampled in the same tick.
//!
//! ## Lifecycle
//!
//! The loop is started lazily by [`MonitorSupervisor::ensure_started`] on the
//! first client connection and then runs until the process exits. There is
//! no shutdown command.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, trace, warn};

use super::messages::{DashboardEvent, MonitorCommand};
use crate::{
    ConnectorInfo, HistoryPoint, MetricSnapshot,
    config::{Config, MonitorConfig},
    monitors::{GroupStatusProber, MetricsSampler},
    storage::HistoryStore,
};

/// Optional steps of one tick; stats are published on every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlan {
    /// status_update, container_list and known_connectors
    pub groups: bool,

    /// append the snapshot of this tick to the history
    pub history: bool,
}

impl TickPlan {
    pub fn for_tick(tick: u64, cadence: &MonitorConfig) -> Self {
        Self {
            groups: tick % cadence.status_every.max(1) == 0,
            history: tick > 0 && tick % cadence.history_every.max(1) == 0,
        }
    }
}

pub struct MonitorActor {
    sampler: MetricsSampler,

    prober: GroupStatusProber,

    history: HistoryStore,

    cadence: MonitorConfig,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<MonitorCommand>,

    /// Broadcast sender shared with every observer
    event_tx: broadcast::Sender<DashboardEvent>,

    /// Number of ticks completed so far
    tick: u64,
}

impl MonitorActor {
    pub fn new(
        config: &Config,
        prober: GroupStatusProber,
        command_rx: mpsc::Receiver<MonitorCommand>,
        event_tx: broadcast::Sender<DashboardEvent>,
    ) -> Self {
        Self {
            sampler: MetricsSampler::new(config.broker.clone(), config.monitor.sample_window()),
            prober,
            history: HistoryStore::new(config.history_file.clone(), config.max_history_points),
            cadence: config.monitor.clone(),
            command_rx,
            event_tx,
            tick: 0,
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs forever. Losing every handle only stops command handling; the
    /// periodic ticks continue.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting monitor actor");

        let mut ticker = interval(self.cadence.tick());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.on_tick().await;
                }

                cmd = self.command_rx.recv(), if commands_open => {
                    match cmd {
                        Some(MonitorCommand::TickNow { respond_to }) => {
                            debug!("received TickNow command");
                            self.publish_stats().await;
                            self.publish_groups().await;
                            let _ = respond_to.send(());
                        }
                        None => {
                            warn!("command channel closed, continuing without commands");
                            commands_open = false;
                        }
                    }
                }
            }
        }
    }

    async fn on_tick(&mut self) {
        let tick = self.tick;
        trace!("tick {tick}");

        let plan = TickPlan::for_tick(tick, &self.cadence);
        let snapshot = self.publish_stats().await;

        if plan.groups {
            self.publish_groups().await;
        }

        if plan.history {
            self.record_history(&snapshot).await;
        }

        self.tick = tick.wrapping_add(1);
    }

    async fn publish_stats(&mut self) -> MetricSnapshot {
        let snapshot = self.sampler.sample().await;
        self.publish(DashboardEvent::SystemStats(snapshot.clone()));
        snapshot
    }

    async fn publish_groups(&self) {
        let status = self.prober.full_status_update().await;
        self.publish(DashboardEvent::StatusUpdate(status));

        let containers = self.prober.list_running_containers().await;
        self.publish(DashboardEvent::ContainerList(containers));

        self.publish(DashboardEvent::KnownConnectors(known_connectors(
            &self.prober,
        )));
    }

    async fn record_history(&self, snapshot: &MetricSnapshot) {
        let point = HistoryPoint::from_snapshot(snapshot, Utc::now());
        let store = self.history.clone();

        if let Err(e) = tokio::task::spawn_blocking(move || store.append(point)).await {
            error!("history append task failed: {e}");
        }
    }

    fn publish(&self, event: DashboardEvent) {
        let name = event.name();
        match self.event_tx.send(event) {
            Ok(num_receivers) => trace!("published {name} to {num_receivers} receivers"),
            Err(_) => trace!("no receivers for {name} (this is OK)"),
        }
    }
}

/// Discovered connectors sorted by name, as shown to observers.
pub fn known_connectors(prober: &GroupStatusProber) -> Vec<ConnectorInfo> {
    let mut connectors: Vec<ConnectorInfo> = prober
        .discover_connectors()
        .iter()
        .map(ConnectorInfo::from)
        .collect();
    connectors.sort_by(|a, b| a.name.cmp(&b.name));
    connectors
}

/// Handle for controlling a MonitorActor
#[derive(Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorCommand>,
}

impl MonitorHandle {
    /// Spawn a new monitor actor
    pub fn spawn(
        config: &Config,
        prober: GroupStatusProber,
        event_tx: broadcast::Sender<DashboardEvent>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let actor = MonitorActor::new(config, prober, cmd_rx, event_tx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Publish stats and group status immediately
    pub async fn tick_now(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::TickNow { respond_to: tx })
            .await
            .context("failed to send TickNow command")?;

        rx.await.context("failed to receive response")?;
        Ok(())
    }
}

/// Owns the "is the loop running" state
///
/// Created once at process start; [`ensure_started`](Self::ensure_started) is
/// called on every client connection and starts the loop at most once.
pub struct MonitorSupervisor {
    config: Arc<Config>,
    prober: GroupStatusProber,
    event_tx: broadcast::Sender<DashboardEvent>,
    handle: Mutex<Option<MonitorHandle>>,
}

impl MonitorSupervisor {
    pub fn new(
        config: Arc<Config>,
        prober: GroupStatusProber,
        event_tx: broadcast::Sender<DashboardEvent>,
    ) -> Self {
        Self {
            config,
            prober,
            event_tx,
            handle: Mutex::new(None),
        }
    }

    /// Start the loop unless it already runs. Returns `true` if this call started it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn ensure_started(&self) -> bool {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if handle.is_some() {
            return false;
        }

        *handle = Some(MonitorHandle::spawn(
            &self.config,
            self.prober.clone(),
            self.event_tx.clone(),
        ));
        info!("monitor loop started");
        true
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn handle(&self) -> Option<MonitorHandle> {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
