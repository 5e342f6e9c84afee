//! API shared state

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{
    actors::{executor::CommandExecutor, messages::DashboardEvent, monitor::MonitorSupervisor},
    config::Config,
    monitors::GroupStatusProber,
    storage::HistoryStore,
};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Starts the monitor loop on first connection
    pub supervisor: Arc<MonitorSupervisor>,

    /// Broadcast sender for dashboard events (WebSocket streaming)
    pub event_tx: broadcast::Sender<DashboardEvent>,

    pub prober: GroupStatusProber,

    pub executor: CommandExecutor,

    pub history: HistoryStore,
}

impl ApiState {
    /// Wire up the core components from a configuration
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let prober = GroupStatusProber::from_config(&config);

        Self {
            supervisor: Arc::new(MonitorSupervisor::new(
                config.clone(),
                prober.clone(),
                event_tx.clone(),
            )),
            executor: CommandExecutor::new(prober.clone(), event_tx.clone()),
            history: HistoryStore::new(config.history_file.clone(), config.max_history_points),
            event_tx,
            prober,
        }
    }
}
