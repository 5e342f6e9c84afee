//! Actor-based monitoring core
//!
//! Each actor runs as an independent async task and communicates via Tokio
//! channels.
//!
//! ## Architecture Overview
//!
//! ```text
//!   client connects ──► MonitorSupervisor::ensure_started (once)
//!                                │ spawns
//!                        ┌───────▼────────┐
//!                        │  MonitorActor  │ ticks every 2s
//!                        └───────┬────────┘
//!                                │ system_stats / status_update /
//!                                │ container_list / known_connectors
//!                     ┌──────────▼──────────┐
//!                     │  Broadcast Channel  │◄──── command_output, status_update
//!                     └──────────┬──────────┘            │
//!                                │ subscribe      ┌──────┴──────────┐
//!                        ┌───────▼───────┐        │ CommandExecutor │ one task per
//!                        │   observers   │───────►│   (compose)     │ docker_action
//!                        └───────────────┘        └─────────────────┘
//! ```
//!
//! ## Actor Types
//!
//! - **MonitorActor**: samples metrics, probes groups, records history
//! - **CommandExecutor**: runs one `compose up`/`compose down` and streams its output

pub mod executor;
pub mod messages;
pub mod monitor;
