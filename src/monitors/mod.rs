//! Leaf samplers used by the monitor loop
//!
//! - [`sampler`]: host CPU/RAM/disk/network figures and the broker overview
//! - [`compose`]: compose group discovery, status probes and the container list

pub mod compose;
pub mod sampler;

pub use compose::GroupStatusProber;
pub use sampler::MetricsSampler;
