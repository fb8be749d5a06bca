//! Infrastructure: configuration, metrics, and the embedded broker.

pub mod broker;
pub mod config;
pub mod metrics;

pub use config::{Config, DeviceKind};
pub use metrics::Metrics;
