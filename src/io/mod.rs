//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `device` - lidar source backends (serial protocol, JSONL replay)
//! - `scan_monitor` - device polling task feeding the pipeline
//! - `egress_channel` - typed channel for MQTT egress messages
//! - `mqtt_egress` - MQTT publisher for touch frames, status and metrics

pub mod device;
pub mod egress_channel;
pub mod mqtt_egress;
pub mod scan_monitor;

// Re-export commonly used types
pub use device::{create_source, LidarSource, ReplayLidar, SerialLidar};
pub use egress_channel::{
    create_egress_channel, EgressSender, StatusPayload, TouchFramePayload,
};
pub use mqtt_egress::MqttPublisher;
pub use scan_monitor::ScanMonitor;
