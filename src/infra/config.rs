//! Configuration loading from TOML files
//!
//! The binary selects the file via `--config <path>` (default:
//! config/dev.toml); a missing or unparsable file falls back to defaults
//! with a warning. Default calibration: a 1.5 x 1.2 m touch area, 50 mm
//! merge threshold, 1080p target screen.

use crate::domain::geometry::CropArea;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// RPLIDAR-style serial device
    Serial,
    /// JSONL scan replay file (development and tests)
    Replay,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Identifier stamped on every egress payload
    #[serde(default = "default_source_id")]
    pub id: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { id: default_source_id() }
    }
}

fn default_source_id() -> String {
    "lidar-touch".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub kind: DeviceKind,
    #[serde(default = "default_serial_port")]
    pub serial_port: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    #[serde(default)]
    pub replay_file: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_serial_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud() -> u32 {
    115200
}

fn default_poll_interval_ms() -> u64 {
    50
}

/// Active sensing rectangle in sensor-plane millimeters
#[derive(Debug, Clone, Deserialize)]
pub struct TouchAreaConfig {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl Default for TouchAreaConfig {
    fn default() -> Self {
        Self { left: -750.0, bottom: -600.0, right: 750.0, top: 600.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Blobs with a bounding-box gap below this merge into one cluster
    #[serde(default = "default_merge_threshold_mm")]
    pub merge_threshold_mm: f32,
    /// Mounting calibration added to every sample bearing
    #[serde(default)]
    pub angle_offset_deg: f32,
    /// Drop points outside the touch area before clustering
    #[serde(default = "default_filter_to_region")]
    pub filter_to_region: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            merge_threshold_mm: default_merge_threshold_mm(),
            angle_offset_deg: 0.0,
            filter_to_region: default_filter_to_region(),
        }
    }
}

fn default_merge_threshold_mm() -> f32 {
    50.0
}

fn default_filter_to_region() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScreenConfig {
    #[serde(default = "default_screen_width")]
    pub width: u32,
    #[serde(default = "default_screen_height")]
    pub height: u32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self { width: default_screen_width(), height: default_screen_height() }
    }
}

fn default_screen_width() -> u32 {
    1920
}

fn default_screen_height() -> u32 {
    1080
}

#[derive(Debug, Clone, Deserialize)]
pub struct StalenessConfig {
    /// How long the last touch-point list is kept when no scan arrives.
    /// Zero clears immediately on the first scanless cycle.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self { grace_ms: default_grace_ms() }
    }
}

fn default_grace_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self { host: default_mqtt_host(), port: default_mqtt_port(), username: None, password: None }
    }
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttEgressConfig {
    #[serde(default = "default_mqtt_egress_enabled")]
    pub enabled: bool,
    /// Topic for per-cycle touch frames (QoS 0)
    #[serde(default = "default_touches_topic")]
    pub touches_topic: String,
    /// Topic for device status transitions (QoS 1)
    #[serde(default = "default_status_topic")]
    pub status_topic: String,
    /// Topic for periodic metrics snapshots (QoS 0)
    #[serde(default = "default_metrics_topic")]
    pub metrics_topic: String,
    /// Interval for publishing metrics (seconds)
    #[serde(default = "default_metrics_publish_interval")]
    pub metrics_publish_interval_secs: u64,
}

impl Default for MqttEgressConfig {
    fn default() -> Self {
        Self {
            enabled: default_mqtt_egress_enabled(),
            touches_topic: default_touches_topic(),
            status_topic: default_status_topic(),
            metrics_topic: default_metrics_topic(),
            metrics_publish_interval_secs: default_metrics_publish_interval(),
        }
    }
}

fn default_mqtt_egress_enabled() -> bool {
    true
}

fn default_touches_topic() -> String {
    "lidartouch/touches".to_string()
}

fn default_status_topic() -> String {
    "lidartouch/status".to_string()
}

fn default_metrics_topic() -> String {
    "lidartouch/metrics".to_string()
}

fn default_metrics_publish_interval() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self { bind_address: default_broker_bind_address(), port: default_broker_port() }
    }
}

fn default_broker_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_broker_port() -> u16 {
    1883
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub source: SourceConfig,
    pub device: DeviceConfig,
    #[serde(default)]
    pub touch_area: TouchAreaConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub screen: ScreenConfig,
    #[serde(default)]
    pub staleness: StalenessConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub mqtt_egress: MqttEgressConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    source_id: String,
    device_kind: DeviceKind,
    serial_port: String,
    baud: u32,
    replay_file: Option<String>,
    poll_interval_ms: u64,
    touch_area: CropArea,
    merge_threshold_mm: f32,
    angle_offset_deg: f32,
    filter_to_region: bool,
    screen_width: u32,
    screen_height: u32,
    grace_ms: u64,
    mqtt_host: String,
    mqtt_port: u16,
    mqtt_username: Option<String>,
    mqtt_password: Option<String>,
    mqtt_egress_enabled: bool,
    touches_topic: String,
    status_topic: String,
    metrics_topic: String,
    metrics_publish_interval_secs: u64,
    broker_bind_address: String,
    broker_port: u16,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_id: default_source_id(),
            device_kind: DeviceKind::Serial,
            serial_port: default_serial_port(),
            baud: default_baud(),
            replay_file: None,
            poll_interval_ms: default_poll_interval_ms(),
            touch_area: CropArea::new(-750.0, -600.0, 750.0, 600.0),
            merge_threshold_mm: default_merge_threshold_mm(),
            angle_offset_deg: 0.0,
            filter_to_region: default_filter_to_region(),
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
            grace_ms: default_grace_ms(),
            mqtt_host: default_mqtt_host(),
            mqtt_port: default_mqtt_port(),
            mqtt_username: None,
            mqtt_password: None,
            mqtt_egress_enabled: default_mqtt_egress_enabled(),
            touches_topic: default_touches_topic(),
            status_topic: default_status_topic(),
            metrics_topic: default_metrics_topic(),
            metrics_publish_interval_secs: default_metrics_publish_interval(),
            broker_bind_address: default_broker_bind_address(),
            broker_port: default_broker_port(),
            metrics_interval_secs: default_metrics_interval(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let area = &toml_config.touch_area;
        Ok(Self {
            source_id: toml_config.source.id,
            device_kind: toml_config.device.kind,
            serial_port: toml_config.device.serial_port,
            baud: toml_config.device.baud,
            replay_file: toml_config.device.replay_file,
            poll_interval_ms: toml_config.device.poll_interval_ms,
            touch_area: CropArea::new(area.left, area.bottom, area.right, area.top),
            merge_threshold_mm: toml_config.tracking.merge_threshold_mm,
            angle_offset_deg: toml_config.tracking.angle_offset_deg,
            filter_to_region: toml_config.tracking.filter_to_region,
            screen_width: toml_config.screen.width,
            screen_height: toml_config.screen.height,
            grace_ms: toml_config.staleness.grace_ms,
            mqtt_host: toml_config.mqtt.host,
            mqtt_port: toml_config.mqtt.port,
            mqtt_username: toml_config.mqtt.username,
            mqtt_password: toml_config.mqtt.password,
            mqtt_egress_enabled: toml_config.mqtt_egress.enabled,
            touches_topic: toml_config.mqtt_egress.touches_topic,
            status_topic: toml_config.mqtt_egress.status_topic,
            metrics_topic: toml_config.mqtt_egress.metrics_topic,
            metrics_publish_interval_secs: toml_config.mqtt_egress.metrics_publish_interval_secs,
            broker_bind_address: toml_config.broker.bind_address,
            broker_port: toml_config.broker.port,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn device_kind(&self) -> &DeviceKind {
        &self.device_kind
    }

    pub fn serial_port(&self) -> &str {
        &self.serial_port
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    pub fn replay_file(&self) -> Option<&str> {
        self.replay_file.as_deref()
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    pub fn touch_area(&self) -> CropArea {
        self.touch_area
    }

    pub fn merge_threshold_mm(&self) -> f32 {
        self.merge_threshold_mm
    }

    pub fn angle_offset_deg(&self) -> f32 {
        self.angle_offset_deg
    }

    pub fn filter_to_region(&self) -> bool {
        self.filter_to_region
    }

    pub fn screen_width(&self) -> u32 {
        self.screen_width
    }

    pub fn screen_height(&self) -> u32 {
        self.screen_height
    }

    pub fn grace_ms(&self) -> u64 {
        self.grace_ms
    }

    pub fn mqtt_host(&self) -> &str {
        &self.mqtt_host
    }

    pub fn mqtt_port(&self) -> u16 {
        self.mqtt_port
    }

    pub fn mqtt_username(&self) -> Option<&str> {
        self.mqtt_username.as_deref()
    }

    pub fn mqtt_password(&self) -> Option<&str> {
        self.mqtt_password.as_deref()
    }

    pub fn mqtt_egress_enabled(&self) -> bool {
        self.mqtt_egress_enabled
    }

    pub fn touches_topic(&self) -> &str {
        &self.touches_topic
    }

    pub fn status_topic(&self) -> &str {
        &self.status_topic
    }

    pub fn metrics_topic(&self) -> &str {
        &self.metrics_topic
    }

    pub fn metrics_publish_interval_secs(&self) -> u64 {
        self.metrics_publish_interval_secs
    }

    pub fn broker_bind_address(&self) -> &str {
        &self.broker_bind_address
    }

    pub fn broker_port(&self) -> u16 {
        self.broker_port
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set the staleness grace period
    #[cfg(test)]
    pub fn with_grace_ms(mut self, ms: u64) -> Self {
        self.grace_ms = ms;
        self
    }

    /// Builder method for tests to set the touch area
    #[cfg(test)]
    pub fn with_touch_area(mut self, area: CropArea) -> Self {
        self.touch_area = area;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source_id(), "lidar-touch");
        assert_eq!(config.device_kind(), &DeviceKind::Serial);
        assert_eq!(config.baud(), 115200);
        assert_eq!(config.merge_threshold_mm(), 50.0);
        assert_eq!(config.angle_offset_deg(), 0.0);
        assert!(config.filter_to_region());
        assert_eq!(config.screen_width(), 1920);
        assert_eq!(config.screen_height(), 1080);
        assert_eq!(config.grace_ms(), 1000);
    }

    #[test]
    fn test_default_touch_area() {
        let area = Config::default().touch_area();
        assert_eq!(area.min_x, -750.0);
        assert_eq!(area.min_y, -600.0);
        assert_eq!(area.max_x, 750.0);
        assert_eq!(area.max_y, 600.0);
    }

    #[test]
    fn test_grace_builder() {
        let config = Config::default().with_grace_ms(0);
        assert_eq!(config.grace_ms(), 0);
    }
}
