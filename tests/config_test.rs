//! Integration tests for configuration loading

use lidar_touch::infra::{Config, DeviceKind};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[source]
id = "wall-7"

[device]
kind = "serial"
serial_port = "/dev/ttyUSB1"
baud = 256000
poll_interval_ms = 25

[touch_area]
left = -1000.0
bottom = -500.0
right = 1000.0
top = 500.0

[tracking]
merge_threshold_mm = 80.0
angle_offset_deg = 90.0
filter_to_region = false

[screen]
width = 3840
height = 2160

[staleness]
grace_ms = 250

[mqtt]
host = "test-host"
port = 1884

[mqtt_egress]
enabled = true
touches_topic = "wall/touches"
metrics_publish_interval_secs = 2

[broker]
bind_address = "127.0.0.1"
port = 1884

[metrics]
interval_secs = 15
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.source_id(), "wall-7");
    assert_eq!(config.device_kind(), &DeviceKind::Serial);
    assert_eq!(config.serial_port(), "/dev/ttyUSB1");
    assert_eq!(config.baud(), 256000);
    assert_eq!(config.poll_interval_ms(), 25);

    let area = config.touch_area();
    assert_eq!(area.min_x, -1000.0);
    assert_eq!(area.min_y, -500.0);
    assert_eq!(area.max_x, 1000.0);
    assert_eq!(area.max_y, 500.0);

    assert_eq!(config.merge_threshold_mm(), 80.0);
    assert_eq!(config.angle_offset_deg(), 90.0);
    assert!(!config.filter_to_region());
    assert_eq!(config.screen_width(), 3840);
    assert_eq!(config.screen_height(), 2160);
    assert_eq!(config.grace_ms(), 250);
    assert_eq!(config.mqtt_host(), "test-host");
    assert_eq!(config.mqtt_port(), 1884);
    assert_eq!(config.touches_topic(), "wall/touches");
    assert_eq!(config.metrics_publish_interval_secs(), 2);
    assert_eq!(config.broker_bind_address(), "127.0.0.1");
    assert_eq!(config.broker_port(), 1884);
    assert_eq!(config.metrics_interval_secs(), 15);
}

#[test]
fn test_missing_sections_use_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();

    // Only the mandatory device section; everything else defaulted
    let config_content = r#"
[device]
kind = "replay"
replay_file = "scans.jsonl"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.device_kind(), &DeviceKind::Replay);
    assert_eq!(config.replay_file(), Some("scans.jsonl"));
    assert_eq!(config.source_id(), "lidar-touch");
    assert_eq!(config.merge_threshold_mm(), 50.0);
    assert!(config.filter_to_region());
    assert_eq!(config.screen_width(), 1920);
    assert_eq!(config.screen_height(), 1080);
    assert_eq!(config.grace_ms(), 1000);
    assert_eq!(config.touches_topic(), "lidartouch/touches");

    let area = config.touch_area();
    assert_eq!(area.min_x, -750.0);
    assert_eq!(area.max_y, 600.0);
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.mqtt_host(), "localhost");
    assert_eq!(config.mqtt_port(), 1883);
    assert_eq!(config.device_kind(), &DeviceKind::Serial);
    assert_eq!(config.grace_ms(), 1000);
}

#[test]
fn test_invalid_toml_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[device\nkind = ").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}
