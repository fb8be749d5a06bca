//! lidar-touch - turns RPLIDAR scans into screen-space touch points
//!
//! A spinning lidar mounted at a wall or table edge sees hands as clusters
//! of close-range samples. Each revolution is cropped to the interaction
//! area, clustered into blobs, and projected to screen pixels; the touch
//! frames stream out over MQTT.
//!
//! Module structure:
//! - `domain/` - Core types (Scan, Blob, TouchPoint, geometry)
//! - `io/` - External interfaces (serial lidar, replay, MQTT egress)
//! - `services/` - Processing (transform, clustering, extraction, pipeline)
//! - `infra/` - Infrastructure (Config, Metrics, Broker)

use clap::Parser;
use lidar_touch::infra::{Config, DeviceKind, Metrics};
use lidar_touch::io::{create_egress_channel, create_source, MqttPublisher, ScanMonitor};
use lidar_touch::services::TouchPipeline;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// lidar-touch - lidar-based touch surface daemon
#[derive(Parser, Debug)]
#[command(name = "lidar-touch", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for per-revolution visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = %env!("GIT_HASH"), "lidar-touch starting");

    let args = Args::parse();

    // Load configuration from TOML file (needed for broker config)
    let config = Config::load_from_path(&args.config);

    // Start embedded MQTT broker with config
    lidar_touch::infra::broker::start_embedded_broker(&config);

    let device_kind_str = match config.device_kind() {
        DeviceKind::Serial => "serial",
        DeviceKind::Replay => "replay",
    };
    let area = config.touch_area();
    info!(
        config_file = %config.config_file(),
        device = %device_kind_str,
        serial_port = %config.serial_port(),
        touch_area = %format!("({}, {})..({}, {})", area.min_x, area.min_y, area.max_x, area.max_y),
        merge_threshold_mm = %config.merge_threshold_mm(),
        screen = %format!("{}x{}", config.screen_width(), config.screen_height()),
        grace_ms = %config.grace_ms(),
        mqtt_host = %config.mqtt_host(),
        mqtt_port = %config.mqtt_port(),
        "config_loaded"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metrics = Arc::new(Metrics::new());

    // Scan channel (bounded; a full channel drops the revolution)
    let (scan_tx, scan_rx) = mpsc::channel(16);

    // Create MQTT egress channel and publisher (if enabled)
    let egress_sender = if config.mqtt_egress_enabled() {
        let (egress_sender, egress_rx) = create_egress_channel(1000, config.source_id().to_string());

        let publisher = MqttPublisher::new(&config, egress_rx);
        let publisher_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            publisher.run(publisher_shutdown).await;
        });

        // Metrics egress publisher (separate from logging)
        let metrics_egress = egress_sender.clone();
        let metrics_for_egress = metrics.clone();
        let egress_interval = config.metrics_publish_interval_secs();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(egress_interval));
            loop {
                interval.tick().await;
                let summary = metrics_for_egress.report();
                metrics_egress.send_metrics(summary);
            }
        });

        Some(egress_sender)
    } else {
        None
    };

    // Start the scan monitor polling the lidar source
    let source = create_source(&config)?;
    let mut monitor = ScanMonitor::new(&config, source, scan_tx);
    if let Some(egress) = egress_sender.clone() {
        monitor = monitor.with_egress(egress);
    }
    let monitor_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        monitor.run(monitor_shutdown).await;
    });

    // Metrics reporter (lock-free reads with full summary)
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            let summary = metrics_clone.report();
            summary.log();
        }
    });

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Run pipeline - consumes scans until shutdown
    let mut pipeline = TouchPipeline::new(&config, metrics)?;
    pipeline.run(scan_rx, egress_sender, shutdown_rx).await;

    info!("lidar-touch shutdown complete");
    Ok(())
}
