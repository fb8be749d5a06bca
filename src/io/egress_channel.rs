//! Typed channel for MQTT egress messages
//!
//! Provides a non-blocking way to hand frames to the MQTT publisher.
//! Uses bounded mpsc channels; touch frames are live data and are dropped
//! when the channel is full.

use crate::domain::types::{epoch_ms, TouchPoint};
use crate::infra::metrics::MetricsSummary;
use serde::Serialize;
use tokio::sync::mpsc;

/// Messages that can be sent to the MQTT publisher
#[derive(Debug)]
pub enum EgressMessage {
    /// One cycle's touch points
    TouchFrame(TouchFramePayload),
    /// Device status transition
    Status(StatusPayload),
    /// Periodic metrics snapshot
    Metrics(MetricsPayload),
}

/// A single touch point on the wire
#[derive(Debug, Clone, Serialize)]
pub struct TouchPointPayload {
    pub x: i32,
    pub y: i32,
    pub r: f32,
}

/// Payload for per-cycle touch frames
#[derive(Debug, Clone, Serialize)]
pub struct TouchFramePayload {
    /// Source identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Timestamp (epoch ms)
    pub ts: u64,
    pub points: Vec<TouchPointPayload>,
}

impl TouchFramePayload {
    pub fn from_points(points: &[TouchPoint]) -> Self {
        Self {
            source: None,
            ts: epoch_ms(),
            points: points
                .iter()
                .map(|p| TouchPointPayload { x: p.x, y: p.y, r: p.radius })
                .collect(),
        }
    }
}

/// Payload for device status transitions
#[derive(Debug, Clone, Serialize)]
pub struct StatusPayload {
    /// Source identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Timestamp (epoch ms)
    pub ts: u64,
    pub connected: bool,
    pub status: String,
}

impl StatusPayload {
    pub fn new(connected: bool, status: &str) -> Self {
        Self { source: None, ts: epoch_ms(), connected, status: status.to_string() }
    }
}

/// Payload for metrics snapshots
#[derive(Debug, Serialize)]
pub struct MetricsPayload {
    /// Source identifier
    pub source: String,
    /// Timestamp (epoch ms)
    pub ts: u64,
    #[serde(flatten)]
    pub summary: MetricsSummary,
}

/// Sender handle for egress messages
///
/// Clone this to share across multiple producers.
/// Non-blocking - if the channel is full, messages are dropped.
#[derive(Clone)]
pub struct EgressSender {
    tx: mpsc::Sender<EgressMessage>,
    source_id: String,
}

impl EgressSender {
    pub fn new(tx: mpsc::Sender<EgressMessage>, source_id: String) -> Self {
        Self { tx, source_id }
    }

    /// Send one cycle's touch frame.
    /// Injects the source id into the payload.
    pub fn send_touch_frame(&self, mut payload: TouchFramePayload) {
        payload.source = Some(self.source_id.clone());
        let _ = self.tx.try_send(EgressMessage::TouchFrame(payload));
    }

    /// Send a device status transition.
    /// Injects the source id into the payload.
    pub fn send_status(&self, mut payload: StatusPayload) {
        payload.source = Some(self.source_id.clone());
        let _ = self.tx.try_send(EgressMessage::Status(payload));
    }

    /// Send a metrics snapshot
    pub fn send_metrics(&self, summary: MetricsSummary) {
        let payload =
            MetricsPayload { source: self.source_id.clone(), ts: epoch_ms(), summary };
        let _ = self.tx.try_send(EgressMessage::Metrics(payload));
    }
}

/// Create a new egress channel pair
///
/// Returns (sender, receiver) where the sender can be cloned and shared.
/// `source_id` is stamped on every payload for downstream consumers.
pub fn create_egress_channel(
    buffer_size: usize,
    source_id: String,
) -> (EgressSender, mpsc::Receiver<EgressMessage>) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (EgressSender::new(tx, source_id), rx)
}
