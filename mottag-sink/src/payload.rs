//! Telemetry payload encoding
//!
//! Antenna `i` is labelled `scan{i+1}` on the wire. RSSI values are rounded
//! to two decimals.

use mottag_sim::ObservationVector;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Wire label of the antenna at configuration index `index`.
pub fn antenna_label(index: usize) -> String {
    format!("scan{}", index + 1)
}

/// Rounds to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Document-store body: `{"scan1": {"rssi": r, "server_timestamp": ms}, ...}`.
pub fn document_store_body(readings: &ObservationVector, timestamp_ms: u64) -> Value {
    let mut body = Map::new();
    for (i, rssi) in readings.iter().enumerate() {
        body.insert(
            antenna_label(i),
            json!({ "rssi": round2(*rssi), "server_timestamp": timestamp_ms }),
        );
    }
    Value::Object(body)
}

/// One scan event inside a topic message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanEvent {
    /// Rounded RSSI
    pub rssi: f64,
    /// Tag address
    pub addr: String,
    /// Event time in Unix milliseconds
    pub t: u64,
}

/// Topic message for one antenna.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicMessage {
    /// Antenna label
    pub aid: String,
    /// Scan events; always exactly one
    pub events: Vec<ScanEvent>,
    /// Message time in Unix milliseconds
    pub time: u64,
}

/// Builds one topic message per antenna, in configuration order.
pub fn topic_messages(
    readings: &ObservationVector,
    tag_addr: &str,
    timestamp_ms: u64,
) -> Vec<TopicMessage> {
    readings
        .iter()
        .enumerate()
        .map(|(i, rssi)| TopicMessage {
            aid: antenna_label(i),
            events: vec![ScanEvent {
                rssi: round2(*rssi),
                addr: tag_addr.to_string(),
                t: timestamp_ms,
            }],
            time: timestamp_ms,
        })
        .collect()
}
