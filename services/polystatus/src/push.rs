//! Heartbeats pushed by passive monitors

use serde_json::{Map, Value};

use crate::monitor::{MonitorId, MonitorStatus, Observation};
use crate::recorder::HeartbeatRecorder;
use crate::store::Store;
use crate::PolyStatusError;

pub const DEFAULT_PUSH_MESSAGE: &str = "Heartbeat received";

/// Interpret a push body.
///
/// `status` of `"DOWN"` means down and anything else up, `latency` defaults to
/// 0 and `message` to [`DEFAULT_PUSH_MESSAGE`]. Remaining top-level fields
/// become the payload. Bodies that are not a JSON object count as `{}`.
pub fn parse_push_body(body: &[u8]) -> Observation {
    let mut fields = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => fields,
        _ => Map::new(),
    };

    let status = match fields.remove("status") {
        Some(Value::String(s)) if s == "DOWN" => MonitorStatus::Down,
        _ => MonitorStatus::Up,
    };
    let latency_ms = fields
        .remove("latency")
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0).round() as u64)))
        .unwrap_or(0);
    let message = match fields.remove("message") {
        Some(Value::String(m)) if !m.is_empty() => m,
        _ => DEFAULT_PUSH_MESSAGE.to_string(),
    };

    let observation = Observation::new(status, latency_ms)
        .with_code(200)
        .with_message(message);
    if fields.is_empty() {
        observation
    } else {
        observation.with_payload(Value::Object(fields))
    }
}

/// Record a pushed heartbeat for the passive monitor owning `key`
pub async fn ingest(
    store: &dyn Store,
    recorder: &HeartbeatRecorder,
    key: &str,
    body: &[u8],
) -> crate::Result<MonitorId> {
    if key.is_empty() {
        return Err(PolyStatusError::Config("Missing push key".to_string()));
    }
    let monitor = store
        .find_monitor_by_key(key)
        .await?
        .ok_or_else(|| PolyStatusError::NotFound("Monitor not found".to_string()))?;

    let observation = parse_push_body(body);
    tracing::debug!(
        "Push for '{}': {} ({}ms)",
        monitor.name,
        observation.status,
        observation.latency_ms
    );
    recorder.record(monitor.id, observation).await?;
    Ok(monitor.id)
}
