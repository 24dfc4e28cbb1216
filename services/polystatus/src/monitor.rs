//! Monitor, observation and log types

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type MonitorId = i64;
pub type OwnerId = i64;

const DEFAULT_ACTIVE_INTERVAL_SECONDS: u64 = 60;
const DEFAULT_PROBE_TIMEOUT_SECONDS: u64 = 10;

/// Current status of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorStatus {
    Pending,
    Up,
    Down,
    Maintenance,
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorStatus::Pending => write!(f, "PENDING"),
            MonitorStatus::Up => write!(f, "UP"),
            MonitorStatus::Down => write!(f, "DOWN"),
            MonitorStatus::Maintenance => write!(f, "MAINTENANCE"),
        }
    }
}

/// Target of an active monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTarget {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_probe_timeout")]
    pub timeout_seconds: u64,
}

impl ActiveTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            interval_seconds: default_interval(),
            timeout_seconds: default_probe_timeout(),
        }
    }

    /// Probe interval; zero falls back to the default
    pub fn interval(&self) -> Duration {
        match self.interval_seconds {
            0 => Duration::from_secs(DEFAULT_ACTIVE_INTERVAL_SECONDS),
            s => Duration::from_secs(s),
        }
    }

    /// Probe timeout; zero falls back to the default
    pub fn probe_timeout(&self) -> Duration {
        match self.timeout_seconds {
            0 => Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECONDS),
            s => Duration::from_secs(s),
        }
    }
}

/// How a monitor learns about its target's liveness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorKind {
    /// Probed by the scheduler
    Active(ActiveTarget),
    /// Reports through the push endpoint using its secret key
    Passive { key: String },
}

/// A monitored target and its current state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: MonitorId,
    pub owner_id: OwnerId,
    pub name: String,
    pub kind: MonitorKind,
    pub status: MonitorStatus,
    pub is_paused: bool,
    /// Maximum silence in seconds before the monitor is considered down (0 disables)
    pub timeout_seconds: u64,
    pub last_check_at: Option<DateTime<Utc>>,
    pub last_latency_ms: Option<u64>,
}

impl Monitor {
    /// Create an active monitor in the PENDING state
    pub fn active(
        id: MonitorId,
        owner_id: OwnerId,
        name: impl Into<String>,
        target: ActiveTarget,
    ) -> crate::Result<Self> {
        if target.url.trim().is_empty() {
            return Err(crate::PolyStatusError::Config(
                "Active monitor requires a target URL".to_string(),
            ));
        }
        Ok(Self::pending(id, owner_id, name.into(), MonitorKind::Active(target)))
    }

    /// Create a passive monitor with a freshly generated key
    pub fn passive(id: MonitorId, owner_id: OwnerId, name: impl Into<String>) -> Self {
        Self::passive_with_key(id, owner_id, name, generate_passive_key())
    }

    pub fn passive_with_key(
        id: MonitorId,
        owner_id: OwnerId,
        name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self::pending(
            id,
            owner_id,
            name.into(),
            MonitorKind::Passive { key: key.into() },
        )
    }

    fn pending(id: MonitorId, owner_id: OwnerId, name: String, kind: MonitorKind) -> Self {
        Self {
            id,
            owner_id,
            name,
            kind,
            status: MonitorStatus::Pending,
            is_paused: false,
            timeout_seconds: 0,
            last_check_at: None,
            last_latency_ms: None,
        }
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn active_target(&self) -> Option<&ActiveTarget> {
        match &self.kind {
            MonitorKind::Active(target) => Some(target),
            MonitorKind::Passive { .. } => None,
        }
    }

    pub fn passive_key(&self) -> Option<&str> {
        match &self.kind {
            MonitorKind::Passive { key } => Some(key),
            MonitorKind::Active(_) => None,
        }
    }

    /// Whether an active monitor should be probed at `now`.
    ///
    /// Never-checked monitors are always due. Passive monitors are never due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        let Some(target) = self.active_target() else {
            return false;
        };
        match self.last_check_at {
            None => true,
            // an interval past the representable range is never due
            Some(last) => chrono::Duration::from_std(target.interval())
                .ok()
                .and_then(|interval| last.checked_add_signed(interval))
                .is_some_and(|due_at| now >= due_at),
        }
    }
}

/// Generate a 64 character hex key from 32 random bytes
pub fn generate_passive_key() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

/// One liveness data point about a monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub status: MonitorStatus,
    pub latency_ms: u64,
    pub status_code: Option<u16>,
    pub message: Option<String>,
    pub payload: Option<Value>,
}

impl Observation {
    pub fn new(status: MonitorStatus, latency_ms: u64) -> Self {
        Self {
            status,
            latency_ms,
            status_code: None,
            message: None,
            payload: None,
        }
    }

    pub fn up(latency_ms: u64) -> Self {
        Self::new(MonitorStatus::Up, latency_ms)
    }

    pub fn down(latency_ms: u64) -> Self {
        Self::new(MonitorStatus::Down, latency_ms)
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// An immutable history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorLog {
    pub id: u64,
    pub monitor_id: MonitorId,
    pub status: MonitorStatus,
    pub latency_ms: u64,
    pub status_code: Option<u16>,
    pub message: Option<String>,
    pub payload: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// A log entry before the store assigns its id
#[derive(Debug, Clone, PartialEq)]
pub struct NewMonitorLog {
    pub monitor_id: MonitorId,
    pub observation: Observation,
    pub created_at: DateTime<Utc>,
}

/// Fields the recorder writes back after every observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorUpdate {
    pub status: MonitorStatus,
    pub last_check_at: DateTime<Utc>,
    pub last_latency_ms: u64,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_interval() -> u64 {
    DEFAULT_ACTIVE_INTERVAL_SECONDS
}

fn default_probe_timeout() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECONDS
}
