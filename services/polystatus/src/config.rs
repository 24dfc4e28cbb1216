//! Configuration types for the polystatus service

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::NotificationChannel;
use crate::monitor::{ActiveTarget, Monitor, MonitorId, OwnerId};

pub const QQ_PROXY_URL_ENV: &str = "QQ_PROXY_URL";
pub const QQ_TARGET_URL_ENV: &str = "QQ_TARGET_URL";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub monitors: Vec<MonitorSeed>,
    #[serde(default)]
    pub channels: Vec<NotificationChannel>,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval(),
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_seconds)
    }
}

/// Notification defaults shared by all channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Relay used by QQ channels without their own `proxy_url`
    #[serde(default = "default_qq_proxy_url")]
    pub qq_proxy_url: String,
    /// Bot endpoint used by QQ channels without their own `target_url`
    #[serde(default = "default_qq_target_url")]
    pub qq_target_url: String,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            qq_proxy_url: default_qq_proxy_url(),
            qq_target_url: default_qq_target_url(),
            history_size: default_history_size(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Interface the API listens on; loopback unless widened explicitly
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_server_port(),
            bind_address: default_bind_address(),
        }
    }
}

/// A monitor declared in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSeed {
    pub id: MonitorId,
    #[serde(default = "default_owner")]
    pub owner_id: OwnerId,
    pub name: String,
    #[serde(flatten)]
    pub kind: MonitorSeedKind,
    /// Allowed silence before the monitor is marked down; 0 disables
    #[serde(default)]
    pub silence_timeout_seconds: u64,
    #[serde(default)]
    pub paused: bool,
}

/// Kind of a seeded monitor; passive seeds may omit the key to have one generated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorSeedKind {
    Active(ActiveTarget),
    Passive {
        #[serde(default)]
        key: Option<String>,
    },
}

impl MonitorSeed {
    pub fn to_monitor(&self) -> crate::Result<Monitor> {
        let monitor = match &self.kind {
            MonitorSeedKind::Active(target) => {
                Monitor::active(self.id, self.owner_id, &self.name, target.clone())?
            }
            MonitorSeedKind::Passive { key: Some(key) } if !key.trim().is_empty() => {
                Monitor::passive_with_key(self.id, self.owner_id, &self.name, key)
            }
            MonitorSeedKind::Passive { .. } => {
                Monitor::passive(self.id, self.owner_id, &self.name)
            }
        };
        let mut monitor = monitor.with_timeout(self.silence_timeout_seconds);
        monitor.is_paused = self.paused;
        Ok(monitor)
    }
}

impl Config {
    /// Apply `QQ_PROXY_URL` / `QQ_TARGET_URL` from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(QQ_PROXY_URL_ENV) {
            tracing::debug!("QQ relay endpoint overridden by {}", QQ_PROXY_URL_ENV);
            self.notifications.qq_proxy_url = url;
        }
        if let Some(url) = non_empty(QQ_TARGET_URL_ENV) {
            tracing::debug!("QQ target endpoint overridden by {}", QQ_TARGET_URL_ENV);
            self.notifications.qq_target_url = url;
        }
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.scheduler.tick_interval_seconds == 0 {
            return Err(crate::PolyStatusError::Config(
                "scheduler.tick_interval_seconds must be greater than zero".to_string(),
            ));
        }

        let mut monitor_ids = HashSet::new();
        let mut keys = HashSet::new();
        for seed in &self.monitors {
            if !monitor_ids.insert(seed.id) {
                return Err(crate::PolyStatusError::Config(format!(
                    "Duplicate monitor id {}",
                    seed.id
                )));
            }
            if let MonitorSeedKind::Passive { key: Some(key) } = &seed.kind {
                if !keys.insert(key.as_str()) {
                    return Err(crate::PolyStatusError::Config(format!(
                        "Duplicate push key on monitor '{}'",
                        seed.name
                    )));
                }
            }
        }

        let mut channel_ids = HashSet::new();
        for channel in &self.channels {
            if !channel_ids.insert(channel.id) {
                return Err(crate::PolyStatusError::Config(format!(
                    "Duplicate channel id {}",
                    channel.id
                )));
            }
        }
        Ok(())
    }
}

fn default_tick_interval() -> u64 {
    10
}

fn default_qq_proxy_url() -> String {
    "http://127.0.0.1:8999/proxy".to_string()
}

fn default_qq_target_url() -> String {
    "http://127.0.0.1:3000/send_private_msg".to_string()
}

fn default_history_size() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_server_port() -> u16 {
    11120
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_owner() -> OwnerId {
    1
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::PolyStatusError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
