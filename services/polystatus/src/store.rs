//! Persistence contract consumed by the engine, and an in-memory implementation

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::channel::{ChannelId, NotificationChannel};
use crate::monitor::{
    ActiveTarget, Monitor, MonitorId, MonitorLog, MonitorStatus, MonitorUpdate, NewMonitorLog,
    OwnerId,
};
use crate::PolyStatusError;

/// Entity storage used by the scheduler, recorder and dispatcher.
///
/// Reads and writes are atomic per entity; nothing spans entities.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait Store: Send + Sync {
    async fn get_monitor(&self, id: MonitorId) -> crate::Result<Option<Monitor>>;

    /// Look up a passive monitor by its push key
    async fn find_monitor_by_key(&self, key: &str) -> crate::Result<Option<Monitor>>;

    /// Write status, last check time and latency.
    ///
    /// Returns the status that was replaced, or `None` if the monitor is gone.
    async fn update_monitor(
        &self,
        id: MonitorId,
        update: MonitorUpdate,
    ) -> crate::Result<Option<MonitorStatus>>;

    async fn append_log(&self, entry: NewMonitorLog) -> crate::Result<MonitorLog>;

    /// Most recent log entries first
    async fn recent_logs(&self, id: MonitorId, limit: usize) -> crate::Result<Vec<MonitorLog>>;

    async fn list_monitors(&self) -> crate::Result<Vec<Monitor>>;

    /// Active, unpaused monitors; interval filtering is left to the caller
    async fn list_active_due_monitors(&self) -> crate::Result<Vec<Monitor>>;

    /// Unpaused monitors with a timeout that are not already down
    async fn list_timeout_candidates(&self) -> crate::Result<Vec<Monitor>>;

    async fn get_enabled_channels(
        &self,
        owner_id: OwnerId,
    ) -> crate::Result<Vec<NotificationChannel>>;

    async fn get_channel(
        &self,
        owner_id: OwnerId,
        channel_id: ChannelId,
    ) -> crate::Result<Option<NotificationChannel>>;
}

#[derive(Debug, Default)]
struct Tables {
    monitors: BTreeMap<MonitorId, Monitor>,
    logs: BTreeMap<MonitorId, Vec<MonitorLog>>,
    channels: BTreeMap<ChannelId, NotificationChannel>,
    next_log_id: u64,
}

impl Tables {
    fn next_monitor_id(&self) -> MonitorId {
        self.monitors.keys().next_back().map_or(1, |id| id + 1)
    }

    fn key_in_use(&self, key: &str) -> bool {
        self.monitors
            .values()
            .any(|m| m.passive_key() == Some(key))
    }

    fn insert_monitor(&mut self, monitor: Monitor) -> crate::Result<Monitor> {
        if self.monitors.contains_key(&monitor.id) {
            return Err(PolyStatusError::Store(format!(
                "Monitor {} already exists",
                monitor.id
            )));
        }
        if let Some(key) = monitor.passive_key() {
            if self.key_in_use(key) {
                return Err(PolyStatusError::Store(format!(
                    "Push key of monitor '{}' is already in use",
                    monitor.name
                )));
            }
        }
        self.monitors.insert(monitor.id, monitor.clone());
        Ok(monitor)
    }
}

/// Store backed by in-process maps
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed monitor, rejecting duplicate ids and push keys
    pub async fn insert_monitor(&self, monitor: Monitor) -> crate::Result<Monitor> {
        self.tables.write().await.insert_monitor(monitor)
    }

    pub async fn create_active_monitor(
        &self,
        owner_id: OwnerId,
        name: &str,
        target: ActiveTarget,
        timeout_seconds: u64,
    ) -> crate::Result<Monitor> {
        let mut tables = self.tables.write().await;
        let id = tables.next_monitor_id();
        let monitor = Monitor::active(id, owner_id, name, target)?.with_timeout(timeout_seconds);
        tables.insert_monitor(monitor)
    }

    pub async fn create_passive_monitor(
        &self,
        owner_id: OwnerId,
        name: &str,
        timeout_seconds: u64,
    ) -> crate::Result<Monitor> {
        let mut tables = self.tables.write().await;
        let id = tables.next_monitor_id();
        let monitor = Monitor::passive(id, owner_id, name).with_timeout(timeout_seconds);
        tables.insert_monitor(monitor)
    }

    pub async fn insert_channel(&self, channel: NotificationChannel) -> crate::Result<()> {
        let mut tables = self.tables.write().await;
        if tables.channels.contains_key(&channel.id) {
            return Err(PolyStatusError::Store(format!(
                "Channel {} already exists",
                channel.id
            )));
        }
        tables.channels.insert(channel.id, channel);
        Ok(())
    }

    /// Pause or resume a monitor; returns false if it does not exist
    pub async fn set_paused(&self, id: MonitorId, paused: bool) -> bool {
        match self.tables.write().await.monitors.get_mut(&id) {
            Some(monitor) => {
                monitor.is_paused = paused;
                true
            }
            None => false,
        }
    }

    /// Force a monitor's status, as the maintenance toggle does
    pub async fn set_status(&self, id: MonitorId, status: MonitorStatus) -> bool {
        match self.tables.write().await.monitors.get_mut(&id) {
            Some(monitor) => {
                monitor.status = status;
                true
            }
            None => false,
        }
    }

    /// Enter maintenance, or leave it back to PENDING until the next observation
    pub async fn set_maintenance(&self, id: MonitorId, enabled: bool) -> bool {
        let status = if enabled {
            MonitorStatus::Maintenance
        } else {
            MonitorStatus::Pending
        };
        self.set_status(id, status).await
    }

    /// Delete a monitor together with its history
    pub async fn delete_monitor(&self, id: MonitorId) -> Option<Monitor> {
        let mut tables = self.tables.write().await;
        tables.logs.remove(&id);
        tables.monitors.remove(&id)
    }

    /// Full history of a monitor in submission order
    pub async fn logs(&self, id: MonitorId) -> Vec<MonitorLog> {
        self.tables
            .read()
            .await
            .logs
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_monitor(&self, id: MonitorId) -> crate::Result<Option<Monitor>> {
        Ok(self.tables.read().await.monitors.get(&id).cloned())
    }

    async fn find_monitor_by_key(&self, key: &str) -> crate::Result<Option<Monitor>> {
        Ok(self
            .tables
            .read()
            .await
            .monitors
            .values()
            .find(|m| m.passive_key() == Some(key))
            .cloned())
    }

    async fn update_monitor(
        &self,
        id: MonitorId,
        update: MonitorUpdate,
    ) -> crate::Result<Option<MonitorStatus>> {
        let mut tables = self.tables.write().await;
        Ok(tables.monitors.get_mut(&id).map(|monitor| {
            let previous = monitor.status;
            monitor.status = update.status;
            monitor.last_check_at = Some(update.last_check_at);
            monitor.last_latency_ms = Some(update.last_latency_ms);
            previous
        }))
    }

    async fn append_log(&self, entry: NewMonitorLog) -> crate::Result<MonitorLog> {
        let mut tables = self.tables.write().await;
        if !tables.monitors.contains_key(&entry.monitor_id) {
            return Err(PolyStatusError::NotFound(format!(
                "Monitor {}",
                entry.monitor_id
            )));
        }
        tables.next_log_id += 1;
        let observation = entry.observation;
        let log = MonitorLog {
            id: tables.next_log_id,
            monitor_id: entry.monitor_id,
            status: observation.status,
            latency_ms: observation.latency_ms,
            status_code: observation.status_code,
            message: observation.message,
            payload: observation.payload,
            created_at: entry.created_at,
        };
        tables
            .logs
            .entry(entry.monitor_id)
            .or_default()
            .push(log.clone());
        Ok(log)
    }

    async fn recent_logs(&self, id: MonitorId, limit: usize) -> crate::Result<Vec<MonitorLog>> {
        Ok(self
            .tables
            .read()
            .await
            .logs
            .get(&id)
            .map(|logs| logs.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn list_monitors(&self) -> crate::Result<Vec<Monitor>> {
        Ok(self.tables.read().await.monitors.values().cloned().collect())
    }

    async fn list_active_due_monitors(&self) -> crate::Result<Vec<Monitor>> {
        Ok(self
            .tables
            .read()
            .await
            .monitors
            .values()
            .filter(|m| {
                m.active_target().is_some()
                    && !m.is_paused
                    && m.status != MonitorStatus::Maintenance
            })
            .cloned()
            .collect())
    }

    async fn list_timeout_candidates(&self) -> crate::Result<Vec<Monitor>> {
        Ok(self
            .tables
            .read()
            .await
            .monitors
            .values()
            .filter(|m| {
                m.timeout_seconds > 0
                    && !m.is_paused
                    && !matches!(m.status, MonitorStatus::Down | MonitorStatus::Maintenance)
            })
            .cloned()
            .collect())
    }

    async fn get_enabled_channels(
        &self,
        owner_id: OwnerId,
    ) -> crate::Result<Vec<NotificationChannel>> {
        Ok(self
            .tables
            .read()
            .await
            .channels
            .values()
            .filter(|c| c.owner_id == owner_id && c.is_enabled)
            .cloned()
            .collect())
    }

    async fn get_channel(
        &self,
        owner_id: OwnerId,
        channel_id: ChannelId,
    ) -> crate::Result<Option<NotificationChannel>> {
        Ok(self
            .tables
            .read()
            .await
            .channels
            .get(&channel_id)
            .filter(|c| c.owner_id == owner_id)
            .cloned())
    }
}
