//! Status state machine: persists observations and decides when to notify

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::task::TaskTracker;

use crate::dispatcher::NotificationDispatcher;
use crate::monitor::{Monitor, MonitorId, MonitorStatus, MonitorUpdate, NewMonitorLog, Observation};
use crate::notifier::Notification;
use crate::store::Store;

/// Status change worth telling the owner about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Alert,
    Recovery,
}

/// Any change into DOWN alerts; only DOWN to UP recovers
pub fn evaluate_transition(previous: MonitorStatus, current: MonitorStatus) -> Option<Transition> {
    if previous == current {
        return None;
    }
    match (previous, current) {
        (_, MonitorStatus::Down) => Some(Transition::Alert),
        (MonitorStatus::Down, MonitorStatus::Up) => Some(Transition::Recovery),
        _ => None,
    }
}

/// Title and body of the notice sent for a transition
pub fn compose_notice(
    transition: Transition,
    monitor: &Monitor,
    observation: &Observation,
    at: DateTime<Utc>,
) -> Notification {
    let time = at.format("%Y-%m-%d %H:%M:%S UTC");
    match transition {
        Transition::Alert => {
            let reason = observation
                .message
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or("unknown reason");
            Notification::new(
                format!("🔴 Monitor alert: {}", monitor.name),
                format!(
                    "Your monitor [{}] went down!\nTime: {}\nReason: {}",
                    monitor.name, time, reason
                ),
            )
        }
        Transition::Recovery => Notification::new(
            format!("🟢 Recovered: {}", monitor.name),
            format!(
                "Your monitor [{}] recovered.\nTime: {}\nLatency: {}ms",
                monitor.name, time, observation.latency_ms
            ),
        ),
    }
}

/// Single entry point for every observation, whether probed, pushed or synthesized
pub struct HeartbeatRecorder {
    store: Arc<dyn Store>,
    dispatcher: Arc<NotificationDispatcher>,
    tasks: TaskTracker,
}

impl std::fmt::Debug for HeartbeatRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatRecorder")
            .field("pending_notifications", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl HeartbeatRecorder {
    pub fn new(store: Arc<dyn Store>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            tasks: TaskTracker::new(),
        }
    }

    pub async fn record(
        &self,
        monitor_id: MonitorId,
        observation: Observation,
    ) -> crate::Result<Option<Transition>> {
        self.record_at(monitor_id, observation, Utc::now()).await
    }

    /// Log, update, then evaluate, in that order.
    ///
    /// A monitor that no longer exists is skipped silently. The notice is sent
    /// in the background and its outcome never affects the stored state.
    pub async fn record_at(
        &self,
        monitor_id: MonitorId,
        observation: Observation,
        now: DateTime<Utc>,
    ) -> crate::Result<Option<Transition>> {
        let Some(monitor) = self.store.get_monitor(monitor_id).await? else {
            tracing::debug!("Monitor {} not found, dropping observation", monitor_id);
            return Ok(None);
        };

        self.store
            .append_log(NewMonitorLog {
                monitor_id,
                observation: observation.clone(),
                created_at: now,
            })
            .await?;

        let update = MonitorUpdate {
            status: observation.status,
            last_check_at: now,
            last_latency_ms: observation.latency_ms,
        };
        let Some(previous) = self.store.update_monitor(monitor_id, update).await? else {
            tracing::debug!("Monitor {} removed while recording", monitor_id);
            return Ok(None);
        };

        tracing::debug!(
            "Monitor '{}': {} -> {} ({}ms)",
            monitor.name,
            previous,
            observation.status,
            observation.latency_ms
        );

        let Some(transition) = evaluate_transition(previous, observation.status) else {
            return Ok(None);
        };

        tracing::info!(
            "Monitor '{}' transition {:?}: {} -> {}",
            monitor.name,
            transition,
            previous,
            observation.status
        );

        let notice = compose_notice(transition, &monitor, &observation, now);
        self.spawn_notice(monitor, notice);
        Ok(Some(transition))
    }

    fn spawn_notice(&self, monitor: Monitor, notice: Notification) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let owner_id = monitor.owner_id;
        let inner = tokio::spawn(async move { dispatcher.notify_all(owner_id, &notice).await });

        self.tasks.spawn(async move {
            match inner.await {
                Ok(records) => {
                    let failed = records.iter().filter(|r| !r.success).count();
                    if failed > 0 {
                        tracing::warn!(
                            "{} of {} notifications for '{}' failed",
                            failed,
                            records.len(),
                            monitor.name
                        );
                    }
                }
                Err(e) if e.is_panic() => {
                    tracing::error!("Notification task for '{}' panicked: {}", monitor.name, e);
                }
                Err(e) => {
                    tracing::warn!("Notification task for '{}' cancelled: {}", monitor.name, e);
                }
            }
        });
    }

    /// Wait until every notice spawned so far has been delivered or has failed
    pub async fn flush(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}
