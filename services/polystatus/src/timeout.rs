//! Marks silent monitors as down

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::monitor::{MonitorStatus, Observation};
use crate::recorder::HeartbeatRecorder;
use crate::store::Store;

pub struct TimeoutDetector {
    store: Arc<dyn Store>,
    recorder: Arc<HeartbeatRecorder>,
}

impl std::fmt::Debug for TimeoutDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutDetector").finish_non_exhaustive()
    }
}

pub fn timeout_message(elapsed_seconds: i64, limit_seconds: u64) -> String {
    format!(
        "Timeout: No heartbeat received in {}s (Limit: {}s)",
        elapsed_seconds, limit_seconds
    )
}

impl TimeoutDetector {
    pub fn new(store: Arc<dyn Store>, recorder: Arc<HeartbeatRecorder>) -> Self {
        Self { store, recorder }
    }

    /// Record a DOWN observation for every candidate silent longer than its timeout.
    ///
    /// Monitors that never reported are left alone. Returns how many were flagged.
    pub async fn sweep(&self, now: DateTime<Utc>) -> crate::Result<usize> {
        let candidates = self.store.list_timeout_candidates().await?;
        let mut flagged = 0;

        for monitor in candidates {
            if monitor.timeout_seconds == 0
                || monitor.is_paused
                || monitor.status == MonitorStatus::Down
            {
                continue;
            }
            let Some(last) = monitor.last_check_at else {
                continue;
            };
            // compared at ms precision, reported in whole seconds
            let silence = now.signed_duration_since(last);
            let Some(limit_ms) = i64::try_from(monitor.timeout_seconds)
                .ok()
                .and_then(|s| s.checked_mul(1000))
            else {
                continue;
            };
            if silence.num_milliseconds() <= limit_ms {
                continue;
            }

            let message = timeout_message(silence.num_seconds(), monitor.timeout_seconds);
            tracing::info!("Monitor '{}' timed out: {}", monitor.name, message);

            let observation = Observation::down(0).with_code(0).with_message(message);
            match self.recorder.record(monitor.id, observation).await {
                Ok(_) => flagged += 1,
                Err(e) => {
                    tracing::warn!("Failed to record timeout for '{}': {}", monitor.name, e);
                }
            }
        }

        Ok(flagged)
    }
}
