//! Scheduler: drives timeout sweeps and active probes on a fixed period

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::prober::Prober;
use crate::recorder::HeartbeatRecorder;
use crate::store::Store;
use crate::timeout::TimeoutDetector;

/// Counts gathered by one completed tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub timed_out: usize,
    pub candidates: usize,
    pub dispatched: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Completed(TickReport),
    /// Another tick still held the guard
    Skipped,
}

struct SchedulerInner {
    store: Arc<dyn Store>,
    prober: Arc<Prober>,
    recorder: Arc<HeartbeatRecorder>,
    timeouts: TimeoutDetector,
    guard: Mutex<()>,
    tasks: TaskTracker,
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodic driver with at most one tick in progress
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
    period: Duration,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn Store>,
        prober: Arc<Prober>,
        recorder: Arc<HeartbeatRecorder>,
        period: Duration,
    ) -> Self {
        let timeouts = TimeoutDetector::new(Arc::clone(&store), Arc::clone(&recorder));
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                prober,
                recorder,
                timeouts,
                guard: Mutex::new(()),
                tasks: TaskTracker::new(),
            }),
            period,
            running: Mutex::new(None),
        }
    }

    /// Begin ticking every period, the first tick immediately. No-op when running.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            tracing::debug!("Scheduler already running");
            return;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let inner = Arc::clone(&self.inner);
        let period = self.period;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let inner = Arc::clone(&inner);
                        inner.tasks.clone().spawn(async move {
                            inner.tick_at(Utc::now()).await;
                        });
                    }
                    _ = token.cancelled() => {
                        tracing::debug!("Scheduler loop cancelled");
                        break;
                    }
                }
            }
        });

        *running = Some(Running { cancel, handle });
        tracing::info!("Scheduler started, ticking every {}s", period.as_secs());
    }

    /// Cancel future ticks; probes already dispatched keep running
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };
        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            tracing::warn!("Scheduler loop ended abnormally: {}", e);
        }
        tracing::info!("Scheduler stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    pub async fn tick(&self) -> TickOutcome {
        self.inner.tick_at(Utc::now()).await
    }

    /// Run one tick against an explicit clock
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickOutcome {
        self.inner.tick_at(now).await
    }

    /// Wait for every tick and probe dispatched so far
    pub async fn wait_for_probes(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.tasks.reopen();
    }
}

impl SchedulerInner {
    async fn tick_at(&self, now: DateTime<Utc>) -> TickOutcome {
        let Ok(_guard) = self.guard.try_lock() else {
            tracing::debug!("Previous tick still in progress, skipping");
            return TickOutcome::Skipped;
        };

        let mut report = TickReport::default();

        match self.timeouts.sweep(now).await {
            Ok(count) => report.timed_out = count,
            Err(e) => tracing::error!("Timeout sweep failed: {}", e),
        }

        let monitors = match self.store.list_active_due_monitors().await {
            Ok(monitors) => monitors,
            Err(e) => {
                tracing::error!("Failed to list active monitors: {}", e);
                return TickOutcome::Completed(report);
            }
        };
        report.candidates = monitors.len();

        for monitor in monitors.into_iter().filter(|m| m.is_due(now)) {
            let Some(target) = monitor.active_target().cloned() else {
                continue;
            };
            let prober = Arc::clone(&self.prober);
            let recorder = Arc::clone(&self.recorder);

            tracing::debug!("Probing '{}' ({} {})", monitor.name, target.method, target.url);
            self.tasks.spawn(async move {
                let observation = prober.probe(&target).await;
                if let Err(e) = recorder.record(monitor.id, observation).await {
                    tracing::warn!("Failed to record probe of '{}': {}", monitor.name, e);
                }
            });
            report.dispatched += 1;
        }

        tracing::debug!(
            "Tick done: {} timed out, {} probes dispatched of {} candidates",
            report.timed_out,
            report.dispatched,
            report.candidates
        );
        TickOutcome::Completed(report)
    }
}
