//! Fan-out of notifications to an owner's channels

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;

use crate::bark::BarkNotifier;
use crate::channel::{ChannelConfig, ChannelId, NotificationChannel};
use crate::config::NotificationConfig;
use crate::io::HttpClient;
use crate::monitor::OwnerId;
use crate::notifier::{DeliveryRecord, Notification, Notifier};
use crate::qq::QqNotifier;
use crate::store::Store;
use crate::PolyStatusError;

pub const TEST_TITLE: &str = "PolyStatus test";
pub const TEST_MESSAGE: &str = "This is a test message, configuration works! 🎉";

/// Delivers notifications through each channel's protocol and keeps a bounded
/// history of attempts, newest last
pub struct NotificationDispatcher {
    store: Arc<dyn Store>,
    http: Arc<dyn HttpClient>,
    config: NotificationConfig,
    history: RwLock<VecDeque<DeliveryRecord>>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn Store>,
        http: Arc<dyn HttpClient>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            store,
            http,
            history: RwLock::new(VecDeque::with_capacity(config.history_size)),
            config,
        }
    }

    /// Build the notifier for a channel configuration
    pub fn notifier_for(&self, config: &ChannelConfig) -> Arc<dyn Notifier> {
        match config {
            ChannelConfig::Qq(qq) => Arc::new(QqNotifier::new(
                qq,
                &self.config,
                Arc::clone(&self.http),
            )),
            ChannelConfig::Bark(bark) => {
                Arc::new(BarkNotifier::new(bark, Arc::clone(&self.http)))
            }
        }
    }

    /// Deliver one notification through one channel configuration
    pub async fn send(
        &self,
        config: &ChannelConfig,
        notification: &Notification,
    ) -> crate::Result<()> {
        self.notifier_for(config).notify(notification).await
    }

    /// Deliver to every enabled channel of `owner_id` concurrently.
    ///
    /// Never fails: store errors and per-channel failures are logged, and each
    /// attempt is recorded in the history.
    pub async fn notify_all(
        &self,
        owner_id: OwnerId,
        notification: &Notification,
    ) -> Vec<DeliveryRecord> {
        let channels = match self.store.get_enabled_channels(owner_id).await {
            Ok(channels) => channels,
            Err(e) => {
                tracing::warn!("Failed to load channels for owner {}: {}", owner_id, e);
                return Vec::new();
            }
        };

        if channels.is_empty() {
            tracing::debug!("Owner {} has no enabled channels", owner_id);
            return Vec::new();
        }

        let mut set = JoinSet::new();
        for channel in channels {
            let notifier = self.notifier_for(&channel.config);
            let notification = notification.clone();
            set.spawn(async move {
                let result = notifier.notify(&notification).await;
                (channel, result)
            });
        }

        let mut records = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((channel, result)) => {
                    if let Err(e) = &result {
                        tracing::warn!(
                            "Notification via channel {} ('{}') failed: {}",
                            channel.id,
                            channel.name,
                            e
                        );
                    }
                    records.push(delivery_record(Some(&channel), &channel.config, notification, &result));
                }
                Err(e) => {
                    tracing::warn!("Notification task for owner {} aborted: {}", owner_id, e);
                }
            }
        }

        for record in &records {
            self.push_history(record.clone()).await;
        }
        records
    }

    /// Send the fixed test message through one of the owner's channels
    pub async fn send_test(&self, owner_id: OwnerId, channel_id: ChannelId) -> crate::Result<()> {
        let channel = self
            .store
            .get_channel(owner_id, channel_id)
            .await?
            .ok_or_else(|| PolyStatusError::NotFound(format!("Channel {}", channel_id)))?;

        let notification = Notification::new(TEST_TITLE, TEST_MESSAGE);
        let result = self.send(&channel.config, &notification).await;
        self.push_history(delivery_record(Some(&channel), &channel.config, &notification, &result))
            .await;
        result
    }

    /// Send the fixed test message through a configuration that is not stored
    pub async fn test_with_config(&self, config: &ChannelConfig) -> crate::Result<()> {
        let notification = Notification::new(TEST_TITLE, TEST_MESSAGE);
        let result = self.send(config, &notification).await;
        self.push_history(delivery_record(None, config, &notification, &result))
            .await;
        result
    }

    /// Delivery attempts, oldest first
    pub async fn history(&self) -> Vec<DeliveryRecord> {
        self.history.read().await.iter().cloned().collect()
    }

    async fn push_history(&self, record: DeliveryRecord) {
        if self.config.history_size == 0 {
            return;
        }
        let mut history = self.history.write().await;
        while history.len() >= self.config.history_size {
            history.pop_front();
        }
        history.push_back(record);
    }
}

fn delivery_record(
    channel: Option<&NotificationChannel>,
    config: &ChannelConfig,
    notification: &Notification,
    result: &crate::Result<()>,
) -> DeliveryRecord {
    DeliveryRecord {
        channel_id: channel.map(|c| c.id),
        channel_name: channel.map_or_else(|| "ad-hoc".to_string(), |c| c.name.clone()),
        channel_kind: config.kind(),
        title: notification.title.clone(),
        message: notification.message.clone(),
        success: result.is_ok(),
        error: result.as_ref().err().map(|e| e.to_string()),
        timestamp: Utc::now(),
    }
}
