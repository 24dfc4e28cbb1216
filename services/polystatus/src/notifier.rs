//! Notifier trait for sending alerts

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelId, ChannelKind};

/// A notification to be sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Record of one delivery attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub channel_id: Option<ChannelId>,
    pub channel_name: String,
    pub channel_kind: ChannelKind,
    pub title: String,
    pub message: String,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Trait for sending notifications through one channel protocol
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> ChannelKind;

    /// Send a notification
    async fn notify(&self, notification: &Notification) -> crate::Result<()>;
}
