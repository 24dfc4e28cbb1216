//! QQ notification client, delivered through an HTTP relay

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::channel::{ChannelKind, QqConfig};
use crate::config::NotificationConfig;
use crate::io::HttpClient;
use crate::notifier::{Notification, Notifier};

/// Sends private QQ messages by posting to a relay that forwards to the bot API
pub struct QqNotifier {
    token: String,
    target_qq: String,
    proxy_url: String,
    target_url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for QqNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QqNotifier")
            .field("target_qq", &self.target_qq)
            .field("proxy_url", &self.proxy_url)
            .finish()
    }
}

impl QqNotifier {
    /// Channel endpoints win over the configured defaults
    pub fn new(config: &QqConfig, defaults: &NotificationConfig, http: Arc<dyn HttpClient>) -> Self {
        let proxy_url = config
            .proxy_url()
            .unwrap_or(&defaults.qq_proxy_url)
            .to_string();
        let target_url = config
            .target_url()
            .unwrap_or(&defaults.qq_target_url)
            .to_string();

        tracing::debug!("Created QqNotifier for {} via {}", config.target_qq(), proxy_url);

        Self {
            token: config.token().to_string(),
            target_qq: config.target_qq().to_string(),
            proxy_url,
            target_url,
            http,
        }
    }

    /// Relay request body; only the message text is sent, QQ has no title field
    pub fn relay_body(&self, text: &str) -> serde_json::Value {
        json!({
            "url": self.target_url,
            "post": {
                "user_id": self.target_qq,
                "message": [{
                    "type": "text",
                    "data": { "text": text }
                }]
            },
            "headers": {
                "Authorization": format!("Bearer {}", self.token)
            }
        })
    }
}

#[async_trait]
impl Notifier for QqNotifier {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Qq
    }

    async fn notify(&self, notification: &Notification) -> crate::Result<()> {
        let body = self.relay_body(&notification.message);

        tracing::debug!("Sending QQ notification to {}", self.target_qq);

        let response = self.http.post_json(&self.proxy_url, &body).await?;

        if !response.is_success() {
            return Err(crate::PolyStatusError::Delivery(format!(
                "QQ API Error: {} {}",
                response.status, response.body
            )));
        }

        tracing::debug!("QQ notification sent successfully");
        Ok(())
    }
}
