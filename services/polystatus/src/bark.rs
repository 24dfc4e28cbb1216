//! Bark push notification client

use std::sync::Arc;

use async_trait::async_trait;

use crate::channel::{BarkConfig, ChannelKind};
use crate::io::HttpClient;
use crate::notifier::{Notification, Notifier};

/// Sends notifications to a Bark device URL
#[derive(Clone)]
pub struct BarkNotifier {
    base_url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for BarkNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarkNotifier").finish_non_exhaustive()
    }
}

impl BarkNotifier {
    pub fn new(config: &BarkConfig, http: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: normalize_base_url(config.bark_url()),
            http,
        }
    }

    /// `{base}{title}/{message}` with both segments percent-encoded
    pub fn push_url(&self, notification: &Notification) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            urlencoding::encode(&notification.title),
            urlencoding::encode(&notification.message)
        )
    }
}

/// Ensure a trailing slash and a scheme
pub fn normalize_base_url(raw: &str) -> String {
    let mut url = raw.trim().to_string();
    if !url.ends_with('/') {
        url.push('/');
    }
    if !url.starts_with("http") {
        url.insert_str(0, "https://");
    }
    url
}

#[async_trait]
impl Notifier for BarkNotifier {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Bark
    }

    async fn notify(&self, notification: &Notification) -> crate::Result<()> {
        let url = self.push_url(notification);
        tracing::debug!("Sending Bark notification '{}'", notification.title);

        let response = self.http.get(&url).await?;

        if !response.is_success() {
            return Err(crate::PolyStatusError::Delivery(format!(
                "Bark API Error: {}",
                response.status
            )));
        }

        tracing::debug!("Bark notification sent successfully");
        Ok(())
    }
}
