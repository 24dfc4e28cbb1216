//! Notification channel types
//!
//! Channel settings are validated when they are constructed or deserialized,
//! so a `ChannelConfig` that exists is always complete enough to send with.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::monitor::OwnerId;
use crate::PolyStatusError;

pub type ChannelId = i64;

/// Delivery protocol of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelKind {
    Qq,
    Bark,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Qq => write!(f, "QQ"),
            ChannelKind::Bark => write!(f, "BARK"),
        }
    }
}

/// QQ relay settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQqConfig")]
pub struct QqConfig {
    token: String,
    target_qq: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxy_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_url: Option<String>,
}

impl fmt::Debug for QqConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QqConfig")
            .field("target_qq", &self.target_qq)
            .field("proxy_url", &self.proxy_url)
            .field("target_url", &self.target_url)
            .finish()
    }
}

#[derive(Deserialize)]
struct RawQqConfig {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    target_qq: Option<String>,
    #[serde(default)]
    proxy_url: Option<String>,
    #[serde(default)]
    target_url: Option<String>,
}

impl TryFrom<RawQqConfig> for QqConfig {
    type Error = PolyStatusError;

    fn try_from(raw: RawQqConfig) -> crate::Result<Self> {
        let config = QqConfig::new(
            raw.token.unwrap_or_default(),
            raw.target_qq.unwrap_or_default(),
        )?;
        Ok(config
            .with_proxy_url(raw.proxy_url)
            .with_target_url(raw.target_url))
    }
}

impl QqConfig {
    pub fn new(token: impl Into<String>, target_qq: impl Into<String>) -> crate::Result<Self> {
        let token = token.into();
        let target_qq = target_qq.into();
        if token.trim().is_empty() || target_qq.trim().is_empty() {
            return Err(PolyStatusError::ChannelConfig(
                "Missing QQ config (token or target_qq)".to_string(),
            ));
        }
        Ok(Self {
            token,
            target_qq,
            proxy_url: None,
            target_url: None,
        })
    }

    /// Override the relay endpoint; blank values are ignored
    pub fn with_proxy_url(mut self, proxy_url: Option<String>) -> Self {
        self.proxy_url = proxy_url.filter(|u| !u.trim().is_empty());
        self
    }

    /// Override the endpoint the relay forwards to; blank values are ignored
    pub fn with_target_url(mut self, target_url: Option<String>) -> Self {
        self.target_url = target_url.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn target_qq(&self) -> &str {
        &self.target_qq
    }

    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy_url.as_deref()
    }

    pub fn target_url(&self) -> Option<&str> {
        self.target_url.as_deref()
    }
}

/// Bark push settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBarkConfig")]
pub struct BarkConfig {
    bark_url: String,
}

#[derive(Deserialize)]
struct RawBarkConfig {
    #[serde(default)]
    bark_url: Option<String>,
}

impl TryFrom<RawBarkConfig> for BarkConfig {
    type Error = PolyStatusError;

    fn try_from(raw: RawBarkConfig) -> crate::Result<Self> {
        BarkConfig::new(raw.bark_url.unwrap_or_default())
    }
}

impl BarkConfig {
    pub fn new(bark_url: impl Into<String>) -> crate::Result<Self> {
        let bark_url = bark_url.into();
        if bark_url.trim().is_empty() {
            return Err(PolyStatusError::ChannelConfig(
                "Bark URL not configured".to_string(),
            ));
        }
        Ok(Self { bark_url })
    }

    pub fn bark_url(&self) -> &str {
        &self.bark_url
    }
}

/// Kind-specific channel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelConfig {
    Qq(QqConfig),
    Bark(BarkConfig),
}

impl ChannelConfig {
    pub fn kind(&self) -> ChannelKind {
        match self {
            ChannelConfig::Qq(_) => ChannelKind::Qq,
            ChannelConfig::Bark(_) => ChannelKind::Bark,
        }
    }
}

/// A configured notification destination owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: ChannelId,
    pub owner_id: OwnerId,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
    pub config: ChannelConfig,
}

impl NotificationChannel {
    pub fn kind(&self) -> ChannelKind {
        self.config.kind()
    }
}

fn default_enabled() -> bool {
    true
}
