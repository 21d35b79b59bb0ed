//! Platform connection and brand models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Platform;

/// An OAuth-linked platform account, owned by the external connect flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConnection {
    /// Which platform this connection belongs to
    pub platform: Platform,
    /// Platform-side user id
    pub external_user_id: String,
    /// Handle/username on the platform
    pub username: String,
    /// Access token expiry, when the platform reports one
    #[serde(default)]
    pub token_expiry: Option<DateTime<Utc>>,
}

impl PlatformConnection {
    /// Create a new connection record
    pub fn new(platform: Platform, external_user_id: &str, username: &str) -> Self {
        Self {
            platform,
            external_user_id: external_user_id.to_string(),
            username: username.to_string(),
            token_expiry: None,
        }
    }

    /// Whether the connection can be used to publish at `now`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.external_user_id.is_empty() && self.token_expiry.is_none_or(|expiry| expiry > now)
    }

    /// Whether the connection can be used to publish right now
    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    /// Handle with a leading `@`
    pub fn full_handle(&self) -> String {
        if self.username.starts_with('@') {
            self.username.clone()
        } else {
            format!("@{}", self.username)
        }
    }
}

/// Business profile used as default context for suggestions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandProfile {
    /// Business or creator name
    #[serde(default)]
    pub business_name: Option<String>,
    /// Business category (restaurant, coaching, ...)
    #[serde(default)]
    pub category: Option<String>,
    /// Preferred tone of voice
    #[serde(default)]
    pub tone: Option<String>,
    /// Website shown in captions
    #[serde(default)]
    pub website: Option<String>,
}
