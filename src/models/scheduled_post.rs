//! Scheduled post model

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Platform;

/// Status of a scheduled post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduledPostStatus {
    /// Waiting for its publication time
    #[default]
    Scheduled,
    /// Published by the publishing job
    Published,
}

impl ScheduledPostStatus {
    /// Get status as string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Published => "published",
        }
    }

    /// Parse status from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "scheduled" | "pending" => Some(Self::Scheduled),
            "published" | "posted" => Some(Self::Published),
            _ => None,
        }
    }

    /// Get emoji for status
    pub const fn emoji(&self) -> &'static str {
        match self {
            Self::Scheduled => "⏳",
            Self::Published => "✅",
        }
    }
}

/// Intent to publish specific content to one platform at a future time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPost {
    /// Unique identifier
    pub id: Uuid,
    /// Library item to publish
    pub media_ref: Option<String>,
    /// Resolved media URL
    #[serde(default)]
    pub media_url: Option<String>,
    /// Target platform (one record per platform)
    pub platform: Platform,
    /// When to post
    pub scheduled_for: DateTime<Utc>,
    /// Caption text
    pub caption: String,
    /// Hashtags with leading `#`
    pub hashtags: Vec<String>,
    /// Current status
    pub status: ScheduledPostStatus,
    /// When this was created
    pub created_at: DateTime<Utc>,
}

impl ScheduledPost {
    /// Create a new scheduled post
    pub fn new(
        platform: Platform,
        scheduled_for: DateTime<Utc>,
        caption: impl Into<String>,
        hashtags: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            media_ref: None,
            media_url: None,
            platform,
            scheduled_for,
            caption: caption.into(),
            hashtags,
            status: ScheduledPostStatus::Scheduled,
            created_at: Utc::now(),
        }
    }

    /// Calendar grouping key (`year-month-day`) in the given time zone
    pub fn day_key<Tz: TimeZone>(&self, tz: &Tz) -> String {
        let local = self.scheduled_for.with_timezone(tz);
        day_key(local.year(), local.month(), local.day())
    }

    /// Format scheduled time for display
    pub fn scheduled_time_display(&self) -> String {
        self.scheduled_for.format("%Y-%m-%d %H:%M UTC").to_string()
    }
}

/// Build a calendar day key
pub fn day_key(year: i32, month: u32, day: u32) -> String {
    format!("{year}-{month}-{day}")
}
