//! Draft model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{MediaType, Platform};

/// Lifecycle status of a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    /// Work in progress
    #[default]
    Draft,
    /// Marked ready to publish
    Ready,
    /// Published to the platform
    Published,
}

impl DraftStatus {
    /// Get status as string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Ready => "ready",
            Self::Published => "published",
        }
    }

    /// Parse status from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "ready" => Some(Self::Ready),
            "published" => Some(Self::Published),
            _ => None,
        }
    }
}

/// Library bucket a draft is listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftCategory {
    /// Plain draft
    #[default]
    Draft,
    /// Carries a generated video (image conversion or narration merge)
    Converted,
    /// Already published
    Published,
}

impl DraftCategory {
    /// Get category as string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Converted => "converted",
            Self::Published => "published",
        }
    }

    /// Parse category from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "converted" => Some(Self::Converted),
            "published" => Some(Self::Published),
            _ => None,
        }
    }
}

/// An unpublished, editable post tied to one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Unique identifier
    pub id: Uuid,
    /// Target platform
    pub platform: Platform,
    /// Library item the draft was built from (None for text-only)
    pub media_ref: Option<String>,
    /// URL that will be published (merged or converted video when present)
    pub media_url: Option<String>,
    /// Image, video or text-only
    pub media_type: MediaType,
    /// Caption text
    pub caption: String,
    /// Ordered, unique hashtags (with leading `#`)
    pub hashtags: Vec<String>,
    /// Lifecycle status
    pub status: DraftStatus,
    /// Library bucket
    pub category: DraftCategory,
    /// Source URL before narration merge or image→video conversion
    #[serde(default)]
    pub original_media_url: Option<String>,
    /// Narration script the merged video was produced from
    #[serde(default)]
    pub narration_script: Option<String>,
    /// Permalink once published
    #[serde(default)]
    pub permalink: Option<String>,
    /// When this was created
    pub created_at: DateTime<Utc>,
    /// Last save
    pub updated_at: DateTime<Utc>,
    /// Planned publication time, if any
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl Draft {
    /// Create a new draft
    pub fn new(platform: Platform, media_type: MediaType, caption: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            platform,
            media_ref: None,
            media_url: None,
            media_type,
            caption: caption.into(),
            hashtags: Vec::new(),
            status: DraftStatus::Draft,
            category: DraftCategory::Draft,
            original_media_url: None,
            narration_script: None,
            permalink: None,
            created_at: now,
            updated_at: now,
            scheduled_for: None,
        }
    }

    /// Whether the draft carries an image or video
    pub fn has_media(&self) -> bool {
        self.media_type != MediaType::TextOnly
            && self.media_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    /// Category implied by the current status and media
    pub fn derived_category(&self) -> DraftCategory {
        if self.status == DraftStatus::Published {
            DraftCategory::Published
        } else if self.media_type == MediaType::Video && self.original_media_url.is_some() {
            DraftCategory::Converted
        } else {
            DraftCategory::Draft
        }
    }

    /// Short caption preview for list display
    pub fn preview(&self, max_chars: usize) -> String {
        let content = self.caption.replace('\n', " ");
        if content.chars().count() <= max_chars {
            content
        } else {
            let cut: String = content.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{cut}...")
        }
    }
}
