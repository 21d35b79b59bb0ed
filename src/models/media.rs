//! Media library models

use serde::{Deserialize, Serialize};

/// Kind of an uploaded library item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image (JPEG, PNG, WebP)
    Image,
    /// Video (MP4, MOV)
    Video,
}

impl MediaKind {
    /// Get kind as string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    /// Parse kind from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

/// What a draft carries as its main content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaType {
    /// A single image
    #[default]
    Image,
    /// A single video
    Video,
    /// No media at all (LinkedIn and X only)
    TextOnly,
}

impl MediaType {
    /// Get media type as string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::TextOnly => "text-only",
        }
    }

    /// Parse media type from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "text-only" | "text_only" | "text" => Some(Self::TextOnly),
            _ => None,
        }
    }
}

impl From<MediaKind> for MediaType {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => Self::Image,
            MediaKind::Video => Self::Video,
        }
    }
}

/// An image or video from the user's library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Library identifier
    pub id: String,
    /// Public URL of the asset
    pub url: String,
    /// Thumbnail URL (videos mostly)
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// User-editable title
    #[serde(default)]
    pub title: Option<String>,
    /// Image or video
    pub kind: MediaKind,
    /// Folder the item was moved into
    #[serde(default)]
    pub folder_id: Option<String>,
    /// Marked as favorite
    #[serde(default)]
    pub is_favorite: bool,
}

impl MediaItem {
    /// Create a library item with only the required fields set
    pub fn new(id: impl Into<String>, url: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            thumbnail_url: None,
            title: None,
            kind,
            folder_id: None,
            is_favorite: false,
        }
    }

    /// Title for display, falling back to the last URL segment
    pub fn display_title(&self) -> String {
        if let Some(title) = self.title.as_deref().filter(|t| !t.trim().is_empty()) {
            return title.to_string();
        }
        self.url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.id)
            .to_string()
    }

    /// Best URL for a preview image
    pub fn preview_url(&self) -> &str {
        self.thumbnail_url.as_deref().unwrap_or(&self.url)
    }
}

/// A library folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Folder identifier
    pub id: String,
    /// Folder name
    pub name: String,
    /// Optional color tag
    #[serde(default)]
    pub color: Option<String>,
}
