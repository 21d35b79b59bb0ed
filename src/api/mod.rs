//! Collaborators of the studio: library, stores, AI services, publishing
//!
//! The orchestration modules only talk to these traits. [`StudioClient`]
//! implements all of them over the studio's HTTP API; the local
//! [`Database`](crate::db::Database) implements the two stores.

pub mod studio;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    BrandProfile, Draft, Folder, MediaItem, MediaKind, MediaType, Platform, PlatformConnection,
    ScheduledPost,
};

pub use studio::StudioClient;

/// User library and account-level data
#[allow(async_fn_in_trait)]
pub trait Library {
    /// List images or videos, newest first, capped at `limit`
    async fn list_media(&self, kind: MediaKind, limit: usize) -> Result<Vec<MediaItem>>;

    /// List library folders
    async fn list_folders(&self) -> Result<Vec<Folder>>;

    /// Linked platform accounts
    async fn connections(&self) -> Result<Vec<PlatformConnection>>;

    /// Where the OAuth connect flow starts for a platform
    fn connect_url(&self, platform: Platform) -> Option<String>;

    /// Brand profile
    async fn brand(&self) -> Result<BrandProfile>;

    /// Save the brand profile
    async fn save_brand(&self, brand: &BrandProfile) -> Result<BrandProfile>;
}

/// Per-platform draft persistence
#[allow(async_fn_in_trait)]
pub trait DraftStore {
    /// Drafts of one platform, newest first
    async fn list_drafts(&self, platform: Platform) -> Result<Vec<Draft>>;

    /// Insert a new draft
    async fn insert_draft(&self, draft: &Draft) -> Result<Draft>;

    /// Update an existing draft in place
    async fn update_draft(&self, draft: &Draft) -> Result<Draft>;

    /// Delete a draft
    async fn delete_draft(&self, platform: Platform, id: Uuid) -> Result<()>;
}

/// Scheduled post persistence
#[allow(async_fn_in_trait)]
pub trait ScheduleStore {
    /// All scheduled posts
    async fn list_scheduled_posts(&self) -> Result<Vec<ScheduledPost>>;

    /// Create one scheduled post
    async fn create_scheduled_post(&self, post: &ScheduledPost) -> Result<ScheduledPost>;

    /// Delete a scheduled post
    async fn delete_scheduled_post(&self, id: Uuid) -> Result<()>;
}

/// AI suggestion, narration and conversion services
#[allow(async_fn_in_trait)]
pub trait Assistant {
    /// Caption and hashtag suggestion
    async fn suggest(&self, route: &str, request: &SuggestionRequest) -> Result<Suggestion>;

    /// Text-to-speech
    async fn generate_audio(&self, request: &TtsRequest) -> Result<AudioTrack>;

    /// Merge a narration track (and optional subtitles) into a video
    async fn merge_audio_video(&self, request: &MergeRequest) -> Result<MergedVideo>;

    /// Start an image→video conversion; returns the task id
    async fn start_video_conversion(&self, request: &ConversionRequest) -> Result<String>;

    /// Poll a conversion task
    async fn conversion_status(&self, task_id: &str) -> Result<ConversionStatus>;
}

/// Platform publishing
#[allow(async_fn_in_trait)]
pub trait Publisher {
    /// Publish through an internal publish route
    async fn publish(&self, route: &str, request: &PublishRequest) -> Result<PublishResult>;
}

/// Context sent to the suggestion service
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    /// Media URL the caption is about
    pub content_url: Option<String>,
    /// Media title
    pub content_title: Option<String>,
    /// Business category
    pub category: Option<String>,
    /// Tone or angle
    pub angle: Option<String>,
    /// Target platform
    pub platform: Platform,
}

/// Caption and hashtags proposed by the suggestion service
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Suggestion {
    /// Proposed caption
    #[serde(default)]
    pub caption: String,
    /// Proposed hashtags (with or without `#`)
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// Text-to-speech request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsRequest {
    /// Script to read
    pub text: String,
    /// Target duration in seconds
    pub target_duration: u32,
    /// Voice id
    pub voice: String,
    /// Speech rate multiplier
    pub speed: f32,
}

/// Generated narration audio
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    /// URL of the audio file
    pub audio_url: String,
    /// Script actually read, when the service shortened it
    #[serde(default)]
    pub condensed_text: Option<String>,
}

/// Audio/video merge request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    /// Source video
    pub video_url: String,
    /// Narration audio
    pub audio_url: String,
    /// Text to burn in as subtitles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_script: Option<String>,
    /// Subtitle style id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_style: Option<String>,
}

/// Result of a merge
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedVideo {
    /// URL of the merged video
    pub merged_url: String,
}

/// Image→video conversion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    /// Source image
    pub image_url: String,
    /// Motion prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// State of a conversion task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionStatus {
    /// Queued or running
    Pending,
    /// Done; the video is ready
    Completed {
        /// Generated video
        video_url: String,
    },
    /// Gave up
    Failed {
        /// Reason reported by the service
        error: String,
    },
}

/// Payload sent to a publish route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    /// Image to publish
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Video to publish
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Carousel images
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
    /// Caption
    pub caption: String,
    /// Hashtags with leading `#`
    pub hashtags: Vec<String>,
    /// Image, video or text-only
    pub media_type: MediaType,
}

impl PublishRequest {
    /// Build a request for a single media item (or none)
    pub fn new(
        media_type: MediaType,
        media_url: Option<&str>,
        caption: &str,
        hashtags: &[String],
    ) -> Self {
        let url = media_url.map(String::from);
        Self {
            image_url: if media_type == MediaType::Image { url.clone() } else { None },
            video_url: if media_type == MediaType::Video { url } else { None },
            image_urls: Vec::new(),
            caption: caption.to_string(),
            hashtags: hashtags.to_vec(),
            media_type,
        }
    }
}

/// Outcome of a successful publish
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    /// Platform post id
    #[serde(default)]
    pub id: Option<String>,
    /// Public link to the post
    #[serde(default)]
    pub permalink: Option<String>,
    /// Number of images (carousels)
    #[serde(default)]
    pub image_count: Option<u32>,
}
