//! HTTP client for the studio's internal API routes

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ServerError;
use crate::models::{
    BrandProfile, Draft, Folder, MediaItem, MediaKind, Platform, PlatformConnection, ScheduledPost,
};
use crate::profile::PlatformProfile;

use super::{
    Assistant, AudioTrack, ConversionRequest, ConversionStatus, DraftStore, Library, MergeRequest,
    MergedVideo, PublishRequest, PublishResult, Publisher, ScheduleStore, Suggestion,
    SuggestionRequest, TtsRequest,
};

const SCHEDULED_POSTS_ROUTE: &str = "/api/library/scheduled-posts";
const CONVERSION_ROUTE: &str = "/api/convert-video-tiktok";

/// Studio API client
pub struct StudioClient {
    client: Client,
    base_url: String,
    session_token: Option<String>,
}

impl StudioClient {
    /// Create a client for a studio deployment
    pub fn new(base_url: &str, session_token: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session_token: session_token.map(String::from),
        }
    }

    /// Whether requests carry a session
    pub const fn is_authenticated(&self) -> bool {
        self.session_token.is_some()
    }

    /// Build API URL
    fn api_url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.session_token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str, what: &str) -> Result<T> {
        let response = self
            .authorized(self.client.get(self.api_url(route)))
            .send()
            .await
            .with_context(|| format!("Failed to fetch {what}"))?;

        check(response)
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse {what} response"))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = self
            .authorized(request)
            .send()
            .await
            .with_context(|| format!("Failed to {what}"))?;

        check(response)
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse {what} response"))
    }
}

/// Turn a non-success response into a [`ServerError`] carrying its message
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .unwrap_or_else(|| format!("Studio error {status}: {body}"));

    tracing::debug!("Studio API returned {status}: {body}");
    Err(ServerError {
        status: status.as_u16(),
        message,
    }
    .into())
}

impl Library for StudioClient {
    async fn list_media(&self, kind: MediaKind, limit: usize) -> Result<Vec<MediaItem>> {
        let route = match kind {
            MediaKind::Image => format!("/api/library/images?limit={limit}"),
            MediaKind::Video => format!("/api/library/videos?limit={limit}"),
        };
        let envelope: Items<MediaItem> = self.get_json(&route, "library").await?;
        let mut items = envelope.items;
        items.truncate(limit);
        Ok(items)
    }

    async fn list_folders(&self) -> Result<Vec<Folder>> {
        let envelope: Items<Folder> = self.get_json("/api/library/folders", "folders").await?;
        Ok(envelope.items)
    }

    async fn connections(&self) -> Result<Vec<PlatformConnection>> {
        let envelope: Items<PlatformConnection> = self
            .get_json("/api/library/connections", "connections")
            .await?;
        Ok(envelope.items)
    }

    fn connect_url(&self, platform: Platform) -> Option<String> {
        PlatformProfile::for_platform(platform)
            .connect_route
            .map(|route| self.api_url(route))
    }

    async fn brand(&self) -> Result<BrandProfile> {
        let envelope: BrandEnvelope = self.get_json("/api/brand", "brand").await?;
        Ok(envelope.brand.unwrap_or_default())
    }

    async fn save_brand(&self, brand: &BrandProfile) -> Result<BrandProfile> {
        let request = self.client.put(self.api_url("/api/brand")).json(brand);
        let envelope: BrandEnvelope = self.send_json(request, "save brand").await?;
        Ok(envelope.brand.unwrap_or_else(|| brand.clone()))
    }
}

impl DraftStore for StudioClient {
    async fn list_drafts(&self, platform: Platform) -> Result<Vec<Draft>> {
        let route = PlatformProfile::for_platform(platform).drafts_route;
        let envelope: Items<Draft> = self.get_json(route, "drafts").await?;
        Ok(envelope.items)
    }

    async fn insert_draft(&self, draft: &Draft) -> Result<Draft> {
        let route = PlatformProfile::for_platform(draft.platform).drafts_route;
        let request = self.client.post(self.api_url(route)).json(draft);
        let envelope: DraftEnvelope = self.send_json(request, "save draft").await?;
        Ok(envelope.draft.unwrap_or_else(|| draft.clone()))
    }

    async fn update_draft(&self, draft: &Draft) -> Result<Draft> {
        let route = PlatformProfile::for_platform(draft.platform).drafts_route;
        let request = self.client.put(self.api_url(route)).json(draft);
        let envelope: DraftEnvelope = self.send_json(request, "update draft").await?;
        Ok(envelope.draft.unwrap_or_else(|| draft.clone()))
    }

    async fn delete_draft(&self, platform: Platform, id: Uuid) -> Result<()> {
        let route = PlatformProfile::for_platform(platform).drafts_route;
        let url = self.api_url(&format!("{route}?id={id}"));
        let response = self
            .authorized(self.client.delete(url))
            .send()
            .await
            .context("Failed to delete draft")?;
        check(response).await?;
        Ok(())
    }
}

impl ScheduleStore for StudioClient {
    async fn list_scheduled_posts(&self) -> Result<Vec<ScheduledPost>> {
        let envelope: Items<ScheduledPost> = self
            .get_json(SCHEDULED_POSTS_ROUTE, "scheduled posts")
            .await?;
        Ok(envelope.items)
    }

    async fn create_scheduled_post(&self, post: &ScheduledPost) -> Result<ScheduledPost> {
        let request = self.client.post(self.api_url(SCHEDULED_POSTS_ROUTE)).json(post);
        let envelope: ScheduledEnvelope = self.send_json(request, "schedule post").await?;
        Ok(envelope.post.unwrap_or_else(|| post.clone()))
    }

    async fn delete_scheduled_post(&self, id: Uuid) -> Result<()> {
        let url = self.api_url(&format!("{SCHEDULED_POSTS_ROUTE}?id={id}"));
        let response = self
            .authorized(self.client.delete(url))
            .send()
            .await
            .context("Failed to delete scheduled post")?;
        check(response).await?;
        Ok(())
    }
}

impl Assistant for StudioClient {
    async fn suggest(&self, route: &str, request: &SuggestionRequest) -> Result<Suggestion> {
        let builder = self.client.post(self.api_url(route)).json(request);
        self.send_json(builder, "get suggestion").await
    }

    async fn generate_audio(&self, request: &TtsRequest) -> Result<AudioTrack> {
        let builder = self.client.post(self.api_url("/api/generate-audio-tts")).json(request);
        self.send_json(builder, "generate audio").await
    }

    async fn merge_audio_video(&self, request: &MergeRequest) -> Result<MergedVideo> {
        let builder = self.client.post(self.api_url("/api/merge-audio-video")).json(request);
        self.send_json(builder, "merge audio and video").await
    }

    async fn start_video_conversion(&self, request: &ConversionRequest) -> Result<String> {
        let builder = self.client.post(self.api_url(CONVERSION_ROUTE)).json(request);
        let task: ConversionTask = self.send_json(builder, "start video conversion").await?;
        Ok(task.task_id)
    }

    async fn conversion_status(&self, task_id: &str) -> Result<ConversionStatus> {
        let route = format!("{CONVERSION_ROUTE}?taskId={}", urlencoding::encode(task_id));
        let status: ConversionTask = self.get_json(&route, "conversion status").await?;
        Ok(status.into_status())
    }
}

impl Publisher for StudioClient {
    async fn publish(&self, route: &str, request: &PublishRequest) -> Result<PublishResult> {
        let builder = self.client.post(self.api_url(route)).json(request);
        let envelope: PublishEnvelope = self.send_json(builder, "publish").await?;
        if !envelope.ok {
            anyhow::bail!(ServerError {
                status: 200,
                message: envelope
                    .error
                    .unwrap_or_else(|| "Publication refusée par la plateforme".to_string()),
            });
        }
        Ok(envelope.post.unwrap_or_default())
    }
}

// ==================== Wire types ====================

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Items<T> {
    #[serde(
        alias = "images",
        alias = "videos",
        alias = "folders",
        alias = "drafts",
        alias = "posts",
        alias = "connections"
    )]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct BrandEnvelope {
    #[serde(default)]
    brand: Option<BrandProfile>,
}

#[derive(Debug, Deserialize)]
struct DraftEnvelope {
    #[serde(default)]
    draft: Option<Draft>,
}

#[derive(Debug, Deserialize)]
struct ScheduledEnvelope {
    #[serde(default)]
    post: Option<ScheduledPost>,
}

#[derive(Debug, Deserialize)]
struct PublishEnvelope {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    post: Option<PublishResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversionTask {
    task_id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ConversionTask {
    fn into_status(self) -> ConversionStatus {
        match (self.status.as_deref(), self.video_url) {
            (Some("completed"), Some(video_url)) => ConversionStatus::Completed { video_url },
            (Some("completed"), None) => ConversionStatus::Failed {
                error: "Conversion terminée sans vidéo".to_string(),
            },
            (Some("failed"), _) => ConversionStatus::Failed {
                error: self.error.unwrap_or_else(|| "Conversion échouée".to_string()),
            },
            _ => ConversionStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_url_per_platform() {
        let client = StudioClient::new("https://app.keiro.test/", None);
        assert_eq!(
            client.connect_url(Platform::Tiktok).as_deref(),
            Some("https://app.keiro.test/api/auth/tiktok-oauth")
        );
        assert_eq!(client.connect_url(Platform::Twitter), None);
    }

    #[test]
    fn test_items_envelope_aliases() {
        let json = r#"{"images":[{"id":"1","url":"https://cdn/a.png","kind":"image"}]}"#;
        let items: Items<MediaItem> = serde_json::from_str(json).unwrap();
        assert_eq!(items.items.len(), 1);
        assert_eq!(items.items[0].kind, MediaKind::Image);
    }

    #[test]
    fn test_publish_envelope_shape() {
        let json = r#"{"ok":true,"post":{"permalink":"https://instagram.com/p/abc","imageCount":3}}"#;
        let envelope: PublishEnvelope = serde_json::from_str(json).unwrap();
        let post = envelope.post.unwrap();
        assert_eq!(post.permalink.as_deref(), Some("https://instagram.com/p/abc"));
        assert_eq!(post.image_count, Some(3));
    }

    #[test]
    fn test_conversion_status_mapping() {
        let done: ConversionTask = serde_json::from_str(
            r#"{"taskId":"t1","status":"completed","videoUrl":"https://cdn/v.mp4"}"#,
        )
        .unwrap();
        assert_eq!(
            done.into_status(),
            ConversionStatus::Completed {
                video_url: "https://cdn/v.mp4".to_string()
            }
        );

        let running: ConversionTask =
            serde_json::from_str(r#"{"taskId":"t1","status":"processing"}"#).unwrap();
        assert_eq!(running.into_status(), ConversionStatus::Pending);
    }
}
