//! Publish dispatcher
//!
//! Every publish goes through the same steps: local validation, connection
//! check, explicit confirmation, then one request. Nothing is retried; a
//! failed publish comes back as a [`SupportTicket`].

use chrono::Utc;
use std::time::Duration;

use crate::api::{Assistant, ConversionRequest, ConversionStatus, Library, PublishRequest, Publisher};
use crate::composer::Composer;
use crate::error::{FlowError, SupportTicket, ValidationError};
use crate::models::{Draft, MediaType, Platform};
use crate::profile::{PlatformProfile, PublishRoute, PublishVariant};

/// What the user is asked to confirm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPrompt {
    /// Target platform
    pub platform: Platform,
    /// Account the post goes to, when known
    pub account: Option<String>,
    /// Question shown to the user
    pub message: String,
}

/// Confirmation step before anything leaves the studio
pub trait Confirm {
    /// Return `true` to go ahead
    fn confirm(&self, prompt: &PublishPrompt) -> bool;
}

impl<F: Fn(&PublishPrompt) -> bool> Confirm for F {
    fn confirm(&self, prompt: &PublishPrompt) -> bool {
        self(prompt)
    }
}

/// A post ready to go out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOrder {
    /// Target platform
    pub platform: Platform,
    /// Feed, story or carousel
    pub variant: PublishVariant,
    /// Image, video or text-only
    pub media_type: MediaType,
    /// Final media URL (merged or converted video when present)
    pub media_url: Option<String>,
    /// Carousel images
    pub carousel_urls: Vec<String>,
    /// Caption
    pub caption: String,
    /// Hashtags with leading `#`
    pub hashtags: Vec<String>,
}

impl PublishOrder {
    /// Order for a saved draft
    pub fn from_draft(draft: &Draft) -> Self {
        Self {
            platform: draft.platform,
            variant: PublishVariant::Feed,
            media_type: draft.media_type,
            media_url: draft.media_url.clone(),
            carousel_urls: Vec::new(),
            caption: draft.caption.clone(),
            hashtags: draft.hashtags.clone(),
        }
    }

    /// Check everything that can be checked without a request
    pub fn validate(&self) -> Result<(), FlowError> {
        let profile = PlatformProfile::for_platform(self.platform);

        if !profile.supports_variant(self.variant) {
            return Err(FlowError::InvalidTransition {
                state: "ready",
                action: "publish-variant",
            });
        }
        if self.platform == Platform::Tiktok && self.media_type == MediaType::Image {
            return Err(ValidationError::VideoRequired.into());
        }
        if !profile.allows_publish_media(self.media_type) {
            return Err(ValidationError::UnsupportedMedia {
                platform: self.platform,
                media_type: self.media_type.as_str(),
            }
            .into());
        }
        if self.variant == PublishVariant::Carousel {
            if self.carousel_urls.len() < 2 {
                return Err(ValidationError::NoMedia.into());
            }
        } else if self.media_type != MediaType::TextOnly
            && self.media_url.as_deref().is_none_or(|u| u.trim().is_empty())
        {
            return Err(ValidationError::NoMedia.into());
        }

        if let Some(max) = profile.max_hashtags
            && self.hashtags.len() > max
        {
            return Err(ValidationError::TooManyHashtags { max }.into());
        }
        Composer::with_content(self.platform, &self.caption, &self.hashtags).validate()?;
        Ok(())
    }

    fn request(&self) -> PublishRequest {
        let mut request = PublishRequest::new(
            self.media_type,
            self.media_url.as_deref(),
            &self.caption,
            &self.hashtags,
        );
        if self.variant == PublishVariant::Carousel {
            request.image_url = self.carousel_urls.first().cloned();
            request.image_urls.clone_from(&self.carousel_urls);
        }
        request
    }

    fn full_text(&self) -> String {
        if self.hashtags.is_empty() {
            self.caption.clone()
        } else {
            format!("{} {}", self.caption, self.hashtags.join(" "))
        }
    }
}

/// How the publish ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Published through the platform API
    Published {
        /// Platform
        platform: Platform,
        /// Public link, offered to open
        permalink: Option<String>,
        /// Number of images (carousels)
        image_count: Option<u32>,
    },
    /// Share page to open in the browser with the post prefilled
    WebIntent {
        /// Platform
        platform: Platform,
        /// Prefilled share URL
        url: String,
    },
}

impl PublishOutcome {
    /// URL worth opening after success
    pub fn link(&self) -> Option<&str> {
        match self {
            Self::Published { permalink, .. } => permalink.as_deref(),
            Self::WebIntent { url, .. } => Some(url),
        }
    }
}

/// Polling for image→video conversion jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between polls
    pub interval: Duration,
    /// Polls before giving up
    pub max_polls: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_polls: 60,
        }
    }
}

/// Validates, confirms and sends publish requests
pub struct PublishDispatcher<'a, L, P> {
    library: &'a L,
    publisher: &'a P,
}

impl<'a, L: Library, P: Publisher> PublishDispatcher<'a, L, P> {
    /// Dispatcher over a library (for connections) and a publisher
    pub const fn new(library: &'a L, publisher: &'a P) -> Self {
        Self { library, publisher }
    }

    /// Publish an order after explicit confirmation
    pub async fn publish(
        &self,
        order: &PublishOrder,
        confirm: &impl Confirm,
    ) -> Result<PublishOutcome, FlowError> {
        order.validate()?;
        let profile = PlatformProfile::for_platform(order.platform);

        let account = match profile.connect_route {
            Some(_) => Some(self.active_connection(order.platform).await?),
            None => None,
        };

        let prompt = PublishPrompt {
            platform: order.platform,
            message: match &account {
                Some(handle) => format!("Publier maintenant sur {} ({handle}) ?", order.platform),
                None => format!("Publier maintenant sur {} ?", order.platform),
            },
            account,
        };
        if !confirm.confirm(&prompt) {
            tracing::debug!("Publish to {} cancelled", order.platform);
            return Err(FlowError::Cancelled);
        }

        match profile.publish_route {
            PublishRoute::WebIntent(base) => {
                let mut text = order.full_text();
                if let Some(url) = order.media_url.as_deref().filter(|_| order.media_type != MediaType::TextOnly) {
                    text.push(' ');
                    text.push_str(url);
                }
                let url = format!("{base}?text={}", urlencoding::encode(&text));
                Ok(PublishOutcome::WebIntent {
                    platform: order.platform,
                    url,
                })
            }
            PublishRoute::Api(route) => {
                let route = format!("{route}{}", order.variant.route_suffix());
                let request = order.request();
                match self.publisher.publish(&route, &request).await {
                    Ok(result) => {
                        tracing::info!(
                            "Published to {}: {}",
                            order.platform,
                            result.permalink.as_deref().unwrap_or("(no permalink)")
                        );
                        Ok(PublishOutcome::Published {
                            platform: order.platform,
                            permalink: result.permalink,
                            image_count: result.image_count,
                        })
                    }
                    Err(e) => {
                        tracing::error!("Publish to {} failed: {e:#}", order.platform);
                        Err(FlowError::Support(Box::new(SupportTicket {
                            platform: order.platform,
                            action: route,
                            error: format!("{e:#}"),
                            context: serde_json::json!({
                                "mediaType": order.media_type.as_str(),
                                "mediaUrl": order.media_url,
                                "imageCount": order.carousel_urls.len(),
                                "captionLength": order.caption.chars().count(),
                                "hashtags": order.hashtags,
                            }),
                            occurred_at: Utc::now(),
                        })))
                    }
                }
            }
        }
    }

    async fn active_connection(&self, platform: Platform) -> Result<String, FlowError> {
        let connections = self
            .library
            .connections()
            .await
            .map_err(|e| FlowError::service("connections", &e))?;

        connections
            .iter()
            .find(|c| c.platform == platform && c.is_active())
            .map(|c| c.full_handle())
            .ok_or_else(|| FlowError::NotConnected {
                platform,
                connect_url: self.library.connect_url(platform),
            })
    }
}

/// Turn a still image into a video for TikTok, polling the job until done
pub async fn convert_image_to_video(
    assistant: &impl Assistant,
    image_url: &str,
    prompt: Option<&str>,
    poll: PollSettings,
) -> Result<String, FlowError> {
    let request = ConversionRequest {
        image_url: image_url.to_string(),
        prompt: prompt.map(String::from),
    };
    let task_id = assistant
        .start_video_conversion(&request)
        .await
        .map_err(|e| FlowError::service("convert-video", &e))?;
    tracing::info!("Video conversion started: task {task_id}");

    for attempt in 1..=poll.max_polls {
        tokio::time::sleep(poll.interval).await;
        let status = assistant
            .conversion_status(&task_id)
            .await
            .map_err(|e| FlowError::service("convert-video", &e))?;

        match status {
            ConversionStatus::Pending => {
                tracing::debug!("Conversion {task_id} pending ({attempt}/{})", poll.max_polls);
            }
            ConversionStatus::Completed { video_url } => {
                tracing::info!("Conversion {task_id} completed");
                return Ok(video_url);
            }
            ConversionStatus::Failed { error } => {
                tracing::warn!("Conversion {task_id} failed: {error}");
                return Err(FlowError::Service {
                    action: "convert-video".to_string(),
                    message: error.clone(),
                    detail: format!("task {task_id}: {error}"),
                });
            }
        }
    }

    Err(FlowError::Service {
        action: "convert-video".to_string(),
        message: "La conversion prend plus de temps que prévu. Réessayez plus tard.".to_string(),
        detail: format!("task {task_id} still pending after {} polls", poll.max_polls),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::{
        AudioTrack, MergeRequest, MergedVideo, PublishResult, Suggestion, SuggestionRequest,
        TtsRequest,
    };
    use crate::models::{BrandProfile, Folder, MediaItem, MediaKind, PlatformConnection};
    use anyhow::Result;
    use std::cell::{Cell, RefCell};

    /// Library + publisher double
    #[derive(Default)]
    pub(crate) struct FakeStudio {
        pub connections: Vec<PlatformConnection>,
        pub fail_publish: bool,
        pub publish_calls: Cell<u32>,
        pub last_route: RefCell<Option<String>>,
        pub statuses: RefCell<Vec<ConversionStatus>>,
        pub suggestion: Suggestion,
        pub last_suggestion: RefCell<Option<(String, SuggestionRequest)>>,
    }

    impl FakeStudio {
        pub(crate) fn connected(platforms: &[Platform]) -> Self {
            Self {
                connections: platforms
                    .iter()
                    .map(|p| PlatformConnection::new(*p, "ext-1", "keiro"))
                    .collect(),
                ..Default::default()
            }
        }
    }

    impl Library for FakeStudio {
        async fn list_media(&self, _kind: MediaKind, _limit: usize) -> Result<Vec<MediaItem>> {
            Ok(Vec::new())
        }

        async fn list_folders(&self) -> Result<Vec<Folder>> {
            Ok(Vec::new())
        }

        async fn connections(&self) -> Result<Vec<PlatformConnection>> {
            Ok(self.connections.clone())
        }

        fn connect_url(&self, platform: Platform) -> Option<String> {
            Some(format!("https://app.keiro.test/api/auth/{}-oauth", platform.slug()))
        }

        async fn brand(&self) -> Result<BrandProfile> {
            Ok(BrandProfile::default())
        }

        async fn save_brand(&self, brand: &BrandProfile) -> Result<BrandProfile> {
            Ok(brand.clone())
        }
    }

    impl Publisher for FakeStudio {
        async fn publish(&self, route: &str, request: &PublishRequest) -> Result<PublishResult> {
            self.publish_calls.set(self.publish_calls.get() + 1);
            *self.last_route.borrow_mut() = Some(route.to_string());
            if self.fail_publish {
                anyhow::bail!("Instagram error 400: media not ready");
            }
            Ok(PublishResult {
                id: Some("1789".to_string()),
                permalink: Some("https://instagram.com/p/abc".to_string()),
                image_count: (!request.image_urls.is_empty()).then_some(request.image_urls.len() as u32),
            })
        }
    }

    impl Assistant for FakeStudio {
        async fn suggest(&self, route: &str, request: &SuggestionRequest) -> Result<Suggestion> {
            *self.last_suggestion.borrow_mut() = Some((route.to_string(), request.clone()));
            Ok(self.suggestion.clone())
        }

        async fn generate_audio(&self, _request: &TtsRequest) -> Result<AudioTrack> {
            anyhow::bail!("unused")
        }

        async fn merge_audio_video(&self, _request: &MergeRequest) -> Result<MergedVideo> {
            anyhow::bail!("unused")
        }

        async fn start_video_conversion(&self, _request: &ConversionRequest) -> Result<String> {
            Ok("task-42".to_string())
        }

        async fn conversion_status(&self, _task_id: &str) -> Result<ConversionStatus> {
            let mut statuses = self.statuses.borrow_mut();
            if statuses.is_empty() {
                return Ok(ConversionStatus::Pending);
            }
            Ok(statuses.remove(0))
        }
    }

    fn yes(_: &PublishPrompt) -> bool {
        true
    }

    fn order(platform: Platform, media_type: MediaType, url: Option<&str>) -> PublishOrder {
        PublishOrder {
            platform,
            variant: PublishVariant::Feed,
            media_type,
            media_url: url.map(String::from),
            carousel_urls: Vec::new(),
            caption: "Nouveau menu".to_string(),
            hashtags: vec!["#food".to_string()],
        }
    }

    #[tokio::test]
    async fn test_tiktok_image_rejected_without_request() {
        let studio = FakeStudio::connected(&[Platform::Tiktok]);
        let dispatcher = PublishDispatcher::new(&studio, &studio);
        let asked = Cell::new(false);
        let confirm = |_: &PublishPrompt| {
            asked.set(true);
            true
        };

        let result = dispatcher
            .publish(&order(Platform::Tiktok, MediaType::Image, Some("https://cdn/a.png")), &confirm)
            .await;

        assert!(matches!(result, Err(FlowError::Validation(ValidationError::VideoRequired))));
        assert_eq!(studio.publish_calls.get(), 0);
        assert!(!asked.get());
    }

    #[tokio::test]
    async fn test_not_connected_points_to_oauth() {
        let studio = FakeStudio::default();
        let dispatcher = PublishDispatcher::new(&studio, &studio);

        let result = dispatcher
            .publish(&order(Platform::Linkedin, MediaType::TextOnly, None), &yes)
            .await;

        match result {
            Err(FlowError::NotConnected { platform, connect_url }) => {
                assert_eq!(platform, Platform::Linkedin);
                assert!(connect_url.unwrap().ends_with("/api/auth/linkedin-oauth"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(studio.publish_calls.get(), 0);
    }

    #[tokio::test]
    async fn test_declined_confirmation_sends_nothing() {
        let studio = FakeStudio::connected(&[Platform::Instagram]);
        let dispatcher = PublishDispatcher::new(&studio, &studio);

        let result = dispatcher
            .publish(
                &order(Platform::Instagram, MediaType::Image, Some("https://cdn/a.png")),
                &|_: &PublishPrompt| false,
            )
            .await;

        assert!(matches!(result, Err(FlowError::Cancelled)));
        assert_eq!(studio.publish_calls.get(), 0);
    }

    #[tokio::test]
    async fn test_success_returns_permalink() {
        let studio = FakeStudio::connected(&[Platform::Instagram]);
        let dispatcher = PublishDispatcher::new(&studio, &studio);

        let outcome = dispatcher
            .publish(&order(Platform::Instagram, MediaType::Image, Some("https://cdn/a.png")), &yes)
            .await
            .unwrap();

        assert_eq!(outcome.link(), Some("https://instagram.com/p/abc"));
        assert_eq!(
            studio.last_route.borrow().as_deref(),
            Some("/api/library/instagram/publish")
        );
    }

    #[tokio::test]
    async fn test_hashtags_over_cap_rejected() {
        let studio = FakeStudio::connected(&[Platform::Instagram]);
        let dispatcher = PublishDispatcher::new(&studio, &studio);
        let mut order = order(Platform::Instagram, MediaType::Image, Some("https://cdn/1.png"));
        order.hashtags = (0..35).map(|i| format!("#tag{i}")).collect();

        let result = dispatcher.publish(&order, &yes).await;
        assert!(matches!(
            result,
            Err(FlowError::Validation(ValidationError::TooManyHashtags { max: 30 }))
        ));
        assert_eq!(studio.publish_calls.get(), 0);

        order.hashtags.truncate(30);
        assert!(order.validate().is_ok());
    }

    #[tokio::test]
    async fn test_carousel_and_story_routes() {
        let studio = FakeStudio::connected(&[Platform::Instagram]);
        let dispatcher = PublishDispatcher::new(&studio, &studio);

        let mut carousel = order(Platform::Instagram, MediaType::Image, None);
        carousel.variant = PublishVariant::Carousel;
        carousel.carousel_urls = vec!["https://cdn/1.png".to_string(), "https://cdn/2.png".to_string()];
        let outcome = dispatcher.publish(&carousel, &yes).await.unwrap();
        assert!(matches!(outcome, PublishOutcome::Published { image_count: Some(2), .. }));
        assert_eq!(
            studio.last_route.borrow().as_deref(),
            Some("/api/library/instagram/publish-carousel")
        );

        let mut story = order(Platform::Instagram, MediaType::Image, Some("https://cdn/1.png"));
        story.variant = PublishVariant::Story;
        dispatcher.publish(&story, &yes).await.unwrap();
        assert_eq!(
            studio.last_route.borrow().as_deref(),
            Some("/api/library/instagram/publish-story")
        );
    }

    #[tokio::test]
    async fn test_failure_becomes_support_ticket() {
        let studio = FakeStudio {
            fail_publish: true,
            ..FakeStudio::connected(&[Platform::Instagram])
        };
        let dispatcher = PublishDispatcher::new(&studio, &studio);

        let err = dispatcher
            .publish(&order(Platform::Instagram, MediaType::Image, Some("https://cdn/a.png")), &yes)
            .await
            .unwrap_err();

        let FlowError::Support(ticket) = err else {
            panic!("expected support ticket");
        };
        assert!(ticket.error.contains("media not ready"));
        let details = ticket.technical_details();
        assert!(details.contains("\"mediaUrl\": \"https://cdn/a.png\""));
        assert_eq!(studio.publish_calls.get(), 1);
    }

    #[tokio::test]
    async fn test_x_uses_web_intent() {
        let studio = FakeStudio::default();
        let dispatcher = PublishDispatcher::new(&studio, &studio);

        let outcome = dispatcher
            .publish(&order(Platform::Twitter, MediaType::TextOnly, None), &yes)
            .await
            .unwrap();

        assert_eq!(
            outcome.link(),
            Some("https://twitter.com/intent/tweet?text=Nouveau%20menu%20%23food")
        );
        assert_eq!(studio.publish_calls.get(), 0);
    }

    #[tokio::test]
    async fn test_empty_caption_blocked() {
        let studio = FakeStudio::connected(&[Platform::Instagram]);
        let dispatcher = PublishDispatcher::new(&studio, &studio);
        let mut empty = order(Platform::Instagram, MediaType::Image, Some("https://cdn/a.png"));
        empty.caption = "  ".to_string();

        let result = dispatcher.publish(&empty, &yes).await;
        assert!(matches!(result, Err(FlowError::Validation(ValidationError::EmptyCaption))));
    }

    #[tokio::test]
    async fn test_conversion_polls_until_completed() {
        let studio = FakeStudio::default();
        studio.statuses.borrow_mut().extend([
            ConversionStatus::Pending,
            ConversionStatus::Completed {
                video_url: "https://cdn/converted.mp4".to_string(),
            },
        ]);
        let poll = PollSettings {
            interval: Duration::ZERO,
            max_polls: 5,
        };

        let url = convert_image_to_video(&studio, "https://cdn/a.png", None, poll).await.unwrap();
        assert_eq!(url, "https://cdn/converted.mp4");
    }

    #[tokio::test]
    async fn test_conversion_failure_and_timeout() {
        let studio = FakeStudio::default();
        studio.statuses.borrow_mut().push(ConversionStatus::Failed {
            error: "quota exceeded".to_string(),
        });
        let poll = PollSettings {
            interval: Duration::ZERO,
            max_polls: 3,
        };
        let err = convert_image_to_video(&studio, "https://cdn/a.png", None, poll).await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");

        let err = convert_image_to_video(&studio, "https://cdn/a.png", None, poll).await.unwrap_err();
        assert!(matches!(err, FlowError::Service { ref detail, .. } if detail.contains("3 polls")));
    }
}
