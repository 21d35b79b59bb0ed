//! One compose/publish session for a single platform
//!
//! [`PublishFlow`] ties together the media picker, the composer and the
//! narration pipeline, and turns their state into draft saves and publish
//! orders. Every platform runs the same flow; what differs lives in its
//! [`PlatformProfile`].

use uuid::Uuid;

use crate::api::{Assistant, DraftStore, Library, Publisher, SuggestionRequest};
use crate::composer::Composer;
use crate::drafts::{DraftService, SaveDraft};
use crate::error::{FlowError, ValidationError};
use crate::guest::{KeyValueStore, Session};
use crate::models::{BrandProfile, Draft, DraftStatus, MediaItem, MediaKind, MediaType, Platform};
use crate::narration::{Narration, VoiceSettings};
use crate::profile::{ContentTab, PlatformProfile, PublishVariant};
use crate::publish::{
    Confirm, PollSettings, PublishDispatcher, PublishOrder, PublishOutcome, convert_image_to_video,
};
use crate::selection::MediaSelection;

/// Compose/publish session
#[derive(Debug, Clone)]
pub struct PublishFlow {
    profile: &'static PlatformProfile,
    selection: MediaSelection,
    composer: Composer,
    narration: Narration,
    draft_id: Option<Uuid>,
    converted_video: Option<String>,
    original_media_url: Option<String>,
    carousel: Vec<String>,
}

impl PublishFlow {
    /// Fresh session
    pub fn new(platform: Platform, page_size: usize, authenticated: bool, voice: VoiceSettings) -> Self {
        Self {
            profile: PlatformProfile::for_platform(platform),
            selection: MediaSelection::new(platform, page_size, authenticated),
            composer: Composer::new(platform),
            narration: Narration::new(platform, voice),
            draft_id: None,
            converted_video: None,
            original_media_url: None,
            carousel: Vec::new(),
        }
    }

    /// Re-open a saved draft for editing
    pub fn from_draft(draft: &Draft, page_size: usize, authenticated: bool, voice: VoiceSettings) -> Self {
        let mut flow = Self::new(draft.platform, page_size, authenticated, voice);
        flow.composer = Composer::with_content(draft.platform, &draft.caption, &draft.hashtags);
        flow.draft_id = Some(draft.id);

        match (draft.media_type, draft.media_url.as_deref()) {
            (MediaType::TextOnly, _) | (_, None) => {
                if flow.profile.has_tab(ContentTab::TextOnly) {
                    flow.selection.switch_tab(ContentTab::TextOnly);
                }
            }
            (media_type, Some(url)) => {
                let kind = if media_type == MediaType::Video { MediaKind::Video } else { MediaKind::Image };
                let id = draft.media_ref.clone().unwrap_or_else(|| draft.id.to_string());
                flow.select_item(MediaItem::new(id, url, kind));
            }
        }
        flow.original_media_url.clone_from(&draft.original_media_url);
        flow
    }

    /// Target platform
    pub const fn platform(&self) -> Platform {
        self.profile.platform
    }

    /// Platform profile
    pub const fn profile(&self) -> &'static PlatformProfile {
        self.profile
    }

    /// Draft being edited
    pub const fn draft_id(&self) -> Option<Uuid> {
        self.draft_id
    }

    /// Media picker
    pub const fn selection(&self) -> &MediaSelection {
        &self.selection
    }

    /// Caption and hashtags
    pub const fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Caption and hashtags, mutable
    pub const fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    /// Narration pipeline
    pub const fn narration(&self) -> &Narration {
        &self.narration
    }

    /// Narration pipeline, mutable
    pub const fn narration_mut(&mut self) -> &mut Narration {
        &mut self.narration
    }

    /// Fetch the library for the picker
    pub async fn load(&mut self, library: &impl Library) -> Result<(), FlowError> {
        self.selection
            .load(library)
            .await
            .map_err(|e| FlowError::service("load-library", &e))
    }

    /// Switch content tab; caption and hashtags are kept
    pub fn switch_tab(&mut self, tab: ContentTab) -> bool {
        let had_selection = self.selection.selected().is_some();
        let switched = self.selection.switch_tab(tab);
        if had_selection && self.selection.selected().is_none() {
            self.reset_derived();
        }
        switched
    }

    /// Select a candidate by id
    pub fn select(&mut self, id: &str) -> bool {
        let changed = self.selection.select(id);
        if changed {
            self.reset_derived();
        }
        changed
    }

    /// Select an item that may not be in the candidate lists
    pub fn select_item(&mut self, item: MediaItem) -> bool {
        let changed = self.selection.select_item(item);
        if changed {
            self.reset_derived();
        }
        changed
    }

    /// Images for an Instagram carousel, in order
    pub fn set_carousel(&mut self, urls: Vec<String>) {
        self.carousel = urls;
    }

    /// Ask the suggestion service for a caption, overwriting the composer
    pub async fn suggest(
        &mut self,
        assistant: &impl Assistant,
        brand: Option<&BrandProfile>,
        angle: Option<&str>,
    ) -> Result<(), FlowError> {
        let selected = self.selection.selected();
        let request = SuggestionRequest {
            content_url: selected.map(|m| m.url.clone()),
            content_title: selected.and_then(|m| m.title.clone()),
            category: brand.and_then(|b| b.category.clone()),
            angle: angle
                .map(String::from)
                .or_else(|| brand.and_then(|b| b.tone.clone())),
            platform: self.platform(),
        };

        let suggestion = assistant
            .suggest(self.profile.suggestion_route, &request)
            .await
            .map_err(|e| {
                tracing::warn!("Suggestion for {} failed: {e:#}", self.platform());
                FlowError::service("suggest", &e)
            })?;
        self.composer.apply_suggestion(suggestion);
        Ok(())
    }

    /// Convert the selected image into a video (TikTok)
    pub async fn convert_to_video(
        &mut self,
        assistant: &impl Assistant,
        prompt: Option<&str>,
        poll: PollSettings,
    ) -> Result<&str, FlowError> {
        let image_url = match self.selection.selected() {
            Some(item) if item.kind == MediaKind::Image => item.url.clone(),
            _ => return Err(ValidationError::NoMedia.into()),
        };

        let video_url = convert_image_to_video(assistant, &image_url, prompt, poll).await?;
        self.narration.set_video(Some(&video_url));
        self.selection.set_preview_url(Some(video_url.clone()));
        self.original_media_url = Some(image_url);
        Ok(self.converted_video.insert(video_url).as_str())
    }

    /// Media that would go out, after conversion and narration
    pub fn publish_media(&self) -> Result<(MediaType, Option<String>), FlowError> {
        let media_type = self.selection.media_type();
        if media_type == MediaType::TextOnly {
            return Ok((MediaType::TextOnly, None));
        }
        let Some(item) = self.selection.selected() else {
            return Err(ValidationError::NoMedia.into());
        };

        match (&self.converted_video, item.kind) {
            (Some(video), MediaKind::Image) => {
                let url = self.narration.publish_target(video)?;
                Ok((MediaType::Video, Some(url.to_string())))
            }
            (_, MediaKind::Video) => {
                let url = self.narration.publish_target(&item.url)?;
                Ok((MediaType::Video, Some(url.to_string())))
            }
            (None, MediaKind::Image) => Ok((MediaType::Image, Some(item.url.clone()))),
        }
    }

    /// Save request built from the current state
    pub fn draft_request(&self, status: DraftStatus) -> SaveDraft {
        let media_type = self.selection.media_type();
        let source = self.source_url();
        let merged = self.narration.merged_video_url();
        let media_url = merged.map(String::from).or_else(|| source.clone());

        let original = if media_url != self.selection.selected().map(|m| m.url.clone()) {
            self.original_media_url
                .clone()
                .or_else(|| self.selection.selected().map(|m| m.url.clone()))
        } else {
            self.original_media_url.clone()
        };

        SaveDraft {
            id: self.draft_id,
            platform: self.platform(),
            media_ref: self.selection.selected().map(|m| m.id.clone()),
            media_url: if media_type == MediaType::TextOnly { None } else { media_url },
            media_type: if self.converted_video.is_some() { MediaType::Video } else { media_type },
            caption: self.composer.caption().to_string(),
            hashtags: self.composer.hashtags().to_vec(),
            status,
            original_media_url: original,
            narration_script: merged.map(|_| self.narration.script().to_string()),
        }
    }

    /// Save as a draft (or ready); later saves update the same draft
    pub async fn save_draft<D: DraftStore, S: KeyValueStore>(
        &mut self,
        drafts: &DraftService<'_, D>,
        session: &mut Session<S>,
        status: DraftStatus,
    ) -> Result<Draft, FlowError> {
        if status == DraftStatus::Ready && self.narration.wants_audio() && self.narration.merged_video_url().is_none() {
            return Err(FlowError::NarrationPending);
        }
        let saved = drafts.save_draft(session, self.draft_request(status)).await?;
        self.draft_id = Some(saved.id);
        Ok(saved)
    }

    /// Publish order built from the current state
    pub fn order(&self, variant: PublishVariant) -> Result<PublishOrder, FlowError> {
        let (media_type, media_url) = if variant == PublishVariant::Carousel {
            (MediaType::Image, None)
        } else {
            self.publish_media()?
        };
        Ok(PublishOrder {
            platform: self.platform(),
            variant,
            media_type,
            media_url,
            carousel_urls: if variant == PublishVariant::Carousel { self.carousel.clone() } else { Vec::new() },
            caption: self.composer.caption().to_string(),
            hashtags: self.composer.hashtags().to_vec(),
        })
    }

    /// Publish with confirmation
    pub async fn publish<L: Library, P: Publisher>(
        &self,
        dispatcher: &PublishDispatcher<'_, L, P>,
        variant: PublishVariant,
        confirm: &impl Confirm,
    ) -> Result<PublishOutcome, FlowError> {
        let order = self.order(variant)?;
        dispatcher.publish(&order, confirm).await
    }

    fn source_url(&self) -> Option<String> {
        self.converted_video
            .clone()
            .or_else(|| self.selection.selected().map(|m| m.url.clone()))
    }

    fn reset_derived(&mut self) {
        self.converted_video = None;
        self.original_media_url = None;
        let video = self
            .selection
            .selected()
            .filter(|m| m.kind == MediaKind::Video)
            .map(|m| m.url.clone());
        self.narration.set_video(video.as_deref());
    }
}
