//! Draft persistence
//!
//! Saving with an existing id updates that draft in place; saving without
//! one inserts. Guests keep a single Instagram draft in local storage and
//! never reach the store.

use chrono::Utc;
use uuid::Uuid;

use crate::api::DraftStore;
use crate::composer::{Composer, normalize_hashtag};
use crate::error::{FlowError, ValidationError};
use crate::guest::{KeyValueStore, Session};
use crate::models::{Draft, DraftStatus, MediaType, Platform};
use crate::profile::PlatformProfile;

/// What to save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveDraft {
    /// Draft being edited, if any
    pub id: Option<Uuid>,
    /// Target platform
    pub platform: Platform,
    /// Library item reference
    pub media_ref: Option<String>,
    /// URL to publish
    pub media_url: Option<String>,
    /// Image, video or text-only
    pub media_type: MediaType,
    /// Caption
    pub caption: String,
    /// Hashtags
    pub hashtags: Vec<String>,
    /// `Draft` or `Ready`
    pub status: DraftStatus,
    /// Source before merge/conversion
    pub original_media_url: Option<String>,
    /// Narration script of a merged video
    pub narration_script: Option<String>,
}

impl SaveDraft {
    /// New draft request with no media
    pub fn new(platform: Platform, media_type: MediaType, caption: impl Into<String>) -> Self {
        Self {
            id: None,
            platform,
            media_ref: None,
            media_url: None,
            media_type,
            caption: caption.into(),
            hashtags: Vec::new(),
            status: DraftStatus::Draft,
            original_media_url: None,
            narration_script: None,
        }
    }

    /// Attach media
    pub fn with_media(mut self, media_ref: Option<&str>, media_url: &str) -> Self {
        self.media_ref = media_ref.map(String::from);
        self.media_url = Some(media_url.to_string());
        self
    }

    /// Request to re-save an existing draft
    pub fn from_draft(draft: &Draft) -> Self {
        Self {
            id: Some(draft.id),
            platform: draft.platform,
            media_ref: draft.media_ref.clone(),
            media_url: draft.media_url.clone(),
            media_type: draft.media_type,
            caption: draft.caption.clone(),
            hashtags: draft.hashtags.clone(),
            status: draft.status,
            original_media_url: draft.original_media_url.clone(),
            narration_script: draft.narration_script.clone(),
        }
    }

    /// Check media and caption rules for the target platform
    pub fn validate(&self) -> Result<(), FlowError> {
        let profile = PlatformProfile::for_platform(self.platform);

        if !profile.allows_draft_media(self.media_type) {
            return Err(ValidationError::UnsupportedMedia {
                platform: self.platform,
                media_type: self.media_type.as_str(),
            }
            .into());
        }
        let has_media = self.media_url.as_deref().is_some_and(|u| !u.trim().is_empty());
        if self.media_type != MediaType::TextOnly && !has_media {
            return Err(ValidationError::NoMedia.into());
        }

        match self.status {
            DraftStatus::Draft => Ok(()),
            DraftStatus::Ready => {
                let mut unique: Vec<String> = self.hashtags.iter().filter_map(|t| normalize_hashtag(t)).collect();
                unique.sort_unstable();
                unique.dedup();
                if let Some(max) = profile.max_hashtags
                    && unique.len() > max
                {
                    return Err(ValidationError::TooManyHashtags { max }.into());
                }
                Composer::with_content(self.platform, &self.caption, &self.hashtags).validate()?;
                Ok(())
            }
            DraftStatus::Published => Err(FlowError::InvalidTransition {
                state: "draft",
                action: "save-published",
            }),
        }
    }

    fn into_draft(self) -> Draft {
        let mut hashtags: Vec<String> = Vec::new();
        for tag in self.hashtags.iter().filter_map(|t| normalize_hashtag(t)) {
            if !hashtags.contains(&tag) {
                hashtags.push(tag);
            }
        }

        let mut draft = Draft::new(self.platform, self.media_type, self.caption);
        if let Some(id) = self.id {
            draft.id = id;
        }
        if self.media_type != MediaType::TextOnly {
            draft.media_ref = self.media_ref;
            draft.media_url = self.media_url;
        }
        draft.hashtags = hashtags;
        draft.status = self.status;
        draft.original_media_url = self.original_media_url;
        draft.narration_script = self.narration_script;
        draft.category = draft.derived_category();
        draft
    }
}

/// Saves, lists and deletes drafts for a session
pub struct DraftService<'a, D> {
    store: &'a D,
}

impl<'a, D: DraftStore> DraftService<'a, D> {
    /// Service over a draft store
    pub const fn new(store: &'a D) -> Self {
        Self { store }
    }

    /// Save a draft
    pub async fn save_draft<S: KeyValueStore>(
        &self,
        session: &mut Session<S>,
        request: SaveDraft,
    ) -> Result<Draft, FlowError> {
        if let Session::Guest(guest) = session {
            let profile = PlatformProfile::for_platform(request.platform);
            let existing = guest
                .instagram_draft()
                .map_err(|e| FlowError::service("save-draft", &e))?;
            let is_own_draft = existing
                .as_ref()
                .is_some_and(|d| Some(d.id) == request.id);
            if !profile.guest_allowed || (existing.is_some() && !is_own_draft) {
                tracing::info!("Guest draft blocked for {}", request.platform);
                return Err(FlowError::GuestUpsell {
                    platform: request.platform,
                    message: profile.guest_upsell_message(),
                });
            }

            request.validate()?;
            let mut draft = request.into_draft();
            if let Some(previous) = existing {
                draft.created_at = previous.created_at;
            }
            guest
                .store_instagram_draft(&draft)
                .map_err(|e| FlowError::service("save-draft", &e))?;
            tracing::debug!("Guest draft {} stored locally", draft.id);
            return Ok(draft);
        }

        request.validate()?;
        let editing = request.id.is_some();
        let draft = request.into_draft();

        let saved = if editing {
            self.store.update_draft(&draft).await
        } else {
            self.store.insert_draft(&draft).await
        }
        .map_err(|e| {
            tracing::warn!("Failed to save {} draft: {e:#}", draft.platform);
            FlowError::service("save-draft", &e)
        })?;

        tracing::info!(
            "{} draft {} ({})",
            if editing { "Updated" } else { "Created" },
            saved.id,
            saved.status.as_str()
        );
        Ok(saved)
    }

    /// Drafts of one platform
    pub async fn list<S: KeyValueStore>(
        &self,
        session: &Session<S>,
        platform: Platform,
    ) -> Result<Vec<Draft>, FlowError> {
        match session {
            Session::Guest(guest) => {
                if platform != Platform::Instagram {
                    return Ok(Vec::new());
                }
                let draft = guest
                    .instagram_draft()
                    .map_err(|e| FlowError::service("list-drafts", &e))?;
                Ok(draft.into_iter().collect())
            }
            Session::Authenticated => self
                .store
                .list_drafts(platform)
                .await
                .map_err(|e| FlowError::service("list-drafts", &e)),
        }
    }

    /// Delete a draft
    pub async fn delete<S: KeyValueStore>(
        &self,
        session: &mut Session<S>,
        platform: Platform,
        id: Uuid,
    ) -> Result<(), FlowError> {
        match session {
            Session::Guest(guest) => {
                let owns = guest
                    .instagram_draft()
                    .map_err(|e| FlowError::service("delete-draft", &e))?
                    .is_some_and(|d| d.id == id && platform == Platform::Instagram);
                if owns {
                    guest
                        .delete_instagram_draft()
                        .map_err(|e| FlowError::service("delete-draft", &e))?;
                }
                Ok(())
            }
            Session::Authenticated => self
                .store
                .delete_draft(platform, id)
                .await
                .map_err(|e| FlowError::service("delete-draft", &e)),
        }
    }

    /// Record a successful publish on the draft
    pub async fn mark_published(
        &self,
        draft: &Draft,
        permalink: Option<&str>,
    ) -> Result<Draft, FlowError> {
        let mut published = draft.clone();
        published.status = DraftStatus::Published;
        published.category = published.derived_category();
        published.permalink = permalink.map(String::from);
        published.updated_at = Utc::now();
        self.store
            .update_draft(&published)
            .await
            .map_err(|e| FlowError::service("mark-published", &e))
    }

    /// Record a publish that already went live; a store failure is logged, not returned
    pub async fn record_published(&self, draft: &Draft, permalink: Option<&str>) -> Draft {
        match self.mark_published(draft, permalink).await {
            Ok(published) => published,
            Err(e) => {
                tracing::warn!("Draft {} published but not marked: {e}", draft.id);
                let mut published = draft.clone();
                published.status = DraftStatus::Published;
                published.category = published.derived_category();
                published.permalink = permalink.map(String::from);
                published
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::guest::{GuestSession, MemoryStore};
    use anyhow::Result;
    use std::cell::{Cell, RefCell};

    /// Draft store recording every call
    #[derive(Default)]
    pub(crate) struct FakeDrafts {
        pub drafts: RefCell<Vec<Draft>>,
        pub calls: Cell<u32>,
    }

    impl DraftStore for FakeDrafts {
        async fn list_drafts(&self, platform: Platform) -> Result<Vec<Draft>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self
                .drafts
                .borrow()
                .iter()
                .filter(|d| d.platform == platform)
                .cloned()
                .collect())
        }

        async fn insert_draft(&self, draft: &Draft) -> Result<Draft> {
            self.calls.set(self.calls.get() + 1);
            self.drafts.borrow_mut().push(draft.clone());
            Ok(draft.clone())
        }

        async fn update_draft(&self, draft: &Draft) -> Result<Draft> {
            self.calls.set(self.calls.get() + 1);
            let mut drafts = self.drafts.borrow_mut();
            let slot = drafts
                .iter_mut()
                .find(|d| d.id == draft.id)
                .ok_or_else(|| anyhow::anyhow!("no draft {}", draft.id))?;
            *slot = draft.clone();
            Ok(draft.clone())
        }

        async fn delete_draft(&self, _platform: Platform, id: Uuid) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            self.drafts.borrow_mut().retain(|d| d.id != id);
            Ok(())
        }
    }

    fn guest() -> Session<MemoryStore> {
        Session::Guest(GuestSession::start(MemoryStore::new(), "ana@example.com").unwrap())
    }

    fn image_draft(platform: Platform) -> SaveDraft {
        SaveDraft::new(platform, MediaType::Image, "Nouveau menu")
            .with_media(Some("m1"), "https://cdn/menu.png")
    }

    #[tokio::test]
    async fn test_guest_second_instagram_draft_is_upsold() {
        let store = FakeDrafts::default();
        let service = DraftService::new(&store);
        let mut session = guest();

        service.save_draft(&mut session, image_draft(Platform::Instagram)).await.unwrap();
        let err = service
            .save_draft(&mut session, image_draft(Platform::Instagram))
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::GuestUpsell { platform: Platform::Instagram, .. }));
        assert_eq!(store.calls.get(), 0);
        assert_eq!(service.list(&session, Platform::Instagram).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_guest_can_edit_own_draft() {
        let store = FakeDrafts::default();
        let service = DraftService::new(&store);
        let mut session = guest();

        let first = service.save_draft(&mut session, image_draft(Platform::Instagram)).await.unwrap();
        let mut edit = SaveDraft::from_draft(&first);
        edit.caption = "Menu du jour".to_string();
        let edited = service.save_draft(&mut session, edit).await.unwrap();

        assert_eq!(edited.id, first.id);
        assert_eq!(edited.created_at, first.created_at);
        let listed = service.list(&session, Platform::Instagram).await.unwrap();
        assert_eq!(listed[0].caption, "Menu du jour");
    }

    #[tokio::test]
    async fn test_guest_other_platforms_are_upsold() {
        let store = FakeDrafts::default();
        let service = DraftService::new(&store);
        let mut session = guest();

        for platform in [Platform::Tiktok, Platform::Linkedin, Platform::Twitter] {
            let request = SaveDraft::new(platform, MediaType::TextOnly, "hello");
            let err = service.save_draft(&mut session, request).await.unwrap_err();
            assert!(matches!(err, FlowError::GuestUpsell { .. }), "{platform}");
        }
        assert_eq!(store.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_edit_updates_in_place() {
        let store = FakeDrafts::default();
        let service = DraftService::new(&store);
        let mut session: Session<MemoryStore> = Session::Authenticated;

        let draft = service.save_draft(&mut session, image_draft(Platform::Tiktok)).await.unwrap();
        let mut edit = SaveDraft::from_draft(&draft);
        edit.hashtags = vec!["food".to_string(), "#food".to_string()];
        let saved = service.save_draft(&mut session, edit).await.unwrap();

        assert_eq!(store.drafts.borrow().len(), 1);
        assert_eq!(saved.hashtags, vec!["#food".to_string()]);
    }

    #[tokio::test]
    async fn test_media_rules() {
        let store = FakeDrafts::default();
        let service = DraftService::new(&store);
        let mut session: Session<MemoryStore> = Session::Authenticated;

        let no_media = SaveDraft::new(Platform::Instagram, MediaType::Image, "hello");
        assert!(matches!(
            service.save_draft(&mut session, no_media).await,
            Err(FlowError::Validation(ValidationError::NoMedia))
        ));

        let text_only = SaveDraft::new(Platform::Tiktok, MediaType::TextOnly, "hello");
        assert!(matches!(
            service.save_draft(&mut session, text_only).await,
            Err(FlowError::Validation(ValidationError::UnsupportedMedia { .. }))
        ));

        let linkedin = SaveDraft::new(Platform::Linkedin, MediaType::TextOnly, "hello")
            .with_media(Some("m1"), "https://cdn/ignored.png");
        let saved = service.save_draft(&mut session, linkedin).await.unwrap();
        assert!(saved.media_ref.is_none());
        assert!(saved.media_url.is_none());
        assert_eq!(store.calls.get(), 1);
    }

    #[tokio::test]
    async fn test_ready_requires_valid_caption() {
        let store = FakeDrafts::default();
        let service = DraftService::new(&store);
        let mut session: Session<MemoryStore> = Session::Authenticated;

        let mut request = SaveDraft::new(Platform::Twitter, MediaType::TextOnly, "a".repeat(279));
        request.hashtags = vec!["x".to_string()];
        request.status = DraftStatus::Ready;
        assert!(matches!(
            service.save_draft(&mut session, request.clone()).await,
            Err(FlowError::Validation(ValidationError::OverLimit { .. }))
        ));

        request.status = DraftStatus::Draft;
        assert!(service.save_draft(&mut session, request).await.is_ok());
    }

    #[tokio::test]
    async fn test_ready_rejects_hashtags_over_cap() {
        let store = FakeDrafts::default();
        let service = DraftService::new(&store);
        let mut session: Session<MemoryStore> = Session::Authenticated;

        let mut request = image_draft(Platform::Instagram);
        request.hashtags = (0..31).map(|i| format!("tag{i}")).collect();
        request.hashtags.push("#tag0".to_string());
        request.status = DraftStatus::Ready;
        assert!(matches!(
            service.save_draft(&mut session, request.clone()).await,
            Err(FlowError::Validation(ValidationError::TooManyHashtags { max: 30 }))
        ));
        assert_eq!(store.calls.get(), 0);

        request.hashtags.truncate(30);
        assert!(service.save_draft(&mut session, request).await.is_ok());
    }

    #[tokio::test]
    async fn test_mark_published() {
        let store = FakeDrafts::default();
        let service = DraftService::new(&store);
        let mut session: Session<MemoryStore> = Session::Authenticated;

        let draft = service.save_draft(&mut session, image_draft(Platform::Instagram)).await.unwrap();
        let published = service
            .mark_published(&draft, Some("https://instagram.com/p/1"))
            .await
            .unwrap();
        assert_eq!(published.status, DraftStatus::Published);
        assert_eq!(store.drafts.borrow()[0].permalink.as_deref(), Some("https://instagram.com/p/1"));
    }

    #[tokio::test]
    async fn test_record_published_survives_store_failure() {
        let store = FakeDrafts::default();
        let service = DraftService::new(&store);
        let draft = Draft::new(Platform::Linkedin, MediaType::TextOnly, "Nous recrutons");

        let published = service
            .record_published(&draft, Some("https://linkedin.com/feed/update/1"))
            .await;

        assert_eq!(store.calls.get(), 1);
        assert_eq!(published.status, DraftStatus::Published);
        assert_eq!(published.permalink.as_deref(), Some("https://linkedin.com/feed/update/1"));
    }
}
