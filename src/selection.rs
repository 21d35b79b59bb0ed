//! Media selection for one platform's compose flow

use anyhow::Result;

use crate::api::Library;
use crate::models::{MediaItem, MediaKind, MediaType, Platform};
use crate::profile::{ContentTab, PlatformProfile};

/// What to show when the current tab has nothing to pick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZeroState {
    /// Guest with an empty library: explain how to produce content
    Onboarding {
        /// Explanation shown to the user
        message: String,
    },
    /// Signed-in user with nothing of this kind yet
    EmptyLibrary {
        /// Explanation shown to the user
        message: String,
    },
}

/// Candidate list plus a single selected item, per content tab
#[derive(Debug, Clone)]
pub struct MediaSelection {
    profile: &'static PlatformProfile,
    tab: ContentTab,
    images: Vec<MediaItem>,
    videos: Vec<MediaItem>,
    folder: Option<String>,
    selected: Option<MediaItem>,
    preview_url: Option<String>,
    page_size: usize,
    authenticated: bool,
}

impl MediaSelection {
    /// Empty selection for a platform
    pub fn new(platform: Platform, page_size: usize, authenticated: bool) -> Self {
        let profile = PlatformProfile::for_platform(platform);
        Self {
            profile,
            tab: profile.tabs.first().copied().unwrap_or_default(),
            images: Vec::new(),
            videos: Vec::new(),
            folder: None,
            selected: None,
            preview_url: None,
            page_size,
            authenticated,
        }
    }

    /// Seed candidates from an already-fetched list (split by kind)
    pub fn with_items(mut self, items: Vec<MediaItem>) -> Self {
        let (videos, images): (Vec<_>, Vec<_>) =
            items.into_iter().partition(|i| i.kind == MediaKind::Video);
        self.set_items(MediaKind::Image, images);
        self.set_items(MediaKind::Video, videos);
        self
    }

    /// Fetch candidates for every media tab the platform offers
    pub async fn load(&mut self, library: &impl Library) -> Result<()> {
        if self.profile.has_tab(ContentTab::Images) {
            let images = library.list_media(MediaKind::Image, self.page_size).await?;
            self.set_items(MediaKind::Image, images);
        }
        if self.profile.has_tab(ContentTab::Videos) {
            let videos = library.list_media(MediaKind::Video, self.page_size).await?;
            self.set_items(MediaKind::Video, videos);
        }
        tracing::debug!(
            "Loaded {} images and {} videos for {}",
            self.images.len(),
            self.videos.len(),
            self.profile.platform
        );
        Ok(())
    }

    /// Replace the candidates of one kind, capped at the page size
    pub fn set_items(&mut self, kind: MediaKind, mut items: Vec<MediaItem>) {
        items.retain(|i| i.kind == kind);
        items.truncate(self.page_size);
        match kind {
            MediaKind::Image => self.images = items,
            MediaKind::Video => self.videos = items,
        }
    }

    /// Active tab
    pub const fn tab(&self) -> ContentTab {
        self.tab
    }

    /// Switch tab; returns `false` when the platform does not offer it
    ///
    /// A selection that does not belong to the new tab is dropped along
    /// with its derived preview.
    pub fn switch_tab(&mut self, tab: ContentTab) -> bool {
        if !self.profile.has_tab(tab) {
            return false;
        }
        if tab == self.tab {
            return true;
        }
        self.tab = tab;
        let keeps_selection = self
            .selected
            .as_ref()
            .is_some_and(|item| MediaType::from(item.kind) == tab.media_type());
        if !keeps_selection {
            self.selected = None;
            self.preview_url = None;
        }
        true
    }

    /// Restrict candidates to one folder (or none)
    pub fn filter_folder(&mut self, folder_id: Option<&str>) {
        self.folder = folder_id.map(String::from);
    }

    /// Candidates of the active tab
    pub fn candidates(&self) -> Vec<&MediaItem> {
        let items = match self.tab {
            ContentTab::Images => &self.images,
            ContentTab::Videos => &self.videos,
            ContentTab::TextOnly => return Vec::new(),
        };
        items
            .iter()
            .filter(|i| self.folder.is_none() || i.folder_id == self.folder)
            .collect()
    }

    /// Select a candidate by id; returns `true` when the selection changed
    ///
    /// Any derived preview belongs to the previous selection and is reset.
    pub fn select(&mut self, id: &str) -> bool {
        let Some(item) = self.candidates().into_iter().find(|i| i.id == id).cloned() else {
            return false;
        };
        self.select_item(item)
    }

    /// Select an item that may not come from the candidate lists
    pub fn select_item(&mut self, item: MediaItem) -> bool {
        if self.selected.as_ref().is_some_and(|s| s.id == item.id && s.url == item.url) {
            return false;
        }
        self.tab = match item.kind {
            MediaKind::Image => ContentTab::Images,
            MediaKind::Video => ContentTab::Videos,
        };
        self.selected = Some(item);
        self.preview_url = None;
        true
    }

    /// Selected item
    pub const fn selected(&self) -> Option<&MediaItem> {
        self.selected.as_ref()
    }

    /// Media type the draft would carry
    pub fn media_type(&self) -> MediaType {
        match (self.tab, &self.selected) {
            (ContentTab::TextOnly, _) => MediaType::TextOnly,
            (_, Some(item)) => item.kind.into(),
            (tab, None) => tab.media_type(),
        }
    }

    /// Preview URL derived from the selection (generated video preview)
    pub fn preview_url(&self) -> Option<&str> {
        self.preview_url.as_deref()
    }

    /// Set the derived preview URL
    pub fn set_preview_url(&mut self, url: Option<String>) {
        self.preview_url = url;
    }

    /// Zero state to render, if the active tab has nothing to pick
    pub fn zero_state(&self) -> Option<ZeroState> {
        if self.tab == ContentTab::TextOnly || !self.candidates().is_empty() {
            return None;
        }
        let kind = if self.tab == ContentTab::Videos { "vidéo" } else { "image" };
        if self.authenticated {
            Some(ZeroState::EmptyLibrary {
                message: format!("Aucune {kind} dans votre bibliothèque pour le moment."),
            })
        } else {
            Some(ZeroState::Onboarding {
                message: format!(
                    "Générez votre premier visuel depuis l'accueil : votre {kind} apparaîtra ici, prête à être publiée sur {}.",
                    self.profile.platform
                ),
            })
        }
    }
}
