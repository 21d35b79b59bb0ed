//! Per-platform publishing profiles
//!
//! Every platform-specific rule the compose flow needs (caption caps, media
//! requirements, available tabs, routes, subtitle styles) lives here, so the
//! rest of the crate stays generic over [`Platform`].

use crate::models::{MediaType, Platform};

/// Caption cap for Instagram and TikTok
pub const LONG_CAPTION_LIMIT: usize = 2200;
/// Caption cap for LinkedIn
pub const LINKEDIN_CAPTION_LIMIT: usize = 3000;
/// Caption cap for X, hashtags included
pub const X_CAPTION_LIMIT: usize = 280;

/// Library tab shown in the media picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentTab {
    /// Image library
    #[default]
    Images,
    /// Video library
    Videos,
    /// Compose without media
    TextOnly,
}

impl ContentTab {
    /// Media type a selection from this tab produces
    pub const fn media_type(&self) -> MediaType {
        match self {
            Self::Images => MediaType::Image,
            Self::Videos => MediaType::Video,
            Self::TextOnly => MediaType::TextOnly,
        }
    }

    /// Get the display name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Images => "Images",
            Self::Videos => "Vidéos",
            Self::TextOnly => "Texte seul",
        }
    }
}

/// How a platform receives the final post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishRoute {
    /// Internal API route that publishes through the platform API
    Api(&'static str),
    /// Share URL opened in the browser with the text prefilled
    WebIntent(&'static str),
}

/// Instagram publish variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishVariant {
    /// Regular feed post
    #[default]
    Feed,
    /// Story (24h)
    Story,
    /// Multi-image carousel
    Carousel,
}

impl PublishVariant {
    /// Route suffix appended to the platform publish route
    pub const fn route_suffix(&self) -> &'static str {
        match self {
            Self::Feed => "",
            Self::Story => "-story",
            Self::Carousel => "-carousel",
        }
    }
}

/// A burned-in subtitle look
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubtitleStyle {
    /// Identifier sent to the merge endpoint
    pub id: &'static str,
    /// Label shown in the picker
    pub label: &'static str,
}

const INSTAGRAM_SUBTITLES: &[SubtitleStyle] = &[
    SubtitleStyle { id: "classic", label: "Classique" },
    SubtitleStyle { id: "bold", label: "Impact" },
    SubtitleStyle { id: "neon", label: "Néon" },
    SubtitleStyle { id: "minimal", label: "Minimal" },
    SubtitleStyle { id: "boxed", label: "Encadré" },
    SubtitleStyle { id: "karaoke", label: "Karaoké" },
];

const TIKTOK_SUBTITLES: &[SubtitleStyle] = &[
    SubtitleStyle { id: "classic", label: "Classique" },
    SubtitleStyle { id: "bold", label: "Impact" },
    SubtitleStyle { id: "outline", label: "Contour" },
    SubtitleStyle { id: "highlight", label: "Surligné" },
    SubtitleStyle { id: "bubble", label: "Bulle" },
];

/// Caps applied to AI suggestions before they reach the composer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionLimits {
    /// Maximum caption characters kept
    pub max_chars: usize,
    /// Maximum hashtags kept
    pub max_hashtags: usize,
}

/// Everything that differs between platforms in the compose/publish flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    /// Platform this profile describes
    pub platform: Platform,
    /// Maximum caption length
    pub max_caption_len: usize,
    /// Whether hashtags count toward `max_caption_len`
    pub hashtags_count_toward_limit: bool,
    /// Maximum number of hashtags, if capped
    pub max_hashtags: Option<usize>,
    /// Tabs offered in the media picker
    pub tabs: &'static [ContentTab],
    /// Media types a draft may carry
    pub draft_media: &'static [MediaType],
    /// Media types the platform accepts at publish time
    pub publish_media: &'static [MediaType],
    /// Publish refuses an empty caption
    pub requires_caption: bool,
    /// AI suggestion route
    pub suggestion_route: &'static str,
    /// Caps applied to suggestions
    pub suggestion_limits: Option<SuggestionLimits>,
    /// Where the final post goes
    pub publish_route: PublishRoute,
    /// OAuth connect route, when the platform needs a linked account
    pub connect_route: Option<&'static str>,
    /// Library route listing this platform's drafts
    pub drafts_route: &'static str,
    /// Subtitle styles offered for narrated videos
    pub subtitle_styles: &'static [SubtitleStyle],
    /// Guests may save drafts for this platform
    pub guest_allowed: bool,
}

const INSTAGRAM: PlatformProfile = PlatformProfile {
    platform: Platform::Instagram,
    max_caption_len: LONG_CAPTION_LIMIT,
    hashtags_count_toward_limit: false,
    max_hashtags: Some(30),
    tabs: &[ContentTab::Images, ContentTab::Videos],
    draft_media: &[MediaType::Image, MediaType::Video],
    publish_media: &[MediaType::Image, MediaType::Video],
    requires_caption: true,
    suggestion_route: "/api/instagram/suggest",
    suggestion_limits: None,
    publish_route: PublishRoute::Api("/api/library/instagram/publish"),
    connect_route: Some("/api/auth/instagram-oauth"),
    drafts_route: "/api/library/instagram-drafts",
    subtitle_styles: INSTAGRAM_SUBTITLES,
    guest_allowed: true,
};

const TIKTOK: PlatformProfile = PlatformProfile {
    platform: Platform::Tiktok,
    max_caption_len: LONG_CAPTION_LIMIT,
    hashtags_count_toward_limit: false,
    max_hashtags: None,
    tabs: &[ContentTab::Images, ContentTab::Videos],
    draft_media: &[MediaType::Image, MediaType::Video],
    publish_media: &[MediaType::Video],
    requires_caption: true,
    suggestion_route: "/api/tiktok/suggest",
    suggestion_limits: None,
    publish_route: PublishRoute::Api("/api/library/tiktok/publish"),
    connect_route: Some("/api/auth/tiktok-oauth"),
    drafts_route: "/api/library/tiktok-drafts",
    subtitle_styles: TIKTOK_SUBTITLES,
    guest_allowed: false,
};

const LINKEDIN: PlatformProfile = PlatformProfile {
    platform: Platform::Linkedin,
    max_caption_len: LINKEDIN_CAPTION_LIMIT,
    hashtags_count_toward_limit: false,
    max_hashtags: None,
    tabs: &[ContentTab::Images, ContentTab::Videos, ContentTab::TextOnly],
    draft_media: &[MediaType::Image, MediaType::Video, MediaType::TextOnly],
    publish_media: &[MediaType::Image, MediaType::Video, MediaType::TextOnly],
    requires_caption: true,
    suggestion_route: "/api/instagram/suggest",
    suggestion_limits: None,
    publish_route: PublishRoute::Api("/api/library/linkedin/publish"),
    connect_route: Some("/api/auth/linkedin-oauth"),
    drafts_route: "/api/library/linkedin-drafts",
    subtitle_styles: &[],
    guest_allowed: false,
};

const TWITTER: PlatformProfile = PlatformProfile {
    platform: Platform::Twitter,
    max_caption_len: X_CAPTION_LIMIT,
    hashtags_count_toward_limit: true,
    max_hashtags: None,
    tabs: &[ContentTab::Images, ContentTab::Videos, ContentTab::TextOnly],
    draft_media: &[MediaType::Image, MediaType::Video, MediaType::TextOnly],
    publish_media: &[MediaType::Image, MediaType::Video, MediaType::TextOnly],
    requires_caption: true,
    suggestion_route: "/api/instagram/suggest",
    suggestion_limits: Some(SuggestionLimits {
        max_chars: 250,
        max_hashtags: 3,
    }),
    publish_route: PublishRoute::WebIntent("https://twitter.com/intent/tweet"),
    connect_route: None,
    drafts_route: "/api/library/twitter-drafts",
    subtitle_styles: &[],
    guest_allowed: false,
};

impl PlatformProfile {
    /// Profile for a platform
    pub const fn for_platform(platform: Platform) -> &'static Self {
        match platform {
            Platform::Instagram => &INSTAGRAM,
            Platform::Tiktok => &TIKTOK,
            Platform::Linkedin => &LINKEDIN,
            Platform::Twitter => &TWITTER,
        }
    }

    /// Whether drafts may be saved without media
    pub fn supports_text_only(&self) -> bool {
        self.draft_media.contains(&MediaType::TextOnly)
    }

    /// Whether narration (TTS + merge) is offered
    pub fn supports_narration(&self) -> bool {
        !self.subtitle_styles.is_empty()
    }

    /// Whether a draft may carry this media type
    pub fn allows_draft_media(&self, media_type: MediaType) -> bool {
        self.draft_media.contains(&media_type)
    }

    /// Whether the platform accepts this media type at publish time
    pub fn allows_publish_media(&self, media_type: MediaType) -> bool {
        self.publish_media.contains(&media_type)
    }

    /// Whether a tab is offered
    pub fn has_tab(&self, tab: ContentTab) -> bool {
        self.tabs.contains(&tab)
    }

    /// Whether the publish variant is offered
    pub fn supports_variant(&self, variant: PublishVariant) -> bool {
        match variant {
            PublishVariant::Feed => true,
            PublishVariant::Story | PublishVariant::Carousel => self.platform == Platform::Instagram,
        }
    }

    /// Look up a subtitle style by id
    pub fn subtitle_style(&self, id: &str) -> Option<SubtitleStyle> {
        self.subtitle_styles.iter().copied().find(|s| s.id == id)
    }

    /// Message shown to guests trying a platform they cannot use
    pub fn guest_upsell_message(&self) -> String {
        if self.guest_allowed {
            format!(
                "Le mode invité est limité à un brouillon {}. Créez un compte gratuit pour en enregistrer davantage.",
                self.platform.name()
            )
        } else {
            format!(
                "{} est réservé aux comptes Keiro. Créez un compte gratuit pour préparer vos posts {}.",
                self.platform.name(),
                self.platform.name()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caps() {
        assert_eq!(PlatformProfile::for_platform(Platform::Instagram).max_caption_len, 2200);
        assert_eq!(PlatformProfile::for_platform(Platform::Tiktok).max_caption_len, 2200);
        assert_eq!(PlatformProfile::for_platform(Platform::Linkedin).max_caption_len, 3000);
        assert_eq!(PlatformProfile::for_platform(Platform::Twitter).max_caption_len, 280);
    }

    #[test]
    fn test_text_only_platforms() {
        assert!(PlatformProfile::for_platform(Platform::Linkedin).supports_text_only());
        assert!(PlatformProfile::for_platform(Platform::Twitter).supports_text_only());
        assert!(!PlatformProfile::for_platform(Platform::Instagram).supports_text_only());
        assert!(!PlatformProfile::for_platform(Platform::Tiktok).supports_text_only());
    }

    #[test]
    fn test_subtitle_style_sets() {
        assert_eq!(PlatformProfile::for_platform(Platform::Instagram).subtitle_styles.len(), 6);
        assert_eq!(PlatformProfile::for_platform(Platform::Tiktok).subtitle_styles.len(), 5);
        assert!(!PlatformProfile::for_platform(Platform::Linkedin).supports_narration());
    }

    #[test]
    fn test_tiktok_publishes_video_only() {
        let tiktok = PlatformProfile::for_platform(Platform::Tiktok);
        assert!(tiktok.allows_draft_media(MediaType::Image));
        assert!(!tiktok.allows_publish_media(MediaType::Image));
        assert!(tiktok.allows_publish_media(MediaType::Video));
    }

    #[test]
    fn test_only_instagram_has_story_and_carousel() {
        for platform in Platform::all() {
            let profile = PlatformProfile::for_platform(*platform);
            assert_eq!(
                profile.supports_variant(PublishVariant::Carousel),
                *platform == Platform::Instagram
            );
        }
    }
}
