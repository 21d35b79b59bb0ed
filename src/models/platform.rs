//! Platform type definitions

use serde::{Deserialize, Serialize};

/// Social platforms the studio can prepare and publish posts for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Instagram (Graph API)
    #[default]
    Instagram,
    /// TikTok
    Tiktok,
    /// LinkedIn
    Linkedin,
    /// X, formerly Twitter
    Twitter,
}

impl Platform {
    /// Get all supported platforms
    pub const fn all() -> &'static [Self] {
        &[Self::Instagram, Self::Tiktok, Self::Linkedin, Self::Twitter]
    }

    /// Get the display name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Instagram => "Instagram",
            Self::Tiktok => "TikTok",
            Self::Linkedin => "LinkedIn",
            Self::Twitter => "X",
        }
    }

    /// Identifier used in API routes and storage
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Tiktok => "tiktok",
            Self::Linkedin => "linkedin",
            Self::Twitter => "twitter",
        }
    }

    /// Get the emoji icon
    pub const fn emoji(&self) -> &'static str {
        match self {
            Self::Instagram => "📸",
            Self::Tiktok => "🎵",
            Self::Linkedin => "💼",
            Self::Twitter => "𝕏",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "instagram" | "insta" | "ig" => Some(Self::Instagram),
            "tiktok" | "tt" => Some(Self::Tiktok),
            "linkedin" | "li" => Some(Self::Linkedin),
            "twitter" | "x" => Some(Self::Twitter),
            _ => None,
        }
    }

    /// Parse a comma-separated platform list, skipping unknown names
    pub fn list_from_str(s: &str) -> Vec<Self> {
        let mut platforms = Vec::new();
        for platform in s.split(',').filter_map(Self::from_str) {
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
        }
        platforms
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
