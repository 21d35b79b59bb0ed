//! Caption and hashtag composer

use crate::api::Suggestion;
use crate::error::ValidationError;
use crate::models::Platform;
use crate::profile::PlatformProfile;

/// Normalize a raw hashtag: trim, drop inner spaces, ensure a leading `#`
///
/// Returns `None` when nothing is left.
pub fn normalize_hashtag(raw: &str) -> Option<String> {
    let body: String = raw
        .trim()
        .trim_start_matches('#')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if body.is_empty() {
        None
    } else {
        Some(format!("#{body}"))
    }
}

/// Length of `caption + " " + hashtags.join(" ")`, counted in characters
pub fn combined_length(caption: &str, hashtags: &[String]) -> usize {
    let caption_len = caption.chars().count();
    if hashtags.is_empty() {
        return caption_len;
    }
    let tags_len: usize = hashtags.iter().map(|h| h.chars().count()).sum();
    caption_len + 1 + tags_len + (hashtags.len() - 1)
}

/// Caption plus an ordered set of unique hashtags for one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composer {
    profile: &'static PlatformProfile,
    caption: String,
    hashtags: Vec<String>,
}

impl Composer {
    /// Empty composer for a platform
    pub const fn new(platform: Platform) -> Self {
        Self {
            profile: PlatformProfile::for_platform(platform),
            caption: String::new(),
            hashtags: Vec::new(),
        }
    }

    /// Composer pre-filled from an existing draft
    pub fn with_content(platform: Platform, caption: &str, hashtags: &[String]) -> Self {
        let mut composer = Self::new(platform);
        composer.caption = caption.to_string();
        for tag in hashtags {
            // Stored drafts may predate the hashtag cap; keep what fits.
            let _ = composer.add_hashtag(tag);
        }
        composer
    }

    /// Platform profile in use
    pub const fn profile(&self) -> &'static PlatformProfile {
        self.profile
    }

    /// Current caption
    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Replace the caption. Typing past the cap is allowed.
    pub fn set_caption(&mut self, caption: impl Into<String>) {
        self.caption = caption.into();
    }

    /// Current hashtags, in insertion order
    pub fn hashtags(&self) -> &[String] {
        &self.hashtags
    }

    /// Add a hashtag
    ///
    /// Returns `Ok(false)` when the normalized tag is already present.
    pub fn add_hashtag(&mut self, raw: &str) -> Result<bool, ValidationError> {
        let tag = normalize_hashtag(raw).ok_or(ValidationError::EmptyHashtag)?;
        if self.hashtags.contains(&tag) {
            return Ok(false);
        }
        if let Some(max) = self.profile.max_hashtags
            && self.hashtags.len() >= max
        {
            return Err(ValidationError::TooManyHashtags { max });
        }
        self.hashtags.push(tag);
        Ok(true)
    }

    /// Remove a hashtag by exact match
    pub fn remove_hashtag(&mut self, tag: &str) -> bool {
        let before = self.hashtags.len();
        self.hashtags.retain(|t| t != tag);
        self.hashtags.len() != before
    }

    /// Caption and hashtags joined by single spaces, as published
    pub fn full_text(&self) -> String {
        if self.hashtags.is_empty() {
            self.caption.clone()
        } else {
            format!("{} {}", self.caption, self.hashtags.join(" "))
        }
    }

    /// Length counted against the platform cap
    pub fn counted_length(&self) -> usize {
        if self.profile.hashtags_count_toward_limit {
            combined_length(&self.caption, &self.hashtags)
        } else {
            self.caption.chars().count()
        }
    }

    /// Characters left before the cap; negative when over
    pub fn remaining(&self) -> i64 {
        self.profile.max_caption_len as i64 - self.counted_length() as i64
    }

    /// Whether the text is over the cap
    pub fn is_over_limit(&self) -> bool {
        self.remaining() < 0
    }

    /// Check the composer can back a ready/publish action
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.profile.requires_caption && self.caption.trim().is_empty() {
            return Err(ValidationError::EmptyCaption);
        }
        let remaining = self.remaining();
        if remaining < 0 {
            return Err(ValidationError::OverLimit {
                limit: self.profile.max_caption_len,
                over: remaining.unsigned_abs() as usize,
            });
        }
        Ok(())
    }

    /// Whether the ready/publish action should be enabled
    pub fn can_submit(&self) -> bool {
        self.validate().is_ok()
    }

    /// Replace caption and hashtags with an AI suggestion
    pub fn apply_suggestion(&mut self, suggestion: Suggestion) {
        let Suggestion { caption, hashtags } = suggestion;
        let limits = self.profile.suggestion_limits;

        self.caption = match limits {
            Some(l) => caption.chars().take(l.max_chars).collect(),
            None => caption,
        };

        self.hashtags.clear();
        let max_tags = limits.map(|l| l.max_hashtags).or(self.profile.max_hashtags);
        for tag in hashtags {
            if max_tags.is_some_and(|max| self.hashtags.len() >= max) {
                break;
            }
            if let Some(tag) = normalize_hashtag(&tag)
                && !self.hashtags.contains(&tag)
            {
                self.hashtags.push(tag);
            }
        }
    }

    /// Reset caption and hashtags
    pub fn clear(&mut self) {
        self.caption.clear();
        self.hashtags.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hashtag() {
        assert_eq!(normalize_hashtag("food"), Some("#food".to_string()));
        assert_eq!(normalize_hashtag("  #food "), Some("#food".to_string()));
        assert_eq!(normalize_hashtag("street food"), Some("#streetfood".to_string()));
        assert_eq!(normalize_hashtag("#"), None);
        assert_eq!(normalize_hashtag("   "), None);
    }

    #[test]
    fn test_duplicate_add_is_idempotent() {
        for raw in ["paris", "#paris", " paris "] {
            let mut composer = Composer::new(Platform::Instagram);
            assert!(composer.add_hashtag(raw).unwrap());
            assert!(!composer.add_hashtag(raw).unwrap());
            assert_eq!(composer.hashtags(), &["#paris".to_string()]);
        }
    }

    #[test]
    fn test_remove_exact_match() {
        let mut composer = Composer::new(Platform::Tiktok);
        composer.add_hashtag("a").unwrap();
        composer.add_hashtag("b").unwrap();
        assert!(!composer.remove_hashtag("a"));
        assert!(composer.remove_hashtag("#a"));
        assert_eq!(composer.hashtags(), &["#b".to_string()]);
    }

    #[test]
    fn test_x_remaining_counts_hashtags() {
        let mut composer = Composer::new(Platform::Twitter);
        composer.set_caption("Hello");
        assert_eq!(composer.remaining(), 275);

        composer.add_hashtag("ab").unwrap();
        composer.add_hashtag("cde").unwrap();
        // "Hello" + " " + "#ab" + " " + "#cde"
        assert_eq!(composer.remaining(), 280 - (5 + 1 + 3 + 1 + 4));
        assert_eq!(composer.full_text().chars().count(), 14);
    }

    #[test]
    fn test_remaining_matches_formula() {
        let captions = ["", "x", "Nouveau menu d'automne 🍂", &"a".repeat(300)];
        let tag_sets: [&[&str]; 3] = [&[], &["one"], &["one", "two", "three"]];
        for caption in captions {
            for tags in tag_sets {
                let mut composer = Composer::new(Platform::Twitter);
                composer.set_caption(caption);
                for t in tags {
                    composer.add_hashtag(t).unwrap();
                }
                let h = composer.hashtags();
                let sum: usize = h.iter().map(|t| t.chars().count()).sum();
                let extra = if h.is_empty() { 0 } else { 1 + sum + (h.len() - 1) };
                let expected = 280 - (caption.chars().count() + extra) as i64;
                assert_eq!(composer.remaining(), expected);
            }
        }
    }

    #[test]
    fn test_instagram_ignores_hashtags_in_count() {
        let mut composer = Composer::new(Platform::Instagram);
        composer.set_caption("abc");
        composer.add_hashtag("long_hashtag").unwrap();
        assert_eq!(composer.remaining(), 2197);
    }

    #[test]
    fn test_over_limit_is_soft() {
        let mut composer = Composer::new(Platform::Twitter);
        composer.set_caption("a".repeat(281));
        assert_eq!(composer.caption().len(), 281);
        assert!(composer.is_over_limit());
        assert_eq!(
            composer.validate(),
            Err(ValidationError::OverLimit { limit: 280, over: 1 })
        );
        assert!(!composer.can_submit());
    }

    #[test]
    fn test_empty_caption_blocks_submit() {
        let composer = Composer::new(Platform::Linkedin);
        assert_eq!(composer.validate(), Err(ValidationError::EmptyCaption));
    }

    #[test]
    fn test_instagram_hashtag_cap() {
        let mut composer = Composer::new(Platform::Instagram);
        for i in 0..30 {
            composer.add_hashtag(&format!("t{i}")).unwrap();
        }
        assert_eq!(
            composer.add_hashtag("extra"),
            Err(ValidationError::TooManyHashtags { max: 30 })
        );
    }

    #[test]
    fn test_suggestion_overwrites() {
        let mut composer = Composer::new(Platform::Instagram);
        composer.set_caption("old caption");
        composer.add_hashtag("old").unwrap();

        composer.apply_suggestion(Suggestion {
            caption: "Fresh caption".to_string(),
            hashtags: vec!["new".to_string(), "#new".to_string(), "other".to_string()],
        });

        assert_eq!(composer.caption(), "Fresh caption");
        assert_eq!(composer.hashtags(), &["#new".to_string(), "#other".to_string()]);
    }

    #[test]
    fn test_suggestion_truncated_for_x() {
        let mut composer = Composer::new(Platform::Twitter);
        composer.apply_suggestion(Suggestion {
            caption: "é".repeat(400),
            hashtags: ["a", "b", "c", "d", "e"].iter().map(|s| (*s).to_string()).collect(),
        });

        assert_eq!(composer.caption().chars().count(), 250);
        assert_eq!(composer.hashtags().len(), 3);
        assert!(composer.remaining() >= 0);
    }
}
