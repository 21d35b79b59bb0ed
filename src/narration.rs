//! Narration and subtitle pipeline for video posts
//!
//! ```text
//! idle → script-editing → audio-generating → audio-ready → merging → merged
//!                                                              ↓  ↑
//!                                                          merge-failed
//! ```
//!
//! A merged video is only handed out while it still matches the source
//! video, script, audio and subtitle style it was produced from.

use sha2::{Digest, Sha256};

use crate::api::{Assistant, MergeRequest, TtsRequest};
use crate::error::{FlowError, ValidationError};
use crate::models::Platform;
use crate::profile::{PlatformProfile, SubtitleStyle};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NarrationPhase {
    /// Narration not requested
    #[default]
    Idle,
    /// Script being written
    ScriptEditing,
    /// TTS request in flight
    AudioGenerating,
    /// Audio available, not merged yet
    AudioReady,
    /// Merge request in flight
    Merging,
    /// Merged video available
    Merged,
    /// Last merge failed; may be relaunched
    MergeFailed,
}

impl NarrationPhase {
    /// Get phase as string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ScriptEditing => "script-editing",
            Self::AudioGenerating => "audio-generating",
            Self::AudioReady => "audio-ready",
            Self::Merging => "merging",
            Self::Merged => "merged",
            Self::MergeFailed => "merge-failed",
        }
    }
}

/// TTS parameters
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    /// Voice id
    pub voice: String,
    /// Speech rate multiplier
    pub speed: f32,
    /// Target duration in seconds
    pub target_duration_secs: u32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice: "nova".to_string(),
            speed: 1.0,
            target_duration_secs: 15,
        }
    }
}

/// Snapshot of the narration attached to a draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationAsset {
    /// Script read by the voice
    pub script: String,
    /// Generated audio
    pub audio_url: Option<String>,
    /// Merged video, present only while current
    pub merged_video_url: Option<String>,
}

/// Narration state for one compose session
#[derive(Debug, Clone)]
pub struct Narration {
    profile: &'static PlatformProfile,
    settings: VoiceSettings,
    phase: NarrationPhase,
    video_url: Option<String>,
    script: String,
    audio_url: Option<String>,
    subtitle_style: Option<SubtitleStyle>,
    merged_url: Option<String>,
    merged_fingerprint: Option<String>,
    last_error: Option<String>,
}

impl Narration {
    /// Idle narration for a platform
    pub fn new(platform: Platform, settings: VoiceSettings) -> Self {
        Self {
            profile: PlatformProfile::for_platform(platform),
            settings,
            phase: NarrationPhase::Idle,
            video_url: None,
            script: String::new(),
            audio_url: None,
            subtitle_style: None,
            merged_url: None,
            merged_fingerprint: None,
            last_error: None,
        }
    }

    /// Current phase
    pub const fn phase(&self) -> NarrationPhase {
        self.phase
    }

    /// Whether the user asked for a narrated video
    pub fn wants_audio(&self) -> bool {
        self.phase != NarrationPhase::Idle
    }

    /// Current script
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Generated audio, if any
    pub fn audio_url(&self) -> Option<&str> {
        self.audio_url.as_deref()
    }

    /// Error of the last failed request
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Selected subtitle style
    pub const fn subtitle_style(&self) -> Option<SubtitleStyle> {
        self.subtitle_style
    }

    /// Set the source video; a merge made from another video is dropped
    pub fn set_video(&mut self, url: Option<&str>) {
        if self.video_url.as_deref() == url {
            return;
        }
        self.video_url = url.map(String::from);
        self.invalidate_merge();
    }

    /// Start or edit the script
    ///
    /// Audio generated from a previous script no longer matches and is dropped.
    pub fn edit_script(&mut self, script: impl Into<String>) -> Result<(), FlowError> {
        self.ensure_not_busy("edit-script")?;
        if !self.profile.supports_narration() {
            return Err(FlowError::InvalidTransition {
                state: self.phase.as_str(),
                action: "edit-script",
            });
        }
        let script = script.into();
        if script != self.script {
            self.audio_url = None;
            self.invalidate_merge();
        }
        self.script = script;
        if self.audio_url.is_none() || self.phase == NarrationPhase::Idle {
            self.phase = NarrationPhase::ScriptEditing;
        }
        Ok(())
    }

    /// Burn in subtitles with a platform style; `None` disables subtitles
    pub fn set_subtitle_style(&mut self, style_id: Option<&str>) -> Result<(), FlowError> {
        self.ensure_not_busy("subtitles")?;
        let style = match style_id {
            Some(id) => Some(self.profile.subtitle_style(id).ok_or(FlowError::InvalidTransition {
                state: self.phase.as_str(),
                action: "subtitles",
            })?),
            None => None,
        };
        if style != self.subtitle_style {
            self.subtitle_style = style;
            self.invalidate_merge();
        }
        Ok(())
    }

    /// Synthesize the script with the TTS service
    ///
    /// The service may condense the script to fit the target duration; the
    /// script is replaced by what was actually read.
    pub async fn generate_audio(&mut self, assistant: &impl Assistant) -> Result<(), FlowError> {
        if !matches!(
            self.phase,
            NarrationPhase::ScriptEditing
                | NarrationPhase::AudioReady
                | NarrationPhase::Merged
                | NarrationPhase::MergeFailed
        ) {
            return Err(FlowError::InvalidTransition {
                state: self.phase.as_str(),
                action: "generate-audio",
            });
        }
        if self.script.trim().is_empty() {
            return Err(ValidationError::EmptyScript.into());
        }

        let request = TtsRequest {
            text: self.script.clone(),
            target_duration: self.settings.target_duration_secs,
            voice: self.settings.voice.clone(),
            speed: self.settings.speed,
        };
        let previous = self.phase;
        self.phase = NarrationPhase::AudioGenerating;
        self.last_error = None;

        match assistant.generate_audio(&request).await {
            Ok(track) => {
                if let Some(condensed) = track.condensed_text.filter(|t| !t.trim().is_empty())
                    && condensed != self.script
                {
                    tracing::debug!("TTS condensed the script to fit {}s", request.target_duration);
                    self.script = condensed;
                }
                self.audio_url = Some(track.audio_url);
                self.invalidate_merge();
                self.phase = NarrationPhase::AudioReady;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Audio generation failed: {e:#}");
                let err = FlowError::service("generate-audio", &e);
                self.last_error = Some(err.to_string());
                self.phase = if previous == NarrationPhase::Merged {
                    NarrationPhase::AudioReady
                } else {
                    previous
                };
                Err(err)
            }
        }
    }

    /// Merge the audio (and subtitles) into the source video
    ///
    /// Also the "relaunch" action after a failed merge.
    pub async fn merge(&mut self, assistant: &impl Assistant) -> Result<String, FlowError> {
        if !matches!(self.phase, NarrationPhase::AudioReady | NarrationPhase::MergeFailed) {
            return Err(FlowError::InvalidTransition {
                state: self.phase.as_str(),
                action: "merge",
            });
        }
        let (Some(video_url), Some(audio_url)) = (self.video_url.clone(), self.audio_url.clone())
        else {
            return Err(ValidationError::NoMedia.into());
        };

        let request = MergeRequest {
            video_url,
            audio_url,
            subtitle_script: self.subtitle_style.map(|_| self.script.clone()),
            subtitle_style: self.subtitle_style.map(|s| s.id.to_string()),
        };
        self.phase = NarrationPhase::Merging;
        self.last_error = None;

        match assistant.merge_audio_video(&request).await {
            Ok(merged) => {
                tracing::info!("Narrated video ready: {}", merged.merged_url);
                self.merged_fingerprint = Some(self.fingerprint());
                self.merged_url = Some(merged.merged_url.clone());
                self.phase = NarrationPhase::Merged;
                Ok(merged.merged_url)
            }
            Err(e) => {
                tracing::warn!("Audio/video merge failed: {e:#}");
                let err = FlowError::service("merge", &e);
                self.last_error = Some(err.to_string());
                self.phase = NarrationPhase::MergeFailed;
                Err(err)
            }
        }
    }

    /// Give up on narration; publishing falls back to the source video
    pub fn abort(&mut self) {
        self.phase = NarrationPhase::Idle;
        self.script.clear();
        self.audio_url = None;
        self.subtitle_style = None;
        self.last_error = None;
        self.invalidate_merge();
    }

    /// Merged video, only while it matches the current inputs
    pub fn merged_video_url(&self) -> Option<&str> {
        match (&self.merged_url, &self.merged_fingerprint) {
            (Some(url), Some(fp)) if *fp == self.fingerprint() => Some(url),
            _ => None,
        }
    }

    /// URL to publish given the raw source
    ///
    /// Without narration the source goes out as is. With narration only a
    /// current merged video is acceptable.
    pub fn publish_target<'a>(&'a self, source_url: &'a str) -> Result<&'a str, FlowError> {
        if !self.wants_audio() {
            return Ok(source_url);
        }
        self.merged_video_url().ok_or(FlowError::NarrationPending)
    }

    /// Snapshot for persistence
    pub fn asset(&self) -> NarrationAsset {
        NarrationAsset {
            script: self.script.clone(),
            audio_url: self.audio_url.clone(),
            merged_video_url: self.merged_video_url().map(String::from),
        }
    }

    fn ensure_not_busy(&self, action: &'static str) -> Result<(), FlowError> {
        if matches!(self.phase, NarrationPhase::AudioGenerating | NarrationPhase::Merging) {
            return Err(FlowError::InvalidTransition {
                state: self.phase.as_str(),
                action,
            });
        }
        Ok(())
    }

    fn invalidate_merge(&mut self) {
        self.merged_url = None;
        self.merged_fingerprint = None;
        if self.phase == NarrationPhase::Merged {
            self.phase = if self.audio_url.is_some() {
                NarrationPhase::AudioReady
            } else {
                NarrationPhase::ScriptEditing
            };
        }
    }

    fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            self.video_url.as_deref().unwrap_or_default(),
            self.script.as_str(),
            self.audio_url.as_deref().unwrap_or_default(),
            self.subtitle_style.map_or("", |s| s.id),
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}
