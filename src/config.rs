//! Configuration module for Keiro

use anyhow::{Context, Result};
use chrono::{FixedOffset, Local, Offset};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::models::Platform;
use crate::narration::VoiceSettings;
use crate::paths;
use crate::publish::PollSettings;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Studio backend base URL; empty runs against the local database
    #[serde(default)]
    pub api_base_url: String,

    /// Library items fetched per media tab
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Platforms preselected for scheduling
    #[serde(default)]
    pub default_networks: Vec<String>,

    /// Narration voice
    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,

    /// Narration speed
    #[serde(default = "default_tts_speed")]
    pub tts_speed: f32,

    /// Narration length the TTS service condenses to
    #[serde(default = "default_target_duration")]
    pub target_duration_secs: u32,

    /// Delay between image→video conversion polls
    #[serde(default = "default_poll_interval")]
    pub conversion_poll_interval_secs: u64,

    /// Polls before a conversion is reported as stuck
    #[serde(default = "default_max_polls")]
    pub conversion_max_polls: u32,

    /// Calendar time zone as minutes east of UTC (machine zone when unset)
    #[serde(default)]
    pub timezone_offset_minutes: Option<i32>,
}

fn default_page_size() -> usize {
    50
}

fn default_tts_voice() -> String {
    "nova".to_string()
}

fn default_tts_speed() -> f32 {
    1.0
}

fn default_target_duration() -> u32 {
    15
}

fn default_poll_interval() -> u64 {
    5
}

fn default_max_polls() -> u32 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            page_size: default_page_size(),
            default_networks: Vec::new(),
            tts_voice: default_tts_voice(),
            tts_speed: default_tts_speed(),
            target_duration_secs: default_target_duration(),
            conversion_poll_interval_secs: default_poll_interval(),
            conversion_max_polls: default_max_polls(),
            timezone_offset_minutes: None,
        }
    }
}

impl Config {
    /// Load config from the default path or fall back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path()?)
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&paths::config_path()?)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Whether no backend is configured
    pub fn is_local_mode(&self) -> bool {
        self.api_base_url.trim().is_empty()
    }

    /// Narration defaults
    pub fn voice(&self) -> VoiceSettings {
        VoiceSettings {
            voice: self.tts_voice.clone(),
            speed: self.tts_speed,
            target_duration_secs: self.target_duration_secs,
        }
    }

    /// Conversion polling
    pub const fn poll(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.conversion_poll_interval_secs),
            max_polls: self.conversion_max_polls,
        }
    }

    /// Preselected platforms; unknown names are skipped
    pub fn default_platforms(&self) -> Vec<Platform> {
        Platform::list_from_str(&self.default_networks.join(","))
    }

    /// Zone used to group the calendar by day
    pub fn calendar_offset(&self) -> FixedOffset {
        self.timezone_offset_minutes
            .and_then(|minutes| FixedOffset::east_opt(minutes * 60))
            .unwrap_or_else(|| Local::now().offset().fix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.is_local_mode());
        assert_eq!(config.poll().max_polls, 60);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "api_base_url = \"https://app.keiro.test\"\ndefault_networks = [\"instagram\", \"x\", \"myspace\"]\ntimezone_offset_minutes = 60\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(!config.is_local_mode());
        assert_eq!(config.page_size, 50);
        assert_eq!(config.voice().voice, "nova");
        assert_eq!(config.default_platforms(), vec![Platform::Instagram, Platform::Twitter]);
        assert_eq!(config.calendar_offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            tts_voice: "alloy".to_string(),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().tts_voice, "alloy");
    }
}
