//! Configuration management for commute-radio.
//!
//! Loads config from YAML files in standard locations. Every section has
//! defaults, so a partial file (or none at all) is fine.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::models::{Narrator, SessionConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9100".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub speed: String,
    pub volume: String,
    pub pitch: String,
    pub format: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            speed: "0".into(),
            volume: "0".into(),
            pitch: "0".into(),
            format: "mp3".into(),
        }
    }
}

impl SpeechConfig {
    pub fn voice(&self, narrator: Narrator) -> VoiceRequest {
        VoiceRequest {
            speaker: narrator.speaker_id().to_string(),
            speed: self.speed.clone(),
            volume: self.volume.clone(),
            pitch: self.pitch.clone(),
            format: self.format.clone(),
        }
    }
}

/// Voice parameters sent with every speech synthesis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceRequest {
    pub speaker: String,
    pub speed: String,
    pub volume: String,
    pub pitch: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    pub player_command: String,
    pub player_args: Vec<String>,
    pub watch_url: String,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            player_command: "mpv".into(),
            player_args: vec!["--no-video".into()],
            watch_url: "https://www.youtube.com/watch?v=".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub enabled: bool,
    pub poll_interval_secs: u64,
    pub position_file: PathBuf,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 18,
            position_file: PathBuf::from("/tmp/commute-radio-position.json"),
        }
    }
}

impl TrackingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadingConfig {
    pub step_delay_ms: u64,
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self { step_delay_ms: 500 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8768,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub speech: SpeechConfig,
    pub music: MusicConfig,
    pub tracking: TrackingConfig,
    pub loading: LoadingConfig,
    pub control: ControlConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/commute-radio/config.yaml
    /// 3. /etc/commute-radio/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/commute-radio/config.yaml")),
                Some(PathBuf::from("/etc/commute-radio/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default().normalized();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default().normalized()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default().normalized()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yml::Error> {
        let config: Self = serde_yml::from_str(contents)?;
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        let requested = (self.session.radio_ratio, self.session.music_ratio);
        self.session = self.session.normalized();
        if requested != (self.session.radio_ratio, self.session.music_ratio) {
            tracing::warn!(
                "Ratios must be at least 1, using radio={} music={}",
                self.session.radio_ratio,
                self.session.music_ratio
            );
        }
        self
    }
}
