use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::mining::event::{PostMineAction, PostMinePlayback};
use crate::mining::play_mode::{AutoPausePreference, PlayMode};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Timing engine and playback mode settings
    #[serde(default)]
    pub timing: TimingConfig,

    /// Mining pipeline settings
    #[serde(default)]
    pub mining: MiningConfig,

    /// Embedded UI surface settings
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Timing engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimingConfig {
    // @field: Poll period of the timing engine
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    // @field: Radius for started/about-to-stop detection
    #[serde(default = "default_showing_check_radius_ms")]
    pub showing_check_radius_ms: i64,

    // @field: Minimum context lines on each side of a mined line
    #[serde(default = "default_surrounding_count_radius")]
    pub surrounding_count_radius: usize,

    // @field: Minimum context time on each side of a mined line
    #[serde(default = "default_surrounding_time_radius_ms")]
    pub surrounding_time_radius_ms: i64,

    // @field: Playback mode driven by the tick
    #[serde(default)]
    pub play_mode: PlayMode,

    // @field: When auto-pause triggers
    #[serde(default)]
    pub auto_pause_preference: AutoPausePreference,

    // @field: Smallest gap condensed playback will skip over
    #[serde(default = "default_condensed_min_skip_ms")]
    pub condensed_min_skip_ms: i64,
}

impl TimingConfig {
    /// Tick period as a duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            showing_check_radius_ms: default_showing_check_radius_ms(),
            surrounding_count_radius: default_surrounding_count_radius(),
            surrounding_time_radius_ms: default_surrounding_time_radius_ms(),
            play_mode: PlayMode::default(),
            auto_pause_preference: AutoPausePreference::default(),
            condensed_min_skip_ms: default_condensed_min_skip_ms(),
        }
    }
}

/// Mining pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MiningConfig {
    /// Record an audio clip of the mined line
    #[serde(default = "default_true")]
    pub record_media: bool,

    /// Capture a screenshot of the mined line
    #[serde(default = "default_true")]
    pub take_screenshot: bool,

    /// Hide overlays and controls while the screenshot is taken
    #[serde(default = "default_true")]
    pub clean_screenshot: bool,

    /// Audio captured before the line starts
    #[serde(default)]
    pub audio_padding_start_ms: i64,

    /// Audio captured after the line ends
    #[serde(default = "default_audio_padding_end_ms")]
    pub audio_padding_end_ms: i64,

    /// What happens with a mined line once captured
    #[serde(default)]
    pub post_mine_action: PostMineAction,

    /// Playback state once a recording finishes
    #[serde(default)]
    pub post_mine_playback: PostMinePlayback,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            record_media: default_true(),
            take_screenshot: default_true(),
            clean_screenshot: default_true(),
            audio_padding_start_ms: 0,
            audio_padding_end_ms: default_audio_padding_end_ms(),
            post_mine_action: PostMineAction::default(),
            post_mine_playback: PostMinePlayback::default(),
        }
    }
}

/// Embedded UI surface configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BridgeConfig {
    /// UI language injected into the surface (ISO 639)
    #[serde(default = "default_language")]
    pub language: String,

    /// The single URL the surface may ask the controller to POST to
    #[serde(default)]
    pub allowed_fetch_url: Option<String>,

    /// How long to wait for the surface's ready announcement
    #[serde(default = "default_bind_timeout_ms")]
    pub bind_timeout_ms: u64,

    /// Timeout for proxied HTTP calls
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl BridgeConfig {
    /// Bind timeout as a duration
    pub fn bind_timeout(&self) -> Duration {
        Duration::from_millis(self.bind_timeout_ms)
    }

    /// Parsed allowlist URL, if one is configured
    pub fn allowed_fetch_url(&self) -> Result<Option<Url>> {
        self.allowed_fetch_url
            .as_deref()
            .map(|raw| Url::parse(raw).with_context(|| format!("Invalid allowed fetch URL: {}", raw)))
            .transpose()
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            allowed_fetch_url: None,
            bind_timeout_ms: default_bind_timeout_ms(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Log level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_showing_check_radius_ms() -> i64 {
    150
}

fn default_surrounding_count_radius() -> usize {
    1
}

fn default_surrounding_time_radius_ms() -> i64 {
    5000
}

fn default_condensed_min_skip_ms() -> i64 {
    1000
}

fn default_audio_padding_end_ms() -> i64 {
    500
}

fn default_language() -> String {
    "en".to_string()
}

fn default_bind_timeout_ms() -> u64 {
    10_000
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.timing.tick_interval_ms == 0 {
            return Err(anyhow!("Tick interval must be greater than zero"));
        }

        if self.timing.showing_check_radius_ms < 0 || self.timing.surrounding_time_radius_ms < 0 {
            return Err(anyhow!("Timing radii must not be negative"));
        }

        if self.mining.audio_padding_start_ms < 0 || self.mining.audio_padding_end_ms < 0 {
            return Err(anyhow!("Audio padding must not be negative"));
        }

        crate::language_utils::validate_language_code(&self.bridge.language)?;

        self.bridge.allowed_fetch_url()?;

        if self.bridge.bind_timeout_ms == 0 {
            return Err(anyhow!("Bind timeout must be greater than zero"));
        }

        Ok(())
    }

    /// Load the configuration at `path`, writing the default one first if
    /// the file does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;

        Ok(config)
    }
}
