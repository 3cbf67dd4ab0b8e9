// TOML config adapter - Engine configuration from file, environment and defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::errors::DomainError;
use crate::domain::rules::{RangeRules, DEFAULT_END_EPSILON, DEFAULT_MIN_GAP};
use crate::engine::duration::ResolverSettings;
use crate::engine::playback::PlaybackSettings;
use crate::engine::selector::TrackGeometry;
use crate::error::{ReelTrimError, ReelTrimResult};
use crate::ports::LogLevel;

pub const MAX_WAVEFORM_BARS: usize = 4096;

/// Files tried, in order, when no explicit path is given
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["reeltrim.toml", "config/reeltrim.toml"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub min_gap: f64,
    pub end_epsilon: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            min_gap: DEFAULT_MIN_GAP,
            end_epsilon: DEFAULT_END_EPSILON,
        }
    }
}

/// One HTTP duration source of the cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// URL with an `{asset_id}` placeholder
    pub url_template: String,
    /// JSON pointer to the duration field, e.g. `/data/duration`
    pub duration_pointer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    /// Request timeout; `resolver.source_timeout_ms` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub poll_interval_ms: u64,
    pub max_poll_ms: u64,
    pub source_timeout_ms: u64,
    pub metadata_wait_ms: u64,
    pub sources: Vec<SourceConfig>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 300,
            max_poll_ms: 30_000,
            source_timeout_ms: 10_000,
            metadata_wait_ms: 5_000,
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub track_left: f64,
    pub track_width: f64,
    pub track_height: f64,
    pub label_height: f64,
    pub handle_width: f64,
    pub label_width: f64,
    pub waveform_bars: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        let geometry = TrackGeometry::default();
        Self {
            track_left: geometry.left,
            track_width: geometry.width,
            track_height: geometry.track_height,
            label_height: geometry.label_height,
            handle_width: geometry.handle_width,
            label_width: geometry.label_width,
            waveform_bars: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub max_recording_secs: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_recording_secs: 300.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json: false,
        }
    }
}

/// Effective engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub playback: PlaybackConfig,
    pub resolver: ResolverConfig,
    pub selector: SelectorConfig,
    pub capture: CaptureConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> ReelTrimResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> ReelTrimResult<String> {
        toml::to_string_pretty(self).map_err(|e| ReelTrimError::ConfigError {
            message: format!("cannot serialize configuration: {}", e),
        })
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), DomainError> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(DomainError::BadArgs(format!("{} must be positive, got {}", name, value)))
            }
        };

        positive("playback.min_gap", self.playback.min_gap)?;
        if !(self.playback.end_epsilon.is_finite() && self.playback.end_epsilon >= 0.0) {
            return Err(DomainError::BadArgs(format!(
                "playback.end_epsilon must not be negative, got {}",
                self.playback.end_epsilon
            )));
        }
        positive("resolver.poll_interval_ms", self.resolver.poll_interval_ms as f64)?;
        positive("resolver.max_poll_ms", self.resolver.max_poll_ms as f64)?;
        positive("resolver.source_timeout_ms", self.resolver.source_timeout_ms as f64)?;
        positive("selector.track_width", self.selector.track_width)?;
        positive("selector.handle_width", self.selector.handle_width)?;
        positive("capture.max_recording_secs", self.capture.max_recording_secs)?;
        if self.selector.waveform_bars > MAX_WAVEFORM_BARS {
            return Err(DomainError::BadArgs(format!(
                "selector.waveform_bars must be at most {}, got {}",
                MAX_WAVEFORM_BARS, self.selector.waveform_bars
            )));
        }

        for source in &self.resolver.sources {
            if !source.url_template.contains("{asset_id}") {
                return Err(DomainError::BadArgs(format!(
                    "source {} url_template lacks an {{asset_id}} placeholder",
                    source.name
                )));
            }
            if source.timeout_ms == Some(0) {
                return Err(DomainError::BadArgs(format!(
                    "source {} timeout_ms must be positive",
                    source.name
                )));
            }
            if !source.duration_pointer.is_empty() && !source.duration_pointer.starts_with('/') {
                return Err(DomainError::BadArgs(format!(
                    "source {} duration_pointer must start with '/'",
                    source.name
                )));
            }
        }
        Ok(())
    }

    pub fn range_rules(&self) -> RangeRules {
        RangeRules::new(self.playback.min_gap)
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            end_epsilon: self.playback.end_epsilon,
        }
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            poll_interval: Duration::from_millis(self.resolver.poll_interval_ms),
            max_poll: Duration::from_millis(self.resolver.max_poll_ms),
            source_timeout: Duration::from_millis(self.resolver.source_timeout_ms),
        }
    }

    pub fn metadata_wait(&self) -> Duration {
        Duration::from_millis(self.resolver.metadata_wait_ms)
    }

    pub fn track_geometry(&self) -> TrackGeometry {
        TrackGeometry {
            left: self.selector.track_left,
            width: self.selector.track_width,
            track_height: self.selector.track_height,
            label_height: self.selector.label_height,
            handle_width: self.selector.handle_width,
            label_width: self.selector.label_width,
        }
    }
}

/// Loads [`EngineConfig`] with precedence environment > file > defaults
pub struct TomlConfigAdapter {
    config_file_path: Option<PathBuf>,
}

impl TomlConfigAdapter {
    pub fn new(config_file_path: Option<PathBuf>) -> Self {
        Self { config_file_path }
    }

    /// File actually read, if any
    pub fn resolve_path(&self) -> ReelTrimResult<Option<PathBuf>> {
        match &self.config_file_path {
            Some(path) if path.exists() => Ok(Some(path.clone())),
            Some(path) => Err(ReelTrimError::ConfigError {
                message: format!("config file does not exist: {}", path.display()),
            }),
            None => Ok(DEFAULT_CONFIG_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists())),
        }
    }

    pub fn load(&self) -> ReelTrimResult<EngineConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment
    pub fn load_with_env<F>(&self, lookup: F) -> ReelTrimResult<EngineConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match self.resolve_path()? {
            Some(path) => Self::read_file(&path)?,
            None => {
                debug!("no config file found, using defaults");
                EngineConfig::default()
            }
        };
        apply_env_overrides(&mut config, lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> ReelTrimResult<EngineConfig> {
        info!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path)?;
        EngineConfig::from_toml_str(&content).map_err(|e| ReelTrimError::ConfigError {
            message: format!("{}: {}", path.display(), e),
        })
    }
}

/// Apply `REELTRIM_*` environment overrides
pub fn apply_env_overrides<F>(config: &mut EngineConfig, lookup: F) -> Result<(), DomainError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = 0;

    if let Some(value) = lookup("REELTRIM_LOG_LEVEL") {
        config.logging.level = LogLevel::parse(&value)?;
        applied += 1;
    }
    if let Some(value) = lookup("REELTRIM_MIN_GAP") {
        config.playback.min_gap = parse_env("REELTRIM_MIN_GAP", &value)?;
        applied += 1;
    }
    if let Some(value) = lookup("REELTRIM_POLL_INTERVAL_MS") {
        config.resolver.poll_interval_ms = parse_env("REELTRIM_POLL_INTERVAL_MS", &value)?;
        applied += 1;
    }
    if let Some(value) = lookup("REELTRIM_MAX_POLL_MS") {
        config.resolver.max_poll_ms = parse_env("REELTRIM_MAX_POLL_MS", &value)?;
        applied += 1;
    }

    if applied > 0 {
        info!(count = applied, "applied environment overrides");
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, DomainError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| DomainError::BadArgs(format!("invalid {}={}: {}", key, value, e)))
}
