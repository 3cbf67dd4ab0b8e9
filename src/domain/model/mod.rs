// Domain models - Assets, ranges and timecodes

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Time specification in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    /// Parse `SS.ms`, `MM:SS.ms` or `HH:MM:SS.ms`
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(DomainError::BadArgs(format!(
                    "Time must be a non-negative number: {}",
                    trimmed
                )));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let (hours, minutes, seconds_part) = match parts.as_slice() {
            [m, s] => (0, parse_component(m, "minutes")?, parse_seconds(s)?),
            [h, m, s] => {
                let minutes = parse_component(m, "minutes")?;
                if minutes >= 60 {
                    return Err(DomainError::BadArgs("Minutes must be less than 60".to_string()));
                }
                (parse_component(h, "hours")?, minutes, parse_seconds(s)?)
            }
            _ => {
                return Err(DomainError::BadArgs(format!(
                    "Invalid time '{}'. Supported formats: 12.5, 2:30.5, 1:02:30.5",
                    trimmed
                )))
            }
        };

        Ok(Self::from_seconds(
            hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds_part,
        ))
    }

    /// Format as `M:SS.mmm` or `H:MM:SS.mmm`
    pub fn format_hms(&self) -> String {
        let total_ms = (self.seconds.max(0.0) * 1000.0).round() as u64;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let seconds = (total_ms % 60_000) / 1000;
        let milliseconds = total_ms % 1000;

        if hours > 0 {
            format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
        } else {
            format!("{}:{:02}.{:03}", minutes, seconds, milliseconds)
        }
    }

    /// Short `M:SS` label used on the timeline
    pub fn format_label(&self) -> String {
        let total = self.seconds.max(0.0).floor() as u64;
        format!("{}:{:02}", total / 60, total % 60)
    }
}

fn parse_component(value: &str, what: &str) -> Result<u32, DomainError> {
    value
        .parse::<u32>()
        .map_err(|_| DomainError::BadArgs(format!("Invalid {} format: {}", what, value)))
}

fn parse_seconds(value: &str) -> Result<f64, DomainError> {
    let seconds = value
        .parse::<f64>()
        .map_err(|_| DomainError::BadArgs(format!("Invalid seconds format: {}", value)))?;
    if !(0.0..60.0).contains(&seconds) {
        return Err(DomainError::BadArgs("Seconds must be less than 60".to_string()));
    }
    Ok(seconds)
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// Where a direct asset's bytes live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum DirectLocator {
    /// Absolute or signed URL
    Url(String),
    /// Local blob reference (object URL) produced by a recorder or file picker
    Blob(String),
}

impl DirectLocator {
    pub fn as_str(&self) -> &str {
        match self {
            DirectLocator::Url(url) => url,
            DirectLocator::Blob(blob) => blob,
        }
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, DirectLocator::Blob(_))
    }
}

/// Video identified either by a direct locator or an opaque managed id.
///
/// A managed id carries no URL or path structure and is passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Asset {
    Direct { locator: DirectLocator },
    Managed { id: String },
}

impl Asset {
    pub fn url(url: impl Into<String>) -> Self {
        Asset::Direct {
            locator: DirectLocator::Url(url.into()),
        }
    }

    pub fn blob(reference: impl Into<String>) -> Self {
        Asset::Direct {
            locator: DirectLocator::Blob(reference.into()),
        }
    }

    pub fn managed(id: impl Into<String>) -> Self {
        Asset::Managed { id: id.into() }
    }

    pub fn is_managed(&self) -> bool {
        matches!(self, Asset::Managed { .. })
    }

    /// Stable key the waveform is seeded from
    pub fn key(&self) -> &str {
        match self {
            Asset::Direct { locator } => locator.as_str(),
            Asset::Managed { id } => id,
        }
    }

    /// Reject assets that cannot possibly be played
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Asset::Direct { locator } if locator.as_str().trim().is_empty() => Err(
                DomainError::AssetUnresolvable("Direct asset has an empty locator".to_string()),
            ),
            Asset::Managed { id } if id.trim().is_empty() => Err(DomainError::AssetUnresolvable(
                "Managed asset has an empty id".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Direct { locator } => write!(f, "direct:{}", locator.as_str()),
            Asset::Managed { id } => write!(f, "managed:{}", id),
        }
    }
}

/// In/out trim selection in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub start: f64,
    pub end: f64,
}

impl Range {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} - {}]",
            TimeSpec::from_seconds(self.start),
            TimeSpec::from_seconds(self.end)
        )
    }
}

/// Trim bounds previously persisted for an asset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedTrim {
    pub start: f64,
    pub end: f64,
}

impl From<SavedTrim> for Range {
    fn from(saved: SavedTrim) -> Self {
        Range::new(saved.start, saved.end)
    }
}

/// Playback state; pausing is `Stopped` with a remembered playhead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}

/// Region of the range selector that can own a pointer capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionTarget {
    StartHandle,
    EndHandle,
    PlayheadLabel,
    Track,
}

/// Whether the session trims or plays back saved bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Edit,
    View,
}
