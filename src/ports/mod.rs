// Ports - Interface definitions (contracts)

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::events::{PlaybackListener, Subscription};

/// Backend identity, used for logging only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Direct,
    ManagedStream,
}

/// Capability interface shared by direct and managed-stream playback.
///
/// `play`, `pause` and `seek` are safe before the asset is ready. Events are
/// delivered to subscribers only from `pump`, never from inside another call.
pub trait MediaBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn play(&self);

    fn pause(&self);

    fn seek(&self, t: f64);

    /// Best-effort playback position, `0.0` if unavailable
    fn current_time(&self) -> f64;

    /// Synchronous duration, if the backend knows it
    fn duration_hint(&self) -> Option<f64>;

    fn subscribe(&self, listener: Arc<dyn PlaybackListener>) -> Subscription;

    /// Deliver native events queued since the last pump
    fn pump(&self);

    /// Stop the stream and free native resources. Idempotent.
    fn release(&self);
}

/// Payload-free events raised by a direct media element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementEvent {
    TimeUpdate,
    Play,
    Pause,
    LoadedMetadata,
}

/// Native surface of a URL/blob addressable media element
pub trait MediaElement: Send {
    fn load(&mut self, locator: &DirectLocator) -> Result<(), DomainError>;

    fn play(&mut self);

    fn pause(&mut self);

    fn set_current_time(&mut self, t: f64);

    fn current_time(&self) -> f64;

    /// NaN until metadata has loaded
    fn duration(&self) -> f64;

    fn take_events(&mut self) -> Vec<ElementEvent>;

    /// Release the source (revokes object URLs for blobs)
    fn revoke(&mut self);
}

/// Events raised by a managed stream player handle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamEvent {
    Ready,
    Progress { position: f64 },
    Playing,
    Paused,
}

/// Imperative handle onto a managed-stream player
pub trait StreamPlayer: Send {
    fn load(&mut self, asset_id: &str) -> Result<(), DomainError>;

    fn play(&mut self);

    fn pause(&mut self);

    fn seek_to(&mut self, t: f64);

    fn position(&self) -> Option<f64>;

    /// The runtime's own duration field; may stay empty while processing
    fn runtime_duration(&self) -> Option<f64>;

    fn is_ready(&self) -> bool;

    fn take_events(&mut self) -> Vec<StreamEvent>;

    fn destroy(&mut self);
}

/// Live player runtime polled by the duration resolver as a fallback
pub trait PlayerRuntime: Send + Sync {
    fn runtime_duration(&self) -> Option<f64>;
}

/// One step of the duration cascade
#[async_trait]
pub trait DurationSource: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when the source answered without a usable duration
    async fn query(&self, asset_id: &str) -> Result<Option<f64>, DomainError>;
}

/// Backend plus the runtime the resolver may poll
pub struct BackendHandle {
    pub backend: Arc<dyn MediaBackend>,
    pub runtime: Option<Arc<dyn PlayerRuntime>>,
}

/// Builds the backend appropriate for an asset
pub trait BackendFactory: Send + Sync {
    fn create(&self, asset: &Asset) -> Result<BackendHandle, DomainError>;
}

/// Asset resolution collaborator (upload/storage)
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load_asset(&self, asset_id: &str) -> Result<Asset, DomainError>;
}

/// Persistence collaborator for trim bounds
#[async_trait]
pub trait TrimStore: Send + Sync {
    async fn persist_trim(&self, asset_id: &str, start: f64, end: f64) -> Result<(), DomainError>;

    async fn get_saved_trim(&self, asset_id: &str) -> Result<Option<SavedTrim>, DomainError>;
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Toast/notification payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Notification UI collaborator
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Callbacks exposed to the host
pub trait SessionListener: Send + Sync {
    fn on_commit(&self, start: f64, end: f64);

    fn on_cancel(&self);
}

/// Devices requested from a capture source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub video: bool,
    pub audio: bool,
}

/// Why a capture device could not be opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFailure {
    PermissionDenied,
    NotFound,
    Busy,
}

/// Failed capture request, with the device(s) that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureError {
    pub device: DeviceKind,
    pub failure: CaptureFailure,
}

/// Camera/microphone source
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    async fn open(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

/// A live capture stream that can be recorded
pub trait CaptureStream: Send {
    fn start_recording(&mut self);

    /// Seconds recorded so far
    fn recorded_seconds(&self) -> f64;

    /// Stop recording and return a blob reference for the take
    fn finish_recording(&mut self) -> Result<String, DomainError>;

    /// Stop every device track
    fn stop_tracks(&mut self);
}

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level_str: &str) -> Result<Self, DomainError> {
        match level_str.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                level_str
            ))),
        }
    }

    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
