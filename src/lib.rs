//! ReelTrim Library
//!
//! Bounded media playback and trim range selection over interchangeable
//! media backends, with duration resolution for managed streams.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use app::{SessionSettings, SessionState, TrimSession, TrimSessionPorts};
pub use domain::errors::DomainError;
pub use domain::model::{Asset, Range, SessionMode, TimeSpec};
pub use error::{ReelTrimError, ReelTrimResult};
