// Domain errors - Error taxonomy for trim sessions

use std::fmt;

/// Capture device involved in a permission or device failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Camera,
    Microphone,
    Both,
}

impl DeviceKind {
    /// Remediation hint shown to the user
    pub fn remediation_hint(&self) -> &'static str {
        match self {
            DeviceKind::Camera => {
                "Allow camera access in your browser or system settings, then try again."
            }
            DeviceKind::Microphone => {
                "Allow microphone access in your browser or system settings, then try again."
            }
            DeviceKind::Both => {
                "Allow both camera and microphone access in your browser or system settings, then try again."
            }
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Camera => write!(f, "camera"),
            DeviceKind::Microphone => write!(f, "microphone"),
            DeviceKind::Both => write!(f, "camera and microphone"),
        }
    }
}

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// The asset cannot be loaded or no backend can be built for it
    AssetUnresolvable(String),
    /// Every duration source failed and the poll gave up
    DurationUnresolvable(String),
    /// A capture device was refused or is missing
    PermissionOrDevice { device: DeviceKind, message: String },
    /// The persistence collaborator rejected a commit
    CommitFailure(String),
    /// A single duration source failed; handled inside the cascade
    SourceFailed(String),
    /// Operation not allowed in the current session state
    InvalidState(String),
    /// Invalid arguments provided
    BadArgs(String),
}

impl DomainError {
    /// Human-readable message for the notification collaborator
    pub fn user_message(&self) -> String {
        match self {
            DomainError::AssetUnresolvable(_) => {
                "This video could not be loaded. Check the link or upload it again.".to_string()
            }
            DomainError::DurationUnresolvable(_) => {
                "The video length is not available yet, so trimming is disabled. Playback still works."
                    .to_string()
            }
            DomainError::PermissionOrDevice { device, .. } => {
                format!("Cannot use your {}. {}", device, device.remediation_hint())
            }
            DomainError::CommitFailure(_) => {
                "Saving the trim failed. Your selection was kept, please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::AssetUnresolvable(msg) => write!(f, "Asset unresolvable: {}", msg),
            DomainError::DurationUnresolvable(msg) => {
                write!(f, "Duration unresolvable: {}", msg)
            }
            DomainError::PermissionOrDevice { device, message } => {
                write!(f, "Permission or device error ({}): {}", device, message)
            }
            DomainError::CommitFailure(msg) => write!(f, "Commit failed: {}", msg),
            DomainError::SourceFailed(msg) => write!(f, "Duration source failed: {}", msg),
            DomainError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
