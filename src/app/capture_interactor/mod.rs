// Capture interactor - Records a bounded take from camera and/or microphone

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::Asset;
use crate::ports::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    Idle,
    /// Devices open, not recording
    Previewing,
    Recording,
    Finished,
    Failed,
}

fn describe(failure: CaptureFailure) -> &'static str {
    match failure {
        CaptureFailure::PermissionDenied => "permission denied",
        CaptureFailure::NotFound => "no device found",
        CaptureFailure::Busy => "device is in use by another application",
    }
}

/// Records one take at most `max_recording_secs` long.
///
/// The take is returned as a blob asset ready for a trim session. Device
/// tracks are stopped on every exit path.
pub struct Recorder {
    device: Arc<dyn CaptureDevice>,
    notifier: Arc<dyn Notifier>,
    max_recording_secs: f64,
    stream: Option<Box<dyn CaptureStream>>,
    state: RecorderState,
}

impl Recorder {
    pub fn new(device: Arc<dyn CaptureDevice>, notifier: Arc<dyn Notifier>, max_recording_secs: f64) -> Self {
        Self {
            device,
            notifier,
            max_recording_secs,
            stream: None,
            state: RecorderState::Idle,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Request the devices named by `constraints`
    pub async fn open(&mut self, constraints: CaptureConstraints) -> Result<(), DomainError> {
        if self.stream.is_some() {
            return Err(DomainError::InvalidState("capture already open".to_string()));
        }

        match self.device.open(constraints).await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.state = RecorderState::Previewing;
                info!(video = constraints.video, audio = constraints.audio, "capture opened");
                Ok(())
            }
            Err(CaptureError { device, failure }) => {
                let err = DomainError::PermissionOrDevice {
                    device,
                    message: describe(failure).to_string(),
                };
                warn!(%device, ?failure, "capture unavailable");
                self.notifier.notify(Notice::error(err.user_message()));
                self.state = RecorderState::Failed;
                Err(err)
            }
        }
    }

    pub fn start(&mut self) -> Result<(), DomainError> {
        let stream = self
            .stream
            .as_mut()
            .filter(|_| self.state == RecorderState::Previewing)
            .ok_or_else(|| DomainError::InvalidState("capture is not previewing".to_string()))?;
        stream.start_recording();
        self.state = RecorderState::Recording;
        debug!(limit = self.max_recording_secs, "recording started");
        Ok(())
    }

    pub fn recorded_seconds(&self) -> f64 {
        self.stream.as_ref().map_or(0.0, |s| s.recorded_seconds())
    }

    /// Seconds left before the take is cut
    pub fn remaining_seconds(&self) -> f64 {
        (self.max_recording_secs - self.recorded_seconds()).max(0.0)
    }

    /// Stop automatically once the limit is reached
    pub fn tick(&mut self) -> Result<Option<Asset>, DomainError> {
        if self.state == RecorderState::Recording && self.remaining_seconds() <= 0.0 {
            info!(limit = self.max_recording_secs, "recording limit reached");
            return self.stop().map(Some);
        }
        Ok(None)
    }

    /// Finish the take and release the devices
    pub fn stop(&mut self) -> Result<Asset, DomainError> {
        if self.state != RecorderState::Recording {
            return Err(DomainError::InvalidState("not recording".to_string()));
        }
        let result = match self.stream.as_mut() {
            Some(stream) => stream.finish_recording(),
            None => Err(DomainError::InvalidState("capture stream lost".to_string())),
        };
        self.release();

        match result {
            Ok(reference) => {
                self.state = RecorderState::Finished;
                info!(blob = %reference, "recording finished");
                Ok(Asset::blob(reference))
            }
            Err(e) => {
                self.state = RecorderState::Failed;
                self.notifier.notify(Notice::error(e.user_message()));
                Err(e)
            }
        }
    }

    /// Discard any take and release the devices
    pub fn cancel(&mut self) {
        self.release();
        self.state = RecorderState::Idle;
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop_tracks();
            debug!("capture tracks stopped");
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.release();
    }
}
