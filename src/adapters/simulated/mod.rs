// Simulated natives - deterministic media element, stream player and capture device

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::adapters::direct_backend::DirectBackend;
use crate::adapters::stream_backend::ManagedStreamBackend;
use crate::domain::errors::{DeviceKind, DomainError};
use crate::domain::model::{Asset, DirectLocator};
use crate::ports::{
    BackendFactory, BackendHandle, CaptureConstraints, CaptureDevice, CaptureError,
    CaptureFailure, CaptureStream, ElementEvent, MediaElement, StreamEvent, StreamPlayer,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct ElementSim {
    media_duration: f64,
    unloadable: bool,
    deferred_metadata: bool,
    loaded: bool,
    metadata_loaded: bool,
    position: f64,
    playing: bool,
    revoked: bool,
    source: Option<String>,
    events: Vec<ElementEvent>,
    seeks: Vec<f64>,
}

/// Media element driven by an explicit clock.
///
/// Clones share state, so a test keeps one clone as the clock while the
/// backend owns another.
#[derive(Debug, Clone)]
pub struct SimulatedElement {
    inner: Arc<Mutex<ElementSim>>,
}

impl SimulatedElement {
    pub fn new(media_duration: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ElementSim {
                media_duration,
                unloadable: false,
                deferred_metadata: false,
                loaded: false,
                metadata_loaded: false,
                position: 0.0,
                playing: false,
                revoked: false,
                source: None,
                events: Vec::new(),
                seeks: Vec::new(),
            })),
        }
    }

    /// Element whose `load` always fails
    pub fn unloadable() -> Self {
        let element = Self::new(0.0);
        lock(&element.inner).unloadable = true;
        element
    }

    /// Metadata arrives on the first `advance` instead of at load
    pub fn deferred_metadata(self) -> Self {
        lock(&self.inner).deferred_metadata = true;
        self
    }

    pub fn advance(&self, dt: f64) {
        let mut sim = lock(&self.inner);
        if !sim.loaded || sim.revoked {
            return;
        }
        if !sim.metadata_loaded {
            sim.metadata_loaded = true;
            sim.events.push(ElementEvent::LoadedMetadata);
        }
        if !sim.playing || dt <= 0.0 {
            return;
        }
        sim.position += dt;
        sim.events.push(ElementEvent::TimeUpdate);
        if sim.position >= sim.media_duration {
            sim.position = sim.media_duration;
            sim.playing = false;
            sim.events.push(ElementEvent::Pause);
        }
    }

    pub fn position(&self) -> f64 {
        lock(&self.inner).position
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.inner).playing
    }

    pub fn is_revoked(&self) -> bool {
        lock(&self.inner).revoked
    }

    pub fn source(&self) -> Option<String> {
        lock(&self.inner).source.clone()
    }

    /// Every seek target in call order
    pub fn seeks(&self) -> Vec<f64> {
        lock(&self.inner).seeks.clone()
    }
}

impl MediaElement for SimulatedElement {
    fn load(&mut self, locator: &DirectLocator) -> Result<(), DomainError> {
        let mut sim = lock(&self.inner);
        if sim.unloadable || locator.as_str().is_empty() {
            return Err(DomainError::AssetUnresolvable(format!(
                "media source not supported: {}",
                locator.as_str()
            )));
        }
        sim.loaded = true;
        sim.revoked = false;
        sim.position = 0.0;
        sim.source = Some(locator.as_str().to_string());
        if !sim.deferred_metadata {
            sim.metadata_loaded = true;
            sim.events.push(ElementEvent::LoadedMetadata);
        }
        Ok(())
    }

    fn play(&mut self) {
        let mut sim = lock(&self.inner);
        if !sim.loaded || sim.revoked || sim.playing {
            return;
        }
        if sim.metadata_loaded && sim.position >= sim.media_duration {
            sim.position = 0.0;
        }
        sim.playing = true;
        sim.events.push(ElementEvent::Play);
    }

    fn pause(&mut self) {
        let mut sim = lock(&self.inner);
        if sim.playing {
            sim.playing = false;
            sim.events.push(ElementEvent::Pause);
        }
    }

    fn set_current_time(&mut self, t: f64) {
        let mut sim = lock(&self.inner);
        if !sim.loaded || sim.revoked {
            return;
        }
        let upper = if sim.metadata_loaded {
            sim.media_duration
        } else {
            f64::MAX
        };
        sim.position = t.clamp(0.0, upper);
        sim.seeks.push(t);
        sim.events.push(ElementEvent::TimeUpdate);
    }

    fn current_time(&self) -> f64 {
        lock(&self.inner).position
    }

    fn duration(&self) -> f64 {
        let sim = lock(&self.inner);
        if sim.metadata_loaded {
            sim.media_duration
        } else {
            f64::NAN
        }
    }

    fn take_events(&mut self) -> Vec<ElementEvent> {
        std::mem::take(&mut lock(&self.inner).events)
    }

    fn revoke(&mut self) {
        let mut sim = lock(&self.inner);
        sim.revoked = true;
        sim.playing = false;
        sim.events.clear();
    }
}

#[derive(Debug)]
struct StreamSim {
    media_duration: f64,
    unloadable: bool,
    ready_after: f64,
    duration_after: f64,
    elapsed: f64,
    loaded: bool,
    ready: bool,
    position: f64,
    playing: bool,
    destroyed: bool,
    events: Vec<StreamEvent>,
}

/// Managed-stream player whose readiness and duration appear after
/// simulated processing time.
#[derive(Debug, Clone)]
pub struct SimulatedStreamPlayer {
    inner: Arc<Mutex<StreamSim>>,
}

impl SimulatedStreamPlayer {
    pub fn new(media_duration: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StreamSim {
                media_duration,
                unloadable: false,
                ready_after: 0.0,
                duration_after: 0.0,
                elapsed: 0.0,
                loaded: false,
                ready: false,
                position: 0.0,
                playing: false,
                destroyed: false,
                events: Vec::new(),
            })),
        }
    }

    pub fn unloadable() -> Self {
        let player = Self::new(0.0);
        lock(&player.inner).unloadable = true;
        player
    }

    /// Ready event only after `seconds` of simulated time
    pub fn ready_after(self, seconds: f64) -> Self {
        lock(&self.inner).ready_after = seconds.max(0.0);
        self
    }

    /// Runtime duration field stays empty for `seconds` of simulated time
    pub fn duration_after(self, seconds: f64) -> Self {
        lock(&self.inner).duration_after = seconds.max(0.0);
        self
    }

    pub fn advance(&self, dt: f64) {
        let mut sim = lock(&self.inner);
        if !sim.loaded || sim.destroyed {
            return;
        }
        sim.elapsed += dt.max(0.0);
        if !sim.ready && sim.elapsed >= sim.ready_after {
            sim.ready = true;
            sim.events.push(StreamEvent::Ready);
        }
        if !sim.playing || dt <= 0.0 {
            return;
        }
        sim.position += dt;
        if sim.position >= sim.media_duration {
            sim.position = sim.media_duration;
            sim.playing = false;
            let position = sim.position;
            sim.events.push(StreamEvent::Progress { position });
            sim.events.push(StreamEvent::Paused);
        } else {
            let position = sim.position;
            sim.events.push(StreamEvent::Progress { position });
        }
    }

    pub fn position(&self) -> f64 {
        lock(&self.inner).position
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.inner).playing
    }

    pub fn is_destroyed(&self) -> bool {
        lock(&self.inner).destroyed
    }

    fn check_ready(sim: &mut StreamSim) {
        if sim.loaded && !sim.ready && sim.elapsed >= sim.ready_after {
            sim.ready = true;
            sim.events.push(StreamEvent::Ready);
        }
    }
}

impl StreamPlayer for SimulatedStreamPlayer {
    fn load(&mut self, asset_id: &str) -> Result<(), DomainError> {
        let mut sim = lock(&self.inner);
        if sim.unloadable || asset_id.trim().is_empty() {
            return Err(DomainError::AssetUnresolvable(format!(
                "stream not found: {}",
                asset_id
            )));
        }
        sim.loaded = true;
        sim.destroyed = false;
        Self::check_ready(&mut sim);
        Ok(())
    }

    fn play(&mut self) {
        let mut sim = lock(&self.inner);
        if !sim.ready || sim.destroyed || sim.playing {
            return;
        }
        if sim.position >= sim.media_duration {
            sim.position = 0.0;
        }
        sim.playing = true;
        sim.events.push(StreamEvent::Playing);
    }

    fn pause(&mut self) {
        let mut sim = lock(&self.inner);
        if sim.playing {
            sim.playing = false;
            sim.events.push(StreamEvent::Paused);
        }
    }

    fn seek_to(&mut self, t: f64) {
        let mut sim = lock(&self.inner);
        if !sim.ready || sim.destroyed {
            return;
        }
        sim.position = t.clamp(0.0, sim.media_duration);
        let position = sim.position;
        sim.events.push(StreamEvent::Progress { position });
    }

    fn position(&self) -> Option<f64> {
        let sim = lock(&self.inner);
        sim.ready.then_some(sim.position)
    }

    fn runtime_duration(&self) -> Option<f64> {
        let sim = lock(&self.inner);
        (sim.loaded && !sim.destroyed && sim.elapsed >= sim.duration_after)
            .then_some(sim.media_duration)
    }

    fn is_ready(&self) -> bool {
        lock(&self.inner).ready
    }

    fn take_events(&mut self) -> Vec<StreamEvent> {
        std::mem::take(&mut lock(&self.inner).events)
    }

    fn destroy(&mut self) {
        let mut sim = lock(&self.inner);
        sim.destroyed = true;
        sim.playing = false;
        sim.events.clear();
    }
}

/// Shared clock over the simulated natives a factory hands out
#[derive(Debug, Clone)]
pub struct SimulatedMedia {
    pub element: SimulatedElement,
    pub player: SimulatedStreamPlayer,
}

impl SimulatedMedia {
    pub fn new(media_duration: f64) -> Self {
        Self {
            element: SimulatedElement::new(media_duration),
            player: SimulatedStreamPlayer::new(media_duration),
        }
    }

    pub fn advance(&self, dt: f64) {
        self.element.advance(dt);
        self.player.advance(dt);
    }
}

/// Builds direct or managed backends over one set of simulated natives
pub struct SimulatedBackendFactory {
    media: SimulatedMedia,
}

impl SimulatedBackendFactory {
    pub fn new(media: SimulatedMedia) -> Self {
        Self { media }
    }

    pub fn media(&self) -> &SimulatedMedia {
        &self.media
    }
}

impl BackendFactory for SimulatedBackendFactory {
    fn create(&self, asset: &Asset) -> Result<BackendHandle, DomainError> {
        debug!(asset = %asset, "creating simulated backend");
        match asset {
            Asset::Direct { locator } => {
                let backend = DirectBackend::open(self.media.element.clone(), locator.clone())?;
                Ok(BackendHandle {
                    backend: Arc::new(backend),
                    runtime: None,
                })
            }
            Asset::Managed { id } => {
                let backend = Arc::new(ManagedStreamBackend::open(self.media.player.clone(), id)?);
                Ok(BackendHandle {
                    backend: backend.clone(),
                    runtime: Some(backend),
                })
            }
        }
    }
}

#[derive(Debug, Default)]
struct CaptureSim {
    recording: bool,
    recorded: f64,
    tracks_stopped: bool,
    takes: u32,
}

/// Capture device with configurable per-device failures
#[derive(Debug, Clone, Default)]
pub struct SimulatedCaptureDevice {
    camera_failure: Option<CaptureFailure>,
    microphone_failure: Option<CaptureFailure>,
    state: Arc<Mutex<CaptureSim>>,
}

impl SimulatedCaptureDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn camera_fails(mut self, failure: CaptureFailure) -> Self {
        self.camera_failure = Some(failure);
        self
    }

    pub fn microphone_fails(mut self, failure: CaptureFailure) -> Self {
        self.microphone_failure = Some(failure);
        self
    }

    /// Advance the recording clock of the open stream
    pub fn advance(&self, dt: f64) {
        let mut sim = lock(&self.state);
        if sim.recording && !sim.tracks_stopped {
            sim.recorded += dt.max(0.0);
        }
    }

    pub fn tracks_stopped(&self) -> bool {
        lock(&self.state).tracks_stopped
    }

    pub fn is_recording(&self) -> bool {
        lock(&self.state).recording
    }
}

#[async_trait]
impl CaptureDevice for SimulatedCaptureDevice {
    async fn open(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let camera = constraints.video.then_some(self.camera_failure).flatten();
        let microphone = constraints.audio.then_some(self.microphone_failure).flatten();

        let failed = match (camera, microphone) {
            (Some(failure), Some(_)) => Some((DeviceKind::Both, failure)),
            (Some(failure), None) => Some((DeviceKind::Camera, failure)),
            (None, Some(failure)) => Some((DeviceKind::Microphone, failure)),
            (None, None) => None,
        };
        if let Some((device, failure)) = failed {
            return Err(CaptureError { device, failure });
        }

        {
            let mut sim = lock(&self.state);
            *sim = CaptureSim {
                takes: sim.takes,
                ..CaptureSim::default()
            };
        }
        Ok(Box::new(SimulatedCaptureStream {
            state: self.state.clone(),
        }))
    }
}

struct SimulatedCaptureStream {
    state: Arc<Mutex<CaptureSim>>,
}

impl CaptureStream for SimulatedCaptureStream {
    fn start_recording(&mut self) {
        let mut sim = lock(&self.state);
        if !sim.tracks_stopped {
            sim.recording = true;
            sim.recorded = 0.0;
        }
    }

    fn recorded_seconds(&self) -> f64 {
        lock(&self.state).recorded
    }

    fn finish_recording(&mut self) -> Result<String, DomainError> {
        let mut sim = lock(&self.state);
        if !sim.recording {
            return Err(DomainError::InvalidState("no recording in progress".to_string()));
        }
        sim.recording = false;
        sim.takes += 1;
        Ok(format!("blob:recording-{}", sim.takes))
    }

    fn stop_tracks(&mut self) {
        let mut sim = lock(&self.state);
        sim.recording = false;
        sim.tracks_stopped = true;
    }
}
