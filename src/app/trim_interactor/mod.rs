// Trim interactor - Orchestrates one trim or view session over a media asset

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::adapters::toml_config::EngineConfig;
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::domain::rules::RangeRules;
use crate::engine::duration::{DurationCell, DurationResolver};
use crate::engine::events::{PlaybackListener, Subscription};
use crate::engine::playback::{BoundedPlaybackController, PlaybackSettings, TimeDisplay};
use crate::engine::range::{RangeCell, RangeModel};
use crate::engine::selector::{
    synthetic_waveform, Pointer, RangeSelector, SelectorAction, TrackFrame, TrackGeometry,
    TrackView,
};
use crate::ports::*;

const METADATA_PUMP_INTERVAL: Duration = Duration::from_millis(50);

/// Collaborators injected into a session
#[derive(Clone)]
pub struct TrimSessionPorts {
    pub assets: Arc<dyn AssetLoader>,
    pub store: Arc<dyn TrimStore>,
    pub backends: Arc<dyn BackendFactory>,
    pub notifier: Arc<dyn Notifier>,
    pub listener: Arc<dyn SessionListener>,
    pub resolver: Arc<DurationResolver>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub mode: SessionMode,
    pub rules: RangeRules,
    pub playback: PlaybackSettings,
    /// How long a direct backend may take to report metadata
    pub metadata_wait: Duration,
    pub geometry: TrackGeometry,
    pub waveform_bars: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default(), SessionMode::Edit)
    }
}

impl SessionSettings {
    pub fn from_config(config: &EngineConfig, mode: SessionMode) -> Self {
        Self {
            mode,
            rules: config.range_rules(),
            playback: config.playback_settings(),
            metadata_wait: config.metadata_wait(),
            geometry: config.track_geometry(),
            waveform_bars: config.selector.waveform_bars,
        }
    }
}

/// Externally visible session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Loading,
    Ready,
    Editing,
    /// Editing with playback engaged; derived, never stored
    Previewing,
    Committing,
    Closed,
    Error,
}

/// Commits metadata duration hints into the session's duration cell
struct DurationHintListener {
    cell: DurationCell,
}

impl PlaybackListener for DurationHintListener {
    fn on_loaded_metadata(&self, duration_hint: Option<f64>) {
        if let Some(seconds) = duration_hint {
            self.cell.commit(seconds, "loaded-metadata");
        }
    }
}

fn as_unresolvable(e: DomainError) -> DomainError {
    match e {
        DomainError::AssetUnresolvable(_) => e,
        other => DomainError::AssetUnresolvable(other.to_string()),
    }
}

/// One trim (edit mode) or bounded playback (view mode) session.
///
/// Owns the backend exclusively. Host events are delivered by calling
/// [`TrimSession::pump`] from the host's event loop.
pub struct TrimSession {
    asset_id: String,
    settings: SessionSettings,
    ports: TrimSessionPorts,
    phase: SessionState,
    asset: Option<Asset>,
    backend: Option<Arc<dyn MediaBackend>>,
    runtime: Option<Arc<dyn PlayerRuntime>>,
    duration: DurationCell,
    range: RangeModel,
    /// Bounds the controller enforces
    active: RangeCell,
    saved: Option<SavedTrim>,
    controller: Option<BoundedPlaybackController>,
    selector: RangeSelector,
    metadata_subscription: Option<Subscription>,
    last_error: Option<DomainError>,
}

impl TrimSession {
    pub fn new(asset_id: &str, settings: SessionSettings, ports: TrimSessionPorts) -> Self {
        let range = RangeModel::new(settings.rules);
        let active = match settings.mode {
            SessionMode::Edit => range.cell(),
            SessionMode::View => RangeCell::new(),
        };
        let selector = RangeSelector::new(settings.geometry, Vec::new());

        Self {
            asset_id: asset_id.to_string(),
            settings,
            ports,
            phase: SessionState::Loading,
            asset: None,
            backend: None,
            runtime: None,
            duration: DurationCell::new(),
            range,
            active,
            saved: None,
            controller: None,
            selector,
            metadata_subscription: None,
            last_error: None,
        }
    }

    /// Resolve the asset, build its backend and discover the duration.
    ///
    /// An unresolvable duration is not fatal: the session becomes `Ready`
    /// with range interaction disabled.
    pub async fn load(&mut self) -> Result<SessionState, DomainError> {
        if self.phase != SessionState::Loading {
            return Err(DomainError::InvalidState(format!(
                "cannot load a session that is {:?}",
                self.state()
            )));
        }

        if let Err(e) = self.open().await {
            return Err(self.fail(e));
        }

        match self.resolve_duration().await {
            Ok(seconds) => self.apply_duration(seconds),
            Err(e) => {
                warn!(asset = %self.asset_id, error = %e, "duration unresolvable, trimming disabled");
                self.ports.notifier.notify(Notice::warning(e.user_message()));
                self.last_error = Some(e);
            }
        }

        self.phase = SessionState::Ready;
        info!(
            asset = %self.asset_id,
            mode = ?self.settings.mode,
            duration = self.duration.seconds(),
            "session ready"
        );
        Ok(self.state())
    }

    async fn open(&mut self) -> Result<(), DomainError> {
        let asset = self
            .ports
            .assets
            .load_asset(&self.asset_id)
            .await
            .map_err(as_unresolvable)?;
        asset.validate()?;

        let handle = self.ports.backends.create(&asset).map_err(as_unresolvable)?;
        debug!(asset = %asset, kind = ?handle.backend.kind(), "backend created");

        self.metadata_subscription = Some(handle.backend.subscribe(Arc::new(DurationHintListener {
            cell: self.duration.clone(),
        })));

        let mut controller = BoundedPlaybackController::new(
            handle.backend.clone(),
            self.active.clone(),
            self.settings.playback,
        );
        if self.settings.mode == SessionMode::View {
            controller.set_display(TimeDisplay::Relative);
        }

        self.saved = match self.ports.store.get_saved_trim(&self.asset_id).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(asset = %self.asset_id, error = %e, "saved trim unavailable");
                None
            }
        };

        self.selector = RangeSelector::new(
            self.settings.geometry,
            synthetic_waveform(asset.key(), self.settings.waveform_bars),
        );
        self.backend = Some(handle.backend);
        self.runtime = handle.runtime;
        self.controller = Some(controller);
        self.asset = Some(asset);
        Ok(())
    }

    async fn resolve_duration(&self) -> Result<f64, DomainError> {
        match &self.asset {
            Some(Asset::Managed { id }) => {
                self.ports
                    .resolver
                    .resolve(id, self.runtime.clone(), &self.duration)
                    .await
            }
            Some(Asset::Direct { .. }) => self.await_metadata().await,
            None => Err(DomainError::InvalidState("no asset loaded".to_string())),
        }
    }

    /// Pump the backend until metadata yields a duration or the wait expires
    async fn await_metadata(&self) -> Result<f64, DomainError> {
        let Some(backend) = self.backend.clone() else {
            return Err(DomainError::InvalidState("no backend".to_string()));
        };

        let deadline = Instant::now() + self.settings.metadata_wait;
        loop {
            backend.pump();
            if let Some(hint) = backend.duration_hint() {
                self.duration.commit(hint, "duration-hint");
            }
            if let Some(seconds) = self.duration.get() {
                return Ok(seconds);
            }
            if Instant::now() >= deadline {
                return Err(DomainError::DurationUnresolvable(format!(
                    "no metadata for {} within {:?}",
                    self.asset_id, self.settings.metadata_wait
                )));
            }
            sleep(METADATA_PUMP_INTERVAL).await;
        }
    }

    fn apply_duration(&mut self, seconds: f64) {
        if let Some(controller) = &self.controller {
            controller.set_duration(seconds);
        }

        let (saved_start, saved_end) = match self.saved {
            Some(saved) => (Some(saved.start), Some(saved.end)),
            None => (None, None),
        };
        self.range.seed(saved_start, saved_end, seconds);

        if self.settings.mode == SessionMode::View && self.saved.is_some() {
            // A trim covering the whole asset plays exactly like no trim
            let bounds = self
                .range
                .range()
                .filter(|r| r.start > 0.0 || r.end < seconds);
            self.active.store(bounds);
            if let (Some(bounds), Some(controller)) = (bounds, &self.controller) {
                controller.seek(bounds.start);
            }
        }
    }

    fn fail(&mut self, e: DomainError) -> DomainError {
        error!(asset = %self.asset_id, error = %e, "session failed");
        self.ports.notifier.notify(Notice::error(e.user_message()));
        self.teardown();
        self.phase = SessionState::Error;
        self.last_error = Some(e.clone());
        e
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            SessionState::Editing if self.is_playing() => SessionState::Previewing,
            phase => phase,
        }
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn mode(&self) -> SessionMode {
        self.settings.mode
    }

    pub fn asset(&self) -> Option<&Asset> {
        self.asset.as_ref()
    }

    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.backend.as_ref().map(|b| b.kind())
    }

    /// Resolved duration, `0.0` while unknown
    pub fn duration(&self) -> f64 {
        self.duration.seconds()
    }

    /// Live edit range, `None` until seeded
    pub fn range(&self) -> Option<Range> {
        self.range.range()
    }

    /// Bounds playback is currently held to
    pub fn active_range(&self) -> Option<Range> {
        self.active.load()
    }

    pub fn saved_trim(&self) -> Option<SavedTrim> {
        self.saved
    }

    pub fn last_error(&self) -> Option<&DomainError> {
        self.last_error.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.controller.as_ref().is_some_and(|c| c.is_playing())
    }

    pub fn playhead(&self) -> f64 {
        self.controller.as_ref().map_or(0.0, |c| c.playhead())
    }

    pub fn displayed_time(&self) -> f64 {
        self.controller.as_ref().map_or(0.0, |c| c.displayed_time())
    }

    pub fn displayed_duration(&self) -> f64 {
        self.controller.as_ref().map_or(0.0, |c| c.displayed_duration())
    }

    /// Number of end-of-range rewinds and forward jumps so far
    pub fn corrections(&self) -> u64 {
        self.controller.as_ref().map_or(0, |c| c.corrections())
    }

    /// Deliver queued backend events.
    ///
    /// A duration that arrives after `load` gave up seeds the range here,
    /// which enables trimming.
    pub fn pump(&mut self) {
        let Some(backend) = self.backend.clone() else {
            return;
        };
        backend.pump();
        if let Some(hint) = backend.duration_hint() {
            self.duration.commit(hint, "duration-hint");
        }
        self.seed_late_duration();
    }

    fn seed_late_duration(&mut self) {
        if !matches!(self.phase, SessionState::Ready | SessionState::Editing) || self.range.is_seeded() {
            return;
        }
        let Some(seconds) = self.duration.get() else {
            return;
        };
        info!(asset = %self.asset_id, duration = seconds, "late duration, trimming enabled");
        if matches!(self.last_error, Some(DomainError::DurationUnresolvable(_))) {
            self.last_error = None;
        }
        self.apply_duration(seconds);
    }

    fn ensure_interactive(&self) -> Result<&BoundedPlaybackController, DomainError> {
        match self.phase {
            SessionState::Ready | SessionState::Editing => self
                .controller
                .as_ref()
                .ok_or_else(|| DomainError::InvalidState("no playback controller".to_string())),
            _ => Err(DomainError::InvalidState(format!(
                "session is {:?}",
                self.state()
            ))),
        }
    }

    fn ensure_editing(&self) -> Result<(), DomainError> {
        if self.phase == SessionState::Editing {
            Ok(())
        } else {
            Err(DomainError::InvalidState(format!(
                "range edits need an editing session, session is {:?}",
                self.state()
            )))
        }
    }

    /// Enter `Editing`. View sessions never edit.
    pub fn begin_editing(&mut self) -> Result<(), DomainError> {
        if self.settings.mode == SessionMode::View {
            return Err(DomainError::InvalidState("view sessions cannot edit".to_string()));
        }
        match self.phase {
            SessionState::Ready => {
                self.phase = SessionState::Editing;
                debug!(asset = %self.asset_id, "editing");
                Ok(())
            }
            SessionState::Editing => Ok(()),
            _ => Err(DomainError::InvalidState(format!(
                "cannot edit while {:?}",
                self.state()
            ))),
        }
    }

    pub fn play(&self) -> Result<(), DomainError> {
        self.ensure_interactive()?.play();
        Ok(())
    }

    pub fn pause(&self) -> Result<(), DomainError> {
        self.ensure_interactive()?.pause();
        Ok(())
    }

    pub fn toggle_playback(&self) -> Result<(), DomainError> {
        self.ensure_interactive()?.toggle();
        Ok(())
    }

    /// Seek to an absolute time
    pub fn seek(&self, t: f64) -> Result<(), DomainError> {
        self.ensure_interactive()?.seek(t);
        Ok(())
    }

    /// Seek to a fraction of the displayed track
    pub fn seek_fraction(&self, fraction: f64) -> Result<(), DomainError> {
        self.ensure_interactive()?.seek_fraction(fraction);
        Ok(())
    }

    pub fn set_start(&mut self, t: f64) -> Result<Option<Range>, DomainError> {
        self.ensure_editing()?;
        Ok(self.range.set_start(t))
    }

    pub fn set_end(&mut self, t: f64) -> Result<Option<Range>, DomainError> {
        self.ensure_editing()?;
        Ok(self.range.set_end(t))
    }

    /// Back to the full asset with the playhead at `0`
    pub fn reset_range(&mut self) -> Result<Option<Range>, DomainError> {
        self.ensure_editing()?;
        let range = self.range.reset();
        if range.is_some() {
            if let Some(controller) = &self.controller {
                controller.seek(0.0);
            }
        }
        Ok(range)
    }

    /// Snapshot of what the selector track represents right now
    pub fn frame(&self) -> TrackFrame {
        let playhead = self.playhead();
        match (self.settings.mode, self.active.load()) {
            (SessionMode::Edit, _) => TrackFrame {
                offset: 0.0,
                span: if self.range.is_seeded() {
                    self.range.duration()
                } else {
                    0.0
                },
                playhead,
                handles: self.range.range(),
            },
            (SessionMode::View, Some(bounds)) => TrackFrame {
                offset: bounds.start,
                span: bounds.length(),
                playhead,
                handles: None,
            },
            (SessionMode::View, None) => TrackFrame {
                offset: 0.0,
                span: self.duration.seconds(),
                playhead,
                handles: None,
            },
        }
    }

    fn ensure_pointer_phase(&self) -> Result<(), DomainError> {
        match self.settings.mode {
            SessionMode::Edit => self.ensure_editing(),
            SessionMode::View => self.ensure_interactive().map(|_| ()),
        }
    }

    pub fn pointer_down(&mut self, pointer: Pointer) -> Result<Option<SelectorAction>, DomainError> {
        self.ensure_pointer_phase()?;
        let frame = self.frame();
        let action = self.selector.pointer_down(pointer, &frame);
        self.apply(action);
        Ok(action)
    }

    pub fn pointer_move(&mut self, pointer: Pointer) -> Result<Option<SelectorAction>, DomainError> {
        self.ensure_pointer_phase()?;
        let frame = self.frame();
        let action = self.selector.pointer_move(pointer, &frame);
        self.apply(action);
        Ok(action)
    }

    pub fn pointer_up(&mut self, pointer_id: u32) -> Option<InteractionTarget> {
        self.selector.pointer_up(pointer_id)
    }

    fn apply(&mut self, action: Option<SelectorAction>) {
        match action {
            Some(SelectorAction::SetStart(t)) => {
                self.range.set_start(t);
            }
            Some(SelectorAction::SetEnd(t)) => {
                self.range.set_end(t);
            }
            Some(SelectorAction::Seek(t)) => {
                if let Some(controller) = &self.controller {
                    controller.seek(t);
                }
            }
            None => {}
        }
    }

    pub fn track_view(&self) -> TrackView {
        self.selector.render(&self.frame())
    }

    /// Persist the live range.
    ///
    /// On success the session closes and `on_commit` fires. On failure the
    /// session returns to `Editing` with the range untouched.
    pub async fn commit(&mut self) -> Result<Range, DomainError> {
        if self.settings.mode == SessionMode::View {
            return Err(DomainError::InvalidState("view sessions cannot commit".to_string()));
        }
        self.ensure_editing()?;
        let range = self.range.range().ok_or_else(|| {
            DomainError::DurationUnresolvable("no range to commit without a duration".to_string())
        })?;

        self.phase = SessionState::Committing;
        self.selector.cancel_gesture();
        if let Some(controller) = &self.controller {
            if controller.is_playing() {
                controller.pause();
            }
        }
        info!(asset = %self.asset_id, start = range.start, end = range.end, "committing trim");

        match self
            .ports
            .store
            .persist_trim(&self.asset_id, range.start, range.end)
            .await
        {
            Ok(()) => {
                self.teardown();
                self.phase = SessionState::Closed;
                self.ports.listener.on_commit(range.start, range.end);
                self.ports.notifier.notify(Notice::info("Trim saved"));
                info!(asset = %self.asset_id, "trim committed");
                Ok(range)
            }
            Err(e) => {
                let err = match e {
                    DomainError::CommitFailure(_) => e,
                    other => DomainError::CommitFailure(other.to_string()),
                };
                self.phase = SessionState::Editing;
                warn!(asset = %self.asset_id, error = %err, "commit failed, range kept");
                self.ports.notifier.notify(Notice::error(err.user_message()));
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Abandon the session. A closed session stays closed.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        match self.phase {
            SessionState::Closed => return Ok(()),
            SessionState::Committing => {
                return Err(DomainError::InvalidState("commit in progress".to_string()))
            }
            _ => {}
        }
        self.teardown();
        self.phase = SessionState::Closed;
        self.ports.listener.on_cancel();
        info!(asset = %self.asset_id, "session cancelled");
        Ok(())
    }

    fn teardown(&mut self) {
        self.selector.cancel_gesture();
        if let Some(mut controller) = self.controller.take() {
            controller.stop();
        }
        self.metadata_subscription = None;
        self.runtime = None;
        if let Some(backend) = self.backend.take() {
            backend.release();
            debug!(asset = %self.asset_id, "backend released");
        }
    }
}

impl Drop for TrimSession {
    fn drop(&mut self) {
        if self.backend.is_some() {
            debug!(asset = %self.asset_id, "session dropped while open");
            self.teardown();
        }
    }
}
