// Simulate interactor - Replays a scripted interaction against simulated media

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapters::memory::{
    MemoryTrimStore, RecordingNotifier, RecordingSessionListener, SessionOutcome,
    StaticAssetLoader,
};
use crate::adapters::simulated::{SimulatedBackendFactory, SimulatedMedia};
use crate::adapters::toml_config::EngineConfig;
use crate::adapters::tracing_log::TracingLogAdapter;
use crate::app::trim_interactor::{SessionSettings, SessionState, TrimSession, TrimSessionPorts};
use crate::domain::errors::DomainError;
use crate::domain::model::{Asset, Range, SessionMode, TimeSpec};
use crate::engine::duration::DurationResolver;
use crate::engine::selector::{Pointer, TrackView};
use crate::error::{ReelTrimError, ReelTrimResult};
use crate::ports::{BackendKind, Notice};

const SIM_ASSET_ID: &str = "simulated-asset";
const DEFAULT_TICK: f64 = 0.25;
const MAX_ADVANCE_SECS: f64 = 24.0 * 3600.0;
const MAX_ADVANCE_TICKS: usize = 1_000_000;

/// Seconds as a number or an `SS`, `MM:SS` or `HH:MM:SS` string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Seconds(f64),
    Text(String),
}

impl TimeValue {
    pub fn seconds(&self) -> Result<f64, DomainError> {
        match self {
            TimeValue::Seconds(s) => Ok(*s),
            TimeValue::Text(text) => TimeSpec::parse(text).map(|t| t.as_seconds()),
        }
    }
}

fn default_tick() -> f64 {
    DEFAULT_TICK
}

fn default_pointer_y() -> f64 {
    // Middle of the default track band
    44.0
}

/// One scripted host interaction
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    BeginEdit,
    Play,
    Pause,
    Toggle,
    Seek { t: TimeValue },
    SeekFraction { fraction: f64 },
    /// Run the media clock, pumping events every `tick` seconds
    Advance {
        seconds: f64,
        #[serde(default = "default_tick")]
        tick: f64,
    },
    PointerDown {
        id: u32,
        x: f64,
        #[serde(default = "default_pointer_y")]
        y: f64,
    },
    PointerMove {
        id: u32,
        x: f64,
        #[serde(default = "default_pointer_y")]
        y: f64,
    },
    PointerUp { id: u32 },
    SetStart { t: TimeValue },
    SetEnd { t: TimeValue },
    Reset,
    /// Make the next store write fail
    FailNextCommit,
    Commit,
    Cancel,
    Snapshot,
}

impl ScriptStep {
    fn name(&self) -> &'static str {
        match self {
            ScriptStep::BeginEdit => "begin_edit",
            ScriptStep::Play => "play",
            ScriptStep::Pause => "pause",
            ScriptStep::Toggle => "toggle",
            ScriptStep::Seek { .. } => "seek",
            ScriptStep::SeekFraction { .. } => "seek_fraction",
            ScriptStep::Advance { .. } => "advance",
            ScriptStep::PointerDown { .. } => "pointer_down",
            ScriptStep::PointerMove { .. } => "pointer_move",
            ScriptStep::PointerUp { .. } => "pointer_up",
            ScriptStep::SetStart { .. } => "set_start",
            ScriptStep::SetEnd { .. } => "set_end",
            ScriptStep::Reset => "reset",
            ScriptStep::FailNextCommit => "fail_next_commit",
            ScriptStep::Commit => "commit",
            ScriptStep::Cancel => "cancel",
            ScriptStep::Snapshot => "snapshot",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Script {
    pub steps: Vec<ScriptStep>,
}

impl Script {
    pub fn from_json(content: &str) -> ReelTrimResult<Self> {
        serde_json::from_str(content).map_err(|e| ReelTrimError::ScriptError {
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRequest {
    pub duration: f64,
    pub managed: bool,
    pub saved_start: Option<f64>,
    pub saved_end: Option<f64>,
    pub mode: SessionMode,
    pub script: Script,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepSnapshot {
    pub step: usize,
    pub state: SessionState,
    pub playhead: f64,
    pub displayed_time: f64,
    pub range: Option<Range>,
    pub view: TrackView,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepError {
    pub step: usize,
    pub op: &'static str,
    pub message: String,
}

/// Outcome of a simulated session
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub asset: String,
    pub mode: SessionMode,
    pub backend: Option<BackendKind>,
    pub duration: f64,
    pub final_state: SessionState,
    pub range: Option<Range>,
    pub active_range: Option<Range>,
    pub playhead: f64,
    pub displayed_time: f64,
    pub displayed_duration: f64,
    pub corrections: u64,
    pub committed: Option<Range>,
    pub outcomes: Vec<SessionOutcome>,
    pub notices: Vec<Notice>,
    pub errors: Vec<StepError>,
    pub snapshots: Vec<StepSnapshot>,
}

/// Runs trim sessions over simulated natives
pub struct SimulateInteractor {
    config: EngineConfig,
}

impl SimulateInteractor {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub async fn execute(&self, request: SimulationRequest) -> ReelTrimResult<SimulationReport> {
        if !(request.duration.is_finite() && request.duration >= 0.0) {
            return Err(DomainError::BadArgs(format!(
                "duration must be a non-negative number, got {}",
                request.duration
            ))
            .into());
        }

        let media = SimulatedMedia::new(request.duration);
        let asset = if request.managed {
            Asset::managed("sim-0001")
        } else {
            Asset::url("https://media.example.com/simulated.mp4")
        };

        let store = match (request.saved_start, request.saved_end) {
            (None, None) => MemoryTrimStore::new(),
            (start, end) => MemoryTrimStore::with_trim(
                SIM_ASSET_ID,
                start.unwrap_or(0.0),
                end.unwrap_or(request.duration),
            ),
        };
        let store = Arc::new(store);
        let notifier = Arc::new(RecordingNotifier::forwarding_to(Arc::new(TracingLogAdapter::new())));
        let listener = Arc::new(RecordingSessionListener::new());

        let ports = TrimSessionPorts {
            assets: Arc::new(StaticAssetLoader::new().with_asset(SIM_ASSET_ID, asset.clone())),
            store: store.clone(),
            backends: Arc::new(SimulatedBackendFactory::new(media.clone())),
            notifier: notifier.clone(),
            listener: listener.clone(),
            resolver: Arc::new(DurationResolver::new(
                Vec::new(),
                self.config.resolver_settings(),
            )),
        };

        let settings = SessionSettings::from_config(&self.config, request.mode);
        let mut session = TrimSession::new(SIM_ASSET_ID, settings, ports);
        info!(asset = %asset, mode = ?request.mode, steps = request.script.steps.len(), "simulation started");

        let mut errors = Vec::new();
        let mut snapshots = Vec::new();
        let mut committed = None;

        if let Err(e) = session.load().await {
            warn!(error = %e, "simulated session failed to load");
            errors.push(StepError {
                step: 0,
                op: "load",
                message: e.to_string(),
            });
        }

        for (index, step) in request.script.steps.iter().enumerate() {
            let step_no = index + 1;
            debug!(step = step_no, op = step.name(), "script step");
            let result = match step {
                ScriptStep::Commit => session.commit().await.map(|range| {
                    committed = Some(range);
                }),
                ScriptStep::FailNextCommit => {
                    store.fail_next_writes(1);
                    Ok(())
                }
                ScriptStep::Snapshot => {
                    snapshots.push(StepSnapshot {
                        step: step_no,
                        state: session.state(),
                        playhead: session.playhead(),
                        displayed_time: session.displayed_time(),
                        range: session.range(),
                        view: session.track_view(),
                    });
                    Ok(())
                }
                ScriptStep::Advance { seconds, tick } => advance(&mut session, &media, *seconds, *tick),
                other => apply_step(&mut session, other),
            };

            if let Err(e) = result {
                errors.push(StepError {
                    step: step_no,
                    op: step.name(),
                    message: e.to_string(),
                });
            }
        }

        let report = SimulationReport {
            asset: asset.to_string(),
            mode: request.mode,
            backend: session.backend_kind(),
            duration: session.duration(),
            final_state: session.state(),
            range: session.range(),
            active_range: session.active_range(),
            playhead: session.playhead(),
            displayed_time: session.displayed_time(),
            displayed_duration: session.displayed_duration(),
            corrections: session.corrections(),
            committed,
            outcomes: listener.outcomes(),
            notices: notifier.notices(),
            errors,
            snapshots,
        };
        info!(state = ?report.final_state, errors = report.errors.len(), "simulation finished");
        Ok(report)
    }
}

fn advance(session: &mut TrimSession, media: &SimulatedMedia, seconds: f64, tick: f64) -> Result<(), DomainError> {
    if !(seconds.is_finite() && (0.0..=MAX_ADVANCE_SECS).contains(&seconds)) {
        return Err(DomainError::BadArgs(format!(
            "advance must be between 0 and {} seconds, got {}",
            MAX_ADVANCE_SECS, seconds
        )));
    }
    let tick = if tick.is_finite() && tick > 0.0 { tick } else { DEFAULT_TICK };
    if seconds / tick > MAX_ADVANCE_TICKS as f64 {
        return Err(DomainError::BadArgs(format!(
            "advance of {}s in {}s ticks exceeds {} ticks",
            seconds, tick, MAX_ADVANCE_TICKS
        )));
    }

    let mut remaining = seconds;
    while remaining > 0.0 {
        let dt = remaining.min(tick);
        media.advance(dt);
        session.pump();
        remaining -= dt;
    }
    Ok(())
}

fn apply_step(session: &mut TrimSession, step: &ScriptStep) -> Result<(), DomainError> {
    match step {
        ScriptStep::BeginEdit => session.begin_editing(),
        ScriptStep::Play => session.play(),
        ScriptStep::Pause => session.pause(),
        ScriptStep::Toggle => session.toggle_playback(),
        ScriptStep::Seek { t } => session.seek(t.seconds()?),
        ScriptStep::SeekFraction { fraction } => session.seek_fraction(*fraction),
        ScriptStep::PointerDown { id, x, y } => {
            session.pointer_down(Pointer::new(*id, *x, *y)).map(|_| ())
        }
        ScriptStep::PointerMove { id, x, y } => {
            session.pointer_move(Pointer::new(*id, *x, *y)).map(|_| ())
        }
        ScriptStep::PointerUp { id } => {
            session.pointer_up(*id);
            Ok(())
        }
        ScriptStep::SetStart { t } => session.set_start(t.seconds()?).map(|_| ()),
        ScriptStep::SetEnd { t } => session.set_end(t.seconds()?).map(|_| ()),
        ScriptStep::Reset => session.reset_range().map(|_| ()),
        ScriptStep::Cancel => session.cancel(),
        ScriptStep::Commit
        | ScriptStep::FailNextCommit
        | ScriptStep::Snapshot
        | ScriptStep::Advance { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mode: SessionMode, saved: Option<(f64, f64)>, script: &str) -> SimulationRequest {
        SimulationRequest {
            duration: 120.0,
            managed: false,
            saved_start: saved.map(|s| s.0),
            saved_end: saved.map(|s| s.1),
            mode,
            script: Script::from_json(script).unwrap(),
        }
    }

    #[test]
    fn test_script_parses_time_strings() {
        let script = Script::from_json(
            r#"{"steps": [
                {"op": "set_start", "t": "0:30"},
                {"op": "set_end", "t": 90},
                {"op": "advance", "seconds": 2.0},
                {"op": "pointer_down", "id": 1, "x": 10.0}
            ]}"#,
        )
        .unwrap();

        assert_eq!(script.steps.len(), 4);
        match &script.steps[0] {
            ScriptStep::SetStart { t } => assert_eq!(t.seconds().unwrap(), 30.0),
            other => panic!("unexpected step {:?}", other),
        }
        assert_eq!(
            script.steps[2],
            ScriptStep::Advance {
                seconds: 2.0,
                tick: DEFAULT_TICK
            }
        );
        assert!(Script::from_json(r#"{"steps": [{"op": "jump"}]}"#).is_err());
    }

    #[tokio::test]
    async fn test_bounded_preview_then_commit() {
        let interactor = SimulateInteractor::new(EngineConfig::default());
        let report = interactor
            .execute(request(
                SessionMode::Edit,
                Some((30.0, 90.0)),
                r#"{"steps": [
                    {"op": "begin_edit"},
                    {"op": "play"},
                    {"op": "advance", "seconds": 65},
                    {"op": "snapshot"},
                    {"op": "fail_next_commit"},
                    {"op": "commit"},
                    {"op": "commit"}
                ]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(report.snapshots[0].playhead, 30.0);
        assert_eq!(report.snapshots[0].state, SessionState::Editing);
        assert_eq!(report.corrections, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].op, "commit");
        assert_eq!(report.committed, Some(Range::new(30.0, 90.0)));
        assert_eq!(report.final_state, SessionState::Closed);
    }

    #[tokio::test]
    async fn test_oversized_advance_is_rejected() {
        let interactor = SimulateInteractor::new(EngineConfig::default());
        let report = interactor
            .execute(request(
                SessionMode::Edit,
                None,
                r#"{"steps": [
                    {"op": "play"},
                    {"op": "advance", "seconds": 1e12},
                    {"op": "advance", "seconds": 60, "tick": 1e-9},
                    {"op": "advance", "seconds": 1}
                ]}"#,
            ))
            .await
            .unwrap();

        let failed: Vec<usize> = report.errors.iter().map(|e| e.step).collect();
        assert_eq!(failed, vec![2, 3]);
        assert!(report.errors.iter().all(|e| e.op == "advance"));
        assert_eq!(report.playhead, 1.0);
    }

    #[tokio::test]
    async fn test_view_mode_report_is_relative() {
        let interactor = SimulateInteractor::new(EngineConfig::default());
        let report = interactor
            .execute(request(
                SessionMode::View,
                Some((30.0, 90.0)),
                r#"{"steps": [{"op": "seek", "t": "0:45"}]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(report.displayed_duration, 60.0);
        assert_eq!(report.displayed_time, 15.0);
        assert_eq!(report.final_state, SessionState::Ready);
    }
}
