//! Bounded playback: keeps the playhead inside the active range while playing

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, trace};

use crate::domain::model::{PlaybackState, Range};
use crate::domain::rules::{clamp_playhead, from_relative_fraction, to_relative, DEFAULT_END_EPSILON};
use crate::engine::events::{PlaybackListener, Subscription};
use crate::engine::range::RangeCell;
use crate::ports::MediaBackend;

/// Tuning for [`BoundedPlaybackController`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSettings {
    /// Playheads within this distance of the end restart from the start on play
    pub end_epsilon: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            end_epsilon: DEFAULT_END_EPSILON,
        }
    }
}

/// How positions are presented to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeDisplay {
    /// Playhead and duration of the whole asset
    #[default]
    Absolute,
    /// Playhead and duration relative to the active range
    Relative,
}

#[derive(Debug, Default)]
struct ControllerState {
    playback: PlaybackState,
    playhead: f64,
    duration: f64,
    corrections: u64,
    /// Range end at the last rewind; updates at or past it are from before the seek
    rewound_from: Option<f64>,
}

enum Correction {
    /// Reached the end: pause and rewind
    Rewind(f64),
    /// Behind the start: jump forward
    Forward(f64),
}

/// State shared with the backend's listener registry
struct ControllerCore {
    state: Mutex<ControllerState>,
    active: RangeCell,
    end_epsilon: f64,
    backend: Weak<dyn MediaBackend>,
}

impl ControllerCore {
    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PlaybackListener for ControllerCore {
    fn on_time_update(&self, t: f64) {
        let correction = {
            let mut state = self.state();
            if state.rewound_from.is_some_and(|end| t >= end) {
                trace!(t, "time update from before the rewind");
                return;
            }
            state.rewound_from = None;
            state.playhead = clamp_playhead(t, state.duration);
            if state.playback != PlaybackState::Playing {
                None
            } else {
                // Bounds are read now, not when the listener was attached
                match self.active.load() {
                    Some(range) if t >= range.end => {
                        state.playback = PlaybackState::Stopped;
                        state.playhead = range.start;
                        state.corrections += 1;
                        state.rewound_from = Some(range.end);
                        Some(Correction::Rewind(range.start))
                    }
                    Some(range) if t < range.start - self.end_epsilon => {
                        state.playhead = range.start;
                        state.corrections += 1;
                        Some(Correction::Forward(range.start))
                    }
                    _ => None,
                }
            }
        };

        let Some(correction) = correction else {
            trace!(t, "time update");
            return;
        };
        let Some(backend) = self.backend.upgrade() else {
            return;
        };
        match correction {
            Correction::Rewind(start) => {
                debug!(t, start, "end of range reached, rewinding");
                backend.pause();
                backend.seek(start);
            }
            Correction::Forward(start) => {
                debug!(t, start, "playhead behind range start, seeking forward");
                backend.seek(start);
            }
        }
    }

    fn on_play(&self) {
        self.state().playback = PlaybackState::Playing;
    }

    fn on_pause(&self) {
        self.state().playback = PlaybackState::Stopped;
    }
}

/// Sole writer of play/pause on a session's backend.
///
/// The active range comes from a [`RangeCell`]: the live edit range while
/// editing, the saved trim while viewing, or empty for unbounded playback.
pub struct BoundedPlaybackController {
    backend: Arc<dyn MediaBackend>,
    core: Arc<ControllerCore>,
    display: TimeDisplay,
    subscription: Option<Subscription>,
}

impl BoundedPlaybackController {
    pub fn new(backend: Arc<dyn MediaBackend>, active: RangeCell, settings: PlaybackSettings) -> Self {
        let core = Arc::new(ControllerCore {
            state: Mutex::new(ControllerState::default()),
            active,
            end_epsilon: settings.end_epsilon.max(0.0),
            backend: Arc::downgrade(&backend),
        });
        let subscription = backend.subscribe(core.clone());

        Self {
            backend,
            core,
            display: TimeDisplay::Absolute,
            subscription: Some(subscription),
        }
    }

    pub fn set_display(&mut self, display: TimeDisplay) {
        self.display = display;
    }

    pub fn display(&self) -> TimeDisplay {
        self.display
    }

    /// Duration used to clamp the playhead; `0.0` while unknown
    pub fn set_duration(&self, duration: f64) {
        self.core.state().duration = duration.max(0.0);
    }

    pub fn duration(&self) -> f64 {
        self.core.state().duration
    }

    /// Bounds applied to playback, `None` when unbounded
    pub fn active_range(&self) -> Option<Range> {
        self.core.active.load()
    }

    pub fn state(&self) -> PlaybackState {
        self.core.state().playback
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn playhead(&self) -> f64 {
        self.core.state().playhead
    }

    /// Number of automatic rewinds and forward jumps so far
    pub fn corrections(&self) -> u64 {
        self.core.state().corrections
    }

    /// Start playback inside the active range
    pub fn play(&self) {
        if self.subscription.is_none() {
            return;
        }
        if let Some(range) = self.active_range() {
            let playhead = self.playhead();
            if playhead < range.start || playhead >= range.end - self.core.end_epsilon {
                debug!(playhead, start = range.start, "restarting from range start");
                self.seek(range.start);
            }
        }
        self.core.state().playback = PlaybackState::Playing;
        self.backend.play();
    }

    pub fn pause(&self) {
        if self.subscription.is_none() {
            return;
        }
        self.core.state().playback = PlaybackState::Stopped;
        self.backend.pause();
    }

    pub fn toggle(&self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Seek to an absolute time, clamped to `[0, duration]`
    pub fn seek(&self, t: f64) {
        if self.subscription.is_none() {
            return;
        }
        let t = {
            let mut state = self.core.state();
            let t = clamp_playhead(t, state.duration);
            state.playhead = t;
            state.rewound_from = None;
            t
        };
        self.backend.seek(t);
    }

    /// Seek to a fraction of the displayed track
    pub fn seek_fraction(&self, fraction: f64) {
        let fraction = if fraction.is_finite() { fraction } else { 0.0 };
        match (self.display, self.active_range()) {
            (TimeDisplay::Relative, Some(range)) => self.seek(from_relative_fraction(fraction, range)),
            _ => self.seek(fraction.clamp(0.0, 1.0) * self.duration()),
        }
    }

    /// Playhead as presented to the host
    pub fn displayed_time(&self) -> f64 {
        match (self.display, self.active_range()) {
            (TimeDisplay::Relative, Some(range)) => to_relative(self.playhead(), range),
            _ => self.playhead(),
        }
    }

    /// Track length as presented to the host
    pub fn displayed_duration(&self) -> f64 {
        match (self.display, self.active_range()) {
            (TimeDisplay::Relative, Some(range)) => range.length(),
            _ => self.duration(),
        }
    }

    /// Pause if needed and detach from the backend. Idempotent.
    pub fn stop(&mut self) {
        if self.subscription.is_none() {
            return;
        }
        if self.is_playing() {
            self.pause();
        }
        self.subscription = None;
        debug!("playback controller detached");
    }
}

impl std::fmt::Debug for BoundedPlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedPlaybackController")
            .field("kind", &self.backend.kind())
            .field("state", &self.state())
            .field("playhead", &self.playhead())
            .field("active", &self.active_range())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::direct_backend::DirectBackend;
    use crate::adapters::simulated::SimulatedElement;
    use crate::domain::model::DirectLocator;
    use crate::domain::rules::RangeRules;
    use crate::engine::range::RangeModel;

    struct Rig {
        clock: SimulatedElement,
        backend: Arc<dyn MediaBackend>,
    }

    impl Rig {
        fn new(duration: f64) -> Self {
            let clock = SimulatedElement::new(duration);
            let backend = DirectBackend::open(clock.clone(), DirectLocator::Url("u".into())).unwrap();
            let backend: Arc<dyn MediaBackend> = Arc::new(backend);
            backend.pump();
            Self { clock, backend }
        }

        /// Advance in quarter-second ticks, pumping after each
        fn run(&self, seconds: f64) {
            let ticks = (seconds / 0.25).round() as usize;
            for _ in 0..ticks {
                self.clock.advance(0.25);
                self.backend.pump();
            }
        }
    }

    fn controller(rig: &Rig, active: RangeCell, duration: f64) -> BoundedPlaybackController {
        let controller = BoundedPlaybackController::new(rig.backend.clone(), active, PlaybackSettings::default());
        controller.set_duration(duration);
        controller
    }

    #[test]
    fn test_play_from_before_start_seeks_to_start() {
        let rig = Rig::new(120.0);
        let controller = controller(&rig, RangeCell::fixed(Range::new(30.0, 90.0)), 120.0);

        controller.play();
        rig.backend.pump();

        assert_eq!(rig.clock.seeks(), vec![30.0]);
        assert!(controller.is_playing());
        assert_eq!(controller.playhead(), 30.0);
    }

    #[test]
    fn test_play_at_end_restarts_from_start() {
        let rig = Rig::new(120.0);
        let controller = controller(&rig, RangeCell::fixed(Range::new(30.0, 90.0)), 120.0);
        controller.seek(89.97);
        rig.backend.pump();

        controller.play();

        assert_eq!(rig.clock.seeks(), vec![89.97, 30.0]);
    }

    #[test]
    fn test_reaching_end_pauses_and_rewinds() {
        let rig = Rig::new(120.0);
        let controller = controller(&rig, RangeCell::fixed(Range::new(30.0, 31.0)), 120.0);

        controller.play();
        rig.run(1.5);

        assert!(!controller.is_playing());
        assert!(!rig.clock.is_playing());
        assert_eq!(rig.clock.position(), 30.0);
        assert_eq!(controller.playhead(), 30.0);
        assert_eq!(controller.corrections(), 1);
    }

    #[test]
    fn test_stale_updates_after_rewind_are_ignored() {
        let rig = Rig::new(120.0);
        let controller = controller(&rig, RangeCell::fixed(Range::new(30.0, 31.0)), 120.0);
        controller.play();
        rig.run(0.75);

        // Two ticks land in one batch, both reporting a time past the end
        rig.clock.advance(0.25);
        rig.clock.advance(0.25);
        rig.backend.pump();

        assert!(!controller.is_playing());
        assert_eq!(controller.playhead(), 30.0);
        assert_eq!(controller.corrections(), 1);

        rig.backend.pump();
        assert_eq!(controller.playhead(), 30.0);
        controller.play();
        assert_eq!(rig.clock.seeks(), vec![30.0, 30.0]);
    }

    /// Every time update with the controller's view right after handling it
    struct UpdateRecorder {
        core: Arc<ControllerCore>,
        samples: Mutex<Vec<(f64, PlaybackState, f64, Option<Range>)>>,
    }

    impl PlaybackListener for UpdateRecorder {
        fn on_time_update(&self, t: f64) {
            let (playback, playhead) = {
                let state = self.core.state();
                (state.playback, state.playhead)
            };
            let range = self.core.active.load();
            self.samples
                .lock()
                .unwrap()
                .push((t, playback, playhead, range));
        }
    }

    #[test]
    fn test_random_drags_keep_playhead_inside_range() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let duration = 60.0;
        let rig = Rig::new(duration);
        let mut model = RangeModel::new(RangeRules::default());
        model.seed(None, None, duration);
        let controller = controller(&rig, model.cell(), duration);
        let recorder = Arc::new(UpdateRecorder {
            core: controller.core.clone(),
            samples: Mutex::new(Vec::new()),
        });
        let _recording = rig.backend.subscribe(recorder.clone());

        let mut rng = StdRng::seed_from_u64(0x7e11);
        controller.play();
        for _ in 0..2_000 {
            match rng.gen_range(0..10) {
                0 => {
                    model.set_start(rng.gen_range(-5.0..duration + 5.0));
                }
                1 => {
                    model.set_end(rng.gen_range(-5.0..duration + 5.0));
                }
                _ => {
                    rig.clock.advance(0.25);
                    rig.backend.pump();
                    if !controller.is_playing() {
                        controller.play();
                    }
                }
            }
        }

        let samples = recorder.samples.lock().unwrap();
        assert!(samples.len() > 500);
        assert!(controller.corrections() > 0);
        let eps = DEFAULT_END_EPSILON;
        for &(t, playback, playhead, range) in samples.iter() {
            let range = range.unwrap();
            if playback == PlaybackState::Playing {
                assert!(
                    playhead >= range.start - eps - 1e-9 && playhead < range.end,
                    "playhead {} outside {:?} (t = {})",
                    playhead,
                    range,
                    t
                );
            }
            if t >= range.end {
                assert_eq!(playback, PlaybackState::Stopped, "still playing at {} past {:?}", t, range);
            }
        }
    }

    #[test]
    fn test_drag_end_handle_while_playing() {
        let rig = Rig::new(60.0);
        let mut model = RangeModel::new(RangeRules::default());
        model.seed(None, None, 60.0);
        let controller = controller(&rig, model.cell(), 60.0);

        controller.play();
        rig.run(2.0);
        assert!(controller.is_playing());

        // Shrink the range below the current playhead mid-playback
        model.set_end(1.5);
        rig.run(0.25);

        assert!(!controller.is_playing());
        assert_eq!(rig.clock.position(), 0.0);
    }

    #[test]
    fn test_drag_start_past_playhead_jumps_forward() {
        let rig = Rig::new(60.0);
        let mut model = RangeModel::new(RangeRules::default());
        model.seed(None, None, 60.0);
        let controller = controller(&rig, model.cell(), 60.0);

        controller.play();
        rig.run(1.0);
        model.set_start(10.0);
        rig.run(0.25);

        assert!(controller.is_playing());
        assert_eq!(rig.clock.position(), 10.0);
        let playhead = controller.playhead();
        assert!((10.0..=60.0).contains(&playhead));
    }

    #[test]
    fn test_unbounded_playback_runs_to_natural_end() {
        let rig = Rig::new(2.0);
        let controller = controller(&rig, RangeCell::new(), 2.0);

        controller.play();
        rig.run(3.0);

        assert_eq!(controller.corrections(), 0);
        assert_eq!(controller.playhead(), 2.0);
        // Native end-of-media pause keeps the controller in sync
        assert!(!controller.is_playing());
    }

    #[test]
    fn test_relative_display_and_fraction_seek() {
        let rig = Rig::new(120.0);
        let mut controller = controller(&rig, RangeCell::fixed(Range::new(30.0, 90.0)), 120.0);
        controller.set_display(TimeDisplay::Relative);

        controller.seek(45.0);
        assert_eq!(controller.displayed_time(), 15.0);
        assert_eq!(controller.displayed_duration(), 60.0);

        controller.seek_fraction(0.5);
        assert_eq!(controller.playhead(), 60.0);
        assert_eq!(rig.clock.seeks().last(), Some(&60.0));

        controller.seek(100.0);
        assert_eq!(controller.displayed_time(), 60.0);
    }

    #[test]
    fn test_native_play_pause_sync() {
        let rig = Rig::new(30.0);
        let controller = controller(&rig, RangeCell::new(), 30.0);

        rig.backend.play();
        rig.backend.pump();
        assert!(controller.is_playing());

        rig.backend.pause();
        rig.backend.pump();
        assert!(!controller.is_playing());
    }

    #[test]
    fn test_stop_detaches() {
        let rig = Rig::new(30.0);
        let mut controller = controller(&rig, RangeCell::new(), 30.0);
        controller.play();
        controller.stop();
        controller.stop();

        assert!(!rig.clock.is_playing());
        rig.backend.play();
        rig.backend.pump();
        assert!(!controller.is_playing());
    }
}
