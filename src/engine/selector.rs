//! Range selector: pointer gestures over the trim track
//!
//! The selector owns no time state. Each call receives a [`TrackFrame`]
//! snapshot and returns a [`SelectorAction`] for the session to apply to the
//! range model or as a seek.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::domain::model::{InteractionTarget, Range, TimeSpec};

/// Targets in hit-test order; the first match owns the pointer
pub const HIT_PRECEDENCE: [InteractionTarget; 4] = [
    InteractionTarget::StartHandle,
    InteractionTarget::EndHandle,
    InteractionTarget::PlayheadLabel,
    InteractionTarget::Track,
];

/// Pixel layout of the track.
///
/// The label band `[0, label_height)` sits above the track band
/// `[label_height, label_height + track_height]`. Handles span both bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackGeometry {
    pub left: f64,
    pub width: f64,
    pub track_height: f64,
    pub label_height: f64,
    pub handle_width: f64,
    pub label_width: f64,
}

impl Default for TrackGeometry {
    fn default() -> Self {
        Self {
            left: 0.0,
            width: 600.0,
            track_height: 48.0,
            label_height: 20.0,
            handle_width: 12.0,
            label_width: 48.0,
        }
    }
}

impl TrackGeometry {
    fn total_height(&self) -> f64 {
        self.label_height + self.track_height
    }

    /// Fraction of the track under `x`, clamped to `[0, 1]`
    pub fn fraction_at(&self, x: f64) -> f64 {
        if self.width <= 0.0 || !x.is_finite() {
            return 0.0;
        }
        ((x - self.left) / self.width).clamp(0.0, 1.0)
    }
}

/// What the track currently represents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackFrame {
    /// Absolute time at the left edge of the track
    pub offset: f64,
    /// Seconds spanned by the track; `0` disables the selector
    pub span: f64,
    /// Absolute playhead
    pub playhead: f64,
    /// Range shown with draggable handles
    pub handles: Option<Range>,
}

impl TrackFrame {
    pub fn is_disabled(&self) -> bool {
        !(self.span.is_finite() && self.span > 0.0)
    }

    fn time_at(&self, fraction: f64) -> f64 {
        self.offset + fraction * self.span
    }

    fn x_of(&self, geometry: &TrackGeometry, t: f64) -> f64 {
        if self.is_disabled() {
            return geometry.left;
        }
        geometry.left + ((t - self.offset) / self.span).clamp(0.0, 1.0) * geometry.width
    }
}

/// A pointer sample in track-local pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pointer {
    pub id: u32,
    pub x: f64,
    pub y: f64,
}

impl Pointer {
    pub fn new(id: u32, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }
}

/// Operation requested by a gesture, times are absolute seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "action", content = "t", rename_all = "snake_case")]
pub enum SelectorAction {
    SetStart(f64),
    SetEnd(f64),
    Seek(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Capture {
    pointer_id: u32,
    target: InteractionTarget,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rect {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
}

impl Rect {
    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

/// Render snapshot of the track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackView {
    pub disabled: bool,
    pub playhead_x: f64,
    pub playhead_label: String,
    pub start_x: Option<f64>,
    pub end_x: Option<f64>,
    pub start_label: Option<String>,
    pub end_label: Option<String>,
    /// Highlighted span `[x0, x1]`
    pub selection: Option<(f64, f64)>,
    pub captured: Option<InteractionTarget>,
    pub waveform: Vec<f32>,
}

/// Decorative bar heights in `[0.15, 1.0]`, stable for a given key
pub fn synthetic_waveform(key: &str, bars: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(fnv1a(key.as_bytes()));
    let raw: Vec<f32> = (0..bars).map(|_| rng.gen_range(0.15f32..=1.0)).collect();

    // Three-tap smoothing keeps neighbouring bars related
    (0..raw.len())
        .map(|i| {
            let lo = i.saturating_sub(1);
            let hi = (i + 1).min(raw.len() - 1);
            let window = &raw[lo..=hi];
            window.iter().sum::<f32>() / window.len() as f32
        })
        .collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

pub struct RangeSelector {
    geometry: TrackGeometry,
    waveform: Vec<f32>,
    capture: Option<Capture>,
}

impl RangeSelector {
    pub fn new(geometry: TrackGeometry, waveform: Vec<f32>) -> Self {
        Self {
            geometry,
            waveform,
            capture: None,
        }
    }

    pub fn geometry(&self) -> &TrackGeometry {
        &self.geometry
    }

    /// Target currently owning the pointer
    pub fn captured(&self) -> Option<InteractionTarget> {
        self.capture.map(|c| c.target)
    }

    fn target_rect(&self, target: InteractionTarget, frame: &TrackFrame) -> Option<Rect> {
        let g = &self.geometry;
        let centered = |x: f64, half: f64, y0: f64, y1: f64| Rect {
            x0: x - half,
            x1: x + half,
            y0,
            y1,
        };
        match target {
            InteractionTarget::StartHandle => frame.handles.map(|r| {
                centered(frame.x_of(g, r.start), g.handle_width / 2.0, 0.0, g.total_height())
            }),
            InteractionTarget::EndHandle => frame.handles.map(|r| {
                centered(frame.x_of(g, r.end), g.handle_width / 2.0, 0.0, g.total_height())
            }),
            InteractionTarget::PlayheadLabel => Some(centered(
                frame.x_of(g, frame.playhead),
                g.label_width / 2.0,
                0.0,
                g.label_height,
            )),
            InteractionTarget::Track => Some(Rect {
                x0: g.left,
                x1: g.left + g.width,
                y0: g.label_height,
                y1: g.total_height(),
            }),
        }
    }

    /// First target in [`HIT_PRECEDENCE`] containing the point
    pub fn hit_test(&self, x: f64, y: f64, frame: &TrackFrame) -> Option<InteractionTarget> {
        if frame.is_disabled() {
            return None;
        }
        HIT_PRECEDENCE.into_iter().find(|target| {
            self.target_rect(*target, frame)
                .is_some_and(|rect| rect.contains(x, y))
        })
    }

    pub fn pointer_down(&mut self, pointer: Pointer, frame: &TrackFrame) -> Option<SelectorAction> {
        if frame.is_disabled() {
            trace!("selector disabled, ignoring pointer");
            return None;
        }
        if let Some(active) = self.capture {
            debug!(
                active = active.pointer_id,
                rejected = pointer.id,
                "pointer already captured"
            );
            return None;
        }

        let target = self.hit_test(pointer.x, pointer.y, frame)?;
        self.capture = Some(Capture {
            pointer_id: pointer.id,
            target,
        });
        debug!(pointer = pointer.id, ?target, "pointer captured");

        // A press on the bare track seeks immediately
        match target {
            InteractionTarget::Track => Some(self.action_for(target, pointer.x, frame)),
            _ => None,
        }
    }

    pub fn pointer_move(&mut self, pointer: Pointer, frame: &TrackFrame) -> Option<SelectorAction> {
        let capture = self.capture.filter(|c| c.pointer_id == pointer.id)?;
        if frame.is_disabled() {
            return None;
        }
        Some(self.action_for(capture.target, pointer.x, frame))
    }

    /// Release the capture held by `pointer_id`; returns the released target
    pub fn pointer_up(&mut self, pointer_id: u32) -> Option<InteractionTarget> {
        let capture = self.capture.filter(|c| c.pointer_id == pointer_id)?;
        self.capture = None;
        debug!(pointer = pointer_id, target = ?capture.target, "pointer released");
        Some(capture.target)
    }

    /// Drop any capture without an action
    pub fn cancel_gesture(&mut self) {
        self.capture = None;
    }

    fn action_for(&self, target: InteractionTarget, x: f64, frame: &TrackFrame) -> SelectorAction {
        let t = frame.time_at(self.geometry.fraction_at(x));
        match target {
            InteractionTarget::StartHandle => SelectorAction::SetStart(t),
            InteractionTarget::EndHandle => SelectorAction::SetEnd(t),
            InteractionTarget::PlayheadLabel | InteractionTarget::Track => SelectorAction::Seek(t),
        }
    }

    pub fn render(&self, frame: &TrackFrame) -> TrackView {
        let g = &self.geometry;
        let label = |t: f64| TimeSpec::from_seconds(t.max(0.0)).format_label();
        let handles = frame.handles.filter(|_| !frame.is_disabled());

        TrackView {
            disabled: frame.is_disabled(),
            playhead_x: frame.x_of(g, frame.playhead),
            playhead_label: label(frame.playhead - frame.offset),
            start_x: handles.map(|r| frame.x_of(g, r.start)),
            end_x: handles.map(|r| frame.x_of(g, r.end)),
            start_label: handles.map(|r| label(r.start)),
            end_label: handles.map(|r| label(r.end)),
            selection: handles.map(|r| (frame.x_of(g, r.start), frame.x_of(g, r.end))),
            captured: self.captured(),
            waveform: self.waveform.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit_frame(range: Range, playhead: f64) -> TrackFrame {
        TrackFrame {
            offset: 0.0,
            span: 100.0,
            playhead,
            handles: Some(range),
        }
    }

    fn selector() -> RangeSelector {
        // 1px per second with the default 600px track would be awkward; use 100px
        RangeSelector::new(
            TrackGeometry {
                width: 100.0,
                ..TrackGeometry::default()
            },
            Vec::new(),
        )
    }

    const TRACK_Y: f64 = 40.0;
    const LABEL_Y: f64 = 10.0;

    #[test]
    fn test_fraction_clamped() {
        let g = TrackGeometry {
            left: 10.0,
            width: 100.0,
            ..TrackGeometry::default()
        };
        assert_eq!(g.fraction_at(60.0), 0.5);
        assert_eq!(g.fraction_at(-50.0), 0.0);
        assert_eq!(g.fraction_at(500.0), 1.0);
    }

    #[test]
    fn test_handles_win_over_label_and_track() {
        let selector = selector();
        // Playhead sits exactly on the start handle
        let frame = edit_frame(Range::new(20.0, 80.0), 20.0);

        assert_eq!(
            selector.hit_test(20.0, LABEL_Y, &frame),
            Some(InteractionTarget::StartHandle)
        );
        assert_eq!(
            selector.hit_test(80.0, TRACK_Y, &frame),
            Some(InteractionTarget::EndHandle)
        );
        assert_eq!(
            selector.hit_test(40.0, TRACK_Y, &frame),
            Some(InteractionTarget::Track)
        );
    }

    #[test]
    fn test_label_hit_in_label_band_only() {
        let selector = selector();
        let frame = edit_frame(Range::new(0.0, 100.0), 50.0);

        assert_eq!(
            selector.hit_test(55.0, LABEL_Y, &frame),
            Some(InteractionTarget::PlayheadLabel)
        );
        assert_eq!(
            selector.hit_test(55.0, TRACK_Y, &frame),
            Some(InteractionTarget::Track)
        );
    }

    #[test]
    fn test_drag_end_handle() {
        let mut selector = selector();
        let frame = edit_frame(Range::new(20.0, 80.0), 0.0);

        assert_eq!(selector.pointer_down(Pointer::new(1, 81.0, TRACK_Y), &frame), None);
        assert_eq!(selector.captured(), Some(InteractionTarget::EndHandle));
        assert_eq!(
            selector.pointer_move(Pointer::new(1, 64.5, TRACK_Y), &frame),
            Some(SelectorAction::SetEnd(64.5))
        );
        // Off-track moves clamp to the track edge
        assert_eq!(
            selector.pointer_move(Pointer::new(1, 300.0, 500.0), &frame),
            Some(SelectorAction::SetEnd(100.0))
        );
        assert_eq!(selector.pointer_up(1), Some(InteractionTarget::EndHandle));
        assert_eq!(selector.captured(), None);
    }

    #[test]
    fn test_track_press_seeks() {
        let mut selector = selector();
        let frame = edit_frame(Range::new(20.0, 80.0), 0.0);

        assert_eq!(
            selector.pointer_down(Pointer::new(1, 50.0, TRACK_Y), &frame),
            Some(SelectorAction::Seek(50.0))
        );
    }

    #[test]
    fn test_second_pointer_cannot_steal_capture() {
        let mut selector = selector();
        let frame = edit_frame(Range::new(20.0, 80.0), 0.0);

        selector.pointer_down(Pointer::new(1, 20.0, TRACK_Y), &frame);
        assert_eq!(selector.pointer_down(Pointer::new(2, 80.0, TRACK_Y), &frame), None);
        assert_eq!(selector.pointer_move(Pointer::new(2, 70.0, TRACK_Y), &frame), None);
        assert_eq!(selector.pointer_up(2), None);
        assert_eq!(selector.captured(), Some(InteractionTarget::StartHandle));
    }

    #[test]
    fn test_disabled_without_duration() {
        let mut selector = selector();
        let frame = TrackFrame {
            offset: 0.0,
            span: 0.0,
            playhead: 0.0,
            handles: None,
        };

        assert_eq!(selector.pointer_down(Pointer::new(1, 50.0, TRACK_Y), &frame), None);
        assert_eq!(selector.captured(), None);
        assert!(selector.render(&frame).disabled);
    }

    #[test]
    fn test_relative_track_maps_through_offset() {
        let mut selector = selector();
        let frame = TrackFrame {
            offset: 30.0,
            span: 60.0,
            playhead: 45.0,
            handles: None,
        };

        assert_eq!(
            selector.pointer_down(Pointer::new(1, 50.0, TRACK_Y), &frame),
            Some(SelectorAction::Seek(60.0))
        );
        let view = selector.render(&frame);
        assert_eq!(view.playhead_x, 25.0);
        assert_eq!(view.playhead_label, "0:15");
        assert_eq!(view.start_x, None);
    }

    #[test]
    fn test_render_positions() {
        let selector = selector();
        let view = selector.render(&edit_frame(Range::new(30.0, 90.0), 45.0));

        assert_eq!(view.selection, Some((30.0, 90.0)));
        assert_eq!(view.start_label.as_deref(), Some("0:30"));
        assert_eq!(view.end_label.as_deref(), Some("1:30"));
        assert_eq!(view.playhead_x, 45.0);
    }

    #[test]
    fn test_waveform_is_deterministic() {
        let a = synthetic_waveform("managed:abc", 32);
        let b = synthetic_waveform("managed:abc", 32);
        let c = synthetic_waveform("managed:xyz", 32);

        assert_eq!(a.len(), 32);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|h| (0.15..=1.0).contains(h)));
        assert!(synthetic_waveform("k", 0).is_empty());
    }
}
