//! Range model: the live `[start, end]` selection of a trim session

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::domain::model::Range;
use crate::domain::rules::RangeRules;
use crate::engine::duration::is_valid_duration;

/// Shared slot holding the current range.
///
/// Written on every range change and read by event handlers at event time,
/// so a handler subscribed long ago still observes the latest bounds.
/// `None` means playback is unbounded.
#[derive(Clone, Default)]
pub struct RangeCell {
    inner: Arc<RwLock<Option<Range>>>,
}

impl RangeCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell pre-loaded with a fixed range (saved trim in view mode)
    pub fn fixed(range: Range) -> Self {
        let cell = Self::new();
        cell.store(Some(range));
        cell
    }

    pub fn load(&self) -> Option<Range> {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn store(&self, range: Option<Range>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = range;
    }
}

impl std::fmt::Debug for RangeCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RangeCell").field(&self.load()).finish()
    }
}

/// Editable trim range with silent clamping
#[derive(Debug)]
pub struct RangeModel {
    rules: RangeRules,
    duration: f64,
    cell: RangeCell,
    seeded: bool,
}

impl RangeModel {
    pub fn new(rules: RangeRules) -> Self {
        Self::with_cell(rules, RangeCell::new())
    }

    pub fn with_cell(rules: RangeRules, cell: RangeCell) -> Self {
        Self {
            rules,
            duration: 0.0,
            cell,
            seeded: false,
        }
    }

    /// Seed from saved bounds once duration first becomes known.
    ///
    /// Returns `false` and leaves the range untouched if already seeded or if
    /// `duration` is not a valid positive value.
    pub fn seed(&mut self, saved_start: Option<f64>, saved_end: Option<f64>, duration: f64) -> bool {
        if self.seeded {
            warn!(duration, "range already seeded, keeping live edits");
            return false;
        }
        if !is_valid_duration(duration) {
            debug!(duration, "cannot seed range without a duration");
            return false;
        }

        let range = self.rules.seed(saved_start, saved_end, duration);
        self.duration = duration;
        self.seeded = true;
        self.cell.store(Some(range));
        debug!(start = range.start, end = range.end, duration, "range seeded");
        true
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn rules(&self) -> RangeRules {
        self.rules
    }

    pub fn range(&self) -> Option<Range> {
        self.cell.load()
    }

    /// Handle onto the shared range slot
    pub fn cell(&self) -> RangeCell {
        self.cell.clone()
    }

    /// Move the start bound, clamped to `[0, end - gap]`
    pub fn set_start(&mut self, t: f64) -> Option<Range> {
        let mut range = self.range()?;
        range.start = self.rules.clamp_start(t, range, self.duration);
        self.cell.store(Some(range));
        Some(range)
    }

    /// Move the end bound, clamped to `[start + gap, duration]`
    pub fn set_end(&mut self, t: f64) -> Option<Range> {
        let mut range = self.range()?;
        range.end = self.rules.clamp_end(t, range, self.duration);
        self.cell.store(Some(range));
        Some(range)
    }

    /// Back to the full asset. The caller rewinds the playhead to `0`.
    pub fn reset(&mut self) -> Option<Range> {
        if !self.seeded {
            return None;
        }
        let range = Range::new(0.0, self.duration);
        self.cell.store(Some(range));
        Some(range)
    }
}
