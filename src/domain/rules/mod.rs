// Domain rules - Range invariants and time remapping

use crate::domain::model::*;

/// Smallest trim length allowed, in seconds
pub const DEFAULT_MIN_GAP: f64 = 1.0;

/// Tolerance for "playhead is at the end of the range"
pub const DEFAULT_END_EPSILON: f64 = 0.05;

/// Clamping rules that keep `0 <= start`, `start + gap <= end <= duration`.
///
/// Every operation clamps instead of failing. Non-finite inputs leave the
/// corresponding bound unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeRules {
    pub min_gap: f64,
}

impl Default for RangeRules {
    fn default() -> Self {
        Self {
            min_gap: DEFAULT_MIN_GAP,
        }
    }
}

impl RangeRules {
    pub fn new(min_gap: f64) -> Self {
        Self { min_gap }
    }

    /// Gap actually enforced; shrinks for assets shorter than `min_gap`
    pub fn effective_gap(&self, duration: f64) -> f64 {
        self.min_gap.min(duration).max(0.0)
    }

    /// Initial range from optional saved bounds
    pub fn seed(&self, saved_start: Option<f64>, saved_end: Option<f64>, duration: f64) -> Range {
        let gap = self.effective_gap(duration);
        let start = finite_or(saved_start, 0.0).clamp(0.0, duration - gap);
        let end = finite_or(saved_end, duration).clamp((start + gap).min(duration), duration);
        Range::new(start, end)
    }

    /// New start bound for a drag to `t`
    pub fn clamp_start(&self, t: f64, current: Range, duration: f64) -> f64 {
        if !t.is_finite() {
            return current.start;
        }
        let upper = (current.end - self.effective_gap(duration)).max(0.0);
        t.clamp(0.0, upper)
    }

    /// New end bound for a drag to `t`
    pub fn clamp_end(&self, t: f64, current: Range, duration: f64) -> f64 {
        if !t.is_finite() {
            return current.end;
        }
        let lower = (current.start + self.effective_gap(duration)).min(duration);
        t.clamp(lower, duration)
    }

    /// Whether `range` satisfies every invariant for `duration`
    pub fn is_valid(&self, range: Range, duration: f64) -> bool {
        let gap = self.effective_gap(duration);
        range.start >= 0.0 && range.start + gap <= range.end + f64::EPSILON && range.end <= duration
    }
}

fn finite_or(value: Option<f64>, fallback: f64) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(fallback)
}

/// Clamp an absolute playhead into `[0, duration]`
pub fn clamp_playhead(t: f64, duration: f64) -> f64 {
    if !t.is_finite() {
        return 0.0;
    }
    if duration > 0.0 {
        t.clamp(0.0, duration)
    } else {
        t.max(0.0)
    }
}

/// Playback position relative to the start of `active`, within `[0, active.length()]`
pub fn to_relative(playhead: f64, active: Range) -> f64 {
    (playhead - active.start).clamp(0.0, active.length())
}

/// Absolute time for a fractional position within `active`
pub fn from_relative_fraction(fraction: f64, active: Range) -> f64 {
    active.start + fraction.clamp(0.0, 1.0) * active.length()
}

#[cfg(test)]
mod tests;
