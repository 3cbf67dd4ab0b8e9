// Unit tests for range rules

use super::*;

#[test]
fn test_seed_without_saved_bounds_uses_full_duration() {
    let rules = RangeRules::default();
    assert_eq!(rules.seed(None, None, 120.0), Range::new(0.0, 120.0));
}

#[test]
fn test_seed_reproduces_saved_bounds_exactly() {
    let rules = RangeRules::default();
    let seeded = rules.seed(Some(30.0), Some(90.0), 120.0);
    assert_eq!(seeded.start, 30.0);
    assert_eq!(seeded.end, 90.0);
}

#[test]
fn test_seed_clamps_inverted_saved_bounds() {
    let rules = RangeRules::new(1.0);
    let seeded = rules.seed(Some(100.0), Some(20.0), 60.0);
    assert!(rules.is_valid(seeded, 60.0));
    assert_eq!(seeded, Range::new(59.0, 60.0));
}

#[test]
fn test_clamp_start_never_crosses_end_minus_gap() {
    let rules = RangeRules::new(1.0);
    let range = Range::new(10.0, 20.0);
    assert_eq!(rules.clamp_start(19.9, range, 60.0), 19.0);
    assert_eq!(rules.clamp_start(-5.0, range, 60.0), 0.0);
    assert_eq!(rules.clamp_start(12.5, range, 60.0), 12.5);
    assert_eq!(rules.clamp_start(f64::NAN, range, 60.0), 10.0);
}

#[test]
fn test_clamp_end_snaps_to_start_plus_gap() {
    let rules = RangeRules::new(1.0);
    let range = Range::new(10.0, 20.0);
    assert_eq!(rules.clamp_end(10.2, range, 60.0), 11.0);
    assert_eq!(rules.clamp_end(75.0, range, 60.0), 60.0);
    assert_eq!(rules.clamp_end(f64::INFINITY, range, 60.0), 20.0);
}

#[test]
fn test_gap_shrinks_for_short_assets() {
    let rules = RangeRules::new(1.0);
    assert_eq!(rules.effective_gap(0.4), 0.4);
    let seeded = rules.seed(None, None, 0.4);
    assert!(rules.is_valid(seeded, 0.4));
}

#[test]
fn test_drag_sequences_preserve_invariants() {
    let rules = RangeRules::new(0.5);
    let duration = 45.0;
    let mut range = rules.seed(None, None, duration);
    let targets = [-3.0, 0.0, 7.3, 22.5, 44.9, 45.0, 90.0, 12.0, 12.2, 0.1];
    for (i, &t) in targets.iter().enumerate() {
        if i % 2 == 0 {
            range.start = rules.clamp_start(t, range, duration);
        } else {
            range.end = rules.clamp_end(t, range, duration);
        }
        assert!(rules.is_valid(range, duration), "invalid after {}: {:?}", t, range);
        assert!(range.start < range.end);
    }
}

#[test]
fn test_relative_time_stays_within_range() {
    let active = Range::new(30.0, 90.0);
    assert_eq!(to_relative(30.0, active), 0.0);
    assert_eq!(to_relative(60.0, active), 30.0);
    assert_eq!(to_relative(90.0, active), 60.0);
    assert_eq!(to_relative(95.0, active), 60.0);
    assert_eq!(to_relative(10.0, active), 0.0);
}

#[test]
fn test_fraction_maps_through_offset() {
    let active = Range::new(30.0, 90.0);
    assert_eq!(from_relative_fraction(0.0, active), 30.0);
    assert_eq!(from_relative_fraction(0.5, active), 60.0);
    assert_eq!(from_relative_fraction(2.0, active), 90.0);
}

#[test]
fn test_clamp_playhead() {
    assert_eq!(clamp_playhead(130.0, 120.0), 120.0);
    assert_eq!(clamp_playhead(-1.0, 120.0), 0.0);
    assert_eq!(clamp_playhead(5.0, 0.0), 5.0);
    assert_eq!(clamp_playhead(f64::NAN, 120.0), 0.0);
}

fn assert_invariants(rules: &RangeRules, range: Range, duration: f64) {
    let gap = rules.effective_gap(duration);
    assert!(range.start >= 0.0, "negative start {:?}", range);
    assert!(range.end <= duration, "end past {}: {:?}", duration, range);
    assert!(range.end - range.start >= gap - 1e-9, "gap below {}: {:?}", gap, range);
    assert!(range.start < range.end, "empty range {:?}", range);
}

fn random_target(rng: &mut rand::rngs::StdRng, duration: f64) -> f64 {
    use rand::Rng;
    match rng.gen_range(0..20) {
        0 => f64::NAN,
        1 => f64::INFINITY,
        2 => f64::NEG_INFINITY,
        _ => rng.gen_range(-0.5 * duration..1.5 * duration),
    }
}

#[test]
fn test_random_seeds_and_drags_preserve_invariants() {
    use rand::{Rng, SeedableRng};

    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    for _ in 0..500 {
        let duration = rng.gen_range(0.01..3_600.0);
        let rules = RangeRules::new(rng.gen_range(0.1..5.0));
        let saved_start = rng.gen_bool(0.7).then(|| random_target(&mut rng, duration));
        let saved_end = rng.gen_bool(0.7).then(|| random_target(&mut rng, duration));

        let mut range = rules.seed(saved_start, saved_end, duration);
        assert_invariants(&rules, range, duration);

        for _ in 0..50 {
            let t = random_target(&mut rng, duration);
            if rng.gen_bool(0.5) {
                range.start = rules.clamp_start(t, range, duration);
            } else {
                range.end = rules.clamp_end(t, range, duration);
            }
            assert_invariants(&rules, range, duration);
        }
    }
}

#[test]
fn test_random_relative_mapping_stays_in_bounds() {
    use rand::{Rng, SeedableRng};

    let mut rng = rand::rngs::StdRng::seed_from_u64(0x0ff5e7);
    for _ in 0..1_000 {
        let duration = rng.gen_range(1.0..600.0);
        let rules = RangeRules::default();
        let a: f64 = rng.gen_range(0.0..duration);
        let b: f64 = rng.gen_range(0.0..duration);
        let active = rules.seed(Some(a.min(b)), Some(a.max(b)), duration);

        let playhead = rng.gen_range(-10.0..duration + 10.0);
        let relative = to_relative(playhead, active);
        assert!((0.0..=active.length()).contains(&relative));
        if (active.start..=active.end).contains(&playhead) {
            assert!((relative + active.start - playhead).abs() < 1e-9);
        }

        let fraction = rng.gen_range(-0.5..1.5);
        let absolute = from_relative_fraction(fraction, active);
        assert!(absolute >= active.start && absolute <= active.end + 1e-9);
    }
}
