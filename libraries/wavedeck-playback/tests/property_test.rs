//! Property-based tests for navigation, seek and volume
//!
//! Uses proptest to verify invariants across many random inputs.

mod common;

use common::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use wavedeck_playback::navigation::{
    generate_shuffle_order, generate_shuffle_order_with, next_index, previous_index,
};
use wavedeck_playback::{PlayMode, Volume};

// ===== Helpers =====

fn queue_and_index() -> impl Strategy<Value = (usize, usize)> {
    (1usize..200).prop_flat_map(|len| (Just(len), 0..len))
}

// ===== Property Tests =====

proptest! {
    /// Property: next then previous returns to the start in Normal and RepeatAll
    #[test]
    fn next_then_previous_round_trips((len, current) in queue_and_index()) {
        for mode in [PlayMode::Normal, PlayMode::RepeatAll] {
            if let Some(next) = next_index(current, len, mode, &[]) {
                prop_assert_eq!(previous_index(next, len, mode, &[]), Some(current));
            }
        }
    }

    /// Property: previous then next returns to the start in Normal and RepeatAll
    #[test]
    fn previous_then_next_round_trips((len, current) in queue_and_index()) {
        for mode in [PlayMode::Normal, PlayMode::RepeatAll] {
            if let Some(previous) = previous_index(current, len, mode, &[]) {
                prop_assert_eq!(next_index(previous, len, mode, &[]), Some(current));
            }
        }
    }

    /// Property: every mode stays in bounds
    #[test]
    fn navigation_stays_in_bounds((len, current) in queue_and_index(), seed in any::<u64>()) {
        let order = generate_shuffle_order_with(len, &mut StdRng::seed_from_u64(seed));
        for mode in [PlayMode::Normal, PlayMode::RepeatOne, PlayMode::RepeatAll, PlayMode::Shuffle] {
            if let Some(next) = next_index(current, len, mode, &order) {
                prop_assert!(next < len);
            }
            if let Some(previous) = previous_index(current, len, mode, &order) {
                prop_assert!(previous < len);
            }
        }
    }

    /// Property: one shuffle cycle visits every index exactly once
    #[test]
    fn shuffle_cycle_never_repeats((len, start) in queue_and_index(), seed in any::<u64>()) {
        let order = generate_shuffle_order_with(len, &mut StdRng::seed_from_u64(seed));
        let mut seen = HashSet::new();
        let mut current = start;
        for _ in 0..len {
            prop_assert!(seen.insert(current), "index {} repeated within one cycle", current);
            current = next_index(current, len, PlayMode::Shuffle, &order).unwrap();
        }
        prop_assert_eq!(current, start);
        prop_assert_eq!(seen.len(), len);
    }

    /// Property: shuffle traversal is deterministic for a given order
    #[test]
    fn shuffle_traversal_is_deterministic((len, current) in queue_and_index(), seed in any::<u64>()) {
        let order = generate_shuffle_order_with(len, &mut StdRng::seed_from_u64(seed));
        prop_assert_eq!(
            next_index(current, len, PlayMode::Shuffle, &order),
            next_index(current, len, PlayMode::Shuffle, &order)
        );
        prop_assert_eq!(
            previous_index(current, len, PlayMode::Shuffle, &order),
            previous_index(current, len, PlayMode::Shuffle, &order)
        );
    }

    /// Property: generated shuffle order is a permutation
    #[test]
    fn shuffle_order_is_permutation(len in 0usize..500) {
        let mut order = generate_shuffle_order(len);
        order.sort_unstable();
        prop_assert_eq!(order, (0..len).collect::<Vec<_>>());
    }

    /// Property: volume always lands in 0.0..=1.0
    #[test]
    fn volume_always_clamped(level in prop::num::f32::ANY) {
        let mut volume = Volume::new(0.5);
        volume.set_level(level);
        prop_assert!((0.0..=1.0).contains(&volume.level()));
        prop_assert!((0.0..=1.0).contains(&volume.effective()));
    }

    /// Property: seeking twice to the same target gives the same position
    #[test]
    fn seek_is_idempotent(target in -100.0f64..200.0, duration in 1.0f64..120.0) {
        let mut player = controller(abc());
        play_index(&mut player, 0, duration);

        player.seek_to(target);
        let first = player.state().position_secs;
        player.seek_to(target);

        prop_assert_eq!(player.state().position_secs, first);
        prop_assert!(first >= 0.0 && first <= duration);
    }
}
