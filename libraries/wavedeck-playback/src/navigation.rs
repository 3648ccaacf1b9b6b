//! Queue navigation policy
//!
//! Pure functions that pick the next/previous queue index for a play mode.
//! Randomness lives in [`generate_shuffle_order`] and in the shuffle fallback
//! (current index missing from the order); everything else is deterministic
//! for a given shuffle order.

use crate::types::PlayMode;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

/// Uniform random permutation of `0..queue_len` (Fisher-Yates)
pub fn generate_shuffle_order(queue_len: usize) -> Vec<usize> {
    generate_shuffle_order_with(queue_len, &mut thread_rng())
}

/// [`generate_shuffle_order`] with a caller-supplied RNG
pub fn generate_shuffle_order_with<R: Rng>(queue_len: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..queue_len).collect();
    order.shuffle(rng);
    order
}

/// Index to play after `current`, or `None` when the queue is exhausted
pub fn next_index(
    current: usize,
    queue_len: usize,
    mode: PlayMode,
    shuffle_order: &[usize],
) -> Option<usize> {
    next_index_with(current, queue_len, mode, shuffle_order, &mut thread_rng())
}

/// [`next_index`] with a caller-supplied RNG for the shuffle fallback
pub fn next_index_with<R: Rng>(
    current: usize,
    queue_len: usize,
    mode: PlayMode,
    shuffle_order: &[usize],
    rng: &mut R,
) -> Option<usize> {
    if queue_len == 0 {
        return None;
    }

    match mode {
        PlayMode::RepeatOne => Some(current),
        PlayMode::Shuffle => match position_in(shuffle_order, current) {
            Some(pos) => Some(shuffle_order[(pos + 1) % shuffle_order.len()]),
            // Not in the order: a fresh pick, which may repeat a recent track
            None => Some(rng.gen_range(0..queue_len)),
        },
        PlayMode::RepeatAll => Some((current + 1) % queue_len),
        PlayMode::Normal => (current + 1 < queue_len).then_some(current + 1),
    }
}

/// Index to play before `current`, or `None` at the start of the queue
pub fn previous_index(
    current: usize,
    queue_len: usize,
    mode: PlayMode,
    shuffle_order: &[usize],
) -> Option<usize> {
    previous_index_with(current, queue_len, mode, shuffle_order, &mut thread_rng())
}

/// [`previous_index`] with a caller-supplied RNG for the shuffle fallback
pub fn previous_index_with<R: Rng>(
    current: usize,
    queue_len: usize,
    mode: PlayMode,
    shuffle_order: &[usize],
    rng: &mut R,
) -> Option<usize> {
    if queue_len == 0 {
        return None;
    }

    match mode {
        PlayMode::RepeatOne => Some(current),
        PlayMode::Shuffle => match position_in(shuffle_order, current) {
            Some(0) => shuffle_order.last().copied(),
            Some(pos) => Some(shuffle_order[pos - 1]),
            None => Some(rng.gen_range(0..queue_len)),
        },
        PlayMode::RepeatAll => Some(if current == 0 {
            queue_len - 1
        } else {
            (current - 1).min(queue_len - 1)
        }),
        PlayMode::Normal => current.checked_sub(1).filter(|&i| i < queue_len),
    }
}

/// First index to play when starting from nothing
pub fn first_index(queue_len: usize, mode: PlayMode, shuffle_order: &[usize]) -> Option<usize> {
    if queue_len == 0 {
        return None;
    }
    match mode {
        PlayMode::Shuffle => shuffle_order
            .first()
            .copied()
            .filter(|&i| i < queue_len)
            .or(Some(0)),
        _ => Some(0),
    }
}

fn position_in(shuffle_order: &[usize], current: usize) -> Option<usize> {
    shuffle_order.iter().position(|&i| i == current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn empty_queue_has_no_neighbours() {
        for mode in [
            PlayMode::Normal,
            PlayMode::RepeatOne,
            PlayMode::RepeatAll,
            PlayMode::Shuffle,
        ] {
            assert_eq!(next_index(0, 0, mode, &[]), None);
            assert_eq!(previous_index(0, 0, mode, &[]), None);
        }
    }

    #[test]
    fn normal_mode_stops_at_edges() {
        assert_eq!(next_index(0, 3, PlayMode::Normal, &[]), Some(1));
        assert_eq!(next_index(2, 3, PlayMode::Normal, &[]), None);
        assert_eq!(previous_index(1, 3, PlayMode::Normal, &[]), Some(0));
        assert_eq!(previous_index(0, 3, PlayMode::Normal, &[]), None);
    }

    #[test]
    fn repeat_all_wraps() {
        assert_eq!(next_index(2, 3, PlayMode::RepeatAll, &[]), Some(0));
        assert_eq!(previous_index(0, 3, PlayMode::RepeatAll, &[]), Some(2));
    }

    #[test]
    fn repeat_one_stays_put() {
        assert_eq!(next_index(1, 3, PlayMode::RepeatOne, &[]), Some(1));
        assert_eq!(previous_index(1, 3, PlayMode::RepeatOne, &[]), Some(1));
    }

    #[test]
    fn shuffle_follows_order_and_wraps() {
        let order = [2, 0, 3, 1];
        assert_eq!(next_index(2, 4, PlayMode::Shuffle, &order), Some(0));
        assert_eq!(next_index(3, 4, PlayMode::Shuffle, &order), Some(1));
        assert_eq!(next_index(1, 4, PlayMode::Shuffle, &order), Some(2));

        assert_eq!(previous_index(0, 4, PlayMode::Shuffle, &order), Some(2));
        assert_eq!(previous_index(2, 4, PlayMode::Shuffle, &order), Some(1));
    }

    #[test]
    fn shuffle_fallback_picks_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let next = next_index_with(9, 5, PlayMode::Shuffle, &[0, 1], &mut rng).unwrap();
            assert!(next < 5);
            let prev = previous_index_with(9, 5, PlayMode::Shuffle, &[], &mut rng).unwrap();
            assert!(prev < 5);
        }
    }

    #[test]
    fn shuffle_order_is_permutation() {
        let order = generate_shuffle_order(50);
        assert_eq!(order.len(), 50);
        let unique: HashSet<usize> = order.iter().copied().collect();
        assert_eq!(unique.len(), 50);
        assert!(order.iter().all(|&i| i < 50));
    }

    #[test]
    fn shuffle_order_is_reproducible_with_seed() {
        let a = generate_shuffle_order_with(20, &mut StdRng::seed_from_u64(42));
        let b = generate_shuffle_order_with(20, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn shuffle_order_empty_queue() {
        assert!(generate_shuffle_order(0).is_empty());
    }

    #[test]
    fn first_index_respects_shuffle() {
        assert_eq!(first_index(0, PlayMode::Normal, &[]), None);
        assert_eq!(first_index(3, PlayMode::Normal, &[2, 1, 0]), Some(0));
        assert_eq!(first_index(3, PlayMode::Shuffle, &[2, 1, 0]), Some(2));
        assert_eq!(first_index(3, PlayMode::Shuffle, &[]), Some(0));
    }
}
