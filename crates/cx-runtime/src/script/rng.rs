use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn next_random_u32(state: &mut u32) -> u32 {
    let mut next = state.wrapping_add(0x6d2b79f5);
    *state = next;
    next = (next ^ (next >> 15)).wrapping_mul(next | 1);
    next ^= next.wrapping_add((next ^ (next >> 7)).wrapping_mul(next | 61));
    next ^ (next >> 14)
}

pub(crate) fn next_random_bounded(state: &mut u32, bound: u32) -> u32 {
    next_random_bounded_with(state, bound, next_random_u32)
}

pub(crate) fn next_random_bounded_with<F>(state: &mut u32, bound: u32, mut next: F) -> u32
where
    F: FnMut(&mut u32) -> u32,
{
    let threshold = (u64::from(u32::MAX) + 1) / u64::from(bound) * u64::from(bound);
    let mut candidate = next(state);
    while u64::from(candidate) >= threshold {
        candidate = next(state);
    }
    candidate % bound
}

/// Sum of `count` rolls of a `sides`-sided die. `sides` must be positive.
pub(crate) fn roll_dice(state: &mut u32, count: u32, sides: u32) -> i64 {
    (0..count)
        .map(|_| i64::from(next_random_bounded(state, sides)) + 1)
        .sum()
}

pub(crate) fn seed_from_clock() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u32 ^ elapsed.as_secs() as u32)
        .unwrap_or(1)
}

#[cfg(test)]
mod rng_tests {
    use super::*;

    #[test]
    fn next_random_bounded_with_covers_threshold_retry_path() {
        let mut state = 0u32;
        let mut values = vec![u32::MAX, 42u32].into_iter();
        let result = next_random_bounded_with(&mut state, 10, |_s| {
            values.next().expect("test values should be available")
        });
        assert_eq!(result, 2);
    }

    #[test]
    fn roll_dice_stays_in_bounds_and_is_seed_deterministic() {
        let mut first = 7u32;
        let mut second = 7u32;
        for _ in 0..200 {
            let roll = roll_dice(&mut first, 3, 6);
            assert!((3..=18).contains(&roll));
            assert_eq!(roll, roll_dice(&mut second, 3, 6));
        }
        assert_eq!(roll_dice(&mut first, 0, 6), 0);
    }
}
