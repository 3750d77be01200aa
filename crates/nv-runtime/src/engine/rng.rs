pub(super) fn next_random_u32(state: &mut u32) -> u32 {
    let mut next = state.wrapping_add(0x6d2b79f5);
    *state = next;
    next = (next ^ (next >> 15)).wrapping_mul(next | 1);
    next ^= next.wrapping_add((next ^ (next >> 7)).wrapping_mul(next | 61));
    next ^ (next >> 14)
}

/// Uniform draw in `0..bound`. `bound` must be non-zero.
pub(super) fn next_random_below(state: &mut u32, bound: u64) -> u64 {
    next_random_below_with(state, bound, next_random_u32)
}

pub(super) fn next_random_below_with<F>(state: &mut u32, bound: u64, mut next: F) -> u64
where
    F: FnMut(&mut u32) -> u32,
{
    if bound <= 1 {
        return 0;
    }

    if bound <= u64::from(u32::MAX) {
        let threshold = (u64::from(u32::MAX) + 1) / bound * bound;
        let mut candidate = u64::from(next(state));
        while candidate >= threshold {
            candidate = u64::from(next(state));
        }
        return candidate % bound;
    }

    let threshold = u64::MAX - u64::MAX % bound;
    loop {
        let high = u64::from(next(state));
        let low = u64::from(next(state));
        let candidate = (high << 32) | low;
        if candidate < threshold {
            return candidate % bound;
        }
    }
}
