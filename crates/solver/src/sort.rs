//! Parallel bitonic sorting network for packed grid keys.
//!
//! Bitonic sort runs a fixed schedule of compare-exchange passes whose shape
//! depends only on the input length, never on the data. That makes every pass
//! trivially data-parallel: the array splits into disjoint chunks, each chunk
//! compares a fixed pair layout, and no two chunks touch the same element.
//! The schedule requires a power-of-two length, which the simulation enforces
//! when it validates the particle count.

use rayon::prelude::*;

/// Sort `keys` ascending by their full 32-bit value.
///
/// Equal cell hashes stay grouped and, because the particle index occupies
/// the low bits of each key, ties resolve by ascending index, so the output
/// order is fully deterministic.
///
/// The length must be a power of two (zero and one included); this is the
/// network's structural precondition, checked here only in debug builds
/// because `Simulation::new` already rejects other counts.
pub fn bitonic_sort(keys: &mut [u32]) {
    let n = keys.len();
    if n < 2 {
        return;
    }
    debug_assert!(n.is_power_of_two(), "bitonic sort needs a power-of-two length, got {n}");

    // Outer loop grows sorted bitonic runs of length k; the inner loop merges
    // each run with compare-exchanges at shrinking stride j.
    let mut k = 2;
    while k <= n {
        let mut j = k / 2;
        while j >= 1 {
            let span = 2 * j;
            keys.par_chunks_mut(span).enumerate().for_each(|(c, chunk)| {
                // All elements of a chunk share the same direction bit: the
                // chunk base is a multiple of 2j and in-chunk offsets never
                // reach bit k.
                let ascending = (c * span) & k == 0;
                let (lo, hi) = chunk.split_at_mut(j);
                for t in 0..j {
                    let a = lo[t];
                    let b = hi[t];
                    let out_of_order = if ascending { a > b } else { a < b };
                    if out_of_order {
                        lo[t] = b;
                        hi[t] = a;
                    }
                }
            });
            j /= 2;
        }
        k *= 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn sorts_reverse_sequence() {
        let mut keys: Vec<u32> = (0..16u32).rev().collect();
        bitonic_sort(&mut keys);
        let expected: Vec<u32> = (0..16u32).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn sorted_input_is_unchanged() {
        let mut keys: Vec<u32> = (0..64u32).map(|i| i * 3).collect();
        let expected = keys.clone();
        bitonic_sort(&mut keys);
        assert_eq!(keys, expected);
    }

    #[test]
    fn single_element_and_empty_are_noops() {
        let mut one = vec![42u32];
        bitonic_sort(&mut one);
        assert_eq!(one, vec![42]);

        let mut empty: Vec<u32> = Vec::new();
        bitonic_sort(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn matches_std_sort_on_random_input() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut keys: Vec<u32> = (0..1024).map(|_| rng.gen()).collect();
        let mut expected = keys.clone();
        expected.sort_unstable();
        bitonic_sort(&mut keys);
        assert_eq!(keys, expected);
    }

    #[test]
    fn equal_hashes_order_by_payload_index() {
        // Keys pack (hash << 4) | index the same way the grid does. Full-value
        // ordering must both group hashes and order ties by index.
        let mut rng = StdRng::seed_from_u64(11);
        let mut keys: Vec<u32> = (0..16u32)
            .map(|i| (rng.gen_range(0..4u32) << 4) | i)
            .collect();
        bitonic_sort(&mut keys);

        for pair in keys.windows(2) {
            assert!(pair[0] <= pair[1], "keys must be non-decreasing");
            if pair[0] >> 4 == pair[1] >> 4 {
                assert!(pair[0] & 0xf < pair[1] & 0xf, "ties must order by index");
            }
        }

        // Every payload index survives exactly once.
        let mut indices: Vec<u32> = keys.iter().map(|k| k & 0xf).collect();
        indices.sort_unstable();
        let expected: Vec<u32> = (0..16u32).collect();
        assert_eq!(indices, expected);
    }
}
