use core::hash::BuildHasher;

use foldhash::fast::FixedState;

// Fixed seeds: the same key probes the same slots in every run and process.
const PRIMARY_SEED: u64 = 0x9E37_79B9_7F4A_7C15;
const SECONDARY_SEED: u64 = 0xD1B5_4A32_D192_ED03;

/// Default primary hash function.
///
/// Maps `key` to an index in `[0, table_size)`; a `table_size` of zero maps
/// everything to zero.
///
/// # Examples
///
/// ```rust
/// use oa_hash::hashers;
///
/// let index = hashers::primary("torque", 97);
/// assert!(index < 97);
/// assert_eq!(index, hashers::primary("torque", 97));
/// ```
pub fn primary(key: &str, table_size: usize) -> usize {
    reduce(FixedState::with_seed(PRIMARY_SEED).hash_one(key), table_size)
}

/// Default secondary (stride-base) hash function.
///
/// Seeded independently of [`primary`], so keys that collide on their start
/// index still tend to walk different strides.
pub fn secondary(key: &str, range: usize) -> usize {
    reduce(FixedState::with_seed(SECONDARY_SEED).hash_one(key), range)
}

fn reduce(hash: u64, range: usize) -> usize {
    if range == 0 {
        return 0;
    }
    (hash % range as u64) as usize
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;

    #[test]
    fn results_stay_in_range() {
        for range in [1, 2, 7, 97, 104_729] {
            for key in ["a", "torque", "a-longer-key-that-still-fits"] {
                assert!(primary(key, range) < range);
                assert!(secondary(key, range) < range);
            }
        }
    }

    #[test]
    fn zero_range_maps_to_zero() {
        assert_eq!(primary("key", 0), 0);
        assert_eq!(secondary("key", 0), 0);
    }

    #[test]
    fn seeds_are_independent() {
        let distinct = (0..32).any(|i| {
            let key = format!("key-{i}");
            primary(&key, 1009) != secondary(&key, 1009)
        });
        assert!(distinct);
    }
}
