//! Geometric growth policy for the scratch symbol buffer and the value store.
//!
//! Both containers grow in amortized steps: when `needed` slots do not fit,
//! the new size is `ceil(needed * ratio)`, clamped to a hard bound. The
//! scratch buffer uses this for its backing capacity; the store uses it for
//! its zero-filled lengths.

/// Compute the size a container should grow to so that it holds `needed` slots.
///
/// Returns `current` unchanged when it is already large enough. The result is
/// never smaller than `needed` and never larger than `max` unless `needed`
/// itself exceeds `max` (callers check bounds before growing).
#[inline]
pub fn grown_len(current: usize, needed: usize, ratio: f64, max: usize) -> usize {
    if needed <= current {
        return current;
    }

    let target = (needed as f64 * ratio).ceil() as usize;
    target.min(max).max(needed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_growth_when_large_enough() {
        assert_eq!(grown_len(10, 4, 1.4, 100), 10);
        assert_eq!(grown_len(10, 10, 1.4, 100), 10);
    }

    #[test]
    fn test_geometric_growth() {
        assert_eq!(grown_len(0, 11, 1.1, 1000), 13);
        assert_eq!(grown_len(0, 6, 1.4, 100), 9);
        assert_eq!(grown_len(10, 11, 1.4, 1000), 16);
    }

    #[test]
    fn test_growth_clamped_to_max() {
        assert_eq!(grown_len(0, 90, 1.4, 100), 100);
        assert_eq!(grown_len(99, 100, 1.4, 100), 100);
    }

    #[test]
    fn test_growth_never_below_needed() {
        // A ratio of exactly one still covers the request
        assert_eq!(grown_len(0, 7, 1.0, 100), 7);
    }
}
