//! Attempt-count estimates derived from the admissible share of key space.

use num_bigint::BigUint;
use num_traits::ToPrimitive;

use crate::matcher::Matcher;

/// Attempt counts at which the probability of at least one match reaches the
/// named percentile, under independent uniform draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidenceEstimates {
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
}

// Probability thresholds as fixed-point fractions of 2^64.
const P50_FIXED: u64 = 0x8000_0000_0000_0000;
const P90_FIXED: u64 = 0xE666_6666_6666_6666;
const P99_FIXED: u64 = 0xFD70_A3D7_0A3D_70A3;

/// Estimate how many keys must be drawn before a match becomes likely.
///
/// `measure` is the number of 32-byte values inside the range set (overlaps
/// double-count, making the estimates slightly optimistic, which is fine for
/// an advisory number). Not on any hot path.
pub fn estimate_confidence(matcher: &Matcher) -> ConfidenceEstimates {
    let mut measure = BigUint::default();
    for range in matcher.ranges() {
        let min = BigUint::from_bytes_be(&range.min);
        let max = BigUint::from_bytes_be(&range.max);
        measure += max - min + 1u32;
    }

    ConfidenceEstimates {
        p50: attempts_for(P50_FIXED, &measure),
        p90: attempts_for(P90_FIXED, &measure),
        p99: attempts_for(P99_FIXED, &measure),
    }
}

/// `floor(threshold * 2^192 / measure)`, saturating to `u64::MAX`.
///
/// The threshold is a fraction of 2^64 and the key space is 2^256, so
/// shifting by 192 leaves the quotient in 64-bit units. Very small measures
/// push the quotient past 64 bits; those saturate rather than truncate.
fn attempts_for(threshold: u64, measure: &BigUint) -> u64 {
    let quotient = (BigUint::from(threshold) << 192u32) / measure;
    quotient.to_u64().unwrap_or(u64::MAX)
}
