//! Optimal sizing for a Bloom filter.
//!
//!   m = ceil(-n * ln(p) / ln(2)^2)
//!   k = round((m / n) * ln(2))
//!
//! where n is the expected number of items and p the target false-positive rate.
use crate::errors::{BloomError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;

/// Bit count and hash count of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterParams {
    pub bit_count: usize,
    pub hash_count: usize,
}

impl FilterParams {
    /// Sizes a filter for `expected_items` at `target_fp_rate`.
    pub fn compute(expected_items: usize, target_fp_rate: f64) -> Result<Self> {
        validate(expected_items, target_fp_rate)?;
        let bit_count = optimal_bit_count(expected_items, target_fp_rate);
        let hash_count = optimal_hash_count(bit_count, expected_items);
        Ok(Self { bit_count, hash_count })
    }

    /// Bypasses the sizing formula when the caller already knows its bit budget.
    pub fn explicit(bit_count: usize, hash_count: usize) -> Result<Self> {
        if bit_count == 0 {
            return Err(BloomError::InvalidParameter("bit count must be at least 1".into()));
        }
        if hash_count == 0 {
            return Err(BloomError::InvalidParameter("hash count must be at least 1".into()));
        }
        Ok(Self { bit_count, hash_count })
    }

    /// Expected false-positive rate once `item_count` items are inserted.
    pub fn false_positive_rate(&self, item_count: usize) -> f64 {
        estimate_false_positive_rate(self.hash_count, self.bit_count, item_count)
    }
}

fn validate(expected_items: usize, target_fp_rate: f64) -> Result<()> {
    if expected_items == 0 {
        return Err(BloomError::InvalidParameter(
            "expected number of items must be at least 1".into(),
        ));
    }
    if !(target_fp_rate > 0.0 && target_fp_rate < 1.0) {
        return Err(BloomError::InvalidParameter(format!(
            "false positive rate must lie in (0, 1), got {target_fp_rate}"
        )));
    }
    Ok(())
}

/// Optimal number of bits, never less than one.
pub fn optimal_bit_count(expected_items: usize, target_fp_rate: f64) -> usize {
    let num = -(expected_items as f64) * target_fp_rate.ln();
    let m = (num / (LN_2 * LN_2)).ceil();
    (m as usize).max(1)
}

/// Optimal number of hashes for `bit_count` bits holding `expected_items`, never less than one.
pub fn optimal_hash_count(bit_count: usize, expected_items: usize) -> usize {
    let k = ((bit_count as f64 / expected_items.max(1) as f64) * LN_2).round();
    (k as usize).max(1)
}

/// `(1 - e^(-k*n/m))^k`, usable without a filter instance.
pub fn estimate_false_positive_rate(hash_count: usize, bit_count: usize, item_count: usize) -> f64 {
    // with no hash functions every query reports a hit
    if hash_count == 0 || bit_count == 0 {
        return 1.0;
    }
    if item_count == 0 {
        return 0.0;
    }
    let k = hash_count as f64;
    let exponent = -k * item_count as f64 / bit_count as f64;
    (1.0 - exponent.exp()).powf(k)
}

/// Estimates how many distinct items produced `ones` set bits.
///
/// Returns `f64::INFINITY` once every bit is set.
pub fn approximate_item_count(bit_count: usize, hash_count: usize, ones: usize) -> f64 {
    if ones >= bit_count {
        return f64::INFINITY;
    }
    let m = bit_count as f64;
    -(m / hash_count as f64) * (1.0 - ones as f64 / m).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizing_matches_reference_values() {
        let p = FilterParams::compute(10_000, 0.02).unwrap();
        // -10000 * ln(0.02) / ln(2)^2 = 81423.3
        assert_eq!(p.bit_count, 81_424);
        assert_eq!(p.hash_count, 6);

        let p = FilterParams::compute(1_000, 0.01).unwrap();
        assert_eq!(p.bit_count, 9_586);
        assert_eq!(p.hash_count, 7);
    }

    #[test]
    fn tiny_filters_get_at_least_one_bit_and_hash() {
        let p = FilterParams::compute(1, 0.99).unwrap();
        assert!(p.bit_count >= 1);
        assert!(p.hash_count >= 1);
    }

    #[test]
    fn rejects_bad_inputs() {
        for (n, rate) in [(0, 0.1), (10, 0.0), (10, 1.0), (10, -0.5), (10, f64::NAN), (10, 2.0)] {
            let err = FilterParams::compute(n, rate).unwrap_err();
            assert!(matches!(err, BloomError::InvalidParameter(_)), "{n} {rate}");
        }
        assert!(FilterParams::explicit(0, 3).is_err());
        assert!(FilterParams::explicit(8, 0).is_err());
        assert_eq!(
            FilterParams::explicit(80_000, 5).unwrap(),
            FilterParams { bit_count: 80_000, hash_count: 5 }
        );
    }

    #[test]
    fn standalone_estimate() {
        let rate = estimate_false_positive_rate(5, 80_000, 10_000);
        assert!((rate - 0.0216).abs() < 0.001, "{rate}");
        assert_eq!(estimate_false_positive_rate(5, 80_000, 0), 0.0);
        assert_eq!(estimate_false_positive_rate(5, 0, 10), 1.0);
        assert_eq!(estimate_false_positive_rate(0, 80_000, 10_000), 1.0);
        assert_eq!(estimate_false_positive_rate(0, 80_000, 0), 1.0);
    }

    #[test]
    fn estimate_tracks_target_rate() {
        for (n, p) in [(1_000, 0.01), (10_000, 0.02), (10_000, 0.05), (500, 0.1)] {
            let params = FilterParams::compute(n, p).unwrap();
            let est = params.false_positive_rate(n);
            assert!((est - p).abs() < 0.01, "n={n} p={p} est={est}");
            assert!(est > 0.0);
        }
    }

    #[test]
    fn item_count_estimate() {
        assert_eq!(approximate_item_count(100, 3, 0), 0.0);
        assert!(approximate_item_count(100, 3, 100).is_infinite());
        // 1000 bits, k=1, 100 ones -> -1000 * ln(0.9) = 105.36
        let n = approximate_item_count(1000, 1, 100);
        assert!((n - 105.36).abs() < 0.01, "{n}");
    }
}
