//! The Bloom filter itself: sizing, encoding and digest splitting composed
//! behind `add` / `contains`.
//!
//! A filter is a plain value. Mutation needs `&mut self`, so sharing one
//! across threads takes an external `Mutex`/`RwLock`; [`BloomFilter::indices`]
//! is pure and can run on worker threads ahead of a single writer.
use crate::bits::BitArray;
use crate::encode::{encode, Item, ToItem};
use crate::errors::{BloomError, Result};
use crate::hash::{slice_width_for, DigestAlgorithm, HashSplitter};
use crate::params::{self, FilterParams};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, trace};

/// Construction settings, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub expected_items: usize,
    pub false_positive_rate: f64,
    /// Explicit bit and hash counts; overrides the sizing formula.
    pub params: Option<FilterParams>,
    pub digest: Option<DigestAlgorithm>,
    pub bytes_per_slice: Option<usize>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            expected_items: 10_000,
            false_positive_rate: 0.01,
            params: None,
            digest: None,
            bytes_per_slice: None,
        }
    }
}

impl FilterConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let f = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(f))?)
    }

    fn params(&self) -> Result<FilterParams> {
        match self.params {
            Some(p) => FilterParams::explicit(p.bit_count, p.hash_count),
            None => FilterParams::compute(self.expected_items, self.false_positive_rate),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BloomFilter {
    params: FilterParams,
    expected_items: usize,
    target_fp_rate: f64,
    bits: BitArray,
    splitter: HashSplitter,
}

impl BloomFilter {
    /// Sizes a filter for `expected_items` at `target_fp_rate`.
    pub fn new(expected_items: usize, target_fp_rate: f64) -> Result<Self> {
        let params = FilterParams::compute(expected_items, target_fp_rate)?;
        let splitter = HashSplitter::for_params(params.bit_count, params.hash_count)?;
        Ok(Self::assemble(params, expected_items, target_fp_rate, splitter))
    }

    /// Uses caller-chosen bit and hash counts. The target rate becomes the
    /// estimate for `expected_items` under those counts.
    pub fn with_params(params: FilterParams, expected_items: usize) -> Result<Self> {
        let params = FilterParams::explicit(params.bit_count, params.hash_count)?;
        if expected_items == 0 {
            return Err(BloomError::InvalidParameter(
                "expected number of items must be at least 1".into(),
            ));
        }
        let splitter = HashSplitter::for_params(params.bit_count, params.hash_count)?;
        let rate = params.false_positive_rate(expected_items);
        Ok(Self::assemble(params, expected_items, rate, splitter))
    }

    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        let params = config.params()?;
        if config.expected_items == 0 {
            return Err(BloomError::InvalidParameter(
                "expected number of items must be at least 1".into(),
            ));
        }
        let splitter = match (config.digest, config.bytes_per_slice) {
            (None, None) => HashSplitter::for_params(params.bit_count, params.hash_count)?,
            (digest, width) => {
                let width = width.unwrap_or_else(|| slice_width_for(params.bit_count));
                let digest = digest.unwrap_or(DigestAlgorithm::Blake3Xof {
                    len: params.hash_count.saturating_mul(width),
                });
                HashSplitter::new(digest, params.bit_count, params.hash_count, width)?
            }
        };
        let rate = if config.params.is_some() {
            params.false_positive_rate(config.expected_items)
        } else {
            config.false_positive_rate
        };
        Ok(Self::assemble(params, config.expected_items, rate, splitter))
    }

    fn assemble(
        params: FilterParams,
        expected_items: usize,
        target_fp_rate: f64,
        splitter: HashSplitter,
    ) -> Self {
        debug!(
            bit_count = params.bit_count,
            hash_count = params.hash_count,
            expected_items,
            target_fp_rate,
            digest = ?splitter.algorithm(),
            "bloom filter allocated"
        );
        Self {
            params,
            expected_items,
            target_fp_rate,
            bits: BitArray::new(params.bit_count),
            splitter,
        }
    }

    /// Bit positions `item` maps to. Pure; does not touch the bit array.
    pub fn indices<T: ToItem + ?Sized>(&self, item: &T) -> Result<Vec<usize>> {
        let item = item.to_item()?;
        Ok(self.splitter.split(&encode(&item)))
    }

    fn set_all(&mut self, indices: &[usize]) -> Result<()> {
        for &i in indices {
            self.bits.set(i)?;
        }
        Ok(())
    }

    fn all_set(&self, indices: &[usize]) -> Result<bool> {
        for &i in indices {
            if !self.bits.get(i)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn add<T: ToItem + ?Sized>(&mut self, item: &T) -> Result<()> {
        let indices = self.indices(item)?;
        self.set_all(&indices)
    }

    /// Adds every item of `items`.
    ///
    /// All items are encoded before any bit is set: if one fails, the error
    /// carries its position and the filter is left unchanged.
    pub fn add_bulk<I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: ToItem,
    {
        let mut pending = Vec::new();
        let mut count = 0usize;
        for (position, item) in items.into_iter().enumerate() {
            let indices = self
                .indices(&item)
                .map_err(|e| BloomError::BulkItem { position, source: Box::new(e) })?;
            pending.extend(indices);
            count += 1;
        }
        self.set_all(&pending)?;
        trace!(items = count, "bulk insert committed");
        Ok(())
    }

    /// Bulk insert from a dynamic item. Sequences and sets add their
    /// elements, maps their keys; any other category is rejected.
    pub fn add_bulk_item(&mut self, items: &Item) -> Result<()> {
        self.add_bulk(items.elements()?)
    }

    /// `false` means `item` was never added; `true` means it probably was.
    pub fn contains<T: ToItem + ?Sized>(&self, item: &T) -> Result<bool> {
        let indices = self.indices(item)?;
        self.all_set(&indices)
    }

    /// Sets bits computed elsewhere by [`BloomFilter::indices`] on a filter
    /// with the same parameters. Indices outside the bit array are rejected
    /// before any bit is set.
    pub fn add_indices(&mut self, indices: &[usize]) -> Result<()> {
        if let Some(&index) = indices.iter().find(|&&i| i >= self.params.bit_count) {
            return Err(BloomError::IndexOutOfRange { index, len: self.params.bit_count });
        }
        self.set_all(indices)
    }

    /// Adds a pre-encoded key, skipping the item encoder.
    pub fn add_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let indices = self.splitter.split(bytes);
        self.set_all(&indices)
    }

    pub fn contains_bytes(&self, bytes: &[u8]) -> Result<bool> {
        self.all_set(&self.splitter.split(bytes))
    }

    pub fn clear(&mut self) {
        self.bits.clear();
    }

    /// Rate expected once the configured number of items is inserted,
    /// independent of how many items were actually added.
    pub fn estimate_false_positive_rate(&self) -> f64 {
        self.params.false_positive_rate(self.expected_items)
    }

    /// Items inserted so far, estimated from the set-bit population.
    pub fn approximate_item_count(&self) -> f64 {
        params::approximate_item_count(
            self.params.bit_count,
            self.params.hash_count,
            self.bits.count_ones(),
        )
    }

    /// Rate for the current fill level rather than the configured capacity.
    pub fn current_false_positive_rate(&self) -> f64 {
        let n = self.approximate_item_count();
        if n.is_infinite() {
            return 1.0;
        }
        self.params.false_positive_rate(n.round() as usize)
    }

    pub fn bit_count(&self) -> usize { self.params.bit_count }
    pub fn hash_count(&self) -> usize { self.params.hash_count }
    pub fn params(&self) -> FilterParams { self.params }
    pub fn expected_items(&self) -> usize { self.expected_items }
    pub fn target_fp_rate(&self) -> f64 { self.target_fp_rate }
    pub fn bits(&self) -> &BitArray { &self.bits }
    pub fn splitter(&self) -> &HashSplitter { &self.splitter }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashSet};
    use std::io::Write;

    #[test]
    fn add_then_contains() {
        let mut bf = BloomFilter::new(10, 0.01).unwrap();
        bf.add("test").unwrap();
        bf.add(&1).unwrap();
        assert!(bf.contains("test").unwrap());
        assert!(bf.contains(&1).unwrap());
    }

    #[test]
    fn small_ints_in_large_filter() {
        let mut bf = BloomFilter::new(10_000, 0.02).unwrap();
        bf.add_bulk(0..300).unwrap();
        assert!(bf.contains(&0).unwrap());
        assert!(bf.contains(&299).unwrap());
        // 300 items in a filter sized for 10k: fill rate makes this practically certain
        assert!(!bf.contains(&300).unwrap());
    }

    #[test]
    fn add_is_idempotent() {
        let mut bf = BloomFilter::new(100, 0.05).unwrap();
        bf.add("x").unwrap();
        let once = bf.bits().clone();
        bf.add("x").unwrap();
        assert_eq!(bf.bits(), &once);
    }

    #[test]
    fn bulk_matches_loop_in_any_order() {
        let mut looped = BloomFilter::new(1_000, 0.01).unwrap();
        for i in (0..50).rev() {
            looped.add(&i).unwrap();
        }
        let mut from_vec = BloomFilter::new(1_000, 0.01).unwrap();
        from_vec.add_bulk((0..50).collect::<Vec<i32>>()).unwrap();
        let mut from_set = BloomFilter::new(1_000, 0.01).unwrap();
        from_set.add_bulk((0..50).collect::<HashSet<i32>>()).unwrap();
        let mut from_item = BloomFilter::new(1_000, 0.01).unwrap();
        from_item
            .add_bulk_item(&Item::Set((0..50).map(|i| Item::Int(i)).collect()))
            .unwrap();

        assert_eq!(looped.bits(), from_vec.bits());
        assert_eq!(looped.bits(), from_set.bits());
        assert_eq!(looped.bits(), from_item.bits());
    }

    #[test]
    fn bulk_rejects_scalars() {
        let mut bf = BloomFilter::new(100, 0.05).unwrap();
        let err = bf.add_bulk_item(&Item::Int(42)).unwrap_err();
        assert!(matches!(err, BloomError::InvalidArgument(_)));
        assert_eq!(bf.bits().count_ones(), 0);

        let seq = Item::Seq(vec![Item::Int(1), Item::Int(2), Item::Int(3)]);
        bf.add_bulk_item(&seq).unwrap();
        let mut other = BloomFilter::new(100, 0.05).unwrap();
        other.add_bulk([1, 2, 3].iter().collect::<BTreeSet<_>>()).unwrap();
        assert_eq!(bf.bits(), other.bits());
    }

    #[test]
    fn failing_bulk_leaves_filter_untouched() {
        use crate::encode::Serialized;

        let batch = vec![Serialized(7u128), Serialized(u128::MAX), Serialized(9u128)];
        let mut bf = BloomFilter::new(100, 0.05).unwrap();
        let err = bf.add_bulk(batch).unwrap_err();
        match err {
            BloomError::BulkItem { position, source } => {
                assert_eq!(position, 1);
                assert!(matches!(*source, BloomError::UnsupportedType(_)));
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(bf.bits().count_ones(), 0);
    }

    #[test]
    fn estimate_reflects_configuration_not_fill() {
        let bf = BloomFilter::new(1_000, 0.01).unwrap();
        let est = bf.estimate_false_positive_rate();
        assert!(est > 0.0);
        assert!((est - 0.01).abs() < 0.001, "{est}");
        assert_eq!(bf.current_false_positive_rate(), 0.0);
    }

    #[test]
    fn explicit_parameters() {
        let bf = BloomFilter::with_params(FilterParams::explicit(80_000, 5).unwrap(), 10_000).unwrap();
        assert_eq!(bf.bit_count(), 80_000);
        assert_eq!(bf.hash_count(), 5);
        assert!((bf.target_fp_rate() - 0.0216).abs() < 0.001);
        assert!(BloomFilter::with_params(FilterParams { bit_count: 0, hash_count: 1 }, 10).is_err());
        assert!(BloomFilter::with_params(FilterParams { bit_count: 10, hash_count: 1 }, 0).is_err());
    }

    #[test]
    fn invalid_construction() {
        assert!(matches!(BloomFilter::new(0, 0.1), Err(BloomError::InvalidParameter(_))));
        assert!(matches!(BloomFilter::new(10, 1.5), Err(BloomError::InvalidParameter(_))));
    }

    #[test]
    fn precomputed_indices() {
        let mut bf = BloomFilter::new(100, 0.01).unwrap();
        let idx = bf.indices("worker").unwrap();
        bf.add_indices(&idx).unwrap();
        assert!(bf.contains("worker").unwrap());

        let err = bf.add_indices(&[0, bf.bit_count()]).unwrap_err();
        assert!(matches!(err, BloomError::IndexOutOfRange { .. }));
    }

    #[test]
    fn bytes_path_and_clear() {
        let mut bf = BloomFilter::new(100, 0.01).unwrap();
        let key = [12u8, 48, 94, 127, 255];
        assert!(!bf.contains_bytes(&key).unwrap());
        bf.add_bytes(&key).unwrap();
        assert!(bf.contains_bytes(&key).unwrap());
        bf.clear();
        assert!(!bf.contains_bytes(&key).unwrap());
        assert_eq!(bf.bits().count_ones(), 0);
    }

    #[test]
    fn approximate_count_follows_inserts() {
        let mut bf = BloomFilter::new(10_000, 0.01).unwrap();
        bf.add_bulk(0..2_000u32).unwrap();
        let n = bf.approximate_item_count();
        assert!((n - 2_000.0).abs() < 100.0, "{n}");
        assert!(bf.current_false_positive_rate() < bf.estimate_false_positive_rate());
    }

    #[test]
    fn config_from_json_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"expected_items": 500, "false_positive_rate": 0.05, "digest": "sha256"}}"#
        )
        .unwrap();
        let cfg = FilterConfig::load(f.path()).unwrap();
        assert_eq!(cfg.expected_items, 500);
        assert_eq!(cfg.digest, Some(DigestAlgorithm::Sha256));

        let bf = BloomFilter::from_config(&cfg).unwrap();
        assert_eq!(bf.params(), FilterParams::compute(500, 0.05).unwrap());
        assert_eq!(bf.splitter().algorithm(), DigestAlgorithm::Sha256);
        assert_eq!(bf.target_fp_rate(), 0.05);
    }

    #[test]
    fn config_with_short_digest_fails() {
        let cfg = FilterConfig {
            expected_items: 1_000,
            false_positive_rate: 0.0001,
            digest: Some(DigestAlgorithm::Blake3),
            ..FilterConfig::default()
        };
        // k = 13 needs 52 bytes of digest
        assert!(matches!(
            BloomFilter::from_config(&cfg),
            Err(BloomError::DigestTooShort { .. })
        ));
        let mut relaxed = cfg.clone();
        relaxed.digest = None;
        assert!(BloomFilter::from_config(&relaxed).is_ok());
    }

    #[test]
    fn config_with_explicit_params() {
        let cfg: FilterConfig = serde_json::from_str(
            r#"{"expected_items": 1000, "params": {"bit_count": 4096, "hash_count": 3}}"#,
        )
        .unwrap();
        assert_eq!(cfg.params, Some(FilterParams { bit_count: 4_096, hash_count: 3 }));
        let bf = BloomFilter::from_config(&cfg).unwrap();
        assert_eq!(bf.bit_count(), 4_096);
        assert_eq!(bf.hash_count(), 3);
        assert_eq!(bf.target_fp_rate(), FilterParams::explicit(4_096, 3).unwrap().false_positive_rate(1_000));

        let zero = FilterConfig {
            params: Some(FilterParams { bit_count: 4_096, hash_count: 0 }),
            ..FilterConfig::default()
        };
        assert!(matches!(BloomFilter::from_config(&zero), Err(BloomError::InvalidParameter(_))));
    }

    #[test]
    fn serialized_sets_match_regardless_of_iteration_order() {
        use crate::encode::Serialized;

        let a: HashSet<i32> = (0..32).collect();
        let b: HashSet<i32> = (0..32).rev().collect();
        assert_eq!(a, b);
        let mut bf = BloomFilter::new(100, 0.01).unwrap();
        bf.add(&Serialized(&a)).unwrap();
        assert!(bf.contains(&Serialized(&b)).unwrap());
        assert!(bf.contains(&Serialized(b.iter().copied().collect::<BTreeSet<_>>())).unwrap());
    }

    #[test]
    fn serialized_nan_does_not_match_unit() {
        use crate::encode::Serialized;

        let mut bf = BloomFilter::new(100, 0.001).unwrap();
        bf.add(&Serialized(f64::NAN)).unwrap();
        assert!(bf.contains(&f64::NAN).unwrap());
        assert!(!bf.contains(&()).unwrap());
        assert!(!bf.contains(&None::<f64>).unwrap());
    }
}
