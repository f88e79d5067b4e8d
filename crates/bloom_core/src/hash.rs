//! Single-digest index derivation.
//!
//! One digest is computed per item and cut into `k` contiguous, non-overlapping
//! slices; each slice is read as an unsigned big-endian integer and reduced
//! modulo the bit count. Slices of a cryptographic digest behave as
//! independent hashes, so one digest replaces a family of `k` hash functions.
use crate::consts::{DIGEST_LEN, MAX_SLICE_BYTES, NARROW_SLICE_BYTES, WIDE_SLICE_BYTES, WIDE_SLICE_THRESHOLD};
use crate::errors::{BloomError, Result};
use byteorder::{BigEndian as BE, ByteOrder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestAlgorithm {
    Blake3,
    Sha256,
    /// blake3 in extendable-output mode, `len` bytes.
    Blake3Xof { len: usize },
}

impl DigestAlgorithm {
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Blake3 | DigestAlgorithm::Sha256 => DIGEST_LEN,
            DigestAlgorithm::Blake3Xof { len } => *len,
        }
    }

    pub fn digest(&self, bytes: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Blake3 => blake3::hash(bytes).as_bytes().to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(bytes).to_vec(),
            DigestAlgorithm::Blake3Xof { len } => {
                let mut out = vec![0u8; *len];
                let mut hasher = blake3::Hasher::new();
                hasher.update(bytes);
                hasher.finalize_xof().fill(&mut out);
                out
            }
        }
    }
}

/// Default slice width for a bit array of `bit_count` bits.
pub fn slice_width_for(bit_count: usize) -> usize {
    if bit_count <= WIDE_SLICE_THRESHOLD { NARROW_SLICE_BYTES } else { WIDE_SLICE_BYTES }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashSplitter {
    algorithm: DigestAlgorithm,
    bit_count: usize,
    hash_count: usize,
    bytes_per_slice: usize,
}

impl HashSplitter {
    /// Picks the slice width for `bit_count` and the smallest digest that can
    /// feed `hash_count` slices.
    pub fn for_params(bit_count: usize, hash_count: usize) -> Result<Self> {
        let width = slice_width_for(bit_count);
        let needed = hash_count.saturating_mul(width);
        let algorithm = if needed <= DIGEST_LEN {
            DigestAlgorithm::Blake3
        } else {
            DigestAlgorithm::Blake3Xof { len: needed }
        };
        Self::new(algorithm, bit_count, hash_count, width)
    }

    pub fn new(
        algorithm: DigestAlgorithm,
        bit_count: usize,
        hash_count: usize,
        bytes_per_slice: usize,
    ) -> Result<Self> {
        if bit_count == 0 || hash_count == 0 {
            return Err(BloomError::InvalidParameter(
                "bit count and hash count must be at least 1".into(),
            ));
        }
        if bytes_per_slice == 0 || bytes_per_slice > MAX_SLICE_BYTES {
            return Err(BloomError::InvalidParameter(format!(
                "bytes per slice must lie in 1..={MAX_SLICE_BYTES}, got {bytes_per_slice}"
            )));
        }
        let digest_len = algorithm.output_len();
        if digest_len / hash_count < bytes_per_slice {
            return Err(BloomError::DigestTooShort { digest_len, hash_count, bytes_per_slice });
        }
        Ok(Self { algorithm, bit_count, hash_count, bytes_per_slice })
    }

    pub fn algorithm(&self) -> DigestAlgorithm { self.algorithm }
    pub fn bytes_per_slice(&self) -> usize { self.bytes_per_slice }

    /// Exactly `hash_count` indices in `[0, bit_count)`, deterministic for `bytes`.
    pub fn split(&self, bytes: &[u8]) -> Vec<usize> {
        let digest = self.algorithm.digest(bytes);
        let m = self.bit_count as u64;
        digest
            .chunks_exact(self.bytes_per_slice)
            .take(self.hash_count)
            .map(|slice| (BE::read_uint(slice, self.bytes_per_slice) % m) as usize)
            .collect()
    }
}
