// crates/bloom_core/src/consts.rs

/// Output length of the fixed-size digests (blake3, sha256).
pub const DIGEST_LEN: usize = 32;

/// Slice width used while the bit array stays at or below `WIDE_SLICE_THRESHOLD` bits.
pub const NARROW_SLICE_BYTES: usize = 4;
/// Slice width for larger bit arrays; keeps the modulo bias below 2^-8.
pub const WIDE_SLICE_BYTES: usize = 8;
pub const WIDE_SLICE_THRESHOLD: usize = 1 << 24;
pub const MAX_SLICE_BYTES: usize = 8;

/// One tag byte per item category. Values are part of the canonical encoding
/// and must never be renumbered.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TypeTag {
    Unit     = 0x00,
    Bool     = 0x01,
    Int      = 0x02,
    Float    = 0x03,
    Text     = 0x04,
    Bytes    = 0x05,
    Seq      = 0x10,
    Set      = 0x11,
    Map      = 0x12,
    Bag      = 0x13,
    Date     = 0x20,
    Time     = 0x21,
    DateTime = 0x22, // naive, read as UTC
    Instant  = 0x23, // offset-aware
    Opaque   = 0x30,
}

impl TypeTag {
    #[inline]
    pub fn byte(self) -> u8 { self as u8 }
}

const _: () = { assert!(NARROW_SLICE_BYTES * 8 <= DIGEST_LEN); };
