//! Fixed-size bit storage, LSB-first within each byte.
use crate::errors::{BloomError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitArray {
    len: usize,
    bits: Vec<u8>,
}

impl BitArray {
    pub fn new(len: usize) -> Self {
        let bytes = (len + 7) / 8;
        Self { len, bits: vec![0u8; bytes] }
    }

    #[inline]
    fn locate(&self, index: usize) -> Result<(usize, u8)> {
        if index >= self.len {
            return Err(BloomError::IndexOutOfRange { index, len: self.len });
        }
        Ok((index / 8, 1u8 << (index & 7)))
    }

    /// Sets the bit at `index`; setting a set bit is a no-op.
    pub fn set(&mut self, index: usize) -> Result<()> {
        let (byte, mask) = self.locate(index)?;
        self.bits[byte] |= mask;
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<bool> {
        let (byte, mask) = self.locate(index)?;
        Ok(self.bits[byte] & mask != 0)
    }

    pub fn len(&self) -> usize { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    pub fn count_ones(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn clear(&mut self) {
        self.bits.iter_mut().for_each(|b| *b = 0);
    }

    /// Raw storage; bits past `len` in the final byte are always zero.
    pub fn as_bytes(&self) -> &[u8] { &self.bits }
}
