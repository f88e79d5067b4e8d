//! Bloom filter over heterogeneous items.
//!
//! Items are encoded into a canonical, type-tagged byte form, hashed once with
//! a cryptographic digest, and the digest is split into `k` bit indices.
pub mod consts;
pub mod errors;
pub mod params;
pub mod encode;
mod ser;
pub mod hash;
pub mod bits;
pub mod filter;

pub use bits::BitArray;
pub use encode::{encode, Item, ObjectId, Serialized, ToItem};
pub use errors::{BloomError, Result};
pub use filter::{BloomFilter, FilterConfig};
pub use hash::{DigestAlgorithm, HashSplitter};
pub use params::{estimate_false_positive_rate, FilterParams};
