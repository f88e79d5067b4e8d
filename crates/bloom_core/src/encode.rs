//! Canonical, type-tagged byte encoding of filter items.
//!
//! Every encoding starts with a [`TypeTag`] byte so values of different
//! categories never share an encoding (`5` and `"5"` differ). Variable-length
//! payloads carry a u64 big-endian length so nested sequences stay unambiguous.
//!
//! Layout per category:
//!   Unit      tag
//!   Bool      tag, u8
//!   Int       tag, i128 BE (sign-extended)
//!   Float     tag, f64 bits BE (-0.0 folded into 0.0, one canonical NaN)
//!   Text      tag, u64 len, utf8
//!   Bytes     tag, u64 len, bytes
//!   Seq       tag, u64 count, elements
//!   Set       tag, u64 count, sorted + deduplicated element encodings
//!   Bag       tag, u64 count, sorted element encodings (duplicates kept)
//!   Map       tag, u64 count, (key, value) pairs sorted by key encoding
//!   Date      tag, i32 julian day
//!   Time      tag, u64 nanoseconds since midnight
//!   DateTime  tag, i128 unix nanos (naive value read as UTC)
//!   Instant   tag, i128 unix nanos
//!   Opaque    tag, u64 identity token
use crate::consts::TypeTag;
use crate::errors::{BloomError, Result};
use byteorder::{BigEndian as BE, ByteOrder};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::BuildHasher;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

/// Identity token for values that have no byte form of their own.
///
/// Two structurally equal objects get different tokens from [`ObjectId::of`];
/// membership is tracked per instance, not per value.
///
/// The token is an address, so take it from a heap-pinned handle (`Box`,
/// `Arc`, `Rc`): moving the handle keeps the address of its contents, while
/// moving a stack value (e.g. pushing it into a `Vec`) changes the token and
/// the filter no longer recognises it. Zero-sized values share one address
/// and therefore one token; give them explicit tokens with [`ObjectId::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub fn new(token: u64) -> Self { Self(token) }

    /// Token derived from the address of `value`.
    pub fn of<T: ?Sized>(value: &T) -> Self {
        Self(value as *const T as *const () as usize as u64)
    }

    pub fn token(&self) -> u64 { self.0 }
}

/// A value that can be inserted into or looked up in a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Unit,
    Bool(bool),
    Int(i128),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Seq(Vec<Item>),
    Set(Vec<Item>),
    /// Unordered collection with multiplicity.
    Bag(Vec<Item>),
    Map(Vec<(Item, Item)>),
    Date(Date),
    Time(Time),
    DateTime(PrimitiveDateTime),
    Instant(OffsetDateTime),
    Opaque(ObjectId),
}

impl Item {
    pub fn text(s: impl Into<String>) -> Self { Item::Text(s.into()) }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self { Item::Bytes(b.into()) }

    pub fn identity<T: ?Sized>(value: &T) -> Self { Item::Opaque(ObjectId::of(value)) }

    /// Converts any serde-serializable value. serde sequences (vectors and
    /// sets alike) become [`Item::Bag`], so their element order is ignored.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        crate::ser::to_item(value)
    }

    /// Short category name, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Item::Unit => "unit",
            Item::Bool(_) => "bool",
            Item::Int(_) => "integer",
            Item::Float(_) => "float",
            Item::Text(_) => "text",
            Item::Bytes(_) => "bytes",
            Item::Seq(_) => "sequence",
            Item::Set(_) => "set",
            Item::Bag(_) => "bag",
            Item::Map(_) => "map",
            Item::Date(_) => "date",
            Item::Time(_) => "time",
            Item::DateTime(_) => "datetime",
            Item::Instant(_) => "instant",
            Item::Opaque(_) => "object",
        }
    }

    /// Members of a collection item; map items yield their keys.
    pub fn elements(&self) -> Result<Vec<&Item>> {
        match self {
            Item::Seq(xs) | Item::Set(xs) | Item::Bag(xs) => Ok(xs.iter().collect()),
            Item::Map(kv) => Ok(kv.iter().map(|(k, _)| k).collect()),
            other => Err(BloomError::InvalidArgument(format!(
                "expected an iterable collection, got {}",
                other.kind()
            ))),
        }
    }
}

/// Canonical encoding of `item`.
pub fn encode(item: &Item) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    encode_into(item, &mut out);
    out
}

pub fn encode_into(item: &Item, out: &mut Vec<u8>) {
    match item {
        Item::Unit => out.push(TypeTag::Unit.byte()),
        Item::Bool(b) => {
            out.push(TypeTag::Bool.byte());
            out.push(*b as u8);
        }
        Item::Int(i) => {
            out.push(TypeTag::Int.byte());
            put_i128(out, *i);
        }
        Item::Float(f) => {
            out.push(TypeTag::Float.byte());
            put_u64(out, canonical_f64_bits(*f));
        }
        Item::Text(s) => {
            out.push(TypeTag::Text.byte());
            put_len(out, s.len());
            out.extend_from_slice(s.as_bytes());
        }
        Item::Bytes(b) => {
            out.push(TypeTag::Bytes.byte());
            put_len(out, b.len());
            out.extend_from_slice(b);
        }
        Item::Seq(xs) => {
            out.push(TypeTag::Seq.byte());
            put_len(out, xs.len());
            for x in xs { encode_into(x, out); }
        }
        Item::Set(xs) => {
            let mut encoded: Vec<Vec<u8>> = xs.iter().map(encode).collect();
            encoded.sort_unstable();
            encoded.dedup();
            out.push(TypeTag::Set.byte());
            put_len(out, encoded.len());
            for e in encoded { out.extend_from_slice(&e); }
        }
        Item::Bag(xs) => {
            let mut encoded: Vec<Vec<u8>> = xs.iter().map(encode).collect();
            encoded.sort_unstable();
            out.push(TypeTag::Bag.byte());
            put_len(out, encoded.len());
            for e in encoded { out.extend_from_slice(&e); }
        }
        Item::Map(kv) => {
            let mut pairs: Vec<(Vec<u8>, Vec<u8>)> =
                kv.iter().map(|(k, v)| (encode(k), encode(v))).collect();
            pairs.sort_unstable();
            out.push(TypeTag::Map.byte());
            put_len(out, pairs.len());
            for (k, v) in pairs {
                out.extend_from_slice(&k);
                out.extend_from_slice(&v);
            }
        }
        Item::Date(d) => {
            out.push(TypeTag::Date.byte());
            let mut b = [0u8; 4];
            BE::write_i32(&mut b, d.to_julian_day());
            out.extend_from_slice(&b);
        }
        Item::Time(t) => {
            out.push(TypeTag::Time.byte());
            put_u64(out, nanos_since_midnight(*t));
        }
        Item::DateTime(dt) => {
            out.push(TypeTag::DateTime.byte());
            put_i128(out, dt.assume_utc().unix_timestamp_nanos());
        }
        Item::Instant(odt) => {
            out.push(TypeTag::Instant.byte());
            put_i128(out, odt.unix_timestamp_nanos());
        }
        Item::Opaque(id) => {
            out.push(TypeTag::Opaque.byte());
            put_u64(out, id.token());
        }
    }
}

#[inline]
fn put_u64(out: &mut Vec<u8>, v: u64) {
    let mut b = [0u8; 8];
    BE::write_u64(&mut b, v);
    out.extend_from_slice(&b);
}

#[inline]
fn put_i128(out: &mut Vec<u8>, v: i128) {
    let mut b = [0u8; 16];
    BE::write_i128(&mut b, v);
    out.extend_from_slice(&b);
}

#[inline]
fn put_len(out: &mut Vec<u8>, len: usize) { put_u64(out, len as u64) }

fn canonical_f64_bits(f: f64) -> u64 {
    if f.is_nan() {
        f64::NAN.to_bits()
    } else if f == 0.0 {
        0.0f64.to_bits()
    } else {
        f.to_bits()
    }
}

fn nanos_since_midnight(t: Time) -> u64 {
    let (h, m, s, ns) = t.as_hms_nano();
    ((h as u64 * 60 + m as u64) * 60 + s as u64) * 1_000_000_000 + ns as u64
}

/// Conversion of Rust values into filter items.
pub trait ToItem {
    fn to_item(&self) -> Result<Item>;
}

impl<T: ToItem + ?Sized> ToItem for &T {
    fn to_item(&self) -> Result<Item> { (**self).to_item() }
}

impl<T: ToItem + ?Sized> ToItem for Box<T> {
    fn to_item(&self) -> Result<Item> { (**self).to_item() }
}

impl ToItem for Item {
    fn to_item(&self) -> Result<Item> { Ok(self.clone()) }
}

impl ToItem for ObjectId {
    fn to_item(&self) -> Result<Item> { Ok(Item::Opaque(*self)) }
}

macro_rules! int_to_item {
    ($($t:ty),*) => {$(
        impl ToItem for $t {
            fn to_item(&self) -> Result<Item> { Ok(Item::Int(*self as i128)) }
        }
    )*};
}
int_to_item!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

impl ToItem for f64 {
    fn to_item(&self) -> Result<Item> { Ok(Item::Float(*self)) }
}

impl ToItem for f32 {
    fn to_item(&self) -> Result<Item> { Ok(Item::Float(f64::from(*self))) }
}

impl ToItem for bool {
    fn to_item(&self) -> Result<Item> { Ok(Item::Bool(*self)) }
}

impl ToItem for () {
    fn to_item(&self) -> Result<Item> { Ok(Item::Unit) }
}

impl ToItem for char {
    fn to_item(&self) -> Result<Item> { Ok(Item::Text(self.to_string())) }
}

impl ToItem for str {
    fn to_item(&self) -> Result<Item> { Ok(Item::Text(self.to_owned())) }
}

impl ToItem for String {
    fn to_item(&self) -> Result<Item> { Ok(Item::Text(self.clone())) }
}

impl<T: ToItem> ToItem for Option<T> {
    fn to_item(&self) -> Result<Item> {
        match self {
            Some(v) => v.to_item(),
            None => Ok(Item::Unit),
        }
    }
}

impl<T: ToItem> ToItem for [T] {
    fn to_item(&self) -> Result<Item> {
        Ok(Item::Seq(self.iter().map(ToItem::to_item).collect::<Result<_>>()?))
    }
}

impl<T: ToItem, const N: usize> ToItem for [T; N] {
    fn to_item(&self) -> Result<Item> { self.as_slice().to_item() }
}

impl<T: ToItem> ToItem for Vec<T> {
    fn to_item(&self) -> Result<Item> { self.as_slice().to_item() }
}

impl<T: ToItem, S: BuildHasher> ToItem for HashSet<T, S> {
    fn to_item(&self) -> Result<Item> {
        Ok(Item::Set(self.iter().map(ToItem::to_item).collect::<Result<_>>()?))
    }
}

impl<T: ToItem> ToItem for BTreeSet<T> {
    fn to_item(&self) -> Result<Item> {
        Ok(Item::Set(self.iter().map(ToItem::to_item).collect::<Result<_>>()?))
    }
}

impl<K: ToItem, V: ToItem, S: BuildHasher> ToItem for HashMap<K, V, S> {
    fn to_item(&self) -> Result<Item> {
        let pairs = self
            .iter()
            .map(|(k, v)| Ok((k.to_item()?, v.to_item()?)))
            .collect::<Result<_>>()?;
        Ok(Item::Map(pairs))
    }
}

impl<K: ToItem, V: ToItem> ToItem for BTreeMap<K, V> {
    fn to_item(&self) -> Result<Item> {
        let pairs = self
            .iter()
            .map(|(k, v)| Ok((k.to_item()?, v.to_item()?)))
            .collect::<Result<_>>()?;
        Ok(Item::Map(pairs))
    }
}

macro_rules! tuple_to_item {
    ($($name:ident),+) => {
        impl<$($name: ToItem),+> ToItem for ($($name,)+) {
            #[allow(non_snake_case)]
            fn to_item(&self) -> Result<Item> {
                let ($($name,)+) = self;
                Ok(Item::Seq(vec![$($name.to_item()?),+]))
            }
        }
    };
}
tuple_to_item!(A);
tuple_to_item!(A, B);
tuple_to_item!(A, B, C);
tuple_to_item!(A, B, C, D);

impl ToItem for Date {
    fn to_item(&self) -> Result<Item> { Ok(Item::Date(*self)) }
}

impl ToItem for Time {
    fn to_item(&self) -> Result<Item> { Ok(Item::Time(*self)) }
}

impl ToItem for PrimitiveDateTime {
    fn to_item(&self) -> Result<Item> { Ok(Item::DateTime(*self)) }
}

impl ToItem for OffsetDateTime {
    fn to_item(&self) -> Result<Item> { Ok(Item::Instant(*self)) }
}

/// Wraps a serde value so it can be added to a filter through [`Item::from_serialize`].
#[derive(Debug, Clone, Copy)]
pub struct Serialized<T>(pub T);

impl<T: Serialize> ToItem for Serialized<T> {
    fn to_item(&self) -> Result<Item> { Item::from_serialize(&self.0) }
}
