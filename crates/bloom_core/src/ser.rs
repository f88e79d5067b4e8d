//! Serializes any `serde::Serialize` value straight into an [`Item`].
//!
//! serde reports sets and vectors alike through `serialize_seq`, so every
//! serde sequence becomes an [`Item::Bag`]: element order is ignored and
//! duplicates are kept. Tuples stay ordered. Structs and maps become
//! [`Item::Map`]; enum variants are wrapped as a one-entry map keyed by the
//! variant name, unit variants as their name.
use crate::encode::Item;
use crate::errors::{BloomError, Result};
use serde::ser::{self, Serialize};

pub(crate) fn to_item<T: Serialize + ?Sized>(value: &T) -> Result<Item> {
    value.serialize(ItemSerializer)
}

fn tagged(variant: &'static str, inner: Item) -> Item {
    Item::Map(vec![(Item::text(variant), inner)])
}

pub(crate) struct ItemSerializer;

impl ser::Serializer for ItemSerializer {
    type Ok = Item;
    type Error = BloomError;
    type SerializeSeq = SeqBuilder;
    type SerializeTuple = SeqBuilder;
    type SerializeTupleStruct = SeqBuilder;
    type SerializeTupleVariant = SeqBuilder;
    type SerializeMap = MapBuilder;
    type SerializeStruct = MapBuilder;
    type SerializeStructVariant = MapBuilder;

    fn serialize_bool(self, v: bool) -> Result<Item> { Ok(Item::Bool(v)) }
    fn serialize_i8(self, v: i8) -> Result<Item> { Ok(Item::Int(v.into())) }
    fn serialize_i16(self, v: i16) -> Result<Item> { Ok(Item::Int(v.into())) }
    fn serialize_i32(self, v: i32) -> Result<Item> { Ok(Item::Int(v.into())) }
    fn serialize_i64(self, v: i64) -> Result<Item> { Ok(Item::Int(v.into())) }
    fn serialize_i128(self, v: i128) -> Result<Item> { Ok(Item::Int(v)) }
    fn serialize_u8(self, v: u8) -> Result<Item> { Ok(Item::Int(v.into())) }
    fn serialize_u16(self, v: u16) -> Result<Item> { Ok(Item::Int(v.into())) }
    fn serialize_u32(self, v: u32) -> Result<Item> { Ok(Item::Int(v.into())) }
    fn serialize_u64(self, v: u64) -> Result<Item> { Ok(Item::Int(v.into())) }

    fn serialize_u128(self, v: u128) -> Result<Item> {
        i128::try_from(v).map(Item::Int).map_err(|_| {
            BloomError::UnsupportedType(format!("integer {v} exceeds the signed 128-bit range"))
        })
    }

    // non-finite values stay floats and get the canonical float encoding
    fn serialize_f32(self, v: f32) -> Result<Item> { Ok(Item::Float(v.into())) }
    fn serialize_f64(self, v: f64) -> Result<Item> { Ok(Item::Float(v)) }

    fn serialize_char(self, v: char) -> Result<Item> { Ok(Item::Text(v.to_string())) }
    fn serialize_str(self, v: &str) -> Result<Item> { Ok(Item::text(v)) }
    fn serialize_bytes(self, v: &[u8]) -> Result<Item> { Ok(Item::bytes(v)) }
    fn serialize_none(self) -> Result<Item> { Ok(Item::Unit) }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Item> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Item> { Ok(Item::Unit) }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<Item> { Ok(Item::Unit) }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Item> {
        Ok(Item::text(variant))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Item> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Item> {
        Ok(tagged(variant, value.serialize(ItemSerializer)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder> {
        Ok(SeqBuilder::new(len.unwrap_or(0), true, None))
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder> {
        Ok(SeqBuilder::new(len, false, None))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SeqBuilder> {
        Ok(SeqBuilder::new(len, false, None))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SeqBuilder> {
        Ok(SeqBuilder::new(len, false, Some(variant)))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapBuilder> {
        Ok(MapBuilder::new(len.unwrap_or(0), None))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapBuilder> {
        Ok(MapBuilder::new(len, None))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<MapBuilder> {
        Ok(MapBuilder::new(len, Some(variant)))
    }
}

pub(crate) struct SeqBuilder {
    items: Vec<Item>,
    unordered: bool,
    variant: Option<&'static str>,
}

impl SeqBuilder {
    fn new(len: usize, unordered: bool, variant: Option<&'static str>) -> Self {
        Self { items: Vec::with_capacity(len), unordered, variant }
    }

    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.items.push(value.serialize(ItemSerializer)?);
        Ok(())
    }

    fn finish(self) -> Item {
        let inner = if self.unordered { Item::Bag(self.items) } else { Item::Seq(self.items) };
        match self.variant {
            Some(v) => tagged(v, inner),
            None => inner,
        }
    }
}

impl ser::SerializeSeq for SeqBuilder {
    type Ok = Item;
    type Error = BloomError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Item> { Ok(self.finish()) }
}

impl ser::SerializeTuple for SeqBuilder {
    type Ok = Item;
    type Error = BloomError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Item> { Ok(self.finish()) }
}

impl ser::SerializeTupleStruct for SeqBuilder {
    type Ok = Item;
    type Error = BloomError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Item> { Ok(self.finish()) }
}

impl ser::SerializeTupleVariant for SeqBuilder {
    type Ok = Item;
    type Error = BloomError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Item> { Ok(self.finish()) }
}

pub(crate) struct MapBuilder {
    pairs: Vec<(Item, Item)>,
    pending_key: Option<Item>,
    variant: Option<&'static str>,
}

impl MapBuilder {
    fn new(len: usize, variant: Option<&'static str>) -> Self {
        Self { pairs: Vec::with_capacity(len), pending_key: None, variant }
    }

    fn field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.pairs.push((Item::text(key), value.serialize(ItemSerializer)?));
        Ok(())
    }

    fn finish(self) -> Item {
        let inner = Item::Map(self.pairs);
        match self.variant {
            Some(v) => tagged(v, inner),
            None => inner,
        }
    }
}

impl ser::SerializeMap for MapBuilder {
    type Ok = Item;
    type Error = BloomError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        self.pending_key = Some(key.serialize(ItemSerializer)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let key = self.pending_key.take().ok_or_else(|| {
            BloomError::UnsupportedType("map value serialized without a key".into())
        })?;
        self.pairs.push((key, value.serialize(ItemSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<Item> { Ok(self.finish()) }
}

impl ser::SerializeStruct for MapBuilder {
    type Ok = Item;
    type Error = BloomError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.field(key, value)
    }

    fn end(self) -> Result<Item> { Ok(self.finish()) }
}

impl ser::SerializeStructVariant for MapBuilder {
    type Ok = Item;
    type Error = BloomError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.field(key, value)
    }

    fn end(self) -> Result<Item> { Ok(self.finish()) }
}
