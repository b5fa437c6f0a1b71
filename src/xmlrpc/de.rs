// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Binding decoded `Value` trees onto native records.
//!
//! Top-level params bind positionally onto the target's fields; nested
//! structs bind by name through a `FieldTable`. A `<nil/>` gives a fresh
//! field its zero value (`None`, `0`, `""`, empty collections) and leaves
//! an existing one as it was. Every scalar is checked against the type the
//! native field asks for: an `<int>` never lands in an `f64`, a `<string>`
//! never in an integer.

use std::cell::RefCell;
use std::collections::HashMap;
use std::iter::Enumerate;
use std::ops::Range;
use std::rc::Rc;
use std::slice;

use serde::de::value::{BorrowedStrDeserializer, SeqDeserializer, StrDeserializer};
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, IntoDeserializer, MapAccess, SeqAccess, Visitor,
};
use serde::Serialize;
use serde_json::{Map, Value as Snapshot};

use crate::error::{Error, Result};

use super::names::FieldTable;
use super::parser::Document;
use super::value::{Value, DATETIME_TOKEN};

static NIL: Value = Value::Nil;

/// What a `<nil/>` reads as when a fresh `DateTime` field asks for one.
const ZERO_DATETIME: &str = "00010101T00:00:00";

/// Per-call binding state: one name table per native record type.
#[derive(Default)]
pub struct Binder {
    tables: RefCell<HashMap<(usize, usize), Rc<FieldTable>>>,
}

impl Binder {
    pub fn new() -> Binder {
        Binder::default()
    }

    fn table(&self, fields: &'static [&'static str]) -> Rc<FieldTable> {
        let key = (fields.as_ptr() as usize, fields.len());
        self.tables
            .borrow_mut()
            .entry(key)
            .or_insert_with(|| Rc::new(FieldTable::new(fields.iter().copied())))
            .clone()
    }
}

fn check_fault(doc: &Document) -> Result<()> {
    match doc.fault() {
        Some(fault) => Err(Error::Fault(fault.clone())),
        None => Ok(()),
    }
}

/// Builds a fresh `T` from the document's params.
///
/// Fields past the last param are reported as absent: `Option` fields
/// become `None`, `#[serde(default)]` fields take their default. A `<nil/>`
/// param gives its field the zero value.
pub fn from_document<T: DeserializeOwned>(doc: &Document) -> Result<T> {
    check_fault(doc)?;
    let binder = Binder::new();
    T::deserialize(ParamsDeserializer { params: &doc.params, binder: &binder })
}

/// Binds the document's params onto an existing `target`.
///
/// Only the fields the document reaches change. Fields it does not reach,
/// `<nil/>` params and `#[serde(skip)]` fields keep their current value. On
/// error `target` is left as it was.
pub fn bind_document<T: Serialize + DeserializeOwned>(doc: &Document, target: &mut T) -> Result<()> {
    check_fault(doc)?;
    let kept = serde_json::to_value(&*target).map_err(snapshot_error)?;
    let binder = Binder::new();
    let params = BindParams { params: &doc.params, kept: &kept, binder: &binder };
    // dry run on a scratch value so a failure never reaches `target`
    T::deserialize(params)?;
    T::deserialize_in_place(params, target)
}

/// Binds a single value, e.g. one param a server picked out of a call.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T> {
    let binder = Binder::new();
    T::deserialize(ValueDeserializer::new(value, &binder))
}

fn struct_mismatch(value: &Value) -> Error {
    Error::InvalidParams(format!("structure fields mismatch: {} != struct", value.kind()))
}

fn snapshot_error(err: serde_json::Error) -> Error {
    Error::Application(err.to_string())
}

/// Deserializer over the top-level param list.
pub struct ParamsDeserializer<'a> {
    params: &'a [Value],
    binder: &'a Binder,
}

impl<'a> ParamsDeserializer<'a> {
    /// A non-record target takes one param; no param reads as `<nil/>`.
    fn single(&self) -> Result<ValueDeserializer<'a>> {
        match self.params.len() {
            0 => Ok(ValueDeserializer::new(&NIL, self.binder)),
            1 => Ok(ValueDeserializer::new(&self.params[0], self.binder)),
            n => Err(Error::WrongArgumentsNumber { params: n, fields: 1 }),
        }
    }
}

macro_rules! forward_to_single {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
                self.single()?.$method(visitor)
            }
        )*
    }
}

impl<'a> de::Deserializer<'a> for ParamsDeserializer<'a> {
    type Error = Error;

    forward_to_single! {
        deserialize_any deserialize_bool
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
        deserialize_f32 deserialize_f64 deserialize_char deserialize_str deserialize_string
        deserialize_bytes deserialize_byte_buf deserialize_unit deserialize_seq deserialize_map
        deserialize_identifier deserialize_ignored_any
    }

    fn deserialize_option<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        if self.params.len() > 1 {
            return visitor.visit_some(self);
        }
        self.single()?.deserialize_option(visitor)
    }

    fn deserialize_unit_struct<V: Visitor<'a>>(self, _name: &'static str, visitor: V) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'a>>(self, name: &'static str, visitor: V) -> Result<V::Value> {
        if name == DATETIME_TOKEN {
            return self.single()?.deserialize_newtype_struct(name, visitor);
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_tuple<V: Visitor<'a>>(self, len: usize, visitor: V) -> Result<V::Value> {
        if self.params.len() > len {
            return Err(Error::WrongArgumentsNumber { params: self.params.len(), fields: len });
        }
        visitor.visit_seq(ArrayAccess { iter: self.params.iter(), binder: self.binder })
    }

    fn deserialize_tuple_struct<V: Visitor<'a>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_tuple(len, visitor)
    }

    fn deserialize_struct<V: Visitor<'a>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        if fields.len() < self.params.len() {
            return Err(Error::WrongArgumentsNumber { params: self.params.len(), fields: fields.len() });
        }
        visitor.visit_map(PositionalAccess {
            fields,
            params: self.params.iter().enumerate(),
            pending: None,
            binder: self.binder,
        })
    }

    fn deserialize_enum<V: Visitor<'a>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.single()?.deserialize_enum(name, variants, visitor)
    }
}

/// A structure to bind one XML-RPC value onto a native value.
#[derive(Clone, Copy)]
pub struct ValueDeserializer<'a> {
    value: &'a Value,
    binder: &'a Binder,
}

impl<'a> ValueDeserializer<'a> {
    pub fn new(value: &'a Value, binder: &'a Binder) -> ValueDeserializer<'a> {
        ValueDeserializer { value, binder }
    }

    fn mismatch(&self, native: &str) -> Error {
        Error::type_mismatch(self.value.kind(), native)
    }
}

macro_rules! deserialize_int {
    ($method:ident, $ty:ty, $visit:ident) => {
        fn $method<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
            match *self.value {
                Value::Int(n) => match num::cast::<i64, $ty>(n) {
                    Some(v) => visitor.$visit(v),
                    None => Err(Error::InvalidParams(format!(
                        "integer {} out of range for {}",
                        n,
                        stringify!($ty)
                    ))),
                },
                Value::Nil => visitor.$visit(0),
                _ => Err(self.mismatch("int")),
            }
        }
    };
}

impl<'a> de::Deserializer<'a> for ValueDeserializer<'a> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        match *self.value {
            Value::Int(n) => visitor.visit_i64(n),
            Value::Double(n) => visitor.visit_f64(n),
            Value::String(ref s) => visitor.visit_borrowed_str(s),
            Value::Raw(ref s) => visitor.visit_borrowed_str(s.trim()),
            Value::Boolean(b) => visitor.visit_bool(b),
            Value::DateTime(ref dt) => visitor.visit_string(dt.to_wire()),
            Value::Base64(ref bytes) => visitor.visit_borrowed_bytes(bytes),
            Value::Struct(ref members) => visitor.visit_map(MemberAccess {
                members: members.iter(),
                pending: None,
                binder: self.binder,
            }),
            Value::Array(ref values) => visitor.visit_seq(ArrayAccess { iter: values.iter(), binder: self.binder }),
            Value::Nil => visitor.visit_unit(),
        }
    }

    fn deserialize_bool<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        match *self.value {
            Value::Boolean(b) => visitor.visit_bool(b),
            Value::Nil => visitor.visit_bool(false),
            _ => Err(self.mismatch("boolean")),
        }
    }

    deserialize_int!(deserialize_i8, i8, visit_i8);
    deserialize_int!(deserialize_i16, i16, visit_i16);
    deserialize_int!(deserialize_i32, i32, visit_i32);
    deserialize_int!(deserialize_i64, i64, visit_i64);
    deserialize_int!(deserialize_u8, u8, visit_u8);
    deserialize_int!(deserialize_u16, u16, visit_u16);
    deserialize_int!(deserialize_u32, u32, visit_u32);
    deserialize_int!(deserialize_u64, u64, visit_u64);

    fn deserialize_f32<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        match *self.value {
            Value::Double(n) => visitor.visit_f32(n as f32),
            Value::Nil => visitor.visit_f32(0.0),
            _ => Err(self.mismatch("double")),
        }
    }

    fn deserialize_f64<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        match *self.value {
            Value::Double(n) => visitor.visit_f64(n),
            Value::Nil => visitor.visit_f64(0.0),
            _ => Err(self.mismatch("double")),
        }
    }

    fn deserialize_char<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        match *self.value {
            Value::Nil => visitor.visit_char('\0'),
            _ => self.deserialize_str(visitor),
        }
    }

    fn deserialize_str<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        match *self.value {
            Value::String(ref s) => visitor.visit_borrowed_str(s),
            // untyped values default to strings
            Value::Raw(ref s) => visitor.visit_borrowed_str(s.trim()),
            Value::Nil => visitor.visit_borrowed_str(""),
            _ => Err(self.mismatch("string")),
        }
    }

    fn deserialize_string<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        match *self.value {
            Value::Base64(ref bytes) => visitor.visit_borrowed_bytes(bytes),
            Value::Array(_) => self.deserialize_seq(visitor),
            Value::Nil => visitor.visit_borrowed_bytes(&[]),
            _ => Err(self.mismatch("base64")),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        match *self.value {
            Value::Nil => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        match *self.value {
            Value::Nil => visitor.visit_unit(),
            _ => Err(self.mismatch("nil")),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'a>>(self, _name: &'static str, visitor: V) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'a>>(self, name: &'static str, visitor: V) -> Result<V::Value> {
        if name != DATETIME_TOKEN {
            return visitor.visit_newtype_struct(self);
        }
        match *self.value {
            Value::DateTime(ref dt) => visitor.visit_string(dt.to_wire()),
            Value::Nil => visitor.visit_borrowed_str(ZERO_DATETIME),
            _ => Err(self.mismatch("dateTime.iso8601")),
        }
    }

    fn deserialize_seq<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        match *self.value {
            Value::Array(ref values) => visitor.visit_seq(ArrayAccess { iter: values.iter(), binder: self.binder }),
            Value::Base64(ref bytes) => {
                let mut seq = SeqDeserializer::<_, Error>::new(bytes.iter().copied());
                let out = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(out)
            }
            Value::Nil => visitor.visit_seq(ArrayAccess { iter: [].iter(), binder: self.binder }),
            _ => Err(self.mismatch("array")),
        }
    }

    fn deserialize_tuple<V: Visitor<'a>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'a>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        match *self.value {
            Value::Struct(ref members) => visitor.visit_map(MemberAccess {
                members: members.iter(),
                pending: None,
                binder: self.binder,
            }),
            // maps go out as an empty untyped value
            Value::Raw(ref text) if text.is_empty() => visitor.visit_map(MemberAccess {
                members: [].iter(),
                pending: None,
                binder: self.binder,
            }),
            Value::Nil => visitor.visit_map(MemberAccess {
                members: [].iter(),
                pending: None,
                binder: self.binder,
            }),
            _ => Err(struct_mismatch(self.value)),
        }
    }

    fn deserialize_struct<V: Visitor<'a>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match *self.value {
            Value::Struct(ref members) => visitor.visit_map(StructAccess {
                members: members.iter(),
                fields,
                table: self.binder.table(fields),
                seen: vec![false; fields.len()],
                pending: None,
                binder: self.binder,
            }),
            Value::Nil => visitor.visit_map(ZeroAccess { fields: fields.iter(), binder: self.binder }),
            _ => Err(struct_mismatch(self.value)),
        }
    }

    fn deserialize_enum<V: Visitor<'a>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match *self.value {
            Value::String(ref s) => {
                let variant: StrDeserializer<Error> = s.as_str().into_deserializer();
                visitor.visit_enum(variant)
            }
            Value::Raw(ref s) => {
                let variant: StrDeserializer<Error> = s.trim().into_deserializer();
                visitor.visit_enum(variant)
            }
            _ => Err(self.mismatch("string")),
        }
    }

    fn deserialize_identifier<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }
}

struct ArrayAccess<'a> {
    iter: slice::Iter<'a, Value>,
    binder: &'a Binder,
}

impl<'a> SeqAccess<'a> for ArrayAccess<'a> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'a>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value, self.binder)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

/// Top-level params keyed by field position.
struct PositionalAccess<'a> {
    fields: &'static [&'static str],
    params: Enumerate<slice::Iter<'a, Value>>,
    pending: Option<&'a Value>,
    binder: &'a Binder,
}

impl<'a> MapAccess<'a> for PositionalAccess<'a> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'a>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if let Some((index, value)) = self.params.next() {
            self.pending = Some(value);
            let key = BorrowedStrDeserializer::<Error>::new(self.fields[index]);
            return seed.deserialize(key).map(Some);
        }
        Ok(None)
    }

    fn next_value_seed<V: DeserializeSeed<'a>>(&mut self, seed: V) -> Result<V::Value> {
        let value = self.pending.take().unwrap_or(&NIL);
        seed.deserialize(ValueDeserializer::new(value, self.binder))
    }
}

/// Wire members matched to native fields through the type's `FieldTable`.
struct StructAccess<'a> {
    members: slice::Iter<'a, (String, Value)>,
    fields: &'static [&'static str],
    table: Rc<FieldTable>,
    seen: Vec<bool>,
    pending: Option<&'a Value>,
    binder: &'a Binder,
}

impl<'a> MapAccess<'a> for StructAccess<'a> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'a>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        for &(ref name, ref value) in self.members.by_ref() {
            let index = match self.table.resolve(name) {
                Some(i) if !self.seen[i] => i,
                Some(_) => {
                    debug!("ignoring duplicate member {}", name);
                    continue;
                }
                None => {
                    debug!("no field for member {}", name);
                    continue;
                }
            };
            self.seen[index] = true;
            self.pending = Some(value);
            let key = BorrowedStrDeserializer::<Error>::new(self.fields[index]);
            return seed.deserialize(key).map(Some);
        }
        Ok(None)
    }

    fn next_value_seed<V: DeserializeSeed<'a>>(&mut self, seed: V) -> Result<V::Value> {
        let value = self.pending.take().unwrap_or(&NIL);
        seed.deserialize(ValueDeserializer::new(value, self.binder))
    }
}

/// Struct members as a plain map, for map-shaped targets.
struct MemberAccess<'a> {
    members: slice::Iter<'a, (String, Value)>,
    pending: Option<&'a Value>,
    binder: &'a Binder,
}

impl<'a> MapAccess<'a> for MemberAccess<'a> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'a>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        match self.members.next() {
            Some(&(ref name, ref value)) => {
                self.pending = Some(value);
                seed.deserialize(BorrowedStrDeserializer::<Error>::new(name)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'a>>(&mut self, seed: V) -> Result<V::Value> {
        let value = self.pending.take().unwrap_or(&NIL);
        seed.deserialize(ValueDeserializer::new(value, self.binder))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.members.len())
    }
}

/// Every field of a record that arrived as `<nil/>`, each fed `<nil/>`.
struct ZeroAccess<'a> {
    fields: slice::Iter<'static, &'static str>,
    binder: &'a Binder,
}

impl<'a> MapAccess<'a> for ZeroAccess<'a> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'a>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        match self.fields.next() {
            Some(field) => seed.deserialize(BorrowedStrDeserializer::<Error>::new(field)).map(Some),
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'a>>(&mut self, seed: V) -> Result<V::Value> {
        seed.deserialize(ValueDeserializer::new(&NIL, self.binder))
    }
}

/// Top-level params laid over a snapshot of the value being bound.
#[derive(Clone, Copy)]
struct BindParams<'a> {
    params: &'a [Value],
    kept: &'a Snapshot,
    binder: &'a Binder,
}

impl<'a> BindParams<'a> {
    fn single(&self) -> Result<BindNode<'a>> {
        match self.params.len() {
            0 => Ok(BindNode::new(None, Some(self.kept), self.binder)),
            1 => Ok(BindNode::new(self.params.first(), Some(self.kept), self.binder)),
            n => Err(Error::WrongArgumentsNumber { params: n, fields: 1 }),
        }
    }
}

impl<'a> de::Deserializer<'a> for BindParams<'a> {
    type Error = Error;

    forward_to_single! {
        deserialize_any deserialize_bool
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
        deserialize_f32 deserialize_f64 deserialize_char deserialize_str deserialize_string
        deserialize_bytes deserialize_byte_buf deserialize_unit deserialize_seq deserialize_map
        deserialize_identifier deserialize_ignored_any
    }

    fn deserialize_option<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        if self.params.len() > 1 {
            return visitor.visit_some(self);
        }
        self.single()?.deserialize_option(visitor)
    }

    fn deserialize_unit_struct<V: Visitor<'a>>(self, _name: &'static str, visitor: V) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'a>>(self, name: &'static str, visitor: V) -> Result<V::Value> {
        if name == DATETIME_TOKEN {
            return self.single()?.deserialize_newtype_struct(name, visitor);
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_tuple<V: Visitor<'a>>(self, len: usize, visitor: V) -> Result<V::Value> {
        if self.params.len() > len {
            return Err(Error::WrongArgumentsNumber { params: self.params.len(), fields: len });
        }
        visitor.visit_seq(BindElements {
            wire: self.params,
            kept: self.kept.as_array().map(Vec::as_slice).unwrap_or_default(),
            next: 0..len,
            binder: self.binder,
        })
    }

    fn deserialize_tuple_struct<V: Visitor<'a>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_tuple(len, visitor)
    }

    fn deserialize_struct<V: Visitor<'a>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        if fields.len() < self.params.len() {
            return Err(Error::WrongArgumentsNumber { params: self.params.len(), fields: fields.len() });
        }
        let wire = (0..fields.len()).map(|i| self.params.get(i)).collect();
        visitor.visit_map(BindFields::new(fields, wire, Some(self.kept), self.binder))
    }

    fn deserialize_enum<V: Visitor<'a>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.single()?.deserialize_enum(name, variants, visitor)
    }
}

/// One field being bound: the wire value when the document reached it,
/// otherwise the field's current value from the snapshot.
#[derive(Clone, Copy)]
struct BindNode<'a> {
    wire: Option<&'a Value>,
    kept: Option<&'a Snapshot>,
    binder: &'a Binder,
}

enum Source<'a> {
    Wire(ValueDeserializer<'a>),
    Kept(&'a Snapshot),
}

impl<'a> BindNode<'a> {
    fn new(wire: Option<&'a Value>, kept: Option<&'a Snapshot>, binder: &'a Binder) -> BindNode<'a> {
        BindNode { wire: wire.filter(|v| !v.is_nil()), kept, binder }
    }

    fn source(self) -> Source<'a> {
        match (self.wire, self.kept) {
            (Some(value), _) => Source::Wire(ValueDeserializer::new(value, self.binder)),
            (None, Some(kept)) => Source::Kept(kept),
            (None, None) => Source::Wire(ValueDeserializer::new(&NIL, self.binder)),
        }
    }
}

macro_rules! forward_to_source {
    ($($method:ident($($arg:ident: $ty:ty),*))*) => {
        $(
            fn $method<V: Visitor<'a>>(self, $($arg: $ty,)* visitor: V) -> Result<V::Value> {
                match self.source() {
                    Source::Wire(value) => value.$method($($arg,)* visitor),
                    Source::Kept(kept) => kept.$method($($arg,)* visitor).map_err(snapshot_error),
                }
            }
        )*
    }
}

impl<'a> de::Deserializer<'a> for BindNode<'a> {
    type Error = Error;

    forward_to_source! {
        deserialize_any() deserialize_bool()
        deserialize_i8() deserialize_i16() deserialize_i32() deserialize_i64()
        deserialize_u8() deserialize_u16() deserialize_u32() deserialize_u64()
        deserialize_f32() deserialize_f64() deserialize_char() deserialize_str() deserialize_string()
        deserialize_bytes() deserialize_byte_buf() deserialize_unit() deserialize_seq() deserialize_map()
        deserialize_identifier() deserialize_ignored_any()
        deserialize_unit_struct(name: &'static str)
        deserialize_tuple(len: usize)
        deserialize_tuple_struct(name: &'static str, len: usize)
        deserialize_enum(name: &'static str, variants: &'static [&'static str])
    }

    fn deserialize_option<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value> {
        match self.wire {
            Some(_) => visitor.visit_some(self),
            None => match self.kept {
                Some(kept) => kept.deserialize_option(visitor).map_err(snapshot_error),
                None => visitor.visit_none(),
            },
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'a>>(self, name: &'static str, visitor: V) -> Result<V::Value> {
        if name != DATETIME_TOKEN {
            return visitor.visit_newtype_struct(self);
        }
        match self.source() {
            Source::Wire(value) => value.deserialize_newtype_struct(name, visitor),
            Source::Kept(kept) => kept.deserialize_newtype_struct(name, visitor).map_err(snapshot_error),
        }
    }

    fn deserialize_struct<V: Visitor<'a>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let members = match self.wire {
            Some(Value::Struct(members)) => members,
            _ => {
                return match self.source() {
                    Source::Wire(value) => value.deserialize_struct(name, fields, visitor),
                    Source::Kept(kept) => kept.deserialize_struct(name, fields, visitor).map_err(snapshot_error),
                }
            }
        };

        let table = self.binder.table(fields);
        let mut wire = vec![None; fields.len()];
        for (name, value) in members {
            match table.resolve(name) {
                Some(i) if wire[i].is_none() => wire[i] = Some(value),
                Some(_) => debug!("ignoring duplicate member {}", name),
                None => debug!("no field for member {}", name),
            }
        }
        visitor.visit_map(BindFields::new(fields, wire, self.kept, self.binder))
    }
}

/// Record fields in declaration order. A field is handed to serde when the
/// document reached it or the snapshot holds it; the rest are left alone.
struct BindFields<'a> {
    fields: &'static [&'static str],
    wire: Vec<Option<&'a Value>>,
    kept: Option<&'a Map<String, Snapshot>>,
    next: Range<usize>,
    pending: Option<BindNode<'a>>,
    binder: &'a Binder,
}

impl<'a> BindFields<'a> {
    fn new(
        fields: &'static [&'static str],
        wire: Vec<Option<&'a Value>>,
        kept: Option<&'a Snapshot>,
        binder: &'a Binder,
    ) -> BindFields<'a> {
        BindFields {
            fields,
            wire,
            kept: kept.and_then(Snapshot::as_object),
            next: 0..fields.len(),
            pending: None,
            binder,
        }
    }
}

impl<'a> MapAccess<'a> for BindFields<'a> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'a>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        for index in self.next.by_ref() {
            let field = self.fields[index];
            let node = BindNode::new(self.wire[index], self.kept.and_then(|m| m.get(field)), self.binder);
            if node.wire.is_none() && node.kept.is_none() {
                continue;
            }
            self.pending = Some(node);
            return seed.deserialize(BorrowedStrDeserializer::<Error>::new(field)).map(Some);
        }
        Ok(None)
    }

    fn next_value_seed<V: DeserializeSeed<'a>>(&mut self, seed: V) -> Result<V::Value> {
        let node = self.pending.take().unwrap_or(BindNode::new(None, None, self.binder));
        seed.deserialize(node)
    }
}

/// Top-level params laid over the elements of a tuple being bound.
struct BindElements<'a> {
    wire: &'a [Value],
    kept: &'a [Snapshot],
    next: Range<usize>,
    binder: &'a Binder,
}

impl<'a> SeqAccess<'a> for BindElements<'a> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'a>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        match self.next.next() {
            Some(i) => seed.deserialize(BindNode::new(self.wire.get(i), self.kept.get(i), self.binder)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.next.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmlrpc::parser::parse;
    use crate::xmlrpc::value::DateTime;
    use serde::Deserialize;
    use std::collections::HashMap;
    use time::macros::datetime;

    fn decode<T: DeserializeOwned>(xml: &str) -> Result<T> {
        from_document(&parse(xml).unwrap())
    }

    fn response(values: &str) -> String {
        format!("<methodResponse><params>{}</params></methodResponse>", values)
    }

    fn param(inner: &str) -> String {
        format!("<param><value>{}</value></param>", inner)
    }

    #[derive(Deserialize, Serialize, Debug, PartialEq, Default, Clone)]
    #[serde(rename_all = "PascalCase")]
    struct Sub {
        foo: i32,
        bar: String,
        data: Vec<i32>,
    }

    #[derive(Deserialize, Serialize, Debug, PartialEq)]
    struct Scalars {
        int: i32,
        float: f64,
        text: String,
        flag: bool,
        sub: Sub,
        time: DateTime,
        #[serde(with = "crate::bytes")]
        blob: Vec<u8>,
    }

    #[test]
    fn test_positional_bind() {
        let xml = format!(
            "<methodCall><methodName>Some.Method</methodName><params>{}{}{}{}{}{}{}</params></methodCall>",
            param("<i4>123</i4>"),
            param("<double>3.145926</double>"),
            param("<string>Hello, World!</string>"),
            param("<boolean>0</boolean>"),
            param(
                "<struct><member><name>Foo</name><value><int>42</int></value></member>\
                 <member><name>Bar</name><value><string>I'm Bar</string></value></member>\
                 <member><name>Data</name><value><array><data><value><int>1</int></value>\
                 <value><int>2</int></value><value><int>3</int></value></data></array></value></member></struct>"
            ),
            param("<dateTime.iso8601>20120717T14:08:55</dateTime.iso8601>"),
            param("<base64>eW91IGNhbid0IHJlYWQgdGhpcyE=</base64>"),
        );
        let decoded: Scalars = decode(&xml).unwrap();
        assert_eq!(
            Scalars {
                int: 123,
                float: 3.145926,
                text: "Hello, World!".to_string(),
                flag: false,
                sub: Sub { foo: 42, bar: "I'm Bar".to_string(), data: vec![1, 2, 3] },
                time: DateTime::from(datetime!(2012-07-17 14:08:55)),
                blob: b"you can't read this!".to_vec(),
            },
            decoded
        );
    }

    #[derive(Deserialize, Debug, PartialEq)]
    #[serde(rename_all = "PascalCase")]
    struct HelloArgs {
        string1: String,
        string2: String,
        #[serde(rename = "ID")]
        id: i32,
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Hello {
        args: HelloArgs,
    }

    #[test]
    fn test_lowercase_members_reach_capitalized_fields() {
        let xml = response(&param(
            "<struct><member><name>string1</name><value><string>I'm a first string</string></value></member>\
             <member><name>string2</name><value><string>I'm a second string</string></value></member>\
             <member><name>id</name><value><int>1</int></value></member></struct>",
        ));
        let hello: Hello = decode(&xml).unwrap();
        assert_eq!(
            HelloArgs {
                string1: "I'm a first string".to_string(),
                string2: "I'm a second string".to_string(),
                id: 1,
            },
            hello.args
        );
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Guarded {
        #[serde(rename = "UserID")]
        user_id: Option<i32>,
        secret: Option<i32>,
    }

    #[test]
    fn test_lowercase_field_not_a_fallback_target() {
        let xml = response(&param(
            "<struct><member><name>user_id</name><value><int>7</int></value></member>\
             <member><name>SECRET</name><value><int>9</int></value></member></struct>",
        ));
        let guarded: Guarded = from_value(&parse(&xml).unwrap().params[0]).unwrap();
        assert_eq!(Guarded { user_id: Some(7), secret: None }, guarded);
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Ptr {
        ptr: Option<i32>,
    }

    #[test]
    fn test_nil_leaves_field_unset() {
        let ptr: Ptr = decode(&response(&param("<nil/>"))).unwrap();
        assert_eq!(Ptr { ptr: None }, ptr);
    }

    #[test]
    fn test_wrong_arguments_number() {
        let xml = response(&format!("{}{}", param("<int>1</int>"), param("<int>2</int>")));
        match decode::<Ptr>(&xml) {
            Err(Error::WrongArgumentsNumber { params: 2, fields: 1 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Pair {
        a: i32,
        #[serde(default)]
        b: i32,
    }

    #[test]
    fn test_extra_fields_are_absent() {
        let pair: Pair = decode(&response(&param("<int>4</int>"))).unwrap();
        assert_eq!(Pair { a: 4, b: 0 }, pair);
    }

    #[test]
    fn test_type_mismatch() {
        match decode::<Pair>(&response(&param("<string>4</string>"))) {
            Err(Error::InvalidParams(msg)) => assert_eq!("fields type mismatch: string != int", msg),
            other => panic!("unexpected {:?}", other),
        }

        #[derive(Deserialize, Debug)]
        struct Float {
            #[allow(dead_code)]
            f: f64,
        }
        match decode::<Float>(&response(&param("<int>4</int>"))) {
            Err(Error::InvalidParams(msg)) => assert_eq!("fields type mismatch: int != double", msg),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_struct_shape_mismatch() {
        match decode::<Hello>(&response(&param("<int>4</int>"))) {
            Err(Error::InvalidParams(msg)) => assert_eq!("structure fields mismatch: int != struct", msg),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_integer_range() {
        #[derive(Deserialize, Debug)]
        struct Small {
            #[allow(dead_code)]
            n: u8,
        }
        assert!(matches!(
            decode::<Small>(&response(&param("<int>300</int>"))),
            Err(Error::InvalidParams(_))
        ));
    }

    #[test]
    fn test_untyped_value_is_trimmed_string() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Text {
            t: String,
        }
        let text: Text = decode(&response(&param("\n   plain text \n"))).unwrap();
        assert_eq!("plain text", text.t);
        let text: Text = decode(&response(&param("<string></string>"))).unwrap();
        assert_eq!("", text.t);
    }

    #[test]
    fn test_fault_short_circuits() {
        let xml = "<methodResponse><fault><value><struct><member><name>faultCode</name><value><int>116</int></value></member>\
                   <member><name>faultString</name><value><string>boom</string></value></member></struct></value></fault></methodResponse>";
        match decode::<Ptr>(xml) {
            Err(Error::Fault(fault)) => {
                assert_eq!(116, fault.code);
                assert_eq!("boom", fault.message);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_scalar_target() {
        let n: i32 = decode(&response(&param("<int>5</int>"))).unwrap();
        assert_eq!(5, n);
        let none: Option<i32> = decode(&response("")).unwrap();
        assert_eq!(None, none);
        let list: Vec<String> =
            decode(&response(&param("<array><data><value>a</value><value><string>b</string></value></data></array>")))
                .unwrap();
        assert_eq!(vec!["a".to_string(), "b".to_string()], list);
    }

    #[test]
    fn test_tuple_target() {
        let xml = response(&format!("{}{}", param("<string>hello</string>"), param("<boolean>1</boolean>")));
        let (s, b): (String, bool) = decode(&xml).unwrap();
        assert_eq!(("hello".to_string(), true), (s, b));
    }

    #[test]
    fn test_base64_into_plain_vec() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Raw {
            data: Vec<u8>,
        }
        let raw: Raw = decode(&response(&param("<base64>AQID</base64>"))).unwrap();
        assert_eq!(vec![1, 2, 3], raw.data);
    }

    #[test]
    fn test_map_and_enum_targets() {
        #[derive(Deserialize, Debug, PartialEq)]
        enum State {
            Running,
            Stopped,
        }
        #[derive(Deserialize, Debug)]
        struct Status {
            state: State,
            extra: HashMap<String, i32>,
        }
        let xml = response(&format!(
            "{}{}",
            param("<string>Running</string>"),
            param("<struct><member><name>x</name><value><int>1</int></value></member></struct>")
        ));
        let status: Status = decode(&xml).unwrap();
        assert_eq!(State::Running, status.state);
        assert_eq!(Some(&1), status.extra.get("x"));
        assert!(decode::<Status>(&response(&param("<string>Paused</string>"))).is_err());
        let _ = State::Stopped;
    }

    #[test]
    fn test_duplicate_member_first_wins() {
        let xml = response(&param(
            "<struct><member><name>Foo</name><value><int>1</int></value></member>\
             <member><name>Foo</name><value><int>2</int></value></member>\
             <member><name>Bar</name><value>x</value></member>\
             <member><name>Data</name><value><array><data></data></array></value></member></struct>",
        ));
        let sub: Sub = from_value(&parse(&xml).unwrap().params[0]).unwrap();
        assert_eq!(Sub { foo: 1, bar: "x".to_string(), data: vec![] }, sub);
    }

    #[derive(Deserialize, Serialize, Debug, PartialEq, Clone)]
    struct Target {
        name: String,
        sub: Sub,
        count: i32,
        note: Option<String>,
    }

    fn target() -> Target {
        Target {
            name: "old".to_string(),
            sub: Sub { foo: 1, bar: "keep".to_string(), data: vec![9, 9] },
            count: 3,
            note: Some("kept".to_string()),
        }
    }

    #[test]
    fn test_bind_touches_only_reached_fields() {
        let xml = response(&format!(
            "{}{}",
            param("<string>new</string>"),
            param(
                "<struct><member><name>foo</name><value><int>42</int></value></member>\
                 <member><name>data</name><value><array><data><value><int>1</int></value></data></array></value></member></struct>"
            )
        ));
        let mut t = target();
        bind_document(&parse(&xml).unwrap(), &mut t).unwrap();
        assert_eq!(
            Target {
                name: "new".to_string(),
                sub: Sub { foo: 42, bar: "keep".to_string(), data: vec![1] },
                count: 3,
                note: Some("kept".to_string()),
            },
            t
        );
    }

    #[test]
    fn test_bind_nil_keeps_value() {
        let xml = response(&format!("{}{}{}{}", param("<nil/>"), param("<nil/>"), param("<nil/>"), param("<nil/>")));
        let mut t = target();
        bind_document(&parse(&xml).unwrap(), &mut t).unwrap();
        assert_eq!(target(), t);
    }

    #[test]
    fn test_bind_error_leaves_target() {
        let xml = response(&format!("{}{}", param("<string>new</string>"), param("<int>5</int>")));
        let mut t = target();
        match bind_document(&parse(&xml).unwrap(), &mut t) {
            Err(Error::InvalidParams(msg)) => assert_eq!("structure fields mismatch: int != struct", msg),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(target(), t);
    }

    #[test]
    fn test_bind_arity() {
        let params: String = (0..5).map(|_| param("<int>1</int>")).collect();
        let mut t = target();
        assert!(matches!(
            bind_document(&parse(&response(&params)).unwrap(), &mut t),
            Err(Error::WrongArgumentsNumber { params: 5, fields: 4 })
        ));
    }

    #[derive(Deserialize, Serialize, Debug, PartialEq)]
    enum State {
        Idle,
        Exited(i32),
    }

    #[derive(Deserialize, Serialize, Debug, PartialEq)]
    struct Worker {
        name: String,
        #[serde(skip)]
        cache: i32,
        extra: HashMap<String, i32>,
        state: State,
        serial: u64,
        sub: Sub,
    }

    fn worker() -> Worker {
        let mut extra = HashMap::new();
        extra.insert("k".to_string(), 1);
        Worker {
            name: "old".to_string(),
            cache: 5,
            extra,
            state: State::Exited(1),
            serial: u64::MAX,
            sub: Sub { foo: 1, bar: "keep".to_string(), data: vec![9] },
        }
    }

    #[test]
    fn test_bind_keeps_unreached_fields() {
        let mut w = worker();
        bind_document(&parse(&response(&param("<string>new</string>"))).unwrap(), &mut w).unwrap();
        assert_eq!(Worker { name: "new".to_string(), ..worker() }, w);
        assert_eq!(5, w.cache);
        assert_eq!(Some(&1), w.extra.get("k"));
        assert_eq!(State::Exited(1), w.state);
        assert_eq!(u64::MAX, w.serial);
    }

    #[test]
    fn test_bind_keeps_skipped_field_under_nested_struct() {
        #[derive(Deserialize, Serialize, Debug, PartialEq, Default)]
        struct Inner {
            n: i32,
            #[serde(skip)]
            hits: i32,
        }
        #[derive(Deserialize, Serialize, Debug, PartialEq, Default)]
        struct Outer {
            inner: Inner,
        }

        let mut outer = Outer { inner: Inner { n: 1, hits: 7 } };
        let xml = response(&param("<struct><member><name>n</name><value><int>2</int></value></member></struct>"));
        bind_document(&parse(&xml).unwrap(), &mut outer).unwrap();
        assert_eq!(Outer { inner: Inner { n: 2, hits: 7 } }, outer);
    }

    #[test]
    fn test_bind_reached_map_and_enum() {
        let xml = response(&format!(
            "{}{}{}",
            param("<string>new</string>"),
            param("<struct><member><name>x</name><value><int>2</int></value></member></struct>"),
            param("<string>Idle</string>"),
        ));
        let mut w = worker();
        bind_document(&parse(&xml).unwrap(), &mut w).unwrap();
        assert_eq!(None, w.extra.get("k"));
        assert_eq!(Some(&2), w.extra.get("x"));
        assert_eq!(State::Idle, w.state);
        assert_eq!(5, w.cache);
    }

    #[test]
    fn test_bind_tuple() {
        let xml = response(&param("<string>new</string>"));
        let mut pair = ("old".to_string(), 7);
        bind_document(&parse(&xml).unwrap(), &mut pair).unwrap();
        assert_eq!(("new".to_string(), 7), pair);
    }
}
