// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Native values to `Value` trees.

use serde::ser::{self, Serialize};

use crate::error::{Error, Result};

use super::value::{DateTime, Members, Value, DATETIME_TOKEN};

/// Converts any serializable native value into a `Value` tree.
///
/// Maps and data-carrying enum variants have no XML-RPC form; they become an
/// empty untyped value rather than an error.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    value.serialize(ValueSerializer)
}

/// Converts a native value into the param list of a call or response.
///
/// A tuple or tuple struct is an argument list: each element becomes its
/// own param. Anything else is one param, and a record param is flattened
/// into one `<param>` per field when written.
pub fn to_params<T: Serialize + ?Sized>(value: &T) -> Result<Vec<Value>> {
    value.serialize(ParamsSerializer)
}

/// A structure for implementing serialization to XML-RPC values.
#[derive(Clone, Copy, Debug, Default)]
pub struct ValueSerializer;

fn unsupported(kind: &str) -> Value {
    debug!("skipping {} with no XML-RPC representation", kind);
    Value::Raw(String::new())
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SerializeArray;
    type SerializeTuple = SerializeArray;
    type SerializeTupleStruct = SerializeArray;
    type SerializeTupleVariant = Skipped;
    type SerializeMap = Skipped;
    type SerializeStruct = SerializeRecord;
    type SerializeStructVariant = Skipped;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Boolean(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }
    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }
    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }
    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::Int(v))
    }
    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }
    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }
    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }
    fn serialize_u64(self, v: u64) -> Result<Value> {
        match num::cast::<u64, i64>(v) {
            Some(n) => Ok(Value::Int(n)),
            None => Err(Error::InvalidParams(format!("integer {} out of range", v))),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Ok(Value::Double(v as f64))
    }
    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::Double(v))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }
    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::Base64(v.to_vec()))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Nil)
    }
    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Nil)
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::Nil)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Value> {
        let inner = value.serialize(self)?;
        if name != DATETIME_TOKEN {
            return Ok(inner);
        }
        match inner {
            Value::String(ref s) => Ok(Value::DateTime(DateTime::parse(s)?)),
            other => Err(Error::type_mismatch(other.kind(), "dateTime.iso8601")),
        }
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Value> {
        Ok(unsupported("newtype variant"))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeArray> {
        Ok(SerializeArray { values: Vec::with_capacity(len.unwrap_or(0)) })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeArray> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeArray> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Skipped> {
        Ok(Skipped("tuple variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Skipped> {
        Ok(Skipped("map"))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<SerializeRecord> {
        Ok(SerializeRecord { members: Vec::with_capacity(len) })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Skipped> {
        Ok(Skipped("struct variant"))
    }
}

pub struct SerializeArray {
    values: Vec<Value>,
}

impl ser::SerializeSeq for SerializeArray {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.values.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Array(self.values))
    }
}

impl ser::SerializeTuple for SerializeArray {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeArray {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

/// Struct fields in declaration order, named by their serde name.
pub struct SerializeRecord {
    members: Members,
}

impl ser::SerializeStruct for SerializeRecord {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()> {
        let value = value.serialize(ValueSerializer)?;
        self.members.push((key.to_string(), value));
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Struct(self.members))
    }
}

/// Swallows a native kind XML-RPC cannot carry.
pub struct Skipped(&'static str);

impl ser::SerializeMap for Skipped {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, _key: &T) -> Result<()> {
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, _value: &T) -> Result<()> {
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(unsupported(self.0))
    }
}

impl ser::SerializeTupleVariant for Skipped {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _value: &T) -> Result<()> {
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(unsupported(self.0))
    }
}

impl ser::SerializeStructVariant for Skipped {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _key: &'static str, _value: &T) -> Result<()> {
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(unsupported(self.0))
    }
}

/// Top level of a param list; only tuples differ from `ValueSerializer`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParamsSerializer;

macro_rules! one_param {
    ($($method:ident($($arg:ident: $ty:ty),*))*) => {
        $(
            fn $method(self, $($arg: $ty),*) -> Result<Vec<Value>> {
                ser::Serializer::$method(ValueSerializer, $($arg),*).map(|v| vec![v])
            }
        )*
    }
}

impl ser::Serializer for ParamsSerializer {
    type Ok = Vec<Value>;
    type Error = Error;

    type SerializeSeq = OneParam<SerializeArray>;
    type SerializeTuple = ParamList;
    type SerializeTupleStruct = ParamList;
    type SerializeTupleVariant = OneParam<Skipped>;
    type SerializeMap = OneParam<Skipped>;
    type SerializeStruct = OneParam<SerializeRecord>;
    type SerializeStructVariant = OneParam<Skipped>;

    one_param! {
        serialize_bool(v: bool)
        serialize_i8(v: i8) serialize_i16(v: i16) serialize_i32(v: i32) serialize_i64(v: i64)
        serialize_u8(v: u8) serialize_u16(v: u16) serialize_u32(v: u32) serialize_u64(v: u64)
        serialize_f32(v: f32) serialize_f64(v: f64)
        serialize_char(v: char) serialize_str(v: &str) serialize_bytes(v: &[u8])
        serialize_none() serialize_unit()
        serialize_unit_struct(name: &'static str)
        serialize_unit_variant(name: &'static str, index: u32, variant: &'static str)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Vec<Value>> {
        value.serialize(self)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(self, name: &'static str, value: &T) -> Result<Vec<Value>> {
        if name == DATETIME_TOKEN {
            return ser::Serializer::serialize_newtype_struct(ValueSerializer, name, value).map(|v| vec![v]);
        }
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Vec<Value>> {
        ser::Serializer::serialize_newtype_variant(ValueSerializer, name, index, variant, value).map(|v| vec![v])
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<OneParam<SerializeArray>> {
        ser::Serializer::serialize_seq(ValueSerializer, len).map(OneParam)
    }

    fn serialize_tuple(self, len: usize) -> Result<ParamList> {
        Ok(ParamList { params: Vec::with_capacity(len) })
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<ParamList> {
        self.serialize_tuple(len)
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<OneParam<Skipped>> {
        ser::Serializer::serialize_tuple_variant(ValueSerializer, name, index, variant, len).map(OneParam)
    }

    fn serialize_map(self, len: Option<usize>) -> Result<OneParam<Skipped>> {
        ser::Serializer::serialize_map(ValueSerializer, len).map(OneParam)
    }

    fn serialize_struct(self, name: &'static str, len: usize) -> Result<OneParam<SerializeRecord>> {
        ser::Serializer::serialize_struct(ValueSerializer, name, len).map(OneParam)
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<OneParam<Skipped>> {
        ser::Serializer::serialize_struct_variant(ValueSerializer, name, index, variant, len).map(OneParam)
    }
}

/// Tuple elements, one param each.
pub struct ParamList {
    params: Vec<Value>,
}

impl ser::SerializeTuple for ParamList {
    type Ok = Vec<Value>;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.params.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Vec<Value>> {
        Ok(self.params)
    }
}

impl ser::SerializeTupleStruct for ParamList {
    type Ok = Vec<Value>;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        ser::SerializeTuple::serialize_element(self, value)
    }

    fn end(self) -> Result<Vec<Value>> {
        ser::SerializeTuple::end(self)
    }
}

/// A compound value that still makes a single param.
pub struct OneParam<S>(S);

impl<S: ser::SerializeSeq<Ok = Value, Error = Error>> ser::SerializeSeq for OneParam<S> {
    type Ok = Vec<Value>;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.0.serialize_element(value)
    }

    fn end(self) -> Result<Vec<Value>> {
        self.0.end().map(|v| vec![v])
    }
}

impl<S: ser::SerializeMap<Ok = Value, Error = Error>> ser::SerializeMap for OneParam<S> {
    type Ok = Vec<Value>;
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> {
        self.0.serialize_key(key)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.0.serialize_value(value)
    }

    fn end(self) -> Result<Vec<Value>> {
        self.0.end().map(|v| vec![v])
    }
}

impl<S: ser::SerializeStruct<Ok = Value, Error = Error>> ser::SerializeStruct for OneParam<S> {
    type Ok = Vec<Value>;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.0.serialize_field(key, value)
    }

    fn end(self) -> Result<Vec<Value>> {
        self.0.end().map(|v| vec![v])
    }
}

impl<S: ser::SerializeTupleVariant<Ok = Value, Error = Error>> ser::SerializeTupleVariant for OneParam<S> {
    type Ok = Vec<Value>;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.0.serialize_field(value)
    }

    fn end(self) -> Result<Vec<Value>> {
        self.0.end().map(|v| vec![v])
    }
}

impl<S: ser::SerializeStructVariant<Ok = Value, Error = Error>> ser::SerializeStructVariant for OneParam<S> {
    type Ok = Vec<Value>;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.0.serialize_field(key, value)
    }

    fn end(self) -> Result<Vec<Value>> {
        self.0.end().map(|v| vec![v])
    }
}
