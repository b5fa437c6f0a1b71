// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::ser::{Serialize, Serializer};
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use super::encoding;

/// Newtype name the encoder and decoder recognise as a timestamp.
pub(crate) const DATETIME_TOKEN: &str = "$xmlrpc_codec::private::DateTime";

/// Represents an XML-RPC data value
#[derive(Clone, PartialEq, PartialOrd, Debug)]
pub enum Value {
    Int(i64),
    Double(f64),
    String(String),
    Boolean(bool),
    DateTime(DateTime),
    Base64(Vec<u8>),
    Struct(Members),
    Array(Array),
    Nil,
    /// Text of a `<value>` without a typed child.
    Raw(String),
}

/// Struct members in wire order. Names may repeat; lookups take the first.
pub type Members = Vec<(String, Value)>;
pub type Array = Vec<Value>;

impl Value {
    /// Wire name of the variant, used in mismatch reports.
    pub fn kind(&self) -> &'static str {
        match *self {
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Base64(_) => "base64",
            Value::Struct(_) => "struct",
            Value::Array(_) => "array",
            Value::Nil => "nil",
            Value::Raw(_) => "string",
        }
    }

    /// If the value is a Struct, returns the first member named `key`.
    pub fn find<'a>(&'a self, key: &str) -> Option<&'a Value> {
        self.as_struct()
            .and_then(|members| members.iter().find(|m| m.0 == key))
            .map(|m| &m.1)
    }

    /// Follows `keys` through nested structs.
    pub fn find_path<'a>(&'a self, keys: &[&str]) -> Option<&'a Value> {
        let mut target = self;
        for key in keys {
            target = target.find(key)?;
        }
        Some(target)
    }

    pub fn as_struct(&self) -> Option<&Members> {
        match *self {
            Value::Struct(ref members) => Some(members),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match *self {
            Value::Array(ref values) => Some(values),
            _ => None,
        }
    }

    /// Typed strings and untyped text both read as strings.
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::String(ref s) | Value::Raw(ref s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Double(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match *self {
            Value::Base64(ref bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime> {
        match *self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn is_struct(&self) -> bool {
        self.as_struct().is_some()
    }

    pub fn is_array(&self) -> bool {
        self.as_array().is_some()
    }

    pub fn is_nil(&self) -> bool {
        *self == Value::Nil
    }
}

impl fmt::Display for Value {
    /// Renders the value as `<value>` markup.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut out = String::new();
        encoding::write_value(&mut out, self);
        f.write_str(&out)
    }
}

macro_rules! from_int_impl {
    ($($t:ty), +) => (
        $(impl From<$t> for Value {
            fn from(n: $t) -> Value { Value::Int(n as i64) }
        })+
    )
}

from_int_impl! { i8, i16, i32, i64, u8, u16, u32 }

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value::Double(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Boolean(b)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(s: &'a str) -> Value {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(s)
    }
}

impl From<DateTime> for Value {
    fn from(dt: DateTime) -> Value {
        Value::DateTime(dt)
    }
}

/// Wall-clock timestamp as carried by `<dateTime.iso8601>`.
///
/// The wire form has no zone, so the value is always read as local time and
/// any offset is dropped when converting from `OffsetDateTime`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct DateTime(PrimitiveDateTime);

impl DateTime {
    pub fn new(inner: PrimitiveDateTime) -> DateTime {
        DateTime(inner)
    }

    /// Parses `YYYYMMDDTHH:MM:SS`.
    pub fn parse(s: &str) -> Result<DateTime, time::error::Parse> {
        let format = format_description!("[year][month][day]T[hour]:[minute]:[second]");
        PrimitiveDateTime::parse(s.trim(), format).map(DateTime)
    }

    pub fn to_wire(&self) -> String {
        let dt = self.0;
        format!(
            "{:04}{:02}{:02}T{:02}:{:02}:{:02}",
            dt.year(),
            u8::from(dt.month()),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        )
    }

    pub fn as_primitive(&self) -> PrimitiveDateTime {
        self.0
    }
}

impl From<PrimitiveDateTime> for DateTime {
    fn from(inner: PrimitiveDateTime) -> DateTime {
        DateTime(inner)
    }
}

impl From<OffsetDateTime> for DateTime {
    fn from(odt: OffsetDateTime) -> DateTime {
        DateTime(PrimitiveDateTime::new(odt.date(), odt.time()))
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl Serialize for DateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(DATETIME_TOKEN, &self.to_wire())
    }
}

impl<'de> Deserialize<'de> for DateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<DateTime, D::Error> {
        deserializer.deserialize_newtype_struct(DATETIME_TOKEN, DateTimeVisitor)
    }
}

struct DateTimeVisitor;

impl<'de> Visitor<'de> for DateTimeVisitor {
    type Value = DateTime;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("dateTime.iso8601")
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<DateTime, E> {
        DateTime::parse(s).map_err(E::custom)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(self, d: D) -> Result<DateTime, D::Error> {
        d.deserialize_str(self)
    }
}
