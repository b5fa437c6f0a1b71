// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use thiserror::Error;

use super::value::Value;

/// Malformed or unparsable document.
pub const PARSE_ERROR: i64 = -32700;
/// Parameters do not fit the method signature.
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
/// The method itself failed.
pub const APPLICATION_ERROR: i64 = -32500;

/// A `<fault>` response: numeric code plus message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("fault {code}: {message}")]
pub struct Fault {
    pub code: i64,
    pub message: String,
}

impl Fault {
    pub fn new<S: Into<String>>(code: i64, message: S) -> Fault {
        Fault { code, message: message.into() }
    }

    /// True only when neither a code nor a message was carried.
    pub fn is_empty(&self) -> bool {
        self.code == 0 && self.message.is_empty()
    }

    /// Extracts `faultCode` and `faultString` from the struct wrapped by a
    /// `<fault>` element. Member order does not matter, the first member
    /// with a given name wins, and an untyped string body is accepted.
    pub fn from_value(value: &Value) -> Fault {
        let mut fault = Fault::default();
        if let Some(code) = value.find("faultCode").and_then(Value::as_i64) {
            fault.code = code;
        }
        if let Some(message) = value.find("faultString").and_then(Value::as_str) {
            fault.message = message.to_string();
        }
        fault
    }

    pub fn to_value(&self) -> Value {
        Value::Struct(vec![
            ("faultCode".to_string(), Value::Int(self.code)),
            ("faultString".to_string(), Value::String(self.message.clone())),
        ])
    }
}
