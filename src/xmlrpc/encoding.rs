// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Markup writer for `Value` trees.

use std::fmt::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::fault::Fault;
use super::value::Value;

pub const XML_DECLARATION: &str = "<?xml version=\"1.0\"?>";

/// Writes `<methodCall>` with the method name and flattened params.
pub fn write_request(out: &mut String, method: &str, params: &[Value]) {
    out.push_str("<methodCall><methodName>");
    escape_into(out, method);
    out.push_str("</methodName>");
    write_params(out, params);
    out.push_str("</methodCall>");
}

pub fn write_response(out: &mut String, params: &[Value]) {
    out.push_str("<methodResponse>");
    write_params(out, params);
    out.push_str("</methodResponse>");
}

pub fn write_fault(out: &mut String, fault: &Fault) {
    out.push_str("<methodResponse><fault>");
    write_value(out, &fault.to_value());
    out.push_str("</fault></methodResponse>");
}

/// Writes `<params>`. A struct argument is flattened one level: each of its
/// members becomes a separate `<param>`, in member order.
pub fn write_params(out: &mut String, params: &[Value]) {
    out.push_str("<params>");
    for param in params {
        match *param {
            Value::Struct(ref members) => {
                for &(_, ref value) in members {
                    write_param(out, value);
                }
            }
            ref value => write_param(out, value),
        }
    }
    out.push_str("</params>");
}

fn write_param(out: &mut String, value: &Value) {
    out.push_str("<param>");
    write_value(out, value);
    out.push_str("</param>");
}

/// Writes one `<value>` element and everything below it.
pub fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match *value {
        Value::Int(n) => {
            let _ = write!(out, "<int>{}</int>", n);
        }
        Value::Double(n) => {
            let _ = write!(out, "<double>{:.6}</double>", n);
        }
        Value::String(ref s) => {
            out.push_str("<string>");
            escape_into(out, s);
            out.push_str("</string>");
        }
        Value::Boolean(b) => {
            let _ = write!(out, "<boolean>{}</boolean>", b as u8);
        }
        Value::DateTime(ref dt) => {
            let _ = write!(out, "<dateTime.iso8601>{}</dateTime.iso8601>", dt.to_wire());
        }
        Value::Base64(ref bytes) => {
            out.push_str("<base64>");
            STANDARD.encode_string(bytes, out);
            out.push_str("</base64>");
        }
        Value::Struct(ref members) => {
            out.push_str("<struct>");
            for &(ref name, ref value) in members {
                out.push_str("<member><name>");
                escape_into(out, name);
                out.push_str("</name>");
                write_value(out, value);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Array(ref values) => {
            out.push_str("<array><data>");
            for value in values {
                write_value(out, value);
            }
            out.push_str("</data></array>");
        }
        Value::Nil => out.push_str("<nil/>"),
        // unsupported native kinds end up here with empty text
        Value::Raw(ref text) => escape_into(out, text),
    }
    out.push_str("</value>");
}

/// Escapes `&`, `"`, `<` and `>` in that order.
pub fn escape_str(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_into(out: &mut String, s: &str) {
    out.push_str(&escape_str(s));
}
