// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Raw text to `Document`: a generic element tree built from xml-rs events,
//! then materialised into params, fault and method name.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use xml::reader::{EventReader, ParserConfig, XmlEvent};

use crate::error::{ParserError, Result};

use super::charset::{self, CharsetReader};
use super::fault::Fault;
use super::value::{DateTime, Value};

/// Typed children of `<value>`, strongest first. When a (malformed) value
/// carries several, the first one listed here wins.
const TYPE_PRECEDENCE: [&str; 10] = [
    "int",
    "i4",
    "double",
    "string",
    "boolean",
    "dateTime.iso8601",
    "base64",
    "struct",
    "array",
    "nil",
];

/// A node of the generic element tree.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Element {
    pub name: String,
    /// Character data directly inside this element, untrimmed.
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn new(name: String) -> Element {
        Element { name, ..Element::default() }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DocumentKind {
    Call,
    Response,
}

/// A parsed `<methodCall>` or `<methodResponse>`.
#[derive(Clone, PartialEq, Debug)]
pub struct Document {
    pub kind: DocumentKind,
    pub method_name: Option<String>,
    pub params: Vec<Value>,
    /// Present whenever the document had a `<fault>` element, even an empty one.
    pub fault: Option<Fault>,
}

impl Document {
    pub fn from_tree(root: &Element) -> Result<Document> {
        let kind = match root.name.as_str() {
            "methodCall" => DocumentKind::Call,
            "methodResponse" => DocumentKind::Response,
            other => {
                return Err(structure(format!("unexpected root element <{}>", other)));
            }
        };

        let method_name = root.child("methodName").map(|e| e.text.trim().to_string());

        let mut params = Vec::new();
        if let Some(list) = root.child("params") {
            for param in list.children_named("param") {
                let value = param
                    .child("value")
                    .ok_or_else(|| structure("<param> without <value>".to_string()))?;
                params.push(value_from_element(value)?);
            }
        }

        let fault = match root.child("fault") {
            Some(fault) => match fault.child("value") {
                Some(value) => Some(Fault::from_value(&value_from_element(value)?)),
                None => Some(Fault::default()),
            },
            None => None,
        };

        Ok(Document { kind, method_name, params, fault })
    }

    /// The fault carried by the document, unless absent or empty.
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref().filter(|f| !f.is_empty())
    }
}

fn structure(msg: String) -> crate::error::Error {
    ParserError::Structure(msg).into()
}

fn malformed(kind: &'static str, text: &str) -> crate::error::Error {
    ParserError::Scalar { kind, text: text.to_string() }.into()
}

/// Materialises one `<value>` element.
pub fn value_from_element(el: &Element) -> Result<Value> {
    let typed = TYPE_PRECEDENCE
        .iter()
        .filter_map(|tag| el.child(tag))
        .next()
        .or_else(|| el.children.first());

    let child = match typed {
        Some(child) => child,
        None => return Ok(Value::Raw(el.text.clone())),
    };

    let text = child.text.trim();
    let value = match child.name.as_str() {
        "int" | "i4" => Value::Int(text.parse().map_err(|_| malformed("int", text))?),
        "double" => Value::Double(text.parse().map_err(|_| malformed("double", text))?),
        "string" => Value::String(child.text.clone()),
        "boolean" => Value::Boolean(parse_bool(text).ok_or_else(|| malformed("boolean", text))?),
        "dateTime.iso8601" => Value::DateTime(DateTime::parse(text)?),
        "base64" => {
            let compact: String = text.split_whitespace().collect();
            Value::Base64(STANDARD.decode(compact)?)
        }
        "struct" => {
            let mut members = Vec::new();
            for member in child.children_named("member") {
                let name = member
                    .child("name")
                    .ok_or_else(|| structure("<member> without <name>".to_string()))?;
                let value = member
                    .child("value")
                    .ok_or_else(|| structure(format!("<member> {} without <value>", name.text)))?;
                members.push((name.text.trim().to_string(), value_from_element(value)?));
            }
            Value::Struct(members)
        }
        "array" => {
            let mut values = Vec::new();
            if let Some(data) = child.child("data") {
                for value in data.children_named("value") {
                    values.push(value_from_element(value)?);
                }
            }
            Value::Array(values)
        }
        "nil" => Value::Nil,
        other => {
            debug!("unknown value type <{}>, keeping its text", other);
            Value::Raw(child.text.clone())
        }
    };
    Ok(value)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "true" | "TRUE" | "True" => Some(true),
        "0" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Builds the generic element tree with xml-rs.
pub fn parse_tree(text: &str) -> std::result::Result<Element, ParserError> {
    let config = ParserConfig::new()
        .trim_whitespace(false)
        .whitespace_to_characters(true)
        .cdata_to_characters(true)
        .ignore_comments(true);
    let reader = EventReader::new_with_config(text.as_bytes(), config);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;
    for event in reader {
        match event? {
            XmlEvent::StartElement { name, .. } => stack.push(Element::new(name.local_name)),
            XmlEvent::EndElement { .. } => {
                let done = stack
                    .pop()
                    .ok_or_else(|| ParserError::Structure("unbalanced end tag".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(done),
                    None => root = Some(done),
                }
            }
            XmlEvent::Characters(s) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&s);
                }
            }
            _ => {}
        }
    }
    root.ok_or_else(|| ParserError::Structure("empty document".to_string()))
}

/// Parses UTF-8 text. A declared non-UTF-8 charset is ignored since the text
/// is already decoded.
pub fn parse(text: &str) -> Result<Document> {
    trace!("XML-RPC body: {}", text);
    let text = charset::normalize_declaration(text);
    let root = parse_tree(&text)?;
    Document::from_tree(&root)
}

/// Parses raw bytes, transcoding through `reader` when required.
pub fn parse_bytes(doc: &[u8], reader: Option<&CharsetReader>) -> Result<Document> {
    let text = charset::to_utf8(doc, reader)?;
    parse(&text)
}
