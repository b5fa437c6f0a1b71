// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Declared-encoding handling in front of the XML parser.
//!
//! Transcoding itself is not done here: callers inject a `CharsetReader`
//! that turns bytes of a named charset into UTF-8 text.

use std::borrow::Cow;
use std::str;
use std::sync::{Arc, OnceLock};

use regex::{bytes, Regex};

use crate::error::ParserError;

/// Turns a document in the declared charset (first argument) into UTF-8.
pub type CharsetReader = Arc<dyn Fn(&str, &[u8]) -> Result<String, ParserError> + Send + Sync>;

const DECLARATION: &str = r#"(?i)^\s*(<\?xml[^>]*?\bencoding\s*=\s*["'])([A-Za-z0-9._:-]*)(["'])"#;

fn declaration_bytes() -> &'static bytes::Regex {
    static RE: OnceLock<bytes::Regex> = OnceLock::new();
    RE.get_or_init(|| bytes::Regex::new(DECLARATION).expect("declaration pattern is valid"))
}

fn declaration_str() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DECLARATION).expect("declaration pattern is valid"))
}

/// Encoding named by the `<?xml ... encoding="..."?>` declaration, if any.
pub fn declared_encoding(doc: &[u8]) -> Option<String> {
    declaration_bytes()
        .captures(doc)
        .and_then(|caps| caps.get(2))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
}

pub fn is_utf8(label: &str) -> bool {
    label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8")
}

/// Built-in reader for ISO-8859-1 and its ASCII subset.
pub fn latin1(label: &str, doc: &[u8]) -> Result<String, ParserError> {
    match label.to_ascii_lowercase().as_str() {
        "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "latin-1" | "l1" | "us-ascii"
        | "ascii" => Ok(doc.iter().map(|&b| b as char).collect()),
        _ => Err(ParserError::Charset(label.to_string())),
    }
}

/// Rewrites a non-UTF-8 declaration so the parser reads the text as is.
pub fn normalize_declaration(text: &str) -> Cow<str> {
    match declaration_str().captures(text).and_then(|caps| caps.get(2)) {
        Some(label) if !is_utf8(label.as_str()) => declaration_str().replace(text, "${1}UTF-8${3}"),
        _ => Cow::Borrowed(text),
    }
}

/// Produces UTF-8 text for a raw document, going through `reader` when the
/// declaration names another charset.
pub fn to_utf8<'a>(
    doc: &'a [u8],
    reader: Option<&CharsetReader>,
) -> Result<Cow<'a, str>, ParserError> {
    match declared_encoding(doc) {
        Some(ref label) if !label.is_empty() && !is_utf8(label) => {
            let reader = match reader {
                Some(reader) => reader,
                None => return Err(ParserError::Charset(label.clone())),
            };
            debug!("transcoding {} document to UTF-8", label);
            let text = reader(label.as_str(), doc)?;
            Ok(Cow::Owned(normalize_declaration(&text).into_owned()))
        }
        _ => Ok(Cow::Borrowed(str::from_utf8(doc)?)),
    }
}
