// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::error::Result;

use super::de;
use super::encoding::{self, XML_DECLARATION};
use super::fault::Fault;
use super::parser::{self, Document};
use super::ser::to_params;
use super::value::Value;

/// Builder for a `<methodCall>` carrying heterogeneous arguments.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub body: String,
    params: Vec<Value>,
    declaration: bool,
}

/// Raw body of a `<methodResponse>`, decoded on demand.
#[derive(Debug, Clone)]
pub struct Response {
    pub body: String,
}

fn prologue(config: &Config) -> String {
    if config.xml_declaration {
        String::from(XML_DECLARATION)
    } else {
        String::new()
    }
}

impl Request {
    /// Same output as `Codec::default()`.
    pub fn new(method: &str) -> Request {
        Request::with_config(method, &Config::default())
    }

    pub fn with_config(method: &str, config: &Config) -> Request {
        Request {
            method: method.to_string(),
            body: String::new(),
            params: Vec::new(),
            declaration: config.xml_declaration,
        }
    }

    /// Appends an argument. A record argument flattens into one param per
    /// field, a tuple into one param per element.
    pub fn argument<T: Serialize + ?Sized>(mut self, object: &T) -> Result<Request> {
        self.params.extend(to_params(object)?);
        Ok(self)
    }

    pub fn value(mut self, value: Value) -> Request {
        self.params.push(value);
        self
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn finalize(mut self) -> Request {
        let mut body = if self.declaration { String::from(XML_DECLARATION) } else { String::new() };
        encoding::write_request(&mut body, &self.method, &self.params);
        trace!("request body: {}", body);
        self.body = body;
        self
    }
}

impl Response {
    pub fn new(body: &str) -> Response {
        Response {
            body: body.to_string(),
        }
    }

    /// Successful response carrying `object` (flattened like a request argument).
    pub fn success<T: Serialize + ?Sized>(object: &T) -> Result<Response> {
        Response::success_with(&Config::default(), object)
    }

    pub fn success_with<T: Serialize + ?Sized>(config: &Config, object: &T) -> Result<Response> {
        let mut body = prologue(config);
        encoding::write_response(&mut body, &to_params(object)?);
        Ok(Response { body })
    }

    pub fn failure(fault: &Fault) -> Response {
        Response::failure_with(&Config::default(), fault)
    }

    pub fn failure_with(config: &Config, fault: &Fault) -> Response {
        let mut body = prologue(config);
        encoding::write_fault(&mut body, fault);
        Response { body }
    }

    pub fn document(&self) -> Result<Document> {
        trace!("response body: {}", self.body);
        parser::parse(&self.body)
    }

    pub fn result<T: DeserializeOwned>(&self) -> Result<T> {
        de::from_document(&self.document()?)
    }

    pub fn bind<T: Serialize + DeserializeOwned>(&self, target: &mut T) -> Result<()> {
        de::bind_document(&self.document()?, target)
    }
}
