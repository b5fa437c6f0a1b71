// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

#![deny(non_camel_case_types)]
#![allow(missing_docs)]

//! XML-RPC type mapping: native values to markup and back.
//!
//! # What is XML-RPC?
//!
//! Basic documentation found on Wikipedia
//! http://en.wikipedia.org/wiki/XML-RPC
//!
//! Full specification of the XML-RPC protocol is found here:
//! http://xmlrpc.scripting.com/spec.html
//!
//! Additional errata and hints can be found here:
//! http://effbot.org/zone/xmlrpc-errata.htm
//!
//! Encoding goes through `ser` (native value to `Value`) and `encoding`
//! (`Value` to markup). Decoding goes through `parser` (markup to
//! `Document`) and `de` (`Document` to native value).

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::error::Result;

pub mod bytes;
pub mod charset;
pub mod de;
pub mod encoding;
pub mod fault;
pub mod names;
pub mod parser;
pub mod protocol;
pub mod ser;
pub mod value;

pub use self::fault::Fault;
pub use self::parser::{parse, Document, DocumentKind};
pub use self::protocol::{Request, Response};
pub use self::value::{DateTime, Value};

/// Encoder/decoder pair carrying a `Config`.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    config: Config,
}

impl Codec {
    pub fn new(config: Config) -> Codec {
        Codec { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A `Request` builder writing with this codec's settings.
    pub fn request(&self, method: &str) -> Request {
        Request::with_config(method, &self.config)
    }

    /// `<methodCall>` with `params` as its arguments. A record contributes
    /// one `<param>` per field, a tuple one per element; anything else is a
    /// single `<param>`.
    pub fn encode_request<T: Serialize + ?Sized>(&self, method: &str, params: &T) -> Result<String> {
        Ok(self.request(method).argument(params)?.finalize().body)
    }

    pub fn encode_response<T: Serialize + ?Sized>(&self, params: &T) -> Result<String> {
        Ok(Response::success_with(&self.config, params)?.body)
    }

    pub fn encode_fault(&self, fault: &Fault) -> String {
        Response::failure_with(&self.config, fault).body
    }

    /// Parses raw bytes, transcoding through the configured charset reader
    /// when the document declares a non-UTF-8 encoding.
    pub fn parse(&self, input: &[u8]) -> Result<Document> {
        parser::parse_bytes(input, self.config.charset_reader.as_ref())
    }

    pub fn decode<T: DeserializeOwned>(&self, input: &[u8]) -> Result<T> {
        de::from_document(&self.parse(input)?)
    }

    pub fn decode_into<T: Serialize + DeserializeOwned>(&self, input: &[u8], target: &mut T) -> Result<()> {
        de::bind_document(&self.parse(input)?, target)
    }
}

pub fn encode_request<T: Serialize + ?Sized>(method: &str, params: &T) -> Result<String> {
    Codec::default().encode_request(method, params)
}

pub fn encode_response<T: Serialize + ?Sized>(params: &T) -> Result<String> {
    Codec::default().encode_response(params)
}

pub fn encode_fault(fault: &Fault) -> String {
    Codec::default().encode_fault(fault)
}

/// Decodes a method call or response into a fresh `T`.
///
/// A `<fault>` response comes back as `Err(Error::Fault(..))`.
pub fn decode<T: DeserializeOwned>(input: &str) -> Result<T> {
    de::from_document(&parse(input)?)
}

/// Decodes onto an existing record, leaving fields the document does not
/// reach untouched.
pub fn decode_into<T: Serialize + DeserializeOwned>(input: &str, target: &mut T) -> Result<()> {
    de::bind_document(&parse(input)?, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::xmlrpc::charset;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Record {
        #[serde(rename = "Int")]
        int: i32,
        #[serde(rename = "Float")]
        float: f64,
        #[serde(rename = "Str")]
        text: &'static str,
        #[serde(rename = "Bool")]
        flag: bool,
    }

    #[test]
    fn test_encode_request_flattens_record() {
        let record = Record { int: 123, float: 3.145926, text: "Hello, World!", flag: false };
        let xml = encode_request("Some.Method", &record).unwrap();
        assert_eq!(
            "<methodCall><methodName>Some.Method</methodName><params>\
             <param><value><int>123</int></value></param>\
             <param><value><double>3.145926</double></value></param>\
             <param><value><string>Hello, World!</string></value></param>\
             <param><value><boolean>0</boolean></value></param>\
             </params></methodCall>",
            xml
        );
    }

    #[test]
    fn test_declaration_toggle() {
        let codec = Codec::new(Config::default().with_xml_declaration(true));
        let xml = codec.encode_response(&42).unwrap();
        assert_eq!(
            "<?xml version=\"1.0\"?><methodResponse><params><param><value><int>42</int></value></param></params></methodResponse>",
            xml
        );
        assert!(encode_fault(&Fault::new(1, "x")).starts_with("<methodResponse><fault>"));

        let built = codec.request("m").argument(&42).unwrap().finalize();
        assert_eq!(codec.encode_request("m", &42).unwrap(), built.body);
        assert_eq!(encode_request("m", &42).unwrap(), Request::new("m").argument(&42).unwrap().finalize().body);
    }

    #[test]
    fn test_map_field_is_skipped_on_the_wire() {
        #[derive(Serialize)]
        struct Launch {
            name: &'static str,
            env: HashMap<String, String>,
        }
        let mut env = HashMap::new();
        env.insert("PATH".to_string(), "/bin".to_string());
        let xml = encode_request("supervisor.start", &Launch { name: "web", env }).unwrap();
        assert_eq!(
            "<methodCall><methodName>supervisor.start</methodName><params>\
             <param><value><string>web</string></value></param>\
             <param><value></value></param>\
             </params></methodCall>",
            xml
        );
    }

    #[test]
    fn test_nil_gives_zero_value() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Counters {
            a: i32,
            label: String,
            ratio: f64,
        }
        let xml = "<methodResponse><params>\
                   <param><value><nil/></value></param>\
                   <param><value><string>x</string></value></param>\
                   <param><value><nil/></value></param>\
                   </params></methodResponse>";
        assert_eq!(Counters { a: 0, label: "x".into(), ratio: 0.0 }, decode::<Counters>(xml).unwrap());

        let member = "<methodResponse><params><param><value><struct>\
                      <member><name>a</name><value><nil/></value></member>\
                      <member><name>label</name><value><nil/></value></member>\
                      <member><name>ratio</name><value><double>1.5</double></value></member>\
                      </struct></value></param></params></methodResponse>";
        #[derive(Deserialize, Debug)]
        struct Wrapped {
            counters: Counters,
        }
        assert_eq!(
            Counters { a: 0, label: String::new(), ratio: 1.5 },
            decode::<Wrapped>(member).unwrap().counters
        );
    }

    #[test]
    fn test_refusal_from_own_deserialize_is_application_error() {
        #[derive(Deserialize, Debug)]
        #[serde(try_from = "i32")]
        struct Port(u16);

        impl TryFrom<i32> for Port {
            type Error = String;

            fn try_from(n: i32) -> std::result::Result<Port, String> {
                u16::try_from(n).map(Port).map_err(|_| format!("port {} out of range", n))
            }
        }

        #[derive(Deserialize, Debug)]
        struct Listen {
            port: Port,
        }

        let xml = encode_response(&70000).unwrap();
        match decode::<Listen>(&xml) {
            Err(err @ Error::Application(_)) => {
                assert_eq!("application error: port 70000 out of range", err.to_string());
                assert_eq!(fault::APPLICATION_ERROR, err.to_fault().code);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(8080, decode::<Listen>(&encode_response(&8080).unwrap()).unwrap().port.0);
    }

    #[derive(Deserialize, Serialize, Debug, Default)]
    struct Outcome {
        status: Option<String>,
    }

    #[test]
    fn test_latin1_fault() {
        let mut doc = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\
            <methodResponse><fault><value><struct>\
            <member><name>faultCode</name><value><int>10</int></value></member>\
            <member><name>faultString</name><value>D"
            .to_vec();
        doc.push(0xe9);
        doc.extend_from_slice(b"j\xe0 vu</value></member></struct></value></fault></methodResponse>");

        assert!(matches!(Codec::default().decode::<Outcome>(&doc), Err(Error::Parse(_))));

        let codec = Codec::new(Config::default().with_charset_reader(charset::latin1));
        match codec.decode::<Outcome>(&doc) {
            Err(Error::Fault(fault)) => assert_eq!(Fault::new(10, "D\u{e9}j\u{e0} vu"), fault),
            other => panic!("unexpected {:?}", other),
        }

        let mut outcome = Outcome { status: Some("untouched".into()) };
        assert!(codec.decode_into(&doc, &mut outcome).is_err());
        assert_eq!(Some("untouched".to_string()), outcome.status);
    }

    #[test]
    fn test_decode_into() {
        let mut outcome = Outcome::default();
        decode_into(&encode_response("done").unwrap(), &mut outcome).unwrap();
        assert_eq!(Some("done".to_string()), outcome.status);
    }

    #[test]
    fn test_decode_method_call() {
        let xml = encode_request("system.listMethods", &()).unwrap();
        let doc = parse(&xml).unwrap();
        assert_eq!(DocumentKind::Call, doc.kind);
        assert_eq!(Some("system.listMethods"), doc.method_name.as_deref());
        assert_eq!(vec![Value::Nil], doc.params);
    }
}
