use std::fmt;
use std::str::Utf8Error;

use serde::{de, ser};
use thiserror::Error;

use crate::xmlrpc::fault::{self, Fault};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while turning raw text into a document tree.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("xml syntax: {0}")]
    Syntax(#[from] xml::reader::Error),
    #[error("unexpected document structure: {0}")]
    Structure(String),
    #[error("malformed {kind} value {text:?}")]
    Scalar { kind: &'static str, text: String },
    #[error("unsupported charset {0:?}")]
    Charset(String),
    #[error("document is not valid utf-8: {0}")]
    Utf8(#[from] Utf8Error),
}

#[derive(Debug, Error)]
pub enum Error {
    /// Input could not be parsed into an XML-RPC document.
    #[error("parsing error: not well formed: {0}")]
    Parse(#[from] ParserError),

    /// The native target has fewer top-level fields than decoded params.
    #[error("wrong arguments number: {params} params for {fields} fields")]
    WrongArgumentsNumber { params: usize, fields: usize },

    /// A native type refused a value through its own (de)serialization hook.
    #[error("application error: {0}")]
    Application(String),

    /// Decoded and native shapes disagree.
    #[error("invalid method parameters: {0}")]
    InvalidParams(String),

    /// Fault reported by the remote end.
    #[error(transparent)]
    Fault(#[from] Fault),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid dateTime.iso8601 payload: {0}")]
    DateTime(#[from] time::error::Parse),
}

impl Error {
    pub(crate) fn type_mismatch(decoded: impl fmt::Display, native: impl fmt::Display) -> Error {
        Error::InvalidParams(format!("fields type mismatch: {} != {}", decoded, native))
    }

    /// Fault to answer a call with when this error happened server-side.
    pub fn to_fault(&self) -> Fault {
        match *self {
            Error::Fault(ref f) => f.clone(),
            Error::Parse(_) | Error::Base64(_) | Error::DateTime(_) => {
                Fault::new(fault::PARSE_ERROR, self.to_string())
            }
            Error::WrongArgumentsNumber { .. } | Error::InvalidParams(_) => {
                Fault::new(fault::INVALID_PARAMS, self.to_string())
            }
            Error::Application(_) => Fault::new(fault::APPLICATION_ERROR, self.to_string()),
        }
    }
}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Application(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Application(msg.to_string())
    }

    fn invalid_type(unexp: de::Unexpected, exp: &dyn de::Expected) -> Self {
        Error::type_mismatch(unexp, exp)
    }

    fn invalid_value(unexp: de::Unexpected, exp: &dyn de::Expected) -> Self {
        Error::InvalidParams(format!("invalid value: {}, expected {}", unexp, exp))
    }

    fn invalid_length(len: usize, exp: &dyn de::Expected) -> Self {
        Error::InvalidParams(format!("invalid length {}, expected {}", len, exp))
    }

    fn missing_field(field: &'static str) -> Self {
        Error::InvalidParams(format!("missing field `{}`", field))
    }
}
