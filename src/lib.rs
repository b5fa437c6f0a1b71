//! Bidirectional XML-RPC codec.
//!
//! Native records go out through `serde::Serialize` and come back through
//! `serde::Deserialize`:
//!
//! ```
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Args {
//!     name: String,
//!     count: i32,
//! }
//!
//! let args = Args { name: "web".into(), count: 2 };
//! let xml = xmlrpc_codec::encode_request("supervisor.startProcess", &args).unwrap();
//! let back: Args = xmlrpc_codec::decode(&xml).unwrap();
//! assert_eq!(args, back);
//! ```

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod xmlrpc;

pub use crate::config::Config;
pub use crate::error::{Error, ParserError, Result};
pub use crate::xmlrpc::{
    bytes, decode, decode_into, encode_fault, encode_request, encode_response, parse, Codec, DateTime, Document,
    Fault, Request, Response, Value,
};
