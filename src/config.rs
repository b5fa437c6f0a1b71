use std::fmt;
use std::sync::Arc;

use crate::error::ParserError;
use crate::xmlrpc::charset::CharsetReader;

#[derive(Clone, Default)]
pub struct Config {
    /// Transcoder for documents declaring a charset other than UTF-8.
    pub charset_reader: Option<CharsetReader>,
    /// Prefix encoded documents with `<?xml version="1.0"?>`.
    pub xml_declaration: bool,
}

impl Config {
    pub fn with_charset_reader<F>(mut self, reader: F) -> Config
    where
        F: Fn(&str, &[u8]) -> Result<String, ParserError> + Send + Sync + 'static,
    {
        self.charset_reader = Some(Arc::new(reader));
        self
    }

    pub fn with_xml_declaration(mut self, on: bool) -> Config {
        self.xml_declaration = on;
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("charset_reader", &self.charset_reader.is_some())
            .field("xml_declaration", &self.xml_declaration)
            .finish()
    }
}
