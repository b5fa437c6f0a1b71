// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Reconciles wire member names with native field names.

use std::collections::HashMap;

/// Lookup table for one record type, built once from its field names.
///
/// A wire name resolves, in order, to
/// 1. the field carrying exactly that name,
/// 2. the field named by its capitalised form (`user_id` -> `UserId`),
/// 3. a field equal to either form ignoring case, as long as that field's
///    name starts with an upper-case letter.
#[derive(Debug, Clone)]
pub struct FieldTable {
    exact: HashMap<String, usize>,
    folded: HashMap<String, usize>,
}

impl FieldTable {
    pub fn new<I, S>(fields: I) -> FieldTable
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut exact = HashMap::new();
        let mut folded = HashMap::new();
        for (index, field) in fields.into_iter().enumerate() {
            let field = field.as_ref();
            exact.entry(field.to_string()).or_insert(index);
            if field.chars().next().map_or(false, char::is_uppercase) {
                folded.entry(field.to_lowercase()).or_insert(index);
            }
        }
        FieldTable { exact, folded }
    }

    /// Index of the field `wire` binds to, if any.
    pub fn resolve(&self, wire: &str) -> Option<usize> {
        self.exact
            .get(wire)
            .or_else(|| self.exact.get(&capitalize(wire)))
            .or_else(|| self.folded.get(&wire.to_lowercase()))
            .or_else(|| self.folded.get(&capitalize(wire).to_lowercase()))
            .copied()
    }
}

/// `user_id` -> `UserId`: drops underscores and upper-cases the letter
/// following each one, and the first.
pub fn capitalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!("UserId", capitalize("user_id"));
        assert_eq!("String1", capitalize("string1"));
        assert_eq!("StdoutLogfile", capitalize("stdout_logfile"));
        assert_eq!("Id", capitalize("__id"));
    }

    #[test]
    fn test_exact_first() {
        let table = FieldTable::new(["id", "Id"]);
        assert_eq!(Some(0), table.resolve("id"));
        assert_eq!(Some(1), table.resolve("Id"));
    }

    #[test]
    fn test_capitalized_fallback() {
        let table = FieldTable::new(["UserId", "StderrLogfile"]);
        assert_eq!(Some(0), table.resolve("user_id"));
        assert_eq!(Some(1), table.resolve("stderr_logfile"));
    }

    #[test]
    fn test_case_insensitive_only_for_upper_fields() {
        let table = FieldTable::new(["UserID", "secret"]);
        assert_eq!(Some(0), table.resolve("userid"));
        assert_eq!(Some(0), table.resolve("USERID"));
        assert_eq!(None, table.resolve("SECRET"));
        assert_eq!(Some(1), table.resolve("secret"));
    }

    #[test]
    fn test_snake_case_reaches_acronym_field() {
        let table = FieldTable::new(["UserID"]);
        assert_eq!(Some(0), table.resolve("user_id"));
        let table = FieldTable::new(["Userid"]);
        assert_eq!(Some(0), table.resolve("user_id"));
        let table = FieldTable::new(["user_ident"]);
        assert_eq!(None, table.resolve("USER_IDENT"));
    }

    #[test]
    fn test_unknown() {
        let table = FieldTable::new(["Name"]);
        assert_eq!(None, table.resolve("pid"));
    }
}
