//! Field-name translation between the external (camelCase) and storage
//! (snake_case) conventions.
//!
//! # Responsibility
//! - Map one field name in either direction.
//! - Map every key of a record, leaving values and nesting untouched.
//!
//! # Invariants
//! - `to_external(&to_storage(name)) == name` for every external name that
//!   does not itself contain `_`.
//! - Only ASCII letters are re-cased; every other character passes through.

use crate::store::Record;

const SEPARATOR: char = '_';

/// Converts an external field name to its storage column name.
///
/// `firstName` becomes `first_name`; names without uppercase letters are
/// returned unchanged.
pub fn to_storage(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push(SEPARATOR);
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Converts a storage column name back to its external field name.
///
/// Each separator followed by a lowercase letter collapses into the
/// uppercase letter; a separator followed by anything else is kept.
pub fn to_external(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        if c == SEPARATOR {
            if let Some(next) = chars.peek().copied().filter(char::is_ascii_lowercase) {
                chars.next();
                out.push(next.to_ascii_uppercase());
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Returns whether `name` survives a storage round-trip unchanged.
pub fn round_trips(name: &str) -> bool {
    to_external(&to_storage(name)) == name
}

/// Rewrites every key of an external record into storage naming.
pub fn record_to_storage(record: &Record) -> Record {
    record
        .iter()
        .map(|(key, value)| (to_storage(key), value.clone()))
        .collect()
}

/// Rewrites every key of a storage row into external naming.
pub fn record_to_external(row: Record) -> Record {
    row.into_iter()
        .map(|(key, value)| (to_external(&key), value))
        .collect()
}

/// Applies [`record_to_external`] to each row.
pub fn records_to_external(rows: Vec<Record>) -> Vec<Record> {
    rows.into_iter().map(record_to_external).collect()
}
