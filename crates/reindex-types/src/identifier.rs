//! Composite record identifiers.
//!
//! A record that lives on a routed shard can only be deleted if the routing
//! key travels with its id. Both are packed into one delimited string:
//!
//! - `{id}` when the record has no routing key
//! - `{id}|{routing}` otherwise, with every `|` inside the routing doubled
//!
//! Ids are written verbatim and must not contain `|`; the first `|` in an
//! encoded string is always the field separator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Field separator between id and routing.
pub const SEPARATOR: char = '|';

/// A record id plus the optional routing key of its shard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordIdentifier {
    /// Record id as stored in the search index
    pub id: String,
    /// Shard routing key, if the index uses custom routing
    pub routing: Option<String>,
}

impl RecordIdentifier {
    /// Identifier without routing.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            routing: None,
        }
    }

    /// Identifier with a routing key.
    pub fn with_routing(id: impl Into<String>, routing: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            routing: Some(routing.into()),
        }
    }

    /// Canonical encoded form.
    pub fn encode(&self) -> String {
        encode(&self.id, self.routing.as_deref())
    }

    /// Parse the canonical encoded form.
    pub fn decode(encoded: &str) -> Self {
        decode(encoded)
    }
}

impl fmt::Display for RecordIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Encode an id and optional routing key into one string.
pub fn encode(id: &str, routing: Option<&str>) -> String {
    match routing {
        None => id.to_string(),
        Some(routing) => {
            let mut out = String::with_capacity(id.len() + routing.len() + 1);
            out.push_str(id);
            out.push(SEPARATOR);
            for ch in routing.chars() {
                if ch == SEPARATOR {
                    out.push(SEPARATOR);
                }
                out.push(ch);
            }
            out
        }
    }
}

/// Decode a string produced by [`encode`].
///
/// `||` pairs in the routing collapse to a single `|`. A lone `|` left over
/// at the end of the routing is kept as a literal.
pub fn decode(encoded: &str) -> RecordIdentifier {
    let Some((id, escaped)) = encoded.split_once(SEPARATOR) else {
        return RecordIdentifier::new(encoded);
    };

    let mut routing = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == SEPARATOR && chars.peek() == Some(&SEPARATOR) {
            chars.next();
        }
        routing.push(ch);
    }

    RecordIdentifier::with_routing(id, routing)
}
