//! Text sanitation for serialized output
//!
//! Strings leaving the pipeline are trimmed. Raw bytes coming from outside
//! are validated as UTF-8 once, at the boundary, and replaced with
//! [`INVALID_TEXT_MARKER`] when malformed.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use tracing::warn;

/// Placeholder written in place of malformed text
pub const INVALID_TEXT_MARKER: &str = "[invalid UTF-8]";

/// Trim leading and trailing whitespace
pub fn clean(s: &str) -> &str {
    s.trim()
}

/// Decode raw bytes as trimmed UTF-8, falling back to the placeholder marker
pub fn clean_bytes(bytes: &[u8], field: &str) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => clean(s).to_string(),
        Err(e) => {
            warn!(field, error = %e, "Malformed UTF-8 replaced with placeholder");
            INVALID_TEXT_MARKER.to_string()
        }
    }
}

pub fn serialize_clean<S>(value: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(clean(value))
}

pub fn serialize_clean_vec<S>(values: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for value in values {
        seq.serialize_element(clean(value))?;
    }
    seq.end()
}

/// Serialize a map with trimmed keys
pub fn serialize_clean_keys<S, V>(
    map: &BTreeMap<String, V>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    let mut out = serializer.serialize_map(Some(map.len()))?;
    for (key, value) in map {
        out.serialize_entry(clean(key), value)?;
    }
    out.end()
}
