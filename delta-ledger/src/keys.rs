//! Composite key encoding
//!
//! A composite key is an ordered, NUL-delimited concatenation of identity
//! fields used both as a store key and as a natural range-scan prefix:
//!
//! ```text
//! 0x00 | object_type | 0x00 | attr_1 | 0x00 | ... | attr_n | 0x00
//! ```
//!
//! The leading marker byte segregates composite keys from plain keys (such
//! as prune-backup records), and the per-field terminator guarantees that an
//! encoding of N fields is a byte prefix of every full key that extends it,
//! so all records sharing a field prefix sort contiguously.

use crate::error::{Error, Result};

/// Marker byte prepended to every composite key.
pub const COMPOSITE_MARKER: u8 = 0x00;

const FIELD_TERMINATOR: u8 = 0x00;

/// Encode an object type plus ordered attributes into a composite key.
///
/// Fields must be NUL-free; the object type must be non-empty. Distinct
/// tuples always produce distinct keys.
pub fn encode_composite(object_type: &str, attributes: &[&str]) -> Result<Vec<u8>> {
    if object_type.is_empty() {
        return Err(Error::Key("object type must not be empty".to_string()));
    }
    validate_field("object type", object_type)?;

    let capacity = 2 + object_type.len() + attributes.iter().map(|a| a.len() + 1).sum::<usize>();
    let mut key = Vec::with_capacity(capacity);
    key.push(COMPOSITE_MARKER);
    key.extend_from_slice(object_type.as_bytes());
    key.push(FIELD_TERMINATOR);

    for attr in attributes {
        validate_field("attribute", attr)?;
        key.extend_from_slice(attr.as_bytes());
        key.push(FIELD_TERMINATOR);
    }

    Ok(key)
}

/// Decode a composite key back into its object type and attributes.
///
/// Exact inverse of [`encode_composite`].
pub fn decode_composite(key: &[u8]) -> Result<(String, Vec<String>)> {
    if key.first() != Some(&COMPOSITE_MARKER) {
        return Err(Error::Key("missing composite key marker".to_string()));
    }
    let body = &key[1..];
    if body.last() != Some(&FIELD_TERMINATOR) {
        return Err(Error::Key("truncated composite key".to_string()));
    }

    let mut fields = Vec::new();
    for raw in body[..body.len() - 1].split(|b| *b == FIELD_TERMINATOR) {
        let field = std::str::from_utf8(raw)
            .map_err(|e| Error::Key(format!("non-UTF-8 field in composite key: {e}")))?;
        fields.push(field.to_string());
    }

    let object_type = fields.remove(0);
    if object_type.is_empty() {
        return Err(Error::Key("empty object type in composite key".to_string()));
    }

    Ok((object_type, fields))
}

fn validate_field(what: &str, field: &str) -> Result<()> {
    if field.bytes().any(|b| b == FIELD_TERMINATOR) {
        return Err(Error::Key(format!("{what} contains a NUL byte: {field:?}")));
    }
    Ok(())
}
