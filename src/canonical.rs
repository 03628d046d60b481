//! Canonical JSON encoding of transaction parts.
//!
//! Output is uniquely determined by the logical content of the value:
//!
//! * object keys are sorted by their UTF-8 bytes, at every nesting level;
//! * no whitespace is emitted;
//! * numbers must be integers (chain quantities are carried as decimal
//!   strings anyway, floating point values are rejected).
//!
//! This encoding stands in for the binary protobuf encoding of
//! `TxBody`/`AuthInfo`/`SignDoc`: signer and verifier agree on it, but a
//! live node decoding protobuf will not.

use serde::Serialize;
use serde_json::Value;

/// Encode any serializable value canonically.
pub fn to_canonical_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    let value = serde_json::to_value(value).map_err(|e| CanonicalError::Serialize(e.to_string()))?;
    let mut out = Vec::new();
    write_value(&value, &mut out)?;
    Ok(out)
}

/// Encode an already built JSON value canonically.
pub fn value_to_canonical_vec(value: &Value) -> Result<Vec<u8>, CanonicalError> {
    let mut out = Vec::new();
    write_value(value, &mut out)?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut Vec<u8>) -> Result<(), CanonicalError> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_scalar(&Value::String(key.clone()), out)?;
                out.push(b':');
                write_value(item, out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out)?;
            }
            out.push(b']');
        }
        Value::Number(n) if !(n.is_i64() || n.is_u64()) => {
            return Err(CanonicalError::FloatingPoint(n.to_string()));
        }
        scalar => write_scalar(scalar, out)?,
    }
    Ok(())
}

fn write_scalar(value: &Value, out: &mut Vec<u8>) -> Result<(), CanonicalError> {
    serde_json::to_writer(out, value).map_err(|e| CanonicalError::Serialize(e.to_string()))
}

/// Canonical encoding errors.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum CanonicalError {
    /// Value cannot be represented as JSON.
    #[error("Failed to serialize: {0}")]
    Serialize(String),
    /// Floating point numbers have no stable encoding.
    #[error("Floating point number {0} cannot be encoded canonically")]
    FloatingPoint(String),
}
