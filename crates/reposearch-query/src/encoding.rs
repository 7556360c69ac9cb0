//! Fixed-width encodings that keep numeric order under lexicographic string
//! comparison, plus the term encoding of every value type.

use reposearch_core::Value;
use rust_decimal::prelude::ToPrimitive;

const SIGN_BIT: u64 = 1 << 63;

/// Encodes `value` as 16 lowercase hex digits with the sign bit flipped, so
/// that `a < b` implies `encode_long(a) < encode_long(b)`.
#[must_use]
pub fn encode_long(value: i64) -> String {
    format!("{:016x}", (value as u64) ^ SIGN_BIT)
}

/// Inverse of [`encode_long`]; `None` for anything it did not produce.
#[must_use]
pub fn decode_long(encoded: &str) -> Option<i64> {
    if encoded.len() != 16 {
        return None;
    }
    u64::from_str_radix(encoded, 16)
        .ok()
        .map(|bits| (bits ^ SIGN_BIT) as i64)
}

/// Encodes `value` as 16 lowercase hex digits ordered like the number.
///
/// Positive values get the sign bit set; negative values have every bit
/// inverted so larger magnitudes sort first. `-0.0` encodes like `0.0`.
#[must_use]
pub fn encode_double(value: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    let bits = value.to_bits();
    let sortable = if bits & SIGN_BIT == 0 {
        bits | SIGN_BIT
    } else {
        !bits
    };
    format!("{sortable:016x}")
}

#[must_use]
pub fn decode_double(encoded: &str) -> Option<f64> {
    if encoded.len() != 16 {
        return None;
    }
    let sortable = u64::from_str_radix(encoded, 16).ok()?;
    let bits = if sortable & SIGN_BIT == 0 {
        !sortable
    } else {
        sortable ^ SIGN_BIT
    };
    Some(f64::from_bits(bits))
}

/// Encodes a value as the term stored in (and looked up from) the index.
///
/// Numbers and dates use the sortable encodings so that range predicates work
/// on the encoded strings; everything else is stored as text.
#[must_use]
pub fn encode_value(value: &Value) -> String {
    match value {
        Value::Long(l) => encode_long(*l),
        Value::Double(d) => encode_double(*d),
        Value::Decimal(d) => encode_double(d.to_f64().unwrap_or(0.0)),
        Value::Date(date) => encode_long(date.timestamp_millis()),
        Value::Boolean(b) => b.to_string(),
        Value::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Value::String(s)
        | Value::Name(s)
        | Value::Path(s)
        | Value::Reference(s)
        | Value::WeakReference(s)
        | Value::Uri(s) => s.clone(),
    }
}
