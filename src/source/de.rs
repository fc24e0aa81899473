//! Lenient field decoders for loosely typed database exports.
//!
//! SQLite dumps freely mix `42`, `"42"` and `null` for the same column, so
//! ids and text fields go through these helpers instead of plain serde types.

use serde::de::Error;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

fn scalar_to_int(value: Scalar) -> std::result::Result<Option<i64>, String> {
    match value {
        Scalar::Int(n) => Ok(Some(n)),
        Scalar::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(Some(f as i64)),
        Scalar::Float(f) => Err(format!("expected an integer, found {f}")),
        Scalar::Bool(b) => Err(format!("expected an integer, found {b}")),
        Scalar::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse()
                .map(Some)
                .map_err(|_| format!("expected an integer, found {s:?}"))
        }
    }
}

/// An integer given either as a JSON number or a decimal string.
pub fn int<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<i64, D::Error> {
    match scalar_to_int(Scalar::deserialize(d)?) {
        Ok(Some(n)) => Ok(n),
        Ok(None) => Err(D::Error::custom("expected an integer, found an empty string")),
        Err(reason) => Err(D::Error::custom(reason)),
    }
}

/// Like [`int`], but `null` and `""` mean "absent".
pub fn opt_int<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<i64>, D::Error> {
    match Option::<Scalar>::deserialize(d)? {
        None => Ok(None),
        Some(value) => scalar_to_int(value).map_err(D::Error::custom),
    }
}

/// Text column; `null` becomes `""` and scalars are stringified.
pub fn text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(match Option::<Scalar>::deserialize(d)? {
        None => String::new(),
        Some(Scalar::Text(s)) => s,
        Some(Scalar::Int(n)) => n.to_string(),
        Some(Scalar::Float(f)) => f.to_string(),
        Some(Scalar::Bool(b)) => b.to_string(),
    })
}

/// Optional text column; `null` and `""` mean "absent".
pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    let s = text(d)?;
    Ok(if s.is_empty() { None } else { Some(s) })
}
