//! Typed property values and the casting rules applied when a static operand
//! is compared against a column of a different type.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Declared type of a column, property or literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    String,
    Binary,
    Long,
    Double,
    Decimal,
    Date,
    Boolean,
    Name,
    Path,
    Reference,
    WeakReference,
    Uri,
}

impl PropertyType {
    /// Every property type, in declaration order.
    pub const ALL: [PropertyType; 12] = [
        Self::String,
        Self::Binary,
        Self::Long,
        Self::Double,
        Self::Decimal,
        Self::Date,
        Self::Boolean,
        Self::Name,
        Self::Path,
        Self::Reference,
        Self::WeakReference,
        Self::Uri,
    ];

    /// Returns the canonical upper-case type name used in statements.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Binary => "BINARY",
            Self::Long => "LONG",
            Self::Double => "DOUBLE",
            Self::Decimal => "DECIMAL",
            Self::Date => "DATE",
            Self::Boolean => "BOOLEAN",
            Self::Name => "NAME",
            Self::Path => "PATH",
            Self::Reference => "REFERENCE",
            Self::WeakReference => "WEAKREFERENCE",
            Self::Uri => "URI",
        }
    }

    /// Types whose values are stored and compared as text.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Name | Self::Path | Self::Reference | Self::WeakReference | Self::Uri
        )
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Long | Self::Double | Self::Decimal)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::invalid_query(format!("unknown property type '{s}'")))
    }
}

/// A single typed scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Value {
    String(String),
    Binary(Bytes),
    Long(i64),
    Double(f64),
    Decimal(Decimal),
    Date(DateTime<Utc>),
    Boolean(bool),
    Name(String),
    Path(String),
    Reference(String),
    #[serde(rename = "WEAKREFERENCE")]
    WeakReference(String),
    Uri(String),
}

impl Value {
    /// Returns the natural type of this value.
    #[must_use]
    pub const fn property_type(&self) -> PropertyType {
        match self {
            Self::String(_) => PropertyType::String,
            Self::Binary(_) => PropertyType::Binary,
            Self::Long(_) => PropertyType::Long,
            Self::Double(_) => PropertyType::Double,
            Self::Decimal(_) => PropertyType::Decimal,
            Self::Date(_) => PropertyType::Date,
            Self::Boolean(_) => PropertyType::Boolean,
            Self::Name(_) => PropertyType::Name,
            Self::Path(_) => PropertyType::Path,
            Self::Reference(_) => PropertyType::Reference,
            Self::WeakReference(_) => PropertyType::WeakReference,
            Self::Uri(_) => PropertyType::Uri,
        }
    }

    /// Returns the text of a text-typed value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(s)
            | Self::Name(s)
            | Self::Path(s)
            | Self::Reference(s)
            | Self::WeakReference(s)
            | Self::Uri(s) => Some(s),
            _ => None,
        }
    }

    /// Length used by `LENGTH(...)`: characters for text, bytes for binary,
    /// and the length of the canonical string form otherwise.
    #[must_use]
    pub fn length(&self) -> i64 {
        let len = match self {
            Self::Binary(bytes) => bytes.len(),
            other => match other.as_text() {
                Some(text) => text.chars().count(),
                None => other.to_string().chars().count(),
            },
        };
        i64::try_from(len).unwrap_or(i64::MAX)
    }

    /// Converts this value to `target`, following the casting rules between
    /// text, numeric, date and boolean types.
    pub fn cast(&self, target: PropertyType) -> Result<Value> {
        if self.property_type() == target {
            return Ok(self.clone());
        }

        let cast = match (self, target) {
            (_, PropertyType::String) => match self {
                Self::Binary(bytes) => std::str::from_utf8(bytes)
                    .ok()
                    .map(|s| Self::String(s.to_string())),
                other => Some(Self::String(other.to_string())),
            },
            (value, ty) if ty.is_text() => value.as_text().map(|s| text_value(ty, s)),
            (Self::Binary(_), _) | (_, PropertyType::Binary) => None,
            (value, PropertyType::Long) => match value {
                // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive
                Self::Double(d)
                    if d.fract() == 0.0 && *d >= i64::MIN as f64 && *d < i64::MAX as f64 =>
                {
                    Some(Self::Long(*d as i64))
                }
                Self::Decimal(d) if d.fract().is_zero() => d.to_i64().map(Self::Long),
                Self::Date(date) => Some(Self::Long(date.timestamp_millis())),
                other => other
                    .as_text()
                    .and_then(|s| s.trim().parse::<i64>().ok())
                    .map(Self::Long),
            },
            (value, PropertyType::Double) => match value {
                Self::Long(l) => Some(Self::Double(*l as f64)),
                Self::Decimal(d) => d.to_f64().map(Self::Double),
                other => other
                    .as_text()
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .map(Self::Double),
            },
            (value, PropertyType::Decimal) => match value {
                Self::Long(l) => Some(Self::Decimal(Decimal::from(*l))),
                Self::Double(d) => Decimal::try_from(*d).ok().map(Self::Decimal),
                other => other
                    .as_text()
                    .and_then(|s| Decimal::from_str_exact(s.trim()).ok())
                    .map(Self::Decimal),
            },
            (value, PropertyType::Date) => match value {
                Self::Long(millis) => Utc.timestamp_millis_opt(*millis).single().map(Self::Date),
                other => other
                    .as_text()
                    .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
                    .map(|date| Self::Date(date.with_timezone(&Utc))),
            },
            (value, PropertyType::Boolean) => value.as_text().and_then(|s| {
                if s.eq_ignore_ascii_case("true") {
                    Some(Self::Boolean(true))
                } else if s.eq_ignore_ascii_case("false") {
                    Some(Self::Boolean(false))
                } else {
                    None
                }
            }),
            _ => None,
        };

        cast.ok_or_else(|| {
            Error::invalid_query(format!(
                "cannot convert {} value '{}' to {}",
                self.property_type(),
                self,
                target
            ))
        })
    }
}

fn text_value(ty: PropertyType, text: &str) -> Value {
    let text = text.to_string();
    match ty {
        PropertyType::Name => Value::Name(text),
        PropertyType::Path => Value::Path(text),
        PropertyType::Reference => Value::Reference(text),
        PropertyType::WeakReference => Value::WeakReference(text),
        PropertyType::Uri => Value::Uri(text),
        _ => Value::String(text),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Self::Long(l) => write!(f, "{l}"),
            Self::Double(d) if d.is_nan() => f.write_str("NaN"),
            Self::Double(d) if d.is_infinite() => {
                f.write_str(if d.is_sign_positive() { "Infinity" } else { "-Infinity" })
            }
            Self::Double(d) => write!(f, "{d:?}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Date(date) => f.write_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::String(s)
            | Self::Name(s)
            | Self::Path(s)
            | Self::Reference(s)
            | Self::WeakReference(s)
            | Self::Uri(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}
