//! Per-operator compilation of comparisons into predicates.
//!
//! Each comparison operator has its own compiler. A compiler is built from
//! the already resolved static value and knows how to turn every kind of
//! dynamic operand into a [`Predicate`]. Operand kinds an operator cannot
//! handle fall through to the default methods, which fail with an
//! `InvalidQuery` error naming the operator and the operand.

mod equal_to;
mod like;
mod not_equal_to;
mod range;

use reposearch_core::qom::Operator;
use reposearch_core::{Error, PropertyType, Result, Value};

use crate::encoding::{encode_long, encode_value};
use crate::predicate::Predicate;

pub use equal_to::EqualTo;
pub use like::Like;
pub use not_equal_to::NotEqualTo;
pub use range::RangeComparison;

/// Compiles one comparison operator against each kind of dynamic operand.
pub trait OperandCompiler: Send + Sync {
    fn operator(&self) -> Operator;

    /// `field` holds the property's values; `column_type` is the declared type
    /// of the column when the schema knows it.
    fn property_value(&self, _field: &str, _column_type: Option<PropertyType>) -> Result<Predicate> {
        Err(self.unsupported("a property value"))
    }

    /// `field` holds the encoded lengths of the property's values.
    fn length(&self, _field: &str) -> Result<Predicate> {
        Err(self.unsupported("LENGTH"))
    }

    fn node_name(&self) -> Result<Predicate> {
        Err(self.unsupported("NAME"))
    }

    fn node_local_name(&self) -> Result<Predicate> {
        Err(self.unsupported("LOCALNAME"))
    }

    fn node_depth(&self) -> Result<Predicate> {
        Err(self.unsupported("DEPTH"))
    }

    fn unsupported(&self, operand: &str) -> Error {
        Error::invalid_query(format!(
            "operator {} is not supported for {operand}",
            self.operator().name()
        ))
    }
}

/// Returns the compiler for `operator` comparing against `value`.
#[must_use]
pub fn compiler_for(
    operator: Operator,
    value: Value,
    case_sensitive: bool,
) -> Box<dyn OperandCompiler> {
    let operand = StaticValue::new(value, case_sensitive);
    match operator {
        Operator::EqualTo => Box::new(EqualTo::new(operand)),
        Operator::NotEqualTo => Box::new(NotEqualTo::new(operand)),
        Operator::Like => Box::new(Like::new(operand)),
        Operator::LessThan
        | Operator::LessThanOrEqualTo
        | Operator::GreaterThan
        | Operator::GreaterThanOrEqualTo => Box::new(RangeComparison::new(operator, operand)),
    }
}

/// The right-hand side of a comparison, with the case mode it is compared in.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticValue {
    pub value: Value,
    pub case_sensitive: bool,
}

impl StaticValue {
    #[must_use]
    pub const fn new(value: Value, case_sensitive: bool) -> Self {
        Self {
            value,
            case_sensitive,
        }
    }

    /// Term for a property field: the value cast to the column's type and
    /// encoded, lower-cased for text columns in case-insensitive mode.
    ///
    /// Returns the term and whether it must be compared case-sensitively.
    pub fn property_term(&self, column_type: Option<PropertyType>) -> Result<(String, bool)> {
        let target = column_type.unwrap_or_else(|| self.value.property_type());
        let value = self.value.cast(target)?;
        let term = encode_value(&value);
        if target.is_text() && !self.case_sensitive {
            Ok((term.to_lowercase(), false))
        } else {
            Ok((term, true))
        }
    }

    /// Term for a numeric field such as a length or the depth.
    pub fn long_term(&self) -> Result<String> {
        match self.value.cast(PropertyType::Long)? {
            Value::Long(l) => Ok(encode_long(l)),
            other => Err(Error::invalid_query(format!(
                "expected a LONG value, found {}",
                other.property_type()
            ))),
        }
    }

    /// The value as text, lower-cased in case-insensitive mode.
    pub fn text(&self) -> Result<String> {
        let text = match self.value.as_text() {
            Some(text) => text.to_string(),
            None => self.value.cast(PropertyType::String)?.to_string(),
        };
        Ok(self.fold(text))
    }

    /// The value as text, failing for values that are not text-typed.
    pub fn strict_text(&self, operator: Operator, operand: &str) -> Result<String> {
        match self.value.as_text() {
            Some(text) => Ok(self.fold(text.to_string())),
            None => Err(Error::invalid_query(format!(
                "operator {} on {operand} requires a string value, found {}",
                operator.name(),
                self.value.property_type()
            ))),
        }
    }

    fn fold(&self, text: String) -> String {
        if self.case_sensitive {
            text
        } else {
            text.to_lowercase()
        }
    }
}

/// Escapes `*`, `?` and `\` so `text` matches itself in a wildcard pattern.
#[must_use]
pub fn escape_wildcard(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '*' | '?' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_term_casts_to_column_type() {
        let operand = StaticValue::new(Value::from("42"), true);
        let (term, cs) = operand.property_term(Some(PropertyType::Long)).unwrap();
        assert_eq!(term, encode_long(42));
        assert!(cs);
    }

    #[test]
    fn test_property_term_folds_text_only() {
        let operand = StaticValue::new(Value::from("Apollo"), false);
        assert_eq!(
            operand.property_term(Some(PropertyType::String)).unwrap(),
            ("apollo".to_string(), false)
        );
        let operand = StaticValue::new(Value::Long(7), false);
        assert_eq!(
            operand.property_term(None).unwrap(),
            (encode_long(7), true)
        );
    }

    #[test]
    fn test_impossible_cast_is_invalid_query() {
        let operand = StaticValue::new(Value::from("forty"), true);
        let err = operand.property_term(Some(PropertyType::Long)).unwrap_err();
        assert!(err.is_invalid_query());
        assert!(operand.long_term().is_err());
    }

    #[test]
    fn test_strict_text_rejects_numbers() {
        let operand = StaticValue::new(Value::Long(3), true);
        let err = operand.strict_text(Operator::Like, "LOCALNAME").unwrap_err();
        assert!(err.to_string().contains("LIKE on LOCALNAME requires a string value"));
    }

    #[test]
    fn test_escape_wildcard() {
        assert_eq!(escape_wildcard("a*b?c\\"), "a\\*b\\?c\\\\");
    }

    #[test]
    fn test_compiler_for_every_operator() {
        for operator in Operator::ALL {
            let compiler = compiler_for(operator, Value::from("x"), true);
            assert_eq!(compiler.operator(), operator);
        }
    }
}
