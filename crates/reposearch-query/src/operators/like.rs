use reposearch_core::qom::Operator;
use reposearch_core::{Error, PropertyType, Result};

use super::{OperandCompiler, StaticValue};
use crate::encoding::encode_long;
use crate::fields::{LOCAL_NAME_FIELD, NAME_FIELD};
use crate::like::{is_match_all, like_pattern_to_regex};
use crate::predicate::Predicate;

/// `operand LIKE pattern`
#[derive(Debug, Clone)]
pub struct Like {
    operand: StaticValue,
}

impl Like {
    #[must_use]
    pub const fn new(operand: StaticValue) -> Self {
        Self { operand }
    }

    fn name_pattern(&self, field: &str, pattern: &str) -> Predicate {
        if is_match_all(pattern) {
            return Predicate::MatchAll;
        }
        Predicate::regex(
            field,
            like_pattern_to_regex(pattern),
            self.operand.case_sensitive,
        )
    }
}

impl OperandCompiler for Like {
    fn operator(&self) -> Operator {
        Operator::Like
    }

    fn property_value(&self, field: &str, column_type: Option<PropertyType>) -> Result<Predicate> {
        if let Some(ty) = column_type.filter(|ty| !ty.is_text()) {
            return Err(Error::invalid_query(format!(
                "operator LIKE requires a text column, but '{field}' is {ty}"
            )));
        }
        let pattern = self.operand.text()?;
        if is_match_all(&pattern) {
            return Ok(Predicate::exists(field));
        }
        Ok(Predicate::regex(
            field,
            like_pattern_to_regex(&pattern),
            self.operand.case_sensitive,
        ))
    }

    /// Lengths are stored encoded, so only `%` and a plain number are
    /// meaningful patterns.
    fn length(&self, field: &str) -> Result<Predicate> {
        let pattern = self.operand.strict_text(Operator::Like, "LENGTH")?;
        if is_match_all(&pattern) {
            return Ok(Predicate::exists(field));
        }
        match pattern.parse::<i64>() {
            Ok(length) => Ok(Predicate::term(field, encode_long(length), true)),
            Err(_) => Err(Error::invalid_query(format!(
                "operator LIKE on LENGTH supports only '%' or a number, found '{pattern}'"
            ))),
        }
    }

    fn node_name(&self) -> Result<Predicate> {
        let pattern = self.operand.text()?;
        Ok(self.name_pattern(NAME_FIELD, &pattern))
    }

    fn node_local_name(&self) -> Result<Predicate> {
        let pattern = self.operand.strict_text(Operator::Like, "LOCALNAME")?;
        Ok(self.name_pattern(LOCAL_NAME_FIELD, &pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reposearch_core::Value;

    fn like(value: impl Into<Value>, case_sensitive: bool) -> Like {
        Like::new(StaticValue::new(value.into(), case_sensitive))
    }

    #[test]
    fn test_property_regex() {
        let predicate = like("Apollo%", true)
            .property_value("doc.title", Some(PropertyType::String))
            .unwrap();
        assert_eq!(predicate, Predicate::regex("doc.title", "^Apollo.*$", true));
    }

    #[test]
    fn test_case_insensitive_pattern_is_folded() {
        let predicate = like("Apollo%", false).property_value("doc.title", None).unwrap();
        assert_eq!(predicate, Predicate::regex("doc.title", "^apollo.*$", false));
    }

    #[test]
    fn test_match_all_fast_paths() {
        assert_eq!(
            like("%", true).property_value("doc.title", None).unwrap(),
            Predicate::exists("doc.title")
        );
        assert_eq!(like("%", true).node_name().unwrap(), Predicate::MatchAll);
        assert_eq!(like("%", true).node_local_name().unwrap(), Predicate::MatchAll);
    }

    #[test]
    fn test_non_text_column_is_rejected() {
        let err = like("1%", true)
            .property_value("doc.pages", Some(PropertyType::Long))
            .unwrap_err();
        assert!(err.to_string().contains("requires a text column"));
    }

    #[test]
    fn test_length_and_local_name_need_strings() {
        assert!(like(5_i64, true).length("doc.title$length").is_err());
        assert!(like(5_i64, true).node_local_name().is_err());
        assert_eq!(
            like("5", true).length("doc.title$length").unwrap(),
            Predicate::term("doc.title$length", encode_long(5), true)
        );
        assert!(like("5%", true).length("doc.title$length").is_err());
    }

    #[test]
    fn test_depth_is_unsupported() {
        let err = like("1", true).node_depth().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid query: operator LIKE is not supported for DEPTH"
        );
    }
}
