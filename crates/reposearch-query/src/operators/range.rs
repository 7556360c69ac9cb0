use reposearch_core::qom::Operator;
use reposearch_core::{Error, PropertyType, Result};

use super::{OperandCompiler, StaticValue};
use crate::fields::{DEPTH_FIELD, NAME_FIELD};
use crate::predicate::{Predicate, RangeBound};

/// `<`, `<=`, `>` and `>=` as range predicates over encoded terms.
#[derive(Debug, Clone)]
pub struct RangeComparison {
    operator: Operator,
    operand: StaticValue,
}

impl RangeComparison {
    /// # Panics
    ///
    /// Debug builds panic when `operator` is not an ordered comparison.
    #[must_use]
    pub fn new(operator: Operator, operand: StaticValue) -> Self {
        debug_assert!(operator.is_range(), "{operator} is not a range operator");
        Self { operator, operand }
    }

    fn predicate(&self, field: &str, term: String, case_sensitive: bool) -> Predicate {
        let (lower, upper) = match self.operator {
            Operator::LessThan => (RangeBound::Unbounded, RangeBound::Excluded(term)),
            Operator::LessThanOrEqualTo => (RangeBound::Unbounded, RangeBound::Included(term)),
            Operator::GreaterThan => (RangeBound::Excluded(term), RangeBound::Unbounded),
            _ => (RangeBound::Included(term), RangeBound::Unbounded),
        };
        Predicate::range(field, lower, upper, case_sensitive)
    }
}

impl OperandCompiler for RangeComparison {
    fn operator(&self) -> Operator {
        self.operator
    }

    fn property_value(&self, field: &str, column_type: Option<PropertyType>) -> Result<Predicate> {
        let (term, case_sensitive) = self.operand.property_term(column_type)?;
        Ok(self.predicate(field, term, case_sensitive))
    }

    fn length(&self, field: &str) -> Result<Predicate> {
        Ok(self.predicate(field, self.operand.long_term()?, true))
    }

    fn node_name(&self) -> Result<Predicate> {
        let ty = self.operand.value.property_type();
        if !matches!(ty, PropertyType::String | PropertyType::Name) {
            return Err(Error::invalid_query(format!(
                "operator {} on NAME requires a STRING or NAME value, found {ty}",
                self.operator.name()
            )));
        }
        Ok(self.predicate(
            NAME_FIELD,
            self.operand.text()?,
            self.operand.case_sensitive,
        ))
    }

    fn node_depth(&self) -> Result<Predicate> {
        Ok(self.predicate(DEPTH_FIELD, self.operand.long_term()?, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::encode_long;
    use reposearch_core::Value;

    fn compiler(operator: Operator, value: impl Into<Value>) -> RangeComparison {
        RangeComparison::new(operator, StaticValue::new(value.into(), true))
    }

    #[test]
    fn test_bounds_per_operator() {
        let term = encode_long(5);
        let cases = [
            (
                Operator::LessThan,
                RangeBound::Unbounded,
                RangeBound::Excluded(term.clone()),
            ),
            (
                Operator::LessThanOrEqualTo,
                RangeBound::Unbounded,
                RangeBound::Included(term.clone()),
            ),
            (
                Operator::GreaterThan,
                RangeBound::Excluded(term.clone()),
                RangeBound::Unbounded,
            ),
            (
                Operator::GreaterThanOrEqualTo,
                RangeBound::Included(term.clone()),
                RangeBound::Unbounded,
            ),
        ];
        for (operator, lower, upper) in cases {
            let predicate = compiler(operator, 5_i64)
                .property_value("doc.pages", Some(PropertyType::Long))
                .unwrap();
            assert_eq!(predicate, Predicate::range("doc.pages", lower, upper, true));
        }
    }

    #[test]
    fn test_local_name_is_unsupported() {
        for operator in [
            Operator::LessThan,
            Operator::LessThanOrEqualTo,
            Operator::GreaterThan,
            Operator::GreaterThanOrEqualTo,
        ] {
            let err = compiler(operator, "a").node_local_name().unwrap_err();
            assert!(err.to_string().contains(operator.name()));
            assert!(err.to_string().contains("LOCALNAME"));
        }
    }

    #[test]
    fn test_name_requires_string_value() {
        assert!(compiler(Operator::GreaterThan, "m").node_name().is_ok());
        let err = compiler(Operator::GreaterThan, 3.5).node_name().unwrap_err();
        assert!(err.to_string().contains("STRING or NAME"));
    }

    #[test]
    fn test_length_and_depth_are_numeric() {
        assert_eq!(
            compiler(Operator::GreaterThan, 3_i64).length("doc.title$length").unwrap(),
            Predicate::range(
                "doc.title$length",
                RangeBound::Excluded(encode_long(3)),
                RangeBound::Unbounded,
                true
            )
        );
        assert!(compiler(Operator::LessThan, "deep").node_depth().is_err());
    }
}
