use reposearch_core::qom::Operator;
use reposearch_core::{PropertyType, Result};

use super::{EqualTo, OperandCompiler, StaticValue};
use crate::predicate::Predicate;

/// `operand <> value`: entries carrying the field whose value differs.
///
/// Name, local name and depth exist on every entry, so those negate the
/// equality directly.
#[derive(Debug, Clone)]
pub struct NotEqualTo {
    equal: EqualTo,
}

impl NotEqualTo {
    #[must_use]
    pub const fn new(operand: StaticValue) -> Self {
        Self {
            equal: EqualTo::new(operand),
        }
    }
}

impl OperandCompiler for NotEqualTo {
    fn operator(&self) -> Operator {
        Operator::NotEqualTo
    }

    fn property_value(&self, field: &str, column_type: Option<PropertyType>) -> Result<Predicate> {
        Ok(Predicate::exclude(
            Predicate::exists(field),
            self.equal.property_value(field, column_type)?,
        ))
    }

    fn length(&self, field: &str) -> Result<Predicate> {
        Ok(Predicate::exclude(
            Predicate::exists(field),
            self.equal.length(field)?,
        ))
    }

    fn node_name(&self) -> Result<Predicate> {
        Ok(Predicate::not(self.equal.node_name()?))
    }

    fn node_local_name(&self) -> Result<Predicate> {
        Ok(Predicate::not(self.equal.node_local_name()?))
    }

    fn node_depth(&self) -> Result<Predicate> {
        Ok(Predicate::not(self.equal.node_depth()?))
    }
}
