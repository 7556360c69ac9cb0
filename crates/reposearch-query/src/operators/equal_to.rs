use reposearch_core::content::local_name;
use reposearch_core::qom::Operator;
use reposearch_core::{PropertyType, Result};

use super::{escape_wildcard, OperandCompiler, StaticValue};
use crate::fields::{DEPTH_FIELD, LOCAL_NAME_FIELD, NAME_FIELD};
use crate::predicate::Predicate;

/// `operand = value`
#[derive(Debug, Clone)]
pub struct EqualTo {
    operand: StaticValue,
}

impl EqualTo {
    #[must_use]
    pub const fn new(operand: StaticValue) -> Self {
        Self { operand }
    }
}

impl OperandCompiler for EqualTo {
    fn operator(&self) -> Operator {
        Operator::EqualTo
    }

    fn property_value(&self, field: &str, column_type: Option<PropertyType>) -> Result<Predicate> {
        let (term, case_sensitive) = self.operand.property_term(column_type)?;
        Ok(Predicate::term(field, term, case_sensitive))
    }

    fn length(&self, field: &str) -> Result<Predicate> {
        Ok(Predicate::term(field, self.operand.long_term()?, true))
    }

    /// Matches the name as given, or any prefixed name with the same local
    /// part, since a stored label may carry a prefix the query omits.
    fn node_name(&self) -> Result<Predicate> {
        let name = self.operand.text()?;
        let case_sensitive = self.operand.case_sensitive;
        let any_prefix = format!("*:{}", escape_wildcard(local_name(&name)));
        Ok(Predicate::should(vec![
            Predicate::term(NAME_FIELD, name, case_sensitive),
            Predicate::wildcard(NAME_FIELD, any_prefix, case_sensitive),
        ]))
    }

    fn node_local_name(&self) -> Result<Predicate> {
        Ok(Predicate::term(
            LOCAL_NAME_FIELD,
            self.operand.text()?,
            self.operand.case_sensitive,
        ))
    }

    fn node_depth(&self) -> Result<Predicate> {
        Ok(Predicate::term(DEPTH_FIELD, self.operand.long_term()?, true))
    }
}
