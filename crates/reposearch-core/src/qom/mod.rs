//! Query Object Model: the typed, immutable AST of a search query.
//!
//! A [`Query`] is assembled once by a front-end (a REST binding, a fluent
//! builder, or a JSON document) and is never mutated afterwards. Consumers
//! such as the validator, the statement renderer and the predicate compiler
//! only borrow it, so one `Query` can be compiled concurrently from several
//! threads.

mod constraint;
mod operand;
mod operator;
mod source;

use serde::{Deserialize, Serialize};

pub use constraint::{
    And, ChildNode, Comparison, Constraint, DescendantNode, FullTextSearch, Not, Or,
    PropertyExistence, SameNode,
};
pub use operand::{
    BindVariableName, DynamicOperand, FullTextSearchScore, Length, Literal, LowerCase, NodeDepth,
    NodeLocalName, NodeName, PropertyValue, StaticOperand, UpperCase,
};
pub use operator::Operator;
pub use source::{
    ChildNodeJoinCondition, DescendantNodeJoinCondition, EquiJoinCondition, Join, JoinCondition,
    JoinType, SameNodeJoinCondition, Selector, SelectorName, Source,
};

/// Root of the AST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orderings: Vec<Ordering>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Limit::is_unlimited")]
    pub limit: Limit,
}

impl Query {
    /// `SELECT * FROM source` with no constraint, ordering or limit.
    #[must_use]
    pub fn new(source: impl Into<Source>) -> Self {
        Self {
            source: source.into(),
            constraint: None,
            orderings: Vec::new(),
            columns: Vec::new(),
            limit: Limit::NONE,
        }
    }

    /// Sets the constraint (builder pattern).
    #[must_use]
    pub fn with_constraint(mut self, constraint: impl Into<Constraint>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    /// Appends an ordering (builder pattern).
    #[must_use]
    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
        self
    }

    /// Appends a result column (builder pattern).
    #[must_use]
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the limit (builder pattern).
    #[must_use]
    pub fn with_limit(mut self, limit: Limit) -> Self {
        self.limit = limit;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Order {
    Ascending,
    Descending,
}

impl Order {
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordering {
    pub operand: DynamicOperand,
    pub order: Order,
}

impl Ordering {
    #[must_use]
    pub fn ascending(operand: impl Into<DynamicOperand>) -> Self {
        Self {
            operand: operand.into(),
            order: Order::Ascending,
        }
    }

    #[must_use]
    pub fn descending(operand: impl Into<DynamicOperand>) -> Self {
        Self {
            operand: operand.into(),
            order: Order::Descending,
        }
    }
}

/// A result column. Without a property name the column stands for every
/// column of the selector (`sel.*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_name: Option<SelectorName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
}

impl Column {
    #[must_use]
    pub fn new(selector: impl Into<SelectorName>, property: impl Into<String>) -> Self {
        Self {
            selector_name: Some(selector.into()),
            property_name: Some(property.into()),
            column_name: None,
        }
    }

    /// `sel.*`
    #[must_use]
    pub fn all_of(selector: impl Into<SelectorName>) -> Self {
        Self {
            selector_name: Some(selector.into()),
            property_name: None,
            column_name: None,
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.column_name = Some(alias.into());
        self
    }

    /// Name of the column in the result: the alias, else the property name,
    /// else `selector.*`.
    #[must_use]
    pub fn resolved_name(&self) -> String {
        if let Some(alias) = &self.column_name {
            return alias.clone();
        }
        if let Some(property) = &self.property_name {
            return property.clone();
        }
        match &self.selector_name {
            Some(selector) => format!("{selector}.*"),
            None => "*".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Limit {
    pub row_limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Limit {
    /// No row limit and no offset.
    pub const NONE: Limit = Limit {
        row_limit: usize::MAX,
        offset: 0,
    };

    #[must_use]
    pub const fn rows(row_limit: usize) -> Self {
        Self {
            row_limit,
            offset: 0,
        }
    }

    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.row_limit == usize::MAX && self.offset == 0
    }

    #[must_use]
    pub const fn has_row_limit(&self) -> bool {
        self.row_limit != usize::MAX
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_name_defaults_to_node_type() {
        let selector = Selector::new("nt:file");
        assert_eq!(selector.name().as_str(), "nt:file");
        let aliased = selector.with_alias("f");
        assert_eq!(aliased.name().as_str(), "f");
    }

    #[test]
    fn test_join_source_lists_selectors_left_to_right() {
        let join = Join::new(
            Selector::new("doc").with_alias("d"),
            JoinType::Inner,
            Selector::new("folder").with_alias("f"),
            ChildNodeJoinCondition::new("d", "f"),
        );
        let source = Source::from(join);
        let names: Vec<_> = source.selectors().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["d", "f"]);
    }

    #[test]
    fn test_column_resolved_names() {
        assert_eq!(Column::new("d", "title").resolved_name(), "title");
        assert_eq!(Column::new("d", "title").with_alias("t").resolved_name(), "t");
        assert_eq!(Column::all_of("d").resolved_name(), "d.*");
    }

    #[test]
    fn test_query_json_round_trip() {
        let query = Query::new(Selector::new("doc").with_alias("d"))
            .with_constraint(Comparison::new(
                PropertyValue::new("d", "title"),
                Operator::Like,
                Literal::new("Apollo%"),
            ))
            .order_by(Ordering::descending(NodeName::new("d")))
            .with_limit(Limit::rows(10).with_offset(5));

        let json = serde_json::to_string(&query).unwrap();
        let decoded: Query = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, query);
    }

    #[test]
    fn test_unlimited_limit_is_omitted_from_json() {
        let json = serde_json::to_value(Query::new(Selector::new("doc"))).unwrap();
        assert!(json.get("limit").is_none());
        assert!(Limit::default().is_unlimited());
        assert!(!Limit::rows(3).is_unlimited());
    }
}
