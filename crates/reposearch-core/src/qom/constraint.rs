use serde::{Deserialize, Serialize};

use super::{DynamicOperand, Operator, SelectorName, StaticOperand};

/// A predicate restricting the rows of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    And(And),
    Or(Or),
    Not(Not),
    Comparison(Comparison),
    ChildNode(ChildNode),
    DescendantNode(DescendantNode),
    SameNode(SameNode),
    FullTextSearch(FullTextSearch),
    PropertyExistence(PropertyExistence),
}

impl Constraint {
    /// `self AND other`.
    #[must_use]
    pub fn and(self, other: impl Into<Constraint>) -> Self {
        Self::And(And {
            left: Box::new(self),
            right: Box::new(other.into()),
        })
    }

    /// `self OR other`.
    #[must_use]
    pub fn or(self, other: impl Into<Constraint>) -> Self {
        Self::Or(Or {
            left: Box::new(self),
            right: Box::new(other.into()),
        })
    }

    /// `NOT self`.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Not {
            constraint: Box::new(self),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct And {
    pub left: Box<Constraint>,
    pub right: Box<Constraint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Or {
    pub left: Box<Constraint>,
    pub right: Box<Constraint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Not {
    pub constraint: Box<Constraint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub operand1: DynamicOperand,
    pub operator: Operator,
    pub operand2: StaticOperand,
}

impl Comparison {
    #[must_use]
    pub fn new(
        operand1: impl Into<DynamicOperand>,
        operator: Operator,
        operand2: impl Into<StaticOperand>,
    ) -> Self {
        Self {
            operand1: operand1.into(),
            operator,
            operand2: operand2.into(),
        }
    }
}

impl From<Comparison> for Constraint {
    fn from(value: Comparison) -> Self {
        Self::Comparison(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_name: Option<SelectorName>,
    pub parent_path: String,
}

impl ChildNode {
    #[must_use]
    pub fn new(selector: impl Into<SelectorName>, parent_path: impl Into<String>) -> Self {
        Self {
            selector_name: Some(selector.into()),
            parent_path: parent_path.into(),
        }
    }
}

impl From<ChildNode> for Constraint {
    fn from(value: ChildNode) -> Self {
        Self::ChildNode(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescendantNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_name: Option<SelectorName>,
    pub ancestor_path: String,
}

impl DescendantNode {
    #[must_use]
    pub fn new(selector: impl Into<SelectorName>, ancestor_path: impl Into<String>) -> Self {
        Self {
            selector_name: Some(selector.into()),
            ancestor_path: ancestor_path.into(),
        }
    }
}

impl From<DescendantNode> for Constraint {
    fn from(value: DescendantNode) -> Self {
        Self::DescendantNode(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SameNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_name: Option<SelectorName>,
    pub path: String,
}

impl SameNode {
    #[must_use]
    pub fn new(selector: impl Into<SelectorName>, path: impl Into<String>) -> Self {
        Self {
            selector_name: Some(selector.into()),
            path: path.into(),
        }
    }
}

impl From<SameNode> for Constraint {
    fn from(value: SameNode) -> Self {
        Self::SameNode(value)
    }
}

/// Full-text match of `expression` against one property, or against every
/// full-text searchable property when `property_name` is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullTextSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_name: Option<SelectorName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    pub expression: String,
}

impl FullTextSearch {
    #[must_use]
    pub fn new(selector: impl Into<SelectorName>, expression: impl Into<String>) -> Self {
        Self {
            selector_name: Some(selector.into()),
            property_name: None,
            expression: expression.into(),
        }
    }

    #[must_use]
    pub fn on_property(mut self, property: impl Into<String>) -> Self {
        self.property_name = Some(property.into());
        self
    }
}

impl From<FullTextSearch> for Constraint {
    fn from(value: FullTextSearch) -> Self {
        Self::FullTextSearch(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyExistence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_name: Option<SelectorName>,
    pub property_name: String,
}

impl PropertyExistence {
    #[must_use]
    pub fn new(selector: impl Into<SelectorName>, property: impl Into<String>) -> Self {
        Self {
            selector_name: Some(selector.into()),
            property_name: property.into(),
        }
    }
}

impl From<PropertyExistence> for Constraint {
    fn from(value: PropertyExistence) -> Self {
        Self::PropertyExistence(value)
    }
}
