use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a selector: either a table (node type) name or an alias for one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectorName(String);

impl SelectorName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SelectorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SelectorName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SelectorName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for SelectorName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The set of entries a query draws rows from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Selector(Selector),
    Join(Box<Join>),
}

impl Source {
    /// Every selector declared by this source, left to right.
    #[must_use]
    pub fn selectors(&self) -> Vec<&Selector> {
        let mut selectors = Vec::new();
        self.collect_selectors(&mut selectors);
        selectors
    }

    fn collect_selectors<'a>(&'a self, output: &mut Vec<&'a Selector>) {
        match self {
            Self::Selector(selector) => output.push(selector),
            Self::Join(join) => {
                join.left.collect_selectors(output);
                join.right.collect_selectors(output);
            }
        }
    }
}

impl From<Selector> for Source {
    fn from(value: Selector) -> Self {
        Self::Selector(value)
    }
}

impl From<Join> for Source {
    fn from(value: Join) -> Self {
        Self::Join(Box::new(value))
    }
}

/// Binds a table (node type) to a selector name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub node_type_name: SelectorName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<SelectorName>,
}

impl Selector {
    #[must_use]
    pub fn new(node_type_name: impl Into<SelectorName>) -> Self {
        Self {
            node_type_name: node_type_name.into(),
            alias: None,
        }
    }

    /// Sets the alias (builder pattern).
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<SelectorName>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The name other nodes use to reference this selector.
    #[must_use]
    pub fn name(&self) -> &SelectorName {
        self.alias.as_ref().unwrap_or(&self.node_type_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
}

impl JoinType {
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::LeftOuter => "LEFT OUTER JOIN",
            Self::RightOuter => "RIGHT OUTER JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub left: Source,
    pub right: Source,
    pub join_type: JoinType,
    pub condition: JoinCondition,
}

impl Join {
    #[must_use]
    pub fn new(
        left: impl Into<Source>,
        join_type: JoinType,
        right: impl Into<Source>,
        condition: impl Into<JoinCondition>,
    ) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            join_type,
            condition: condition.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinCondition {
    ChildNode(ChildNodeJoinCondition),
    DescendantNode(DescendantNodeJoinCondition),
    Equi(EquiJoinCondition),
    SameNode(SameNodeJoinCondition),
}

impl JoinCondition {
    /// The two selectors a join condition relates.
    #[must_use]
    pub fn selector_names(&self) -> (&SelectorName, &SelectorName) {
        match self {
            Self::ChildNode(c) => (&c.child_selector, &c.parent_selector),
            Self::DescendantNode(c) => (&c.descendant_selector, &c.ancestor_selector),
            Self::Equi(c) => (&c.selector1, &c.selector2),
            Self::SameNode(c) => (&c.selector1, &c.selector2),
        }
    }
}

/// Rows of `child_selector` whose entry is a child of the `parent_selector` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildNodeJoinCondition {
    pub child_selector: SelectorName,
    pub parent_selector: SelectorName,
}

impl ChildNodeJoinCondition {
    #[must_use]
    pub fn new(child: impl Into<SelectorName>, parent: impl Into<SelectorName>) -> Self {
        Self {
            child_selector: child.into(),
            parent_selector: parent.into(),
        }
    }
}

impl From<ChildNodeJoinCondition> for JoinCondition {
    fn from(value: ChildNodeJoinCondition) -> Self {
        Self::ChildNode(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescendantNodeJoinCondition {
    pub descendant_selector: SelectorName,
    pub ancestor_selector: SelectorName,
}

impl DescendantNodeJoinCondition {
    #[must_use]
    pub fn new(descendant: impl Into<SelectorName>, ancestor: impl Into<SelectorName>) -> Self {
        Self {
            descendant_selector: descendant.into(),
            ancestor_selector: ancestor.into(),
        }
    }
}

impl From<DescendantNodeJoinCondition> for JoinCondition {
    fn from(value: DescendantNodeJoinCondition) -> Self {
        Self::DescendantNode(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquiJoinCondition {
    pub selector1: SelectorName,
    pub property1: String,
    pub selector2: SelectorName,
    pub property2: String,
}

impl EquiJoinCondition {
    #[must_use]
    pub fn new(
        selector1: impl Into<SelectorName>,
        property1: impl Into<String>,
        selector2: impl Into<SelectorName>,
        property2: impl Into<String>,
    ) -> Self {
        Self {
            selector1: selector1.into(),
            property1: property1.into(),
            selector2: selector2.into(),
            property2: property2.into(),
        }
    }
}

impl From<EquiJoinCondition> for JoinCondition {
    fn from(value: EquiJoinCondition) -> Self {
        Self::Equi(value)
    }
}

/// Rows of `selector1` that are the same entry as the `selector2` row, or as
/// the entry at `selector2_path` relative to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SameNodeJoinCondition {
    pub selector1: SelectorName,
    pub selector2: SelectorName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector2_path: Option<String>,
}

impl SameNodeJoinCondition {
    #[must_use]
    pub fn new(selector1: impl Into<SelectorName>, selector2: impl Into<SelectorName>) -> Self {
        Self {
            selector1: selector1.into(),
            selector2: selector2.into(),
            selector2_path: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.selector2_path = Some(path.into());
        self
    }
}

impl From<SameNodeJoinCondition> for JoinCondition {
    fn from(value: SameNodeJoinCondition) -> Self {
        Self::SameNode(value)
    }
}
