//! Visitor dispatch over the query object model.
//!
//! [`QueryNode`] borrows one node of any kind; [`QueryNode::accept`] routes it
//! to the matching [`Visitor`] method. Every `Visitor` method defaults to a
//! no-op, so a visitor only overrides the node kinds it cares about.
//! [`walk_all`] drives a visitor over a whole tree so the visitor itself never
//! recurses.

use std::collections::VecDeque;

use reposearch_core::qom::{
    And, BindVariableName, ChildNode, ChildNodeJoinCondition, Column, Comparison, Constraint,
    DescendantNode, DescendantNodeJoinCondition, DynamicOperand, EquiJoinCondition,
    FullTextSearch, FullTextSearchScore, Join, JoinCondition, Length, Limit, Literal, LowerCase,
    NodeDepth, NodeLocalName, NodeName, Not, Or, Ordering, PropertyExistence, PropertyValue,
    Query, SameNode, SameNodeJoinCondition, Selector, Source, StaticOperand, UpperCase,
};

/// A borrowed node of any kind.
#[derive(Debug, Clone, Copy)]
pub enum QueryNode<'a> {
    Query(&'a Query),
    Selector(&'a Selector),
    Join(&'a Join),
    ChildNodeJoinCondition(&'a ChildNodeJoinCondition),
    DescendantNodeJoinCondition(&'a DescendantNodeJoinCondition),
    EquiJoinCondition(&'a EquiJoinCondition),
    SameNodeJoinCondition(&'a SameNodeJoinCondition),
    And(&'a And),
    Or(&'a Or),
    Not(&'a Not),
    Comparison(&'a Comparison),
    ChildNode(&'a ChildNode),
    DescendantNode(&'a DescendantNode),
    SameNode(&'a SameNode),
    FullTextSearch(&'a FullTextSearch),
    PropertyExistence(&'a PropertyExistence),
    PropertyValue(&'a PropertyValue),
    Length(&'a Length),
    NodeName(&'a NodeName),
    NodeLocalName(&'a NodeLocalName),
    NodeDepth(&'a NodeDepth),
    FullTextSearchScore(&'a FullTextSearchScore),
    UpperCase(&'a UpperCase),
    LowerCase(&'a LowerCase),
    Literal(&'a Literal),
    BindVariableName(&'a BindVariableName),
    Ordering(&'a Ordering),
    Column(&'a Column),
    Limit(&'a Limit),
}

/// One method per concrete node kind. All methods default to doing nothing.
pub trait Visitor {
    fn visit_query(&mut self, _node: &Query) {}
    fn visit_selector(&mut self, _node: &Selector) {}
    fn visit_join(&mut self, _node: &Join) {}
    fn visit_child_node_join_condition(&mut self, _node: &ChildNodeJoinCondition) {}
    fn visit_descendant_node_join_condition(&mut self, _node: &DescendantNodeJoinCondition) {}
    fn visit_equi_join_condition(&mut self, _node: &EquiJoinCondition) {}
    fn visit_same_node_join_condition(&mut self, _node: &SameNodeJoinCondition) {}
    fn visit_and(&mut self, _node: &And) {}
    fn visit_or(&mut self, _node: &Or) {}
    fn visit_not(&mut self, _node: &Not) {}
    fn visit_comparison(&mut self, _node: &Comparison) {}
    fn visit_child_node(&mut self, _node: &ChildNode) {}
    fn visit_descendant_node(&mut self, _node: &DescendantNode) {}
    fn visit_same_node(&mut self, _node: &SameNode) {}
    fn visit_full_text_search(&mut self, _node: &FullTextSearch) {}
    fn visit_property_existence(&mut self, _node: &PropertyExistence) {}
    fn visit_property_value(&mut self, _node: &PropertyValue) {}
    fn visit_length(&mut self, _node: &Length) {}
    fn visit_node_name(&mut self, _node: &NodeName) {}
    fn visit_node_local_name(&mut self, _node: &NodeLocalName) {}
    fn visit_node_depth(&mut self, _node: &NodeDepth) {}
    fn visit_full_text_search_score(&mut self, _node: &FullTextSearchScore) {}
    fn visit_upper_case(&mut self, _node: &UpperCase) {}
    fn visit_lower_case(&mut self, _node: &LowerCase) {}
    fn visit_literal(&mut self, _node: &Literal) {}
    fn visit_bind_variable_name(&mut self, _node: &BindVariableName) {}
    fn visit_ordering(&mut self, _node: &Ordering) {}
    fn visit_column(&mut self, _node: &Column) {}
    fn visit_limit(&mut self, _node: &Limit) {}
}

impl<'a> QueryNode<'a> {
    /// Calls the visitor method matching this node's kind.
    pub fn accept<V: Visitor + ?Sized>(self, visitor: &mut V) {
        match self {
            Self::Query(node) => visitor.visit_query(node),
            Self::Selector(node) => visitor.visit_selector(node),
            Self::Join(node) => visitor.visit_join(node),
            Self::ChildNodeJoinCondition(node) => visitor.visit_child_node_join_condition(node),
            Self::DescendantNodeJoinCondition(node) => {
                visitor.visit_descendant_node_join_condition(node);
            }
            Self::EquiJoinCondition(node) => visitor.visit_equi_join_condition(node),
            Self::SameNodeJoinCondition(node) => visitor.visit_same_node_join_condition(node),
            Self::And(node) => visitor.visit_and(node),
            Self::Or(node) => visitor.visit_or(node),
            Self::Not(node) => visitor.visit_not(node),
            Self::Comparison(node) => visitor.visit_comparison(node),
            Self::ChildNode(node) => visitor.visit_child_node(node),
            Self::DescendantNode(node) => visitor.visit_descendant_node(node),
            Self::SameNode(node) => visitor.visit_same_node(node),
            Self::FullTextSearch(node) => visitor.visit_full_text_search(node),
            Self::PropertyExistence(node) => visitor.visit_property_existence(node),
            Self::PropertyValue(node) => visitor.visit_property_value(node),
            Self::Length(node) => visitor.visit_length(node),
            Self::NodeName(node) => visitor.visit_node_name(node),
            Self::NodeLocalName(node) => visitor.visit_node_local_name(node),
            Self::NodeDepth(node) => visitor.visit_node_depth(node),
            Self::FullTextSearchScore(node) => visitor.visit_full_text_search_score(node),
            Self::UpperCase(node) => visitor.visit_upper_case(node),
            Self::LowerCase(node) => visitor.visit_lower_case(node),
            Self::Literal(node) => visitor.visit_literal(node),
            Self::BindVariableName(node) => visitor.visit_bind_variable_name(node),
            Self::Ordering(node) => visitor.visit_ordering(node),
            Self::Column(node) => visitor.visit_column(node),
            Self::Limit(node) => visitor.visit_limit(node),
        }
    }

    /// Structural children in declaration order.
    #[must_use]
    pub fn children(self) -> Vec<QueryNode<'a>> {
        match self {
            Self::Query(query) => {
                let mut children = Vec::with_capacity(3 + query.orderings.len() + query.columns.len());
                children.push(Self::from(&query.source));
                if let Some(constraint) = &query.constraint {
                    children.push(Self::from(constraint));
                }
                children.extend(query.orderings.iter().map(Self::Ordering));
                children.extend(query.columns.iter().map(Self::Column));
                children.push(Self::Limit(&query.limit));
                children
            }
            Self::Join(join) => vec![
                Self::from(&join.left),
                Self::from(&join.right),
                Self::from(&join.condition),
            ],
            Self::And(and) => vec![Self::from(&*and.left), Self::from(&*and.right)],
            Self::Or(or) => vec![Self::from(&*or.left), Self::from(&*or.right)],
            Self::Not(not) => vec![Self::from(&*not.constraint)],
            Self::Comparison(comparison) => vec![
                Self::from(&comparison.operand1),
                Self::from(&comparison.operand2),
            ],
            Self::Length(length) => vec![Self::PropertyValue(&length.property_value)],
            Self::UpperCase(upper) => vec![Self::from(&*upper.operand)],
            Self::LowerCase(lower) => vec![Self::from(&*lower.operand)],
            Self::Ordering(ordering) => vec![Self::from(&ordering.operand)],
            Self::Selector(_)
            | Self::ChildNodeJoinCondition(_)
            | Self::DescendantNodeJoinCondition(_)
            | Self::EquiJoinCondition(_)
            | Self::SameNodeJoinCondition(_)
            | Self::ChildNode(_)
            | Self::DescendantNode(_)
            | Self::SameNode(_)
            | Self::FullTextSearch(_)
            | Self::PropertyExistence(_)
            | Self::PropertyValue(_)
            | Self::NodeName(_)
            | Self::NodeLocalName(_)
            | Self::NodeDepth(_)
            | Self::FullTextSearchScore(_)
            | Self::Literal(_)
            | Self::BindVariableName(_)
            | Self::Column(_)
            | Self::Limit(_) => Vec::new(),
        }
    }
}

/// Visits `root` and every node below it exactly once.
///
/// Each node is handed to `visitor` first; its children are then queued in
/// declaration order and each is walked in turn, so a node's whole subtree is
/// visited before its next sibling. For a [`Query`] this means every selector
/// of the source is seen before the constraint, orderings and columns that
/// reference it.
pub fn walk_all<'a, V>(root: impl Into<QueryNode<'a>>, visitor: &mut V)
where
    V: Visitor + ?Sized,
{
    let root = root.into();
    root.accept(visitor);

    let mut queue: VecDeque<QueryNode<'a>> = root.children().into();
    while let Some(child) = queue.pop_front() {
        walk_all(child, visitor);
    }
}

macro_rules! node_from {
    ($($kind:ident),* $(,)?) => {
        $(
            impl<'a> From<&'a $kind> for QueryNode<'a> {
                fn from(value: &'a $kind) -> Self {
                    Self::$kind(value)
                }
            }
        )*
    };
}

node_from!(
    Query,
    Selector,
    Join,
    ChildNodeJoinCondition,
    DescendantNodeJoinCondition,
    EquiJoinCondition,
    SameNodeJoinCondition,
    And,
    Or,
    Not,
    Comparison,
    ChildNode,
    DescendantNode,
    SameNode,
    FullTextSearch,
    PropertyExistence,
    PropertyValue,
    Length,
    NodeName,
    NodeLocalName,
    NodeDepth,
    FullTextSearchScore,
    UpperCase,
    LowerCase,
    Literal,
    BindVariableName,
    Ordering,
    Column,
    Limit,
);

impl<'a> From<&'a Source> for QueryNode<'a> {
    fn from(value: &'a Source) -> Self {
        match value {
            Source::Selector(selector) => Self::Selector(selector),
            Source::Join(join) => Self::Join(join),
        }
    }
}

impl<'a> From<&'a JoinCondition> for QueryNode<'a> {
    fn from(value: &'a JoinCondition) -> Self {
        match value {
            JoinCondition::ChildNode(c) => Self::ChildNodeJoinCondition(c),
            JoinCondition::DescendantNode(c) => Self::DescendantNodeJoinCondition(c),
            JoinCondition::Equi(c) => Self::EquiJoinCondition(c),
            JoinCondition::SameNode(c) => Self::SameNodeJoinCondition(c),
        }
    }
}

impl<'a> From<&'a Constraint> for QueryNode<'a> {
    fn from(value: &'a Constraint) -> Self {
        match value {
            Constraint::And(c) => Self::And(c),
            Constraint::Or(c) => Self::Or(c),
            Constraint::Not(c) => Self::Not(c),
            Constraint::Comparison(c) => Self::Comparison(c),
            Constraint::ChildNode(c) => Self::ChildNode(c),
            Constraint::DescendantNode(c) => Self::DescendantNode(c),
            Constraint::SameNode(c) => Self::SameNode(c),
            Constraint::FullTextSearch(c) => Self::FullTextSearch(c),
            Constraint::PropertyExistence(c) => Self::PropertyExistence(c),
        }
    }
}

impl<'a> From<&'a DynamicOperand> for QueryNode<'a> {
    fn from(value: &'a DynamicOperand) -> Self {
        match value {
            DynamicOperand::PropertyValue(op) => Self::PropertyValue(op),
            DynamicOperand::Length(op) => Self::Length(op),
            DynamicOperand::NodeName(op) => Self::NodeName(op),
            DynamicOperand::NodeLocalName(op) => Self::NodeLocalName(op),
            DynamicOperand::NodeDepth(op) => Self::NodeDepth(op),
            DynamicOperand::FullTextSearchScore(op) => Self::FullTextSearchScore(op),
            DynamicOperand::UpperCase(op) => Self::UpperCase(op),
            DynamicOperand::LowerCase(op) => Self::LowerCase(op),
        }
    }
}

impl<'a> From<&'a StaticOperand> for QueryNode<'a> {
    fn from(value: &'a StaticOperand) -> Self {
        match value {
            StaticOperand::Literal(literal) => Self::Literal(literal),
            StaticOperand::BindVariable(variable) => Self::BindVariableName(variable),
        }
    }
}
