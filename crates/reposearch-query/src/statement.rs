//! Renders a query object model back into canonical statement text.
//!
//! The output is deterministic: rendering two equal trees always yields the
//! same string, which makes the statement usable as a cache key and as a
//! human-readable log line.

use std::fmt;

use reposearch_core::qom::{
    And, BindVariableName, ChildNode, ChildNodeJoinCondition, Column, Comparison,
    DescendantNode, DescendantNodeJoinCondition, EquiJoinCondition, FullTextSearch,
    FullTextSearchScore, Join, Length, Limit, Literal, LowerCase, NodeDepth, NodeLocalName,
    NodeName, Not, Or, Ordering, PropertyExistence, PropertyValue, Query, SameNode,
    SameNodeJoinCondition, Selector, SelectorName, Source, UpperCase,
};
use reposearch_core::{PropertyType, Value};

use crate::visitor::{QueryNode, Visitor};

/// Renders `node` (and everything below it) as statement text.
#[must_use]
pub fn render<'a>(node: impl Into<QueryNode<'a>>) -> String {
    let mut writer = StatementWriter::new();
    writer.write(node);
    writer.finish()
}

/// `Display` adapter over any node.
#[derive(Debug, Clone, Copy)]
pub struct Statement<'a>(pub QueryNode<'a>);

impl<'a> Statement<'a> {
    #[must_use]
    pub fn of(node: impl Into<QueryNode<'a>>) -> Self {
        Self(node.into())
    }
}

impl fmt::Display for Statement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self.0))
    }
}

/// Recursive-descent renderer writing into one buffer.
#[derive(Debug, Default)]
pub struct StatementWriter {
    buffer: String,
}

impl StatementWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write<'a>(&mut self, node: impl Into<QueryNode<'a>>) {
        node.into().accept(self);
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.buffer
    }

    fn push(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn push_name(&mut self, name: &str) {
        if is_identifier(name) {
            self.push(name);
        } else {
            self.buffer.push('[');
            self.push(&name.replace(']', "]]"));
            self.buffer.push(']');
        }
    }

    fn push_selector_reference(&mut self, selector: Option<&SelectorName>) {
        if let Some(selector) = selector {
            self.push_name(selector.as_str());
        }
    }

    fn push_qualified(&mut self, selector: Option<&SelectorName>, property: &str) {
        if let Some(selector) = selector {
            self.push_name(selector.as_str());
            self.buffer.push('.');
        }
        self.push_name(property);
    }

    fn push_quoted(&mut self, text: &str) {
        self.buffer.push('\'');
        self.push(&text.replace('\'', "''"));
        self.buffer.push('\'');
    }

    fn push_function(&mut self, function: &str, selector: Option<&SelectorName>) {
        self.push(function);
        self.buffer.push('(');
        self.push_selector_reference(selector);
        self.buffer.push(')');
    }

    fn push_path_function(&mut self, function: &str, selector: Option<&SelectorName>, path: &str) {
        self.push(function);
        self.buffer.push('(');
        if let Some(selector) = selector {
            self.push_name(selector.as_str());
            self.push(", ");
        }
        self.push_name(path);
        self.buffer.push(')');
    }

    fn push_list<'a, I>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = QueryNode<'a>>,
    {
        for (i, node) in nodes.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            node.accept(self);
        }
    }
}

impl Visitor for StatementWriter {
    fn visit_query(&mut self, query: &Query) {
        self.push("SELECT ");
        if query.columns.is_empty() {
            self.buffer.push('*');
        } else {
            self.push_list(query.columns.iter().map(QueryNode::Column));
        }
        self.push(" FROM ");
        self.write(&query.source);
        if let Some(constraint) = &query.constraint {
            self.push(" WHERE ");
            self.write(constraint);
        }
        if !query.orderings.is_empty() {
            self.push(" ORDER BY ");
            self.push_list(query.orderings.iter().map(QueryNode::Ordering));
        }
        self.visit_limit(&query.limit);
    }

    fn visit_selector(&mut self, selector: &Selector) {
        self.push_name(selector.node_type_name.as_str());
        if let Some(alias) = &selector.alias {
            self.push(" AS ");
            self.push_name(alias.as_str());
        }
    }

    fn visit_join(&mut self, join: &Join) {
        self.write(&join.left);
        self.buffer.push(' ');
        self.push(join.join_type.symbol());
        self.buffer.push(' ');
        // Joins associate to the left; a nested right side needs grouping
        if matches!(join.right, Source::Join(_)) {
            self.buffer.push('(');
            self.write(&join.right);
            self.buffer.push(')');
        } else {
            self.write(&join.right);
        }
        self.push(" ON ");
        self.write(&join.condition);
    }

    fn visit_child_node_join_condition(&mut self, node: &ChildNodeJoinCondition) {
        self.push("ISCHILDNODE(");
        self.push_name(node.child_selector.as_str());
        self.push(", ");
        self.push_name(node.parent_selector.as_str());
        self.buffer.push(')');
    }

    fn visit_descendant_node_join_condition(&mut self, node: &DescendantNodeJoinCondition) {
        self.push("ISDESCENDANTNODE(");
        self.push_name(node.descendant_selector.as_str());
        self.push(", ");
        self.push_name(node.ancestor_selector.as_str());
        self.buffer.push(')');
    }

    fn visit_equi_join_condition(&mut self, node: &EquiJoinCondition) {
        self.push_qualified(Some(&node.selector1), &node.property1);
        self.push(" = ");
        self.push_qualified(Some(&node.selector2), &node.property2);
    }

    fn visit_same_node_join_condition(&mut self, node: &SameNodeJoinCondition) {
        self.push("ISSAMENODE(");
        self.push_name(node.selector1.as_str());
        self.push(", ");
        self.push_name(node.selector2.as_str());
        if let Some(path) = &node.selector2_path {
            self.push(", ");
            self.push_name(path);
        }
        self.buffer.push(')');
    }

    fn visit_and(&mut self, node: &And) {
        self.buffer.push('(');
        self.write(&*node.left);
        self.push(" AND ");
        self.write(&*node.right);
        self.buffer.push(')');
    }

    fn visit_or(&mut self, node: &Or) {
        self.buffer.push('(');
        self.write(&*node.left);
        self.push(" OR ");
        self.write(&*node.right);
        self.buffer.push(')');
    }

    fn visit_not(&mut self, node: &Not) {
        self.push("(NOT ");
        self.write(&*node.constraint);
        self.buffer.push(')');
    }

    fn visit_comparison(&mut self, node: &Comparison) {
        self.write(&node.operand1);
        self.buffer.push(' ');
        self.push(node.operator.symbol());
        self.buffer.push(' ');
        self.write(&node.operand2);
    }

    fn visit_child_node(&mut self, node: &ChildNode) {
        self.push_path_function("ISCHILDNODE", node.selector_name.as_ref(), &node.parent_path);
    }

    fn visit_descendant_node(&mut self, node: &DescendantNode) {
        self.push_path_function(
            "ISDESCENDANTNODE",
            node.selector_name.as_ref(),
            &node.ancestor_path,
        );
    }

    fn visit_same_node(&mut self, node: &SameNode) {
        self.push_path_function("ISSAMENODE", node.selector_name.as_ref(), &node.path);
    }

    fn visit_full_text_search(&mut self, node: &FullTextSearch) {
        self.push("CONTAINS(");
        match &node.property_name {
            Some(property) => self.push_qualified(node.selector_name.as_ref(), property),
            None => {
                if let Some(selector) = &node.selector_name {
                    self.push_name(selector.as_str());
                    self.buffer.push('.');
                }
                self.buffer.push('*');
            }
        }
        self.push(", ");
        self.push_quoted(&node.expression);
        self.buffer.push(')');
    }

    fn visit_property_existence(&mut self, node: &PropertyExistence) {
        self.push_qualified(node.selector_name.as_ref(), &node.property_name);
        self.push(" IS NOT NULL");
    }

    fn visit_property_value(&mut self, node: &PropertyValue) {
        self.push_qualified(node.selector_name.as_ref(), &node.property_name);
    }

    fn visit_length(&mut self, node: &Length) {
        self.push("LENGTH(");
        self.visit_property_value(&node.property_value);
        self.buffer.push(')');
    }

    fn visit_node_name(&mut self, node: &NodeName) {
        self.push_function("NAME", node.selector_name.as_ref());
    }

    fn visit_node_local_name(&mut self, node: &NodeLocalName) {
        self.push_function("LOCALNAME", node.selector_name.as_ref());
    }

    fn visit_node_depth(&mut self, node: &NodeDepth) {
        self.push_function("DEPTH", node.selector_name.as_ref());
    }

    fn visit_full_text_search_score(&mut self, node: &FullTextSearchScore) {
        self.push_function("SCORE", node.selector_name.as_ref());
    }

    fn visit_upper_case(&mut self, node: &UpperCase) {
        self.push("UPPER(");
        self.write(&*node.operand);
        self.buffer.push(')');
    }

    fn visit_lower_case(&mut self, node: &LowerCase) {
        self.push("LOWER(");
        self.write(&*node.operand);
        self.buffer.push(')');
    }

    fn visit_literal(&mut self, literal: &Literal) {
        let text = literal.value.to_string();
        let natural = match &literal.value {
            Value::Long(_) => Some(PropertyType::Long),
            Value::Double(d) if d.is_finite() => Some(PropertyType::Double),
            Value::Boolean(_) => Some(PropertyType::Boolean),
            Value::String(_) => Some(PropertyType::String),
            _ => None,
        };
        match natural {
            Some(ty) if ty == literal.declared_type => {
                if ty == PropertyType::String {
                    self.push_quoted(&text);
                } else {
                    self.push(&text);
                }
            }
            _ => {
                self.push("CAST(");
                self.push_quoted(&text);
                self.push(" AS ");
                self.push(literal.declared_type.as_str());
                self.buffer.push(')');
            }
        }
    }

    fn visit_bind_variable_name(&mut self, node: &BindVariableName) {
        self.buffer.push('$');
        self.push(&node.name);
    }

    fn visit_ordering(&mut self, node: &Ordering) {
        self.write(&node.operand);
        self.buffer.push(' ');
        self.push(node.order.symbol());
    }

    fn visit_column(&mut self, node: &Column) {
        match &node.property_name {
            Some(property) => self.push_qualified(node.selector_name.as_ref(), property),
            None => {
                if let Some(selector) = &node.selector_name {
                    self.push_name(selector.as_str());
                    self.buffer.push('.');
                }
                self.buffer.push('*');
            }
        }
        if let Some(alias) = &node.column_name {
            self.push(" AS ");
            self.push_name(alias);
        }
    }

    fn visit_limit(&mut self, limit: &Limit) {
        if limit.has_row_limit() {
            self.push(" LIMIT ");
            self.push(&limit.row_limit.to_string());
        }
        if limit.offset > 0 {
            self.push(" OFFSET ");
            self.push(&limit.offset.to_string());
        }
    }
}

/// Plain identifiers are rendered bare; anything else is bracketed.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
