//! Structural and schema validation of a query.
//!
//! [`Validator`] walks the whole tree once. Every problem found is collected,
//! and the walk never stops early, so a single error lists everything wrong
//! with the query in the order the problems were encountered.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use reposearch_core::qom::{
    BindVariableName, ChildNode, ChildNodeJoinCondition, Column, Comparison, DescendantNode,
    DescendantNodeJoinCondition, DynamicOperand, EquiJoinCondition, FullTextSearch,
    FullTextSearchScore, NodeDepth, NodeLocalName, NodeName, PropertyExistence, PropertyValue,
    Query, SameNode, SameNodeJoinCondition, Selector, SelectorName, StaticOperand,
};
use reposearch_core::{Error, QueryConfig, Result, Schema, Table};
use tracing::debug;

use crate::visitor::{walk_all, Visitor};

/// Switches for the schema checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Reject property references that are not columns of the selector's table.
    pub validate_columns: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            validate_columns: true,
        }
    }
}

impl From<&QueryConfig> for ValidationOptions {
    fn from(config: &QueryConfig) -> Self {
        Self {
            validate_columns: config.validate_columns,
        }
    }
}

/// What validation learned about a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedQuery {
    /// Selector name to table name, in declaration order.
    pub selectors: IndexMap<SelectorName, String>,
    pub bind_variables: BTreeSet<String>,
    /// Result columns by resolved name.
    pub columns: IndexMap<String, Column>,
}

impl ValidatedQuery {
    /// Resolves an optional selector reference to a declared selector name.
    ///
    /// A missing name resolves to the only selector of a single-source query.
    #[must_use]
    pub fn selector<'a>(&'a self, name: Option<&'a SelectorName>) -> Option<&'a SelectorName> {
        match name {
            Some(name) => self.selectors.get_key_value(name).map(|(key, _)| key),
            None if self.selectors.len() == 1 => self.selectors.keys().next(),
            None => None,
        }
    }

    /// Table name behind an optional selector reference.
    #[must_use]
    pub fn table_of(&self, name: Option<&SelectorName>) -> Option<&str> {
        let selector = self.selector(name)?;
        self.selectors.get(selector).map(String::as_str)
    }

    #[must_use]
    pub fn is_join(&self) -> bool {
        self.selectors.len() > 1
    }
}

/// Checks a query against a schema.
pub struct Validator<'s> {
    schema: &'s dyn Schema,
    options: ValidationOptions,
    result: ValidatedQuery,
    problems: Vec<String>,
}

impl<'s> Validator<'s> {
    #[must_use]
    pub fn new(schema: &'s dyn Schema, options: ValidationOptions) -> Self {
        Self {
            schema,
            options,
            result: ValidatedQuery::default(),
            problems: Vec::new(),
        }
    }

    /// Validates `query`, returning everything learned about it or an
    /// `InvalidQuery` error listing every problem.
    pub fn validate(mut self, query: &Query) -> Result<ValidatedQuery> {
        walk_all(query, &mut self);

        if self.problems.is_empty() {
            debug!(selectors = self.result.selectors.len(), "query is valid");
            Ok(self.result)
        } else {
            debug!(problems = self.problems.len(), "query is invalid");
            Err(Error::invalid_query(self.problems.join("; ")))
        }
    }

    fn problem(&mut self, message: String) {
        self.problems.push(message);
    }

    /// Resolves a selector reference, recording a problem when it is unknown
    /// or ambiguous.
    fn resolve(&mut self, name: Option<&SelectorName>, context: &str) -> Option<SelectorName> {
        if let Some(resolved) = self.result.selector(name) {
            return Some(resolved.clone());
        }
        let message = match name {
            Some(name) => format!("{context} references undeclared selector '{name}'"),
            None => format!(
                "{context} must name its selector when the query has {} selectors",
                self.result.selectors.len()
            ),
        };
        self.problem(message);
        None
    }

    fn table(&self, selector: &SelectorName) -> Option<&'s Table> {
        let schema: &'s dyn Schema = self.schema;
        self.result
            .selectors
            .get(selector)
            .and_then(|table| schema.table(table))
    }

    /// Resolves the selector of a property reference and checks the column.
    fn check_property(
        &mut self,
        name: Option<&SelectorName>,
        property: &str,
        context: &str,
    ) -> Option<&'s reposearch_core::Column> {
        let selector = self.resolve(name, context)?;
        let table = self.table(&selector)?;
        match table.column(property) {
            Some(column) => Some(column),
            None => {
                if self.options.validate_columns {
                    self.problem(format!(
                        "column '{property}' does not exist on table '{}' (selector '{selector}')",
                        table.name
                    ));
                }
                None
            }
        }
    }

    fn check_pair(&mut self, first: &SelectorName, second: &SelectorName, context: &str) {
        self.resolve(Some(first), context);
        self.resolve(Some(second), context);
        if first == second {
            self.problem(format!(
                "{context} must relate two different selectors, but references '{first}' twice"
            ));
        }
    }
}

impl Visitor for Validator<'_> {
    fn visit_selector(&mut self, selector: &Selector) {
        let name = selector.name().clone();
        let table = selector.node_type_name.as_str();
        if self.result.selectors.contains_key(&name) {
            self.problem(format!("selector '{name}' is declared more than once"));
            return;
        }
        if self.schema.table(table).is_none() {
            self.problem(format!(
                "table '{table}' of selector '{name}' does not exist"
            ));
        }
        self.result.selectors.insert(name, table.to_string());
    }

    fn visit_child_node_join_condition(&mut self, node: &ChildNodeJoinCondition) {
        self.check_pair(&node.child_selector, &node.parent_selector, "ISCHILDNODE join");
    }

    fn visit_descendant_node_join_condition(&mut self, node: &DescendantNodeJoinCondition) {
        self.check_pair(
            &node.descendant_selector,
            &node.ancestor_selector,
            "ISDESCENDANTNODE join",
        );
    }

    fn visit_equi_join_condition(&mut self, node: &EquiJoinCondition) {
        if node.selector1 == node.selector2 {
            self.check_pair(&node.selector1, &node.selector2, "equi-join");
            return;
        }
        self.check_property(Some(&node.selector1), &node.property1, "equi-join");
        self.check_property(Some(&node.selector2), &node.property2, "equi-join");
    }

    fn visit_same_node_join_condition(&mut self, node: &SameNodeJoinCondition) {
        self.check_pair(&node.selector1, &node.selector2, "ISSAMENODE join");
    }

    fn visit_comparison(&mut self, node: &Comparison) {
        if let (DynamicOperand::NodeName(name), StaticOperand::Literal(literal)) =
            (&node.operand1, &node.operand2)
        {
            let ty = literal.declared_type;
            if ty.is_numeric() || ty == reposearch_core::PropertyType::Boolean {
                let selector = name
                    .selector_name
                    .as_ref()
                    .map_or_else(String::new, ToString::to_string);
                self.problem(format!(
                    "NAME({selector}) cannot be compared with a {ty} literal"
                ));
            }
        }
    }

    fn visit_child_node(&mut self, node: &ChildNode) {
        self.resolve(node.selector_name.as_ref(), "ISCHILDNODE");
    }

    fn visit_descendant_node(&mut self, node: &DescendantNode) {
        self.resolve(node.selector_name.as_ref(), "ISDESCENDANTNODE");
    }

    fn visit_same_node(&mut self, node: &SameNode) {
        self.resolve(node.selector_name.as_ref(), "ISSAMENODE");
    }

    fn visit_full_text_search(&mut self, node: &FullTextSearch) {
        let Some(property) = &node.property_name else {
            self.resolve(node.selector_name.as_ref(), "CONTAINS");
            return;
        };
        let Some(column) = self.check_property(node.selector_name.as_ref(), property, "CONTAINS")
        else {
            return;
        };
        if !column.full_text_searchable {
            self.problem(format!(
                "column '{property}' is not full-text searchable"
            ));
        }
    }

    fn visit_property_existence(&mut self, node: &PropertyExistence) {
        self.check_property(
            node.selector_name.as_ref(),
            &node.property_name,
            "IS NOT NULL",
        );
    }

    fn visit_property_value(&mut self, node: &PropertyValue) {
        self.check_property(
            node.selector_name.as_ref(),
            &node.property_name,
            "property reference",
        );
    }

    fn visit_node_name(&mut self, node: &NodeName) {
        self.resolve(node.selector_name.as_ref(), "NAME");
    }

    fn visit_node_local_name(&mut self, node: &NodeLocalName) {
        self.resolve(node.selector_name.as_ref(), "LOCALNAME");
    }

    fn visit_node_depth(&mut self, node: &NodeDepth) {
        self.resolve(node.selector_name.as_ref(), "DEPTH");
    }

    fn visit_full_text_search_score(&mut self, node: &FullTextSearchScore) {
        self.resolve(node.selector_name.as_ref(), "SCORE");
    }

    fn visit_bind_variable_name(&mut self, node: &BindVariableName) {
        self.result.bind_variables.insert(node.name.clone());
    }

    fn visit_column(&mut self, node: &Column) {
        match &node.property_name {
            Some(property) => {
                self.check_property(node.selector_name.as_ref(), property, "column");
            }
            None => {
                self.resolve(node.selector_name.as_ref(), "column");
            }
        }
        self.result
            .columns
            .insert(node.resolved_name(), node.clone());
    }
}
