//! Compiles a validated query into backend predicates.
//!
//! The compiled plan restricts every selector to the entries indexed under
//! its table and combines that with the compiled constraint. Views are
//! expanded into the predicate of their definition, and property references
//! through a view are mapped back onto the physical table's fields.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use reposearch_core::qom::{
    Comparison, Constraint, DynamicOperand, JoinCondition, JoinType, Limit, Operator, Order,
    Ordering, Query, SelectorName, Source, StaticOperand,
};
use reposearch_core::{
    Bindings, Column, Error, NoPaths, PathResolver, QueryConfig, Result, Schema, Value,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fields::{
    length_field, property_field, table_text_field, text_field, ANCESTOR_FIELD, DEPTH_FIELD,
    ID_FIELD, LOCAL_NAME_FIELD, NAME_FIELD, PARENT_FIELD, TABLE_FIELD,
};
use crate::operators::{compiler_for, OperandCompiler};
use crate::predicate::Predicate;
use crate::statement::render;
use crate::validation::{ValidatedQuery, ValidationOptions, Validator};

/// Views may be defined over views, up to this depth.
const MAX_VIEW_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Compare text case-sensitively unless the query applies UPPER/LOWER.
    pub case_sensitive: bool,
    pub validation: ValidationOptions,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            validation: ValidationOptions::default(),
        }
    }
}

impl From<&QueryConfig> for CompileOptions {
    fn from(config: &QueryConfig) -> Self {
        Self {
            case_sensitive: config.case_sensitive,
            validation: ValidationOptions::from(config),
        }
    }
}

/// A selector after view expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledSelector {
    pub name: String,
    /// Table or view named by the query.
    pub table: String,
    /// Physical table whose fields hold the selector's properties.
    pub index_table: String,
    /// View column names that differ from the physical property names.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub property_names: BTreeMap<String, String>,
    /// Matches the entries the selector ranges over.
    pub predicate: Predicate,
}

impl CompiledSelector {
    /// Physical property behind a (possibly view-level) column name.
    #[must_use]
    pub fn physical_property<'a>(&'a self, property: &'a str) -> &'a str {
        self.property_names
            .get(property)
            .map_or(property, String::as_str)
    }

    #[must_use]
    pub fn property_field(&self, property: &str) -> String {
        property_field(&self.index_table, self.physical_property(property))
    }

    #[must_use]
    pub fn length_field(&self, property: &str) -> String {
        length_field(&self.index_table, self.physical_property(property))
    }
}

/// Equality between a field of one selector and a field of another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledJoin {
    pub join_type: JoinType,
    pub left_selector: String,
    pub left_field: String,
    pub right_selector: String,
    pub right_field: String,
    /// Relative path from the right entry (ISSAMENODE with a path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Field(String),
    Score,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub selector: String,
    pub field: SortField,
    pub order: Order,
    pub case_sensitive: bool,
}

/// A projected result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultColumn {
    pub selector: String,
    pub property: String,
    /// Name of the column in the results.
    pub name: String,
    pub field: String,
}

/// Output of [`QueryCompiler::compile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    /// Canonical statement of the query.
    pub statement: String,
    pub selectors: Vec<CompiledSelector>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<CompiledJoin>,
    /// The compiled constraint alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Predicate>,
    /// Selector restrictions and constraint combined.
    pub predicate: Predicate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortKey>,
    pub columns: Vec<ResultColumn>,
    pub limit: Limit,
}

impl CompiledQuery {
    #[must_use]
    pub fn is_join(&self) -> bool {
        self.selectors.len() > 1
    }
}

/// Turns queries into [`CompiledQuery`] plans against one schema.
///
/// A compiler holds no per-query state, so one instance may compile many
/// queries, from several threads at once.
pub struct QueryCompiler<'s> {
    schema: &'s dyn Schema,
    paths: &'s dyn PathResolver,
    options: CompileOptions,
}

impl<'s> QueryCompiler<'s> {
    #[must_use]
    pub fn new(schema: &'s dyn Schema, options: CompileOptions) -> Self {
        Self {
            schema,
            paths: &NoPaths,
            options,
        }
    }

    /// Resolves ISCHILDNODE/ISDESCENDANTNODE/ISSAMENODE paths through
    /// `paths` (builder pattern).
    #[must_use]
    pub fn with_paths(mut self, paths: &'s dyn PathResolver) -> Self {
        self.paths = paths;
        self
    }

    #[must_use]
    pub const fn options(&self) -> CompileOptions {
        self.options
    }

    /// Validates and compiles `query`, resolving bind variables from
    /// `bindings`.
    pub fn compile(&self, query: &Query, bindings: &Bindings) -> Result<CompiledQuery> {
        let compiled = self.compile_at_depth(query, bindings, 0)?;
        debug!(statement = %compiled.statement, "compiled query");
        Ok(compiled)
    }

    fn compile_at_depth(
        &self,
        query: &Query,
        bindings: &Bindings,
        depth: usize,
    ) -> Result<CompiledQuery> {
        let validated = Validator::new(self.schema, self.options.validation).validate(query)?;

        let mut selectors = IndexMap::with_capacity(validated.selectors.len());
        for (name, table) in &validated.selectors {
            let selector = self.compile_selector(name, table, depth)?;
            selectors.insert(name.clone(), selector);
        }

        let scope = Scope {
            compiler: self,
            validated: &validated,
            selectors: &selectors,
            bindings,
        };

        let mut joins = Vec::new();
        scope.joins(&query.source, &mut joins)?;

        let constraint = query
            .constraint
            .as_ref()
            .map(|constraint| scope.constraint(constraint))
            .transpose()?;

        let mut clauses: Vec<Predicate> =
            selectors.values().map(|s| s.predicate.clone()).collect();
        clauses.extend(constraint.iter().cloned());
        let predicate = Predicate::must(clauses);

        let sort = query
            .orderings
            .iter()
            .map(|ordering| scope.sort_key(ordering))
            .collect::<Result<Vec<_>>>()?;
        let columns = scope.columns(query)?;

        Ok(CompiledQuery {
            statement: render(query),
            selectors: selectors.into_values().collect(),
            joins,
            constraint,
            predicate,
            sort,
            columns,
            limit: query.limit,
        })
    }

    fn compile_selector(
        &self,
        name: &SelectorName,
        table_name: &str,
        depth: usize,
    ) -> Result<CompiledSelector> {
        let table = self
            .schema
            .table(table_name)
            .ok_or_else(|| Error::invalid_query(format!("table '{table_name}' does not exist")))?;

        let Some(view) = table.as_view() else {
            return Ok(CompiledSelector {
                name: name.to_string(),
                table: table_name.to_string(),
                index_table: table_name.to_string(),
                property_names: BTreeMap::new(),
                predicate: Predicate::term(TABLE_FIELD, table_name, true),
            });
        };

        if depth >= MAX_VIEW_DEPTH {
            return Err(Error::invalid_query(format!(
                "view '{table_name}' is nested more than {MAX_VIEW_DEPTH} levels deep"
            )));
        }
        if matches!(view.definition.source, Source::Join(_)) {
            return Err(Error::invalid_query(format!(
                "view '{table_name}' is defined over a join and cannot be queried"
            )));
        }

        let definition = self.compile_at_depth(view.definition, &Bindings::new(), depth + 1)?;
        let source = definition.selectors.into_iter().next().ok_or_else(|| {
            Error::invalid_query(format!("view '{table_name}' has no source table"))
        })?;

        let mut property_names = BTreeMap::new();
        for column in &view.definition.columns {
            if let Some(property) = &column.property_name {
                let physical = source.physical_property(property).to_string();
                property_names.insert(column.resolved_name(), physical);
            }
        }
        for (column, physical) in &source.property_names {
            property_names
                .entry(column.clone())
                .or_insert_with(|| physical.clone());
        }
        property_names.retain(|column, physical| column != physical);

        debug!(view = table_name, table = %source.index_table, "expanded view");
        Ok(CompiledSelector {
            name: name.to_string(),
            table: table_name.to_string(),
            index_table: source.index_table,
            property_names,
            predicate: definition.predicate,
        })
    }
}

/// Per-query state threaded through constraint compilation.
struct Scope<'c, 's> {
    compiler: &'c QueryCompiler<'s>,
    validated: &'c ValidatedQuery,
    selectors: &'c IndexMap<SelectorName, CompiledSelector>,
    bindings: &'c Bindings,
}

impl Scope<'_, '_> {
    fn selector(&self, name: Option<&SelectorName>) -> Result<&CompiledSelector> {
        self.validated
            .selector(name)
            .and_then(|resolved| self.selectors.get(resolved))
            .ok_or_else(|| match name {
                Some(name) => Error::invalid_query(format!("selector '{name}' is not declared")),
                None => Error::invalid_query("reference must name its selector"),
            })
    }

    fn column(&self, selector: &CompiledSelector, property: &str) -> Option<&Column> {
        self.compiler
            .schema
            .table(&selector.table)
            .and_then(|table| table.column(property))
    }

    fn joins(&self, source: &Source, output: &mut Vec<CompiledJoin>) -> Result<()> {
        let Source::Join(join) = source else {
            return Ok(());
        };
        self.joins(&join.left, output)?;
        self.joins(&join.right, output)?;

        let (left, left_field, right, right_field, right_path) = match &join.condition {
            JoinCondition::ChildNode(c) => (
                &c.child_selector,
                PARENT_FIELD.to_string(),
                &c.parent_selector,
                ID_FIELD.to_string(),
                None,
            ),
            JoinCondition::DescendantNode(c) => (
                &c.descendant_selector,
                ANCESTOR_FIELD.to_string(),
                &c.ancestor_selector,
                ID_FIELD.to_string(),
                None,
            ),
            JoinCondition::Equi(c) => (
                &c.selector1,
                self.selector(Some(&c.selector1))?.property_field(&c.property1),
                &c.selector2,
                self.selector(Some(&c.selector2))?.property_field(&c.property2),
                None,
            ),
            JoinCondition::SameNode(c) => (
                &c.selector1,
                ID_FIELD.to_string(),
                &c.selector2,
                ID_FIELD.to_string(),
                c.selector2_path.clone(),
            ),
        };

        output.push(CompiledJoin {
            join_type: join.join_type,
            left_selector: left.to_string(),
            left_field,
            right_selector: right.to_string(),
            right_field,
            right_path,
        });
        Ok(())
    }

    fn constraint(&self, constraint: &Constraint) -> Result<Predicate> {
        match constraint {
            Constraint::And(and) => Ok(Predicate::must(vec![
                self.constraint(&and.left)?,
                self.constraint(&and.right)?,
            ])),
            Constraint::Or(or) => Ok(Predicate::should(vec![
                self.constraint(&or.left)?,
                self.constraint(&or.right)?,
            ])),
            Constraint::Not(not) => Ok(Predicate::not(self.constraint(&not.constraint)?)),
            Constraint::Comparison(comparison) => self.comparison(comparison),
            Constraint::ChildNode(c) => {
                self.selector(c.selector_name.as_ref())?;
                Ok(self.path_term(PARENT_FIELD, &c.parent_path))
            }
            Constraint::DescendantNode(c) => {
                self.selector(c.selector_name.as_ref())?;
                Ok(self.path_term(ANCESTOR_FIELD, &c.ancestor_path))
            }
            Constraint::SameNode(c) => {
                self.selector(c.selector_name.as_ref())?;
                Ok(self.path_term(ID_FIELD, &c.path))
            }
            Constraint::FullTextSearch(c) => {
                let selector = self.selector(c.selector_name.as_ref())?;
                let field = match &c.property_name {
                    Some(property) => {
                        text_field(&selector.index_table, selector.physical_property(property))
                    }
                    None => table_text_field(&selector.index_table),
                };
                Ok(Predicate::full_text(field, c.expression.clone()))
            }
            Constraint::PropertyExistence(c) => {
                let selector = self.selector(c.selector_name.as_ref())?;
                Ok(Predicate::exists(selector.property_field(&c.property_name)))
            }
        }
    }

    /// Term on the identifier the path resolves to; nothing matches a path
    /// that does not exist.
    fn path_term(&self, field: &str, path: &str) -> Predicate {
        match self.compiler.paths.resolve(path) {
            Some(identifier) => Predicate::term(field, identifier, true),
            None => {
                debug!(path, "path does not resolve to an entry");
                Predicate::MatchNone
            }
        }
    }

    fn comparison(&self, comparison: &Comparison) -> Result<Predicate> {
        self.check_operator(&comparison.operand1, comparison.operator)?;
        let value = self.static_value(&comparison.operand2)?;
        self.operand(
            &comparison.operand1,
            comparison.operator,
            value,
            self.compiler.options.case_sensitive,
        )
    }

    fn static_value(&self, operand: &StaticOperand) -> Result<Value> {
        match operand {
            StaticOperand::Literal(literal) => Ok(literal.value.clone()),
            StaticOperand::BindVariable(variable) => {
                self.bindings.get(&variable.name).cloned().ok_or_else(|| {
                    Error::invalid_query(format!(
                        "no value is bound to variable '${}'",
                        variable.name
                    ))
                })
            }
        }
    }

    /// Fails when the column behind `operand` does not allow `operator`.
    fn check_operator(&self, operand: &DynamicOperand, operator: Operator) -> Result<()> {
        let property = match operand {
            DynamicOperand::PropertyValue(pv) => pv,
            DynamicOperand::Length(length) => &length.property_value,
            DynamicOperand::UpperCase(upper) => return self.check_operator(&upper.operand, operator),
            DynamicOperand::LowerCase(lower) => return self.check_operator(&lower.operand, operator),
            _ => return Ok(()),
        };
        let selector = self.selector(property.selector_name.as_ref())?;
        match self.column(selector, &property.property_name) {
            Some(column) if !column.supports(operator) => Err(Error::invalid_query(format!(
                "operator {} is not available for column '{}' of table '{}'",
                operator.name(),
                column.name,
                selector.table
            ))),
            _ => Ok(()),
        }
    }

    fn operand(
        &self,
        operand: &DynamicOperand,
        operator: Operator,
        value: Value,
        case_sensitive: bool,
    ) -> Result<Predicate> {
        match operand {
            DynamicOperand::UpperCase(upper) => {
                return self.case_mapped(&upper.operand, operator, value, str::to_uppercase);
            }
            DynamicOperand::LowerCase(lower) => {
                return self.case_mapped(&lower.operand, operator, value, str::to_lowercase);
            }
            _ => {}
        }

        let compiler = compiler_for(operator, value, case_sensitive);
        match operand {
            DynamicOperand::PropertyValue(pv) => {
                let selector = self.selector(pv.selector_name.as_ref())?;
                let column_type = self
                    .column(selector, &pv.property_name)
                    .map(|column| column.property_type);
                compiler.property_value(&selector.property_field(&pv.property_name), column_type)
            }
            DynamicOperand::Length(length) => {
                let property = &length.property_value;
                let selector = self.selector(property.selector_name.as_ref())?;
                compiler.length(&selector.length_field(&property.property_name))
            }
            DynamicOperand::NodeName(_) => compiler.node_name(),
            DynamicOperand::NodeLocalName(_) => compiler.node_local_name(),
            DynamicOperand::NodeDepth(_) => compiler.node_depth(),
            DynamicOperand::FullTextSearchScore(_) => Err(compiler.unsupported("SCORE")),
            DynamicOperand::UpperCase(_) | DynamicOperand::LowerCase(_) => {
                Err(compiler.unsupported(operand.kind()))
            }
        }
    }

    /// `UPPER(x) op v` and `LOWER(x) op v`.
    ///
    /// The mapped operand only holds text in the target case, so it can never
    /// equal or match a literal with characters outside that case. Any other
    /// literal is compared as written against the case-folded terms.
    fn case_mapped(
        &self,
        operand: &DynamicOperand,
        operator: Operator,
        value: Value,
        change: fn(&str) -> String,
    ) -> Result<Predicate> {
        // Only the outermost function decides the case of the result
        let mut operand = operand;
        loop {
            operand = match operand {
                DynamicOperand::UpperCase(inner) => &*inner.operand,
                DynamicOperand::LowerCase(inner) => &*inner.operand,
                _ => break,
            };
        }
        let in_target_case = value.as_text().map_or(true, |text| change(text) == text);
        if !in_target_case {
            match operator {
                Operator::EqualTo | Operator::Like => {
                    debug!(operator = operator.name(), "literal is outside the mapped case");
                    return Ok(Predicate::MatchNone);
                }
                // Nothing is excluded: every entry with a value differs
                Operator::NotEqualTo => {
                    return self.operand(operand, Operator::Like, Value::from("%"), true);
                }
                _ => {}
            }
        }
        self.operand(operand, operator, value, false)
    }

    fn sort_key(&self, ordering: &Ordering) -> Result<SortKey> {
        let (selector, field, case_sensitive) =
            self.sort_field(&ordering.operand, self.compiler.options.case_sensitive)?;
        Ok(SortKey {
            selector,
            field,
            order: ordering.order,
            case_sensitive,
        })
    }

    fn sort_field(
        &self,
        operand: &DynamicOperand,
        case_sensitive: bool,
    ) -> Result<(String, SortField, bool)> {
        let selector = self.selector(operand.selector_name())?;
        let field = match operand {
            DynamicOperand::PropertyValue(pv) => {
                SortField::Field(selector.property_field(&pv.property_name))
            }
            DynamicOperand::Length(length) => {
                SortField::Field(selector.length_field(&length.property_value.property_name))
            }
            DynamicOperand::NodeName(_) => SortField::Field(NAME_FIELD.to_string()),
            DynamicOperand::NodeLocalName(_) => SortField::Field(LOCAL_NAME_FIELD.to_string()),
            DynamicOperand::NodeDepth(_) => SortField::Field(DEPTH_FIELD.to_string()),
            DynamicOperand::FullTextSearchScore(_) => SortField::Score,
            DynamicOperand::UpperCase(upper) => return self.sort_field(&upper.operand, false),
            DynamicOperand::LowerCase(lower) => return self.sort_field(&lower.operand, false),
        };
        Ok((selector.name.clone(), field, case_sensitive))
    }

    fn columns(&self, query: &Query) -> Result<Vec<ResultColumn>> {
        let qualify = self.selectors.len() > 1;
        let mut columns = Vec::new();

        if query.columns.is_empty() {
            for selector in self.selectors.values() {
                self.all_columns(selector, qualify, &mut columns);
            }
            return Ok(columns);
        }

        for column in &query.columns {
            let selector = self.selector(column.selector_name.as_ref())?;
            match &column.property_name {
                Some(property) => columns.push(ResultColumn {
                    selector: selector.name.clone(),
                    property: property.clone(),
                    name: column.resolved_name(),
                    field: selector.property_field(property),
                }),
                None => self.all_columns(selector, qualify, &mut columns),
            }
        }
        Ok(columns)
    }

    fn all_columns(&self, selector: &CompiledSelector, qualify: bool, output: &mut Vec<ResultColumn>) {
        let Some(table) = self.compiler.schema.table(&selector.table) else {
            return;
        };
        for column in table.columns() {
            let name = if qualify {
                format!("{}.{}", selector.name, column.name)
            } else {
                column.name.clone()
            };
            output.push(ResultColumn {
                selector: selector.name.clone(),
                property: column.name.clone(),
                name,
                field: selector.property_field(&column.name),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use reposearch_core::qom::{
        BindVariableName, ChildNode, ChildNodeJoinCondition, Column as QueryColumn, Join,
        Length, Literal, LowerCase, NodeName, PropertyExistence, PropertyValue, Selector,
        UpperCase,
    };
    use reposearch_core::{InMemorySchema, PropertyType};

    use crate::encoding::encode_long;
    use crate::predicate::RangeBound;

    fn schema() -> InMemorySchema {
        let mut builder = InMemorySchema::builder();
        builder
            .add_table("doc", ["title", "body"])
            .add_column("doc", "pages", PropertyType::Long, false, Operator::ALL)
            .add_column(
                "doc",
                "status",
                PropertyType::String,
                false,
                [Operator::EqualTo, Operator::NotEqualTo],
            )
            .make_searchable("doc", "body")
            .add_table("folder", ["title"])
            .add_view(
                "report",
                Query::new(Selector::new("doc").with_alias("d"))
                    .with_constraint(PropertyExistence::new("d", "status"))
                    .with_column(QueryColumn::new("d", "title").with_alias("heading")),
            );
        builder.build().unwrap()
    }

    fn compile(query: &Query) -> Result<CompiledQuery> {
        let schema = schema();
        QueryCompiler::new(&schema, CompileOptions::default()).compile(query, &Bindings::new())
    }

    fn doc() -> Query {
        Query::new(Selector::new("doc").with_alias("d"))
    }

    #[test]
    fn test_selector_restricts_to_table() {
        let compiled = compile(&doc()).unwrap();
        assert_eq!(compiled.statement, "SELECT * FROM doc AS d");
        assert_eq!(
            compiled.predicate,
            Predicate::must(vec![Predicate::term(TABLE_FIELD, "doc", true)])
        );
        let names: Vec<_> = compiled.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["title", "body", "pages", "status"]);
    }

    #[test]
    fn test_comparison_casts_to_column_type() {
        let query = doc().with_constraint(Comparison::new(
            PropertyValue::new("d", "pages"),
            Operator::GreaterThanOrEqualTo,
            Literal::new("10"),
        ));
        let compiled = compile(&query).unwrap();
        assert_eq!(
            compiled.constraint,
            Some(Predicate::range(
                "doc.pages",
                RangeBound::Included(encode_long(10)),
                RangeBound::Unbounded,
                true
            ))
        );
    }

    #[test]
    fn test_operator_legality_names_operator_and_column() {
        let query = doc().with_constraint(Comparison::new(
            PropertyValue::new("d", "status"),
            Operator::GreaterThan,
            Literal::new("a"),
        ));
        let message = compile(&query).unwrap_err().to_string();
        assert!(message.contains("GREATER_THAN"), "{message}");
        assert!(message.contains("'status'"), "{message}");

        let query = doc().with_constraint(Comparison::new(
            UpperCase::new(PropertyValue::new("d", "status")),
            Operator::Like,
            Literal::new("A%"),
        ));
        assert!(compile(&query).unwrap_err().to_string().contains("LIKE"));
    }

    #[test]
    fn test_bind_variables() {
        let schema = schema();
        let compiler = QueryCompiler::new(&schema, CompileOptions::default());
        let query = doc().with_constraint(Comparison::new(
            PropertyValue::new("d", "title"),
            Operator::EqualTo,
            BindVariableName::new("title"),
        ));

        let err = compiler.compile(&query, &Bindings::new()).unwrap_err();
        assert!(err.to_string().contains("'$title'"));

        let mut bindings = Bindings::new();
        bindings.insert("title".to_string(), Value::from("Apollo 11"));
        let compiled = compiler.compile(&query, &bindings).unwrap();
        assert_eq!(
            compiled.constraint,
            Some(Predicate::term("doc.title", "Apollo 11", true))
        );
    }

    fn case_constraint(
        operand: impl Into<DynamicOperand>,
        operator: Operator,
        literal: &str,
    ) -> Option<Predicate> {
        let query =
            doc().with_constraint(Comparison::new(operand, operator, Literal::new(literal)));
        compile(&query).unwrap().constraint
    }

    #[test]
    fn test_case_functions_compare_in_mapped_case() {
        let lower = || LowerCase::new(PropertyValue::new("d", "title"));
        let upper = || UpperCase::new(PropertyValue::new("d", "title"));

        assert_eq!(
            case_constraint(lower(), Operator::EqualTo, "apollo"),
            Some(Predicate::term("doc.title", "apollo", false))
        );
        assert_eq!(
            case_constraint(upper(), Operator::EqualTo, "APOLLO"),
            Some(Predicate::term("doc.title", "apollo", false))
        );
        assert_eq!(
            case_constraint(upper(), Operator::EqualTo, "Apollo"),
            Some(Predicate::MatchNone)
        );
        assert_eq!(
            case_constraint(lower(), Operator::Like, "Apo%"),
            Some(Predicate::MatchNone)
        );
        assert_eq!(
            case_constraint(upper(), Operator::NotEqualTo, "Apollo"),
            Some(Predicate::exists("doc.title"))
        );
    }

    #[test]
    fn test_outer_case_function_decides() {
        let nested = UpperCase::new(LowerCase::new(PropertyValue::new("d", "title")));
        assert_eq!(
            case_constraint(nested, Operator::EqualTo, "APOLLO"),
            Some(Predicate::term("doc.title", "apollo", false))
        );
    }

    #[test]
    fn test_length_and_name() {
        let query = doc().with_constraint(
            Constraint::from(Comparison::new(
                Length::new(PropertyValue::new("d", "title")),
                Operator::EqualTo,
                Literal::new(9_i64),
            ))
            .and(Comparison::new(
                NodeName::new("d"),
                Operator::NotEqualTo,
                Literal::new("draft"),
            )),
        );
        let compiled = compile(&query).unwrap();
        let Some(Predicate::Boolean { must, .. }) = compiled.constraint else {
            panic!("expected a conjunction");
        };
        assert_eq!(
            must[0],
            Predicate::term("doc.title$length", encode_long(9), true)
        );
        assert!(matches!(must[1], Predicate::Boolean { .. }));
    }

    #[test]
    fn test_paths_resolve_through_resolver() {
        let schema = schema();
        let paths: HashMap<String, String> =
            [("/projects".to_string(), "id-7".to_string())].into();
        let compiler = QueryCompiler::new(&schema, CompileOptions::default()).with_paths(&paths);

        let query = doc().with_constraint(ChildNode::new("d", "/projects"));
        let compiled = compiler.compile(&query, &Bindings::new()).unwrap();
        assert_eq!(
            compiled.constraint,
            Some(Predicate::term(PARENT_FIELD, "id-7", true))
        );

        let query = doc().with_constraint(ChildNode::new("d", "/missing"));
        let compiled = compiler.compile(&query, &Bindings::new()).unwrap();
        assert_eq!(compiled.constraint, Some(Predicate::MatchNone));
    }

    #[test]
    fn test_views_expand_to_their_source() {
        let query = Query::new(Selector::new("report").with_alias("r")).with_constraint(
            Comparison::new(
                PropertyValue::new("r", "heading"),
                Operator::EqualTo,
                Literal::new("Q3"),
            ),
        );
        let compiled = compile(&query).unwrap();
        let selector = &compiled.selectors[0];
        assert_eq!(selector.index_table, "doc");
        assert_eq!(selector.physical_property("heading"), "title");
        assert_eq!(
            selector.predicate,
            Predicate::must(vec![
                Predicate::term(TABLE_FIELD, "doc", true),
                Predicate::exists("doc.status"),
            ])
        );
        assert_eq!(
            compiled.constraint,
            Some(Predicate::term("doc.title", "Q3", true))
        );
    }

    #[test]
    fn test_join_compiles_condition_fields() {
        let query = Query::new(Join::new(
            Selector::new("doc").with_alias("d"),
            JoinType::Inner,
            Selector::new("folder").with_alias("f"),
            ChildNodeJoinCondition::new("d", "f"),
        ));
        let compiled = compile(&query).unwrap();
        assert!(compiled.is_join());
        assert_eq!(
            compiled.joins,
            vec![CompiledJoin {
                join_type: JoinType::Inner,
                left_selector: "d".into(),
                left_field: PARENT_FIELD.into(),
                right_selector: "f".into(),
                right_field: ID_FIELD.into(),
                right_path: None,
            }]
        );
        assert!(compiled.columns.iter().any(|c| c.name == "f.title"));
    }

    #[test]
    fn test_score_ordering_and_comparison() {
        let query = doc().order_by(Ordering::descending(
            reposearch_core::qom::FullTextSearchScore::new("d"),
        ));
        let compiled = compile(&query).unwrap();
        assert_eq!(compiled.sort[0].field, SortField::Score);

        let query = doc().with_constraint(Comparison::new(
            reposearch_core::qom::FullTextSearchScore::new("d"),
            Operator::GreaterThan,
            Literal::new(0.5),
        ));
        assert!(compile(&query).unwrap_err().to_string().contains("SCORE"));
    }
}
