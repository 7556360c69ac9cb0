//! Schema model: the tables (node types) a query may select from, their
//! columns, and which comparison operators each column supports.
//!
//! [`InMemorySchema`] is immutable once built. Changes go through
//! [`InMemorySchema::with_table`] (which returns a new schema) or through a
//! [`SchemaHandle`], which swaps whole snapshots so a compilation in flight
//! never observes a half-applied change.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::qom::{Operator, Query};
use crate::value::PropertyType;

/// Read access to the queryable tables.
pub trait Schema: Send + Sync {
    /// Looks a table (or view) up by name.
    fn table(&self, name: &str) -> Option<&Table>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub property_type: PropertyType,
    #[serde(default)]
    pub full_text_searchable: bool,
    pub available_operators: BTreeSet<Operator>,
}

impl Column {
    /// A column supporting every operator.
    #[must_use]
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            full_text_searchable: false,
            available_operators: Operator::ALL.into_iter().collect(),
        }
    }

    /// Restricts the operators (builder pattern).
    #[must_use]
    pub fn with_operators(mut self, operators: impl IntoIterator<Item = Operator>) -> Self {
        self.available_operators = operators.into_iter().collect();
        self
    }

    /// Marks the column as full-text searchable (builder pattern).
    #[must_use]
    pub fn searchable(mut self) -> Self {
        self.full_text_searchable = true;
        self
    }

    #[must_use]
    pub fn supports(&self, operator: Operator) -> bool {
        self.available_operators.contains(&operator)
    }

    /// Supported operators in declaration order.
    #[must_use]
    pub fn available_operators(&self) -> Vec<Operator> {
        self.available_operators.iter().copied().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: IndexMap<String, Column>,
    /// Present when the table is a view defined by a query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Box<Query>>,
}

impl Table {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            definition: None,
        }
    }

    /// Adds or replaces a column (builder pattern).
    #[must_use]
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.insert(column.name.clone(), column);
        self
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    #[must_use]
    pub fn is_view(&self) -> bool {
        self.definition.is_some()
    }

    /// Returns this table as a view, if it is one.
    #[must_use]
    pub fn as_view(&self) -> Option<View<'_>> {
        self.definition.as_deref().map(|definition| View {
            table: self,
            definition,
        })
    }
}

/// A table whose rows are defined by a query over other tables.
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    pub table: &'a Table,
    pub definition: &'a Query,
}

/// Immutable schema snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemorySchema {
    tables: Arc<HashMap<String, Table>>,
}

impl InMemorySchema {
    #[must_use]
    pub fn builder() -> InMemorySchemaBuilder {
        InMemorySchemaBuilder::default()
    }

    /// Returns a new schema with `table` added or replaced; `self` is unchanged.
    #[must_use]
    pub fn with_table(&self, table: Table) -> Self {
        let mut tables = (*self.tables).clone();
        tables.insert(table.name.clone(), table);
        Self {
            tables: Arc::new(tables),
        }
    }

    /// Returns a new schema without the named table; `self` is unchanged.
    #[must_use]
    pub fn without_table(&self, name: &str) -> Self {
        let mut tables = (*self.tables).clone();
        tables.remove(name);
        Self {
            tables: Arc::new(tables),
        }
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Schema for InMemorySchema {
    fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
}

/// Accumulates tables and columns, snapshotting them on [`build`](Self::build).
#[derive(Debug, Default)]
pub struct InMemorySchemaBuilder {
    tables: IndexMap<String, Table>,
    views: Vec<(String, Query)>,
    problems: Vec<String>,
}

impl InMemorySchemaBuilder {
    /// Adds a table whose columns are STRING-typed and support every operator.
    pub fn add_table<I, S>(&mut self, name: impl Into<String>, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Table::new(name);
        for column in columns {
            table = table.with_column(Column::new(column, PropertyType::String));
        }
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Adds (or replaces) a column on a table previously added.
    pub fn add_column(
        &mut self,
        table: &str,
        column: impl Into<String>,
        property_type: PropertyType,
        full_text_searchable: bool,
        operators: impl IntoIterator<Item = Operator>,
    ) -> &mut Self {
        let column = column.into();
        match self.tables.get_mut(table) {
            Some(existing) => {
                let mut definition = Column::new(column, property_type).with_operators(operators);
                definition.full_text_searchable = full_text_searchable;
                existing.columns.insert(definition.name.clone(), definition);
            }
            None => self
                .problems
                .push(format!("cannot add column '{column}' to unknown table '{table}'")),
        }
        self
    }

    /// Marks an existing column as full-text searchable.
    pub fn make_searchable(&mut self, table: &str, column: &str) -> &mut Self {
        match self
            .tables
            .get_mut(table)
            .and_then(|t| t.columns.get_mut(column))
        {
            Some(existing) => existing.full_text_searchable = true,
            None => self.problems.push(format!(
                "cannot make unknown column '{column}' of table '{table}' searchable"
            )),
        }
        self
    }

    /// Adds a view defined by `definition`. Its columns are resolved from the
    /// definition's source tables when the schema is built.
    pub fn add_view(&mut self, name: impl Into<String>, definition: Query) -> &mut Self {
        self.views.push((name.into(), definition));
        self
    }

    /// Snapshots the accumulated tables into an immutable schema.
    pub fn build(&self) -> Result<InMemorySchema> {
        let mut problems = self.problems.clone();
        let mut tables: HashMap<String, Table> = self
            .tables
            .iter()
            .map(|(name, table)| (name.clone(), table.clone()))
            .collect();

        for (name, definition) in &self.views {
            match resolve_view(name, definition, &tables) {
                Ok(view) => {
                    tables.insert(name.clone(), view);
                }
                Err(problem) => problems.push(problem),
            }
        }

        if !problems.is_empty() {
            return Err(Error::invalid_query(problems.join("; ")));
        }

        debug!(tables = tables.len(), "built schema");
        Ok(InMemorySchema {
            tables: Arc::new(tables),
        })
    }
}

fn resolve_view(
    name: &str,
    definition: &Query,
    tables: &HashMap<String, Table>,
) -> std::result::Result<Table, String> {
    let mut by_selector = HashMap::new();
    for selector in definition.source.selectors() {
        let table = tables.get(selector.node_type_name.as_str()).ok_or_else(|| {
            format!(
                "view '{name}' selects from unknown table '{}'",
                selector.node_type_name
            )
        })?;
        by_selector.insert(selector.name().clone(), table);
    }

    let mut view = Table::new(name);
    view.definition = Some(Box::new(definition.clone()));

    if definition.columns.is_empty() {
        for table in by_selector.values() {
            for column in table.columns() {
                view.columns.insert(column.name.clone(), column.clone());
            }
        }
        view.columns.sort_keys();
        return Ok(view);
    }

    for column in &definition.columns {
        let table = match &column.selector_name {
            Some(selector) => by_selector.get(selector).copied().ok_or_else(|| {
                format!("view '{name}' references undeclared selector '{selector}'")
            })?,
            None if by_selector.len() == 1 => *by_selector.values().next().ok_or_else(|| {
                format!("view '{name}' has no source table")
            })?,
            None => {
                return Err(format!(
                    "view '{name}' column '{}' must name its selector",
                    column.resolved_name()
                ))
            }
        };

        match &column.property_name {
            Some(property) => {
                let source = table.column(property).ok_or_else(|| {
                    format!(
                        "view '{name}' references unknown column '{property}' of table '{}'",
                        table.name
                    )
                })?;
                let mut projected = source.clone();
                projected.name = column.resolved_name();
                view.columns.insert(projected.name.clone(), projected);
            }
            None => {
                for source in table.columns() {
                    view.columns.insert(source.name.clone(), source.clone());
                }
            }
        }
    }

    Ok(view)
}

/// Shared, swappable schema. Readers take a snapshot and keep using it for
/// the whole compilation; writers replace the snapshot atomically.
///
/// Every published schema gets a new version, so holders of compiled plans
/// can tell when theirs were built against an older schema.
#[derive(Debug, Default)]
pub struct SchemaHandle {
    current: RwLock<Versioned>,
}

#[derive(Debug, Default)]
struct Versioned {
    version: u64,
    schema: Arc<InMemorySchema>,
}

impl SchemaHandle {
    #[must_use]
    pub fn new(schema: InMemorySchema) -> Self {
        Self {
            current: RwLock::new(Versioned {
                version: 0,
                schema: Arc::new(schema),
            }),
        }
    }

    /// Returns the current schema.
    #[must_use]
    pub fn snapshot(&self) -> Arc<InMemorySchema> {
        Arc::clone(&self.current.read().schema)
    }

    /// Version of the current schema; starts at 0 and grows with each update.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    /// The current schema together with its version.
    #[must_use]
    pub fn versioned(&self) -> (u64, Arc<InMemorySchema>) {
        let current = self.current.read();
        (current.version, Arc::clone(&current.schema))
    }

    /// Derives a new schema from the current one and publishes it.
    pub fn update<F>(&self, change: F) -> Arc<InMemorySchema>
    where
        F: FnOnce(&InMemorySchema) -> InMemorySchema,
    {
        let mut current = self.current.write();
        let next = Arc::new(change(&current.schema));
        current.version += 1;
        current.schema = Arc::clone(&next);
        info!(
            version = current.version,
            tables = next.len(),
            "published schema snapshot"
        );
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qom::{Column as QueryColumn, Selector};

    fn doc_schema() -> InMemorySchema {
        let mut builder = InMemorySchema::builder();
        builder
            .add_table("doc", ["title", "body"])
            .add_column(
                "doc",
                "size",
                PropertyType::Long,
                false,
                [Operator::EqualTo, Operator::GreaterThan],
            )
            .make_searchable("doc", "body");
        builder.build().unwrap()
    }

    #[test]
    fn test_builder_creates_columns() {
        let schema = doc_schema();
        let table = schema.table("doc").unwrap();

        let title = table.column("title").unwrap();
        assert_eq!(title.property_type, PropertyType::String);
        assert_eq!(title.available_operators(), Operator::ALL.to_vec());
        assert!(!title.full_text_searchable);

        assert!(table.column("body").unwrap().full_text_searchable);

        let size = table.column("size").unwrap();
        assert!(size.supports(Operator::GreaterThan));
        assert!(!size.supports(Operator::Like));

        let names: Vec<_> = table.columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["title", "body", "size"]);
    }

    #[test]
    fn test_builder_reports_unknown_tables() {
        let mut builder = InMemorySchema::builder();
        builder.add_column("missing", "x", PropertyType::Long, false, Operator::ALL);
        builder.make_searchable("missing", "y");
        let err = builder.build().unwrap_err();
        assert!(err.to_string().contains("unknown table 'missing'"));
        assert!(err.to_string().contains("unknown column 'y'"));
    }

    #[test]
    fn test_with_table_is_a_functional_update() {
        let schema = doc_schema();
        let extended = schema.with_table(Table::new("folder"));

        assert!(schema.table("folder").is_none());
        assert!(extended.table("folder").is_some());
        assert!(extended.table("doc").is_some());
        assert!(extended.without_table("doc").table("doc").is_none());
        assert!(extended.table("doc").is_some());
    }

    #[test]
    fn test_views_project_source_columns() {
        let mut builder = InMemorySchema::builder();
        builder.add_table("doc", ["title", "body"]).add_view(
            "titles",
            Query::new(Selector::new("doc").with_alias("d"))
                .with_column(QueryColumn::new("d", "title").with_alias("heading")),
        );
        let schema = builder.build().unwrap();

        let view = schema.table("titles").unwrap();
        assert!(view.is_view());
        assert!(view.column("heading").is_some());
        assert!(view.column("body").is_none());
        assert_eq!(
            view.as_view().unwrap().definition.source.selectors()[0]
                .node_type_name
                .as_str(),
            "doc"
        );
    }

    #[test]
    fn test_view_over_unknown_column_fails() {
        let mut builder = InMemorySchema::builder();
        builder.add_table("doc", ["title"]).add_view(
            "bad",
            Query::new(Selector::new("doc")).with_column(QueryColumn::new("doc", "nope")),
        );
        let err = builder.build().unwrap_err();
        assert!(err.to_string().contains("unknown column 'nope'"));
    }

    #[test]
    fn test_schema_handle_snapshots_are_stable() {
        let handle = SchemaHandle::new(doc_schema());
        let before = handle.snapshot();

        handle.update(|schema| schema.with_table(Table::new("folder")));

        assert!(before.table("folder").is_none());
        assert!(handle.snapshot().table("folder").is_some());
    }

    #[test]
    fn test_schema_handle_versions_each_update() {
        let handle = SchemaHandle::new(doc_schema());
        assert_eq!(handle.version(), 0);

        handle.update(|schema| schema.with_table(Table::new("folder")));
        handle.update(|schema| schema.with_table(Table::new("note")));

        let (version, schema) = handle.versioned();
        assert_eq!(version, 2);
        assert!(schema.table("note").is_some());
    }
}
