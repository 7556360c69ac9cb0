//! In-memory search index with snapshot isolation.
//!
//! Readers search the last committed [`IndexSnapshot`]. A single writer at a
//! time stages changes on a private copy through an [`UpdateProcessor`] and
//! publishes them with [`UpdateProcessor::commit`]; dropping the processor
//! without committing discards the batch.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use reposearch_core::qom::{Order, Query};
use reposearch_core::{
    Bindings, ContentEntry, ContentModificationListener, ContentValue, Error, InMemorySchema,
    QueryResults, Result, Row, SchemaHandle, SearchConfig, SearchContentService, UpdateContext,
    Value,
};
use reposearch_query::{
    CompileOptions, CompiledQuery, CompiledQueryCache, QueryCompiler, SortField, SortKey,
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::snapshot::IndexSnapshot;

/// A committed snapshot, the schema version it is searched with and the
/// plans compiled against both.
///
/// Plans embed identifiers resolved from paths and the operator checks of one
/// schema, so they are only valid for that snapshot and that schema version.
struct Published {
    snapshot: Arc<IndexSnapshot>,
    schema_version: u64,
    schema: Arc<InMemorySchema>,
    plans: CompiledQueryCache,
}

impl Published {
    fn new(snapshot: Arc<IndexSnapshot>, schema: &SchemaHandle, config: &SearchConfig) -> Self {
        let (schema_version, schema) = schema.versioned();
        Self {
            snapshot,
            schema_version,
            schema,
            plans: CompiledQueryCache::from_config(&config.query),
        }
    }
}

/// Reference implementation of [`SearchContentService`] and
/// [`ContentModificationListener`] over in-memory inverted indexes.
///
/// Join queries are compiled and validated but not executed.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use reposearch_core::qom::{Comparison, Literal, Operator, PropertyValue, Query, Selector};
/// use reposearch_core::{Bindings, ContentEntry, InMemorySchema, Property, SchemaHandle, SearchConfig, SearchContentService};
/// use reposearch_index::MemorySearchIndex;
///
/// # #[tokio::main]
/// # async fn main() -> reposearch_core::Result<()> {
/// let mut builder = InMemorySchema::builder();
/// builder.add_table("doc", ["title"]);
/// let schema = Arc::new(SchemaHandle::new(builder.build()?));
/// let index = MemorySearchIndex::new(schema, SearchConfig::default());
///
/// let mut update = index.begin_update().await;
/// update.add(ContentEntry::new("1", "a").in_table("doc").with_property(Property::single("title", "Apollo")))?;
/// update.commit();
///
/// let query = Query::new(Selector::new("doc")).with_constraint(Comparison::new(
///     PropertyValue::new("doc", "title"),
///     Operator::EqualTo,
///     Literal::new("Apollo"),
/// ));
/// let results = index.search(&query, &Bindings::new()).await?;
/// assert_eq!(results.identifiers(), vec!["1"]);
/// # Ok(())
/// # }
/// ```
pub struct MemorySearchIndex {
    schema: Arc<SchemaHandle>,
    config: SearchConfig,
    published: RwLock<Arc<Published>>,
    writer: Mutex<()>,
}

impl MemorySearchIndex {
    #[must_use]
    pub fn new(schema: Arc<SchemaHandle>, config: SearchConfig) -> Self {
        let published = Published::new(Arc::new(IndexSnapshot::new()), &schema, &config);
        Self {
            schema,
            config,
            published: RwLock::new(Arc::new(published)),
            writer: Mutex::new(()),
        }
    }

    /// The last committed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.published.read().snapshot)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Waits for any running update to finish and starts a new one.
    pub async fn begin_update(&self) -> UpdateProcessor<'_> {
        let guard = self.writer.lock().await;
        UpdateProcessor::new(self, guard)
    }

    /// Starts an update, failing when another one is in progress.
    pub fn try_begin_update(&self) -> Result<UpdateProcessor<'_>> {
        let guard = self
            .writer
            .try_lock()
            .map_err(|_| Error::index_modification("another update is in progress"))?;
        Ok(UpdateProcessor::new(self, guard))
    }

    /// Publishes a schema derived from the current one. Plans compiled
    /// against the previous schema are dropped.
    pub fn update_schema<F>(&self, change: F) -> Arc<InMemorySchema>
    where
        F: FnOnce(&InMemorySchema) -> InMemorySchema,
    {
        let schema = self.schema.update(change);
        let snapshot = self.snapshot();
        self.publish(snapshot);
        schema
    }

    /// Returns `(entry_count, weighted_size)` of the plan cache.
    #[must_use]
    pub fn plan_cache_stats(&self) -> (u64, u64) {
        self.published.read().plans.stats()
    }

    fn publish(&self, snapshot: Arc<IndexSnapshot>) {
        let published = Published::new(snapshot, &self.schema, &self.config);
        *self.published.write() = Arc::new(published);
    }

    /// The published state, republished with an empty plan cache when the
    /// shared schema handle was updated behind the index's back.
    fn current(&self) -> Arc<Published> {
        let version = self.schema.version();
        let published = Arc::clone(&self.published.read());
        if published.schema_version == version {
            return published;
        }

        let mut current = self.published.write();
        if current.schema_version != version {
            debug!(
                from = current.schema_version,
                to = version,
                "schema changed, dropping cached plans"
            );
            let snapshot = Arc::clone(&current.snapshot);
            *current = Arc::new(Published::new(snapshot, &self.schema, &self.config));
        }
        Arc::clone(&current)
    }

    fn compile(&self, published: &Published, query: &Query, bindings: &Bindings) -> Result<Arc<CompiledQuery>> {
        let compiler = QueryCompiler::new(
            published.schema.as_ref(),
            CompileOptions::from(&self.config.query),
        )
        .with_paths(published.snapshot.as_ref());
        published.plans.get_or_compile(&compiler, query, bindings)
    }
}

#[async_trait]
impl SearchContentService for MemorySearchIndex {
    async fn search(&self, query: &Query, bindings: &Bindings) -> Result<QueryResults> {
        let published = self.current();
        let compiled = self.compile(&published, query, bindings)?;
        if compiled.is_join() {
            return Err(Error::invalid_query(format!(
                "join queries are not executed by the in-memory index: {}",
                compiled.statement
            )));
        }

        let results = execute(&published.snapshot, &compiled)?;
        debug!(
            statement = %compiled.statement,
            rows = results.len(),
            "executed query"
        );
        Ok(results)
    }
}

#[async_trait]
impl ContentModificationListener for MemorySearchIndex {
    async fn update(
        &self,
        added: Vec<ContentEntry>,
        removed: &HashSet<String>,
        ctx: &UpdateContext,
    ) -> Result<()> {
        let max = self.config.index.max_batch_size;
        if added.len() > max {
            warn!(source = %ctx.source, added = added.len(), max, "rejected oversized batch");
            return Err(Error::index_modification(format!(
                "batch of {} entries exceeds the maximum of {max}",
                added.len()
            )));
        }

        let mut update = self.begin_update().await;
        for identifier in removed {
            update.remove(identifier);
        }
        for entry in added {
            update.add(entry)?;
        }
        let (added, removed) = (update.added, update.removed);
        update.commit();
        info!(source = %ctx.source, added, removed, "applied content modifications");
        Ok(())
    }
}

/// Stages changes against a private copy of the committed snapshot.
///
/// Holds the index's writer lock until committed or dropped.
pub struct UpdateProcessor<'a> {
    index: &'a MemorySearchIndex,
    _writer: MutexGuard<'a, ()>,
    staged: IndexSnapshot,
    added: usize,
    removed: usize,
    committed: bool,
}

impl<'a> UpdateProcessor<'a> {
    fn new(index: &'a MemorySearchIndex, writer: MutexGuard<'a, ()>) -> Self {
        let staged = (*index.snapshot()).clone();
        Self {
            index,
            _writer: writer,
            staged,
            added: 0,
            removed: 0,
            committed: false,
        }
    }

    /// Stages `entry`, replacing any entry with the same identifier.
    pub fn add(&mut self, entry: ContentEntry) -> Result<()> {
        self.staged.insert(entry)?;
        self.added += 1;
        Ok(())
    }

    /// Stages the removal of `identifier`; returns whether it was indexed.
    pub fn remove(&mut self, identifier: &str) -> bool {
        let removed = self.staged.remove(identifier);
        if removed {
            self.removed += 1;
        }
        removed
    }

    /// The staged state, including uncommitted changes.
    #[must_use]
    pub fn staged(&self) -> &IndexSnapshot {
        &self.staged
    }

    /// Publishes the staged changes to readers.
    pub fn commit(mut self) {
        let staged = std::mem::take(&mut self.staged);
        let entries = staged.len();
        self.index.publish(Arc::new(staged));
        self.committed = true;
        debug!(added = self.added, removed = self.removed, entries, "committed update");
    }
}

impl Drop for UpdateProcessor<'_> {
    fn drop(&mut self) {
        if !self.committed && (self.added > 0 || self.removed > 0) {
            debug!(
                added = self.added,
                removed = self.removed,
                "discarded uncommitted update"
            );
        }
    }
}

struct Hit<'s> {
    doc_id: u32,
    entry: &'s ContentEntry,
    score: f32,
}

fn execute(snapshot: &IndexSnapshot, compiled: &CompiledQuery) -> Result<QueryResults> {
    let matches = snapshot.evaluate(&compiled.predicate)?;
    let mut hits: Vec<Hit<'_>> = matches
        .iter()
        .filter_map(|doc_id| {
            snapshot.entry(doc_id).map(|entry| Hit {
                doc_id,
                entry,
                score: snapshot.score(&compiled.predicate, doc_id),
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        compiled
            .sort
            .iter()
            .map(|key| compare_on(snapshot, key, a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.entry.identifier.cmp(&b.entry.identifier))
    });

    let rows = hits
        .into_iter()
        .skip(compiled.limit.offset)
        .take(compiled.limit.row_limit)
        .map(|hit| project(compiled, hit))
        .collect();

    Ok(QueryResults {
        columns: compiled.columns.iter().map(|c| c.name.clone()).collect(),
        rows,
    })
}

fn compare_on(snapshot: &IndexSnapshot, key: &SortKey, a: &Hit<'_>, b: &Hit<'_>) -> Ordering {
    let ordering = match &key.field {
        SortField::Score => a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal),
        SortField::Field(field) => {
            let sort_term = |doc_id: u32| {
                snapshot
                    .field(field)
                    .and_then(|index| index.doc_terms(doc_id))
                    .and_then(<[String]>::first)
                    .map(|term| {
                        if key.case_sensitive {
                            term.clone()
                        } else {
                            term.to_lowercase()
                        }
                    })
            };
            // Entries without a value sort first in ascending order
            sort_term(a.doc_id).cmp(&sort_term(b.doc_id))
        }
    };
    match key.order {
        Order::Ascending => ordering,
        Order::Descending => ordering.reverse(),
    }
}

fn project(compiled: &CompiledQuery, hit: Hit<'_>) -> Row {
    let values = compiled
        .columns
        .iter()
        .map(|column| {
            let property = compiled
                .selectors
                .iter()
                .find(|s| s.name == column.selector)
                .map_or(column.property.as_str(), |s| s.physical_property(&column.property));
            hit.entry
                .property(property)
                .and_then(|p| first_value(&p.value))
        })
        .collect();

    Row {
        identifier: hit.entry.identifier.clone(),
        score: hit.score,
        values,
    }
}

fn first_value(value: &ContentValue) -> Option<Value> {
    match value {
        ContentValue::Simple(values) => values.first().cloned(),
        ContentValue::Binary(binary) => Some(Value::Binary(binary.content.clone())),
    }
}
