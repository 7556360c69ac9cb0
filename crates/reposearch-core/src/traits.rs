use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::content::ContentEntry;
use crate::error::Result;
use crate::qom::Query;
use crate::value::Value;

/// Values for the bind variables of a query, keyed by variable name.
pub type Bindings = HashMap<String, Value>;

/// Describes where a batch of content modifications came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateContext {
    /// Name of the content source that produced the batch (used for logging).
    pub source: String,
}

impl UpdateContext {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Receives batches of content modifications from the storage adapter.
#[async_trait]
pub trait ContentModificationListener: Send + Sync {
    /// Indexes `added` entries (replacing earlier versions) and drops the
    /// entries whose identifiers are in `removed`.
    ///
    /// Fails with `Error::IndexModification`; a failed batch may have been
    /// partially applied.
    async fn update(
        &self,
        added: Vec<ContentEntry>,
        removed: &HashSet<String>,
        ctx: &UpdateContext,
    ) -> Result<()>;
}

/// Executes queries against committed index state.
#[async_trait]
pub trait SearchContentService: Send + Sync {
    /// Validates, compiles and runs `query`.
    async fn search(&self, query: &Query, bindings: &Bindings) -> Result<QueryResults>;
}

/// Resolves absolute paths to entry identifiers.
pub trait PathResolver: Send + Sync {
    fn resolve(&self, path: &str) -> Option<String>;
}

impl PathResolver for HashMap<String, String> {
    fn resolve(&self, path: &str) -> Option<String> {
        self.get(path).cloned()
    }
}

/// Resolver for callers without path information; every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPaths;

impl PathResolver for NoPaths {
    fn resolve(&self, _path: &str) -> Option<String> {
        None
    }
}

/// Rows produced by a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResults {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Identifiers of the rows, in result order.
    #[must_use]
    pub fn identifiers(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.identifier.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub identifier: String,
    pub score: f32,
    /// One value per result column; `None` when the entry lacks the property.
    pub values: Vec<Option<Value>>,
}
