//! Cache of compiled queries.
//!
//! Compiling is cheap compared to executing, but a search service sees the
//! same handful of statements over and over. Entries are keyed by the
//! SHA-256 digest of the canonical statement plus the bound values, so two
//! structurally equal queries share an entry no matter how they were built.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use reposearch_core::qom::Query;
use reposearch_core::{Bindings, QueryConfig, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::compiler::{CompiledQuery, QueryCompiler};
use crate::statement::render;

/// Cache key for a query and its bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CompiledQueryKey {
    digest: [u8; 32],
}

impl CompiledQueryKey {
    fn new(statement: &str, bindings: &Bindings) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(statement.as_bytes());

        // Bindings sorted by name so the digest does not depend on map order
        let mut names: Vec<&String> = bindings.keys().collect();
        names.sort();
        for name in names {
            hasher.update([0u8]);
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            if let Some(value) = bindings.get(name) {
                hasher.update(value.property_type().as_str().as_bytes());
                hasher.update([b':']);
                hasher.update(value.to_string().as_bytes());
            }
        }

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        Self { digest }
    }
}

/// Bounded cache from (statement, bindings) to compiled plans.
///
/// The cache does not know which schema a plan was compiled against; call
/// [`clear`](Self::clear) whenever the schema changes.
pub struct CompiledQueryCache {
    cache: Cache<CompiledQueryKey, Arc<CompiledQuery>>,
}

impl CompiledQueryCache {
    /// Creates a cache holding at most `capacity` plans, each evicted after
    /// `idle` without use.
    #[must_use]
    pub fn new(capacity: u64, idle: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(capacity)
                .time_to_idle(idle)
                .build(),
        }
    }

    #[must_use]
    pub fn from_config(config: &QueryConfig) -> Self {
        Self::new(config.cache_capacity, config.cache_idle())
    }

    /// Returns the cached plan for `query`, compiling and caching it on a miss.
    ///
    /// Compilation errors are returned and never cached.
    pub fn get_or_compile(
        &self,
        compiler: &QueryCompiler<'_>,
        query: &Query,
        bindings: &Bindings,
    ) -> Result<Arc<CompiledQuery>> {
        let key = CompiledQueryKey::new(&render(query), bindings);
        if let Some(compiled) = self.cache.get(&key) {
            trace!("compiled query cache hit");
            return Ok(compiled);
        }

        let compiled = Arc::new(compiler.compile(query, bindings)?);
        self.cache.insert(key, Arc::clone(&compiled));
        debug!(statement = %compiled.statement, "cached compiled query");
        Ok(compiled)
    }

    /// Returns `(entry_count, weighted_size)`.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.cache.entry_count(), self.cache.weighted_size())
    }

    /// Drops every cached plan.
    pub fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }
}

impl Default for CompiledQueryCache {
    fn default() -> Self {
        Self::from_config(&QueryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reposearch_core::qom::{BindVariableName, Comparison, Operator, PropertyValue, Selector};
    use reposearch_core::{InMemorySchema, Value};

    use crate::compiler::CompileOptions;

    fn schema() -> InMemorySchema {
        let mut builder = InMemorySchema::builder();
        builder.add_table("doc", ["title"]);
        builder.build().unwrap()
    }

    fn query() -> Query {
        Query::new(Selector::new("doc")).with_constraint(Comparison::new(
            PropertyValue::new("doc", "title"),
            Operator::EqualTo,
            BindVariableName::new("title"),
        ))
    }

    fn bindings(title: &str) -> Bindings {
        let mut bindings = Bindings::new();
        bindings.insert("title".to_string(), Value::from(title));
        bindings
    }

    #[test]
    fn test_same_query_and_bindings_hit() {
        let schema = schema();
        let compiler = QueryCompiler::new(&schema, CompileOptions::default());
        let cache = CompiledQueryCache::default();

        let first = cache.get_or_compile(&compiler, &query(), &bindings("a")).unwrap();
        let second = cache.get_or_compile(&compiler, &query(), &bindings("a")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = cache.get_or_compile(&compiler, &query(), &bindings("b")).unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn test_errors_are_not_cached() {
        let schema = schema();
        let compiler = QueryCompiler::new(&schema, CompileOptions::default());
        let cache = CompiledQueryCache::default();

        assert!(cache
            .get_or_compile(&compiler, &query(), &Bindings::new())
            .is_err());
        cache.clear();
        assert_eq!(cache.stats().0, 0);
    }

    #[test]
    fn test_key_ignores_binding_order() {
        let mut a = Bindings::new();
        a.insert("x".to_string(), Value::Long(1));
        a.insert("y".to_string(), Value::Long(2));
        let mut b = Bindings::new();
        b.insert("y".to_string(), Value::Long(2));
        b.insert("x".to_string(), Value::Long(1));
        assert_eq!(
            CompiledQueryKey::new("SELECT * FROM doc", &a),
            CompiledQueryKey::new("SELECT * FROM doc", &b)
        );
        assert_ne!(
            CompiledQueryKey::new("SELECT * FROM doc", &a),
            CompiledQueryKey::new("SELECT * FROM folder", &a)
        );
    }
}
