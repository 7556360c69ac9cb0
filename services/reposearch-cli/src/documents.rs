//! JSON documents read by the CLI.

use std::fs;
use std::path::Path;

use reposearch_core::qom::Query;
use reposearch_core::{Bindings, ContentEntry, Error, InMemorySchema, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| {
        Error::Serialization(format!("cannot read {what} file {}: {e}", path.display()))
    })?;
    let document = serde_json::from_str(&text).map_err(|e| {
        Error::Serialization(format!("malformed {what} file {}: {e}", path.display()))
    })?;
    debug!(path = %path.display(), what, "loaded document");
    Ok(document)
}

pub fn load_query(path: &Path) -> Result<Query> {
    read_json(path, "query")
}

pub fn load_schema(path: &Path) -> Result<InMemorySchema> {
    read_json(path, "schema")
}

/// Missing bindings file means no bound values.
pub fn load_bindings(path: Option<&Path>) -> Result<Bindings> {
    match path {
        Some(path) => read_json(path, "bindings"),
        None => Ok(Bindings::new()),
    }
}

pub fn load_content(path: &Path) -> Result<Vec<ContentEntry>> {
    read_json(path, "content")
}
