//! Core domain types and traits for reposearch: the query object model,
//! typed values, the schema and content models, configuration and errors.

pub mod config;
pub mod content;
pub mod error;
pub mod qom;
pub mod schema;
pub mod traits;
pub mod value;

pub use config::{IndexConfig, QueryConfig, SearchConfig};
pub use content::{BinaryValue, ContentEntry, ContentValue, Property};
pub use error::{Error, Result};
pub use schema::{Column, InMemorySchema, InMemorySchemaBuilder, Schema, SchemaHandle, Table, View};
pub use traits::{
    Bindings, ContentModificationListener, NoPaths, PathResolver, QueryResults, Row,
    SearchContentService, UpdateContext,
};
pub use value::{PropertyType, Value};
