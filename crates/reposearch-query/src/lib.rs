pub mod cache;
pub mod compiler;
pub mod encoding;
pub mod fields;
pub mod like;
pub mod operators;
pub mod predicate;
pub mod statement;
pub mod validation;
pub mod visitor;

pub use cache::CompiledQueryCache;
pub use compiler::{
    CompileOptions, CompiledJoin, CompiledQuery, CompiledSelector, QueryCompiler, ResultColumn,
    SortField, SortKey,
};
pub use like::like_pattern_to_regex;
pub use predicate::{Predicate, RangeBound};
pub use statement::{render, Statement, StatementWriter};
pub use validation::{ValidatedQuery, ValidationOptions, Validator};
pub use visitor::{walk_all, QueryNode, Visitor};
