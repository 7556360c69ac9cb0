//! Sub-command implementations. Each returns the text printed on success.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use reposearch_core::{
    ContentModificationListener, Result, SchemaHandle, SearchConfig, SearchContentService,
    UpdateContext,
};
use reposearch_index::MemorySearchIndex;
use reposearch_query::{render, CompileOptions, QueryCompiler, ValidationOptions, Validator};
use tracing::info;

use crate::documents::{load_bindings, load_content, load_query, load_schema};

/// Canonical statement of a query document.
pub fn render_query(query: &Path) -> Result<String> {
    let query = load_query(query)?;
    Ok(render(&query))
}

/// Checks a query against a schema; prints the selectors and bind variables.
pub fn validate_query(query: &Path, schema: &Path, config: &SearchConfig) -> Result<String> {
    let query = load_query(query)?;
    let schema = load_schema(schema)?;
    let validated = Validator::new(&schema, ValidationOptions::from(&config.query)).validate(&query)?;

    let mut output = String::from("valid\n");
    for (selector, table) in &validated.selectors {
        output.push_str(&format!("selector {selector}: {table}\n"));
    }
    for variable in &validated.bind_variables {
        output.push_str(&format!("variable ${variable}\n"));
    }
    Ok(output)
}

/// Compiled plan of a query, as pretty-printed JSON.
pub fn compile_query(
    query: &Path,
    schema: &Path,
    bindings: Option<&Path>,
    config: &SearchConfig,
) -> Result<String> {
    let query = load_query(query)?;
    let schema = load_schema(schema)?;
    let bindings = load_bindings(bindings)?;

    let compiled = QueryCompiler::new(&schema, CompileOptions::from(&config.query))
        .compile(&query, &bindings)?;
    Ok(serde_json::to_string_pretty(&compiled)?)
}

/// Indexes a content document in memory and runs a query against it.
pub async fn search_content(
    query: &Path,
    schema: &Path,
    content: &Path,
    bindings: Option<&Path>,
    config: SearchConfig,
) -> Result<String> {
    let query = load_query(query)?;
    let schema = load_schema(schema)?;
    let bindings = load_bindings(bindings)?;
    let entries = load_content(content)?;

    let index = MemorySearchIndex::new(Arc::new(SchemaHandle::new(schema)), config);
    let source = content.display().to_string();
    index
        .update(entries, &HashSet::new(), &UpdateContext::new(source))
        .await?;
    info!(entries = index.len(), "indexed content");

    let results = index.search(&query, &bindings).await?;
    Ok(serde_json::to_string_pretty(&results)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use reposearch_core::qom::{Comparison, Literal, Operator, PropertyValue, Query, Selector};
    use reposearch_core::{ContentEntry, InMemorySchema, Property, QueryResults};
    use tempfile::NamedTempFile;

    fn json_file<T: serde::Serialize>(value: &T) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(value).unwrap().as_bytes())
            .unwrap();
        file
    }

    fn query(operator: Operator) -> NamedTempFile {
        json_file(
            &Query::new(Selector::new("doc").with_alias("d")).with_constraint(Comparison::new(
                PropertyValue::new("d", "title"),
                operator,
                Literal::new("Apollo%"),
            )),
        )
    }

    fn schema() -> NamedTempFile {
        let mut builder = InMemorySchema::builder();
        builder.add_table("doc", Vec::<String>::new()).add_column(
            "doc",
            "title",
            reposearch_core::PropertyType::String,
            false,
            [Operator::EqualTo, Operator::Like],
        );
        json_file(&builder.build().unwrap())
    }

    #[test]
    fn test_render() {
        let output = render_query(query(Operator::Like).path()).unwrap();
        assert_eq!(output, "SELECT * FROM doc AS d WHERE d.title LIKE 'Apollo%'");
    }

    #[test]
    fn test_validate_lists_selectors() {
        let output =
            validate_query(query(Operator::Like).path(), schema().path(), &SearchConfig::default())
                .unwrap();
        assert!(output.contains("selector d: doc"), "{output}");
    }

    #[test]
    fn test_compile_rejects_unavailable_operator() {
        let err = compile_query(
            query(Operator::GreaterThan).path(),
            schema().path(),
            None,
            &SearchConfig::default(),
        )
        .unwrap_err();
        assert!(err.is_invalid_query());
    }

    #[test]
    fn test_compile_prints_plan() {
        let output = compile_query(
            query(Operator::Like).path(),
            schema().path(),
            None,
            &SearchConfig::default(),
        )
        .unwrap();
        assert!(output.contains("^Apollo.*$"), "{output}");
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = render_query(Path::new("/nonexistent/query.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read query file"), "{err}");
    }

    #[tokio::test]
    async fn test_search_over_content_document() {
        let content = json_file(&vec![
            ContentEntry::new("1", "apollo")
                .in_table("doc")
                .with_property(Property::single("title", "Apollo 11")),
            ContentEntry::new("2", "gemini")
                .in_table("doc")
                .with_property(Property::single("title", "Gemini 4")),
        ]);
        let output = search_content(
            query(Operator::Like).path(),
            schema().path(),
            content.path(),
            None,
            SearchConfig::default(),
        )
        .await
        .unwrap();
        let results: QueryResults = serde_json::from_str(&output).unwrap();
        assert_eq!(results.identifiers(), vec!["1"]);
    }
}
