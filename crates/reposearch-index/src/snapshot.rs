//! Immutable view of the indexed content.
//!
//! A snapshot owns every field index plus the stored entries used to project
//! result columns. Updates clone the committed snapshot, modify the copy and
//! publish it in one swap, so readers never observe a half-applied batch.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use reposearch_core::{ContentEntry, ContentValue, Error, PathResolver, Result, Value};
use reposearch_query::encoding::{encode_long, encode_value};
use reposearch_query::fields::{
    length_field, property_field, table_text_field, text_field, ANCESTOR_FIELD, DEPTH_FIELD,
    ID_FIELD, LOCAL_NAME_FIELD, NAME_FIELD, PARENT_FIELD, TABLE_FIELD,
};
use reposearch_query::Predicate;
use roaring::RoaringBitmap;
use tracing::trace;

use crate::full_text::{tokenize, FullTextExpression};
use crate::inverted_index::FieldIndex;

#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    fields: HashMap<String, FieldIndex>,
    entries: HashMap<u32, ContentEntry>,
    doc_ids: HashMap<String, u32>,
    paths: HashMap<String, String>,
    live: RoaringBitmap,
    next_doc_id: u32,
}

impl IndexSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn live(&self) -> &RoaringBitmap {
        &self.live
    }

    #[must_use]
    pub fn entry(&self, doc_id: u32) -> Option<&ContentEntry> {
        self.entries.get(&doc_id)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldIndex> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.doc_ids.contains_key(identifier)
    }

    /// Indexes `entry`, replacing any earlier version with the same identifier.
    pub fn insert(&mut self, entry: ContentEntry) -> Result<()> {
        self.remove(&entry.identifier);

        let doc_id = self.next_doc_id;
        self.next_doc_id = doc_id
            .checked_add(1)
            .ok_or_else(|| Error::index_modification("document id space exhausted"))?;

        for (field, terms) in entry_terms(&entry) {
            if terms.is_empty() {
                continue;
            }
            self.fields.entry(field).or_default().insert(doc_id, terms);
        }
        if let Some(path) = &entry.path {
            self.paths.insert(path.clone(), entry.identifier.clone());
        }
        trace!(identifier = %entry.identifier, doc_id, "indexed entry");

        self.doc_ids.insert(entry.identifier.clone(), doc_id);
        self.live.insert(doc_id);
        self.entries.insert(doc_id, entry);
        Ok(())
    }

    /// Drops the entry with `identifier`; returns whether it was present.
    pub fn remove(&mut self, identifier: &str) -> bool {
        let Some(doc_id) = self.doc_ids.remove(identifier) else {
            return false;
        };
        self.live.remove(doc_id);
        if let Some(entry) = self.entries.remove(&doc_id) {
            if let Some(path) = &entry.path {
                if self.paths.get(path).is_some_and(|id| id == identifier) {
                    self.paths.remove(path);
                }
            }
        }
        self.fields.retain(|_, index| !index.remove(doc_id));
        trace!(identifier, doc_id, "removed entry");
        true
    }

    /// Entries matching `predicate`.
    pub fn evaluate(&self, predicate: &Predicate) -> Result<RoaringBitmap> {
        let bitmap = match predicate {
            Predicate::Term {
                field,
                value,
                case_sensitive,
            } => self.on_field(field, |index| index.term(value, *case_sensitive)),
            Predicate::Range {
                field,
                lower,
                upper,
                case_sensitive,
            } => self.on_field(field, |index| index.range(lower, upper, *case_sensitive)),
            Predicate::Wildcard {
                field,
                pattern,
                case_sensitive,
            } => {
                let regex = compile_regex(&wildcard_to_regex(pattern), *case_sensitive)?;
                self.on_field(field, |index| index.matching(&regex, *case_sensitive))
            }
            Predicate::Regex {
                field,
                pattern,
                case_sensitive,
            } => {
                let regex = compile_regex(pattern, *case_sensitive)?;
                self.on_field(field, |index| index.matching(&regex, *case_sensitive))
            }
            Predicate::Exists { field } => self.on_field(field, |index| index.exists().clone()),
            Predicate::FullText { field, expression } => {
                FullTextExpression::parse(expression).evaluate(self.fields.get(field), &self.live)
            }
            Predicate::MatchAll => self.live.clone(),
            Predicate::MatchNone => RoaringBitmap::new(),
            Predicate::Boolean {
                must,
                should,
                must_not,
            } => {
                let mut bitmap = self.live.clone();
                for clause in must {
                    bitmap &= self.evaluate(clause)?;
                    if bitmap.is_empty() {
                        return Ok(bitmap);
                    }
                }
                if !should.is_empty() {
                    let mut any = RoaringBitmap::new();
                    for clause in should {
                        any |= self.evaluate(clause)?;
                    }
                    bitmap &= any;
                }
                for clause in must_not {
                    bitmap -= self.evaluate(clause)?;
                }
                bitmap
            }
        };
        Ok(bitmap)
    }

    /// Relevance of `doc_id`: the number of full-text terms it matches across
    /// the positive full-text clauses of `predicate`.
    #[must_use]
    pub fn score(&self, predicate: &Predicate, doc_id: u32) -> f32 {
        let mut hits = 0usize;
        collect_full_text(predicate, &mut |field, expression| {
            if let Some(index) = self.fields.get(field) {
                hits += FullTextExpression::parse(expression).hits(index, doc_id);
            }
        });
        hits as f32
    }

    fn on_field(&self, field: &str, lookup: impl FnOnce(&FieldIndex) -> RoaringBitmap) -> RoaringBitmap {
        self.fields.get(field).map(lookup).unwrap_or_default()
    }
}

impl PathResolver for IndexSnapshot {
    fn resolve(&self, path: &str) -> Option<String> {
        self.paths.get(path).cloned()
    }
}

fn collect_full_text<'p>(predicate: &'p Predicate, visit: &mut impl FnMut(&'p str, &'p str)) {
    match predicate {
        Predicate::FullText { field, expression } => visit(field, expression),
        Predicate::Boolean { must, should, .. } => {
            for clause in must.iter().chain(should) {
                collect_full_text(clause, visit);
            }
        }
        _ => {}
    }
}

fn compile_regex(pattern: &str, case_sensitive: bool) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| Error::invalid_query(format!("invalid pattern '{pattern}': {e}")))
}

/// Anchored regex for a glob where `*` is any sequence, `?` one character
/// and `\` escapes the next character.
fn wildcard_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    regex.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    regex
}

/// Every `(field, terms)` pair written for `entry`.
fn entry_terms(entry: &ContentEntry) -> Vec<(String, Vec<String>)> {
    let mut fields = vec![
        (ID_FIELD.to_string(), vec![entry.identifier.clone()]),
        (NAME_FIELD.to_string(), vec![entry.name.clone()]),
        (LOCAL_NAME_FIELD.to_string(), vec![entry.local_name().to_string()]),
        (ANCESTOR_FIELD.to_string(), entry.parent_identifiers.clone()),
        (
            DEPTH_FIELD.to_string(),
            vec![encode_long(i64::try_from(entry.depth()).unwrap_or(i64::MAX))],
        ),
        (TABLE_FIELD.to_string(), entry.table_names.clone()),
    ];
    if let Some(parent) = entry.parent_identifier() {
        fields.push((PARENT_FIELD.to_string(), vec![parent.to_string()]));
    }

    for table in &entry.table_names {
        let mut table_tokens = Vec::new();
        for property in &entry.properties {
            let (terms, lengths, text) = property_terms(&property.value);
            let tokens: Vec<String> = text.iter().flat_map(|t| tokenize(t)).collect();

            fields.push((property_field(table, &property.name), terms));
            fields.push((length_field(table, &property.name), lengths));
            if !tokens.is_empty() {
                table_tokens.extend(tokens.iter().cloned());
                fields.push((text_field(table, &property.name), tokens));
            }
        }
        if !table_tokens.is_empty() {
            fields.push((table_text_field(table), table_tokens));
        }
    }
    fields
}

/// Encoded terms, encoded lengths and searchable text of one property value.
fn property_terms(value: &ContentValue) -> (Vec<String>, Vec<String>, Vec<String>) {
    match value {
        ContentValue::Simple(values) => {
            let terms = values.iter().map(encode_value).collect();
            let lengths = values.iter().map(|v| encode_long(v.length())).collect();
            let text = values
                .iter()
                .filter_map(|v| match v {
                    Value::Binary(bytes) => std::str::from_utf8(bytes).ok().map(str::to_string),
                    other => other.as_text().map(str::to_string),
                })
                .collect();
            (terms, lengths, text)
        }
        ContentValue::Binary(binary) => {
            let length = i64::try_from(binary.length).unwrap_or(i64::MAX);
            let text: Vec<String> = binary.text().map(str::to_string).into_iter().collect();
            (text.clone(), vec![encode_long(length)], text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reposearch_core::{BinaryValue, Property};
    use reposearch_query::RangeBound;

    fn snapshot() -> IndexSnapshot {
        let mut snapshot = IndexSnapshot::new();
        snapshot
            .insert(ContentEntry::new("root", "").with_path("/"))
            .unwrap();
        snapshot
            .insert(
                ContentEntry::new("m", "missions")
                    .with_path("/missions")
                    .in_table("folder")
                    .with_ancestors(["root"]),
            )
            .unwrap();
        snapshot
            .insert(
                ContentEntry::new("a11", "dna:apollo11")
                    .with_path("/missions/apollo11")
                    .in_table("doc")
                    .with_ancestors(["m", "root"])
                    .with_property(Property::single("title", "Apollo 11"))
                    .with_property(Property::single("crew", 3_i64))
                    .with_property(Property::binary(
                        "report",
                        BinaryValue::new(b"Eagle has landed".to_vec()),
                    )),
            )
            .unwrap();
        snapshot
    }

    fn ids(snapshot: &IndexSnapshot, predicate: &Predicate) -> Vec<String> {
        let mut ids: Vec<String> = snapshot
            .evaluate(predicate)
            .unwrap()
            .iter()
            .filter_map(|doc| snapshot.entry(doc).map(|e| e.identifier.clone()))
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_reserved_fields() {
        let snapshot = snapshot();
        assert_eq!(ids(&snapshot, &Predicate::term(PARENT_FIELD, "m", true)), vec!["a11"]);
        assert_eq!(
            ids(&snapshot, &Predicate::term(ANCESTOR_FIELD, "root", true)),
            vec!["a11", "m"]
        );
        assert_eq!(
            ids(&snapshot, &Predicate::term(DEPTH_FIELD, encode_long(0), true)),
            vec!["root"]
        );
        assert_eq!(
            ids(&snapshot, &Predicate::term(LOCAL_NAME_FIELD, "apollo11", true)),
            vec!["a11"]
        );
        assert_eq!(snapshot.resolve("/missions").as_deref(), Some("m"));
    }

    #[test]
    fn test_property_length_and_text_fields() {
        let snapshot = snapshot();
        let crew = Predicate::range(
            "doc.crew",
            RangeBound::Included(encode_long(2)),
            RangeBound::Unbounded,
            true,
        );
        assert_eq!(ids(&snapshot, &crew), vec!["a11"]);
        assert_eq!(
            ids(&snapshot, &Predicate::term("doc.title$length", encode_long(9), true)),
            vec!["a11"]
        );
        assert_eq!(
            ids(&snapshot, &Predicate::full_text("doc$text", "eagle apollo")),
            vec!["a11"]
        );
        assert_eq!(
            ids(&snapshot, &Predicate::full_text("doc.report$text", "apollo")),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_wildcard_and_regex() {
        let snapshot = snapshot();
        assert_eq!(
            ids(&snapshot, &Predicate::wildcard(NAME_FIELD, "*:apollo?1", true)),
            vec!["a11"]
        );
        assert_eq!(
            ids(&snapshot, &Predicate::wildcard(NAME_FIELD, "\\*", true)),
            Vec::<String>::new()
        );
        assert_eq!(
            ids(&snapshot, &Predicate::regex("doc.title", "^apollo.*$", false)),
            vec!["a11"]
        );
        assert!(snapshot
            .evaluate(&Predicate::regex("doc.title", "(", true))
            .unwrap_err()
            .is_invalid_query());
    }

    #[test]
    fn test_boolean_and_negation() {
        let snapshot = snapshot();
        let not_doc = Predicate::not(Predicate::term(TABLE_FIELD, "doc", true));
        assert_eq!(ids(&snapshot, &not_doc), vec!["m", "root"]);
        let either = Predicate::should(vec![
            Predicate::term(ID_FIELD, "root", true),
            Predicate::term(ID_FIELD, "m", true),
        ]);
        assert_eq!(ids(&snapshot, &either), vec!["m", "root"]);
        assert!(ids(&snapshot, &Predicate::MatchNone).is_empty());
    }

    #[test]
    fn test_replace_and_remove() {
        let mut snapshot = snapshot();
        snapshot
            .insert(
                ContentEntry::new("a11", "dna:apollo11")
                    .in_table("doc")
                    .with_property(Property::single("title", "Apollo Eleven")),
            )
            .unwrap();
        assert_eq!(snapshot.len(), 3);
        assert!(ids(&snapshot, &Predicate::term("doc.title", "Apollo 11", true)).is_empty());
        assert!(snapshot.resolve("/missions/apollo11").is_none());

        assert!(snapshot.remove("a11"));
        assert!(!snapshot.remove("a11"));
        assert!(snapshot.field("doc.title").is_none());
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_score_counts_full_text_hits() {
        let snapshot = snapshot();
        let doc = snapshot.doc_ids["a11"];
        let predicate = Predicate::must(vec![
            Predicate::term(TABLE_FIELD, "doc", true),
            Predicate::full_text("doc$text", "eagle landed moon"),
        ]);
        assert!((snapshot.score(&predicate, doc) - 2.0).abs() < f32::EPSILON);
        let negated = Predicate::not(Predicate::full_text("doc$text", "eagle"));
        assert!(snapshot.score(&negated, doc).abs() < f32::EPSILON);
    }
}
