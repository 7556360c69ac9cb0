//! Per-field inverted index over encoded terms.
//!
//! Terms are kept in a sorted map so range predicates locate their bounds in
//! `O(log n)` instead of scanning. A second, lower-cased map serves the
//! case-insensitive predicates.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use regex::Regex;
use reposearch_query::RangeBound;
use roaring::RoaringBitmap;

/// Terms of one field and the documents carrying them.
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    terms: BTreeMap<String, RoaringBitmap>,
    folded: BTreeMap<String, RoaringBitmap>,
    exists: RoaringBitmap,
    doc_terms: HashMap<u32, Vec<String>>,
}

impl FieldIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exists.is_empty()
    }

    /// Adds `terms` for `doc_id`, keeping terms the document already had.
    pub fn insert<I>(&mut self, doc_id: u32, terms: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut unique: BTreeSet<String> = self
            .doc_terms
            .remove(&doc_id)
            .unwrap_or_default()
            .into_iter()
            .collect();
        unique.extend(terms);
        if unique.is_empty() {
            return;
        }

        self.exists.insert(doc_id);
        for term in &unique {
            self.terms.entry(term.clone()).or_default().insert(doc_id);
            self.folded
                .entry(term.to_lowercase())
                .or_default()
                .insert(doc_id);
        }
        self.doc_terms.insert(doc_id, unique.into_iter().collect());
    }

    /// Removes `doc_id`; returns `true` when the field is left empty.
    pub fn remove(&mut self, doc_id: u32) -> bool {
        if let Some(terms) = self.doc_terms.remove(&doc_id) {
            for term in terms {
                remove_posting(&mut self.terms, &term, doc_id);
                remove_posting(&mut self.folded, &term.to_lowercase(), doc_id);
            }
        }
        self.exists.remove(doc_id);
        self.exists.is_empty()
    }

    #[must_use]
    pub fn exists(&self) -> &RoaringBitmap {
        &self.exists
    }

    /// Sorted terms of one document.
    #[must_use]
    pub fn doc_terms(&self, doc_id: u32) -> Option<&[String]> {
        self.doc_terms.get(&doc_id).map(Vec::as_slice)
    }

    #[must_use]
    pub fn term(&self, value: &str, case_sensitive: bool) -> RoaringBitmap {
        let (map, key) = self.lookup(value, case_sensitive);
        map.get(key.as_str()).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn range(&self, lower: &RangeBound, upper: &RangeBound, case_sensitive: bool) -> RoaringBitmap {
        let fold = |value: &str| {
            if case_sensitive {
                value.to_string()
            } else {
                value.to_lowercase()
            }
        };
        let lower = to_bound(lower, fold);
        let upper = to_bound(upper, fold);
        if is_empty_range(&lower, &upper) {
            return RoaringBitmap::new();
        }

        let map = if case_sensitive { &self.terms } else { &self.folded };
        let mut bitmap = RoaringBitmap::new();
        for (_term, ids) in map.range::<String, _>((lower, upper)) {
            bitmap |= ids;
        }
        bitmap
    }

    /// Union of the postings of every term `regex` matches in full.
    #[must_use]
    pub fn matching(&self, regex: &Regex, case_sensitive: bool) -> RoaringBitmap {
        let map = if case_sensitive { &self.terms } else { &self.folded };
        let mut bitmap = RoaringBitmap::new();
        for (term, ids) in map {
            if regex.is_match(term) {
                bitmap |= ids;
            }
        }
        bitmap
    }

    fn lookup(&self, value: &str, case_sensitive: bool) -> (&BTreeMap<String, RoaringBitmap>, String) {
        if case_sensitive {
            (&self.terms, value.to_string())
        } else {
            (&self.folded, value.to_lowercase())
        }
    }
}

fn remove_posting(map: &mut BTreeMap<String, RoaringBitmap>, term: &str, doc_id: u32) {
    if let Some(bitmap) = map.get_mut(term) {
        bitmap.remove(doc_id);
        if bitmap.is_empty() {
            map.remove(term);
        }
    }
}

/// Bounds `BTreeMap::range` would reject, all of which select nothing.
fn is_empty_range(lower: &Bound<String>, upper: &Bound<String>) -> bool {
    match (lower, upper) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo) | Bound::Excluded(lo), Bound::Included(hi) | Bound::Excluded(hi)) => {
            lo >= hi
        }
        _ => false,
    }
}

fn to_bound(bound: &RangeBound, fold: impl Fn(&str) -> String) -> Bound<String> {
    match bound {
        RangeBound::Unbounded => Bound::Unbounded,
        RangeBound::Included(value) => Bound::Included(fold(value)),
        RangeBound::Excluded(value) => Bound::Excluded(fold(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> FieldIndex {
        let mut index = FieldIndex::new();
        index.insert(1, ["Apollo".to_string()]);
        index.insert(2, ["apollo".to_string(), "Gemini".to_string()]);
        index.insert(3, ["Mercury".to_string()]);
        index
    }

    #[test]
    fn test_term_lookup_respects_case_mode() {
        let index = index();
        assert_eq!(index.term("Apollo", true).iter().collect::<Vec<_>>(), vec![1]);
        assert_eq!(index.term("APOLLO", false).iter().collect::<Vec<_>>(), vec![1, 2]);
        assert!(index.term("Vostok", true).is_empty());
    }

    #[test]
    fn test_range_bounds() {
        let index = index();
        let hits = index.range(
            &RangeBound::Included("Gemini".into()),
            &RangeBound::Excluded("Mercury".into()),
            true,
        );
        assert_eq!(hits.iter().collect::<Vec<_>>(), vec![2]);

        let inverted = index.range(
            &RangeBound::Included("z".into()),
            &RangeBound::Included("a".into()),
            true,
        );
        assert!(inverted.is_empty());

        let point = index.range(
            &RangeBound::Excluded("Gemini".into()),
            &RangeBound::Excluded("Gemini".into()),
            true,
        );
        assert!(point.is_empty());
    }

    #[test]
    fn test_regex_matching() {
        let index = index();
        let regex = Regex::new("^apo.*$").unwrap();
        assert_eq!(index.matching(&regex, true).iter().collect::<Vec<_>>(), vec![2]);
        assert_eq!(index.matching(&regex, false).iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_remove_cleans_postings() {
        let mut index = index();
        assert!(!index.remove(2));
        assert!(index.term("apollo", true).is_empty());
        assert_eq!(index.term("apollo", false).iter().collect::<Vec<_>>(), vec![1]);
        assert!(index.doc_terms(2).is_none());
        assert!(!index.remove(1));
        assert!(index.remove(3));
        assert!(index.is_empty());
    }
}
