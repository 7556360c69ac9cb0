//! Tokenizer and full-text expression evaluation.
//!
//! Expressions follow the usual search-box grammar: whitespace-separated
//! terms are all required, `-term` excludes, `"a phrase"` requires each of
//! its words, and the keyword `OR` separates alternatives.

use roaring::RoaringBitmap;
use unicode_segmentation::UnicodeSegmentation;

use crate::inverted_index::FieldIndex;

/// Lower-cased Unicode words of `text`.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Clause {
    required: Vec<String>,
    excluded: Vec<String>,
}

impl Clause {
    fn is_empty(&self) -> bool {
        self.required.is_empty() && self.excluded.is_empty()
    }
}

/// A parsed full-text expression: a disjunction of clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullTextExpression {
    alternatives: Vec<Clause>,
}

impl FullTextExpression {
    #[must_use]
    pub fn parse(expression: &str) -> Self {
        let mut alternatives = Vec::new();
        let mut clause = Clause::default();

        for (word, negated, quoted) in split_words(expression) {
            if !quoted && !negated && word == "OR" {
                if !clause.is_empty() {
                    alternatives.push(std::mem::take(&mut clause));
                }
                continue;
            }
            let tokens = tokenize(&word);
            if negated {
                clause.excluded.extend(tokens);
            } else {
                clause.required.extend(tokens);
            }
        }
        if !clause.is_empty() {
            alternatives.push(clause);
        }
        Self { alternatives }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Every required term across the alternatives.
    pub fn scoring_terms(&self) -> impl Iterator<Item = &str> {
        self.alternatives
            .iter()
            .flat_map(|clause| clause.required.iter().map(String::as_str))
    }

    /// Entries of `universe` matching the expression in `field`.
    #[must_use]
    pub fn evaluate(&self, field: Option<&FieldIndex>, universe: &RoaringBitmap) -> RoaringBitmap {
        let mut matches = RoaringBitmap::new();
        for clause in &self.alternatives {
            let mut hits = universe.clone();
            for term in &clause.required {
                match field {
                    Some(index) => hits &= index.term(term, true),
                    None => hits.clear(),
                }
            }
            if let Some(index) = field {
                for term in &clause.excluded {
                    hits -= index.term(term, true);
                }
            }
            matches |= hits;
        }
        matches
    }

    /// Number of the expression's terms that `doc_id` contains in `field`.
    #[must_use]
    pub fn hits(&self, field: &FieldIndex, doc_id: u32) -> usize {
        let Some(terms) = field.doc_terms(doc_id) else {
            return 0;
        };
        self.scoring_terms()
            .filter(|term| terms.binary_search_by(|t| t.as_str().cmp(term)).is_ok())
            .count()
    }
}

/// Splits on whitespace, keeping quoted phrases together.
/// Yields `(text, negated, quoted)`.
fn split_words(expression: &str) -> Vec<(String, bool, bool)> {
    let mut words = Vec::new();
    let mut chars = expression.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let negated = c == '-';
        if negated {
            chars.next();
        }
        if chars.peek() == Some(&'"') {
            chars.next();
            let phrase: String = chars.by_ref().take_while(|&c| c != '"').collect();
            words.push((phrase, negated, true));
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                word.push(c);
                chars.next();
            }
            words.push((word, negated, false));
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> FieldIndex {
        let mut field = FieldIndex::new();
        field.insert(1, tokenize("Apollo 11 landed on the Moon"));
        field.insert(2, tokenize("Gemini rehearsed docking before the Moon"));
        field.insert(3, tokenize("Mercury carried one astronaut"));
        field
    }

    fn universe() -> RoaringBitmap {
        (1..=3).collect()
    }

    fn eval(expression: &str) -> Vec<u32> {
        FullTextExpression::parse(expression)
            .evaluate(Some(&field()), &universe())
            .iter()
            .collect()
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Apollo-11, the MOON!"), vec!["apollo", "11", "the", "moon"]);
        assert!(tokenize("  ,; ").is_empty());
    }

    #[test]
    fn test_terms_are_conjunctive() {
        assert_eq!(eval("moon"), vec![1, 2]);
        assert_eq!(eval("moon apollo"), vec![1]);
        assert_eq!(eval("MOON Vostok"), Vec::<u32>::new());
    }

    #[test]
    fn test_exclusion_phrase_and_or() {
        assert_eq!(eval("moon -gemini"), vec![1]);
        assert_eq!(eval("\"landed on\""), vec![1]);
        assert_eq!(eval("apollo OR mercury"), vec![1, 3]);
        assert_eq!(eval("-moon"), vec![3]);
    }

    #[test]
    fn test_hits_count_matched_terms() {
        let expression = FullTextExpression::parse("moon apollo");
        let field = field();
        assert_eq!(expression.hits(&field, 1), 2);
        assert_eq!(expression.hits(&field, 2), 1);
        assert_eq!(expression.hits(&field, 3), 0);
    }

    #[test]
    fn test_missing_field_matches_nothing() {
        let expression = FullTextExpression::parse("moon");
        assert!(expression.evaluate(None, &universe()).is_empty());
    }
}
