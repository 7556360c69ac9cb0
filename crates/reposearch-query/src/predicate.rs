//! Backend predicates produced by the compiler.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One end of a [`Predicate::Range`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeBound {
    Unbounded,
    Included(String),
    Excluded(String),
}

impl RangeBound {
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Unbounded => None,
            Self::Included(v) | Self::Excluded(v) => Some(v),
        }
    }
}

/// An executable matching rule over index fields.
///
/// Values are already encoded (see [`crate::encoding`]). When
/// `case_sensitive` is false the value is lower-case and the backend compares
/// it against lower-cased terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Exact term match.
    Term {
        field: String,
        value: String,
        case_sensitive: bool,
    },
    /// Terms between two bounds, compared lexicographically.
    Range {
        field: String,
        lower: RangeBound,
        upper: RangeBound,
        case_sensitive: bool,
    },
    /// Glob match: `*` is any sequence, `?` any single character.
    Wildcard {
        field: String,
        pattern: String,
        case_sensitive: bool,
    },
    /// Anchored regular expression match.
    Regex {
        field: String,
        pattern: String,
        case_sensitive: bool,
    },
    /// The entry has at least one term in `field`.
    Exists { field: String },
    /// Full-text search expression over a tokenized field.
    FullText { field: String, expression: String },
    MatchAll,
    MatchNone,
    /// Conjunction of `must`, at least one of `should` (when non-empty), and
    /// none of `must_not`.
    Boolean {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        must: Vec<Predicate>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        should: Vec<Predicate>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        must_not: Vec<Predicate>,
    },
}

impl Predicate {
    #[must_use]
    pub fn term(field: impl Into<String>, value: impl Into<String>, case_sensitive: bool) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
            case_sensitive,
        }
    }

    #[must_use]
    pub fn range(
        field: impl Into<String>,
        lower: RangeBound,
        upper: RangeBound,
        case_sensitive: bool,
    ) -> Self {
        Self::Range {
            field: field.into(),
            lower,
            upper,
            case_sensitive,
        }
    }

    #[must_use]
    pub fn wildcard(field: impl Into<String>, pattern: impl Into<String>, case_sensitive: bool) -> Self {
        Self::Wildcard {
            field: field.into(),
            pattern: pattern.into(),
            case_sensitive,
        }
    }

    #[must_use]
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>, case_sensitive: bool) -> Self {
        Self::Regex {
            field: field.into(),
            pattern: pattern.into(),
            case_sensitive,
        }
    }

    #[must_use]
    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists {
            field: field.into(),
        }
    }

    #[must_use]
    pub fn full_text(field: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::FullText {
            field: field.into(),
            expression: expression.into(),
        }
    }

    /// Every clause must match.
    #[must_use]
    pub fn must(clauses: Vec<Predicate>) -> Self {
        Self::Boolean {
            must: clauses,
            should: Vec::new(),
            must_not: Vec::new(),
        }
    }

    /// At least one clause must match.
    #[must_use]
    pub fn should(clauses: Vec<Predicate>) -> Self {
        Self::Boolean {
            must: Vec::new(),
            should: clauses,
            must_not: Vec::new(),
        }
    }

    /// `base` minus everything `excluded` matches.
    #[must_use]
    pub fn exclude(base: Predicate, excluded: Predicate) -> Self {
        Self::Boolean {
            must: vec![base],
            should: Vec::new(),
            must_not: vec![excluded],
        }
    }

    /// Every entry `predicate` does not match.
    #[must_use]
    pub fn not(predicate: Predicate) -> Self {
        Self::exclude(Self::MatchAll, predicate)
    }

    /// The field the predicate reads, for single-field predicates.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Term { field, .. }
            | Self::Range { field, .. }
            | Self::Wildcard { field, .. }
            | Self::Regex { field, .. }
            | Self::Exists { field }
            | Self::FullText { field, .. } => Some(field),
            Self::MatchAll | Self::MatchNone | Self::Boolean { .. } => None,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ci = |case_sensitive: &bool| if *case_sensitive { "" } else { "~" };
        match self {
            Self::Term {
                field,
                value,
                case_sensitive,
            } => write!(f, "{field}:{}{value:?}", ci(case_sensitive)),
            Self::Range {
                field,
                lower,
                upper,
                case_sensitive,
            } => {
                let open = match lower {
                    RangeBound::Included(_) => '[',
                    _ => '(',
                };
                let close = match upper {
                    RangeBound::Included(_) => ']',
                    _ => ')',
                };
                write!(
                    f,
                    "{field}:{}{open}{} TO {}{close}",
                    ci(case_sensitive),
                    lower.value().unwrap_or("*"),
                    upper.value().unwrap_or("*"),
                )
            }
            Self::Wildcard {
                field,
                pattern,
                case_sensitive,
            } => write!(f, "{field}:{}{pattern}", ci(case_sensitive)),
            Self::Regex {
                field,
                pattern,
                case_sensitive,
            } => write!(f, "{field}:{}/{pattern}/", ci(case_sensitive)),
            Self::Exists { field } => write!(f, "{field}:*"),
            Self::FullText { field, expression } => write!(f, "{field}:CONTAINS({expression:?})"),
            Self::MatchAll => f.write_str("*:*"),
            Self::MatchNone => f.write_str("-*:*"),
            Self::Boolean {
                must,
                should,
                must_not,
            } => {
                f.write_str("(")?;
                let mut first = true;
                let clauses = must
                    .iter()
                    .map(|p| ("+", p))
                    .chain(should.iter().map(|p| ("", p)))
                    .chain(must_not.iter().map(|p| ("-", p)));
                for (prefix, clause) in clauses {
                    if !first {
                        f.write_str(" ")?;
                    }
                    first = false;
                    write!(f, "{prefix}{clause}")?;
                }
                f.write_str(")")
            }
        }
    }
}
