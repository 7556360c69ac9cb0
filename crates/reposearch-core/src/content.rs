//! Content model: the indexable units handed to the index by the storage
//! adapter.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::value::{PropertyType, Value};

/// The smallest indexable unit.
///
/// `name` is the entry's label exactly as stored: `prefix:local` for a
/// namespace-qualified name, or the bare local name otherwise.
/// `parent_identifiers` lists the identifiers of the entry's ancestors,
/// nearest first, so the direct parent is the first element and the depth is
/// the length of the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub identifier: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub table_names: Vec<String>,
    #[serde(default)]
    pub parent_identifiers: Vec<String>,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl ContentEntry {
    #[must_use]
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            path: None,
            table_names: Vec::new(),
            parent_identifiers: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Sets the absolute path (builder pattern).
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Adds a table the entry belongs to (builder pattern).
    #[must_use]
    pub fn in_table(mut self, table: impl Into<String>) -> Self {
        self.table_names.push(table.into());
        self
    }

    /// Sets the ancestor chain, nearest first (builder pattern).
    #[must_use]
    pub fn with_ancestors<I, S>(mut self, ancestors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent_identifiers = ancestors.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a property (builder pattern).
    #[must_use]
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Name without its namespace prefix.
    #[must_use]
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    #[must_use]
    pub fn parent_identifier(&self) -> Option<&str> {
        self.parent_identifiers.first().map(String::as_str)
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.parent_identifiers.len()
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Strips a `prefix:` from a qualified name.
#[must_use]
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub property_type: PropertyType,
    pub name: String,
    pub value: ContentValue,
}

impl Property {
    /// A single-valued property whose type is the value's own type.
    #[must_use]
    pub fn single(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            property_type: value.property_type(),
            name: name.into(),
            value: ContentValue::Simple(vec![value]),
        }
    }

    #[must_use]
    pub fn multi(name: impl Into<String>, property_type: PropertyType, values: Vec<Value>) -> Self {
        Self {
            property_type,
            name: name.into(),
            value: ContentValue::Simple(values),
        }
    }

    #[must_use]
    pub fn binary(name: impl Into<String>, value: BinaryValue) -> Self {
        Self {
            property_type: PropertyType::Binary,
            name: name.into(),
            value: ContentValue::Binary(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentValue {
    /// In-memory values; more than one for multi-valued properties.
    Simple(Vec<Value>),
    Binary(BinaryValue),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryValue {
    pub content: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    pub length: u64,
}

impl BinaryValue {
    #[must_use]
    pub fn new(content: impl Into<Bytes>) -> Self {
        let content = content.into();
        Self {
            length: content.len() as u64,
            content,
            mime_type: None,
            encoding: None,
        }
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// The content as text, when it is valid UTF-8 (or no encoding says otherwise).
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self.encoding.as_deref() {
            None => std::str::from_utf8(&self.content).ok(),
            Some(enc) if enc.eq_ignore_ascii_case("utf-8") || enc.eq_ignore_ascii_case("utf8") => {
                std::str::from_utf8(&self.content).ok()
            }
            Some(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name_strips_prefix() {
        assert_eq!(local_name("jcr:content"), "content");
        assert_eq!(local_name("content"), "content");
        let entry = ContentEntry::new("id-1", "dna:report");
        assert_eq!(entry.local_name(), "report");
    }

    #[test]
    fn test_ancestors_give_parent_and_depth() {
        let entry = ContentEntry::new("c", "child").with_ancestors(["b", "a", "root"]);
        assert_eq!(entry.parent_identifier(), Some("b"));
        assert_eq!(entry.depth(), 3);
        assert_eq!(ContentEntry::new("root", "").depth(), 0);
    }

    #[test]
    fn test_binary_value_length_and_text() {
        let value = BinaryValue::new(b"hello".to_vec()).with_mime_type("text/plain");
        assert_eq!(value.length, 5);
        assert_eq!(value.text(), Some("hello"));
        assert_eq!(value.clone().with_encoding("latin-1").text(), None);
    }

    #[test]
    fn test_property_lookup() {
        let entry = ContentEntry::new("1", "doc")
            .in_table("doc")
            .with_property(Property::single("title", "Apollo 11"));
        assert_eq!(entry.property("title").unwrap().property_type, PropertyType::String);
        assert!(entry.property("missing").is_none());
    }
}
