//! Index field names.
//!
//! Property fields are qualified by the table they were indexed under, so the
//! same property name on two node types never shares a posting list. Fields
//! that describe the entry itself live under the reserved `::` prefix, which
//! cannot collide with a table name.

/// Full (possibly prefixed) name of the entry.
pub const NAME_FIELD: &str = "::name";
/// Name without the namespace prefix.
pub const LOCAL_NAME_FIELD: &str = "::localname";
/// Entry identifier.
pub const ID_FIELD: &str = "::id";
/// Identifier of the direct parent.
pub const PARENT_FIELD: &str = "::parent";
/// Identifiers of every ancestor.
pub const ANCESTOR_FIELD: &str = "::ancestor";
/// Depth below the root, numerically encoded.
pub const DEPTH_FIELD: &str = "::depth";
/// Every table the entry was indexed under.
pub const TABLE_FIELD: &str = "::table";

const LENGTH_SUFFIX: &str = "$length";
const TEXT_SUFFIX: &str = "$text";

/// Field holding the values of `property` for entries of `table`.
#[must_use]
pub fn property_field(table: &str, property: &str) -> String {
    format!("{table}.{property}")
}

/// Field holding the encoded lengths of the values of `property`.
#[must_use]
pub fn length_field(table: &str, property: &str) -> String {
    format!("{table}.{property}{LENGTH_SUFFIX}")
}

/// Field holding the tokenized text of `property`.
#[must_use]
pub fn text_field(table: &str, property: &str) -> String {
    format!("{table}.{property}{TEXT_SUFFIX}")
}

/// Field holding the tokenized text of every searchable property of `table`.
#[must_use]
pub fn table_text_field(table: &str) -> String {
    format!("{table}{TEXT_SUFFIX}")
}

#[must_use]
pub fn is_reserved(field: &str) -> bool {
    field.starts_with("::")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names() {
        assert_eq!(property_field("doc", "title"), "doc.title");
        assert_eq!(length_field("doc", "title"), "doc.title$length");
        assert_eq!(text_field("doc", "title"), "doc.title$text");
        assert_eq!(table_text_field("doc"), "doc$text");
    }

    #[test]
    fn test_reserved_fields() {
        for field in [
            NAME_FIELD,
            LOCAL_NAME_FIELD,
            ID_FIELD,
            PARENT_FIELD,
            ANCESTOR_FIELD,
            DEPTH_FIELD,
            TABLE_FIELD,
        ] {
            assert!(is_reserved(field), "{field}");
        }
        assert!(!is_reserved(&property_field("nt:base", "jcr:title")));
    }
}
