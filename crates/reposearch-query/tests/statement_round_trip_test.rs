//! Statement rendering is idempotent across an independent rebuild of the
//! tree. The JSON codec stands in for a second front-end: a tree is rendered,
//! encoded, decoded into a fresh tree and rendered again.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use reposearch_core::qom::{
    ChildNode, Column, Comparison, Constraint, DescendantNodeJoinCondition, EquiJoinCondition,
    FullTextSearch, FullTextSearchScore, Join, JoinType, Length, Limit, Literal, LowerCase,
    NodeDepth, NodeLocalName, NodeName, Operator, Ordering, PropertyExistence, PropertyValue,
    Query, SameNode, Selector, UpperCase,
};
use reposearch_core::{PropertyType, Value};
use reposearch_query::render;

fn rebuilt(query: &Query) -> Query {
    let json = serde_json::to_string(query).unwrap();
    serde_json::from_str(&json).unwrap()
}

fn assert_round_trip(query: &Query) {
    let statement = render(query);
    assert_eq!(render(&rebuilt(query)), statement);
}

fn sample_queries() -> Vec<Query> {
    let date = Utc.with_ymd_and_hms(1969, 7, 20, 20, 17, 40).unwrap();
    vec![
        Query::new(Selector::new("doc")),
        Query::new(Selector::new("nt:file").with_alias("f"))
            .with_constraint(
                Constraint::from(Comparison::new(
                    UpperCase::new(PropertyValue::new("f", "jcr:title")),
                    Operator::Like,
                    Literal::new("APOLLO%"),
                ))
                .and(
                    Constraint::from(ChildNode::new("f", "/missions"))
                        .or(SameNode::new("f", "/missions/apollo 11")),
                ),
            )
            .order_by(Ordering::descending(FullTextSearchScore::new("f")))
            .order_by(Ordering::ascending(LowerCase::new(NodeLocalName::new("f"))))
            .with_column(Column::new("f", "jcr:title").with_alias("title"))
            .with_column(Column::all_of("f"))
            .with_limit(Limit::rows(25).with_offset(50)),
        Query::new(Join::new(
            Join::new(
                Selector::new("doc").with_alias("d"),
                JoinType::LeftOuter,
                Selector::new("folder").with_alias("f"),
                DescendantNodeJoinCondition::new("d", "f"),
            ),
            JoinType::RightOuter,
            Selector::new("person").with_alias("p"),
            EquiJoinCondition::new("d", "author", "p", "id"),
        ))
        .with_constraint(
            Constraint::from(Comparison::new(
                Length::new(PropertyValue::new("d", "title")),
                Operator::GreaterThanOrEqualTo,
                Literal::new(3_i64),
            ))
            .and(Comparison::new(
                NodeDepth::new("f"),
                Operator::LessThan,
                Literal::new(4_i64),
            ))
            .and(Constraint::from(PropertyExistence::new("p", "email")).negate()),
        ),
        Query::new(Selector::new("event").with_alias("e")).with_constraint(
            Constraint::from(Comparison::new(
                PropertyValue::new("e", "at"),
                Operator::GreaterThan,
                Literal::new(date),
            ))
            .and(Comparison::new(
                PropertyValue::new("e", "cost"),
                Operator::LessThanOrEqualTo,
                Literal::typed("19.990", PropertyType::Decimal).unwrap(),
            ))
            .and(Comparison::new(
                NodeName::new("e"),
                Operator::EqualTo,
                Literal::typed("ev:launch", PropertyType::Name).unwrap(),
            ))
            .and(Comparison::new(
                PropertyValue::new("e", "ratio"),
                Operator::NotEqualTo,
                Literal::new(Value::Double(0.25)),
            ))
            .and(FullTextSearch::new("e", "saturn \"five\"").on_property("notes")),
        ),
        Query::new(Selector::new("ns:a]b").with_alias("x]"))
            .with_constraint(Comparison::new(
                PropertyValue::new("x]", "[odd]]name]"),
                Operator::EqualTo,
                Literal::new("]"),
            ))
            .with_column(Column::new("x]", "[odd]]name]").with_alias("a b")),
        Query::new(Join::new(
            Selector::new("doc").with_alias("d"),
            JoinType::Inner,
            Join::new(
                Selector::new("folder").with_alias("f"),
                JoinType::LeftOuter,
                Selector::new("person").with_alias("p"),
                EquiJoinCondition::new("f", "owner", "p", "id"),
            ),
            DescendantNodeJoinCondition::new("d", "f"),
        )),
    ]
}

/// Inverse of bracket quoting: the text between the outer brackets with
/// every `]]` collapsed.
fn unbracket(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('[')?.strip_suffix(']')?;
    Some(inner.replace("]]", "]"))
}

#[test]
fn test_sample_queries_round_trip() {
    for query in sample_queries() {
        assert_round_trip(&query);
    }
}

#[test]
fn test_rendering_is_stable() {
    for query in sample_queries() {
        assert_eq!(render(&query), render(&query.clone()));
    }
}

#[test]
fn test_bracketed_names_are_unambiguous() {
    let statement = render(&Query::new(Selector::new("a]b")));
    assert_eq!(statement, "SELECT * FROM [a]]b]");
    let name = statement.trim_start_matches("SELECT * FROM ");
    assert_eq!(unbracket(name).as_deref(), Some("a]b"));
}

#[test]
fn test_right_nested_join_keeps_its_grouping() {
    let statement = render(&sample_queries()[5]);
    assert!(
        statement.contains("INNER JOIN (folder AS f LEFT OUTER JOIN person AS p ON f.owner = p.id) ON"),
        "{statement}"
    );
}

#[test]
fn test_non_finite_doubles_render_castable_text() {
    for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let query = Query::new(Selector::new("doc")).with_constraint(Comparison::new(
            PropertyValue::new("doc", "ratio"),
            Operator::NotEqualTo,
            Literal::new(value),
        ));
        let statement = render(&query);
        let text = statement
            .split("CAST('")
            .nth(1)
            .and_then(|rest| rest.strip_suffix("' AS DOUBLE)"))
            .unwrap_or_else(|| panic!("no DOUBLE cast in {statement}"));

        let Value::Double(parsed) = Value::from(text).cast(PropertyType::Double).unwrap() else {
            panic!("'{text}' did not cast to a double");
        };
        assert!(parsed.to_bits() == value.to_bits() || (parsed.is_nan() && value.is_nan()));
    }
}

proptest! {
    #[test]
    fn prop_bracketed_names_round_trip(name in "[a-z\\]\\[: ]{1,12}") {
        let query = Query::new(Selector::new(name.as_str()));
        let statement = render(&query);
        let rendered = statement.trim_start_matches("SELECT * FROM ");
        if rendered != name {
            prop_assert_eq!(unbracket(rendered), Some(name.clone()));
        }
        assert_round_trip(&query);
    }

    #[test]
    fn prop_string_literals_round_trip(text in "\\PC{0,32}", property in "[a-z]{1,8}(:[a-z]{1,8})?") {
        let query = Query::new(Selector::new("doc")).with_constraint(Comparison::new(
            PropertyValue::new("doc", property.as_str()),
            Operator::EqualTo,
            Literal::new(text.as_str()),
        ));
        assert_round_trip(&query);
    }

    #[test]
    fn prop_long_literals_round_trip(value: i64, limit in 0usize..10_000) {
        let query = Query::new(Selector::new("doc"))
            .with_constraint(Comparison::new(
                Length::new(PropertyValue::new("doc", "a")),
                Operator::LessThan,
                Literal::new(value),
            ))
            .with_limit(Limit::rows(limit));
        assert_round_trip(&query);
    }
}
