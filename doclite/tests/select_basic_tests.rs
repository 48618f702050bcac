//! SELECT execution basics: no-target statements, full scans, filters,
//! projections, ORDER BY, DISTINCT, SKIP/LIMIT, subscripts and item
//! filters

#[path = "testutils/mod.rs"]
mod testutils;

use doclite::ast::{
    BooleanExpression, CollectionFilter, ComparisonOp, Expression, OrderItem, Projection,
    SelectStatement, SortDirection,
};
use doclite::exec::steps::StepKind;
use doclite::storage::memory::MemoryDatabase;
use doclite::Value;
use testutils::{executor, init_logging, integer, rows, seed_people, text};

fn no_target_projections() -> SelectStatement {
    SelectStatement::new()
        .with_aliased_projection(Expression::literal(1i64), "one")
        .with_aliased_projection(Expression::literal(2i64), "two")
        .with_projection(Expression::add(
            Expression::literal(2i64),
            Expression::literal(3i64),
        ))
}

#[test]
fn test_select_no_target() {
    init_logging();
    let db = MemoryDatabase::new();
    let executor = executor(&db);
    let result = rows(&executor, &no_target_projections());
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].property("one"), Value::Integer(1));
    assert_eq!(result[0].property("two"), Value::Integer(2));
    assert_eq!(result[0].property("2 + 3"), Value::Integer(5));
}

#[test]
fn test_select_no_target_skip() {
    let db = MemoryDatabase::new();
    let executor = executor(&db);
    let result = rows(&executor, &no_target_projections().with_skip(1));
    assert!(result.is_empty());
}

#[test]
fn test_select_no_target_skip_zero() {
    let db = MemoryDatabase::new();
    let executor = executor(&db);
    let result = rows(&executor, &no_target_projections().with_skip(0));
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].property("2 + 3"), Value::Integer(5));
}

#[test]
fn test_select_no_target_limit_zero() {
    let db = MemoryDatabase::new();
    let executor = executor(&db);
    let result = rows(&executor, &no_target_projections().with_limit(0));
    assert!(result.is_empty());
}

#[test]
fn test_select_no_target_limit_one() {
    let db = MemoryDatabase::new();
    let executor = executor(&db);
    let result = rows(&executor, &no_target_projections().with_limit(1));
    assert_eq!(result.len(), 1);
}

#[test]
fn test_full_scan() {
    let db = MemoryDatabase::new();
    db.create_class("FullScan");
    seed_people(&db, "FullScan", 100);
    let executor = executor(&db);
    let result = rows(&executor, &SelectStatement::from_class("FullScan"));
    assert_eq!(result.len(), 100);
    for row in &result {
        assert!(text(row, "name").starts_with("name"));
        assert!(row.element().is_some());
    }
}

#[test]
fn test_full_scan_order_by_rid_asc_elides_sort() {
    let db = MemoryDatabase::new();
    db.create_class("RidAsc");
    seed_people(&db, "RidAsc", 50);
    let executor = executor(&db);
    let statement = SelectStatement::from_class("RidAsc")
        .with_order_by(OrderItem::rid(SortDirection::Ascending));
    let result = executor.query(&statement).unwrap();
    assert!(!result.execution_plan().contains(StepKind::OrderBy));
    let mut last = None;
    for row in result {
        let rid = row.unwrap().identity().unwrap();
        if let Some(previous) = last {
            assert!(rid > previous);
        }
        last = Some(rid);
    }
}

#[test]
fn test_full_scan_order_by_rid_desc_elides_sort() {
    let db = MemoryDatabase::new();
    db.create_class("RidDesc");
    seed_people(&db, "RidDesc", 50);
    let executor = executor(&db);
    let statement = SelectStatement::from_class("RidDesc")
        .with_order_by(OrderItem::rid(SortDirection::Descending));
    let result = executor.query(&statement).unwrap();
    assert!(!result.execution_plan().contains(StepKind::OrderBy));
    let mut last = None;
    for row in result {
        let rid = row.unwrap().identity().unwrap();
        if let Some(previous) = last {
            assert!(rid < previous);
        }
        last = Some(rid);
    }
}

#[test]
fn test_full_scan_limit() {
    let db = MemoryDatabase::new();
    db.create_class("ScanLimit");
    seed_people(&db, "ScanLimit", 300);
    let executor = executor(&db);
    let result = rows(
        &executor,
        &SelectStatement::from_class("ScanLimit").with_limit(10),
    );
    assert_eq!(result.len(), 10);
}

#[test]
fn test_full_scan_skip_limit() {
    let db = MemoryDatabase::new();
    db.create_class("ScanSkipLimit");
    seed_people(&db, "ScanSkipLimit", 300);
    let executor = executor(&db);
    let result = rows(
        &executor,
        &SelectStatement::from_class("ScanSkipLimit")
            .with_skip(100)
            .with_limit(10),
    );
    assert_eq!(result.len(), 10);
    assert_eq!(text(&result[0], "name"), "name100");
}

#[test]
fn test_skip_limit_laws() {
    let db = MemoryDatabase::new();
    db.create_class("Laws");
    seed_people(&db, "Laws", 10);
    let executor = executor(&db);
    for (skip, limit, expected) in [(0, 10, 10), (3, 4, 4), (8, 5, 2), (12, 5, 0), (3, 0, 0)] {
        let result = rows(
            &executor,
            &SelectStatement::from_class("Laws")
                .with_skip(skip)
                .with_limit(limit),
        );
        assert_eq!(
            result.len(),
            expected,
            "skip {} limit {} over 10 rows",
            skip,
            limit
        );
    }
}

#[test]
fn test_order_by_asc_and_desc() {
    let db = MemoryDatabase::new();
    db.create_class("Sorted");
    seed_people(&db, "Sorted", 30);
    let executor = executor(&db);

    let ascending = rows(
        &executor,
        &SelectStatement::from_class("Sorted").with_order_by(OrderItem::asc("surname")),
    );
    assert_eq!(ascending.len(), 30);
    for pair in ascending.windows(2) {
        assert!(text(&pair[0], "surname") <= text(&pair[1], "surname"));
    }

    let descending = rows(
        &executor,
        &SelectStatement::from_class("Sorted").with_order_by(OrderItem::desc("surname")),
    );
    for pair in descending.windows(2) {
        assert!(text(&pair[0], "surname") >= text(&pair[1], "surname"));
    }
}

#[test]
fn test_order_by_with_limit_bounds_result() {
    let db = MemoryDatabase::new();
    db.create_class("TopK");
    for i in 0..200 {
        db.insert(
            "TopK",
            vec![
                ("name", Value::from(format!("name{}", i))),
                ("surname", Value::from(format!("surname{}", i % 10))),
            ],
        );
    }
    let executor = executor(&db);
    let statement = SelectStatement::from_class("TopK")
        .with_order_by(OrderItem::asc("surname"))
        .with_limit(20);
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 20);
    for row in &result {
        assert_eq!(text(row, "surname"), "surname0");
    }
}

#[test]
fn test_order_by_non_projected_field() {
    let db = MemoryDatabase::new();
    db.create_class("OrderProj");
    for i in 0..100 {
        db.insert(
            "OrderProj",
            vec![
                ("name", Value::from(format!("name{}", i % 10))),
                ("surname", Value::from(format!("surname{}", i % 10))),
            ],
        );
    }
    let executor = executor(&db);
    let statement = SelectStatement::from_class("OrderProj")
        .with_projection(Expression::field("name"))
        .with_order_by(OrderItem::asc("surname"));
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 100);
    for pair in result.windows(2) {
        assert!(text(&pair[0], "name") <= text(&pair[1], "name"));
    }
}

#[test]
fn test_projections_drop_backing_element() {
    let db = MemoryDatabase::new();
    db.create_class("Proj");
    seed_people(&db, "Proj", 30);
    let executor = executor(&db);
    let statement =
        SelectStatement::from_class("Proj").with_projection(Expression::field("name"));
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 30);
    for row in &result {
        assert!(text(row, "name").starts_with("name"));
        assert_eq!(row.property("surname"), Value::Null);
        assert!(row.element().is_none());
    }
}

#[test]
fn test_full_scan_with_or_filter() {
    let db = MemoryDatabase::new();
    db.create_class("OrFilter");
    seed_people(&db, "OrFilter", 300);
    let executor = executor(&db);
    let statement = SelectStatement::from_class("OrFilter").with_predicate(
        BooleanExpression::or(vec![
            BooleanExpression::eq("name", "name1"),
            BooleanExpression::eq("name", "name7"),
        ]),
    );
    let result = executor.query(&statement).unwrap();
    // no index declared: a scan plus residual filter
    assert!(result.execution_plan().contains(StepKind::ClassScan));
    assert!(result.execution_plan().contains(StepKind::Filter));
    let matched: Vec<String> = result.map(|row| text(&row.unwrap(), "name")).collect();
    assert_eq!(matched.len(), 2);
    for name in matched {
        assert!(name == "name1" || name == "name7");
    }
}

#[test]
fn test_not_equal_filter() {
    let db = MemoryDatabase::new();
    db.create_class("NotEqual");
    seed_people(&db, "NotEqual", 30);
    let executor = executor(&db);
    let statement = SelectStatement::from_class("NotEqual")
        .with_predicate(BooleanExpression::ne("name", "name1"));
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 29);
    for row in &result {
        assert_ne!(text(row, "name"), "name1");
    }
}

#[test]
fn test_query_as_target() {
    let db = MemoryDatabase::new();
    db.create_class("Nested");
    for i in 0..10 {
        db.insert("Nested", vec![("val", Value::Integer(i))]);
    }
    let executor = executor(&db);
    let inner = SelectStatement::from_class("Nested")
        .with_predicate(BooleanExpression::gt("val", 2i64));
    let statement = SelectStatement::from_subquery(inner)
        .with_predicate(BooleanExpression::lt("val", 8i64));
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 5);
    for row in &result {
        let val = integer(row, "val");
        assert!(val > 2 && val < 8);
    }
}

#[test]
fn test_distinct_rows() {
    let db = MemoryDatabase::new();
    db.create_class("Distinct");
    for i in 0..30 {
        db.insert(
            "Distinct",
            vec![
                ("name", Value::from(format!("name{}", i % 10))),
                ("surname", Value::from(format!("surname{}", i % 10))),
            ],
        );
    }
    let executor = executor(&db);
    let statement = SelectStatement::from_class("Distinct")
        .with_projection(Expression::field("name"))
        .with_projection(Expression::field("surname"))
        .with_distinct();
    assert_eq!(rows(&executor, &statement).len(), 10);

    let single = SelectStatement::from_class("Distinct")
        .with_projection(Expression::field("name"))
        .with_distinct();
    assert_eq!(rows(&executor, &single).len(), 10);
}

#[test]
fn test_matches_operator() {
    let db = MemoryDatabase::new();
    db.create_class("Regex");
    seed_people(&db, "Regex", 10);
    let executor = executor(&db);
    let statement = SelectStatement::from_class("Regex").with_predicate(
        BooleanExpression::Matches {
            expression: Expression::field("name"),
            pattern: Expression::literal("name1"),
        },
    );
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 1);
    assert_eq!(text(&result[0], "name"), "name1");
}

fn letters() -> Value {
    Value::List(vec![
        Value::from("a"),
        Value::from("b"),
        Value::from("c"),
        Value::from("d"),
    ])
}

#[test]
fn test_range_subscript_end_exclusive() {
    let db = MemoryDatabase::new();
    db.create_class("Range");
    db.insert("Range", vec![("name", letters())]);
    let executor = executor(&db);
    let statement = SelectStatement::from_class("Range").with_aliased_projection(
        Expression::slice(
            Expression::field("name"),
            Expression::literal(0i64),
            Expression::literal(3i64),
            false,
        ),
        "names",
    );
    let result = rows(&executor, &statement);
    assert_eq!(
        result[0].property("names"),
        Value::List(vec![Value::from("a"), Value::from("b"), Value::from("c")])
    );
}

#[test]
fn test_range_subscript_end_inclusive() {
    let db = MemoryDatabase::new();
    db.create_class("Ellipsis");
    db.insert("Ellipsis", vec![("name", letters())]);
    let executor = executor(&db);
    let statement = SelectStatement::from_class("Ellipsis").with_aliased_projection(
        Expression::slice(
            Expression::field("name"),
            Expression::literal(0i64),
            Expression::literal(2i64),
            true,
        ),
        "names",
    );
    let result = rows(&executor, &statement);
    assert_eq!(
        result[0].property("names"),
        Value::List(vec![Value::from("a"), Value::from("b"), Value::from("c")])
    );
}

#[test]
fn test_range_subscript_with_parameters() {
    let db = MemoryDatabase::new();
    db.create_class("RangeParams");
    db.insert("RangeParams", vec![("name", letters())]);
    let executor = executor(&db);
    let statement = SelectStatement::from_class("RangeParams").with_aliased_projection(
        Expression::slice(
            Expression::field("name"),
            Expression::Parameter(doclite::ast::Parameter::Positional(0)),
            Expression::Parameter(doclite::ast::Parameter::Positional(1)),
            false,
        ),
        "names",
    );
    let result = executor
        .query_with_params(&statement, vec![Value::Integer(0), Value::Integer(3)])
        .unwrap();
    let collected: Vec<_> = result.map(Result::unwrap).collect();
    assert_eq!(
        collected[0].property("names"),
        Value::List(vec![Value::from("a"), Value::from("b"), Value::from("c")])
    );
}

#[test]
fn test_collection_item_filters() {
    let db = MemoryDatabase::new();
    db.create_class("Coll");
    db.insert(
        "Coll",
        vec![(
            "coll",
            Value::List(vec![
                Value::from("foo"),
                Value::from("bar"),
                Value::from("baz"),
            ]),
        )],
    );
    let executor = executor(&db);

    let equals = SelectStatement::from_class("Coll").with_aliased_projection(
        Expression::FilterItems {
            base: Box::new(Expression::field("coll")),
            filter: CollectionFilter::Compare(
                ComparisonOp::Equal,
                Box::new(Expression::literal("foo")),
            ),
        },
        "filtered",
    );
    assert_eq!(
        rows(&executor, &equals)[0].property("filtered"),
        Value::List(vec![Value::from("foo")])
    );

    let less = SelectStatement::from_class("Coll").with_aliased_projection(
        Expression::FilterItems {
            base: Box::new(Expression::field("coll")),
            filter: CollectionFilter::Compare(
                ComparisonOp::Less,
                Box::new(Expression::literal("ccc")),
            ),
        },
        "filtered",
    );
    assert_eq!(
        rows(&executor, &less)[0]
            .property("filtered")
            .as_list()
            .unwrap()
            .len(),
        2
    );

    let like = SelectStatement::from_class("Coll").with_aliased_projection(
        Expression::FilterItems {
            base: Box::new(Expression::field("coll")),
            filter: CollectionFilter::Like(Box::new(Expression::literal("ba%"))),
        },
        "filtered",
    );
    assert_eq!(
        rows(&executor, &like)[0]
            .property("filtered")
            .as_list()
            .unwrap()
            .len(),
        2
    );

    let within = SelectStatement::from_class("Coll").with_aliased_projection(
        Expression::FilterItems {
            base: Box::new(Expression::field("coll")),
            filter: CollectionFilter::In(vec![Expression::literal("bar")]),
        },
        "filtered",
    );
    assert_eq!(
        rows(&executor, &within)[0].property("filtered"),
        Value::List(vec![Value::from("bar")])
    );
}

#[test]
fn test_contains_with_numeric_coercion() {
    let db = MemoryDatabase::new();
    db.create_class("Contains");
    db.insert(
        "Contains",
        vec![(
            "coll",
            Value::List(vec![
                Value::Integer(1),
                Value::Integer(3),
                Value::Integer(5),
            ]),
        )],
    );
    db.insert(
        "Contains",
        vec![(
            "coll",
            Value::List(vec![
                Value::Integer(2),
                Value::Integer(4),
                Value::Integer(6),
            ]),
        )],
    );
    let executor = executor(&db);

    let contains_one = SelectStatement::from_class("Contains").with_predicate(
        BooleanExpression::Contains {
            expression: Expression::field("coll"),
            item: Expression::literal(1i64),
        },
    );
    assert_eq!(rows(&executor, &contains_one).len(), 1);

    // a float literal must match the stored integer
    let contains_float = SelectStatement::from_class("Contains").with_predicate(
        BooleanExpression::Contains {
            expression: Expression::field("coll"),
            item: Expression::literal(1.0f64),
        },
    );
    assert_eq!(rows(&executor, &contains_float).len(), 1);

    let contains_missing = SelectStatement::from_class("Contains").with_predicate(
        BooleanExpression::Contains {
            expression: Expression::field("coll"),
            item: Expression::literal(12i64),
        },
    );
    assert!(rows(&executor, &contains_missing).is_empty());
}

#[test]
fn test_result_set_close_is_idempotent() {
    let db = MemoryDatabase::new();
    db.create_class("Close");
    seed_people(&db, "Close", 5);
    let executor = executor(&db);
    let mut result = executor.query(&SelectStatement::from_class("Close")).unwrap();
    assert!(result.has_next().unwrap());
    result.close();
    result.close();
    assert!(!result.has_next().unwrap());
    assert!(result.next_row().unwrap().is_none());
}

#[test]
fn test_unknown_class_is_plan_time_error() {
    let db = MemoryDatabase::new();
    let executor = executor(&db);
    let error = executor
        .query(&SelectStatement::from_class("Missing"))
        .err()
        .expect("planning should fail");
    assert!(error.is_plan_time());
}

#[test]
fn test_projection_row_from_pairs_keeps_order() {
    let statement = SelectStatement::new()
        .with_aliased_projection(Expression::literal(1i64), "b")
        .with_aliased_projection(Expression::literal(2i64), "a");
    let projections: Vec<String> = statement
        .projections
        .iter()
        .map(Projection::output_name)
        .collect();
    assert_eq!(projections, vec!["b", "a"]);
}
