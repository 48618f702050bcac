//! LET bindings (including correlated subqueries), UNWIND fan-out,
//! EXPAND dereferencing, metadata pseudo-collections, cluster and RID
//! targets, and statement parameters

#[path = "testutils/mod.rs"]
mod testutils;

use doclite::ast::{
    BooleanExpression, Expression, InTarget, LetValue, MetadataTarget, NestedProjection,
    OrderItem, Parameter, Projection, SelectStatement, SortDirection, Target,
};
use doclite::storage::memory::MemoryDatabase;
use doclite::storage::Rid;
use doclite::Value;
use std::collections::HashMap;
use testutils::{executor, init_logging, integer, rows, seed_people, text};

#[test]
fn test_let_with_literals() {
    init_logging();
    let db = MemoryDatabase::new();
    let executor = executor(&db);
    let statement = SelectStatement::new()
        .with_let("$a", LetValue::Expression(Expression::literal(1i64)))
        .with_let(
            "$b",
            LetValue::Expression(Expression::add(
                Expression::literal(1i64),
                Expression::literal(1i64),
            )),
        )
        .with_aliased_projection(Expression::var("$a"), "one")
        .with_aliased_projection(Expression::var("$b"), "two");
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].property("one"), Value::Integer(1));
    assert_eq!(result[0].property("two"), Value::Integer(2));
}

#[test]
fn test_let_with_subquery_value() {
    let db = MemoryDatabase::new();
    let executor = executor(&db);
    let inner = SelectStatement::new().with_aliased_projection(Expression::literal(1i64), "a");
    let statement = SelectStatement::new()
        .with_let("$a", LetValue::Subquery(Box::new(inner)))
        .with_aliased_projection(Expression::var("$a"), "one");
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 1);
    let one = result[0].property("one");
    let items = one.as_list().expect("subquery value is a list of rows");
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].as_map().unwrap().get("a"),
        Some(&Value::Integer(1))
    );
}

#[test]
fn test_let_subquery_row_navigation() {
    let db = MemoryDatabase::new();
    let executor = executor(&db);
    let inner = SelectStatement::new().with_aliased_projection(Expression::literal(1i64), "foo");
    // $a[0].foo
    let statement = SelectStatement::new()
        .with_let("$a", LetValue::Subquery(Box::new(inner)))
        .with_aliased_projection(
            Expression::path(
                Expression::index(Expression::var("$a"), Expression::literal(0i64)),
                "foo",
            ),
            "one",
        );
    let result = rows(&executor, &statement);
    assert_eq!(result[0].property("one"), Value::Integer(1));
}

#[test]
fn test_let_expression_per_row() {
    let db = MemoryDatabase::new();
    db.create_class("LetRows");
    seed_people(&db, "LetRows", 10);
    let executor = executor(&db);
    // $nameAndSurname = name + ' ' + surname
    let statement = SelectStatement::from_class("LetRows")
        .with_let(
            "$nameAndSurname",
            LetValue::Expression(Expression::add(
                Expression::add(Expression::field("name"), Expression::literal(" ")),
                Expression::field("surname"),
            )),
        )
        .with_projection(Expression::field("name"))
        .with_projection(Expression::field("surname"))
        .with_aliased_projection(Expression::var("$nameAndSurname"), "fullname");
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 10);
    for row in &result {
        assert_eq!(
            text(row, "fullname"),
            format!("{} {}", text(row, "name"), text(row, "surname"))
        );
    }
}

#[test]
fn test_in_subquery_predicate() {
    let db = MemoryDatabase::new();
    db.create_class("InSub");
    seed_people(&db, "InSub", 10);
    let executor = executor(&db);
    let inner = SelectStatement::from_class("InSub")
        .with_projection(Expression::field("name"))
        .with_predicate(BooleanExpression::eq("name", "name1"));
    let statement = SelectStatement::from_class("InSub").with_predicate(BooleanExpression::In {
        expression: Expression::field("name"),
        target: InTarget::Subquery(Box::new(inner)),
    });
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 1);
    assert_eq!(text(&result[0], "name"), "name1");
}

#[test]
fn test_let_correlated_subquery() {
    let db = MemoryDatabase::new();
    db.create_class("Correlated");
    seed_people(&db, "Correlated", 10);
    let executor = executor(&db);
    // $foo = (select name from Correlated where name = $parent.$current.name)
    let correlated_reference = Expression::path(
        Expression::path(Expression::var("$parent"), "$current"),
        "name",
    );
    let inner = SelectStatement::from_class("Correlated")
        .with_projection(Expression::field("name"))
        .with_predicate(BooleanExpression::compare(
            Expression::field("name"),
            doclite::ast::ComparisonOp::Equal,
            correlated_reference,
        ));
    let statement = SelectStatement::from_class("Correlated")
        .with_let("$foo", LetValue::Subquery(Box::new(inner)))
        .with_aliased_projection(Expression::var("$foo"), "name");
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 10);
    for row in &result {
        let value = row.property("name");
        let items = value.as_list().expect("correlated result is a collection");
        assert_eq!(items.len(), 1);
    }
}

#[test]
fn test_let_chained_bindings() {
    let db = MemoryDatabase::new();
    db.create_class("Chained");
    seed_people(&db, "Chained", 10);
    let executor = executor(&db);
    let correlated_reference = Expression::path(
        Expression::path(Expression::var("$parent"), "$current"),
        "name",
    );
    let inner = SelectStatement::from_class("Chained")
        .with_projection(Expression::field("name"))
        .with_predicate(BooleanExpression::compare(
            Expression::field("name"),
            doclite::ast::ComparisonOp::Equal,
            correlated_reference,
        ));
    // $bar = $foo[0].name sees the earlier binding
    let statement = SelectStatement::from_class("Chained")
        .with_let("$foo", LetValue::Subquery(Box::new(inner)))
        .with_let(
            "$bar",
            LetValue::Expression(Expression::path(
                Expression::index(Expression::var("$foo"), Expression::literal(0i64)),
                "name",
            )),
        )
        .with_aliased_projection(Expression::var("$bar"), "name");
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 10);
    for row in &result {
        assert!(matches!(row.property("name"), Value::String(_)));
    }
}

#[test]
fn test_unwind_fans_out_collections() {
    let db = MemoryDatabase::new();
    db.create_class("Unwind");
    for i in 0..10 {
        db.insert(
            "Unwind",
            vec![
                ("i", Value::Integer(i)),
                (
                    "iSeq",
                    Value::List(vec![
                        Value::Integer(i),
                        Value::Integer(2 * i),
                        Value::Integer(4 * i),
                    ]),
                ),
            ],
        );
    }
    let executor = executor(&db);
    let statement = SelectStatement::from_class("Unwind")
        .with_projection(Expression::field("i"))
        .with_projection(Expression::field("iSeq"))
        .with_unwind("iSeq");
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 30);
    for row in &result {
        let first = integer(row, "i");
        let second = integer(row, "iSeq");
        assert!(first + second == 0 || second % first.max(1) == 0);
    }
}

#[test]
fn test_unwind_passes_scalar_fields_through() {
    let db = MemoryDatabase::new();
    db.create_class("UnwindScalar");
    db.insert("UnwindScalar", vec![("i", Value::Integer(7))]);
    let executor = executor(&db);
    let statement = SelectStatement::from_class("UnwindScalar").with_unwind("missing");
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 1);
    assert_eq!(integer(&result[0], "i"), 7);
}

fn link_fixture(db: &MemoryDatabase, parent: &str, child: &str, parents: i64, links_each: i64) {
    db.create_class(child);
    db.create_class(parent);
    for i in 0..parents {
        let mut links = Vec::new();
        for j in 0..links_each {
            let rid = db.insert(
                child,
                vec![("name", Value::from(format!("name{}", j)))],
            );
            links.push(Value::Link(rid));
        }
        let linked = if links.len() == 1 {
            links.pop().unwrap()
        } else {
            Value::List(links)
        };
        db.insert(parent, vec![("i", Value::Integer(i)), ("linked", linked)]);
    }
}

#[test]
fn test_expand_single_link() {
    let db = MemoryDatabase::new();
    link_fixture(&db, "ExpandParent", "ExpandChild", 10, 1);
    let executor = executor(&db);
    let statement = SelectStatement::from_class("ExpandParent")
        .with_projection(Expression::call("expand", vec![Expression::field("linked")]));
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 10);
    for row in &result {
        assert!(row.element().is_some());
        assert!(text(row, "name").starts_with("name"));
    }
}

#[test]
fn test_expand_link_collection() {
    let db = MemoryDatabase::new();
    link_fixture(&db, "ExpandManyParent", "ExpandManyChild", 10, 11);
    let executor = executor(&db);
    let statement = SelectStatement::from_class("ExpandManyParent")
        .with_projection(Expression::call("expand", vec![Expression::field("linked")]));
    assert_eq!(rows(&executor, &statement).len(), 110);
}

#[test]
fn test_expand_then_order_by() {
    let db = MemoryDatabase::new();
    link_fixture(&db, "ExpandSortParent", "ExpandSortChild", 30, 7);
    let executor = executor(&db);
    let statement = SelectStatement::from_class("ExpandSortParent")
        .with_projection(Expression::call("expand", vec![Expression::field("linked")]))
        .with_order_by(OrderItem::asc("name"));
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 210);
    for pair in result.windows(2) {
        assert!(text(&pair[0], "name") <= text(&pair[1], "name"));
    }
}

#[test]
fn test_metadata_schema() {
    let db = MemoryDatabase::new();
    db.create_class("MetaClass");
    let executor = executor(&db);
    let statement = SelectStatement::from_metadata(MetadataTarget::Schema);
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 1);
    let classes = result[0].property("classes");
    assert!(!classes.as_list().unwrap().is_empty());
}

#[test]
fn test_metadata_index_manager() {
    let db = MemoryDatabase::new();
    db.create_class("MetaIdx");
    db.create_index(
        "MetaIdx.name",
        "MetaIdx",
        &["name"],
        doclite::schema::IndexKind::Ordered,
        false,
        doclite::schema::NullPolicy::Include,
    );
    let executor = executor(&db);
    let statement = SelectStatement::from_metadata(MetadataTarget::IndexManager);
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 1);
    assert!(!result[0].property("indexes").as_list().unwrap().is_empty());
}

#[test]
fn test_expand_metadata_indexes() {
    let db = MemoryDatabase::new();
    db.create_class("MetaExpand");
    db.create_index(
        "MetaExpand.name",
        "MetaExpand",
        &["name"],
        doclite::schema::IndexKind::Ordered,
        false,
        doclite::schema::NullPolicy::Include,
    );
    let executor = executor(&db);
    let statement = SelectStatement::from_metadata(MetadataTarget::IndexManager)
        .with_projection(Expression::call("expand", vec![Expression::field("indexes")]));
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 1);
    assert_eq!(text(&result[0], "name"), "MetaExpand.name");
}

#[test]
fn test_fetch_from_cluster() {
    let db = MemoryDatabase::new();
    let cluster = db.create_class("ClusterTarget");
    for i in 0..10 {
        db.insert("ClusterTarget", vec![("val", Value::Integer(i))]);
    }
    let executor = executor(&db);
    let result = rows(&executor, &SelectStatement::from_cluster(cluster));
    assert_eq!(result.len(), 10);
    let sum: i64 = result.iter().map(|row| integer(row, "val")).sum();
    assert_eq!(sum, 45);
}

#[test]
fn test_fetch_from_cluster_order_by_rid_desc() {
    let db = MemoryDatabase::new();
    let cluster = db.create_class("ClusterDesc");
    for i in 0..10 {
        db.insert("ClusterDesc", vec![("val", Value::Integer(i))]);
    }
    let executor = executor(&db);
    let statement = SelectStatement::from_cluster(cluster)
        .with_order_by(OrderItem::rid(SortDirection::Descending));
    let result = executor.query(&statement).unwrap();
    assert!(!result
        .execution_plan()
        .contains(doclite::exec::steps::StepKind::OrderBy));
    let values: Vec<i64> = result.map(|row| integer(&row.unwrap(), "val")).collect();
    assert_eq!(values, (0..10).rev().collect::<Vec<i64>>());
}

#[test]
fn test_fetch_from_two_clusters_in_rid_order() {
    let db = MemoryDatabase::new();
    let first = db.create_class("TwoClusters");
    let second = db.add_cluster("TwoClusters", "twoclusters_2");
    for i in 0..10 {
        db.insert_into_cluster(Some("TwoClusters"), first, vec![("val", Value::Integer(i))]);
    }
    for i in 0..10 {
        db.insert_into_cluster(Some("TwoClusters"), second, vec![("val", Value::Integer(i))]);
    }
    let executor = executor(&db);
    let statement = SelectStatement::from_clusters(vec![first, second])
        .with_order_by(OrderItem::rid(SortDirection::Ascending));
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 20);
    for (i, row) in result.iter().enumerate() {
        assert_eq!(integer(row, "val"), (i % 10) as i64);
    }
}

#[test]
fn test_fetch_from_rid_list_skips_missing() {
    let db = MemoryDatabase::new();
    db.create_class("RidList");
    let first = db.insert("RidList", vec![("val", Value::Integer(1))]);
    let second = db.insert("RidList", vec![("val", Value::Integer(2))]);
    let executor = executor(&db);

    let single = rows(&executor, &SelectStatement::from_rids(vec![first]));
    assert_eq!(single.len(), 1);

    let with_missing = rows(
        &executor,
        &SelectStatement::from_rids(vec![first, second, Rid::new(0, 100_000)]),
    );
    assert_eq!(with_missing.len(), 2);

    let none = rows(
        &executor,
        &SelectStatement::from_rids(vec![Rid::new(0, 100_000_000)]),
    );
    assert!(none.is_empty());
}

#[test]
fn test_target_from_positional_parameter() {
    let db = MemoryDatabase::new();
    db.create_class("ParamTarget");
    seed_people(&db, "ParamTarget", 10);
    let executor = executor(&db);
    let statement = SelectStatement::from_target(Target::Parameter(Parameter::Positional(0)));
    let result = executor
        .query_with_params(&statement, vec![Value::from("ParamTarget")])
        .unwrap();
    assert_eq!(result.count(), 10);
}

#[test]
fn test_target_from_named_parameter() {
    let db = MemoryDatabase::new();
    db.create_class("NamedTarget");
    seed_people(&db, "NamedTarget", 10);
    let executor = executor(&db);
    let statement =
        SelectStatement::from_target(Target::Parameter(Parameter::Named("target".to_string())));
    let mut parameters = HashMap::new();
    parameters.insert("target".to_string(), Value::from("NamedTarget"));
    let result = executor
        .query_with_named_params(&statement, parameters)
        .unwrap();
    assert_eq!(result.count(), 10);
}

#[test]
fn test_skip_and_limit_from_parameters() {
    let db = MemoryDatabase::new();
    db.create_class("ParamPaging");
    seed_people(&db, "ParamPaging", 10);
    let executor = executor(&db);
    let mut statement = SelectStatement::from_class("ParamPaging");
    statement.skip = Some(Expression::Parameter(Parameter::Positional(0)));
    statement.limit = Some(Expression::Parameter(Parameter::Positional(1)));
    let result = executor
        .query_with_params(&statement, vec![Value::Integer(3), Value::Integer(4)])
        .unwrap();
    assert_eq!(result.count(), 4);
}

#[test]
fn test_nested_projections() {
    let db = MemoryDatabase::new();
    db.create_class("NestedProj");
    let elem1 = db.insert("NestedProj", vec![("name", Value::from("a"))]);
    let elem2 = db.insert(
        "NestedProj",
        vec![("name", Value::from("b")), ("surname", Value::from("lkj"))],
    );
    db.insert(
        "NestedProj",
        vec![
            ("name", Value::from("d")),
            ("elem1", Value::Link(elem1)),
            ("elem2", Value::Link(elem2)),
        ],
    );
    let executor = executor(&db);
    let statement = SelectStatement::from_class("NestedProj")
        .with_predicate(BooleanExpression::eq("name", "d"))
        .with_projection(Expression::field("name"));
    let mut statement = statement;
    statement.projections.push(
        Projection::new(Expression::field("elem1")).with_nested(NestedProjection::All),
    );
    statement.projections.push(
        Projection::new(Expression::field("elem2"))
            .with_nested(NestedProjection::Exclude(vec!["surname".to_string()])),
    );
    let result = rows(&executor, &statement);
    assert_eq!(result.len(), 1);
    let elem1_value = result[0].property("elem1");
    assert_eq!(
        elem1_value.as_map().unwrap().get("name"),
        Some(&Value::from("a"))
    );
    let elem2_value = result[0].property("elem2");
    assert_eq!(
        elem2_value.as_map().unwrap().get("name"),
        Some(&Value::from("b"))
    );
    assert!(elem2_value.as_map().unwrap().get("surname").is_none());
}

#[test]
fn test_method_calls_in_projection() {
    let db = MemoryDatabase::new();
    db.create_class("Methods");
    db.insert("Methods", vec![("name", Value::from("Alice"))]);
    let executor = executor(&db);
    let statement = SelectStatement::from_class("Methods")
        .with_aliased_projection(
            Expression::method(Expression::field("name"), "toUpperCase", vec![]),
            "upper",
        )
        .with_aliased_projection(
            Expression::method(Expression::field("name"), "length", vec![]),
            "len",
        );
    let result = rows(&executor, &statement);
    assert_eq!(result[0].property("upper"), Value::from("ALICE"));
    assert_eq!(result[0].property("len"), Value::Integer(5));
}
