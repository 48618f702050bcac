//! Test utilities for DocLite integration tests
//!
//! Every test builds its own in-memory database, so suites stay hermetic
//! and order-independent.

use doclite::ast::SelectStatement;
use doclite::storage::memory::MemoryDatabase;
use doclite::{QueryExecutor, ResultRow, Value};
use std::sync::Arc;

/// Opt into log output with `RUST_LOG=debug cargo test`
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn executor(db: &MemoryDatabase) -> QueryExecutor {
    QueryExecutor::new(Arc::new(db.clone()))
}

/// Execute and collect every row, panicking on any error
pub fn rows(executor: &QueryExecutor, statement: &SelectStatement) -> Vec<ResultRow> {
    let result = executor
        .query(statement)
        .expect("statement should plan successfully");
    result
        .map(|row| row.expect("row production should not fail"))
        .collect()
}

/// Seed `count` records with `name{i}` / `surname{i}` properties
pub fn seed_people(db: &MemoryDatabase, class: &str, count: i64) {
    for i in 0..count {
        db.insert(
            class,
            vec![
                ("name", Value::from(format!("name{}", i))),
                ("surname", Value::from(format!("surname{}", i))),
            ],
        );
    }
}

/// Extract one string property from a row
pub fn text(row: &ResultRow, property: &str) -> String {
    match row.property(property) {
        Value::String(s) => s,
        other => panic!("expected string for {}, got {}", property, other),
    }
}

/// Extract one integer property from a row
pub fn integer(row: &ResultRow, property: &str) -> i64 {
    match row.property(property) {
        Value::Integer(i) => i,
        other => panic!("expected integer for {}, got {}", property, other),
    }
}
