// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! DocLite - query execution core for a lightweight document/graph database
//!
//! Given a parsed SELECT statement, DocLite builds an executable plan and
//! produces a lazily-evaluated sequence of result rows:
//!
//! - **Index-access planning**: chooses between full scans and one or more
//!   secondary-index probes, merges candidate conditions, fans class
//!   hierarchies out into unioned per-class branches with identity dedup.
//! - **Sort elision**: detects when the access path already yields the
//!   requested ORDER BY and skips the in-memory sort.
//! - **Pull-based pipeline**: scan, index-scan, parallel-union, filter,
//!   LET, UNWIND, EXPAND, GROUP BY, projection, DISTINCT, ORDER BY, SKIP
//!   and LIMIT steps composed into a single lazy, closable row stream
//!   with per-row variable scoping for correlated subqueries.
//!
//! The SQL parser, the persistent storage engine and catalog maintenance
//! live outside this crate; DocLite consumes them through the narrow
//! interfaces in [`ast`], [`storage`] and [`schema`]. A complete
//! in-memory backend ([`storage::memory::MemoryDatabase`]) is included.
//!
//! ```no_run
//! use doclite::ast::SelectStatement;
//! use doclite::storage::memory::MemoryDatabase;
//! use doclite::storage::QuerySource;
//! use doclite::{QueryExecutor, Value};
//! use std::sync::Arc;
//!
//! let db = MemoryDatabase::new();
//! db.create_class("Person");
//! db.insert("Person", vec![("name", Value::from("alice"))]);
//!
//! let executor = QueryExecutor::new(Arc::new(db));
//! let statement = SelectStatement::from_class("Person");
//! let mut result = executor.query(&statement).unwrap();
//! while let Some(row) = result.next_row().unwrap() {
//!     println!("{}", row.property("name"));
//! }
//! ```

pub mod ast;
pub mod eval;
pub mod exec;
pub mod plan;
pub mod schema;
pub mod storage;
pub mod types;

// Re-export the primary API surface
pub use exec::{ExecutionError, QueryExecutor, ResultRow, ResultSet};
pub use plan::{PlanDescription, StepDescription};
pub use types::Value;

/// DocLite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
