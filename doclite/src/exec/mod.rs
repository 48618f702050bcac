// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query execution engine
//!
//! Takes planned SELECT statements and executes them as a pull-driven
//! pipeline of steps, surfacing rows through a lazy [`ResultSet`].

pub mod context;
pub mod error;
pub mod executor;
pub mod result;
pub mod steps;

pub use context::ExecutionContext;
pub use error::ExecutionError;
pub use executor::QueryExecutor;
pub use result::{ElementRef, ResultRow, ResultSet};
