// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage interfaces consumed by the query executor
//!
//! The executor never talks to pages or files: it sees a [`RecordStore`]
//! (cluster scans in RID order, point reads) and per-index [`IndexReader`]s
//! (bounded cursors in native key order). A complete in-memory
//! implementation lives in [`memory`]; a persistent engine would plug in
//! behind the same traits.

pub mod memory;

use crate::types::coercion::{prefix_compare, total_compare};
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Cluster identifier, the first half of a record identity
pub type ClusterId = i32;

/// Stable record identity: cluster id plus position inside the cluster.
///
/// Total order is (cluster, position); this is also the physical scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rid {
    pub cluster: ClusterId,
    pub position: i64,
}

impl Rid {
    pub fn new(cluster: ClusterId, position: i64) -> Self {
        Self { cluster, position }
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.cluster, self.position)
    }
}

/// A stored record: its class (if any) and its property values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub class: Option<String>,
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(class: Option<String>) -> Self {
        Self {
            class,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Direction of a cluster or index scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanOrder {
    Ascending,
    Descending,
}

impl ScanOrder {
    pub fn reversed(self) -> Self {
        match self {
            ScanOrder::Ascending => ScanOrder::Descending,
            ScanOrder::Descending => ScanOrder::Ascending,
        }
    }
}

/// One bound of a composite-key range. A key shorter than the index arity
/// is a prefix bound: it matches every entry sharing the prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBound {
    pub key: Vec<Value>,
    pub inclusive: bool,
}

/// Half- or fully-bounded range over an index's native key order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyRange {
    pub lower: Option<KeyBound>,
    pub upper: Option<KeyBound>,
}

impl KeyRange {
    /// Unbounded range: the whole index
    pub fn all() -> Self {
        Self::default()
    }

    /// Exact-match range over a full or prefix key
    pub fn exact(key: Vec<Value>) -> Self {
        Self {
            lower: Some(KeyBound {
                key: key.clone(),
                inclusive: true,
            }),
            upper: Some(KeyBound {
                key,
                inclusive: true,
            }),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// Whether a full entry key falls inside the range
    pub fn contains(&self, key: &[Value]) -> bool {
        if let Some(lower) = &self.lower {
            match prefix_compare(key, &lower.key) {
                Ordering::Less => return false,
                Ordering::Equal if !lower.inclusive => return false,
                _ => {}
            }
        }
        if let Some(upper) = &self.upper {
            match prefix_compare(key, &upper.key) {
                Ordering::Greater => return false,
                Ordering::Equal if !upper.inclusive => return false,
                _ => {}
            }
        }
        true
    }
}

/// One index entry surfaced by a cursor
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub key: Vec<Value>,
    pub rid: Rid,
}

/// Cursor over records of a cluster, in RID order
pub type RecordCursor = Box<dyn Iterator<Item = (Rid, Record)>>;

/// Cursor over index entries, in key order
pub type EntryCursor = Box<dyn Iterator<Item = IndexEntry>>;

/// Record access in RID order. Implementations provide a read-only
/// snapshot view for the duration of a plan's execution.
pub trait RecordStore {
    /// Scan one cluster in RID order
    fn scan_cluster(&self, cluster: ClusterId, order: ScanOrder) -> RecordCursor;

    /// Point read; `None` for a RID that does not exist
    fn read(&self, rid: &Rid) -> Option<Record>;

    /// Number of records currently in a cluster
    fn cluster_record_count(&self, cluster: ClusterId) -> u64;
}

/// Bounded cursors over one secondary index, in its native key order
pub trait IndexReader {
    /// Open a cursor over the given range, ascending or descending
    fn scan(&self, range: &KeyRange, order: ScanOrder) -> EntryCursor;
}

/// Everything a plan execution needs from the database: a catalog
/// snapshot, record access and index cursor factories. All handles are
/// read-only snapshot views; the planner takes no locks of its own.
pub trait QuerySource {
    fn schema(&self) -> std::sync::Arc<crate::schema::SchemaSnapshot>;
    fn store(&self) -> std::sync::Arc<dyn RecordStore>;
    fn index_reader(&self, name: &str) -> Option<std::sync::Arc<dyn IndexReader>>;
}

/// Composite index key with the total value order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey(pub Vec<Value>);

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            let ord = total_compare(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rid_order_is_cluster_then_position() {
        assert!(Rid::new(1, 99) < Rid::new(2, 0));
        assert!(Rid::new(1, 3) < Rid::new(1, 4));
        assert_eq!(Rid::new(3, 7).to_string(), "#3:7");
    }

    #[test]
    fn test_key_range_prefix_bounds() {
        // name = 'name3' and surname > 'surname3' over a (name, surname) index
        let range = KeyRange {
            lower: Some(KeyBound {
                key: vec![Value::from("name3"), Value::from("surname3")],
                inclusive: false,
            }),
            upper: Some(KeyBound {
                key: vec![Value::from("name3")],
                inclusive: true,
            }),
        };
        assert!(!range.contains(&[Value::from("name3"), Value::from("surname3")]));
        assert!(range.contains(&[Value::from("name3"), Value::from("surname4")]));
        assert!(!range.contains(&[Value::from("name4"), Value::from("surname0")]));
    }

    #[test]
    fn test_exact_range_matches_prefix() {
        let range = KeyRange::exact(vec![Value::from("name1")]);
        assert!(range.contains(&[Value::from("name1"), Value::from("x")]));
        assert!(!range.contains(&[Value::from("name2"), Value::from("x")]));
    }
}
