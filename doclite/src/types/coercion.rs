// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Value comparison and numeric coercion
//!
//! Two comparison regimes live here:
//! - [`compare`] is the predicate-level comparison: numeric values compare
//!   across Integer/Float, otherwise both sides must have the same type.
//!   Incomparable pairs (and anything involving null) yield `None`, which
//!   filters treat as "unknown".
//! - [`total_compare`] is the total order used for index keys, ORDER BY and
//!   min/max: every value compares to every other value by type rank first.

use crate::types::Value;
use std::cmp::Ordering;

/// Predicate-level comparison. `None` means the pair is incomparable.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        (Value::Link(a), Value::Link(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Equality with numeric coercion: an integer literal matches a stored
/// float of the same magnitude and vice versa.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && values_equal(va, vb))
        }
        _ => compare(left, right) == Some(Ordering::Equal),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Boolean(_) => 1,
        Value::Integer(_) | Value::Float(_) => 2,
        Value::String(_) => 3,
        Value::DateTime(_) => 4,
        Value::Link(_) => 5,
        Value::List(_) => 6,
        Value::Map(_) => 7,
    }
}

/// Total order over all values: type rank first, then value. Used for
/// index key ordering, ORDER BY and min/max accumulation.
pub fn total_compare(left: &Value, right: &Value) -> Ordering {
    if let Some(ord) = compare(left, right) {
        return ord;
    }
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                let ord = total_compare(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Map(a), Value::Map(b)) => {
            for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                let ord = ka.cmp(kb).then_with(|| total_compare(va, vb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        _ => type_rank(left).cmp(&type_rank(right)),
    }
}

/// Compare composite index keys component-wise over the shorter arity.
/// A bound key shorter than the entry key acts as a prefix: equality over
/// the shared components is `Equal`.
pub fn prefix_compare(entry: &[Value], bound: &[Value]) -> Ordering {
    for (component, limit) in entry.iter().zip(bound.iter()) {
        let ord = total_compare(component, limit);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    if entry.len() >= bound.len() {
        Ordering::Equal
    } else {
        Ordering::Less
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_cross_type_equality() {
        assert!(values_equal(&Value::Integer(1), &Value::Float(1.0)));
        assert!(values_equal(&Value::Float(2.0), &Value::Integer(2)));
        assert!(!values_equal(&Value::Integer(1), &Value::Integer(2)));
        assert!(!values_equal(&Value::Null, &Value::Null));
    }

    #[test]
    fn test_predicate_compare_incomparable() {
        assert_eq!(compare(&Value::String("a".into()), &Value::Integer(1)), None);
        assert_eq!(compare(&Value::Null, &Value::Integer(1)), None);
    }

    #[test]
    fn test_total_order_ranks_types() {
        assert_eq!(
            total_compare(&Value::Null, &Value::Integer(0)),
            Ordering::Less
        );
        assert_eq!(
            total_compare(&Value::Integer(5), &Value::String("a".into())),
            Ordering::Less
        );
        assert_eq!(
            total_compare(&Value::Integer(3), &Value::Float(2.5)),
            Ordering::Greater
        );
    }

    #[test]
    fn test_prefix_compare() {
        let entry = vec![Value::from("name3"), Value::from("surname3")];
        assert_eq!(
            prefix_compare(&entry, &[Value::from("name3")]),
            Ordering::Equal
        );
        assert_eq!(
            prefix_compare(&entry, &[Value::from("name4")]),
            Ordering::Less
        );
        assert_eq!(
            prefix_compare(&entry, &[Value::from("name3"), Value::from("surname1")]),
            Ordering::Greater
        );
    }
}
