// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Index-access planning
//!
//! Flattens the predicate into OR-branches of AND-conjunctions, merges
//! per-property constraints (detecting statically-unsatisfiable
//! combinations), and matches each branch against the declared indexes:
//! an equality prefix over the key properties, optionally extended by one
//! trailing range on the next key property. Hash-capable indexes accept
//! only full-key equality probes. Class hierarchies fan out into one
//! branch per data-holding subclass, all of which must be covered for
//! fan-out to apply.

use crate::ast::{BooleanExpression, ComparisonOp, Expression, OrderItem, OrderKey, SortDirection};
use crate::eval::predicate::{
    compare_with_op, constant_value, predicate_references_row, test_predicate,
};
use crate::exec::context::ExecutionContext;
use crate::exec::error::ExecutionError;
use crate::exec::result::ResultRow;
use crate::schema::{IndexDescriptor, IndexKind, NullPolicy, SchemaSnapshot};
use crate::storage::{KeyBound, KeyRange, ScanOrder};
use crate::types::coercion::{total_compare, values_equal};
use crate::types::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Guard against DNF explosion when distributing AND over OR
const MAX_BRANCHES: usize = 32;

/// One usable index for one branch: the bounded cursor it opens, the
/// equality prefix it consumes, and what remains as residual filter.
#[derive(Debug, Clone)]
pub struct IndexCandidate {
    pub index: IndexDescriptor,
    pub range: KeyRange,
    /// Number of leading key properties fixed by equality
    pub eq_prefix: usize,
    pub residual: Option<BooleanExpression>,
}

/// Access decision for a class target
pub enum ClassAccess {
    /// Polymorphic full scan; the whole predicate stays as residual
    FullScan,
    /// One index probe per (class, OR-branch); unioned when more than one
    Branches(Vec<IndexCandidate>),
    /// Statically unsatisfiable predicate: nothing is scanned
    Empty,
}

/// A simple condition extracted from the predicate
#[derive(Debug, Clone)]
enum Cond {
    Simple {
        field: String,
        op: ComparisonOp,
        value: Value,
        original: BooleanExpression,
    },
    Between {
        field: String,
        lower: Value,
        upper: Value,
        original: BooleanExpression,
    },
    /// Not indexable; applies as residual filter
    Opaque(BooleanExpression),
    /// Constant true, dropped from the branch
    True,
    /// Constant false (or unknown): the branch matches nothing
    False,
}

/// Flatten a predicate into OR-branches of AND-conjunctions
fn flatten(
    predicate: &BooleanExpression,
    ctx: &Arc<ExecutionContext>,
) -> Vec<Vec<Cond>> {
    match predicate {
        BooleanExpression::And(items) => {
            let mut branches: Vec<Vec<Cond>> = vec![Vec::new()];
            for item in items {
                let item_branches = flatten(item, ctx);
                let mut combined = Vec::new();
                for branch in &branches {
                    for item_branch in &item_branches {
                        let mut merged = branch.clone();
                        merged.extend(item_branch.iter().cloned());
                        combined.push(merged);
                    }
                }
                if combined.len() > MAX_BRANCHES {
                    return vec![vec![Cond::Opaque(predicate.clone())]];
                }
                branches = combined;
            }
            branches
        }
        BooleanExpression::Or(items) => {
            let mut branches = Vec::new();
            for item in items {
                branches.extend(flatten(item, ctx));
            }
            if branches.len() > MAX_BRANCHES {
                return vec![vec![Cond::Opaque(predicate.clone())]];
            }
            branches
        }
        leaf => vec![vec![classify(leaf, ctx)]],
    }
}

/// Classify one leaf condition
fn classify(leaf: &BooleanExpression, ctx: &Arc<ExecutionContext>) -> Cond {
    if !predicate_references_row(leaf) {
        // constant condition, folded at plan time; unknown filters as false
        let empty = ResultRow::new();
        return match test_predicate(leaf, &empty, ctx) {
            Ok(Some(true)) => Cond::True,
            Ok(_) => Cond::False,
            Err(_) => Cond::Opaque(leaf.clone()),
        };
    }
    match leaf {
        BooleanExpression::Comparison {
            left,
            operator,
            right,
        } => {
            let indexable = matches!(
                operator,
                ComparisonOp::Equal
                    | ComparisonOp::Less
                    | ComparisonOp::LessOrEqual
                    | ComparisonOp::Greater
                    | ComparisonOp::GreaterOrEqual
            );
            if indexable {
                if let Expression::Field(field) = left {
                    if let Some(value) = constant_value(right, ctx) {
                        return Cond::Simple {
                            field: field.clone(),
                            op: *operator,
                            value,
                            original: leaf.clone(),
                        };
                    }
                }
                if let Expression::Field(field) = right {
                    if let Some(value) = constant_value(left, ctx) {
                        return Cond::Simple {
                            field: field.clone(),
                            op: flip(*operator),
                            value,
                            original: leaf.clone(),
                        };
                    }
                }
            }
            Cond::Opaque(leaf.clone())
        }
        BooleanExpression::Between {
            expression: Expression::Field(field),
            lower,
            upper,
        } => {
            match (constant_value(lower, ctx), constant_value(upper, ctx)) {
                (Some(low), Some(high)) => Cond::Between {
                    field: field.clone(),
                    lower: low,
                    upper: high,
                    original: leaf.clone(),
                },
                _ => Cond::Opaque(leaf.clone()),
            }
        }
        other => Cond::Opaque(other.clone()),
    }
}

fn flip(op: ComparisonOp) -> ComparisonOp {
    match op {
        ComparisonOp::Less => ComparisonOp::Greater,
        ComparisonOp::LessOrEqual => ComparisonOp::GreaterOrEqual,
        ComparisonOp::Greater => ComparisonOp::Less,
        ComparisonOp::GreaterOrEqual => ComparisonOp::LessOrEqual,
        other => other,
    }
}

/// Merged constraints on one property within one branch
#[derive(Debug, Clone, Default)]
struct PropertyConstraint {
    eq: Option<Value>,
    lower: Option<(Value, bool)>,
    upper: Option<(Value, bool)>,
    eq_sources: Vec<BooleanExpression>,
    range_sources: Vec<BooleanExpression>,
}

impl PropertyConstraint {
    fn has_range(&self) -> bool {
        self.lower.is_some() || self.upper.is_some()
    }
}

/// One AND-branch after per-property constraint merging
#[derive(Debug, Clone, Default)]
struct MergedBranch {
    constraints: HashMap<String, PropertyConstraint>,
    opaque: Vec<BooleanExpression>,
    unsatisfiable: bool,
}

fn tighten_lower(constraint: &mut PropertyConstraint, value: Value, inclusive: bool) {
    let replace = match &constraint.lower {
        Some((current, current_inclusive)) => match total_compare(&value, current) {
            Ordering::Greater => true,
            Ordering::Equal => *current_inclusive && !inclusive,
            Ordering::Less => false,
        },
        None => true,
    };
    if replace {
        constraint.lower = Some((value, inclusive));
    }
}

fn tighten_upper(constraint: &mut PropertyConstraint, value: Value, inclusive: bool) {
    let replace = match &constraint.upper {
        Some((current, current_inclusive)) => match total_compare(&value, current) {
            Ordering::Less => true,
            Ordering::Equal => *current_inclusive && !inclusive,
            Ordering::Greater => false,
        },
        None => true,
    };
    if replace {
        constraint.upper = Some((value, inclusive));
    }
}

fn merge_branch(conds: Vec<Cond>) -> MergedBranch {
    let mut branch = MergedBranch::default();
    for cond in conds {
        match cond {
            Cond::True => {}
            Cond::False => {
                branch.unsatisfiable = true;
            }
            Cond::Opaque(expression) => branch.opaque.push(expression),
            Cond::Simple {
                field,
                op,
                value,
                original,
            } => {
                let constraint = branch.constraints.entry(field).or_default();
                match op {
                    ComparisonOp::Equal => {
                        if let Some(existing) = &constraint.eq {
                            if !values_equal(existing, &value) {
                                branch.unsatisfiable = true;
                            }
                        }
                        constraint.eq = Some(value);
                        constraint.eq_sources.push(original);
                    }
                    ComparisonOp::Greater => {
                        tighten_lower(constraint, value, false);
                        constraint.range_sources.push(original);
                    }
                    ComparisonOp::GreaterOrEqual => {
                        tighten_lower(constraint, value, true);
                        constraint.range_sources.push(original);
                    }
                    ComparisonOp::Less => {
                        tighten_upper(constraint, value, false);
                        constraint.range_sources.push(original);
                    }
                    ComparisonOp::LessOrEqual => {
                        tighten_upper(constraint, value, true);
                        constraint.range_sources.push(original);
                    }
                    _ => branch.opaque.push(original),
                }
            }
            Cond::Between {
                field,
                lower,
                upper,
                original,
            } => {
                let constraint = branch.constraints.entry(field).or_default();
                tighten_lower(constraint, lower, true);
                tighten_upper(constraint, upper, true);
                constraint.range_sources.push(original);
            }
        }
    }

    for constraint in branch.constraints.values_mut() {
        if let Some(eq) = constraint.eq.clone() {
            if constraint.has_range() {
                // an equality that falls outside its own range bounds can
                // never match; inside them, the range conjuncts are
                // statically satisfied
                let mut satisfied = true;
                if let Some((lower, inclusive)) = &constraint.lower {
                    let op = if *inclusive {
                        ComparisonOp::GreaterOrEqual
                    } else {
                        ComparisonOp::Greater
                    };
                    match compare_with_op(&eq, op, lower) {
                        Some(true) => {}
                        Some(false) => {
                            branch.unsatisfiable = true;
                        }
                        None => satisfied = false,
                    }
                }
                if let Some((upper, inclusive)) = &constraint.upper {
                    let op = if *inclusive {
                        ComparisonOp::LessOrEqual
                    } else {
                        ComparisonOp::Less
                    };
                    match compare_with_op(&eq, op, upper) {
                        Some(true) => {}
                        Some(false) => {
                            branch.unsatisfiable = true;
                        }
                        None => satisfied = false,
                    }
                }
                constraint.lower = None;
                constraint.upper = None;
                if !satisfied {
                    // re-checked by the residual filter
                    let kept = std::mem::take(&mut constraint.range_sources);
                    branch.opaque.extend(kept);
                }
                constraint.range_sources.clear();
            }
        } else if let (Some((lower, lower_inclusive)), Some((upper, upper_inclusive))) =
            (&constraint.lower, &constraint.upper)
        {
            match total_compare(lower, upper) {
                Ordering::Greater => branch.unsatisfiable = true,
                Ordering::Equal if !(*lower_inclusive && *upper_inclusive) => {
                    branch.unsatisfiable = true;
                }
                _ => {}
            }
        }
    }
    branch
}

/// Candidate match for one index against one merged branch
fn match_index(
    index: &IndexDescriptor,
    branch: &MergedBranch,
) -> Option<(IndexCandidate, i32)> {
    let mut eq_prefix = 0;
    for property in &index.properties {
        match branch.constraints.get(property) {
            Some(constraint) if constraint.eq.is_some() => eq_prefix += 1,
            _ => break,
        }
    }

    let full_equality = eq_prefix == index.properties.len();
    let range_property = if full_equality {
        None
    } else {
        index.properties.get(eq_prefix).and_then(|property| {
            branch
                .constraints
                .get(property)
                .filter(|constraint| constraint.eq.is_none() && constraint.has_range())
                .map(|_| property.clone())
        })
    };

    if index.kind == IndexKind::Hash && !full_equality {
        return None;
    }
    if eq_prefix == 0 && range_property.is_none() {
        return None;
    }

    let eq_values: Vec<Value> = index.properties[..eq_prefix]
        .iter()
        .filter_map(|property| {
            branch
                .constraints
                .get(property)
                .and_then(|constraint| constraint.eq.clone())
        })
        .collect();

    let range = if let Some(property) = &range_property {
        let constraint = &branch.constraints[property];
        let lower = match &constraint.lower {
            Some((value, inclusive)) => {
                let mut key = eq_values.clone();
                key.push(value.clone());
                Some(KeyBound {
                    key,
                    inclusive: *inclusive,
                })
            }
            None if eq_prefix > 0 => Some(KeyBound {
                key: eq_values.clone(),
                inclusive: true,
            }),
            None => None,
        };
        let upper = match &constraint.upper {
            Some((value, inclusive)) => {
                let mut key = eq_values.clone();
                key.push(value.clone());
                Some(KeyBound {
                    key,
                    inclusive: *inclusive,
                })
            }
            None if eq_prefix > 0 => Some(KeyBound {
                key: eq_values.clone(),
                inclusive: true,
            }),
            None => None,
        };
        KeyRange { lower, upper }
    } else {
        KeyRange::exact(eq_values)
    };

    // everything not consumed by the cursor stays as residual
    let mut residual_parts: Vec<BooleanExpression> = branch.opaque.clone();
    for (property, constraint) in &branch.constraints {
        let eq_consumed = index.properties[..eq_prefix].contains(property);
        let range_consumed = range_property.as_deref() == Some(property.as_str());
        if !eq_consumed {
            residual_parts.extend(constraint.eq_sources.iter().cloned());
        }
        if !range_consumed && !eq_consumed {
            residual_parts.extend(constraint.range_sources.iter().cloned());
        }
    }
    let residual = combine(residual_parts);

    let mut score = eq_prefix as i32 * 10;
    if range_property.is_some() {
        score += 5;
    }
    if full_equality {
        score += 3;
        if index.unique {
            score += 1;
        }
    }

    Some((
        IndexCandidate {
            index: index.clone(),
            range,
            eq_prefix,
            residual,
        },
        score,
    ))
}

fn combine(mut parts: Vec<BooleanExpression>) -> Option<BooleanExpression> {
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(BooleanExpression::And(parts)),
    }
}

fn best_candidate(
    schema: &SchemaSnapshot,
    class: &str,
    branch: &MergedBranch,
) -> Option<IndexCandidate> {
    let mut best: Option<(IndexCandidate, i32)> = None;
    for index in schema.class_indexes(class) {
        if let Some((candidate, score)) = match_index(index, branch) {
            let replace = match &best {
                Some((_, best_score)) => score > *best_score,
                None => true,
            };
            if replace {
                best = Some((candidate, score));
            }
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Decide the access path for a class target under a predicate.
///
/// Fan-out rule: the subtree is index-coverable iff every class in it
/// that holds records has a matching index for every OR-branch. Any
/// data-holding class without one (the target itself or an intermediate
/// ancestor included) forces a single polymorphic full scan.
pub fn plan_class_access(
    ctx: &Arc<ExecutionContext>,
    class: &str,
    predicate: Option<&BooleanExpression>,
) -> Result<ClassAccess, ExecutionError> {
    let predicate = match predicate {
        Some(predicate) => predicate,
        None => return Ok(ClassAccess::FullScan),
    };
    let schema = ctx.schema();

    let branches: Vec<MergedBranch> = flatten(predicate, ctx)
        .into_iter()
        .map(merge_branch)
        .collect();
    let satisfiable: Vec<&MergedBranch> = branches
        .iter()
        .filter(|branch| !branch.unsatisfiable)
        .collect();
    if satisfiable.is_empty() {
        log::debug!("predicate on {} is statically unsatisfiable", class);
        return Ok(ClassAccess::Empty);
    }

    let store = ctx.store();
    let mut data_classes = Vec::new();
    for descriptor in schema.subtree(class) {
        let holds_records = descriptor
            .clusters
            .iter()
            .any(|cluster| store.cluster_record_count(*cluster) > 0);
        if holds_records {
            data_classes.push(descriptor.name.clone());
        }
    }
    if data_classes.is_empty() {
        return Ok(ClassAccess::FullScan);
    }

    let mut candidates = Vec::new();
    for data_class in &data_classes {
        for branch in &satisfiable {
            match best_candidate(schema, data_class, branch) {
                Some(candidate) => candidates.push(candidate),
                None => {
                    log::debug!(
                        "no covering index on {} for a branch of {}; using full scan",
                        data_class,
                        class
                    );
                    return Ok(ClassAccess::FullScan);
                }
            }
        }
    }
    log::debug!(
        "{} resolved to {} index branch(es) over {:?}",
        class,
        candidates.len(),
        data_classes
    );
    Ok(ClassAccess::Branches(candidates))
}

/// Access decision for an `index:` target
pub enum IndexTargetAccess {
    Scan {
        range: KeyRange,
        residual: Option<BooleanExpression>,
    },
    Empty,
}

/// Plan the `key` conditions of an `index:` target into a cursor range.
pub fn plan_index_target(
    ctx: &Arc<ExecutionContext>,
    index: &IndexDescriptor,
    predicate: Option<&BooleanExpression>,
) -> Result<IndexTargetAccess, ExecutionError> {
    let predicate = match predicate {
        Some(predicate) => predicate,
        None => {
            if index.kind == IndexKind::Hash {
                return Err(ExecutionError::InvalidQuery(format!(
                    "index {} cannot be iterated without a key condition",
                    index.name
                )));
            }
            return Ok(IndexTargetAccess::Scan {
                range: KeyRange::all(),
                residual: None,
            });
        }
    };

    let mut branches = flatten(predicate, ctx);
    if branches.len() != 1 {
        return Err(ExecutionError::InvalidQuery(
            "OR conditions are not supported over an index target".to_string(),
        ));
    }
    let branch = merge_branch(branches.remove(0));
    if branch.unsatisfiable {
        return Ok(IndexTargetAccess::Empty);
    }

    let mut residual: Vec<BooleanExpression> = branch.opaque.clone();
    let mut range = KeyRange::all();
    for (property, constraint) in &branch.constraints {
        if property == "key" {
            if let Some(eq) = &constraint.eq {
                range = KeyRange::exact(vec![eq.clone()]);
            } else {
                if index.kind == IndexKind::Hash {
                    return Err(ExecutionError::InvalidQuery(format!(
                        "index {} supports equality probes only",
                        index.name
                    )));
                }
                range = KeyRange {
                    lower: constraint.lower.as_ref().map(|(value, inclusive)| KeyBound {
                        key: vec![value.clone()],
                        inclusive: *inclusive,
                    }),
                    upper: constraint.upper.as_ref().map(|(value, inclusive)| KeyBound {
                        key: vec![value.clone()],
                        inclusive: *inclusive,
                    }),
                };
            }
        } else {
            residual.extend(constraint.eq_sources.iter().cloned());
            residual.extend(constraint.range_sources.iter().cloned());
        }
    }
    if range.is_unbounded() && index.kind == IndexKind::Hash {
        return Err(ExecutionError::InvalidQuery(format!(
            "index {} cannot be iterated without a key condition",
            index.name
        )));
    }
    Ok(IndexTargetAccess::Scan {
        range,
        residual: combine(residual),
    })
}

/// Whether the requested ORDER BY is satisfied by an index candidate's
/// native key order: the sort fields must equal `keys[eq_prefix..]` or
/// `keys[0..]` as a prefix, with a uniform direction (descending flips
/// the whole cursor).
pub fn order_satisfied_by_candidate(
    candidate: &IndexCandidate,
    order_by: &[OrderItem],
) -> Option<ScanOrder> {
    let (fields, direction) = uniform_fields(order_by)?;
    let keys = &candidate.index.properties;
    let from_eq = keys
        .len()
        .checked_sub(candidate.eq_prefix)
        .filter(|remaining| fields.len() <= *remaining)
        .map(|_| {
            fields
                .iter()
                .zip(keys[candidate.eq_prefix..].iter())
                .all(|(field, key)| field == key)
        })
        .unwrap_or(false);
    let from_start = fields.len() <= keys.len()
        && fields.iter().zip(keys.iter()).all(|(field, key)| field == key);
    if from_eq || from_start {
        Some(match direction {
            SortDirection::Ascending => ScanOrder::Ascending,
            SortDirection::Descending => ScanOrder::Descending,
        })
    } else {
        None
    }
}

/// An index usable purely to satisfy ORDER BY on a conditionless scan.
/// Null-dropping indexes are skipped: they would silently lose rows.
pub fn find_order_index<'a>(
    schema: &'a SchemaSnapshot,
    class: &str,
    order_by: &[OrderItem],
) -> Option<(&'a IndexDescriptor, ScanOrder)> {
    let descriptor = schema.class(class)?;
    if !descriptor.subclasses.is_empty() {
        return None;
    }
    let (fields, direction) = uniform_fields(order_by)?;
    for index in schema.class_indexes(class) {
        if index.kind != IndexKind::Ordered || index.null_policy != NullPolicy::Include {
            continue;
        }
        let matches = fields.len() <= index.properties.len()
            && fields
                .iter()
                .zip(index.properties.iter())
                .all(|(field, key)| field == key);
        if matches {
            let order = match direction {
                SortDirection::Ascending => ScanOrder::Ascending,
                SortDirection::Descending => ScanOrder::Descending,
            };
            return Some((index, order));
        }
    }
    None
}

/// `order by @rid [asc|desc]` is the physical scan order
pub fn order_satisfied_by_rid(order_by: &[OrderItem]) -> Option<ScanOrder> {
    match order_by {
        [item] if matches!(item.key, OrderKey::Rid) => Some(match item.direction {
            SortDirection::Ascending => ScanOrder::Ascending,
            SortDirection::Descending => ScanOrder::Descending,
        }),
        _ => None,
    }
}

/// Plain field names when every item is a simple field with one shared
/// direction; `None` otherwise (mixed directions are never elidable).
fn uniform_fields(order_by: &[OrderItem]) -> Option<(Vec<String>, SortDirection)> {
    if order_by.is_empty() {
        return None;
    }
    let direction = order_by[0].direction;
    let mut fields = Vec::with_capacity(order_by.len());
    for item in order_by {
        if item.direction != direction {
            return None;
        }
        match &item.key {
            OrderKey::Expression(Expression::Field(name)) => fields.push(name.clone()),
            _ => return None,
        }
    }
    Some((fields, direction))
}
