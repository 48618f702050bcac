// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Three-valued predicate evaluation
//!
//! `Some(true)` / `Some(false)` / `None` (unknown). A null operand makes a
//! comparison unknown; filters treat unknown as false. Incomparable
//! non-null types compare as false, not unknown.

use crate::ast::{BooleanExpression, ComparisonOp, Expression, InTarget};
use crate::eval::expression::evaluate;
use crate::exec::context::ExecutionContext;
use crate::exec::error::ExecutionError;
use crate::exec::result::ResultRow;
use crate::plan::planner;
use crate::types::coercion::{compare, values_equal};
use crate::types::Value;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::Arc;

/// Evaluate a predicate against a row. `None` means unknown.
pub fn test_predicate(
    predicate: &BooleanExpression,
    row: &ResultRow,
    ctx: &Arc<ExecutionContext>,
) -> Result<Option<bool>, ExecutionError> {
    match predicate {
        BooleanExpression::And(items) => {
            let mut unknown = false;
            for item in items {
                match test_predicate(item, row, ctx)? {
                    Some(false) => return Ok(Some(false)),
                    None => unknown = true,
                    Some(true) => {}
                }
            }
            Ok(if unknown { None } else { Some(true) })
        }
        BooleanExpression::Or(items) => {
            let mut unknown = false;
            for item in items {
                match test_predicate(item, row, ctx)? {
                    Some(true) => return Ok(Some(true)),
                    None => unknown = true,
                    Some(false) => {}
                }
            }
            Ok(if unknown { None } else { Some(false) })
        }
        BooleanExpression::Not(inner) => {
            Ok(test_predicate(inner, row, ctx)?.map(|value| !value))
        }
        BooleanExpression::Comparison {
            left,
            operator,
            right,
        } => {
            let left_value = evaluate(left, row, ctx)?;
            let right_value = evaluate(right, row, ctx)?;
            Ok(compare_with_op(&left_value, *operator, &right_value))
        }
        BooleanExpression::Between {
            expression,
            lower,
            upper,
        } => {
            let value = evaluate(expression, row, ctx)?;
            let low = evaluate(lower, row, ctx)?;
            let high = evaluate(upper, row, ctx)?;
            let above = compare_with_op(&value, ComparisonOp::GreaterOrEqual, &low);
            let below = compare_with_op(&value, ComparisonOp::LessOrEqual, &high);
            Ok(match (above, below) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            })
        }
        BooleanExpression::In { expression, target } => {
            let value = evaluate(expression, row, ctx)?;
            if value.is_null() {
                return Ok(None);
            }
            match target {
                InTarget::List(items) => {
                    for item in items {
                        let candidate = evaluate(item, row, ctx)?;
                        if values_equal(&value, &candidate) {
                            return Ok(Some(true));
                        }
                    }
                    Ok(Some(false))
                }
                InTarget::Subquery(statement) => {
                    let child = ctx.child_scope(row.clone());
                    let rows = planner::execute_to_rows(statement, child)?;
                    for subquery_row in rows {
                        let candidate = subquery_row
                            .field_names()
                            .first()
                            .map(|name| subquery_row.property(name))
                            .unwrap_or(Value::Null);
                        if values_equal(&value, &candidate) {
                            return Ok(Some(true));
                        }
                    }
                    Ok(Some(false))
                }
            }
        }
        BooleanExpression::Contains { expression, item } => {
            let collection = evaluate(expression, row, ctx)?;
            let needle = evaluate(item, row, ctx)?;
            match collection {
                Value::Null => Ok(None),
                Value::List(items) => {
                    Ok(Some(items.iter().any(|element| values_equal(element, &needle))))
                }
                _ => Ok(Some(false)),
            }
        }
        BooleanExpression::Matches { expression, pattern } => {
            let value = evaluate(expression, row, ctx)?;
            let pattern_value = evaluate(pattern, row, ctx)?;
            match (&value, &pattern_value) {
                (Value::Null, _) | (_, Value::Null) => Ok(None),
                (Value::String(s), Value::String(p)) => {
                    let regex = Regex::new(&format!("^(?:{})$", p)).map_err(|error| {
                        ExecutionError::ExpressionError(format!(
                            "invalid pattern '{}': {}",
                            p, error
                        ))
                    })?;
                    Ok(Some(regex.is_match(s)))
                }
                _ => Ok(Some(false)),
            }
        }
        BooleanExpression::IsNull(expression) => {
            Ok(Some(evaluate(expression, row, ctx)?.is_null()))
        }
        BooleanExpression::IsNotNull(expression) => {
            Ok(Some(!evaluate(expression, row, ctx)?.is_null()))
        }
    }
}

/// Comparison with null-awareness and numeric coercion
pub fn compare_with_op(left: &Value, operator: ComparisonOp, right: &Value) -> Option<bool> {
    if left.is_null() || right.is_null() {
        return None;
    }
    match operator {
        ComparisonOp::Equal => Some(values_equal(left, right)),
        ComparisonOp::NotEqual => Some(!values_equal(left, right)),
        ComparisonOp::Like => match (left, right) {
            (Value::String(value), Value::String(pattern)) => Some(like_match(value, pattern)),
            _ => Some(false),
        },
        _ => {
            let ordering = match compare(left, right) {
                Some(ordering) => ordering,
                // incomparable non-null types never satisfy an ordering test
                None => return Some(false),
            };
            Some(match operator {
                ComparisonOp::Less => ordering == Ordering::Less,
                ComparisonOp::LessOrEqual => ordering != Ordering::Greater,
                ComparisonOp::Greater => ordering == Ordering::Greater,
                ComparisonOp::GreaterOrEqual => ordering != Ordering::Less,
                _ => unreachable!(),
            })
        }
    }
}

/// `%` / `_` wildcard match, full-string
pub fn like_match(value: &str, pattern: &str) -> bool {
    let mut regex_source = String::with_capacity(pattern.len() + 4);
    regex_source.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' => regex_source.push_str(".*"),
            '_' => regex_source.push('.'),
            other => regex_source.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex_source.push('$');
    Regex::new(&regex_source)
        .map(|regex| regex.is_match(value))
        .unwrap_or(false)
}

/// Plan-time evaluation of an expression that must not depend on a row:
/// literals, parameters, constant arithmetic. `None` when the expression
/// needs row context.
pub fn constant_value(
    expression: &Expression,
    ctx: &Arc<ExecutionContext>,
) -> Option<Value> {
    if references_row(expression) {
        return None;
    }
    let empty = ResultRow::new();
    evaluate(expression, &empty, ctx).ok()
}

/// Whether the expression reads the current row
pub fn references_row(expression: &Expression) -> bool {
    match expression {
        Expression::Field(_) | Expression::FieldAccess { .. } | Expression::Star => true,
        Expression::Variable(_) => true,
        Expression::Literal(_) | Expression::Parameter(_) => false,
        Expression::Binary { left, right, .. } => references_row(left) || references_row(right),
        Expression::Neg(inner) => references_row(inner),
        Expression::List(items) => items.iter().any(references_row),
        Expression::Index { base, index } => references_row(base) || references_row(index),
        Expression::Slice { base, from, to, .. } => {
            references_row(base) || references_row(from) || references_row(to)
        }
        Expression::FilterItems { base, .. } => references_row(base),
        Expression::FunctionCall { args, .. } => args.iter().any(references_row),
        Expression::MethodCall { base, args, .. } => {
            references_row(base) || args.iter().any(references_row)
        }
        Expression::Subquery(_) => true,
    }
}

/// Whether any field reference occurs anywhere in the predicate
pub fn predicate_references_row(predicate: &BooleanExpression) -> bool {
    match predicate {
        BooleanExpression::And(items) | BooleanExpression::Or(items) => {
            items.iter().any(predicate_references_row)
        }
        BooleanExpression::Not(inner) => predicate_references_row(inner),
        BooleanExpression::Comparison { left, right, .. } => {
            references_row(left) || references_row(right)
        }
        BooleanExpression::Between {
            expression,
            lower,
            upper,
        } => references_row(expression) || references_row(lower) || references_row(upper),
        BooleanExpression::In { expression, target } => {
            references_row(expression)
                || matches!(target, InTarget::List(items) if items.iter().any(references_row))
                || matches!(target, InTarget::Subquery(_))
        }
        BooleanExpression::Contains { expression, item } => {
            references_row(expression) || references_row(item)
        }
        BooleanExpression::Matches { expression, pattern } => {
            references_row(expression) || references_row(pattern)
        }
        BooleanExpression::IsNull(expression) | BooleanExpression::IsNotNull(expression) => {
            references_row(expression)
        }
    }
}
