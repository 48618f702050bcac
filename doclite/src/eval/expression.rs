// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Scalar expression evaluation against a row plus context

use crate::ast::{
    ArithmeticOp, CollectionFilter, Expression, Parameter, AGGREGATE_FUNCTIONS,
};
use crate::eval::predicate::{compare_with_op, like_match};
use crate::exec::context::{ExecutionContext, ParentScope};
use crate::exec::error::ExecutionError;
use crate::exec::result::ResultRow;
use crate::plan::planner;
use crate::types::coercion::values_equal;
use crate::types::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Evaluate a scalar expression. Missing properties evaluate to null;
/// type mismatches in operators are execution-time errors.
pub fn evaluate(
    expression: &Expression,
    row: &ResultRow,
    ctx: &Arc<ExecutionContext>,
) -> Result<Value, ExecutionError> {
    match expression {
        Expression::Literal(value) => Ok(value.clone()),
        Expression::Field(name) => Ok(row.property(name)),
        Expression::FieldAccess { base, name } => {
            let value = evaluate(base, row, ctx)?;
            Ok(navigate(&value, name, ctx))
        }
        Expression::Variable(name) => match name.as_str() {
            "$parent" => Ok(ctx
                .parent()
                .map(|scope| scope_value(scope))
                .unwrap_or(Value::Null)),
            "$current" => Ok(row.to_map()),
            _ => Ok(row.variable(name).cloned().unwrap_or(Value::Null)),
        },
        Expression::Parameter(parameter) => resolve_parameter(parameter, ctx),
        Expression::Binary {
            left,
            operator,
            right,
        } => {
            let left_value = evaluate(left, row, ctx)?;
            let right_value = evaluate(right, row, ctx)?;
            apply_binary(*operator, left_value, right_value)
        }
        Expression::Neg(inner) => match evaluate(inner, row, ctx)? {
            Value::Integer(i) => Ok(Value::Integer(-i)),
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Null => Ok(Value::Null),
            other => Err(ExecutionError::TypeError(format!(
                "cannot negate {}",
                other.type_name()
            ))),
        },
        Expression::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(evaluate(item, row, ctx)?);
            }
            Ok(Value::List(values))
        }
        Expression::Index { base, index } => {
            let collection = evaluate(base, row, ctx)?;
            let position = evaluate(index, row, ctx)?;
            Ok(match (&collection, &position) {
                (Value::List(items), Value::Integer(i)) => {
                    if *i >= 0 {
                        items.get(*i as usize).cloned().unwrap_or(Value::Null)
                    } else {
                        Value::Null
                    }
                }
                (Value::Map(map), Value::String(key)) => {
                    map.get(key).cloned().unwrap_or(Value::Null)
                }
                _ => Value::Null,
            })
        }
        Expression::Slice {
            base,
            from,
            to,
            inclusive,
        } => {
            let collection = evaluate(base, row, ctx)?;
            let from_value = evaluate(from, row, ctx)?;
            let to_value = evaluate(to, row, ctx)?;
            match (collection, from_value, to_value) {
                (Value::List(items), Value::Integer(from), Value::Integer(to)) => {
                    let start = from.max(0) as usize;
                    let mut end = to.max(0) as usize;
                    if *inclusive {
                        end += 1;
                    }
                    let end = end.min(items.len());
                    let start = start.min(end);
                    Ok(Value::List(items[start..end].to_vec()))
                }
                (Value::Null, _, _) => Ok(Value::Null),
                _ => Err(ExecutionError::TypeError(
                    "range subscript requires a collection and integer bounds".to_string(),
                )),
            }
        }
        Expression::FilterItems { base, filter } => {
            let collection = evaluate(base, row, ctx)?;
            let items = match collection {
                Value::List(items) => items,
                Value::Null => return Ok(Value::Null),
                _ => {
                    return Err(ExecutionError::TypeError(
                        "item filter requires a collection".to_string(),
                    ))
                }
            };
            let mut kept = Vec::new();
            match filter {
                CollectionFilter::Compare(operator, value_expression) => {
                    let value = evaluate(value_expression, row, ctx)?;
                    for item in items {
                        if compare_with_op(&item, *operator, &value) == Some(true) {
                            kept.push(item);
                        }
                    }
                }
                CollectionFilter::Like(pattern_expression) => {
                    let pattern = evaluate(pattern_expression, row, ctx)?;
                    if let Value::String(pattern) = pattern {
                        for item in items {
                            if matches!(&item, Value::String(s) if like_match(s, &pattern)) {
                                kept.push(item);
                            }
                        }
                    }
                }
                CollectionFilter::In(candidates) => {
                    let mut values = Vec::with_capacity(candidates.len());
                    for candidate in candidates {
                        values.push(evaluate(candidate, row, ctx)?);
                    }
                    for item in items {
                        if values.iter().any(|value| values_equal(&item, value)) {
                            kept.push(item);
                        }
                    }
                }
            }
            Ok(Value::List(kept))
        }
        Expression::FunctionCall { name, .. } => {
            let lowered = name.to_lowercase();
            if AGGREGATE_FUNCTIONS.contains(&lowered.as_str()) {
                return Err(ExecutionError::ExpressionError(format!(
                    "aggregate function {}() outside an aggregation context",
                    name
                )));
            }
            if lowered == "expand" {
                return Err(ExecutionError::InvalidQuery(
                    "expand() is only valid as the single projection".to_string(),
                ));
            }
            Err(ExecutionError::ExpressionError(format!(
                "unknown function: {}",
                name
            )))
        }
        Expression::MethodCall { base, name, args } => {
            let target = evaluate(base, row, ctx)?;
            let mut arguments = Vec::with_capacity(args.len());
            for arg in args {
                arguments.push(evaluate(arg, row, ctx)?);
            }
            apply_method(&target, name, &arguments)
        }
        Expression::Subquery(statement) => {
            let child = ctx.child_scope(row.clone());
            let rows = planner::execute_to_rows(statement, child)?;
            Ok(Value::List(rows.iter().map(ResultRow::to_map).collect()))
        }
        Expression::Star => Err(ExecutionError::ExpressionError(
            "* is only valid inside count(*)".to_string(),
        )),
    }
}

/// Resolve a statement parameter; unbound parameters are errors
pub fn resolve_parameter(
    parameter: &Parameter,
    ctx: &Arc<ExecutionContext>,
) -> Result<Value, ExecutionError> {
    ctx.parameter(parameter).cloned().ok_or_else(|| {
        ExecutionError::ExpressionError(format!("parameter {} is not bound", parameter))
    })
}

/// One step of field-path navigation over an evaluated value
fn navigate(value: &Value, name: &str, ctx: &Arc<ExecutionContext>) -> Value {
    match value {
        Value::Map(map) => map.get(name).cloned().unwrap_or(Value::Null),
        Value::Link(rid) => ctx
            .store()
            .read(rid)
            .and_then(|record| record.get(name).cloned())
            .unwrap_or(Value::Null),
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|item| navigate(item, name, ctx))
                .collect(),
        ),
        _ => Value::Null,
    }
}

/// The `$parent` scope as a navigable value: `$current` is the outer row,
/// `$parent` recurses up the chain.
fn scope_value(scope: &Arc<ParentScope>) -> Value {
    let mut map = BTreeMap::new();
    map.insert("$current".to_string(), scope.row.to_map());
    if let Some(grandparent) = scope.context.parent() {
        map.insert("$parent".to_string(), scope_value(grandparent));
    }
    Value::Map(map)
}

fn apply_binary(
    operator: ArithmeticOp,
    left: Value,
    right: Value,
) -> Result<Value, ExecutionError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    if operator == ArithmeticOp::Add {
        // + concatenates as soon as either side is a string
        if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
            return Ok(Value::String(format!(
                "{}{}",
                plain_text(&left),
                plain_text(&right)
            )));
        }
    }
    match (&left, &right) {
        (Value::Integer(a), Value::Integer(b)) => Ok(match operator {
            ArithmeticOp::Add => Value::Integer(a + b),
            ArithmeticOp::Subtract => Value::Integer(a - b),
            ArithmeticOp::Multiply => Value::Integer(a * b),
            ArithmeticOp::Divide => {
                if *b == 0 {
                    return Err(ExecutionError::ExpressionError(
                        "division by zero".to_string(),
                    ));
                }
                Value::Integer(a / b)
            }
        }),
        _ => {
            let a = left.as_f64().ok_or_else(|| type_error(&left, operator))?;
            let b = right.as_f64().ok_or_else(|| type_error(&right, operator))?;
            Ok(match operator {
                ArithmeticOp::Add => Value::Float(a + b),
                ArithmeticOp::Subtract => Value::Float(a - b),
                ArithmeticOp::Multiply => Value::Float(a * b),
                ArithmeticOp::Divide => Value::Float(a / b),
            })
        }
    }
}

fn type_error(value: &Value, operator: ArithmeticOp) -> ExecutionError {
    ExecutionError::TypeError(format!(
        "operator {} not applicable to {}",
        operator,
        value.type_name()
    ))
}

/// Unquoted text used for string concatenation and `asString()`
fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn apply_method(target: &Value, name: &str, args: &[Value]) -> Result<Value, ExecutionError> {
    if target.is_null() {
        return Ok(Value::Null);
    }
    match name.to_lowercase().as_str() {
        "substring" => {
            let text = target.as_string().ok_or_else(|| {
                ExecutionError::TypeError("substring() requires a string".to_string())
            })?;
            let chars: Vec<char> = text.chars().collect();
            let start = args
                .first()
                .and_then(Value::as_integer)
                .unwrap_or(0)
                .max(0) as usize;
            let end = args
                .get(1)
                .and_then(Value::as_integer)
                .map(|end| end.max(0) as usize)
                .unwrap_or(chars.len())
                .min(chars.len());
            let start = start.min(end);
            Ok(Value::String(chars[start..end].iter().collect()))
        }
        "tolowercase" => Ok(Value::String(
            plain_text(target).to_lowercase(),
        )),
        "touppercase" => Ok(Value::String(
            plain_text(target).to_uppercase(),
        )),
        "trim" => Ok(Value::String(plain_text(target).trim().to_string())),
        "asstring" => Ok(Value::String(plain_text(target))),
        "length" | "size" => Ok(match target {
            Value::String(s) => Value::Integer(s.chars().count() as i64),
            Value::List(items) => Value::Integer(items.len() as i64),
            Value::Map(map) => Value::Integer(map.len() as i64),
            _ => Value::Null,
        }),
        _ => Err(ExecutionError::ExpressionError(format!(
            "unknown method: {}",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryDatabase;
    use crate::storage::QuerySource;

    fn ctx() -> Arc<ExecutionContext> {
        let db = MemoryDatabase::new();
        let source: Arc<dyn QuerySource> = Arc::new(db);
        Arc::new(ExecutionContext::new(source))
    }

    #[test]
    fn test_arithmetic_keeps_integer_type() {
        let ctx = ctx();
        let row = ResultRow::new();
        let expression = Expression::add(Expression::literal(2i64), Expression::literal(3i64));
        assert_eq!(evaluate(&expression, &row, &ctx).unwrap(), Value::Integer(5));
    }

    #[test]
    fn test_string_concatenation() {
        let ctx = ctx();
        let mut row = ResultRow::new();
        row.set("name".to_string(), Value::from("name1"));
        row.set("surname".to_string(), Value::from("surname1"));
        let expression = Expression::add(
            Expression::add(Expression::field("name"), Expression::literal(" ")),
            Expression::field("surname"),
        );
        assert_eq!(
            evaluate(&expression, &row, &ctx).unwrap(),
            Value::from("name1 surname1")
        );
    }

    #[test]
    fn test_slice_exclusive_and_inclusive() {
        let ctx = ctx();
        let mut row = ResultRow::new();
        row.set(
            "name".to_string(),
            Value::List(vec![
                Value::from("a"),
                Value::from("b"),
                Value::from("c"),
                Value::from("d"),
            ]),
        );
        let exclusive = Expression::slice(
            Expression::field("name"),
            Expression::literal(0i64),
            Expression::literal(3i64),
            false,
        );
        let inclusive = Expression::slice(
            Expression::field("name"),
            Expression::literal(0i64),
            Expression::literal(2i64),
            true,
        );
        assert_eq!(
            evaluate(&exclusive, &row, &ctx).unwrap(),
            Value::List(vec![Value::from("a"), Value::from("b"), Value::from("c")])
        );
        assert_eq!(
            evaluate(&inclusive, &row, &ctx).unwrap(),
            Value::List(vec![Value::from("a"), Value::from("b"), Value::from("c")])
        );
    }

    #[test]
    fn test_missing_field_is_null() {
        let ctx = ctx();
        let row = ResultRow::new();
        assert_eq!(
            evaluate(&Expression::field("nope"), &row, &ctx).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_substring_method() {
        let ctx = ctx();
        let row = ResultRow::new();
        let expression = Expression::method(
            Expression::literal("dd1"),
            "substring",
            vec![Expression::literal(0i64), Expression::literal(1i64)],
        );
        assert_eq!(
            evaluate(&expression, &row, &ctx).unwrap(),
            Value::from("d")
        );
    }
}
