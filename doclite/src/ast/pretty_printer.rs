// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Canonical source text for AST nodes
//!
//! Unaliased projections take the expression's canonical text as their
//! output name (`2 + 3`, `sum(val)`, `count(*)`), so the printer is part
//! of the executor's observable behavior, not a debugging aid.

use crate::ast::ast::{
    ArithmeticOp, BooleanExpression, CollectionFilter, ComparisonOp, Expression, InTarget,
    Parameter, SelectStatement, Target,
};
use crate::types::Value;
use std::fmt;

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "'{}'", s),
        Value::List(items) => {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_literal(f, item)?;
            }
            write!(f, "]")
        }
        other => write!(f, "{}", other),
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expression]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        };
        write!(f, "{}", symbol)
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "<>",
            ComparisonOp::Less => "<",
            ComparisonOp::LessOrEqual => "<=",
            ComparisonOp::Greater => ">",
            ComparisonOp::GreaterOrEqual => ">=",
            ComparisonOp::Like => "LIKE",
        };
        write!(f, "{}", symbol)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Positional(index) => write!(f, "?{}", index),
            Parameter::Named(name) => write!(f, ":{}", name),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(value) => write_literal(f, value),
            Expression::Field(name) => write!(f, "{}", name),
            Expression::FieldAccess { base, name } => write!(f, "{}.{}", base, name),
            Expression::Variable(name) => write!(f, "{}", name),
            Expression::Parameter(parameter) => write!(f, "{}", parameter),
            Expression::Binary {
                left,
                operator,
                right,
            } => write!(f, "{} {} {}", left, operator, right),
            Expression::Neg(inner) => write!(f, "-{}", inner),
            Expression::List(items) => {
                write!(f, "[")?;
                write_args(f, items)?;
                write!(f, "]")
            }
            Expression::Index { base, index } => write!(f, "{}[{}]", base, index),
            Expression::Slice {
                base,
                from,
                to,
                inclusive,
            } => {
                let dots = if *inclusive { "..." } else { ".." };
                write!(f, "{}[{}{}{}]", base, from, dots, to)
            }
            Expression::FilterItems { base, filter } => match filter {
                CollectionFilter::Compare(operator, value) => {
                    write!(f, "{}[{}{}]", base, operator, value)
                }
                CollectionFilter::Like(pattern) => write!(f, "{}[LIKE {}]", base, pattern),
                CollectionFilter::In(items) => {
                    write!(f, "{}[IN [", base)?;
                    write_args(f, items)?;
                    write!(f, "]]")
                }
            },
            Expression::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Expression::MethodCall { base, name, args } => {
                write!(f, "{}.{}(", base, name)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Expression::Subquery(statement) => write!(f, "({})", statement),
            Expression::Star => write!(f, "*"),
        }
    }
}

impl fmt::Display for BooleanExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BooleanExpression::And(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            BooleanExpression::Or(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " or ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            BooleanExpression::Not(inner) => write!(f, "not ({})", inner),
            BooleanExpression::Comparison {
                left,
                operator,
                right,
            } => write!(f, "{} {} {}", left, operator, right),
            BooleanExpression::Between {
                expression,
                lower,
                upper,
            } => write!(f, "{} between {} and {}", expression, lower, upper),
            BooleanExpression::In { expression, target } => match target {
                InTarget::List(items) => {
                    write!(f, "{} in [", expression)?;
                    write_args(f, items)?;
                    write!(f, "]")
                }
                InTarget::Subquery(statement) => write!(f, "{} in ({})", expression, statement),
            },
            BooleanExpression::Contains { expression, item } => {
                write!(f, "{} contains {}", expression, item)
            }
            BooleanExpression::Matches { expression, pattern } => {
                write!(f, "{} matches {}", expression, pattern)
            }
            BooleanExpression::IsNull(expression) => write!(f, "{} is null", expression),
            BooleanExpression::IsNotNull(expression) => write!(f, "{} is not null", expression),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Class(name) => write!(f, "{}", name),
            Target::Clusters(clusters) => {
                write!(f, "cluster:[")?;
                for (i, cluster) in clusters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match cluster {
                        crate::ast::ast::ClusterTarget::Id(id) => write!(f, "{}", id)?,
                        crate::ast::ast::ClusterTarget::Name(name) => write!(f, "{}", name)?,
                    }
                }
                write!(f, "]")
            }
            Target::Rids(rids) => {
                write!(f, "[")?;
                for (i, rid) in rids.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", rid)?;
                }
                write!(f, "]")
            }
            Target::Subquery(statement) => write!(f, "({})", statement),
            Target::Index { name, .. } => write!(f, "index:{}", name),
            Target::Metadata(target) => {
                let name = match target {
                    crate::ast::ast::MetadataTarget::Schema => "schema",
                    crate::ast::ast::MetadataTarget::IndexManager => "indexmanager",
                };
                write!(f, "metadata:{}", name)
            }
            Target::Parameter(parameter) => write!(f, "{}", parameter),
        }
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select")?;
        for (i, projection) in self.projections.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}", projection.expression)?;
            if let Some(alias) = &projection.alias {
                write!(f, " as {}", alias)?;
            }
        }
        if let Some(target) = &self.target {
            write!(f, " from {}", target)?;
        }
        if let Some(predicate) = &self.predicate {
            write!(f, " where {}", predicate)?;
        }
        Ok(())
    }
}
