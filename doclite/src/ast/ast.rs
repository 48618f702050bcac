// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! AST node definitions for the SELECT statement

use crate::storage::{ClusterId, Rid, ScanOrder};
use crate::types::Value;
use serde::{Deserialize, Serialize};

/// Aggregate function names recognized structurally by the planner
pub const AGGREGATE_FUNCTIONS: [&str; 5] = ["count", "sum", "min", "max", "avg"];

/// Parsed SELECT statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    /// Absent target: the statement produces one synthetic input row
    pub target: Option<Target>,
    /// Empty projection list: `select *`, rows pass through unshaped
    pub projections: Vec<Projection>,
    pub distinct: bool,
    /// Evaluated left-to-right; later bindings see earlier ones
    pub let_bindings: Vec<LetBinding>,
    pub predicate: Option<BooleanExpression>,
    pub group_by: Vec<Expression>,
    pub order_by: Vec<OrderItem>,
    /// Collection-valued fields fanned out one row per element
    pub unwind: Vec<String>,
    /// Literal or parameter
    pub skip: Option<Expression>,
    /// Literal or parameter; negative means unbounded
    pub limit: Option<Expression>,
}

impl SelectStatement {
    /// Statement with no target (`select 1 as one`)
    pub fn new() -> Self {
        Self {
            target: None,
            projections: Vec::new(),
            distinct: false,
            let_bindings: Vec::new(),
            predicate: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
            unwind: Vec::new(),
            skip: None,
            limit: None,
        }
    }

    pub fn from_target(target: Target) -> Self {
        let mut statement = Self::new();
        statement.target = Some(target);
        statement
    }

    pub fn from_class(name: &str) -> Self {
        Self::from_target(Target::Class(name.to_string()))
    }

    pub fn from_cluster(cluster: ClusterId) -> Self {
        Self::from_target(Target::Clusters(vec![ClusterTarget::Id(cluster)]))
    }

    pub fn from_clusters(clusters: Vec<ClusterId>) -> Self {
        Self::from_target(Target::Clusters(
            clusters.into_iter().map(ClusterTarget::Id).collect(),
        ))
    }

    pub fn from_rids(rids: Vec<Rid>) -> Self {
        Self::from_target(Target::Rids(rids))
    }

    pub fn from_subquery(inner: SelectStatement) -> Self {
        Self::from_target(Target::Subquery(Box::new(inner)))
    }

    pub fn from_index(name: &str) -> Self {
        Self::from_target(Target::Index {
            name: name.to_string(),
            mode: IndexTargetMode::Entries,
        })
    }

    pub fn from_index_values(name: &str, order: ScanOrder) -> Self {
        Self::from_target(Target::Index {
            name: name.to_string(),
            mode: IndexTargetMode::Values(order),
        })
    }

    pub fn from_metadata(target: MetadataTarget) -> Self {
        Self::from_target(Target::Metadata(target))
    }

    pub fn with_projection(mut self, expression: Expression) -> Self {
        self.projections.push(Projection::new(expression));
        self
    }

    pub fn with_aliased_projection(mut self, expression: Expression, alias: &str) -> Self {
        self.projections
            .push(Projection::new(expression).aliased(alias));
        self
    }

    pub fn with_predicate(mut self, predicate: BooleanExpression) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_let(mut self, name: &str, value: LetValue) -> Self {
        self.let_bindings.push(LetBinding {
            name: name.to_string(),
            value,
        });
        self
    }

    pub fn with_group_by(mut self, expression: Expression) -> Self {
        self.group_by.push(expression);
        self
    }

    pub fn with_order_by(mut self, item: OrderItem) -> Self {
        self.order_by.push(item);
        self
    }

    pub fn with_unwind(mut self, field: &str) -> Self {
        self.unwind.push(field.to_string());
        self
    }

    pub fn with_distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn with_skip(mut self, skip: i64) -> Self {
        self.skip = Some(Expression::literal(skip));
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(Expression::literal(limit));
        self
    }
}

impl Default for SelectStatement {
    fn default() -> Self {
        Self::new()
    }
}

/// FROM target descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    /// Class scan, polymorphic over subclasses
    Class(String),
    /// One or more explicit clusters
    Clusters(Vec<ClusterTarget>),
    /// Explicit record list; non-existent RIDs are skipped
    Rids(Vec<Rid>),
    Subquery(Box<SelectStatement>),
    /// `index:` and `indexvalues[asc|desc]:` targets
    Index { name: String, mode: IndexTargetMode },
    /// `metadata:` pseudo-collections
    Metadata(MetadataTarget),
    /// Target supplied as a statement parameter (class name)
    Parameter(Parameter),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClusterTarget {
    Id(ClusterId),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexTargetMode {
    /// Iterate `{key, rid}` entries
    Entries,
    /// Iterate the referenced records in key order
    Values(ScanOrder),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataTarget {
    Schema,
    IndexManager,
}

/// One projection item with optional alias and nested sub-projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub expression: Expression,
    pub alias: Option<String>,
    pub nested: Option<NestedProjection>,
}

impl Projection {
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            alias: None,
            nested: None,
        }
    }

    pub fn aliased(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn with_nested(mut self, nested: NestedProjection) -> Self {
        self.nested = Some(nested);
        self
    }

    /// The output column name: the alias, or the expression's canonical text
    pub fn output_name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| self.expression.to_string())
    }
}

/// Nested sub-projection shaping a linked/embedded value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NestedProjection {
    /// `field:{*}`
    All,
    /// `field:{!a, !b}`
    Exclude(Vec<String>),
}

/// LET binding; the right-hand side may be a correlated subquery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetBinding {
    /// Variable name including the leading `$`
    pub name: String,
    pub value: LetValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LetValue {
    Expression(Expression),
    Subquery(Box<SelectStatement>),
}

/// ORDER BY item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub key: OrderKey,
    pub direction: SortDirection,
}

impl OrderItem {
    pub fn asc(field: &str) -> Self {
        Self {
            key: OrderKey::Expression(Expression::field(field)),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            key: OrderKey::Expression(Expression::field(field)),
            direction: SortDirection::Descending,
        }
    }

    pub fn rid(direction: SortDirection) -> Self {
        Self {
            key: OrderKey::Rid,
            direction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderKey {
    Expression(Expression),
    /// `order by @rid`
    Rid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Statement parameter reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parameter {
    Positional(usize),
    Named(String),
}

/// Scalar expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Literal(Value),
    /// Property of the current row
    Field(String),
    /// `base.name` navigation
    FieldAccess {
        base: Box<Expression>,
        name: String,
    },
    /// `$name` context variable (LET binding, `$parent`, ...)
    Variable(String),
    Parameter(Parameter),
    Binary {
        left: Box<Expression>,
        operator: ArithmeticOp,
        right: Box<Expression>,
    },
    Neg(Box<Expression>),
    List(Vec<Expression>),
    /// `base[index]`
    Index {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    /// `base[from..to]` (exclusive) / `base[from...to]` (inclusive)
    Slice {
        base: Box<Expression>,
        from: Box<Expression>,
        to: Box<Expression>,
        inclusive: bool,
    },
    /// `base[=v]`, `base[<v]`, `base[LIKE p]`, `base[IN (...)]`
    FilterItems {
        base: Box<Expression>,
        filter: CollectionFilter,
    },
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    /// `base.method(args)`
    MethodCall {
        base: Box<Expression>,
        name: String,
        args: Vec<Expression>,
    },
    Subquery(Box<SelectStatement>),
    /// `*`, valid only as the argument of `count(*)`
    Star,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Literal filter applied element-wise to a collection value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CollectionFilter {
    Compare(ComparisonOp, Box<Expression>),
    Like(Box<Expression>),
    In(Vec<Expression>),
}

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn field(name: &str) -> Self {
        Expression::Field(name.to_string())
    }

    pub fn var(name: &str) -> Self {
        Expression::Variable(name.to_string())
    }

    pub fn path(base: Expression, name: &str) -> Self {
        Expression::FieldAccess {
            base: Box::new(base),
            name: name.to_string(),
        }
    }

    pub fn binary(left: Expression, operator: ArithmeticOp, right: Expression) -> Self {
        Expression::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub fn add(left: Expression, right: Expression) -> Self {
        Self::binary(left, ArithmeticOp::Add, right)
    }

    pub fn call(name: &str, args: Vec<Expression>) -> Self {
        Expression::FunctionCall {
            name: name.to_string(),
            args,
        }
    }

    pub fn method(base: Expression, name: &str, args: Vec<Expression>) -> Self {
        Expression::MethodCall {
            base: Box::new(base),
            name: name.to_string(),
            args,
        }
    }

    pub fn index(base: Expression, index: Expression) -> Self {
        Expression::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    pub fn slice(base: Expression, from: Expression, to: Expression, inclusive: bool) -> Self {
        Expression::Slice {
            base: Box::new(base),
            from: Box::new(from),
            to: Box::new(to),
            inclusive,
        }
    }

    /// Whether this node itself is an aggregate function call
    pub fn is_aggregate_call(&self) -> bool {
        match self {
            Expression::FunctionCall { name, .. } => {
                AGGREGATE_FUNCTIONS.contains(&name.to_lowercase().as_str())
            }
            _ => false,
        }
    }

    /// Recursive aggregate analysis over the expression tree
    pub fn aggregate_usage(&self) -> AggregateUsage {
        let mut usage = AggregateUsage::default();
        self.collect_aggregate_usage(&mut usage);
        usage
    }

    fn collect_aggregate_usage(&self, usage: &mut AggregateUsage) {
        if self.is_aggregate_call() {
            usage.has_aggregate = true;
            return;
        }
        match self {
            Expression::Field(_) | Expression::FieldAccess { .. } => {
                usage.has_field_outside_aggregate = true;
            }
            Expression::Binary { left, right, .. } => {
                left.collect_aggregate_usage(usage);
                right.collect_aggregate_usage(usage);
            }
            Expression::Neg(inner) => inner.collect_aggregate_usage(usage),
            Expression::List(items) => {
                for item in items {
                    item.collect_aggregate_usage(usage);
                }
            }
            Expression::Index { base, index } => {
                base.collect_aggregate_usage(usage);
                index.collect_aggregate_usage(usage);
            }
            Expression::Slice { base, from, to, .. } => {
                base.collect_aggregate_usage(usage);
                from.collect_aggregate_usage(usage);
                to.collect_aggregate_usage(usage);
            }
            Expression::FilterItems { base, .. } => base.collect_aggregate_usage(usage),
            Expression::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_aggregate_usage(usage);
                }
            }
            Expression::MethodCall { base, args, .. } => {
                base.collect_aggregate_usage(usage);
                for arg in args {
                    arg.collect_aggregate_usage(usage);
                }
            }
            Expression::Literal(_)
            | Expression::Variable(_)
            | Expression::Parameter(_)
            | Expression::Subquery(_)
            | Expression::Star => {}
        }
    }
}

/// Result of scanning an expression for aggregate calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateUsage {
    pub has_aggregate: bool,
    /// A field reference outside any aggregate call
    pub has_field_outside_aggregate: bool,
}

/// Boolean predicate tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BooleanExpression {
    And(Vec<BooleanExpression>),
    Or(Vec<BooleanExpression>),
    Not(Box<BooleanExpression>),
    Comparison {
        left: Expression,
        operator: ComparisonOp,
        right: Expression,
    },
    Between {
        expression: Expression,
        lower: Expression,
        upper: Expression,
    },
    In {
        expression: Expression,
        target: InTarget,
    },
    /// Collection membership with numeric coercion
    Contains {
        expression: Expression,
        item: Expression,
    },
    /// Full-string regex match
    Matches {
        expression: Expression,
        pattern: Expression,
    },
    IsNull(Expression),
    IsNotNull(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InTarget {
    List(Vec<Expression>),
    Subquery(Box<SelectStatement>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    /// `%` / `_` wildcard match
    Like,
}

impl BooleanExpression {
    pub fn compare(left: Expression, operator: ComparisonOp, right: Expression) -> Self {
        BooleanExpression::Comparison {
            left,
            operator,
            right,
        }
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(
            Expression::field(field),
            ComparisonOp::Equal,
            Expression::Literal(value.into()),
        )
    }

    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(
            Expression::field(field),
            ComparisonOp::NotEqual,
            Expression::Literal(value.into()),
        )
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(
            Expression::field(field),
            ComparisonOp::Greater,
            Expression::Literal(value.into()),
        )
    }

    pub fn ge(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(
            Expression::field(field),
            ComparisonOp::GreaterOrEqual,
            Expression::Literal(value.into()),
        )
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(
            Expression::field(field),
            ComparisonOp::Less,
            Expression::Literal(value.into()),
        )
    }

    pub fn le(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(
            Expression::field(field),
            ComparisonOp::LessOrEqual,
            Expression::Literal(value.into()),
        )
    }

    pub fn and(conditions: Vec<BooleanExpression>) -> Self {
        BooleanExpression::And(conditions)
    }

    pub fn or(conditions: Vec<BooleanExpression>) -> Self {
        BooleanExpression::Or(conditions)
    }

    /// Whether any expression in the predicate tree contains an aggregate
    pub fn contains_aggregate(&self) -> bool {
        match self {
            BooleanExpression::And(items) | BooleanExpression::Or(items) => {
                items.iter().any(|item| item.contains_aggregate())
            }
            BooleanExpression::Not(inner) => inner.contains_aggregate(),
            BooleanExpression::Comparison { left, right, .. } => {
                left.aggregate_usage().has_aggregate || right.aggregate_usage().has_aggregate
            }
            BooleanExpression::Between {
                expression,
                lower,
                upper,
            } => {
                expression.aggregate_usage().has_aggregate
                    || lower.aggregate_usage().has_aggregate
                    || upper.aggregate_usage().has_aggregate
            }
            BooleanExpression::In { expression, target } => {
                expression.aggregate_usage().has_aggregate
                    || matches!(target, InTarget::List(items)
                        if items.iter().any(|item| item.aggregate_usage().has_aggregate))
            }
            BooleanExpression::Contains { expression, item } => {
                expression.aggregate_usage().has_aggregate
                    || item.aggregate_usage().has_aggregate
            }
            BooleanExpression::Matches { expression, pattern } => {
                expression.aggregate_usage().has_aggregate
                    || pattern.aggregate_usage().has_aggregate
            }
            BooleanExpression::IsNull(expression) | BooleanExpression::IsNotNull(expression) => {
                expression.aggregate_usage().has_aggregate
            }
        }
    }
}
