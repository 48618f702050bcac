// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Aggregate function accumulators

use crate::types::coercion::total_compare;
use crate::types::Value;
use std::cmp::Ordering;

/// The supported aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateFunction {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "count" => Some(AggregateFunction::Count),
            "sum" => Some(AggregateFunction::Sum),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            "avg" => Some(AggregateFunction::Avg),
            _ => None,
        }
    }
}

/// Incremental state for one aggregate call within one group
#[derive(Debug, Clone)]
pub struct Accumulator {
    function: AggregateFunction,
    count: i64,
    int_sum: i64,
    float_sum: f64,
    saw_float: bool,
    saw_value: bool,
    extreme: Option<Value>,
}

impl Accumulator {
    pub fn new(function: AggregateFunction) -> Self {
        Self {
            function,
            count: 0,
            int_sum: 0,
            float_sum: 0.0,
            saw_float: false,
            saw_value: false,
            extreme: None,
        }
    }

    /// Count a row regardless of value (`count(*)`)
    pub fn add_row(&mut self) {
        self.count += 1;
    }

    /// Accumulate one evaluated argument; nulls are skipped
    pub fn add(&mut self, value: &Value) {
        if value.is_null() {
            return;
        }
        self.saw_value = true;
        self.count += 1;
        match self.function {
            AggregateFunction::Count => {}
            AggregateFunction::Sum | AggregateFunction::Avg => match value {
                Value::Integer(i) => self.int_sum += i,
                Value::Float(f) => {
                    self.saw_float = true;
                    self.float_sum += f;
                }
                _ => {}
            },
            AggregateFunction::Min => {
                let replace = match &self.extreme {
                    Some(current) => total_compare(value, current) == Ordering::Less,
                    None => true,
                };
                if replace {
                    self.extreme = Some(value.clone());
                }
            }
            AggregateFunction::Max => {
                let replace = match &self.extreme {
                    Some(current) => total_compare(value, current) == Ordering::Greater,
                    None => true,
                };
                if replace {
                    self.extreme = Some(value.clone());
                }
            }
        }
    }

    pub fn finish(self) -> Value {
        match self.function {
            AggregateFunction::Count => Value::Integer(self.count),
            AggregateFunction::Sum => {
                if !self.saw_value {
                    Value::Null
                } else if self.saw_float {
                    Value::Float(self.float_sum + self.int_sum as f64)
                } else {
                    Value::Integer(self.int_sum)
                }
            }
            AggregateFunction::Avg => {
                if self.count == 0 {
                    Value::Null
                } else {
                    Value::Float((self.float_sum + self.int_sum as f64) / self.count as f64)
                }
            }
            AggregateFunction::Min | AggregateFunction::Max => {
                self.extreme.unwrap_or(Value::Null)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_stays_integer() {
        let mut acc = Accumulator::new(AggregateFunction::Sum);
        for i in 0..10 {
            acc.add(&Value::Integer(i));
        }
        assert_eq!(acc.finish(), Value::Integer(45));
    }

    #[test]
    fn test_sum_promotes_to_float() {
        let mut acc = Accumulator::new(AggregateFunction::Sum);
        acc.add(&Value::Integer(1));
        acc.add(&Value::Float(0.5));
        assert_eq!(acc.finish(), Value::Float(1.5));
    }

    #[test]
    fn test_count_star_counts_rows() {
        let mut acc = Accumulator::new(AggregateFunction::Count);
        for _ in 0..7 {
            acc.add_row();
        }
        assert_eq!(acc.finish(), Value::Integer(7));
    }

    #[test]
    fn test_min_max_skip_nulls() {
        let mut min = Accumulator::new(AggregateFunction::Min);
        let mut max = Accumulator::new(AggregateFunction::Max);
        for value in [Value::Null, Value::Integer(4), Value::Integer(2)] {
            min.add(&value);
            max.add(&value);
        }
        assert_eq!(min.finish(), Value::Integer(2));
        assert_eq!(max.finish(), Value::Integer(4));
    }
}
