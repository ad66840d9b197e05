//! Expression evaluation
//!
//! A deliberately small expression tree, enough to drive filters and
//! projections: column references, constants, binary operators, and NULL
//! tests. Evaluation is row-at-a-time against a chunk.

use crate::chunk::DataChunk;
use mallard_common::{Error, Result, Value};

/// A scalar expression over a chunk's columns
#[derive(Debug, Clone)]
pub enum Expression {
    /// A literal value
    Constant(Value),
    /// A reference to a column by position
    ColumnRef(usize),
    /// A binary operation
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    IsNull(Box<Expression>),
    IsNotNull(Box<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
}

impl Expression {
    pub fn column(idx: usize) -> Expression {
        Expression::ColumnRef(idx)
    }

    pub fn constant(value: Value) -> Expression {
        Expression::Constant(value)
    }

    pub fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
        Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }
}

/// Evaluate an expression against one row of a chunk
pub fn evaluate(expr: &Expression, chunk: &DataChunk, row_idx: usize) -> Result<Value> {
    match expr {
        Expression::Constant(value) => Ok(value.clone()),

        Expression::ColumnRef(column_idx) => {
            if *column_idx >= chunk.column_count() {
                return Err(Error::Internal(format!(
                    "column index {} out of bounds (chunk has {})",
                    column_idx,
                    chunk.column_count()
                )));
            }
            Ok(chunk.column(*column_idx).get_value(row_idx))
        }

        Expression::BinaryOp { left, op, right } => {
            let left_val = evaluate(left, chunk, row_idx)?;
            let right_val = evaluate(right, chunk, row_idx)?;
            evaluate_binary_op(&left_val, *op, &right_val)
        }

        Expression::IsNull(inner) => {
            let val = evaluate(inner, chunk, row_idx)?;
            Ok(Value::Boolean(val.is_null()))
        }

        Expression::IsNotNull(inner) => {
            let val = evaluate(inner, chunk, row_idx)?;
            Ok(Value::Boolean(!val.is_null()))
        }
    }
}

fn evaluate_binary_op(left: &Value, op: BinaryOperator, right: &Value) -> Result<Value> {
    use BinaryOperator::*;

    // SQL NULL propagation; AND/OR are three-valued
    if left.is_null() || right.is_null() {
        return Ok(match op {
            And if matches!(left, Value::Boolean(false)) || matches!(right, Value::Boolean(false)) => {
                Value::Boolean(false)
            }
            Or if matches!(left, Value::Boolean(true)) || matches!(right, Value::Boolean(true)) => {
                Value::Boolean(true)
            }
            _ => Value::Null,
        });
    }

    match op {
        Add => arithmetic_op(left, right, op),
        Subtract => arithmetic_op(left, right, op),
        Multiply => arithmetic_op(left, right, op),
        Divide | Modulo => {
            if right.as_f64() == Some(0.0) {
                return Err(Error::DivisionByZero);
            }
            arithmetic_op(left, right, op)
        }

        Equal => compare_op(left, right, |ord| ord.is_eq()),
        NotEqual => compare_op(left, right, |ord| ord.is_ne()),
        LessThan => compare_op(left, right, |ord| ord.is_lt()),
        LessThanOrEqual => compare_op(left, right, |ord| ord.is_le()),
        GreaterThan => compare_op(left, right, |ord| ord.is_gt()),
        GreaterThanOrEqual => compare_op(left, right, |ord| ord.is_ge()),

        And => boolean_op(left, right, |a, b| a && b),
        Or => boolean_op(left, right, |a, b| a || b),
    }
}

fn arithmetic_op(left: &Value, right: &Value, op: BinaryOperator) -> Result<Value> {
    use BinaryOperator::*;

    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        let result = match op {
            Add => a.checked_add(b),
            Subtract => a.checked_sub(b),
            Multiply => a.checked_mul(b),
            Divide => a.checked_div(b),
            Modulo => a.checked_rem(b),
            _ => None,
        };
        return result.map(Value::BigInt).ok_or_else(|| {
            Error::Execution(format!("integer overflow evaluating {} {:?} {}", a, op, b))
        });
    }

    if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
        let result = match op {
            Add => a + b,
            Subtract => a - b,
            Multiply => a * b,
            Divide => a / b,
            Modulo => a % b,
            _ => return Err(Error::Internal("non-arithmetic operator".to_string())),
        };
        return Ok(Value::Double(result));
    }

    Err(Error::TypeMismatch {
        expected: "numeric".to_string(),
        got: format!("{} and {}", left.logical_type(), right.logical_type()),
    })
}

fn compare_op(
    left: &Value,
    right: &Value,
    check: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Value> {
    match left.partial_cmp(right) {
        Some(ord) => Ok(Value::Boolean(check(ord))),
        None => Err(Error::TypeMismatch {
            expected: format!("value comparable to {}", left.logical_type()),
            got: right.logical_type().to_string(),
        }),
    }
}

fn boolean_op(left: &Value, right: &Value, apply: impl Fn(bool, bool) -> bool) -> Result<Value> {
    match (left, right) {
        (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(apply(*a, *b))),
        _ => Err(Error::TypeMismatch {
            expected: "BOOLEAN".to_string(),
            got: format!("{} and {}", left.logical_type(), right.logical_type()),
        }),
    }
}
