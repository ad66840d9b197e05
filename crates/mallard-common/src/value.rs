//! Runtime value representation for Mallard
//!
//! `Value` is the row-at-a-time currency of the engine: expression
//! evaluation, row bridges on chunks, and test assertions all speak in
//! values. Columnar storage lives in the execution crate.

use crate::types::LogicalType;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// An interval value representing a duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub micros: i64,
}

impl Interval {
    pub fn new(months: i32, days: i32, micros: i64) -> Self {
        Interval {
            months,
            days,
            micros,
        }
    }
}

/// Runtime value representation
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Varchar(String),
    Blob(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Interval(Interval),
    Uuid(Uuid),
    List(Vec<Value>),
    Struct(Vec<(String, Value)>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The logical type of this value. NULL reports as ANY since it can
    /// inhabit any column.
    pub fn logical_type(&self) -> LogicalType {
        match self {
            Value::Null => LogicalType::Any,
            Value::Boolean(_) => LogicalType::Boolean,
            Value::TinyInt(_) => LogicalType::TinyInt,
            Value::SmallInt(_) => LogicalType::SmallInt,
            Value::Integer(_) => LogicalType::Integer,
            Value::BigInt(_) => LogicalType::BigInt,
            Value::Float(_) => LogicalType::Float,
            Value::Double(_) => LogicalType::Double,
            Value::Decimal(_) => LogicalType::Decimal { width: 38, scale: 9 },
            Value::Varchar(_) => LogicalType::Varchar,
            Value::Blob(_) => LogicalType::Blob,
            Value::Date(_) => LogicalType::Date,
            Value::Time(_) => LogicalType::Time,
            Value::Timestamp(_) => LogicalType::Timestamp,
            Value::Interval(_) => LogicalType::Interval,
            Value::Uuid(_) => LogicalType::Uuid,
            Value::List(values) => {
                let inner = values
                    .first()
                    .map(|v| v.logical_type())
                    .unwrap_or(LogicalType::Any);
                LogicalType::List(Box::new(inner))
            }
            Value::Struct(fields) => LogicalType::Struct(
                fields
                    .iter()
                    .map(|(name, v)| (name.clone(), v.logical_type()))
                    .collect(),
            ),
            Value::Map(entries) => {
                let (key, value) = entries
                    .first()
                    .map(|(k, v)| (k.logical_type(), v.logical_type()))
                    .unwrap_or((LogicalType::Any, LogicalType::Any));
                LogicalType::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                }
            }
        }
    }

    /// Widen to i64 if this is an integer value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(v) => Some(*v as i64),
            Value::SmallInt(v) => Some(*v as i64),
            Value::Integer(v) => Some(*v as i64),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Widen to f64 if this is a numeric value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Null, _) | (_, Null) => None,
            (Boolean(a), Boolean(b)) => a.partial_cmp(b),
            (Varchar(a), Varchar(b)) => a.partial_cmp(b),
            (Blob(a), Blob(b)) => a.partial_cmp(b),
            (Date(a), Date(b)) => a.partial_cmp(b),
            (Time(a), Time(b)) => a.partial_cmp(b),
            (Timestamp(a), Timestamp(b)) => a.partial_cmp(b),
            (Uuid(a), Uuid(b)) => a.partial_cmp(b),
            (Decimal(a), Decimal(b)) => a.partial_cmp(b),
            (List(a), List(b)) => a.partial_cmp(b),
            (Struct(a), Struct(b)) => {
                for ((_, av), (_, bv)) in a.iter().zip(b.iter()) {
                    match av.partial_cmp(bv) {
                        Some(Ordering::Equal) => continue,
                        other => return other,
                    }
                }
                a.len().partial_cmp(&b.len())
            }
            (Map(a), Map(b)) => {
                for ((ak, av), (bk, bv)) in a.iter().zip(b.iter()) {
                    match ak.partial_cmp(bk) {
                        Some(Ordering::Equal) => {}
                        other => return other,
                    }
                    match av.partial_cmp(bv) {
                        Some(Ordering::Equal) => {}
                        other => return other,
                    }
                }
                a.len().partial_cmp(&b.len())
            }
            (Interval(a), Interval(b)) => {
                (a.months, a.days, a.micros).partial_cmp(&(b.months, b.days, b.micros))
            }
            // numeric comparisons widen to f64 when either side is floating
            _ => match (self.as_i64(), other.as_i64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => match (self.as_f64(), other.as_f64()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => None,
                },
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::TinyInt(v) => write!(f, "{}", v),
            Value::SmallInt(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Varchar(v) => write!(f, "{}", v),
            Value::Blob(v) => write!(f, "\\x{}", v.iter().map(|b| format!("{:02x}", b)).collect::<String>()),
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v),
            Value::Interval(v) => {
                write!(f, "{} months {} days {} micros", v.months, v.days, v.micros)
            }
            Value::Uuid(v) => write!(f, "{}", v),
            Value::List(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Struct(fields) => {
                write!(f, "{{")?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, v)?;
                }
                write!(f, "}}")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}
