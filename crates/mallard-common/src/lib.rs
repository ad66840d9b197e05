//! Mallard Common - Core types shared across the execution runtime
//!
//! This crate provides the foundational types used throughout Mallard:
//! - `LogicalType`: the column type system
//! - `Value`: runtime value representation
//! - `Error`: unified error type

pub mod error;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use types::LogicalType;
pub use value::Value;
