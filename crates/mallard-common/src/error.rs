//! Error types for Mallard

use thiserror::Error;

/// The main error type for Mallard operations.
///
/// The enum is `Clone` so that a pipeline-global error slot can hand the
/// same root cause to every sibling executor; I/O errors are carried as
/// their display string for that reason.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The client interrupt flag was observed at an operator boundary.
    #[error("Query interrupted")]
    Interrupted,

    /// An object was used after teardown, or an operator violated its
    /// contract (e.g. finalize called twice on the same executor).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A chunk or vector was initialized over a type that cannot be
    /// materialized.
    #[error("Invalid type: {0}")]
    InvalidType(String),

    /// An operator raised during Execute/Sink/GetData.
    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Result type alias using Mallard's Error
pub type Result<T> = std::result::Result<T, Error>;
