//! Error types for stubbed data-access operations

use crate::{MapperMethod, Shape, SqlType};
use thiserror::Error;

/// Registration errors. Raised by `setup_dapper`, never deferred to
/// invocation time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("Unsupported operation: {method} has no row-query, scalar or non-query shape")]
    UnsupportedOperation { method: MapperMethod },

    #[error("Not a recognized call: {description} is not a mapper method")]
    NotRecognizedCall { description: String },
}

/// Value coercion errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Value out of range for {target}: {value}")]
    OutOfRange { target: String, value: String },

    #[error("Column {column} declared as {declared} cannot hold {found}")]
    ColumnType {
        column: String,
        declared: SqlType,
        found: String,
    },
}

/// Cursor access errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("No current row: advance the cursor first")]
    NoCurrentRow,

    #[error("Column index {index} out of range for {count} columns")]
    ColumnOutOfRange { index: usize, count: usize },

    #[error("Unknown column: {name}")]
    UnknownColumn { name: String },

    #[error("Row {row} has {got} cells, schema has {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("Duplicate column name: {name}")]
    DuplicateColumn { name: String },
}

/// Errors raised while a stubbed command is being invoked.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvocationError {
    #[error("No setup registered for {operation}")]
    NotConfigured { operation: String },

    #[error("Operation {operation} is a {actual:?} setup, invoked as {expected:?}")]
    ShapeMismatch {
        operation: String,
        expected: Shape,
        actual: Shape,
    },

    #[error("Stub state lock poisoned")]
    LockPoisoned,
}

/// Result-shape errors raised by the mapper.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MapperError {
    #[error("Sequence contains no elements")]
    NoRows,

    #[error("Sequence contains more than one element ({count} rows)")]
    MultipleRows { count: usize },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all stubql errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StubError {
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Cursor error: {0}")]
    Cursor(#[from] CursorError),

    #[error("Invocation error: {0}")]
    Invocation(#[from] InvocationError),

    #[error("Mapper error: {0}")]
    Mapper(#[from] MapperError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for stubql operations.
pub type StubResult<T> = Result<T, StubError>;

// =============================================================================
// TESTS
// =============================================================================
