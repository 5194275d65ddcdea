//! STUBQL Core - Value Model, Schema Inference and Cursors
//!
//! Everything a stubbed data-access call needs short of the fake itself:
//! - Cell values and declared column types
//! - Schema inference for scalar-like and composite element types
//! - Materialization of stub values into rows
//! - Forward-only in-memory cursors
//! - Operation descriptors and the connection/command traits

mod config;
mod connection;
mod cursor;
mod error;
mod materialize;
mod operation;
mod schema;
mod value;

pub use config::{ColumnMatching, StubConfig};
pub use connection::{CancelToken, Command, Connection, ConnectionState};
pub use cursor::{Cursor, Row};
pub use error::{
    ConfigError, ConversionError, CursorError, InvocationError, MapperError, SetupError,
    StubError, StubResult,
};
pub use materialize::{materialize, Expectation, StubValue};
pub use operation::{
    Call, CallTarget, ConnectionMethod, Invocation, MapperMethod, OperationId, Param, Shape,
    TargetType,
};
pub use schema::{
    infer, infer_with, CollectionItem, ColumnSchema, ColumnType, Field, Member, Projection, Record,
    RowLayout, RowShape, Scalar, ScalarLayout, TableSchema,
};
pub use value::{SqlType, Value};

/// Re-exported so `Decimal` columns need no extra dependency in tests.
pub use rust_decimal::Decimal;
