//! Operation descriptors
//!
//! A stubbed call is described by a closed set of operation kinds built
//! through ordinary constructors on [`Call`], instead of being recovered
//! from the call site.

use crate::{Expectation, RowShape, SetupError, Value};
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;

/// Execution semantics of a data-access call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    /// Returns rows through a cursor
    RowQuery,
    /// Returns a single value
    Scalar,
    /// Returns an affected-row count
    NonQuery,
}

/// Mapper surface methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapperMethod {
    Query,
    QueryFirst,
    QueryFirstOrDefault,
    QuerySingle,
    QuerySingleOrDefault,
    ExecuteScalar,
    Execute,
    QueryMultiple,
    ExecuteReader,
    QueryAsync,
    QueryFirstAsync,
    QueryFirstOrDefaultAsync,
    QuerySingleAsync,
    QuerySingleOrDefaultAsync,
    ExecuteScalarAsync,
    ExecuteAsync,
    QueryMultipleAsync,
    ExecuteReaderAsync,
}

impl MapperMethod {
    /// Execution shape, or `None` for methods without stub support.
    pub fn shape(self) -> Option<Shape> {
        use MapperMethod::*;
        match self {
            Query | QueryFirst | QueryFirstOrDefault | QuerySingle | QuerySingleOrDefault
            | QueryAsync | QueryFirstAsync | QueryFirstOrDefaultAsync | QuerySingleAsync
            | QuerySingleOrDefaultAsync => Some(Shape::RowQuery),
            ExecuteScalar | ExecuteScalarAsync => Some(Shape::Scalar),
            Execute | ExecuteAsync => Some(Shape::NonQuery),
            QueryMultiple | ExecuteReader | QueryMultipleAsync | ExecuteReaderAsync => None,
        }
    }

    pub fn is_async(self) -> bool {
        use MapperMethod::*;
        matches!(
            self,
            QueryAsync
                | QueryFirstAsync
                | QueryFirstOrDefaultAsync
                | QuerySingleAsync
                | QuerySingleOrDefaultAsync
                | ExecuteScalarAsync
                | ExecuteAsync
                | QueryMultipleAsync
                | ExecuteReaderAsync
        )
    }

    /// Whether the caller consumes a collection or a single element.
    pub fn expectation(self) -> Expectation {
        use MapperMethod::*;
        match self {
            Query | QueryAsync => Expectation::Collection,
            _ => Expectation::Single,
        }
    }

    pub fn name(self) -> &'static str {
        use MapperMethod::*;
        match self {
            Query => "query",
            QueryFirst => "query_first",
            QueryFirstOrDefault => "query_first_or_default",
            QuerySingle => "query_single",
            QuerySingleOrDefault => "query_single_or_default",
            ExecuteScalar => "execute_scalar",
            Execute => "execute",
            QueryMultiple => "query_multiple",
            ExecuteReader => "execute_reader",
            QueryAsync => "query_async",
            QueryFirstAsync => "query_first_async",
            QueryFirstOrDefaultAsync => "query_first_or_default_async",
            QuerySingleAsync => "query_single_async",
            QuerySingleOrDefaultAsync => "query_single_or_default_async",
            ExecuteScalarAsync => "execute_scalar_async",
            ExecuteAsync => "execute_async",
            QueryMultipleAsync => "query_multiple_async",
            ExecuteReaderAsync => "execute_reader_async",
        }
    }
}

impl fmt::Display for MapperMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Connection members that are not mapper calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMethod {
    Open,
    Close,
    BeginTransaction,
    CreateCommand,
    ChangeDatabase,
}

impl fmt::Display for ConnectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionMethod::Open => "open",
            ConnectionMethod::Close => "close",
            ConnectionMethod::BeginTransaction => "begin_transaction",
            ConnectionMethod::CreateCommand => "create_command",
            ConnectionMethod::ChangeDatabase => "change_database",
        };
        f.write_str(name)
    }
}

/// What a [`Call`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallTarget {
    Mapper(MapperMethod),
    Connection(ConnectionMethod),
    /// A property read rather than a call
    Property(&'static str),
}

/// The element or value type an operation is declared for.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TargetType {
    #[serde(skip)]
    id: TypeId,
    name: &'static str,
}

impl TargetType {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TargetType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TargetType {}

impl std::hash::Hash for TargetType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Identity of a stubbable operation: mapper method plus target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OperationId {
    pub method: MapperMethod,
    pub target: TargetType,
}

impl OperationId {
    pub fn of<T: 'static>(method: MapperMethod) -> Self {
        Self {
            method,
            target: TargetType::of::<T>(),
        }
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.method, self.target.name)
    }
}

/// Descriptor of the call a test wants to stub.
///
/// `T` is the element type for row queries, the value type for scalar
/// calls, and the produced value for non-query calls.
pub struct Call<T> {
    target: CallTarget,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Call<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Call<T> {}

impl<T> fmt::Debug for Call<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("target", &self.target)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Call<T> {
    fn new(target: CallTarget) -> Self {
        Self {
            target,
            _marker: PhantomData,
        }
    }

    pub fn mapper(method: MapperMethod) -> Self {
        Self::new(CallTarget::Mapper(method))
    }

    pub fn query() -> Self {
        Self::mapper(MapperMethod::Query)
    }

    pub fn query_first() -> Self {
        Self::mapper(MapperMethod::QueryFirst)
    }

    pub fn query_first_or_default() -> Self {
        Self::mapper(MapperMethod::QueryFirstOrDefault)
    }

    pub fn query_single() -> Self {
        Self::mapper(MapperMethod::QuerySingle)
    }

    pub fn query_single_or_default() -> Self {
        Self::mapper(MapperMethod::QuerySingleOrDefault)
    }

    pub fn execute_scalar() -> Self {
        Self::mapper(MapperMethod::ExecuteScalar)
    }

    pub fn query_async() -> Self {
        Self::mapper(MapperMethod::QueryAsync)
    }

    pub fn query_first_async() -> Self {
        Self::mapper(MapperMethod::QueryFirstAsync)
    }

    pub fn query_first_or_default_async() -> Self {
        Self::mapper(MapperMethod::QueryFirstOrDefaultAsync)
    }

    pub fn query_single_async() -> Self {
        Self::mapper(MapperMethod::QuerySingleAsync)
    }

    pub fn query_single_or_default_async() -> Self {
        Self::mapper(MapperMethod::QuerySingleOrDefaultAsync)
    }

    pub fn execute_scalar_async() -> Self {
        Self::mapper(MapperMethod::ExecuteScalarAsync)
    }

    pub fn query_multiple() -> Self {
        Self::mapper(MapperMethod::QueryMultiple)
    }

    pub fn execute_reader() -> Self {
        Self::mapper(MapperMethod::ExecuteReader)
    }

    pub fn connection(method: ConnectionMethod) -> Self {
        Self::new(CallTarget::Connection(method))
    }

    pub fn property(name: &'static str) -> Self {
        Self::new(CallTarget::Property(name))
    }

    pub fn target(&self) -> CallTarget {
        self.target
    }
}

impl Call<i64> {
    pub fn execute() -> Self {
        Self::mapper(MapperMethod::Execute)
    }

    pub fn execute_async() -> Self {
        Self::mapper(MapperMethod::ExecuteAsync)
    }
}

impl<T: RowShape> Call<T> {
    /// Resolve the call to an operation identity and its shape.
    pub fn resolve(&self) -> Result<(OperationId, Shape), SetupError> {
        match self.target {
            CallTarget::Mapper(method) => match method.shape() {
                Some(shape) => Ok((OperationId::of::<T>(method), shape)),
                None => Err(SetupError::UnsupportedOperation { method }),
            },
            CallTarget::Connection(method) => Err(SetupError::NotRecognizedCall {
                description: format!("connection.{}", method),
            }),
            CallTarget::Property(name) => Err(SetupError::NotRecognizedCall {
                description: format!("property {}", name),
            }),
        }
    }
}

/// A named command parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: Value,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl crate::Scalar) -> Self {
        Self {
            name: name.into(),
            value: value.to_value(),
        }
    }
}

/// Record of one stubbed invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invocation {
    pub operation: OperationId,
    pub command_text: String,
    pub parameters: Vec<Param>,
}

// =============================================================================
// TESTS
// =============================================================================
