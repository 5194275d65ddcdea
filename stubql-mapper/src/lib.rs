//! STUBQL Mapper - Generic Row Mapper
//!
//! Extension methods on any [`Connection`]: create a command, execute it,
//! and rebuild typed results from the cursor by column name. Works the same
//! against a real driver and against the test double.

mod reader;

pub use reader::read_rows;

use async_trait::async_trait;
use stubql_core::{
    CancelToken, Command, Connection, ConnectionState, MapperError, MapperMethod, OperationId,
    Param, RowShape, Scalar, StubResult,
};

// ============================================================================
// COMMAND PREPARATION
// ============================================================================

/// A prepared command plus whether the connection has to be closed again.
struct Prepared {
    command: Box<dyn Command>,
    opened: bool,
}

fn prepare<C: Connection + ?Sized>(conn: &C, sql: &str, params: &[Param]) -> StubResult<Prepared> {
    let opened = conn.state() == ConnectionState::Closed;
    if opened {
        conn.open()?;
    }
    let mut command = conn.create_command()?;
    command.set_command_text(sql);
    for param in params {
        command.add_parameter(param.clone());
    }
    Ok(Prepared { command, opened })
}

fn finish<C: Connection + ?Sized, R>(conn: &C, opened: bool, result: StubResult<R>) -> StubResult<R> {
    if opened {
        conn.close()?;
    }
    result
}

// ============================================================================
// RESULT SHAPING
// ============================================================================

fn first<T>(rows: Vec<T>) -> StubResult<T> {
    rows.into_iter().next().ok_or_else(|| MapperError::NoRows.into())
}

fn first_or_default<T: Default>(rows: Vec<T>) -> T {
    rows.into_iter().next().unwrap_or_default()
}

fn single<T>(rows: Vec<T>) -> StubResult<T> {
    match rows.len() {
        0 => Err(MapperError::NoRows.into()),
        1 => first(rows),
        count => Err(MapperError::MultipleRows { count }.into()),
    }
}

fn single_or_default<T: Default>(rows: Vec<T>) -> StubResult<T> {
    match rows.len() {
        0 => Ok(T::default()),
        1 => first(rows),
        count => Err(MapperError::MultipleRows { count }.into()),
    }
}

fn scalar<T: Scalar>(value: stubql_core::Value) -> StubResult<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(T::from_value(&value)?)
}

// ============================================================================
// SYNC AND ASYNC SURFACES
// ============================================================================

fn query_rows<C, T>(conn: &C, method: MapperMethod, sql: &str, params: &[Param]) -> StubResult<Vec<T>>
where
    C: Connection + ?Sized,
    T: RowShape,
{
    let operation = OperationId::of::<T>(method);
    tracing::debug!(%operation, sql, "Executing row query");
    let Prepared { mut command, opened } = prepare(conn, sql, params)?;
    let result = command
        .execute_reader(&operation)
        .and_then(|cursor| read_rows(cursor, conn.column_matching()));
    finish(conn, opened, result)
}

async fn query_rows_async<C, T>(
    conn: &C,
    method: MapperMethod,
    sql: &str,
    params: &[Param],
) -> StubResult<Vec<T>>
where
    C: Connection + ?Sized,
    T: RowShape,
{
    let operation = OperationId::of::<T>(method);
    tracing::debug!(%operation, sql, "Executing row query");
    let Prepared { mut command, opened } = prepare(conn, sql, params)?;
    let cancel = CancelToken::none();
    let result = match command.execute_reader_async(&operation, &cancel).await {
        Ok(cursor) => read_rows(cursor, conn.column_matching()),
        Err(e) => Err(e),
    };
    finish(conn, opened, result)
}

/// Mapper methods available on every [`Connection`].
#[async_trait]
pub trait SqlMapperExt: Connection {
    /// All rows mapped to `T`.
    fn query<T: RowShape>(&self, sql: &str, params: &[Param]) -> StubResult<Vec<T>> {
        query_rows(self, MapperMethod::Query, sql, params)
    }

    /// First row; fails when there are none.
    fn query_first<T: RowShape>(&self, sql: &str, params: &[Param]) -> StubResult<T> {
        first(query_rows(self, MapperMethod::QueryFirst, sql, params)?)
    }

    /// First row, or `T::default()` when there are none.
    fn query_first_or_default<T: RowShape>(&self, sql: &str, params: &[Param]) -> StubResult<T> {
        query_rows(self, MapperMethod::QueryFirstOrDefault, sql, params).map(first_or_default)
    }

    /// The only row; fails on zero or several rows.
    fn query_single<T: RowShape>(&self, sql: &str, params: &[Param]) -> StubResult<T> {
        single(query_rows(self, MapperMethod::QuerySingle, sql, params)?)
    }

    /// The only row, or `T::default()` when there are none; fails on several.
    fn query_single_or_default<T: RowShape>(&self, sql: &str, params: &[Param]) -> StubResult<T> {
        single_or_default(query_rows(self, MapperMethod::QuerySingleOrDefault, sql, params)?)
    }

    /// First column of the first row. Null maps to `T::default()`.
    fn execute_scalar<T: Scalar + 'static>(&self, sql: &str, params: &[Param]) -> StubResult<T> {
        let operation = OperationId::of::<T>(MapperMethod::ExecuteScalar);
        tracing::debug!(%operation, sql, "Executing scalar");
        let Prepared { mut command, opened } = prepare(self, sql, params)?;
        let result = command.execute_scalar(&operation).and_then(scalar);
        finish(self, opened, result)
    }

    /// Affected-row count.
    fn execute(&self, sql: &str, params: &[Param]) -> StubResult<i64> {
        let operation = OperationId::of::<i64>(MapperMethod::Execute);
        tracing::debug!(%operation, sql, "Executing non-query");
        let Prepared { mut command, opened } = prepare(self, sql, params)?;
        let result = command.execute_non_query(&operation);
        finish(self, opened, result)
    }

    async fn query_async<T: RowShape + Send>(
        &self,
        sql: &str,
        params: &[Param],
    ) -> StubResult<Vec<T>> {
        query_rows_async(self, MapperMethod::QueryAsync, sql, params).await
    }

    async fn query_first_async<T: RowShape + Send>(
        &self,
        sql: &str,
        params: &[Param],
    ) -> StubResult<T> {
        first(query_rows_async(self, MapperMethod::QueryFirstAsync, sql, params).await?)
    }

    async fn query_first_or_default_async<T: RowShape + Send>(
        &self,
        sql: &str,
        params: &[Param],
    ) -> StubResult<T> {
        query_rows_async(self, MapperMethod::QueryFirstOrDefaultAsync, sql, params)
            .await
            .map(first_or_default)
    }

    async fn query_single_async<T: RowShape + Send>(
        &self,
        sql: &str,
        params: &[Param],
    ) -> StubResult<T> {
        single(query_rows_async(self, MapperMethod::QuerySingleAsync, sql, params).await?)
    }

    async fn query_single_or_default_async<T: RowShape + Send>(
        &self,
        sql: &str,
        params: &[Param],
    ) -> StubResult<T> {
        single_or_default(
            query_rows_async(self, MapperMethod::QuerySingleOrDefaultAsync, sql, params).await?,
        )
    }

    async fn execute_scalar_async<T: Scalar + Send + 'static>(
        &self,
        sql: &str,
        params: &[Param],
    ) -> StubResult<T> {
        let operation = OperationId::of::<T>(MapperMethod::ExecuteScalarAsync);
        tracing::debug!(%operation, sql, "Executing scalar");
        let Prepared { mut command, opened } = prepare(self, sql, params)?;
        let cancel = CancelToken::none();
        let result = match command.execute_scalar_async(&operation, &cancel).await {
            Ok(value) => scalar(value),
            Err(e) => Err(e),
        };
        finish(self, opened, result)
    }

    async fn execute_async(&self, sql: &str, params: &[Param]) -> StubResult<i64> {
        let operation = OperationId::of::<i64>(MapperMethod::ExecuteAsync);
        tracing::debug!(%operation, sql, "Executing non-query");
        let Prepared { mut command, opened } = prepare(self, sql, params)?;
        let cancel = CancelToken::none();
        let result = command.execute_non_query_async(&operation, &cancel).await;
        finish(self, opened, result)
    }
}

impl<C: Connection + ?Sized> SqlMapperExt for C {}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use stubql_core::{infer, Cursor, Row, StubError, Value};

    /// Connection whose commands always return the same cursor and scalar.
    struct FixedConnection {
        state: Mutex<ConnectionState>,
        rows: Vec<i64>,
        scalar: Value,
        texts: Mutex<Vec<String>>,
    }

    impl FixedConnection {
        fn new(rows: Vec<i64>, scalar: Value) -> Self {
            Self {
                state: Mutex::new(ConnectionState::Closed),
                rows,
                scalar,
                texts: Mutex::new(Vec::new()),
            }
        }
    }

    struct FixedCommand {
        text: String,
        params: Vec<Param>,
        rows: Vec<i64>,
        scalar: Value,
    }

    #[async_trait]
    impl Command for FixedCommand {
        fn command_text(&self) -> &str {
            &self.text
        }

        fn set_command_text(&mut self, text: &str) {
            self.text = text.to_string();
        }

        fn parameters(&self) -> &[Param] {
            &self.params
        }

        fn add_parameter(&mut self, param: Param) {
            self.params.push(param);
        }

        fn execute_reader(&mut self, _operation: &OperationId) -> StubResult<Cursor> {
            let rows = self.rows.iter().map(|v| Row::new(vec![Value::Int(*v)])).collect();
            Cursor::build(infer::<i64>(), rows)
        }

        fn execute_scalar(&mut self, _operation: &OperationId) -> StubResult<Value> {
            Ok(self.scalar.clone())
        }

        fn execute_non_query(&mut self, _operation: &OperationId) -> StubResult<i64> {
            Ok(self.params.len() as i64)
        }

        async fn execute_reader_async(
            &mut self,
            operation: &OperationId,
            _cancel: &CancelToken,
        ) -> StubResult<Cursor> {
            self.execute_reader(operation)
        }

        async fn execute_scalar_async(
            &mut self,
            operation: &OperationId,
            _cancel: &CancelToken,
        ) -> StubResult<Value> {
            self.execute_scalar(operation)
        }

        async fn execute_non_query_async(
            &mut self,
            operation: &OperationId,
            _cancel: &CancelToken,
        ) -> StubResult<i64> {
            self.execute_non_query(operation)
        }
    }

    impl Connection for FixedConnection {
        fn state(&self) -> ConnectionState {
            *self.state.lock().unwrap()
        }

        fn open(&self) -> StubResult<()> {
            *self.state.lock().unwrap() = ConnectionState::Open;
            Ok(())
        }

        fn close(&self) -> StubResult<()> {
            *self.state.lock().unwrap() = ConnectionState::Closed;
            Ok(())
        }

        fn create_command(&self) -> StubResult<Box<dyn Command>> {
            self.texts.lock().unwrap().push(String::new());
            Ok(Box::new(FixedCommand {
                text: String::new(),
                params: Vec::new(),
                rows: self.rows.clone(),
                scalar: self.scalar.clone(),
            }))
        }
    }

    #[test]
    fn test_query_maps_all_rows() {
        let conn = FixedConnection::new(vec![4, 5, 6], Value::Null);
        let rows: Vec<i64> = conn.query("select n", &[]).unwrap();
        assert_eq!(rows, vec![4, 5, 6]);
    }

    #[test]
    fn test_closed_connection_is_reopened_and_closed() {
        let conn = FixedConnection::new(vec![1], Value::Null);
        let _: Vec<i64> = conn.query("select 1", &[]).unwrap();
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(conn.texts.lock().unwrap().len(), 1);

        conn.open().unwrap();
        let _: Vec<i64> = conn.query("select 1", &[]).unwrap();
        assert_eq!(conn.state(), ConnectionState::Open);
    }

    #[test]
    fn test_first_and_single_semantics() {
        let empty = FixedConnection::new(vec![], Value::Null);
        assert_eq!(
            empty.query_first::<i64>("", &[]).unwrap_err(),
            StubError::Mapper(MapperError::NoRows)
        );
        assert_eq!(empty.query_first_or_default::<i64>("", &[]).unwrap(), 0);
        assert_eq!(empty.query_single_or_default::<i64>("", &[]).unwrap(), 0);

        let many = FixedConnection::new(vec![9, 10], Value::Null);
        assert_eq!(many.query_first::<i64>("", &[]).unwrap(), 9);
        assert_eq!(
            many.query_single::<i64>("", &[]).unwrap_err(),
            StubError::Mapper(MapperError::MultipleRows { count: 2 })
        );
        assert!(many.query_single_or_default::<i64>("", &[]).is_err());
    }

    #[test]
    fn test_execute_scalar_null_is_default() {
        let conn = FixedConnection::new(vec![], Value::Null);
        assert_eq!(conn.execute_scalar::<i32>("", &[]).unwrap(), 0);

        let conn = FixedConnection::new(vec![], Value::Text("x".to_string()));
        assert_eq!(conn.execute_scalar::<String>("", &[]).unwrap(), "x");
        assert!(conn.execute_scalar::<i32>("", &[]).is_err());
    }

    #[test]
    fn test_execute_passes_parameters() {
        let conn = FixedConnection::new(vec![], Value::Null);
        let params = [Param::new("a", 1i32), Param::new("b", "two".to_string())];
        assert_eq!(conn.execute("update t", &params).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_async_forms() {
        let conn = FixedConnection::new(vec![2, 3], Value::Int(11));
        let rows: Vec<i64> = conn.query_async("", &[]).await.unwrap();
        assert_eq!(rows, vec![2, 3]);
        assert_eq!(conn.query_first_async::<i64>("", &[]).await.unwrap(), 2);
        assert_eq!(conn.execute_scalar_async::<i64>("", &[]).await.unwrap(), 11);
        assert_eq!(conn.execute_async("", &[]).await.unwrap(), 0);
    }
}
