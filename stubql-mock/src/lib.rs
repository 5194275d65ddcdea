//! STUBQL Mock - Stubbed Database Connection
//!
//! A fake [`Connection`](stubql_core::Connection) whose mapper calls are
//! answered from registered stubs:
//! - `setup_dapper` classifies a call and binds a deferred result to it
//! - row queries are materialized into a fresh cursor on every invocation
//! - scalar and non-query calls return the produced value directly
//! - every stubbed invocation is logged on the connection
//!
//! ```
//! use stubql_core::Call;
//! use stubql_mapper::SqlMapperExt;
//! use stubql_mock::MockConnection;
//!
//! let conn = MockConnection::new();
//! conn.setup_dapper(Call::<i32>::query())?.returns(vec![7, 77, 777]);
//!
//! let values: Vec<i32> = conn.query("select n from t", &[])?;
//! assert_eq!(values, vec![7, 77, 777]);
//! # Ok::<(), stubql_core::StubError>(())
//! ```

mod binding;
mod command;
mod connection;
mod deferred;

pub use command::MockCommand;
pub use connection::MockConnection;
pub use deferred::{DeferredResult, Setup};
