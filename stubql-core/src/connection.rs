//! Connection and command traits
//!
//! The surface a mapper drives. Real drivers and the test double implement
//! the same traits, so the mapper cannot tell them apart.

use crate::{ColumnMatching, Cursor, OperationId, Param, StubResult, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Closed,
    Open,
    Broken,
}

/// Cooperative cancellation flag handed to async command methods.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A command created from a connection.
///
/// Each `execute_*` call carries the identity of the mapper operation
/// being executed.
#[async_trait]
pub trait Command: Send {
    fn command_text(&self) -> &str;

    fn set_command_text(&mut self, text: &str);

    fn parameters(&self) -> &[Param];

    fn add_parameter(&mut self, param: Param);

    /// Create a blank parameter bound to nothing.
    fn create_parameter(&self) -> Param {
        Param {
            name: String::new(),
            value: Value::Null,
        }
    }

    fn execute_reader(&mut self, operation: &OperationId) -> StubResult<Cursor>;

    fn execute_scalar(&mut self, operation: &OperationId) -> StubResult<Value>;

    fn execute_non_query(&mut self, operation: &OperationId) -> StubResult<i64>;

    async fn execute_reader_async(
        &mut self,
        operation: &OperationId,
        cancel: &CancelToken,
    ) -> StubResult<Cursor>;

    async fn execute_scalar_async(
        &mut self,
        operation: &OperationId,
        cancel: &CancelToken,
    ) -> StubResult<Value>;

    async fn execute_non_query_async(
        &mut self,
        operation: &OperationId,
        cancel: &CancelToken,
    ) -> StubResult<i64>;
}

/// A database connection.
pub trait Connection: Send + Sync {
    fn state(&self) -> ConnectionState;

    fn open(&self) -> StubResult<()>;

    fn close(&self) -> StubResult<()>;

    fn create_command(&self) -> StubResult<Box<dyn Command>>;

    /// How cursor columns are matched to member names when mapping rows.
    fn column_matching(&self) -> ColumnMatching {
        ColumnMatching::IgnoreCase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::none();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
