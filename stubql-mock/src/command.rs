//! Stubbed command

use crate::binding::Binding;
use crate::connection::Registry;
use async_trait::async_trait;
use std::sync::Arc;
use stubql_core::{
    CancelToken, Command, Cursor, Invocation, InvocationError, OperationId, Param, Shape,
    StubResult, Value,
};

/// Command created by [`MockConnection`](crate::MockConnection).
///
/// Parameters are accepted and recorded but never bound to anything.
pub struct MockCommand {
    registry: Arc<Registry>,
    text: String,
    parameters: Vec<Param>,
}

impl MockCommand {
    pub(crate) fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            text: String::new(),
            parameters: Vec::new(),
        }
    }

    /// Resolve the binding for `operation` and check it serves `expected`.
    fn binding(&self, operation: &OperationId, expected: Shape) -> StubResult<Arc<dyn Binding>> {
        let binding = self
            .registry
            .binding(operation)?
            .ok_or_else(|| InvocationError::NotConfigured {
                operation: operation.to_string(),
            })?;

        if binding.shape() != expected {
            return Err(InvocationError::ShapeMismatch {
                operation: operation.to_string(),
                expected,
                actual: binding.shape(),
            }
            .into());
        }

        self.registry.record(Invocation {
            operation: *operation,
            command_text: self.text.clone(),
            parameters: self.parameters.clone(),
        })?;

        Ok(binding)
    }
}

#[async_trait]
impl Command for MockCommand {
    fn command_text(&self) -> &str {
        &self.text
    }

    fn set_command_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn parameters(&self) -> &[Param] {
        &self.parameters
    }

    fn add_parameter(&mut self, param: Param) {
        self.parameters.push(param);
    }

    fn execute_reader(&mut self, operation: &OperationId) -> StubResult<Cursor> {
        self.binding(operation, Shape::RowQuery)?.read_rows()
    }

    fn execute_scalar(&mut self, operation: &OperationId) -> StubResult<Value> {
        self.binding(operation, Shape::Scalar)?.read_scalar()
    }

    fn execute_non_query(&mut self, operation: &OperationId) -> StubResult<i64> {
        self.binding(operation, Shape::NonQuery)?.read_count()
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
