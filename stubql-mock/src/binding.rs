//! Operation bindings
//!
//! A binding ties one operation identity to its deferred result and to the
//! projection inferred for the element type at registration.

use crate::deferred::{Callback, Slot};
use std::sync::Arc;
use stubql_core::{
    materialize, Cursor, Expectation, OperationId, Projection, RowShape, Shape, StubConfig,
    StubResult, StubValue, Value,
};

/// Type-erased view of a binding, as the command sees it.
pub(crate) trait Binding: Send + Sync {
    fn shape(&self) -> Shape;

    fn read_rows(&self) -> StubResult<Cursor>;

    fn read_scalar(&self) -> StubResult<Value>;

    fn read_count(&self) -> StubResult<i64>;

    /// Release the deferred result.
    fn clear(&self);
}

pub(crate) struct TypedBinding<T> {
    operation: OperationId,
    shape: Shape,
    expectation: Expectation,
    projection: Projection<T>,
    slot: Arc<Slot<T>>,
}

impl<T: RowShape> TypedBinding<T> {
    pub(crate) fn new(
        operation: OperationId,
        shape: Shape,
        config: &StubConfig,
        slot: Arc<Slot<T>>,
    ) -> Self {
        Self {
            operation,
            shape,
            expectation: operation.method.expectation(),
            projection: Projection::infer(config),
            slot,
        }
    }

    /// Pull the value, derive the result from it, then fire the callback.
    fn with_value<R>(&self, f: impl FnOnce(&StubValue<T>) -> StubResult<R>) -> StubResult<R> {
        let (value, callback) = self.slot.pull()?;
        let result = f(&value);
        fire(callback);
        result
    }

    /// First cell of the first element, or `Null`.
    fn first_cell(&self, value: &StubValue<T>) -> Value {
        value
            .first()
            .and_then(|element| self.projection.cells(Some(element)).into_iter().next())
            .unwrap_or(Value::Null)
    }
}

fn fire(callback: Option<Callback>) {
    if let Some(callback) = callback {
        callback();
    }
}

impl<T: RowShape> Binding for TypedBinding<T> {
    fn shape(&self) -> Shape {
        self.shape
    }

    fn read_rows(&self) -> StubResult<Cursor> {
        self.with_value(|value| {
            let rows = materialize(value, &self.projection, self.expectation);
            let cursor = Cursor::build(self.projection.schema().clone(), rows)?;
            tracing::debug!(
                operation = %self.operation,
                rows = cursor.row_count(),
                columns = cursor.field_count(),
                "Served stubbed rows"
            );
            Ok(cursor)
        })
    }

    fn read_scalar(&self) -> StubResult<Value> {
        self.with_value(|value| {
            let cell = self.first_cell(value);
            tracing::debug!(operation = %self.operation, value = %cell, "Served stubbed scalar");
            Ok(cell)
        })
    }

    fn read_count(&self) -> StubResult<i64> {
        self.with_value(|value| {
            let count = self.first_cell(value).to_count()?;
            tracing::debug!(operation = %self.operation, count, "Served stubbed count");
            Ok(count)
        })
    }

    fn clear(&self) {
        self.slot.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::Setup;
    use stubql_core::{MapperMethod, StubError};

    fn binding<T: RowShape>(method: MapperMethod) -> (TypedBinding<T>, Setup<T>) {
        let operation = OperationId::of::<T>(method);
        let slot = Arc::new(Slot::new());
        let shape = method.shape().unwrap();
        (
            TypedBinding::new(operation, shape, &StubConfig::default(), Arc::clone(&slot)),
            Setup::new(operation, slot),
        )
    }

    #[test]
    fn test_rows_rebuilt_per_read() {
        let (binding, setup) = binding::<i32>(MapperMethod::Query);
        setup.returns(vec![1, 2, 3]);
        let mut first = binding.read_rows().unwrap();
        while first.advance() {}
        let second = binding.read_rows().unwrap();
        assert_eq!(second.row_count(), 3);
        assert_eq!(setup.invocation_count(), 2);
    }

    #[test]
    fn test_unconfigured_single_read_is_null_row() {
        let (binding, _setup) = binding::<String>(MapperMethod::QueryFirstOrDefault);
        let cursor = binding.read_rows().unwrap();
        assert_eq!(cursor.row_count(), 1);
        assert!(cursor.rows()[0].cells()[0].is_null());
    }

    #[test]
    fn test_scalar_reads_first_cell() {
        let (binding, setup) = binding::<i32>(MapperMethod::ExecuteScalar);
        setup.returns(77);
        assert_eq!(binding.read_scalar().unwrap(), Value::Int(77));
    }

    #[test]
    fn test_count_coercion() {
        let (int_binding, int_setup) = binding::<i64>(MapperMethod::Execute);
        int_setup.returns(4i64);
        assert_eq!(int_binding.read_count().unwrap(), 4);

        let (text_binding, text_setup) = binding::<String>(MapperMethod::Execute);
        text_setup.returns(" 12 ");
        assert_eq!(text_binding.read_count().unwrap(), 12);
        text_setup.returns("many");
        assert!(matches!(
            text_binding.read_count().unwrap_err(),
            StubError::Conversion(_)
        ));
    }
}
