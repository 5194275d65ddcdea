//! Row materialization
//!
//! Turns a produced result value into rows aligned with an inferred schema.

use crate::{Projection, Row};
use serde::{Deserialize, Serialize};

/// A stubbed result of arbitrary shape.
///
/// Strings are always a single element: `StubValue::<String>::from("hello")`
/// is one row, never one row per character.
#[derive(Debug, Clone, PartialEq)]
pub enum StubValue<T> {
    /// No result at all
    Null,
    /// A single, non-enumerable value
    Single(T),
    /// A sequence of elements; `None` entries are null elements
    Sequence(Vec<Option<T>>),
}

impl<T> Default for StubValue<T> {
    fn default() -> Self {
        StubValue::Null
    }
}

impl<T> StubValue<T> {
    pub fn single(value: T) -> Self {
        StubValue::Single(value)
    }

    pub fn sequence(values: impl IntoIterator<Item = T>) -> Self {
        StubValue::Sequence(values.into_iter().map(Some).collect())
    }

    /// A sequence that may contain null elements.
    pub fn nullable_sequence(values: impl IntoIterator<Item = Option<T>>) -> Self {
        StubValue::Sequence(values.into_iter().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StubValue::Null)
    }

    /// Normalize to an element sequence. `Null` is empty, a single value
    /// is a one-element sequence.
    pub fn elements(&self) -> Vec<Option<&T>> {
        match self {
            StubValue::Null => Vec::new(),
            StubValue::Single(value) => vec![Some(value)],
            StubValue::Sequence(values) => values.iter().map(Option::as_ref).collect(),
        }
    }

    /// First element, flattening null elements to `None`.
    pub fn first(&self) -> Option<&T> {
        match self {
            StubValue::Null => None,
            StubValue::Single(value) => Some(value),
            StubValue::Sequence(values) => values.first().and_then(Option::as_ref),
        }
    }
}

impl<T> From<T> for StubValue<T> {
    fn from(value: T) -> Self {
        StubValue::Single(value)
    }
}

impl<T> From<Vec<T>> for StubValue<T> {
    fn from(values: Vec<T>) -> Self {
        StubValue::sequence(values)
    }
}

impl<T, const N: usize> From<[T; N]> for StubValue<T> {
    fn from(values: [T; N]) -> Self {
        StubValue::sequence(values)
    }
}

impl<T: Clone> From<&[T]> for StubValue<T> {
    fn from(values: &[T]) -> Self {
        StubValue::sequence(values.iter().cloned())
    }
}

impl<T> From<Option<T>> for StubValue<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => StubValue::Single(v),
            None => StubValue::Null,
        }
    }
}

impl From<&str> for StubValue<String> {
    fn from(value: &str) -> Self {
        StubValue::Single(value.to_string())
    }
}

/// What the consuming call expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expectation {
    /// A collection of elements (`query`)
    Collection,
    /// A single element (`query_first`, `query_single`, ...)
    Single,
}

/// Project a stub value onto rows.
///
/// A `Null` value yields zero rows for a collection and one all-null row
/// for a single expectation. Null elements inside a sequence stay in place
/// as all-null rows.
pub fn materialize<T>(
    value: &StubValue<T>,
    projection: &Projection<T>,
    expectation: Expectation,
) -> Vec<Row> {
    let rows: Vec<Row> = match (value, expectation) {
        (StubValue::Null, Expectation::Single) => vec![Row::new(projection.cells(None))],
        _ => value
            .elements()
            .into_iter()
            .map(|element| Row::new(projection.cells(element)))
            .collect(),
    };

    tracing::trace!(
        target_type = std::any::type_name::<T>(),
        rows = rows.len(),
        columns = projection.schema().len(),
        ?expectation,
        "Materialized stub value"
    );

    rows
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StubConfig, Value};

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Pair {
            name: String,
            score: Option<i32>,
        }
    }

    fn projection<T: crate::RowShape>() -> Projection<T> {
        Projection::infer(&StubConfig::default())
    }

    #[test]
    fn test_string_is_one_element() {
        let value: StubValue<String> = "hello".into();
        let rows = materialize(&value, &projection::<String>(), Expectation::Collection);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cells(), &[Value::Text("hello".to_string())]);
    }

    #[test]
    fn test_sequence_one_row_per_element() {
        let value: StubValue<i32> = vec![7, 77, 777].into();
        let rows = materialize(&value, &projection::<i32>(), Expectation::Collection);
        let cells: Vec<&Value> = rows.iter().map(|r| &r.cells()[0]).collect();
        assert_eq!(cells, vec![&Value::Int(7), &Value::Int(77), &Value::Int(777)]);
    }

    #[test]
    fn test_single_value_wrapped() {
        let value = StubValue::single(5u8);
        let rows = materialize(&value, &projection::<u8>(), Expectation::Collection);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_null_collection_is_empty() {
        let value = StubValue::<Pair>::Null;
        let rows = materialize(&value, &projection::<Pair>(), Expectation::Collection);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_null_single_is_all_null_row() {
        let value = StubValue::<Pair>::Null;
        let rows = materialize(&value, &projection::<Pair>(), Expectation::Single);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].cells().iter().all(Value::is_null));
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn test_null_element_keeps_position() {
        let value = StubValue::nullable_sequence(vec![
            Some(Pair {
                name: "a".to_string(),
                score: Some(1),
            }),
            None,
            Some(Pair {
                name: "c".to_string(),
                score: None,
            }),
        ]);
        let rows = materialize(&value, &projection::<Pair>(), Expectation::Collection);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].cells(), &[Value::Null, Value::Null]);
        assert_eq!(
            rows[2].cells(),
            &[Value::Text("c".to_string()), Value::Null]
        );
    }

    #[test]
    fn test_materialize_is_repeatable() {
        let value: StubValue<Pair> = vec![Pair {
            name: "x".to_string(),
            score: Some(3),
        }]
        .into();
        let p = projection::<Pair>();
        assert_eq!(
            materialize(&value, &p, Expectation::Collection),
            materialize(&value, &p, Expectation::Collection)
        );
    }

    #[test]
    fn test_option_into_stub_value() {
        assert!(StubValue::<i32>::from(None).is_null());
        assert_eq!(StubValue::from(Some(3)).first(), Some(&3));
    }
}
