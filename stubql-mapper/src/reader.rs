//! Cursor-to-element reconstruction

use stubql_core::{ColumnMatching, Cursor, Member, RowLayout, RowShape, StubResult, Value};

/// Read every remaining row of `cursor` into `T`.
///
/// Composite members are matched to columns by name; a member with no
/// matching column, or whose cell is null, keeps its default. A null
/// scalar cell yields `T::default()`.
pub fn read_rows<T: RowShape>(mut cursor: Cursor, matching: ColumnMatching) -> StubResult<Vec<T>> {
    let layout = T::layout();
    let bound = match &layout {
        RowLayout::Scalar(_) => Vec::new(),
        RowLayout::Composite(members) => bind_members(&cursor, members, matching),
    };

    let mut out = Vec::with_capacity(cursor.row_count());
    while cursor.advance() {
        let element = match &layout {
            RowLayout::Scalar(scalar) => {
                let cell = cursor.cell(0)?;
                if cell.is_null() {
                    T::default()
                } else {
                    (scalar.write)(cell)?
                }
            }
            RowLayout::Composite(_) => {
                let mut element = T::default();
                for (member, ordinal) in &bound {
                    let cell: &Value = cursor.cell(*ordinal)?;
                    if !cell.is_null() {
                        (member.write)(&mut element, cell)?;
                    }
                }
                element
            }
        };
        out.push(element);
    }

    tracing::trace!(
        target_type = std::any::type_name::<T>(),
        rows = out.len(),
        "Mapped cursor rows"
    );

    Ok(out)
}

fn bind_members<'a, T>(
    cursor: &Cursor,
    members: &'a [Member<T>],
    matching: ColumnMatching,
) -> Vec<(&'a Member<T>, usize)> {
    members
        .iter()
        .filter(|m| m.is_eligible())
        .filter_map(|m| cursor.ordinal(m.name, matching).ok().map(|i| (m, i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stubql_core::{
        infer, record, ColumnSchema, ColumnType, ConversionError, Row, SqlType, StubError,
        TableSchema,
    };

    record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Person {
            id: i32,
            name: String,
            nickname: Option<String>,
        }
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_read_scalar_rows() {
        let rows = vec![Row::new(vec![Value::Int(1)]), Row::new(vec![Value::Int(2)])];
        let cursor = Cursor::build(infer::<i32>(), rows).unwrap();
        let values: Vec<i32> = read_rows(cursor, ColumnMatching::Exact).unwrap();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_null_scalar_is_default() {
        let cursor = Cursor::build(infer::<i32>(), vec![Row::new(vec![Value::Null])]).unwrap();
        let values: Vec<i32> = read_rows(cursor, ColumnMatching::Exact).unwrap();
        assert_eq!(values, vec![0]);
    }

    #[test]
    fn test_read_composite_by_name() {
        let rows = vec![Row::new(vec![Value::Int(3), text("ann"), Value::Null])];
        let cursor = Cursor::build(infer::<Person>(), rows).unwrap();
        let people: Vec<Person> = read_rows(cursor, ColumnMatching::Exact).unwrap();
        assert_eq!(
            people,
            vec![Person {
                id: 3,
                name: "ann".to_string(),
                nickname: None,
            }]
        );
    }

    #[test]
    fn test_columns_matched_ignoring_case_and_order() {
        let column = |sql_type| ColumnType {
            sql_type,
            nullable: true,
        };
        let schema = TableSchema::new(vec![
            ColumnSchema::new("NAME", column(SqlType::Text)),
            ColumnSchema::new("Id", column(SqlType::I32)),
        ])
        .unwrap();
        let cursor = Cursor::build(schema.clone(), vec![Row::new(vec![text("bo"), Value::Int(8)])])
            .unwrap();
        let people: Vec<Person> = read_rows(cursor, ColumnMatching::IgnoreCase).unwrap();
        assert_eq!(people[0].id, 8);
        assert_eq!(people[0].name, "bo");

        let cursor = Cursor::build(schema, vec![Row::new(vec![text("bo"), Value::Int(8)])]).unwrap();
        let people: Vec<Person> = read_rows(cursor, ColumnMatching::Exact).unwrap();
        assert_eq!(people[0], Person::default());
    }

    #[test]
    fn test_conversion_failure_propagates() {
        let schema = TableSchema::new(vec![ColumnSchema::new(
            "id",
            ColumnType {
                sql_type: SqlType::I64,
                nullable: false,
            },
        )])
        .unwrap();
        let cursor = Cursor::build(schema, vec![Row::new(vec![Value::Int(i64::MAX)])]).unwrap();
        let err = read_rows::<Person>(cursor, ColumnMatching::Exact).unwrap_err();
        assert!(matches!(
            err,
            StubError::Conversion(ConversionError::OutOfRange { .. })
        ));
    }
}
