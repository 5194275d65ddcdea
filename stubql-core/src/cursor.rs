//! In-memory tabular cursor
//!
//! Forward-only. A stubbed command builds a new cursor for every
//! invocation instead of rewinding an old one.

use crate::{ColumnMatching, ColumnSchema, ConversionError, CursorError, StubResult, TableSchema, Value};
use serde::{Deserialize, Serialize};

/// Ordered cells aligned 1:1 with a schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    cells: Vec<Value>,
}

impl Row {
    pub fn new(cells: Vec<Value>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Value] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn into_cells(self) -> Vec<Value> {
        self.cells
    }
}

/// Schema plus rows with a read position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cursor {
    schema: TableSchema,
    rows: Vec<Row>,
    #[serde(skip)]
    position: Option<usize>,
}

impl Cursor {
    /// Build a cursor, checking row widths and declared column types.
    pub fn build(schema: TableSchema, rows: Vec<Row>) -> StubResult<Self> {
        for (index, row) in rows.iter().enumerate() {
            if row.len() != schema.len() {
                return Err(CursorError::RowWidth {
                    row: index,
                    expected: schema.len(),
                    got: row.len(),
                }
                .into());
            }
            for (cell, column) in row.cells().iter().zip(schema.columns()) {
                if !cell.conforms_to(column.sql_type) {
                    return Err(ConversionError::ColumnType {
                        column: column.name.clone(),
                        declared: column.sql_type,
                        found: cell.kind().to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(Self {
            schema,
            rows,
            position: None,
        })
    }

    /// A cursor with columns and no rows.
    pub fn empty(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            position: None,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn field_count(&self) -> usize {
        self.schema.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, index: usize) -> StubResult<&ColumnSchema> {
        self.schema.column(index).ok_or_else(|| {
            CursorError::ColumnOutOfRange {
                index,
                count: self.schema.len(),
            }
            .into()
        })
    }

    /// Resolve a column name to its ordinal.
    pub fn ordinal(&self, name: &str, matching: ColumnMatching) -> StubResult<usize> {
        self.schema.position(name, matching).ok_or_else(|| {
            CursorError::UnknownColumn {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Move to the next row. Returns false once the rows are exhausted.
    pub fn advance(&mut self) -> bool {
        let next = self.position.map_or(0, |p| p.saturating_add(1));
        if next < self.rows.len() {
            self.position = Some(next);
            true
        } else {
            self.position = Some(self.rows.len());
            false
        }
    }

    pub fn current_row(&self) -> StubResult<&Row> {
        self.position
            .and_then(|p| self.rows.get(p))
            .ok_or_else(|| CursorError::NoCurrentRow.into())
    }

    /// Cell of the current row. An explicit null is `Ok(&Value::Null)`.
    pub fn cell(&self, index: usize) -> StubResult<&Value> {
        let row = self.current_row()?;
        row.cells().get(index).ok_or_else(|| {
            CursorError::ColumnOutOfRange {
                index,
                count: self.schema.len(),
            }
            .into()
        })
    }

    pub fn is_null(&self, index: usize) -> StubResult<bool> {
        self.cell(index).map(Value::is_null)
    }

    /// All rows regardless of position, for diagnostics.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "columns": self.schema.columns(),
            "rows": self.rows.iter().map(Row::cells).collect::<Vec<_>>(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
