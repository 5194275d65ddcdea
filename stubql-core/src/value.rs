//! Cell values and declared column types

use crate::ConversionError;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// DECLARED TYPES
// ============================================================================

/// Declared value type of a column.
///
/// Closed set: anything that is not one of these kinds cannot become a
/// column and is either dropped (composite members) or carried as
/// `Unsupported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    I128,
    U128,
    F32,
    F64,
    Decimal,
    Text,
    Bytes,
    /// Calendar date and time without offset
    DateTime,
    /// Calendar date and time with a fixed UTC offset
    DateTimeOffset,
    /// Signed elapsed time
    TimeSpan,
    Uuid,
    /// Enumeration stored as its discriminant
    Enum,
    Unsupported,
}

impl SqlType {
    /// Whether this is one of the integer kinds.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            SqlType::I8
                | SqlType::I16
                | SqlType::I32
                | SqlType::I64
                | SqlType::U8
                | SqlType::U16
                | SqlType::U32
                | SqlType::U64
                | SqlType::I128
                | SqlType::U128
        )
    }

    /// Whether this is one of the floating kinds.
    pub fn is_floating(self) -> bool {
        matches!(self, SqlType::F32 | SqlType::F64)
    }

    /// Inclusive range an integer kind can hold.
    fn integer_range(self) -> Option<(i128, i128)> {
        let range = match self {
            SqlType::I8 => (i8::MIN as i128, i8::MAX as i128),
            SqlType::I16 => (i16::MIN as i128, i16::MAX as i128),
            SqlType::I32 => (i32::MIN as i128, i32::MAX as i128),
            SqlType::I64 | SqlType::Enum => (i64::MIN as i128, i64::MAX as i128),
            SqlType::U8 => (0, u8::MAX as i128),
            SqlType::U16 => (0, u16::MAX as i128),
            SqlType::U32 => (0, u32::MAX as i128),
            SqlType::U64 => (0, u64::MAX as i128),
            SqlType::I128 => (i128::MIN, i128::MAX),
            SqlType::U128 => (0, i128::MAX),
            _ => return None,
        };
        Some(range)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// CELL VALUES
// ============================================================================

/// A single cell.
///
/// `Null` is an explicit null marker. A cell that was never set does not
/// exist as a `Value`; cursors report it as an error instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    BigInt(i128),
    BigUInt(u128),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    /// Elapsed time in nanoseconds
    TimeSpan(i64),
    Uuid(Uuid),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the run-time kind, used in mismatch messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::BigInt(_) => "bigint",
            Value::BigUInt(_) => "biguint",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::DateTime(_) => "datetime",
            Value::DateTimeOffset(_) => "datetimeoffset",
            Value::TimeSpan(_) => "timespan",
            Value::Uuid(_) => "uuid",
        }
    }

    /// Integer content widened to `i128`, if the value is integral.
    pub fn integer(&self) -> Option<i128> {
        match self {
            Value::Int(v) => Some(i128::from(*v)),
            Value::UInt(v) => Some(i128::from(*v)),
            Value::BigInt(v) => Some(*v),
            Value::BigUInt(v) => i128::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Whether a cell holding this value may sit in a column declared as
    /// `sql_type`. Null conforms to every column.
    pub fn conforms_to(&self, sql_type: SqlType) -> bool {
        if self.is_null() || sql_type == SqlType::Unsupported {
            return true;
        }
        match sql_type {
            SqlType::Bool => matches!(self, Value::Bool(_)),
            SqlType::F32 | SqlType::F64 => matches!(self, Value::Float(_)),
            SqlType::Decimal => matches!(self, Value::Decimal(_)),
            SqlType::Text => matches!(self, Value::Text(_)),
            SqlType::Bytes => matches!(self, Value::Bytes(_)),
            SqlType::DateTime => matches!(self, Value::DateTime(_)),
            SqlType::DateTimeOffset => matches!(self, Value::DateTimeOffset(_)),
            SqlType::TimeSpan => matches!(self, Value::TimeSpan(_)),
            SqlType::Uuid => matches!(self, Value::Uuid(_)),
            SqlType::Enum if matches!(self, Value::Text(_)) => true,
            SqlType::U128 if matches!(self, Value::BigUInt(_)) => true,
            integral => match (self.integer(), integral.integer_range()) {
                (Some(v), Some((lo, hi))) => v >= lo && v <= hi,
                _ => false,
            },
        }
    }

    /// Coerce to an affected-row count.
    ///
    /// Accepts null (zero), booleans, integers, integral floats and decimals,
    /// and numeric text.
    pub fn to_count(&self) -> Result<i64, ConversionError> {
        let out_of_range = || ConversionError::OutOfRange {
            target: "count".to_string(),
            value: self.to_string(),
        };
        match self {
            Value::Null => Ok(0),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Int(v) => Ok(*v),
            Value::UInt(v) => i64::try_from(*v).map_err(|_| out_of_range()),
            Value::BigInt(v) => i64::try_from(*v).map_err(|_| out_of_range()),
            Value::BigUInt(v) => i64::try_from(*v).map_err(|_| out_of_range()),
            Value::Float(v) => {
                let rounded = v.round_ties_even();
                if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded <= i64::MAX as f64 {
                    Ok(rounded as i64)
                } else {
                    Err(out_of_range())
                }
            }
            Value::Decimal(d) => d
                .round_dp(0)
                .to_i64()
                .ok_or_else(out_of_range),
            Value::Text(s) => s.trim().parse::<i64>().map_err(|_| ConversionError::TypeMismatch {
                expected: "count".to_string(),
                found: format!("text {:?}", s),
            }),
            other => Err(ConversionError::TypeMismatch {
                expected: "count".to_string(),
                found: other.kind().to_string(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::BigUInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{:?}", v),
            Value::Bytes(v) => write!(f, "0x{}", v.iter().map(|b| format!("{:02x}", b)).collect::<String>()),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::DateTimeOffset(v) => write!(f, "{}", v.to_rfc3339()),
            Value::TimeSpan(v) => write!(f, "{}ns", v),
            Value::Uuid(v) => write!(f, "{}", v),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
