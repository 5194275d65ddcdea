//! Schema inference
//!
//! Decides whether a target type is scalar-like (one column) or composite
//! (one column per eligible member) and derives the column names and
//! declared types. Composite types describe their members through the
//! [`Record`] trait, usually via the [`record!`](crate::record) macro;
//! members whose type is not scalar-like are dropped from the schema.

use crate::{ColumnMatching, ConversionError, CursorError, SqlType, StubConfig, Value};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use uuid::Uuid;

// ============================================================================
// SCHEMA TYPES
// ============================================================================

/// Declared type of a column plus its nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnType {
    pub sql_type: SqlType,
    pub nullable: bool,
}

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, column: ColumnType) -> Self {
        Self {
            name: name.into(),
            sql_type: column.sql_type,
            nullable: column.nullable,
        }
    }
}

/// Ordered column definitions with unique names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableSchema {
    columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Build a schema, rejecting duplicate column names.
    pub fn new(columns: Vec<ColumnSchema>) -> Result<Self, CursorError> {
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(CursorError::DuplicateColumn {
                    name: column.name.clone(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Inferred schemas take their names from distinct struct fields or
    /// tuple positions, so uniqueness holds by construction.
    fn inferred(columns: Vec<ColumnSchema>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&ColumnSchema> {
        self.columns.get(index)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Resolve a column name to its ordinal.
    pub fn position(&self, name: &str, matching: ColumnMatching) -> Option<usize> {
        let exact = self.columns.iter().position(|c| c.name == name);
        match (exact, matching) {
            (Some(index), _) => Some(index),
            (None, ColumnMatching::Exact) => None,
            (None, ColumnMatching::IgnoreCase) => self
                .columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(name)),
        }
    }
}

// ============================================================================
// SCALAR-LIKE TYPES
// ============================================================================

/// A type representable as a single column.
///
/// Implemented for booleans, integer kinds up to 128 bits, floating kinds,
/// `Decimal`, `String`, `char`, `Vec<u8>`, chrono date/time types, time
/// spans, `Uuid`,
/// enumerations declared with [`sql_enum!`](crate::sql_enum), and `Option`
/// of any of these.
pub trait Scalar: Default + Sized {
    fn sql_type() -> SqlType;

    fn nullable() -> bool {
        false
    }

    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Result<Self, ConversionError>;
}

fn mismatch<T>(value: &Value) -> ConversionError {
    ConversionError::TypeMismatch {
        expected: std::any::type_name::<T>().to_string(),
        found: value.kind().to_string(),
    }
}

fn integral<T: TryFrom<i128>>(value: &Value) -> Result<T, ConversionError> {
    let wide = value.integer().ok_or_else(|| mismatch::<T>(value))?;
    T::try_from(wide).map_err(|_| ConversionError::OutOfRange {
        target: std::any::type_name::<T>().to_string(),
        value: wide.to_string(),
    })
}

macro_rules! impl_scalar_int {
    ($($t:ty => $sql:ident, $variant:ident);* $(;)?) => {
        $(
            impl Scalar for $t {
                fn sql_type() -> SqlType {
                    SqlType::$sql
                }

                fn to_value(&self) -> Value {
                    Value::$variant((*self).into())
                }

                fn from_value(value: &Value) -> Result<Self, ConversionError> {
                    integral::<$t>(value)
                }
            }
        )*
    };
}

impl_scalar_int! {
    i8 => I8, Int;
    i16 => I16, Int;
    i32 => I32, Int;
    i64 => I64, Int;
    u8 => U8, Int;
    u16 => U16, Int;
    u32 => U32, Int;
    u64 => U64, UInt;
    i128 => I128, BigInt;
}

impl Scalar for u128 {
    fn sql_type() -> SqlType {
        SqlType::U128
    }

    fn to_value(&self) -> Value {
        Value::BigUInt(*self)
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::BigUInt(v) => Ok(*v),
            other => integral::<u128>(other),
        }
    }
}

impl Scalar for char {
    fn sql_type() -> SqlType {
        SqlType::Text
    }

    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        let Value::Text(s) = value else {
            return Err(mismatch::<char>(value));
        };
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ConversionError::OutOfRange {
                target: "char".to_string(),
                value: format!("{:?}", s),
            }),
        }
    }
}

impl Scalar for bool {
    fn sql_type() -> SqlType {
        SqlType::Bool
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => match other.integer() {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(mismatch::<bool>(other)),
            },
        }
    }
}

impl Scalar for f64 {
    fn sql_type() -> SqlType {
        SqlType::F64
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            Value::UInt(u) => Ok(*u as f64),
            Value::Decimal(d) => d.to_f64().ok_or_else(|| mismatch::<f64>(value)),
            other => Err(mismatch::<f64>(other)),
        }
    }
}

impl Scalar for f32 {
    fn sql_type() -> SqlType {
        SqlType::F32
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        f64::from_value(value)
            .map(|f| f as f32)
            .map_err(|_| mismatch::<f32>(value))
    }
}

impl Scalar for Decimal {
    fn sql_type() -> SqlType {
        SqlType::Decimal
    }

    fn to_value(&self) -> Value {
        Value::Decimal(*self)
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Decimal(d) => Ok(*d),
            Value::Int(i) => Ok(Decimal::from(*i)),
            Value::UInt(u) => Ok(Decimal::from(*u)),
            Value::Float(f) => Decimal::from_f64(*f).ok_or_else(|| ConversionError::OutOfRange {
                target: "Decimal".to_string(),
                value: f.to_string(),
            }),
            other => Err(mismatch::<Decimal>(other)),
        }
    }
}

impl Scalar for String {
    fn sql_type() -> SqlType {
        SqlType::Text
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            other => Err(mismatch::<String>(other)),
        }
    }
}

impl Scalar for Vec<u8> {
    fn sql_type() -> SqlType {
        SqlType::Bytes
    }

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            other => Err(mismatch::<Vec<u8>>(other)),
        }
    }
}

impl Scalar for NaiveDateTime {
    fn sql_type() -> SqlType {
        SqlType::DateTime
    }

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::DateTimeOffset(dt) => Ok(dt.naive_utc()),
            other => Err(mismatch::<NaiveDateTime>(other)),
        }
    }
}

impl Scalar for DateTime<FixedOffset> {
    fn sql_type() -> SqlType {
        SqlType::DateTimeOffset
    }

    fn to_value(&self) -> Value {
        Value::DateTimeOffset(*self)
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::DateTimeOffset(dt) => Ok(*dt),
            Value::DateTime(dt) => Ok(dt.and_utc().fixed_offset()),
            other => Err(mismatch::<DateTime<FixedOffset>>(other)),
        }
    }
}

impl Scalar for DateTime<Utc> {
    fn sql_type() -> SqlType {
        SqlType::DateTimeOffset
    }

    fn to_value(&self) -> Value {
        Value::DateTimeOffset(self.fixed_offset())
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::DateTimeOffset(dt) => Ok(dt.with_timezone(&Utc)),
            Value::DateTime(dt) => Ok(dt.and_utc()),
            other => Err(mismatch::<DateTime<Utc>>(other)),
        }
    }
}

impl Scalar for chrono::Duration {
    fn sql_type() -> SqlType {
        SqlType::TimeSpan
    }

    fn to_value(&self) -> Value {
        // Spans past ~292 years saturate.
        let nanos = self.num_nanoseconds().unwrap_or(if *self < chrono::Duration::zero() {
            i64::MIN
        } else {
            i64::MAX
        });
        Value::TimeSpan(nanos)
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::TimeSpan(nanos) => Ok(chrono::Duration::nanoseconds(*nanos)),
            other => Err(mismatch::<chrono::Duration>(other)),
        }
    }
}

impl Scalar for std::time::Duration {
    fn sql_type() -> SqlType {
        SqlType::TimeSpan
    }

    fn to_value(&self) -> Value {
        Value::TimeSpan(i64::try_from(self.as_nanos()).unwrap_or(i64::MAX))
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::TimeSpan(nanos) => u64::try_from(*nanos)
                .map(std::time::Duration::from_nanos)
                .map_err(|_| ConversionError::OutOfRange {
                    target: "std::time::Duration".to_string(),
                    value: format!("{}ns", nanos),
                }),
            other => Err(mismatch::<std::time::Duration>(other)),
        }
    }
}

impl Scalar for Uuid {
    fn sql_type() -> SqlType {
        SqlType::Uuid
    }

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::Text(s) => Uuid::parse_str(s).map_err(|_| mismatch::<Uuid>(value)),
            other => Err(mismatch::<Uuid>(other)),
        }
    }
}

/// Nullable wrapper: same declared type as `T`, nullable column.
impl<T: Scalar> Scalar for Option<T> {
    fn sql_type() -> SqlType {
        T::sql_type()
    }

    fn nullable() -> bool {
        true
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

// ============================================================================
// MEMBERS
// ============================================================================

/// A member type of a composite record.
///
/// `column_type` returns `None` for types that cannot become a column
/// (nested records, collections, maps); such members are excluded from the
/// schema and left at their default when rows are mapped back.
pub trait Field: Sized {
    fn column_type() -> Option<ColumnType>;

    fn to_cell(&self) -> Value;

    fn from_cell(cell: &Value) -> Result<Self, ConversionError>;
}

/// Implements `Field` for scalar-like types by delegating to [`Scalar`].
#[doc(hidden)]
#[macro_export]
macro_rules! impl_scalar_field {
    ($($t:ty),* $(,)?) => {
        $(
            impl $crate::Field for $t {
                fn column_type() -> ::std::option::Option<$crate::ColumnType> {
                    ::std::option::Option::Some($crate::ColumnType {
                        sql_type: <$t as $crate::Scalar>::sql_type(),
                        nullable: <$t as $crate::Scalar>::nullable(),
                    })
                }

                fn to_cell(&self) -> $crate::Value {
                    <$t as $crate::Scalar>::to_value(self)
                }

                fn from_cell(cell: &$crate::Value) -> ::std::result::Result<Self, $crate::ConversionError> {
                    <$t as $crate::Scalar>::from_value(cell)
                }
            }
        )*
    };
}

impl_scalar_field!(
    bool,
    i8,
    i16,
    i32,
    i64,
    i128,
    u8,
    u16,
    u32,
    u64,
    u128,
    f32,
    f64,
    Decimal,
    String,
    char,
    Vec<u8>,
    NaiveDateTime,
    DateTime<FixedOffset>,
    DateTime<Utc>,
    chrono::Duration,
    std::time::Duration,
    Uuid,
);

/// Nullable member: same column as `T`, marked nullable. A record inside
/// the option stays ineligible.
impl<T: Field> Field for Option<T> {
    fn column_type() -> Option<ColumnType> {
        T::column_type().map(|column| ColumnType {
            nullable: true,
            ..column
        })
    }

    fn to_cell(&self) -> Value {
        match self {
            Some(v) => v.to_cell(),
            None => Value::Null,
        }
    }

    fn from_cell(cell: &Value) -> Result<Self, ConversionError> {
        match cell {
            Value::Null => Ok(None),
            other => T::from_cell(other).map(Some),
        }
    }
}

impl<T: Field> Field for Box<T> {
    fn column_type() -> Option<ColumnType> {
        T::column_type()
    }

    fn to_cell(&self) -> Value {
        self.as_ref().to_cell()
    }

    fn from_cell(cell: &Value) -> Result<Self, ConversionError> {
        T::from_cell(cell).map(Box::new)
    }
}

/// A type that may be the item of a collection member.
///
/// Collections of these never become columns. `u8` is left out because
/// `Vec<u8>` is the byte-sequence column kind.
pub trait CollectionItem {}

macro_rules! impl_collection_item {
    ($($t:ty),* $(,)?) => {
        $(impl CollectionItem for $t {})*
    };
}

impl_collection_item!(
    bool,
    i8,
    i16,
    i32,
    i64,
    i128,
    u16,
    u32,
    u64,
    u128,
    f32,
    f64,
    Decimal,
    String,
    char,
    NaiveDateTime,
    DateTime<FixedOffset>,
    DateTime<Utc>,
    chrono::Duration,
    std::time::Duration,
    Uuid,
);

impl<T> CollectionItem for Option<T> {}
impl<T> CollectionItem for Box<T> {}
impl<T> CollectionItem for Vec<T> {}

macro_rules! impl_ineligible_field {
    ($(impl<$($g:ident $(: $bound:path)?),*> for $t:ty;)*) => {
        $(
            impl<$($g $(: $bound)?),*> Field for $t {
                fn column_type() -> Option<ColumnType> {
                    None
                }

                fn to_cell(&self) -> Value {
                    Value::Null
                }

                fn from_cell(_cell: &Value) -> Result<Self, ConversionError> {
                    Ok(Self::default())
                }
            }
        )*
    };
}

impl_ineligible_field! {
    impl<T: CollectionItem> for Vec<T>;
    impl<K, V, S: Default> for HashMap<K, V, S>;
    impl<K, V> for BTreeMap<K, V>;
    impl<T, S: Default> for HashSet<T, S>;
    impl<T> for BTreeSet<T>;
}

/// Descriptor for one readable member of a record.
pub struct Member<R> {
    pub name: &'static str,
    pub column: Option<ColumnType>,
    pub read: fn(&R) -> Value,
    pub write: fn(&mut R, &Value) -> Result<(), ConversionError>,
}

impl<R> Member<R> {
    pub fn new(
        name: &'static str,
        column: Option<ColumnType>,
        read: fn(&R) -> Value,
        write: fn(&mut R, &Value) -> Result<(), ConversionError>,
    ) -> Self {
        Self {
            name,
            column,
            read,
            write,
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.column.is_some()
    }
}

impl<R> Clone for Member<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            column: self.column,
            read: self.read,
            write: self.write,
        }
    }
}

impl<R> std::fmt::Debug for Member<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("column", &self.column)
            .finish()
    }
}

/// A composite type: an ordered list of named readable members.
///
/// Member order must be the declaration order and identical on every call.
pub trait Record: Default + Sized + 'static {
    fn members() -> Vec<Member<Self>>;
}

// ============================================================================
// ROW SHAPE
// ============================================================================

/// Single-column layout of a scalar-like element type.
pub struct ScalarLayout<T> {
    pub column: ColumnType,
    pub read: fn(&T) -> Value,
    pub write: fn(&Value) -> Result<T, ConversionError>,
}

impl<T> Clone for ScalarLayout<T> {
    fn clone(&self) -> Self {
        Self {
            column: self.column,
            read: self.read,
            write: self.write,
        }
    }
}

/// How an element type maps onto a row.
pub enum RowLayout<T> {
    Scalar(ScalarLayout<T>),
    Composite(Vec<Member<T>>),
}

impl<T> Clone for RowLayout<T> {
    fn clone(&self) -> Self {
        match self {
            RowLayout::Scalar(s) => RowLayout::Scalar(s.clone()),
            RowLayout::Composite(m) => RowLayout::Composite(m.clone()),
        }
    }
}

impl<T: Scalar> RowLayout<T> {
    pub fn scalar() -> Self {
        RowLayout::Scalar(ScalarLayout {
            column: ColumnType {
                sql_type: T::sql_type(),
                nullable: T::nullable(),
            },
            read: T::to_value,
            write: T::from_value,
        })
    }
}

impl<T: Record> RowLayout<T> {
    pub fn composite() -> Self {
        RowLayout::Composite(T::members())
    }
}

/// An element type that can travel through a cursor.
///
/// `Default` supplies the value for null elements and unmatched columns.
pub trait RowShape: Default + Sized + 'static {
    fn layout() -> RowLayout<Self>;
}

macro_rules! impl_scalar_row_shape {
    ($($t:ty),* $(,)?) => {
        $(
            impl RowShape for $t {
                fn layout() -> RowLayout<Self> {
                    RowLayout::scalar()
                }
            }
        )*
    };
}

impl_scalar_row_shape!(
    bool,
    i8,
    i16,
    i32,
    i64,
    i128,
    u8,
    u16,
    u32,
    u64,
    u128,
    f32,
    f64,
    Decimal,
    String,
    char,
    Vec<u8>,
    NaiveDateTime,
    DateTime<FixedOffset>,
    DateTime<Utc>,
    chrono::Duration,
    std::time::Duration,
    Uuid,
);

impl<T: Scalar + 'static> RowShape for Option<T> {
    fn layout() -> RowLayout<Self> {
        RowLayout::scalar()
    }
}

macro_rules! impl_tuple_record {
    ($(($($ty:ident . $idx:tt => $label:literal),+))+) => {
        $(
            impl<$($ty: Field + Default + 'static),+> Record for ($($ty,)+) {
                fn members() -> Vec<Member<Self>> {
                    vec![
                        $(
                            Member::new(
                                $label,
                                <$ty as Field>::column_type(),
                                |tuple: &Self| tuple.$idx.to_cell(),
                                |tuple: &mut Self, cell: &Value| {
                                    tuple.$idx = <$ty as Field>::from_cell(cell)?;
                                    Ok(())
                                },
                            )
                        ),+
                    ]
                }
            }

            impl<$($ty: Field + Default + 'static),+> RowShape for ($($ty,)+) {
                fn layout() -> RowLayout<Self> {
                    RowLayout::composite()
                }
            }

            impl<$($ty: Field + Default),+> Field for ($($ty,)+) {
                fn column_type() -> Option<ColumnType> {
                    None
                }

                fn to_cell(&self) -> Value {
                    Value::Null
                }

                fn from_cell(_cell: &Value) -> Result<Self, ConversionError> {
                    Ok(Self::default())
                }
            }

            impl<$($ty),+> CollectionItem for ($($ty,)+) {}
        )+
    };
}

impl_tuple_record! {
    (A.0 => "Item1")
    (A.0 => "Item1", B.1 => "Item2")
    (A.0 => "Item1", B.1 => "Item2", C.2 => "Item3")
    (A.0 => "Item1", B.1 => "Item2", C.2 => "Item3", D.3 => "Item4")
    (A.0 => "Item1", B.1 => "Item2", C.2 => "Item3", D.3 => "Item4", E.4 => "Item5")
    (A.0 => "Item1", B.1 => "Item2", C.2 => "Item3", D.3 => "Item4", E.4 => "Item5", F.5 => "Item6")
    (A.0 => "Item1", B.1 => "Item2", C.2 => "Item3", D.3 => "Item4", E.4 => "Item5", F.5 => "Item6", G.6 => "Item7")
}

// ============================================================================
// PROJECTION
// ============================================================================

/// Inferred schema for `T` together with the accessors that fill it.
///
/// Built once per stub registration; composite layouts keep only the
/// eligible members, in column order.
pub struct Projection<T> {
    schema: TableSchema,
    layout: RowLayout<T>,
}

impl<T> Clone for Projection<T> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            layout: self.layout.clone(),
        }
    }
}

impl<T: RowShape> Projection<T> {
    pub fn infer(config: &StubConfig) -> Self {
        match T::layout() {
            RowLayout::Scalar(scalar) => Self {
                schema: TableSchema::inferred(vec![ColumnSchema::new(
                    config.scalar_column_name.clone(),
                    scalar.column,
                )]),
                layout: RowLayout::Scalar(scalar),
            },
            RowLayout::Composite(members) => {
                let total = members.len();
                let eligible: Vec<Member<T>> =
                    members.into_iter().filter(Member::is_eligible).collect();
                if eligible.len() < total {
                    tracing::trace!(
                        target_type = std::any::type_name::<T>(),
                        excluded = total - eligible.len(),
                        "Excluded members that cannot become columns"
                    );
                }
                let columns = eligible
                    .iter()
                    .filter_map(|m| m.column.map(|c| ColumnSchema::new(m.name, c)))
                    .collect();
                Self {
                    schema: TableSchema::inferred(columns),
                    layout: RowLayout::Composite(eligible),
                }
            }
        }
    }
}

impl<T> Projection<T> {
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn layout(&self) -> &RowLayout<T> {
        &self.layout
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.layout, RowLayout::Scalar(_))
    }

    /// Cells for one element, in column order. `None` yields an all-null row.
    pub fn cells(&self, element: Option<&T>) -> Vec<Value> {
        match (&self.layout, element) {
            (_, None) => vec![Value::Null; self.schema.len()],
            (RowLayout::Scalar(scalar), Some(e)) => vec![(scalar.read)(e)],
            (RowLayout::Composite(members), Some(e)) => {
                members.iter().map(|m| (m.read)(e)).collect()
            }
        }
    }
}

/// Infer the table schema for `T` with the default configuration.
pub fn infer<T: RowShape>() -> TableSchema {
    infer_with::<T>(&StubConfig::default())
}

/// Infer the table schema for `T`.
pub fn infer_with<T: RowShape>(config: &StubConfig) -> TableSchema {
    Projection::<T>::infer(config).schema
}

// ============================================================================
// MACROS
// ============================================================================

/// Declare a struct whose members are described for schema inference.
///
/// The struct must implement `Default`; members that cannot become a
/// column are left at their default when rows are mapped back.
///
/// ```
/// use stubql_core::{infer, record};
///
/// record! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Account {
///         pub id: i32,
///         pub owner: String,
///         pub closed_at: Option<chrono::NaiveDateTime>,
///     }
/// }
///
/// let schema = infer::<Account>();
/// assert_eq!(schema.names().collect::<Vec<_>>(), vec!["id", "owner", "closed_at"]);
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::Record for $name {
            fn members() -> ::std::vec::Vec<$crate::Member<Self>> {
                ::std::vec![
                    $(
                        $crate::Member::new(
                            ::std::stringify!($field),
                            <$ty as $crate::Field>::column_type(),
                            |record: &Self| <$ty as $crate::Field>::to_cell(&record.$field),
                            |record: &mut Self, cell: &$crate::Value| {
                                record.$field = <$ty as $crate::Field>::from_cell(cell)?;
                                ::std::result::Result::Ok(())
                            },
                        )
                    ),*
                ]
            }
        }

        impl $crate::Field for $name {
            fn column_type() -> ::std::option::Option<$crate::ColumnType> {
                ::std::option::Option::None
            }

            fn to_cell(&self) -> $crate::Value {
                $crate::Value::Null
            }

            fn from_cell(_cell: &$crate::Value) -> ::std::result::Result<Self, $crate::ConversionError> {
                ::std::result::Result::Ok(<Self as ::std::default::Default>::default())
            }
        }

        impl $crate::CollectionItem for $name {}

        impl $crate::RowShape for $name {
            fn layout() -> $crate::RowLayout<Self> {
                $crate::RowLayout::composite()
            }
        }
    };
}

/// Declare an enumeration usable as a scalar column.
///
/// Every variant needs an explicit discriminant; cells hold the
/// discriminant, and variant names are accepted when reading back. The
/// first variant is the default.
#[macro_export]
macro_rules! sql_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $first:ident = $first_disc:literal
            $(, $variant:ident = $disc:literal)* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $first = $first_disc,
            $($variant = $disc,)*
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                $name::$first
            }
        }

        impl $crate::Scalar for $name {
            fn sql_type() -> $crate::SqlType {
                $crate::SqlType::Enum
            }

            fn to_value(&self) -> $crate::Value {
                match self {
                    $name::$first => $crate::Value::Int($first_disc),
                    $($name::$variant => $crate::Value::Int($disc),)*
                }
            }

            fn from_value(value: &$crate::Value) -> ::std::result::Result<Self, $crate::ConversionError> {
                if let $crate::Value::Text(label) = value {
                    if label == ::std::stringify!($first) {
                        return ::std::result::Result::Ok($name::$first);
                    }
                    $(
                        if label == ::std::stringify!($variant) {
                            return ::std::result::Result::Ok($name::$variant);
                        }
                    )*
                }
                let discriminant = value.integer();
                if discriminant == ::std::option::Option::Some($first_disc as i128) {
                    return ::std::result::Result::Ok($name::$first);
                }
                $(
                    if discriminant == ::std::option::Option::Some($disc as i128) {
                        return ::std::result::Result::Ok($name::$variant);
                    }
                )*
                ::std::result::Result::Err($crate::ConversionError::TypeMismatch {
                    expected: ::std::stringify!($name).to_string(),
                    found: value.to_string(),
                })
            }
        }

        $crate::impl_scalar_field!($name);

        impl $crate::CollectionItem for $name {}

        impl $crate::RowShape for $name {
            fn layout() -> $crate::RowLayout<Self> {
                $crate::RowLayout::scalar()
            }
        }
    };
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Inner {
            label: String,
        }
    }

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Outer {
            id: i32,
            inner: Inner,
            children: Vec<Inner>,
            tags: Vec<String>,
            blob: Vec<u8>,
            maybe: Option<i64>,
        }
    }

    crate::sql_enum! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum Color {
            Red = 1,
            Green = 2,
            Blue = 4,
        }
    }

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Mixed {
            maybe_inner: Option<Inner>,
            boxed_inner: Box<Inner>,
            boxed_id: Box<i32>,
            letter: char,
            big: i128,
            huge: Option<u128>,
            prices: Vec<Decimal>,
            stamps: Vec<NaiveDateTime>,
            small: Vec<i8>,
            gaps: Vec<Option<i32>>,
            colors: Vec<Color>,
            lookup: std::collections::HashMap<String, i32>,
            ordered: std::collections::BTreeSet<u8>,
            pair: (i32, String),
            color: Option<Color>,
        }
    }

    #[test]
    fn test_scalar_schema_single_column() {
        let schema = infer::<i32>();
        assert_eq!(schema.len(), 1);
        let column = schema.column(0).unwrap();
        assert_eq!(column.name, "Column1");
        assert_eq!(column.sql_type, SqlType::I32);
        assert!(!column.nullable);
    }

    #[test]
    fn test_nullable_scalar_unwraps() {
        let schema = infer::<Option<NaiveDateTime>>();
        let column = schema.column(0).unwrap();
        assert_eq!(column.sql_type, SqlType::DateTime);
        assert!(column.nullable);
    }

    #[test]
    fn test_scalar_column_name_from_config() {
        let config = StubConfig {
            scalar_column_name: "value".to_string(),
            ..StubConfig::default()
        };
        let schema = infer_with::<String>(&config);
        assert_eq!(schema.column(0).unwrap().name, "value");
    }

    #[test]
    fn test_composite_excludes_ineligible_members() {
        let schema = infer::<Outer>();
        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, vec!["id", "blob", "maybe"]);
        assert_eq!(schema.column(1).unwrap().sql_type, SqlType::Bytes);
        assert!(schema.column(2).unwrap().nullable);
    }

    #[test]
    fn test_non_scalar_members_silently_excluded() {
        let schema = infer::<Mixed>();
        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, vec!["boxed_id", "letter", "big", "huge", "color"]);
        assert_eq!(schema.column(0).unwrap().sql_type, SqlType::I32);
        assert_eq!(schema.column(1).unwrap().sql_type, SqlType::Text);
        assert_eq!(schema.column(2).unwrap().sql_type, SqlType::I128);
        assert_eq!(schema.column(3).unwrap().sql_type, SqlType::U128);
        assert!(schema.column(3).unwrap().nullable);
        assert_eq!(schema.column(4).unwrap().sql_type, SqlType::Enum);
        assert!(schema.column(4).unwrap().nullable);
    }

    #[test]
    fn test_excluded_members_left_at_default() {
        let projection = Projection::<Mixed>::infer(&StubConfig::default());
        let element = Mixed {
            maybe_inner: Some(Inner {
                label: "x".to_string(),
            }),
            boxed_id: Box::new(3),
            letter: 'z',
            big: i128::MIN,
            huge: Some(u128::MAX),
            gaps: vec![None, Some(1)],
            color: Some(Color::Blue),
            ..Mixed::default()
        };
        assert_eq!(
            projection.cells(Some(&element)),
            vec![
                Value::Int(3),
                Value::Text("z".to_string()),
                Value::BigInt(i128::MIN),
                Value::BigUInt(u128::MAX),
                Value::Int(4),
            ]
        );

        let RowLayout::Composite(members) = projection.layout() else {
            panic!("Mixed should be composite");
        };
        let mut rebuilt = Mixed::default();
        for (member, cell) in members.iter().zip(projection.cells(Some(&element))) {
            (member.write)(&mut rebuilt, &cell).unwrap();
        }
        assert_eq!(rebuilt.boxed_id, Box::new(3));
        assert_eq!(rebuilt.letter, 'z');
        assert_eq!(rebuilt.big, i128::MIN);
        assert_eq!(rebuilt.huge, Some(u128::MAX));
        assert_eq!(rebuilt.color, Some(Color::Blue));
        assert!(rebuilt.maybe_inner.is_none());
        assert!(rebuilt.gaps.is_empty());
    }

    #[test]
    fn test_char_conversion() {
        assert_eq!(char::from_value(&Value::Text("q".to_string())).unwrap(), 'q');
        assert!(matches!(
            char::from_value(&Value::Text("qq".to_string())).unwrap_err(),
            ConversionError::OutOfRange { .. }
        ));
        assert!(char::from_value(&Value::Int(1)).is_err());
    }

    #[test]
    fn test_wide_integer_conversion() {
        assert_eq!(i128::from_value(&Value::Int(-7)).unwrap(), -7);
        assert_eq!(u128::from_value(&Value::UInt(9)).unwrap(), 9);
        assert_eq!(u128::from_value(&Value::BigUInt(u128::MAX)).unwrap(), u128::MAX);
        assert!(matches!(
            u128::from_value(&Value::BigInt(-1)).unwrap_err(),
            ConversionError::OutOfRange { .. }
        ));
        assert!(matches!(
            i64::from_value(&Value::BigInt(i128::MAX)).unwrap_err(),
            ConversionError::OutOfRange { .. }
        ));
    }

    #[test]
    fn test_single_and_seven_tuples() {
        let one = infer::<(String,)>();
        assert_eq!(one.names().collect::<Vec<_>>(), vec!["Item1"]);

        let seven = infer::<(i8, i16, i32, i64, String, bool, Option<Uuid>)>();
        assert_eq!(
            seven.names().collect::<Vec<_>>(),
            vec!["Item1", "Item2", "Item3", "Item4", "Item5", "Item6", "Item7"]
        );
        assert!(seven.column(6).unwrap().nullable);
    }

    #[test]
    fn test_tuple_columns_positional() {
        let schema = infer::<(i32, String, Option<Uuid>)>();
        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, vec!["Item1", "Item2", "Item3"]);
        assert_eq!(schema.column(2).unwrap().sql_type, SqlType::Uuid);
        assert!(schema.column(2).unwrap().nullable);
    }

    #[test]
    fn test_enum_is_scalar_like() {
        let schema = infer::<Color>();
        assert_eq!(schema.column(0).unwrap().sql_type, SqlType::Enum);
        assert_eq!(Color::Blue.to_value(), Value::Int(4));
        assert_eq!(Color::from_value(&Value::Int(2)).unwrap(), Color::Green);
        assert_eq!(
            Color::from_value(&Value::Text("Red".to_string())).unwrap(),
            Color::Red
        );
        assert!(Color::from_value(&Value::Int(3)).is_err());
        assert_eq!(Color::default(), Color::Red);
    }

    #[test]
    fn test_projection_cells_for_null_element() {
        let projection = Projection::<Outer>::infer(&StubConfig::default());
        assert_eq!(projection.cells(None), vec![Value::Null; 3]);
    }

    #[test]
    fn test_projection_cells_in_column_order() {
        let projection = Projection::<Outer>::infer(&StubConfig::default());
        let element = Outer {
            id: 9,
            blob: vec![1, 2],
            maybe: None,
            ..Outer::default()
        };
        assert_eq!(
            projection.cells(Some(&element)),
            vec![Value::Int(9), Value::Bytes(vec![1, 2]), Value::Null]
        );
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let column = ColumnType {
            sql_type: SqlType::I32,
            nullable: false,
        };
        let err = TableSchema::new(vec![
            ColumnSchema::new("Id", column),
            ColumnSchema::new("Id", column),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            CursorError::DuplicateColumn {
                name: "Id".to_string()
            }
        );
    }

    #[test]
    fn test_position_matching_modes() {
        let schema = infer::<Outer>();
        assert_eq!(schema.position("blob", ColumnMatching::Exact), Some(1));
        assert_eq!(schema.position("BLOB", ColumnMatching::Exact), None);
        assert_eq!(schema.position("BLOB", ColumnMatching::IgnoreCase), Some(1));
    }

    #[test]
    fn test_integer_out_of_range() {
        let err = i8::from_value(&Value::Int(300)).unwrap_err();
        assert!(matches!(err, ConversionError::OutOfRange { .. }));
        assert_eq!(u64::from_value(&Value::UInt(u64::MAX)).unwrap(), u64::MAX);
    }

    #[test]
    fn test_datetime_conversions() {
        let naive = NaiveDate::from_ymd_opt(2000, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let utc = DateTime::<Utc>::from_value(&naive.to_value()).unwrap();
        assert_eq!(utc.naive_utc(), naive);
        assert_eq!(NaiveDateTime::from_value(&utc.to_value()).unwrap(), naive);
    }

    #[test]
    fn test_std_duration_rejects_negative_span() {
        assert!(std::time::Duration::from_value(&Value::TimeSpan(-5)).is_err());
        let span = chrono::Duration::milliseconds(-1500);
        assert_eq!(chrono::Duration::from_value(&span.to_value()).unwrap(), span);
    }

    #[test]
    fn test_option_from_null() {
        assert_eq!(Option::<i32>::from_value(&Value::Null).unwrap(), None);
        assert!(i32::from_value(&Value::Null).is_err());
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    crate::record! {
        #[derive(Debug, Clone, Default)]
        struct Wide {
            a: bool,
            b: i16,
            c: Option<u32>,
            d: f64,
            e: String,
            f: Vec<u8>,
            g: Uuid,
            h: Option<Decimal>,
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Inference is deterministic across repeated calls
        #[test]
        fn prop_schema_determinism(column in "[A-Za-z][A-Za-z0-9_]{0,12}") {
            let config = StubConfig {
                scalar_column_name: column,
                ..StubConfig::default()
            };
            prop_assert_eq!(infer_with::<Wide>(&config), infer_with::<Wide>(&config));
            prop_assert_eq!(infer_with::<i64>(&config), infer_with::<i64>(&config));
            prop_assert_eq!(
                infer_with::<(u8, Option<String>)>(&config),
                infer_with::<(u8, Option<String>)>(&config)
            );
        }

        /// Scalar values survive value conversion
        #[test]
        fn prop_scalar_value_roundtrip(
            i in any::<i32>(),
            u in any::<u64>(),
            s in ".*",
            bytes in proptest::collection::vec(any::<u8>(), 0..32),
        ) {
            prop_assert_eq!(i32::from_value(&i.to_value()).unwrap(), i);
            prop_assert_eq!(u64::from_value(&u.to_value()).unwrap(), u);
            prop_assert_eq!(String::from_value(&s.to_value()).unwrap(), s);
            prop_assert_eq!(Vec::<u8>::from_value(&bytes.to_value()).unwrap(), bytes);
        }
    }
}
