//! STUBQL Test Utilities
//!
//! Shared test infrastructure for the STUBQL workspace:
//! - Log initialisation for tests
//! - Proptest generators for cell values and fixture records
//! - Fixture record types mirroring typical data-access models
//! - Assertions for STUBQL error variants

pub use stubql_core::{
    record, sql_enum, Call, MapperError, SetupError, StubConfig, StubError, StubResult,
    StubValue, Value,
};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// LOGGING
// ============================================================================

/// Install a test-writer subscriber once per process.
///
/// Filter comes from `RUST_LOG`, defaulting to `stubql_mock=debug,warn`.
/// Later calls are no-ops.
pub fn init_test_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stubql_mock=debug,warn"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

// ============================================================================
// FIXTURE TYPES
// ============================================================================

pub mod fixtures {
    //! Record types and pre-built instances for common scenarios.

    use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
    use stubql_core::Decimal;
    use uuid::Uuid;

    stubql_core::sql_enum! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Status {
            Pending = 0,
            Active = 1,
            Archived = 2,
        }
    }

    stubql_core::record! {
        /// A record with one member of each commonly stubbed kind.
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct ComplexType {
            pub integer_property: i32,
            pub string_property: String,
            pub guid_property: Uuid,
            pub date_time_property: NaiveDateTime,
            pub nullable_date_time_property: Option<NaiveDateTime>,
            pub nullable_integer_property: Option<i32>,
            pub byte_array_property: Vec<u8>,
            pub status: Status,
        }
    }

    stubql_core::record! {
        /// A record whose nested members never become columns.
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct Order {
            pub id: i64,
            pub customer: String,
            pub shipping: ComplexType,
            pub lines: Vec<ComplexType>,
            pub tags: Vec<String>,
        }
    }

    stubql_core::record! {
        /// A record covering the numeric, time and wide integer column kinds.
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct Measurement {
            pub active: bool,
            pub ratio: f32,
            pub reading: f64,
            pub price: Decimal,
            pub elapsed: chrono::Duration,
            pub recorded_at: DateTime<FixedOffset>,
            pub synced_at: Option<DateTime<Utc>>,
            pub grade: char,
            pub big_counter: i128,
            pub huge_counter: u128,
        }
    }

    /// Midnight on the given date.
    pub fn date(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    }

    /// Three records, the last with every nullable member unset.
    pub fn complex_types() -> Vec<ComplexType> {
        vec![
            ComplexType {
                integer_property: 1,
                string_property: "String1".to_string(),
                guid_property: Uuid::from_u128(1),
                date_time_property: date(2000, 1, 1),
                nullable_date_time_property: None,
                nullable_integer_property: None,
                byte_array_property: vec![1, 2, 4, 8],
                status: Status::Active,
            },
            ComplexType {
                integer_property: 2,
                string_property: "String2".to_string(),
                guid_property: Uuid::from_u128(2),
                date_time_property: date(2000, 1, 2),
                nullable_date_time_property: Some(date(2000, 1, 3)),
                nullable_integer_property: Some(20),
                byte_array_property: vec![16, 32],
                status: Status::Archived,
            },
            ComplexType {
                integer_property: 3,
                string_property: String::new(),
                guid_property: Uuid::nil(),
                date_time_property: date(2000, 1, 4),
                nullable_date_time_property: None,
                nullable_integer_property: None,
                byte_array_property: Vec::new(),
                status: Status::Pending,
            },
        ]
    }

    /// Two measurements, the second with its optional member unset.
    pub fn measurements() -> Vec<Measurement> {
        vec![
            Measurement {
                active: true,
                ratio: 0.25,
                reading: -1234.5678,
                price: Decimal::new(199_99, 2),
                elapsed: chrono::Duration::milliseconds(90_500),
                recorded_at: FixedOffset::east_opt(2 * 3600)
                    .map(|offset| date(2021, 6, 30).and_utc().with_timezone(&offset))
                    .unwrap_or_default(),
                synced_at: Some(date(2021, 7, 1).and_utc()),
                grade: 'A',
                big_counter: i128::MIN,
                huge_counter: u128::MAX,
            },
            Measurement {
                active: false,
                ratio: -3.5,
                reading: 0.0,
                price: Decimal::new(-5, 1),
                elapsed: chrono::Duration::nanoseconds(-42),
                recorded_at: DateTime::default(),
                synced_at: None,
                grade: 'é',
                big_counter: 0,
                huge_counter: 1,
            },
        ]
    }

    /// An order whose nested members are populated.
    pub fn order() -> Order {
        Order {
            id: 42,
            customer: "ACME".to_string(),
            shipping: complex_types().remove(0),
            lines: complex_types(),
            tags: vec!["rush".to_string()],
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for cell values and fixture records.

    use super::fixtures::{ComplexType, Measurement, Status};
    use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
    use proptest::prelude::*;
    use stubql_core::Decimal;
    use uuid::Uuid;

    /// Generate a random UUID.
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Generate a timestamp between 2000 and 2030, second precision.
    pub fn arb_datetime() -> impl Strategy<Value = NaiveDateTime> {
        (946684800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0)
                .map(|dt| dt.naive_utc())
                .unwrap_or_default()
        })
    }

    /// Generate a Status variant.
    pub fn arb_status() -> impl Strategy<Value = Status> {
        prop_oneof![
            Just(Status::Pending),
            Just(Status::Active),
            Just(Status::Archived),
        ]
    }

    /// Generate a ComplexType with arbitrary nullable members.
    pub fn arb_complex_type() -> impl Strategy<Value = ComplexType> {
        (
            any::<i32>(),
            "[a-zA-Z0-9 ]{0,24}",
            arb_uuid(),
            arb_datetime(),
            proptest::option::of(arb_datetime()),
            proptest::option::of(any::<i32>()),
            prop::collection::vec(any::<u8>(), 0..32),
            arb_status(),
        )
            .prop_map(
                |(integer, string, guid, when, maybe_when, maybe_integer, bytes, status)| {
                    ComplexType {
                        integer_property: integer,
                        string_property: string,
                        guid_property: guid,
                        date_time_property: when,
                        nullable_date_time_property: maybe_when,
                        nullable_integer_property: maybe_integer,
                        byte_array_property: bytes,
                        status,
                    }
                },
            )
    }

    /// Generate a list of ComplexType records.
    pub fn arb_complex_types(max: usize) -> impl Strategy<Value = Vec<ComplexType>> {
        prop::collection::vec(arb_complex_type(), 0..max)
    }

    /// Generate a decimal with up to six fractional digits.
    pub fn arb_decimal() -> impl Strategy<Value = Decimal> {
        (any::<i64>(), 0u32..=6).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
    }

    /// Generate a timestamp between 2000 and 2030 at a whole-hour offset.
    pub fn arb_datetime_offset() -> impl Strategy<Value = DateTime<FixedOffset>> {
        (946684800i64..1893456000i64, -12i32..=14).prop_map(|(secs, hours)| {
            DateTime::from_timestamp(secs, 0)
                .zip(FixedOffset::east_opt(hours * 3600))
                .map(|(utc, offset)| utc.with_timezone(&offset))
                .unwrap_or_default()
        })
    }

    /// Generate a UTC timestamp between 2000 and 2030.
    pub fn arb_datetime_utc() -> impl Strategy<Value = DateTime<Utc>> {
        arb_datetime().prop_map(|naive| naive.and_utc())
    }

    /// Generate a signed span of up to about four months.
    pub fn arb_span() -> impl Strategy<Value = chrono::Duration> {
        (-10_000_000_000i64..10_000_000_000i64).prop_map(chrono::Duration::milliseconds)
    }

    /// Generate a Measurement with finite floating members.
    pub fn arb_measurement() -> impl Strategy<Value = Measurement> {
        (
            any::<bool>(),
            -1.0e6f32..1.0e6f32,
            -1.0e12f64..1.0e12f64,
            arb_decimal(),
            arb_span(),
            arb_datetime_offset(),
            proptest::option::of(arb_datetime_utc()),
            any::<char>(),
            any::<i128>(),
            any::<u128>(),
        )
            .prop_map(
                |(active, ratio, reading, price, elapsed, recorded_at, synced_at, grade, big, huge)| {
                    Measurement {
                        active,
                        ratio,
                        reading,
                        price,
                        elapsed,
                        recorded_at,
                        synced_at,
                        grade,
                        big_counter: big,
                        huge_counter: huge,
                    }
                },
            )
    }

    /// Generate a list of Measurement records.
    pub fn arb_measurements(max: usize) -> impl Strategy<Value = Vec<Measurement>> {
        prop::collection::vec(arb_measurement(), 0..max)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for STUBQL-specific error variants.

    use super::*;

    /// Assert that a result is a registration error.
    #[track_caller]
    pub fn assert_setup_error<T: std::fmt::Debug>(result: &StubResult<T>) {
        match result {
            Err(StubError::Setup(_)) => {}
            other => panic!("Expected Setup error, got: {:?}", other),
        }
    }

    /// Assert that a result is `UnsupportedOperation`.
    #[track_caller]
    pub fn assert_unsupported<T: std::fmt::Debug>(result: &StubResult<T>) {
        match result {
            Err(StubError::Setup(SetupError::UnsupportedOperation { .. })) => {}
            other => panic!("Expected UnsupportedOperation, got: {:?}", other),
        }
    }

    /// Assert that a result is `NotRecognizedCall`.
    #[track_caller]
    pub fn assert_not_recognized<T: std::fmt::Debug>(result: &StubResult<T>) {
        match result {
            Err(StubError::Setup(SetupError::NotRecognizedCall { .. })) => {}
            other => panic!("Expected NotRecognizedCall, got: {:?}", other),
        }
    }

    /// Assert that a result is a conversion error.
    #[track_caller]
    pub fn assert_conversion_error<T: std::fmt::Debug>(result: &StubResult<T>) {
        match result {
            Err(StubError::Conversion(_)) => {}
            other => panic!("Expected Conversion error, got: {:?}", other),
        }
    }

    /// Assert that a result is a mapper cardinality error.
    #[track_caller]
    pub fn assert_mapper_error<T: std::fmt::Debug>(result: &StubResult<T>, expected: MapperError) {
        match result {
            Err(StubError::Mapper(e)) => assert_eq!(*e, expected, "Wrong mapper error"),
            other => panic!("Expected Mapper error {:?}, got: {:?}", expected, other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use stubql_core::{infer, SqlType};

    #[test]
    fn test_complex_type_schema() {
        let schema = infer::<fixtures::ComplexType>();
        let names: Vec<&str> = schema.names().collect();
        assert_eq!(
            names,
            vec![
                "integer_property",
                "string_property",
                "guid_property",
                "date_time_property",
                "nullable_date_time_property",
                "nullable_integer_property",
                "byte_array_property",
                "status",
            ]
        );
        assert_eq!(schema.column(7).map(|c| c.sql_type), Some(SqlType::Enum));
    }

    #[test]
    fn test_measurement_schema() {
        let schema = infer::<fixtures::Measurement>();
        let types: Vec<SqlType> = schema.columns().iter().map(|c| c.sql_type).collect();
        assert_eq!(
            types,
            vec![
                SqlType::Bool,
                SqlType::F32,
                SqlType::F64,
                SqlType::Decimal,
                SqlType::TimeSpan,
                SqlType::DateTimeOffset,
                SqlType::DateTimeOffset,
                SqlType::Text,
                SqlType::I128,
                SqlType::U128,
            ]
        );
        assert!(schema.column(6).unwrap().nullable);
    }

    #[test]
    fn test_order_keeps_only_scalar_members() {
        let schema = infer::<fixtures::Order>();
        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, vec!["id", "customer"]);
    }

    #[test]
    fn test_complex_types_fixture() {
        let records = fixtures::complex_types();
        assert_eq!(records.len(), 3);
        assert!(records[2].nullable_integer_property.is_none());
        assert_eq!(fixtures::date(2000, 1, 1).to_string(), "2000-01-01 00:00:00");
    }

    #[test]
    fn test_init_test_logging_is_idempotent() {
        init_test_logging();
        init_test_logging();
    }

    #[test]
    fn test_assertion_unsupported() {
        let result: StubResult<()> = Err(StubError::Setup(SetupError::UnsupportedOperation {
            method: stubql_core::MapperMethod::QueryMultiple,
        }));
        assertions::assert_setup_error(&result);
        assertions::assert_unsupported(&result);
    }
}
