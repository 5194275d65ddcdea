//! Configuration types

use crate::{ConfigError, StubResult};
use serde::{Deserialize, Serialize};

/// How the mapper resolves a member name to a cursor column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMatching {
    /// Exact, case-sensitive match only
    Exact,
    /// Exact match first, then ASCII case-insensitive
    IgnoreCase,
}

impl std::str::FromStr for ColumnMatching {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(ColumnMatching::Exact),
            "ignore_case" | "ignorecase" => Ok(ColumnMatching::IgnoreCase),
            other => Err(ConfigError::InvalidValue {
                field: "column_matching".to_string(),
                value: other.to_string(),
                reason: "expected exact or ignore_case".to_string(),
            }),
        }
    }
}

/// Per-connection settings for stubbed calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubConfig {
    /// Name of the single column produced for scalar-like element types
    pub scalar_column_name: String,
    /// Member-to-column resolution used when rows are mapped back
    pub column_matching: ColumnMatching,
    /// Keep a log of every stubbed invocation on the connection
    pub record_invocations: bool,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            scalar_column_name: "Column1".to_string(),
            column_matching: ColumnMatching::IgnoreCase,
            record_invocations: true,
        }
    }
}

impl StubConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `STUBQL_SCALAR_COLUMN`: Column name for scalar element types (default: Column1)
    /// - `STUBQL_COLUMN_MATCHING`: `exact` or `ignore_case` (default: ignore_case)
    /// - `STUBQL_RECORD_INVOCATIONS`: `true` or `false` (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            scalar_column_name: std::env::var("STUBQL_SCALAR_COLUMN")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.scalar_column_name),
            column_matching: std::env::var("STUBQL_COLUMN_MATCHING")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.column_matching),
            record_invocations: std::env::var("STUBQL_RECORD_INVOCATIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.record_invocations),
        }
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - scalar_column_name is not blank
    /// - scalar_column_name has no surrounding whitespace
    pub fn validate(&self) -> StubResult<()> {
        if self.scalar_column_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scalar_column_name".to_string(),
                value: self.scalar_column_name.clone(),
                reason: "scalar_column_name must not be blank".to_string(),
            }
            .into());
        }

        if self.scalar_column_name.trim() != self.scalar_column_name {
            return Err(ConfigError::InvalidValue {
                field: "scalar_column_name".to_string(),
                value: self.scalar_column_name.clone(),
                reason: "scalar_column_name must not have surrounding whitespace".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
