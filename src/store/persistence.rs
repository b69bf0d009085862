//! Serde glue between store rows and in-memory types.
//!
//! Pure data transformation; no I/O lives here. JSON columns go through
//! these helpers so backend code stays declarative and error mapping is
//! uniform.

use chrono::{DateTime, Utc};

use super::StoreError;

/// Serialize a value destined for a JSON column.
pub(crate) fn to_json_column<T: serde::Serialize>(
    value: &T,
    what: &'static str,
) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Corrupt {
        message: format!("serializing {what}: {e}"),
    })
}

/// Deserialize a JSON column back into its typed shape.
pub(crate) fn from_json_column<T: serde::de::DeserializeOwned>(
    raw: &str,
    what: &'static str,
) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt {
        message: format!("deserializing {what}: {e}"),
    })
}

/// Parse an RFC3339 timestamp column.
pub(crate) fn parse_timestamp(raw: &str, what: &'static str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            message: format!("parsing {what} timestamp: {e}"),
        })
}
