//! Database-backed collaborators for the wizard engine

pub mod loader;
pub mod participation;
pub mod responses;

pub use loader::SqlSurveyLoader;
pub use participation::SqlSessionManager;
pub use responses::SqlResponseWriter;

use opine_common::{Error, Result};
use uuid::Uuid;

/// Parse a guid column; invalid data is a server-side integrity problem
pub(crate) fn parse_guid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| Error::Internal(format!("invalid guid in database: {}", value)))
}

/// Parse an optional guid column, dropping unparseable values
pub(crate) fn parse_opt_guid(value: Option<&str>) -> Option<Uuid> {
    value.and_then(|s| Uuid::parse_str(s).ok())
}

/// Parse an optional RFC 3339 timestamp column
pub(crate) fn parse_opt_timestamp(
    value: Option<&str>,
) -> Option<chrono::DateTime<chrono::Utc>> {
    value.and_then(|s| {
        chrono::DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&chrono::Utc))
    })
}
