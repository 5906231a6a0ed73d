// Common helpers for the store and the pipelines

use chrono::{SecondsFormat, Utc};

/// Current timestamp in milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Name of the revision written by one editing session.
///
/// ISO-8601 UTC with milliseconds, `:` replaced so it is a valid file name
/// everywhere (`2024-05-01T10_00_00.000Z`).
pub fn new_revision_name() -> String {
    Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(':', "_")
}
