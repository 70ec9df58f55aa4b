//! Shared storage helper functions.
//!
//! Customer median selection and timestamp encoding used across storage
//! backend implementations.

use chrono::{DateTime, Utc};

use crate::models::Customer;

use super::{Result, StorageError};

/// Pick the customer a last-name lookup resolves to.
///
/// Candidates are sorted by customer id and the element at position
/// `(n - 1) / 2` is taken: the middle of an odd-sized set, the lower middle
/// of an even-sized one.
pub fn select_median(mut candidates: Vec<Customer>) -> Option<Customer> {
    if candidates.is_empty() {
        return None;
    }
    candidates.sort_by_key(|c| c.c_id);
    let index = (candidates.len() - 1) / 2;
    Some(candidates.swap_remove(index))
}

/// Encode a timestamp for text columns.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Decode a timestamp stored by [`format_timestamp`].
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidTimestamp(format!("{value}: {e}")))
}

/// Decode an optional timestamp column.
pub fn parse_optional_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value.map(parse_timestamp).transpose()
}
