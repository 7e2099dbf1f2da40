//! Request, response, and event payload types exposed over the HTTP API.

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod admin;
pub mod common;
pub mod health;
pub mod public;
pub mod sse;
pub mod validation;

fn format_epoch_millis(millis: u64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000)
        .map_err(|_| ())
        .and_then(|t| t.format(&Rfc3339).map_err(|_| ()))
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
