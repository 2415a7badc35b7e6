pub mod job;
pub mod matching;
pub mod plan;
pub mod resume;
pub mod user;

use chrono::{DateTime, Utc};

/// Timestamp for an update: never earlier than the value it replaces.
pub fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous)
}
