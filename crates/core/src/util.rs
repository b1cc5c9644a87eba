use std::time::{SystemTime, UNIX_EPOCH};

use ulid::Ulid;

/// Wall-clock unix epoch milliseconds. Snapshot and history timestamps use this.
///
/// A clock set before 1970 reads as 0 rather than panicking inside the poll loop.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Fresh sortable identifier for a notification record.
pub fn new_record_id() -> String {
    Ulid::new().to_string()
}
