/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Milliseconds since the Unix epoch, used to make storage keys unique.
pub fn epoch_millis(at: Timestamp) -> i64 {
    at.timestamp_millis()
}
