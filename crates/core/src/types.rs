/// All entity identifiers (events, reviews, users) are 64-bit integers
/// assigned by the external data store.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
