/// Queue entries and users are identified by random UUIDs assigned at
/// creation, never reused.
pub type EntryId = uuid::Uuid;

/// Owning user's identifier. Self-asserted at login; not verified.
pub type UserId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
