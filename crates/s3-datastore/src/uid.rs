use chrono::Utc;
use uuid::Uuid;

/// Timestamp layout of the uid prefix. Sorts lexicographically in time order.
pub const UID_TIMESTAMP_FORMAT: &str = "%Y/%m/%d/%H/%M/%S";

/// Name used when the content carries none.
pub const DEFAULT_NAME: &str = "file";

/// Generates `<timestamp>/<uuid v4>/<name>`.
pub fn generate_uid(name: &str) -> String {
    format!("{}/{}/{}", Utc::now().format(UID_TIMESTAMP_FORMAT), Uuid::new_v4(), name)
}
