// Storage-assigned identifiers.
//
// Renewal tokens and accounts get UUIDv7 ids so rows sort by creation time.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}
