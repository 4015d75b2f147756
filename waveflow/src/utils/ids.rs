//! Identifier generation.

use uuid::Uuid;

/// Generates a random workflow identifier (UUID v4).
#[must_use]
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a time-ordered execution identifier (UUID v7).
///
/// Execution ids sort by creation time, which keeps logs from repeated
/// runs of the same workflow in order.
#[must_use]
pub fn generate_execution_id() -> String {
    Uuid::now_v7().to_string()
}
