//! Family-tree domain model.
//!
//! # Responsibility
//! - Define the canonical person/relationship/tree records used by core
//!   business logic.
//! - Keep the serialized shape stable for persistence and export.
//!
//! # Invariants
//! - Every domain object is identified by a stable v4 uuid.
//! - Adjacency sets on `Person` and the tree edge list describe the same
//!   facts; mutations go through the store so the two never diverge.

pub mod person;
pub mod relationship;
pub mod tree;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in unix epoch milliseconds.
///
/// All record timestamps in core use this resolution.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
