//! Core domain logic for Kintree.
//! This crate is the single source of truth for family-graph invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;
pub mod sync;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::person::{Person, PersonAttributes, PersonId, Position};
pub use model::relationship::{Relationship, RelationshipId, RelationshipKind};
pub use model::tree::{
    earliest_date_of_birth, FamilyTree, FamilyTreeMeta, FamilyTreeSummary, TreeConfig, TreeId,
};
pub use repo::tree_repo::{RepoError, RepoResult, SqliteTreeRepository, TreeRepository};
pub use service::tree_service::{ServiceResult, TreeService, TreeServiceError};
pub use store::tree_store::{
    validate_tree, InvariantViolation, RelativeLink, StoreError, TreeSnapshot, TreeStore,
    ValidationError, PARENT_CAP,
};
pub use sync::identity::{IdentityProvider, LocalOnlyIdentity};
pub use sync::outbox::{SyncOutbox, SyncWarning};
pub use sync::session::{LoadSession, LoadTicket};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
