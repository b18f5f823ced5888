//! Relationship edge model.
//!
//! # Responsibility
//! - Define the typed edge record connecting two persons.
//! - Document the direction conventions each kind carries.
//!
//! # Invariants
//! - An edge kind must agree with the adjacency sets of its endpoints;
//!   the edge list and the adjacency sets are two views of one fact.
//! - `Parent`: source is a parent of target.
//! - `Child`: source is a child of target (inverse spelling of the same
//!   fact; accepted on import, never produced by the store).
//! - `Partner` / `DivorcedPartner`: symmetric, direction-free.
//! - `Sibling`: symmetric marker without adjacency implication; the store
//!   links siblings through shared parents instead.

use crate::model::person::PersonId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a relationship edge.
pub type RelationshipId = Uuid;

/// Typed connection between two persons.
///
/// Orderable so fact keys built from `(pair, kind)` can live in ordered
/// sets during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Source is a parent of target.
    Parent,
    /// Symmetric sibling marker; derived views only.
    Sibling,
    /// Source is a child of target.
    Child,
    /// Active partnership, symmetric.
    Partner,
    /// Ended partnership, symmetric; a distinct edge from `Partner`.
    DivorcedPartner,
}

impl RelationshipKind {
    /// Kinds whose meaning does not depend on edge direction.
    pub fn is_symmetric(self) -> bool {
        matches!(self, Self::Sibling | Self::Partner | Self::DivorcedPartner)
    }

    /// Kinds contributing to the `partners` adjacency set.
    pub fn is_partner_like(self) -> bool {
        matches!(self, Self::Partner | Self::DivorcedPartner)
    }

    /// Kinds encoding a parent/child fact.
    pub fn is_parental(self) -> bool {
        matches!(self, Self::Parent | Self::Child)
    }
}

/// One typed edge of the family graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Stable edge id.
    pub uuid: RelationshipId,
    pub source: PersonId,
    pub target: PersonId,
    #[serde(rename = "relationship_type")]
    pub kind: RelationshipKind,
}

impl Relationship {
    /// Creates an edge with a generated stable id.
    pub fn new(source: PersonId, target: PersonId, kind: RelationshipKind) -> Self {
        Self::with_id(Uuid::new_v4(), source, target, kind)
    }

    /// Creates an edge with a caller-provided stable id (import paths).
    pub fn with_id(
        uuid: RelationshipId,
        source: PersonId,
        target: PersonId,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            uuid,
            source,
            target,
            kind,
        }
    }

    /// Returns whether this edge connects the unordered pair `(a, b)`.
    pub fn links(&self, a: PersonId, b: PersonId) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }

    /// Returns whether this edge references `person_id` at either end.
    pub fn touches(&self, person_id: PersonId) -> bool {
        self.source == person_id || self.target == person_id
    }

    /// Resolves the `(parent, child)` pair for parental edges.
    ///
    /// Returns `None` for non-parental kinds.
    pub fn parental_fact(&self) -> Option<(PersonId, PersonId)> {
        match self.kind {
            RelationshipKind::Parent => Some((self.source, self.target)),
            RelationshipKind::Child => Some((self.target, self.source)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Relationship, RelationshipKind};
    use uuid::Uuid;

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_value(RelationshipKind::DivorcedPartner).unwrap();
        assert_eq!(json, "divorced_partner");

        let decoded: RelationshipKind = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, RelationshipKind::DivorcedPartner);
    }

    #[test]
    fn parental_fact_normalizes_direction() {
        let parent = Uuid::new_v4();
        let child = Uuid::new_v4();

        let as_parent = Relationship::new(parent, child, RelationshipKind::Parent);
        let as_child = Relationship::new(child, parent, RelationshipKind::Child);

        assert_eq!(as_parent.parental_fact(), Some((parent, child)));
        assert_eq!(as_child.parental_fact(), Some((parent, child)));
        assert_eq!(
            Relationship::new(parent, child, RelationshipKind::Partner).parental_fact(),
            None
        );
    }

    #[test]
    fn kind_classification_partitions_all_kinds() {
        use RelationshipKind::{Child, DivorcedPartner, Parent, Partner, Sibling};

        for kind in [Parent, Sibling, Child, Partner, DivorcedPartner] {
            assert_eq!(kind.is_symmetric(), !kind.is_parental());
        }
        assert!(Partner.is_partner_like());
        assert!(DivorcedPartner.is_partner_like());
        assert!(!Sibling.is_partner_like());
    }

    #[test]
    fn links_matches_either_direction() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let edge = Relationship::new(a, b, RelationshipKind::Partner);

        assert!(edge.links(a, b));
        assert!(edge.links(b, a));
        assert!(!edge.links(a, Uuid::new_v4()));
    }
}
