//! Family-tree aggregate and display derivations.
//!
//! # Responsibility
//! - Define the tree aggregate (metadata + nodes + edges + theme config).
//! - Provide the empty-tree factory shared by "new tree" and the
//!   synthesized record for an unknown tree id.
//! - Compute display-only derivations over the node list.
//!
//! # Invariants
//! - `created_at` is immutable; `updated_at` bumps on committed mutations.
//! - Node/edge ordering is render order, not semantically meaningful.

use crate::model::now_epoch_ms;
use crate::model::person::{Person, PersonId};
use crate::model::relationship::{Relationship, RelationshipId};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a family tree.
pub type TreeId = Uuid;

/// Per-tree visual theme. Carried for the rendering collaborator, never
/// interpreted by core invariants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_style: Option<String>,
}

/// Identity and timestamps of one tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyTreeMeta {
    pub uuid: TreeId,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Registry listing projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyTreeSummary {
    pub uuid: TreeId,
    pub name: String,
    pub updated_at: i64,
}

/// The aggregate for one open tree: metadata plus the full graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyTree {
    pub uuid: TreeId,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub nodes: Vec<Person>,
    #[serde(default)]
    pub edges: Vec<Relationship>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<TreeConfig>,
}

impl FamilyTree {
    /// Creates an empty tree with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates an empty tree under a caller-provided id.
    ///
    /// Used when opening a tree id that has no persisted record yet.
    pub fn with_id(uuid: TreeId, name: impl Into<String>) -> Self {
        let now = now_epoch_ms();
        Self {
            uuid,
            name: name.into(),
            created_at: now,
            updated_at: now,
            nodes: Vec::new(),
            edges: Vec::new(),
            config: None,
        }
    }

    pub fn meta(&self) -> FamilyTreeMeta {
        FamilyTreeMeta {
            uuid: self.uuid,
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn summary(&self) -> FamilyTreeSummary {
        FamilyTreeSummary {
            uuid: self.uuid,
            name: self.name.clone(),
            updated_at: self.updated_at,
        }
    }

    pub fn person(&self, person_id: PersonId) -> Option<&Person> {
        self.nodes.iter().find(|node| node.uuid == person_id)
    }

    pub fn person_mut(&mut self, person_id: PersonId) -> Option<&mut Person> {
        self.nodes.iter_mut().find(|node| node.uuid == person_id)
    }

    pub fn relationship(&self, relationship_id: RelationshipId) -> Option<&Relationship> {
        self.edges.iter().find(|edge| edge.uuid == relationship_id)
    }

    /// Bumps `updated_at` to now. Called once per committed mutation.
    pub fn touch(&mut self) {
        self.updated_at = now_epoch_ms();
    }
}

/// Returns the earliest valid date of birth among `nodes`.
///
/// Persons with a missing, empty or unparseable `date_of_birth` are
/// skipped. When no valid date exists the current date is returned as a
/// "no data" sentinel; callers that need to distinguish real data must
/// check input non-emptiness upstream.
pub fn earliest_date_of_birth(nodes: &[Person]) -> NaiveDate {
    nodes
        .iter()
        .filter_map(|person| person.date_of_birth.as_deref())
        .filter_map(parse_iso_date)
        .min()
        .unwrap_or_else(|| Utc::now().date_naive())
}

/// Parses an ISO `YYYY-MM-DD` date string, tolerating surrounding blanks.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::{earliest_date_of_birth, parse_iso_date, FamilyTree};
    use crate::model::person::{Person, PersonAttributes};
    use chrono::{NaiveDate, Utc};

    fn person_with_dob(name: &str, dob: Option<&str>) -> Person {
        Person::new(PersonAttributes {
            name: Some(name.to_string()),
            date_of_birth: dob.map(str::to_string),
            ..PersonAttributes::default()
        })
    }

    #[test]
    fn new_tree_is_empty_with_equal_timestamps() {
        let tree = FamilyTree::new("Smith family");

        assert!(!tree.uuid.is_nil());
        assert_eq!(tree.name, "Smith family");
        assert!(tree.nodes.is_empty());
        assert!(tree.edges.is_empty());
        assert_eq!(tree.created_at, tree.updated_at);
        assert!(tree.config.is_none());
    }

    #[test]
    fn earliest_dob_picks_minimum_valid_date() {
        let nodes = vec![
            person_with_dob("a", Some("1950-01-01")),
            person_with_dob("b", Some("1899-06-15")),
            person_with_dob("c", Some("not a date")),
            person_with_dob("d", None),
        ];

        let earliest = earliest_date_of_birth(&nodes);
        assert_eq!(earliest, NaiveDate::from_ymd_opt(1899, 6, 15).unwrap());
    }

    #[test]
    fn earliest_dob_returns_today_sentinel_without_data() {
        let today = Utc::now().date_naive();

        assert_eq!(earliest_date_of_birth(&[]), today);
        assert_eq!(
            earliest_date_of_birth(&[person_with_dob("x", Some(""))]),
            today
        );
        assert_eq!(
            earliest_date_of_birth(&[person_with_dob("y", Some("12/09/1906"))]),
            today
        );
    }

    #[test]
    fn parse_iso_date_trims_and_rejects_garbage() {
        assert_eq!(
            parse_iso_date(" 1906-12-09 "),
            NaiveDate::from_ymd_opt(1906, 12, 9)
        );
        assert_eq!(parse_iso_date(""), None);
        assert_eq!(parse_iso_date("1906-13-40"), None);
    }
}
