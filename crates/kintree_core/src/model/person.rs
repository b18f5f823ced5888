//! Person node model.
//!
//! # Responsibility
//! - Define the canonical person record and its attribute merge model.
//! - Keep descriptive attributes free of structural invariants.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another person.
//! - `created_at` is immutable after creation.
//! - `parents` holds at most two ids; the cap is enforced by the store at
//!   mutation time, not by this schema.
//! - `position` is owned by the layout collaborator and is never
//!   interpreted by core logic.

use crate::model::now_epoch_ms;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Stable identifier for a person node.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type PersonId = Uuid;

/// Visual coordinate reported by the rendering collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// One individual in the family graph.
///
/// The adjacency sets (`parents`, `children`, `partners`) mirror the tree
/// edge list. `BTreeSet` keeps their serialized order deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Stable global id used for linking and persistence.
    pub uuid: PersonId,
    /// Display name; normalized non-blank by the store.
    pub name: String,
    /// ISO `YYYY-MM-DD` date string, empty/absent when unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    /// ISO `YYYY-MM-DD` date string, absent for living persons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_death: Option<String>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub occupation: String,
    #[serde(default)]
    pub country_of_birth: String,
    #[serde(default)]
    pub maiden_name: String,
    /// Photo reference (path or data url), opaque to core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// Ids of this person's parents. At most two.
    #[serde(default)]
    pub parents: BTreeSet<PersonId>,
    /// Exact inverse of the `parents` sets referencing this person.
    #[serde(default)]
    pub children: BTreeSet<PersonId>,
    /// Symmetric partner links, active and divorced alike.
    #[serde(default)]
    pub partners: BTreeSet<PersonId>,
    /// Epoch ms creation timestamp, immutable.
    pub created_at: i64,
    /// Layout position, persisted but uninterpreted.
    #[serde(default)]
    pub position: Position,
}

/// Attribute change-set for creating or updating a person.
///
/// Every field is optional; `None` means "leave unchanged" on update and
/// "use the default" on create.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonAttributes {
    pub name: Option<String>,
    pub date_of_birth: Option<String>,
    pub date_of_death: Option<String>,
    pub gender: Option<String>,
    pub occupation: Option<String>,
    pub country_of_birth: Option<String>,
    pub maiden_name: Option<String>,
    pub photo: Option<String>,
    pub position: Option<Position>,
}

impl PersonAttributes {
    /// Convenience constructor for the common name-only case.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

impl Person {
    /// Creates a new unlinked person with a generated stable id.
    pub fn new(attrs: PersonAttributes) -> Self {
        Self::with_id(Uuid::new_v4(), attrs)
    }

    /// Creates a person with a caller-provided stable id.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(uuid: PersonId, attrs: PersonAttributes) -> Self {
        let mut person = Self {
            uuid,
            name: String::new(),
            date_of_birth: None,
            date_of_death: None,
            gender: String::new(),
            occupation: String::new(),
            country_of_birth: String::new(),
            maiden_name: String::new(),
            photo: None,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            partners: BTreeSet::new(),
            created_at: now_epoch_ms(),
            position: Position::default(),
        };
        person.apply(attrs);
        person
    }

    /// Merges an attribute change-set into this person.
    ///
    /// Identity, adjacency sets and `created_at` are never touched here;
    /// those change only through store mutations.
    pub fn apply(&mut self, attrs: PersonAttributes) {
        if let Some(name) = attrs.name {
            self.name = name;
        }
        if let Some(date_of_birth) = attrs.date_of_birth {
            self.date_of_birth = Some(date_of_birth);
        }
        if let Some(date_of_death) = attrs.date_of_death {
            self.date_of_death = Some(date_of_death);
        }
        if let Some(gender) = attrs.gender {
            self.gender = gender;
        }
        if let Some(occupation) = attrs.occupation {
            self.occupation = occupation;
        }
        if let Some(country_of_birth) = attrs.country_of_birth {
            self.country_of_birth = country_of_birth;
        }
        if let Some(maiden_name) = attrs.maiden_name {
            self.maiden_name = maiden_name;
        }
        if let Some(photo) = attrs.photo {
            self.photo = Some(photo);
        }
        if let Some(position) = attrs.position {
            self.position = position;
        }
    }
}
