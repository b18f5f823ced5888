//! Authoritative in-memory store for one open family tree.
//!
//! # Responsibility
//! - Apply person/relationship mutations while keeping the edge list and
//!   the per-person adjacency sets describing the same facts.
//! - Validate imported documents before replacing the open tree.
//! - Stamp every committed mutation with a monotonic revision for the
//!   persistence synchronizer.
//!
//! # Invariants
//! - `|parents| <= 2` for every person, enforced at mutation time.
//! - `children` is the exact inverse of `parents`; `partners` is
//!   symmetric.
//! - No duplicate edges, no self edges, no dangling id references.
//! - Mutation methods take `&mut self`, so mutations are serialized by
//!   construction; each one either fully applies or returns an error with
//!   the tree untouched.

use crate::model::person::{Person, PersonAttributes, PersonId, Position};
use crate::model::relationship::{Relationship, RelationshipId, RelationshipKind};
use crate::model::tree::FamilyTree;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum number of recorded parents per person.
pub const PARENT_CAP: usize = 2;

/// How a newly created person attaches to an existing anchor person.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeLink {
    pub relation: RelationshipKind,
    pub anchor: PersonId,
}

impl RelativeLink {
    pub fn new(relation: RelationshipKind, anchor: PersonId) -> Self {
        Self { relation, anchor }
    }
}

/// Structural rule broken by a rejected mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The person already has the maximum number of parents.
    ParentCapExceeded(PersonId),
    /// An equivalent edge already connects the pair.
    DuplicateRelationship {
        source: PersonId,
        target: PersonId,
        kind: RelationshipKind,
    },
    /// An edge may not connect a person to themselves.
    SelfRelationship(PersonId),
    /// The parent link would make a person their own ancestor.
    AncestryCycle { parent: PersonId, child: PersonId },
    /// Person name is blank after trim.
    BlankName,
    /// Direct sibling edges are not created; siblings share parents.
    DirectSiblingEdge,
}

impl Display for InvariantViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParentCapExceeded(id) => {
                write!(f, "person {id} already has {PARENT_CAP} parents")
            }
            Self::DuplicateRelationship {
                source,
                target,
                kind,
            } => write!(
                f,
                "an equivalent {kind:?} relationship already links {source} and {target}"
            ),
            Self::SelfRelationship(id) => {
                write!(f, "person {id} cannot be related to themselves")
            }
            Self::AncestryCycle { parent, child } => write!(
                f,
                "making {parent} a parent of {child} would create an ancestry cycle"
            ),
            Self::BlankName => write!(f, "person name must not be blank"),
            Self::DirectSiblingEdge => write!(
                f,
                "sibling links derive from shared parents; direct sibling edges are not created"
            ),
        }
    }
}

impl Error for InvariantViolation {}

/// First structural violation found in an imported document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field/id pointer such as `edges[3].source`.
    pub pointer: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
            message: message.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid tree document at {}: {}", self.pointer, self.message)
    }
}

impl Error for ValidationError {}

/// Errors from tree store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Referenced person id is absent from the open tree.
    PersonNotFound(PersonId),
    /// Referenced relationship id is absent from the open tree.
    RelationshipNotFound(RelationshipId),
    /// The mutation would break a structural invariant.
    Invariant(InvariantViolation),
    /// The imported document failed structural validation.
    Validation(ValidationError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PersonNotFound(id) => write!(f, "person not found: {id}"),
            Self::RelationshipNotFound(id) => write!(f, "relationship not found: {id}"),
            Self::Invariant(violation) => write!(f, "{violation}"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invariant(violation) => Some(violation),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvariantViolation> for StoreError {
    fn from(value: InvariantViolation) -> Self {
        Self::Invariant(value)
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Committed state emitted to the persistence synchronizer.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeSnapshot {
    /// Monotonic per-store change counter.
    pub revision: u64,
    pub tree: FamilyTree,
}

/// The authoritative in-memory store for one open tree.
#[derive(Debug)]
pub struct TreeStore {
    tree: FamilyTree,
    revision: u64,
}

impl TreeStore {
    /// Creates a store over a fresh empty tree.
    pub fn create(name: impl Into<String>) -> Self {
        Self {
            tree: FamilyTree::new(name),
            revision: 0,
        }
    }

    /// Opens a store over a loaded tree after structural validation.
    ///
    /// Persisted records pass through the same gate as imported
    /// documents, so a corrupted record can never become the working
    /// copy.
    pub fn open(tree: FamilyTree) -> Result<Self, StoreError> {
        validate_tree(&tree)?;
        Ok(Self { tree, revision: 0 })
    }

    pub fn tree(&self) -> &FamilyTree {
        &self.tree
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Copies the current committed state for persistence.
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            revision: self.revision,
            tree: self.tree.clone(),
        }
    }

    /// Structurally complete copy safe for external persistence/download.
    pub fn export_tree(&self) -> FamilyTree {
        self.tree.clone()
    }

    /// Creates a person and optionally links it to an anchor person.
    ///
    /// `link = None` creates an unlinked person, which is how the first
    /// person enters an empty tree. Relation semantics:
    /// - `Parent`: new person becomes a parent of the anchor; fails when
    ///   the anchor already has two parents.
    /// - `Sibling`: new person becomes a child of the anchor's existing
    ///   parents (0 to 2); no direct edge to the anchor.
    /// - `Child`: anchor becomes a parent of the new person.
    /// - `Partner` / `DivorcedPartner`: symmetric edge to the anchor;
    ///   the two kinds are distinct edges and never replace each other.
    pub fn add_person(
        &mut self,
        attrs: PersonAttributes,
        link: Option<RelativeLink>,
    ) -> Result<Person, StoreError> {
        let name = normalize_name(attrs.name.as_deref().unwrap_or(""))?;

        // All checks complete before the first mutation.
        let mut anchor_parents: Vec<PersonId> = Vec::new();
        if let Some(link) = link {
            let anchor = self
                .tree
                .person(link.anchor)
                .ok_or(StoreError::PersonNotFound(link.anchor))?;
            match link.relation {
                RelationshipKind::Parent => {
                    if anchor.parents.len() >= PARENT_CAP {
                        return Err(InvariantViolation::ParentCapExceeded(link.anchor).into());
                    }
                }
                RelationshipKind::Sibling => {
                    anchor_parents = anchor.parents.iter().copied().collect();
                }
                RelationshipKind::Child
                | RelationshipKind::Partner
                | RelationshipKind::DivorcedPartner => {}
            }
        }

        let mut attrs = attrs;
        attrs.name = Some(name);
        let person = Person::new(attrs);
        let person_id = person.uuid;
        self.tree.nodes.push(person);

        if let Some(link) = link {
            match link.relation {
                RelationshipKind::Parent => self.wire_parent(person_id, link.anchor),
                RelationshipKind::Child => self.wire_parent(link.anchor, person_id),
                RelationshipKind::Sibling => {
                    for parent_id in anchor_parents {
                        self.wire_parent(parent_id, person_id);
                    }
                }
                RelationshipKind::Partner | RelationshipKind::DivorcedPartner => {
                    self.wire_partner(link.anchor, person_id, link.relation);
                }
            }
        }

        self.committed();
        // The person was just pushed; read back the wired state.
        match self.tree.person(person_id) {
            Some(person) => Ok(person.clone()),
            None => Err(StoreError::PersonNotFound(person_id)),
        }
    }

    /// Merges attribute changes into an existing person.
    pub fn update_person(
        &mut self,
        person_id: PersonId,
        attrs: PersonAttributes,
    ) -> Result<Person, StoreError> {
        let mut attrs = attrs;
        if let Some(name) = attrs.name.as_deref() {
            attrs.name = Some(normalize_name(name)?);
        }

        let person = self
            .tree
            .person_mut(person_id)
            .ok_or(StoreError::PersonNotFound(person_id))?;
        person.apply(attrs);
        let updated = person.clone();
        self.committed();
        Ok(updated)
    }

    /// Records a layout position change reported by the renderer.
    ///
    /// Position is not a core invariant but flows through the same
    /// commit/persistence path as every other mutation.
    pub fn move_person(
        &mut self,
        person_id: PersonId,
        position: Position,
    ) -> Result<(), StoreError> {
        let person = self
            .tree
            .person_mut(person_id)
            .ok_or(StoreError::PersonNotFound(person_id))?;
        person.position = position;
        self.committed();
        Ok(())
    }

    /// Removes a person and everything that references them.
    ///
    /// The cascade covers every edge touching the person and every
    /// adjacency reference in surviving persons. No step after the
    /// existence check can fail, so the operation is atomic.
    pub fn delete_person(&mut self, person_id: PersonId) -> Result<(), StoreError> {
        if self.tree.person(person_id).is_none() {
            return Err(StoreError::PersonNotFound(person_id));
        }

        self.tree.edges.retain(|edge| !edge.touches(person_id));
        for node in &mut self.tree.nodes {
            node.parents.remove(&person_id);
            node.children.remove(&person_id);
            node.partners.remove(&person_id);
        }
        self.tree.nodes.retain(|node| node.uuid != person_id);
        self.committed();
        Ok(())
    }

    /// Links two existing persons with a typed edge.
    ///
    /// `Child` is normalized to the equivalent `Parent` fact. `Sibling`
    /// is rejected: siblings are linked through shared parents only.
    pub fn add_relationship(
        &mut self,
        source: PersonId,
        target: PersonId,
        kind: RelationshipKind,
    ) -> Result<Relationship, StoreError> {
        if source == target {
            return Err(InvariantViolation::SelfRelationship(source).into());
        }
        self.tree
            .person(source)
            .ok_or(StoreError::PersonNotFound(source))?;
        self.tree
            .person(target)
            .ok_or(StoreError::PersonNotFound(target))?;

        match kind {
            RelationshipKind::Sibling => Err(InvariantViolation::DirectSiblingEdge.into()),
            RelationshipKind::Parent => self.insert_parent_edge(source, target),
            RelationshipKind::Child => self.insert_parent_edge(target, source),
            RelationshipKind::Partner | RelationshipKind::DivorcedPartner => {
                self.insert_partner_edge(source, target, kind)
            }
        }
    }

    /// Removes one edge and reconciles the adjacency sets.
    pub fn remove_relationship(
        &mut self,
        relationship_id: RelationshipId,
    ) -> Result<(), StoreError> {
        let edge = self
            .tree
            .relationship(relationship_id)
            .cloned()
            .ok_or(StoreError::RelationshipNotFound(relationship_id))?;

        self.tree.edges.retain(|item| item.uuid != relationship_id);

        if let Some((parent_id, child_id)) = edge.parental_fact() {
            if let Some(parent) = self.tree.person_mut(parent_id) {
                parent.children.remove(&child_id);
            }
            if let Some(child) = self.tree.person_mut(child_id) {
                child.parents.remove(&parent_id);
            }
        } else if edge.kind.is_partner_like() {
            // Partner membership survives while any partner-like edge
            // still links the pair (active + divorced can coexist).
            let still_linked = self
                .tree
                .edges
                .iter()
                .any(|item| item.kind.is_partner_like() && item.links(edge.source, edge.target));
            if !still_linked {
                if let Some(node) = self.tree.person_mut(edge.source) {
                    node.partners.remove(&edge.target);
                }
                if let Some(node) = self.tree.person_mut(edge.target) {
                    node.partners.remove(&edge.source);
                }
            }
        }

        self.committed();
        Ok(())
    }

    /// Replaces the open tree with a validated external document.
    ///
    /// The previous tree stays active when validation fails. The
    /// document's own timestamps are kept so an export/import round trip
    /// is loss-free; the revision still advances because the replacement
    /// must persist.
    pub fn import_tree(&mut self, tree: FamilyTree) -> Result<(), StoreError> {
        validate_tree(&tree)?;
        self.tree = tree;
        self.revision += 1;
        Ok(())
    }

    /// Renames the open tree.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), StoreError> {
        let name = normalize_name(&name.into())?;
        self.tree.name = name;
        self.committed();
        Ok(())
    }

    fn committed(&mut self) {
        self.revision += 1;
        self.tree.touch();
    }

    fn wire_parent(&mut self, parent_id: PersonId, child_id: PersonId) {
        self.tree
            .edges
            .push(Relationship::new(parent_id, child_id, RelationshipKind::Parent));
        if let Some(parent) = self.tree.person_mut(parent_id) {
            parent.children.insert(child_id);
        }
        if let Some(child) = self.tree.person_mut(child_id) {
            child.parents.insert(parent_id);
        }
    }

    fn wire_partner(&mut self, a: PersonId, b: PersonId, kind: RelationshipKind) {
        self.tree.edges.push(Relationship::new(a, b, kind));
        if let Some(node) = self.tree.person_mut(a) {
            node.partners.insert(b);
        }
        if let Some(node) = self.tree.person_mut(b) {
            node.partners.insert(a);
        }
    }

    fn insert_parent_edge(
        &mut self,
        parent_id: PersonId,
        child_id: PersonId,
    ) -> Result<Relationship, StoreError> {
        if self.has_parent_fact(parent_id, child_id) {
            return Err(InvariantViolation::DuplicateRelationship {
                source: parent_id,
                target: child_id,
                kind: RelationshipKind::Parent,
            }
            .into());
        }
        if let Some(child) = self.tree.person(child_id) {
            if child.parents.len() >= PARENT_CAP {
                return Err(InvariantViolation::ParentCapExceeded(child_id).into());
            }
        }
        if self.is_ancestor(child_id, parent_id) {
            return Err(InvariantViolation::AncestryCycle {
                parent: parent_id,
                child: child_id,
            }
            .into());
        }

        self.wire_parent(parent_id, child_id);
        self.committed();
        match self.tree.edges.last() {
            Some(edge) => Ok(edge.clone()),
            None => Err(StoreError::PersonNotFound(parent_id)),
        }
    }

    fn insert_partner_edge(
        &mut self,
        a: PersonId,
        b: PersonId,
        kind: RelationshipKind,
    ) -> Result<Relationship, StoreError> {
        let duplicate = self
            .tree
            .edges
            .iter()
            .any(|edge| edge.kind == kind && edge.links(a, b));
        if duplicate {
            return Err(InvariantViolation::DuplicateRelationship {
                source: a,
                target: b,
                kind,
            }
            .into());
        }

        self.wire_partner(a, b, kind);
        self.committed();
        match self.tree.edges.last() {
            Some(edge) => Ok(edge.clone()),
            None => Err(StoreError::PersonNotFound(a)),
        }
    }

    fn has_parent_fact(&self, parent_id: PersonId, child_id: PersonId) -> bool {
        self.tree
            .edges
            .iter()
            .any(|edge| edge.parental_fact() == Some((parent_id, child_id)))
    }

    /// Walks the parent links upward from `start` looking for `needle`.
    fn is_ancestor(&self, needle: PersonId, start: PersonId) -> bool {
        let mut visited: BTreeSet<PersonId> = BTreeSet::new();
        let mut frontier: Vec<PersonId> = vec![start];
        while let Some(current) = frontier.pop() {
            if current == needle {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(person) = self.tree.person(current) {
                frontier.extend(person.parents.iter().copied());
            }
        }
        false
    }
}

/// Validates the structural invariants of a tree document.
///
/// Reports the first violation found, with a pointer to the offending
/// field or id. Node checks run before edge checks; the
/// edge-versus-adjacency cross-check and the ancestry-cycle pass run
/// last.
pub fn validate_tree(tree: &FamilyTree) -> Result<(), ValidationError> {
    let mut known_ids: BTreeSet<PersonId> = BTreeSet::new();
    for (index, node) in tree.nodes.iter().enumerate() {
        if node.uuid.is_nil() {
            return Err(ValidationError::new(
                format!("nodes[{index}].uuid"),
                "person id must not be nil",
            ));
        }
        if !known_ids.insert(node.uuid) {
            return Err(ValidationError::new(
                format!("nodes[{index}].uuid"),
                format!("duplicate person id {}", node.uuid),
            ));
        }
    }

    for (index, node) in tree.nodes.iter().enumerate() {
        if node.parents.len() > PARENT_CAP {
            return Err(ValidationError::new(
                format!("nodes[{index}].parents"),
                format!(
                    "person {} has {} parents, cap is {PARENT_CAP}",
                    node.uuid,
                    node.parents.len()
                ),
            ));
        }
        for (set_name, set) in [
            ("parents", &node.parents),
            ("children", &node.children),
            ("partners", &node.partners),
        ] {
            for referenced in set {
                if *referenced == node.uuid {
                    return Err(ValidationError::new(
                        format!("nodes[{index}].{set_name}"),
                        format!("person {} references itself", node.uuid),
                    ));
                }
                if !known_ids.contains(referenced) {
                    return Err(ValidationError::new(
                        format!("nodes[{index}].{set_name}"),
                        format!("references unknown person {referenced}"),
                    ));
                }
            }
        }
    }

    // Inverse/symmetry checks over the adjacency sets.
    for (index, node) in tree.nodes.iter().enumerate() {
        for parent_id in &node.parents {
            let reflected = tree
                .person(*parent_id)
                .is_some_and(|parent| parent.children.contains(&node.uuid));
            if !reflected {
                return Err(ValidationError::new(
                    format!("nodes[{index}].parents"),
                    format!(
                        "parent {parent_id} does not list {} as a child",
                        node.uuid
                    ),
                ));
            }
        }
        for child_id in &node.children {
            let reflected = tree
                .person(*child_id)
                .is_some_and(|child| child.parents.contains(&node.uuid));
            if !reflected {
                return Err(ValidationError::new(
                    format!("nodes[{index}].children"),
                    format!("child {child_id} does not list {} as a parent", node.uuid),
                ));
            }
        }
        for partner_id in &node.partners {
            let reflected = tree
                .person(*partner_id)
                .is_some_and(|partner| partner.partners.contains(&node.uuid));
            if !reflected {
                return Err(ValidationError::new(
                    format!("nodes[{index}].partners"),
                    format!("partner link to {partner_id} is not mutual"),
                ));
            }
        }
    }

    let mut edge_ids: BTreeSet<RelationshipId> = BTreeSet::new();
    let mut parent_facts: BTreeSet<(PersonId, PersonId)> = BTreeSet::new();
    let mut symmetric_facts: BTreeSet<(PersonId, PersonId, RelationshipKind)> = BTreeSet::new();
    for (index, edge) in tree.edges.iter().enumerate() {
        if edge.uuid.is_nil() {
            return Err(ValidationError::new(
                format!("edges[{index}].uuid"),
                "relationship id must not be nil",
            ));
        }
        if !edge_ids.insert(edge.uuid) {
            return Err(ValidationError::new(
                format!("edges[{index}].uuid"),
                format!("duplicate relationship id {}", edge.uuid),
            ));
        }
        if !known_ids.contains(&edge.source) {
            return Err(ValidationError::new(
                format!("edges[{index}].source"),
                format!("references unknown person {}", edge.source),
            ));
        }
        if !known_ids.contains(&edge.target) {
            return Err(ValidationError::new(
                format!("edges[{index}].target"),
                format!("references unknown person {}", edge.target),
            ));
        }
        if edge.source == edge.target {
            return Err(ValidationError::new(
                format!("edges[{index}]"),
                format!("connects person {} to themselves", edge.source),
            ));
        }

        if let Some(fact) = edge.parental_fact() {
            if !parent_facts.insert(fact) {
                return Err(ValidationError::new(
                    format!("edges[{index}]"),
                    format!("duplicate parent link {} -> {}", fact.0, fact.1),
                ));
            }
        } else if edge.kind.is_symmetric() {
            let pair = ordered_pair(edge.source, edge.target);
            if !symmetric_facts.insert((pair.0, pair.1, edge.kind)) {
                return Err(ValidationError::new(
                    format!("edges[{index}]"),
                    format!(
                        "duplicate {:?} relationship between {} and {}",
                        edge.kind, pair.0, pair.1
                    ),
                ));
            }
        }
    }

    // Edge list and adjacency sets must describe the same facts.
    for (index, edge) in tree.edges.iter().enumerate() {
        if let Some((parent_id, child_id)) = edge.parental_fact() {
            let in_sets = tree
                .person(child_id)
                .is_some_and(|child| child.parents.contains(&parent_id));
            if !in_sets {
                return Err(ValidationError::new(
                    format!("edges[{index}]"),
                    format!(
                        "parent link {parent_id} -> {child_id} is not reflected in adjacency sets"
                    ),
                ));
            }
        } else if edge.kind.is_partner_like() {
            let in_sets = tree
                .person(edge.source)
                .is_some_and(|node| node.partners.contains(&edge.target));
            if !in_sets {
                return Err(ValidationError::new(
                    format!("edges[{index}]"),
                    format!(
                        "partner edge between {} and {} is not reflected in adjacency sets",
                        edge.source, edge.target
                    ),
                ));
            }
        }
        // Sibling marker edges carry no adjacency implication.
    }

    for (index, node) in tree.nodes.iter().enumerate() {
        for parent_id in &node.parents {
            if !parent_facts.contains(&(*parent_id, node.uuid)) {
                return Err(ValidationError::new(
                    format!("nodes[{index}].parents"),
                    format!("parent link {parent_id} has no corresponding edge"),
                ));
            }
        }
        for partner_id in &node.partners {
            let pair = ordered_pair(node.uuid, *partner_id);
            let backed = symmetric_facts.contains(&(pair.0, pair.1, RelationshipKind::Partner))
                || symmetric_facts.contains(&(
                    pair.0,
                    pair.1,
                    RelationshipKind::DivorcedPartner,
                ));
            if !backed {
                return Err(ValidationError::new(
                    format!("nodes[{index}].partners"),
                    format!("partner link to {partner_id} has no corresponding edge"),
                ));
            }
        }
    }

    // Ancestry must be acyclic. The per-mutation guard cannot vouch for
    // imported documents, so the same invariant is checked here.
    for (index, node) in tree.nodes.iter().enumerate() {
        if is_own_ancestor(tree, node.uuid) {
            return Err(ValidationError::new(
                format!("nodes[{index}].parents"),
                format!("person {} is their own ancestor", node.uuid),
            ));
        }
    }

    Ok(())
}

/// Walks the parent links upward from `person_id` looking for itself.
fn is_own_ancestor(tree: &FamilyTree, person_id: PersonId) -> bool {
    let mut visited: BTreeSet<PersonId> = BTreeSet::new();
    let mut frontier: Vec<PersonId> = tree
        .person(person_id)
        .map(|person| person.parents.iter().copied().collect())
        .unwrap_or_default();
    while let Some(current) = frontier.pop() {
        if current == person_id {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(person) = tree.person(current) {
            frontier.extend(person.parents.iter().copied());
        }
    }
    false
}

fn ordered_pair(a: PersonId, b: PersonId) -> (PersonId, PersonId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn normalize_name(value: &str) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InvariantViolation::BlankName.into());
    }
    Ok(trimmed.to_string())
}
