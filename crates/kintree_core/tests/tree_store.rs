//! Integration tests for in-memory graph mutations and invariants.

use kintree_core::{
    InvariantViolation, PersonAttributes, Position, RelationshipKind, RelativeLink, StoreError,
    TreeStore, PARENT_CAP,
};

fn named(name: &str) -> PersonAttributes {
    PersonAttributes::named(name)
}

#[test]
fn first_person_enters_an_empty_tree_unlinked() {
    let mut store = TreeStore::create("empty");

    let alice = store
        .add_person(named("Alice"), None)
        .expect("unlinked add should succeed");

    assert_eq!(store.tree().nodes.len(), 1);
    assert!(store.tree().edges.is_empty());
    assert!(alice.parents.is_empty());
    assert_eq!(store.revision(), 1);
}

#[test]
fn parent_links_update_both_adjacency_sets() {
    let mut store = TreeStore::create("family");
    let alice = store.add_person(named("Alice"), None).expect("add Alice");

    let carl = store
        .add_person(
            named("Carl"),
            Some(RelativeLink::new(RelationshipKind::Parent, alice.uuid)),
        )
        .expect("add parent Carl");

    assert!(carl.children.contains(&alice.uuid));
    let alice_now = store.tree().person(alice.uuid).expect("Alice exists");
    assert!(alice_now.parents.contains(&carl.uuid));
    assert_eq!(store.tree().edges.len(), 1);
    let edge = &store.tree().edges[0];
    assert_eq!(edge.kind, RelationshipKind::Parent);
    assert_eq!((edge.source, edge.target), (carl.uuid, alice.uuid));
}

#[test]
fn third_parent_is_rejected_and_state_is_unchanged() {
    let mut store = TreeStore::create("family");
    let alice = store.add_person(named("Alice"), None).expect("add Alice");
    store
        .add_person(
            named("Carl"),
            Some(RelativeLink::new(RelationshipKind::Parent, alice.uuid)),
        )
        .expect("first parent");
    store
        .add_person(
            named("Dana"),
            Some(RelativeLink::new(RelationshipKind::Parent, alice.uuid)),
        )
        .expect("second parent");

    let revision = store.revision();
    let error = store
        .add_person(
            named("Eve"),
            Some(RelativeLink::new(RelationshipKind::Parent, alice.uuid)),
        )
        .expect_err("third parent must be rejected");

    assert!(matches!(
        error,
        StoreError::Invariant(InvariantViolation::ParentCapExceeded(id)) if id == alice.uuid
    ));
    // The rejected person must not be half-added.
    assert_eq!(store.tree().nodes.len(), 3);
    assert_eq!(store.revision(), revision);
    let alice_now = store.tree().person(alice.uuid).expect("Alice exists");
    assert_eq!(alice_now.parents.len(), PARENT_CAP);
}

#[test]
fn sibling_add_links_through_shared_parents_only() {
    let mut store = TreeStore::create("family");
    let alice = store.add_person(named("Alice"), None).expect("add Alice");
    let carl = store
        .add_person(
            named("Carl"),
            Some(RelativeLink::new(RelationshipKind::Parent, alice.uuid)),
        )
        .expect("first parent");
    let dana = store
        .add_person(
            named("Dana"),
            Some(RelativeLink::new(RelationshipKind::Parent, alice.uuid)),
        )
        .expect("second parent");

    let bob = store
        .add_person(
            named("Bob"),
            Some(RelativeLink::new(RelationshipKind::Sibling, alice.uuid)),
        )
        .expect("add sibling");

    assert_eq!(bob.parents.len(), 2);
    assert!(bob.parents.contains(&carl.uuid));
    assert!(bob.parents.contains(&dana.uuid));
    // No direct edge between the siblings.
    assert!(!store
        .tree()
        .edges
        .iter()
        .any(|edge| edge.links(alice.uuid, bob.uuid)));
    assert_eq!(store.tree().edges.len(), 4);
}

#[test]
fn sibling_of_an_orphan_shares_no_parents() {
    let mut store = TreeStore::create("family");
    let alice = store.add_person(named("Alice"), None).expect("add Alice");

    let bob = store
        .add_person(
            named("Bob"),
            Some(RelativeLink::new(RelationshipKind::Sibling, alice.uuid)),
        )
        .expect("add sibling of orphan");

    assert!(bob.parents.is_empty());
    assert!(store.tree().edges.is_empty());
}

#[test]
fn direct_sibling_edges_are_rejected() {
    let mut store = TreeStore::create("family");
    let alice = store.add_person(named("Alice"), None).expect("add Alice");
    let bob = store.add_person(named("Bob"), None).expect("add Bob");

    let error = store
        .add_relationship(alice.uuid, bob.uuid, RelationshipKind::Sibling)
        .expect_err("direct sibling edge must be rejected");

    assert!(matches!(
        error,
        StoreError::Invariant(InvariantViolation::DirectSiblingEdge)
    ));
}

#[test]
fn child_links_normalize_to_parent_facts() {
    let mut store = TreeStore::create("family");
    let alice = store.add_person(named("Alice"), None).expect("add Alice");
    let bob = store.add_person(named("Bob"), None).expect("add Bob");

    // "Alice is a child of Bob" stores as "Bob is parent of Alice".
    let edge = store
        .add_relationship(alice.uuid, bob.uuid, RelationshipKind::Child)
        .expect("child link");

    assert_eq!(edge.kind, RelationshipKind::Parent);
    assert_eq!((edge.source, edge.target), (bob.uuid, alice.uuid));

    // The same fact in either spelling is now a duplicate.
    let error = store
        .add_relationship(bob.uuid, alice.uuid, RelationshipKind::Parent)
        .expect_err("duplicate parent fact");
    assert!(matches!(
        error,
        StoreError::Invariant(InvariantViolation::DuplicateRelationship { .. })
    ));
}

#[test]
fn self_relationships_are_rejected() {
    let mut store = TreeStore::create("family");
    let alice = store.add_person(named("Alice"), None).expect("add Alice");

    let error = store
        .add_relationship(alice.uuid, alice.uuid, RelationshipKind::Partner)
        .expect_err("self edge must be rejected");

    assert!(matches!(
        error,
        StoreError::Invariant(InvariantViolation::SelfRelationship(id)) if id == alice.uuid
    ));
}

#[test]
fn ancestry_cycles_are_rejected() {
    let mut store = TreeStore::create("family");
    let grandparent = store.add_person(named("Ada"), None).expect("add Ada");
    let parent = store
        .add_person(
            named("Byron"),
            Some(RelativeLink::new(RelationshipKind::Child, grandparent.uuid)),
        )
        .expect("add Byron");
    let child = store
        .add_person(
            named("Clara"),
            Some(RelativeLink::new(RelationshipKind::Child, parent.uuid)),
        )
        .expect("add Clara");

    let error = store
        .add_relationship(child.uuid, grandparent.uuid, RelationshipKind::Parent)
        .expect_err("descendant as parent must be rejected");

    assert!(matches!(
        error,
        StoreError::Invariant(InvariantViolation::AncestryCycle { parent, child: c })
            if parent == child.uuid && c == grandparent.uuid
    ));
}

#[test]
fn partner_links_are_symmetric() {
    let mut store = TreeStore::create("family");
    let alice = store.add_person(named("Alice"), None).expect("add Alice");
    let bob = store
        .add_person(
            named("Bob"),
            Some(RelativeLink::new(RelationshipKind::Partner, alice.uuid)),
        )
        .expect("add partner");

    assert!(bob.partners.contains(&alice.uuid));
    let alice_now = store.tree().person(alice.uuid).expect("Alice exists");
    assert!(alice_now.partners.contains(&bob.uuid));
}

#[test]
fn divorced_partner_is_a_distinct_edge() {
    let mut store = TreeStore::create("family");
    let alice = store.add_person(named("Alice"), None).expect("add Alice");
    let bob = store.add_person(named("Bob"), None).expect("add Bob");

    let active = store
        .add_relationship(alice.uuid, bob.uuid, RelationshipKind::Partner)
        .expect("active partner edge");
    let divorced = store
        .add_relationship(alice.uuid, bob.uuid, RelationshipKind::DivorcedPartner)
        .expect("divorced edge coexists");

    assert_ne!(active.uuid, divorced.uuid);
    assert_eq!(store.tree().edges.len(), 2);

    // Membership survives while any partner-like edge remains.
    store
        .remove_relationship(active.uuid)
        .expect("remove active edge");
    let alice_now = store.tree().person(alice.uuid).expect("Alice exists");
    assert!(alice_now.partners.contains(&bob.uuid));

    store
        .remove_relationship(divorced.uuid)
        .expect("remove divorced edge");
    let alice_now = store.tree().person(alice.uuid).expect("Alice exists");
    assert!(!alice_now.partners.contains(&bob.uuid));
}

#[test]
fn duplicate_partner_edges_of_same_kind_are_rejected() {
    let mut store = TreeStore::create("family");
    let alice = store.add_person(named("Alice"), None).expect("add Alice");
    let bob = store.add_person(named("Bob"), None).expect("add Bob");
    store
        .add_relationship(alice.uuid, bob.uuid, RelationshipKind::Partner)
        .expect("first partner edge");

    // Same kind, reversed endpoints: still the same symmetric fact.
    let error = store
        .add_relationship(bob.uuid, alice.uuid, RelationshipKind::Partner)
        .expect_err("duplicate partner edge");

    assert!(matches!(
        error,
        StoreError::Invariant(InvariantViolation::DuplicateRelationship { .. })
    ));
}

#[test]
fn delete_person_cascades_edges_and_references() {
    let mut store = TreeStore::create("family");
    let bob = store.add_person(named("Bob"), None).expect("add Bob");
    let eve = store
        .add_person(
            named("Eve"),
            Some(RelativeLink::new(RelationshipKind::Partner, bob.uuid)),
        )
        .expect("add partner Eve");
    let child = store
        .add_person(
            named("Finn"),
            Some(RelativeLink::new(RelationshipKind::Child, bob.uuid)),
        )
        .expect("add child Finn");

    store.delete_person(bob.uuid).expect("delete Bob");

    assert!(store.tree().person(bob.uuid).is_none());
    assert!(!store.tree().edges.iter().any(|edge| edge.touches(bob.uuid)));
    let eve_now = store.tree().person(eve.uuid).expect("Eve survives");
    assert!(!eve_now.partners.contains(&bob.uuid));
    let child_now = store.tree().person(child.uuid).expect("Finn survives");
    assert!(!child_now.parents.contains(&bob.uuid));
}

#[test]
fn update_person_merges_without_touching_structure() {
    let mut store = TreeStore::create("family");
    let alice = store.add_person(named("Alice"), None).expect("add Alice");
    let carl = store
        .add_person(
            named("Carl"),
            Some(RelativeLink::new(RelationshipKind::Parent, alice.uuid)),
        )
        .expect("add parent");

    let updated = store
        .update_person(
            alice.uuid,
            PersonAttributes {
                occupation: Some("engineer".to_string()),
                date_of_birth: Some("1990-04-01".to_string()),
                ..PersonAttributes::default()
            },
        )
        .expect("update");

    assert_eq!(updated.name, "Alice");
    assert_eq!(updated.occupation, "engineer");
    assert_eq!(updated.date_of_birth.as_deref(), Some("1990-04-01"));
    assert!(updated.parents.contains(&carl.uuid));
}

#[test]
fn blank_names_are_rejected_on_create_and_update() {
    let mut store = TreeStore::create("family");
    let alice = store.add_person(named("Alice"), None).expect("add Alice");

    let create_error = store
        .add_person(named("   "), None)
        .expect_err("blank create");
    assert!(matches!(
        create_error,
        StoreError::Invariant(InvariantViolation::BlankName)
    ));

    let update_error = store
        .update_person(alice.uuid, named("\t"))
        .expect_err("blank update");
    assert!(matches!(
        update_error,
        StoreError::Invariant(InvariantViolation::BlankName)
    ));
}

#[test]
fn move_person_advances_the_revision() {
    let mut store = TreeStore::create("family");
    let alice = store.add_person(named("Alice"), None).expect("add Alice");
    let revision = store.revision();

    store
        .move_person(alice.uuid, Position { x: 40.0, y: -12.5 })
        .expect("move");

    let alice_now = store.tree().person(alice.uuid).expect("Alice exists");
    assert_eq!(alice_now.position, Position { x: 40.0, y: -12.5 });
    assert_eq!(store.revision(), revision + 1);
}

#[test]
fn failed_mutations_do_not_advance_the_revision() {
    let mut store = TreeStore::create("family");
    let alice = store.add_person(named("Alice"), None).expect("add Alice");
    let revision = store.revision();

    let missing = uuid::Uuid::new_v4();
    assert!(store.delete_person(missing).is_err());
    assert!(store
        .add_relationship(alice.uuid, missing, RelationshipKind::Partner)
        .is_err());
    assert!(store.update_person(missing, named("Nobody")).is_err());

    assert_eq!(store.revision(), revision);
}
