//! Integration tests for document validation, import, and export.

use kintree_core::{
    validate_tree, FamilyTree, Person, PersonAttributes, Relationship, RelationshipKind, StoreError,
    TreeStore,
};
use uuid::Uuid;

fn person(name: &str) -> Person {
    Person::new(PersonAttributes::named(name))
}

/// A small valid document: two parents, one child, one partner edge.
fn sample_tree() -> FamilyTree {
    let mut tree = FamilyTree::new("sample");
    let mut carl = person("Carl");
    let mut dana = person("Dana");
    let mut alice = person("Alice");

    carl.children.insert(alice.uuid);
    dana.children.insert(alice.uuid);
    alice.parents.insert(carl.uuid);
    alice.parents.insert(dana.uuid);
    carl.partners.insert(dana.uuid);
    dana.partners.insert(carl.uuid);

    tree.edges
        .push(Relationship::new(carl.uuid, alice.uuid, RelationshipKind::Parent));
    tree.edges
        .push(Relationship::new(dana.uuid, alice.uuid, RelationshipKind::Parent));
    tree.edges
        .push(Relationship::new(carl.uuid, dana.uuid, RelationshipKind::Partner));
    tree.nodes = vec![carl, dana, alice];
    tree
}

#[test]
fn valid_documents_pass_validation() {
    assert!(validate_tree(&sample_tree()).is_ok());
}

#[test]
fn export_import_round_trip_is_loss_free() {
    let store = TreeStore::open(sample_tree()).expect("open sample");
    let json = serde_json::to_string(&store.export_tree()).expect("serialize");

    let decoded: FamilyTree = serde_json::from_str(&json).expect("parse");
    let mut second = TreeStore::create("scratch");
    second.import_tree(decoded).expect("import");

    // Timestamps and ids come from the document, so the trees match
    // exactly.
    assert_eq!(second.tree(), store.tree());
}

#[test]
fn import_bumps_the_revision() {
    let mut store = TreeStore::create("scratch");
    let revision = store.revision();

    store.import_tree(sample_tree()).expect("import");

    assert_eq!(store.revision(), revision + 1);
}

#[test]
fn dangling_edge_reference_is_reported_with_a_pointer() {
    let mut tree = sample_tree();
    tree.edges
        .push(Relationship::new(Uuid::new_v4(), tree.nodes[0].uuid, RelationshipKind::Parent));

    let error = validate_tree(&tree).expect_err("dangling source");
    assert_eq!(error.pointer, "edges[3].source");
    assert!(error.message.contains("unknown person"));
}

#[test]
fn failed_import_keeps_the_previous_tree() {
    let mut store = TreeStore::open(sample_tree()).expect("open sample");
    let before = store.tree().clone();
    let revision = store.revision();

    let mut broken = sample_tree();
    broken.edges[0].target = Uuid::new_v4();

    let error = store.import_tree(broken).expect_err("import must fail");
    assert!(matches!(error, StoreError::Validation(_)));
    assert_eq!(store.tree(), &before);
    assert_eq!(store.revision(), revision);
}

#[test]
fn nil_and_duplicate_person_ids_are_rejected() {
    let mut tree = sample_tree();
    tree.nodes[1].uuid = Uuid::nil();
    let error = validate_tree(&tree).expect_err("nil id");
    assert_eq!(error.pointer, "nodes[1].uuid");

    let mut tree = sample_tree();
    tree.nodes[1].uuid = tree.nodes[0].uuid;
    let error = validate_tree(&tree).expect_err("duplicate id");
    assert_eq!(error.pointer, "nodes[1].uuid");
}

#[test]
fn parent_cap_violations_in_documents_are_rejected() {
    let mut tree = sample_tree();
    let extra = person("Extra");
    let child_id = tree.nodes[2].uuid;
    tree.nodes[2].parents.insert(extra.uuid);
    let mut extra = extra;
    extra.children.insert(child_id);
    tree.edges
        .push(Relationship::new(extra.uuid, child_id, RelationshipKind::Parent));
    tree.nodes.push(extra);

    let error = validate_tree(&tree).expect_err("three parents");
    assert_eq!(error.pointer, "nodes[2].parents");
    assert!(error.message.contains("cap is 2"));
}

#[test]
fn adjacency_set_without_a_backing_edge_is_rejected() {
    let mut tree = sample_tree();
    // Claimed parenthood in the sets with no edge behind it.
    let carl_id = tree.nodes[0].uuid;
    let dana_id = tree.nodes[1].uuid;
    tree.nodes[0].parents.insert(dana_id);
    tree.nodes[1].children.insert(carl_id);

    let error = validate_tree(&tree).expect_err("unbacked parent link");
    assert!(error.pointer.starts_with("nodes[0]"));
}

#[test]
fn edge_without_matching_adjacency_sets_is_rejected() {
    let mut tree = sample_tree();
    let carl_id = tree.nodes[0].uuid;
    let alice_id = tree.nodes[2].uuid;
    tree.nodes[0].children.remove(&alice_id);
    tree.nodes[2].parents.remove(&carl_id);

    let error = validate_tree(&tree).expect_err("unreflected edge");
    assert!(error.pointer.starts_with("edges[0]"));
}

#[test]
fn one_sided_partner_sets_are_rejected() {
    let mut tree = sample_tree();
    let carl_id = tree.nodes[0].uuid;
    tree.nodes[1].partners.remove(&carl_id);

    let error = validate_tree(&tree).expect_err("one-sided partner set");
    assert!(error.pointer.ends_with(".partners"));
    assert!(error.message.contains("not mutual"));
}

#[test]
fn self_edges_in_documents_are_rejected() {
    let mut tree = sample_tree();
    let carl_id = tree.nodes[0].uuid;
    tree.edges[2] = Relationship::new(carl_id, carl_id, RelationshipKind::Partner);

    let error = validate_tree(&tree).expect_err("self edge");
    assert_eq!(error.pointer, "edges[2]");
}

#[test]
fn duplicate_edges_in_documents_are_rejected() {
    let mut tree = sample_tree();
    let duplicate = Relationship::new(
        tree.edges[0].source,
        tree.edges[0].target,
        RelationshipKind::Parent,
    );
    tree.edges.push(duplicate);

    let error = validate_tree(&tree).expect_err("duplicate parent fact");
    assert_eq!(error.pointer, "edges[3]");
    assert!(error.message.contains("duplicate parent link"));
}

#[test]
fn duplicate_partner_edges_in_documents_are_rejected() {
    let mut tree = sample_tree();
    let carl_id = tree.nodes[0].uuid;
    let dana_id = tree.nodes[1].uuid;
    // Reversed endpoints, same kind: the same symmetric fact.
    tree.edges
        .push(Relationship::new(dana_id, carl_id, RelationshipKind::Partner));

    let error = validate_tree(&tree).expect_err("duplicate partner edge");
    assert_eq!(error.pointer, "edges[3]");
    assert!(error.message.contains("duplicate"));
}

#[test]
fn ancestry_cycles_in_documents_are_rejected() {
    let mut tree = FamilyTree::new("looped");
    let mut a = person("Asa");
    let mut b = person("Bela");
    // Mutual parenthood: consistent sets and edges, impossible history.
    a.parents.insert(b.uuid);
    a.children.insert(b.uuid);
    b.parents.insert(a.uuid);
    b.children.insert(a.uuid);
    tree.edges
        .push(Relationship::new(a.uuid, b.uuid, RelationshipKind::Parent));
    tree.edges
        .push(Relationship::new(b.uuid, a.uuid, RelationshipKind::Parent));
    tree.nodes = vec![a, b];

    let error = validate_tree(&tree).expect_err("mutual parents");
    assert!(error.pointer.ends_with(".parents"));
    assert!(error.message.contains("own ancestor"));
    assert!(TreeStore::open(tree).is_err());
}

#[test]
fn opening_a_corrupt_record_fails_validation() {
    let mut tree = sample_tree();
    let alice_id = tree.nodes[2].uuid;
    tree.nodes[2].parents.insert(alice_id);

    let error = TreeStore::open(tree).expect_err("corrupt record");
    assert!(matches!(error, StoreError::Validation(_)));
}
