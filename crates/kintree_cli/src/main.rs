//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `kintree_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use kintree_core::{
    open_db_in_memory, PersonAttributes, RelationshipKind, RelativeLink, SqliteTreeRepository,
    TreeService,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("kintree_core ping={}", kintree_core::ping());
    println!("kintree_core version={}", kintree_core::core_version());

    // End-to-end probe: one tree, two persons, persisted and re-read.
    let conn = open_db_in_memory()?;
    let repo = SqliteTreeRepository::try_new(&conn)?;
    let mut service = TreeService::new(repo);

    let meta = service.create_tree("smoke")?;
    service.open_tree(meta.uuid)?;
    let parent = service.add_person(PersonAttributes::named("Ada"), None)?;
    service.add_person(
        PersonAttributes::named("Byron"),
        Some(RelativeLink::new(RelationshipKind::Child, parent.uuid)),
    )?;

    for summary in service.list_trees()? {
        println!(
            "tree uuid={} name={} updated_at={}",
            summary.uuid, summary.name, summary.updated_at
        );
    }
    println!("pending_writes={}", service.pending_writes());
    Ok(())
}
