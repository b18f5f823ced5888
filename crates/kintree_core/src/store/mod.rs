//! In-memory tree state store.
//!
//! # Responsibility
//! - Own the authoritative graph for one open tree.
//! - Expose mutation operations that preserve every structural invariant.
//!
//! # Invariants
//! - Operations validate first and mutate second; a rejected operation
//!   leaves the tree byte-for-byte unchanged.
//! - Every committed mutation bumps the snapshot revision exactly once.

pub mod tree_store;
