//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the durable tree-record contract consumed by the
//!   synchronizer and the registry.
//! - Isolate SQLite query and serialization details from the rest of
//!   core.
//!
//! # Invariants
//! - Records round-trip without serialization loss: dates stay ISO
//!   strings, timestamps stay epoch milliseconds.
//! - Repository APIs return semantic errors (`InvalidData`) in addition
//!   to DB transport errors.

pub mod tree_repo;
