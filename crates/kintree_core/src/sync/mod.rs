//! Persistence synchronization between the in-memory store and the
//! durable tree repository.
//!
//! # Responsibility
//! - Queue committed snapshots and drain them to storage in issue order.
//! - Discard stale load results after the active selection changed.
//! - Carry the injected identity capability gating cloud features.
//!
//! # Invariants
//! - A later snapshot can never be overwritten by an earlier one landing
//!   late: writes are ordered by revision, not completion time.
//! - Persistence failures are surfaced as non-fatal warnings; the
//!   in-memory store is never rolled back.

pub mod identity;
pub mod outbox;
pub mod session;
