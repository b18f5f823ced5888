//! Snapshot write queue (outbox) for tree persistence.
//!
//! # Responsibility
//! - Collect committed snapshots and persist them in issue order.
//! - Skip redundant writes: a snapshot whose revision is not newer than
//!   the last persisted revision for its tree is dropped.
//! - Convert write failures into non-fatal warnings.
//!
//! # Invariants
//! - FIFO drain plus the revision guard gives per-tree last-write-wins
//!   by issue order, never by completion order.
//! - A failed write does not advance the persisted revision, so an
//!   explicit save or any later mutation retries naturally.

use crate::model::tree::TreeId;
use crate::repo::tree_repo::TreeRepository;
use crate::store::tree_store::TreeSnapshot;
use log::{error, info};
use std::collections::{BTreeMap, VecDeque};
use std::fmt::{Display, Formatter};

/// One queued full-snapshot write.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub tree_uuid: TreeId,
    pub revision: u64,
    snapshot: TreeSnapshot,
}

/// Non-fatal persistence failure surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncWarning {
    pub tree_uuid: TreeId,
    pub revision: u64,
    pub message: String,
}

impl Display for SyncWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to persist tree {} at revision {}: {}",
            self.tree_uuid, self.revision, self.message
        )
    }
}

/// Per-tree write queue with monotonic revision bookkeeping.
#[derive(Debug, Default)]
pub struct SyncOutbox {
    pending: VecDeque<PendingWrite>,
    last_persisted: BTreeMap<TreeId, u64>,
}

impl SyncOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a committed snapshot for persistence.
    ///
    /// Returns `false` when the write is redundant: the revision is
    /// already persisted, or an equal-or-newer write for the same tree
    /// is already queued (re-render with no edits).
    pub fn enqueue(&mut self, snapshot: TreeSnapshot) -> bool {
        let tree_uuid = snapshot.tree.uuid;
        let revision = snapshot.revision;

        if self
            .last_persisted
            .get(&tree_uuid)
            .is_some_and(|persisted| revision <= *persisted)
        {
            return false;
        }
        let already_queued = self
            .pending
            .iter()
            .any(|write| write.tree_uuid == tree_uuid && write.revision >= revision);
        if already_queued {
            return false;
        }

        self.pending.push_back(PendingWrite {
            tree_uuid,
            revision,
            snapshot,
        });
        true
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Last revision known to have reached storage for one tree.
    pub fn last_persisted(&self, tree_uuid: TreeId) -> Option<u64> {
        self.last_persisted.get(&tree_uuid).copied()
    }

    /// Drains the queue in issue order, persisting each write.
    ///
    /// Writes overtaken by an already-persisted newer revision are
    /// skipped. Failures are logged and returned as warnings; draining
    /// continues so one bad write cannot wedge the queue.
    pub fn flush<R: TreeRepository>(&mut self, repo: &R) -> Vec<SyncWarning> {
        let mut warnings = Vec::new();
        while let Some(write) = self.pending.pop_front() {
            let overtaken = self
                .last_persisted
                .get(&write.tree_uuid)
                .is_some_and(|persisted| write.revision <= *persisted);
            if overtaken {
                info!(
                    "event=tree_persist module=sync status=skipped tree={} revision={}",
                    write.tree_uuid, write.revision
                );
                continue;
            }

            match repo.save_tree(&write.snapshot.tree) {
                Ok(()) => {
                    self.last_persisted.insert(write.tree_uuid, write.revision);
                    info!(
                        "event=tree_persist module=sync status=ok tree={} revision={}",
                        write.tree_uuid, write.revision
                    );
                }
                Err(err) => {
                    error!(
                        "event=tree_persist module=sync status=error tree={} revision={} error={err}",
                        write.tree_uuid, write.revision
                    );
                    warnings.push(SyncWarning {
                        tree_uuid: write.tree_uuid,
                        revision: write.revision,
                        message: err.to_string(),
                    });
                }
            }
        }
        warnings
    }

    /// Drops all bookkeeping for one tree (used on tree deletion).
    pub fn forget(&mut self, tree_uuid: TreeId) {
        self.pending.retain(|write| write.tree_uuid != tree_uuid);
        self.last_persisted.remove(&tree_uuid);
    }
}
