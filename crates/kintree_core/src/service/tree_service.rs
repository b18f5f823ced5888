//! Tree workspace service.
//!
//! # Responsibility
//! - Own the registry use cases (create, list, rename, delete).
//! - Own the active workspace: one open [`TreeStore`] at a time, with
//!   every mutation committed through the write queue.
//! - Guard tree loads against out-of-order completion so a stale load
//!   never clobbers a newer selection.

use std::fmt;
use std::sync::Arc;

use log::info;

use crate::model::person::{Person, PersonAttributes, PersonId, Position};
use crate::model::relationship::{Relationship, RelationshipId, RelationshipKind};
use crate::model::tree::{FamilyTree, FamilyTreeMeta, FamilyTreeSummary, TreeId};
use crate::repo::tree_repo::{RepoError, TreeRepository};
use crate::store::tree_store::{RelativeLink, StoreError, TreeStore, ValidationError};
use crate::sync::identity::{IdentityProvider, LocalOnlyIdentity};
use crate::sync::outbox::{SyncOutbox, SyncWarning};
use crate::sync::session::{LoadSession, LoadTicket};

/// Errors surfaced by tree workspace use cases.
#[derive(Debug)]
pub enum TreeServiceError {
    /// Tree names must contain at least one non-whitespace character.
    InvalidTreeName,
    /// The operation needs an open workspace and none is active.
    NoActiveTree,
    /// The registry has no record under this id.
    TreeNotFound(TreeId),
    /// An in-memory graph mutation or validation failed.
    Store(StoreError),
    /// The persistence layer failed outside the queued write path.
    Repo(RepoError),
}

impl fmt::Display for TreeServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTreeName => write!(f, "tree name must not be blank"),
            Self::NoActiveTree => write!(f, "no tree is currently open"),
            Self::TreeNotFound(tree_uuid) => write!(f, "tree not found: {tree_uuid}"),
            Self::Store(err) => write!(f, "store error: {err}"),
            Self::Repo(err) => write!(f, "repository error: {err}"),
        }
    }
}

impl std::error::Error for TreeServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for TreeServiceError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<RepoError> for TreeServiceError {
    fn from(err: RepoError) -> Self {
        Self::Repo(err)
    }
}

pub type ServiceResult<T> = Result<T, TreeServiceError>;

/// Use-case facade over the tree registry and the active workspace.
///
/// Generic over [`TreeRepository`] so tests can substitute mock
/// persistence without touching SQLite.
pub struct TreeService<R: TreeRepository> {
    repo: R,
    outbox: SyncOutbox,
    session: LoadSession,
    identity: Arc<dyn IdentityProvider>,
    active: Option<TreeStore>,
    warnings: Vec<SyncWarning>,
}

impl<R: TreeRepository> TreeService<R> {
    /// Creates a service with the local-only identity default.
    pub fn new(repo: R) -> Self {
        Self::with_identity(repo, Arc::new(LocalOnlyIdentity))
    }

    /// Creates a service with an injected identity capability.
    pub fn with_identity(repo: R, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            repo,
            outbox: SyncOutbox::new(),
            session: LoadSession::new(),
            identity,
            active: None,
            warnings: Vec::new(),
        }
    }

    /// Reports whether a remote sync target could be attached.
    ///
    /// Persistence itself never depends on this; it only gates
    /// account-scoped features in outer layers.
    pub fn cloud_sync_available(&self) -> bool {
        self.identity.is_signed_in()
    }

    // ---- registry -------------------------------------------------

    /// Lists registry summaries, most recently updated first.
    pub fn list_trees(&self) -> ServiceResult<Vec<FamilyTreeSummary>> {
        Ok(self.repo.list_trees()?)
    }

    /// Creates and persists a new empty tree without opening it.
    pub fn create_tree(&mut self, name: &str) -> ServiceResult<FamilyTreeMeta> {
        let name = normalize_tree_name(name)?;
        let tree = FamilyTree::new(name);
        self.repo.save_tree(&tree)?;
        info!(
            "event=tree_create module=tree_service status=ok tree_uuid={}",
            tree.uuid
        );
        Ok(tree.meta())
    }

    /// Marks a tree as the pending selection and returns the ticket a
    /// later [`finish_open`](Self::finish_open) must present.
    ///
    /// Splitting open into two phases lets a caller that loads
    /// concurrently discard results that were overtaken by a newer
    /// selection.
    pub fn begin_open(&mut self, tree_uuid: TreeId) -> LoadTicket {
        self.session.begin(tree_uuid)
    }

    /// Completes a pending open.
    ///
    /// Returns `Ok(None)` when the ticket was overtaken by a newer
    /// `begin_open` or by `delete_tree`, in which case the loaded data
    /// is discarded and the workspace is left untouched. A missing
    /// record is not an error: an empty tree is synthesized under the
    /// requested id and becomes durable on its first mutation.
    pub fn finish_open(&mut self, ticket: LoadTicket) -> ServiceResult<Option<FamilyTreeMeta>> {
        let tree_uuid = ticket.tree_uuid();
        let loaded = self.repo.load_tree(tree_uuid)?;

        if !self.session.is_current(&ticket) {
            info!(
                "event=tree_open module=tree_service status=stale_discard tree_uuid={tree_uuid}"
            );
            return Ok(None);
        }

        let tree = loaded.unwrap_or_else(|| FamilyTree::with_id(tree_uuid, "Untitled tree"));
        let store = TreeStore::open(tree)?;
        let meta = store.tree().meta();

        // Revision numbering restarts per open; stale queue bookkeeping
        // from an earlier session of the same tree must not mask it.
        self.outbox.forget(tree_uuid);
        self.active = Some(store);
        info!(
            "event=tree_open module=tree_service status=ok tree_uuid={tree_uuid} signed_in={}",
            self.identity.is_signed_in()
        );
        Ok(Some(meta))
    }

    /// Opens a tree in one step (no concurrent loads to race against).
    pub fn open_tree(&mut self, tree_uuid: TreeId) -> ServiceResult<FamilyTreeMeta> {
        let ticket = self.begin_open(tree_uuid);
        match self.finish_open(ticket)? {
            Some(meta) => Ok(meta),
            // Unreachable without an interleaved begin_open.
            None => Err(TreeServiceError::TreeNotFound(tree_uuid)),
        }
    }

    /// Renames a tree, whether or not it is the active one.
    pub fn rename_tree(&mut self, tree_uuid: TreeId, name: &str) -> ServiceResult<()> {
        let name = normalize_tree_name(name)?;

        if let Some(store) = self.active.as_mut() {
            if store.tree().uuid == tree_uuid {
                store.rename(name)?;
                self.commit_active();
                return Ok(());
            }
        }

        let mut tree = self
            .repo
            .load_tree(tree_uuid)?
            .ok_or(TreeServiceError::TreeNotFound(tree_uuid))?;
        tree.name = name;
        tree.touch();
        self.repo.save_tree(&tree)?;
        info!("event=tree_rename module=tree_service status=ok tree_uuid={tree_uuid}");
        Ok(())
    }

    /// Deletes a tree record; deleting an absent record is a no-op.
    ///
    /// When the deleted tree is the active workspace it is closed, and
    /// any pending ticket for it is invalidated.
    pub fn delete_tree(&mut self, tree_uuid: TreeId) -> ServiceResult<()> {
        self.repo.delete_tree(tree_uuid)?;
        self.outbox.forget(tree_uuid);

        if self
            .active
            .as_ref()
            .is_some_and(|store| store.tree().uuid == tree_uuid)
        {
            self.active = None;
        }
        if self.session.active() == Some(tree_uuid) {
            self.session.clear();
        }

        info!("event=tree_delete module=tree_service status=ok tree_uuid={tree_uuid}");
        Ok(())
    }

    // ---- active workspace -----------------------------------------

    /// The currently open tree, if any.
    pub fn active_tree(&self) -> Option<&FamilyTree> {
        self.active.as_ref().map(TreeStore::tree)
    }

    /// Revision counter of the active workspace.
    pub fn active_revision(&self) -> Option<u64> {
        self.active.as_ref().map(TreeStore::revision)
    }

    /// Adds a person, optionally wired to an existing relative.
    pub fn add_person(
        &mut self,
        attrs: PersonAttributes,
        link: Option<RelativeLink>,
    ) -> ServiceResult<Person> {
        let store = self.active.as_mut().ok_or(TreeServiceError::NoActiveTree)?;
        let person = store.add_person(attrs, link)?;
        self.commit_active();
        Ok(person)
    }

    /// Merges attribute changes into an existing person.
    pub fn update_person(
        &mut self,
        person_id: PersonId,
        attrs: PersonAttributes,
    ) -> ServiceResult<Person> {
        let store = self.active.as_mut().ok_or(TreeServiceError::NoActiveTree)?;
        let person = store.update_person(person_id, attrs)?;
        self.commit_active();
        Ok(person)
    }

    /// Records a layout position change.
    pub fn move_person(&mut self, person_id: PersonId, position: Position) -> ServiceResult<()> {
        let store = self.active.as_mut().ok_or(TreeServiceError::NoActiveTree)?;
        store.move_person(person_id, position)?;
        self.commit_active();
        Ok(())
    }

    /// Removes a person and every edge and reference to them.
    pub fn delete_person(&mut self, person_id: PersonId) -> ServiceResult<()> {
        let store = self.active.as_mut().ok_or(TreeServiceError::NoActiveTree)?;
        store.delete_person(person_id)?;
        self.commit_active();
        Ok(())
    }

    /// Links two existing persons with a typed edge.
    pub fn add_relationship(
        &mut self,
        source: PersonId,
        target: PersonId,
        kind: RelationshipKind,
    ) -> ServiceResult<Relationship> {
        let store = self.active.as_mut().ok_or(TreeServiceError::NoActiveTree)?;
        let edge = store.add_relationship(source, target, kind)?;
        self.commit_active();
        Ok(edge)
    }

    /// Removes one edge and reconciles the adjacency sets.
    pub fn remove_relationship(&mut self, relationship_id: RelationshipId) -> ServiceResult<()> {
        let store = self.active.as_mut().ok_or(TreeServiceError::NoActiveTree)?;
        store.remove_relationship(relationship_id)?;
        self.commit_active();
        Ok(())
    }

    // ---- import / export ------------------------------------------

    /// Replaces the active tree with a parsed and validated document.
    ///
    /// The previous tree stays active when parsing or validation fails.
    pub fn import_tree_json(&mut self, raw: &str) -> ServiceResult<FamilyTreeMeta> {
        let store = self.active.as_mut().ok_or(TreeServiceError::NoActiveTree)?;
        let tree: FamilyTree = serde_json::from_str(raw).map_err(|err| {
            StoreError::Validation(ValidationError::new("document", err.to_string()))
        })?;
        store.import_tree(tree)?;
        let meta = store.tree().meta();
        // The document carries its own id; queue bookkeeping under that
        // id may belong to an earlier store with different revision
        // numbering.
        self.outbox.forget(meta.uuid);
        self.session.begin(meta.uuid);
        self.commit_active();
        info!(
            "event=tree_import module=tree_service status=ok tree_uuid={}",
            meta.uuid
        );
        Ok(meta)
    }

    /// Serializes the active tree to a portable JSON document.
    pub fn export_tree_json(&self) -> ServiceResult<String> {
        let store = self.active.as_ref().ok_or(TreeServiceError::NoActiveTree)?;
        serde_json::to_string_pretty(store.tree())
            .map_err(|err| TreeServiceError::Repo(RepoError::Snapshot(err)))
    }

    // ---- persistence ----------------------------------------------

    /// Retries queued writes, for example after a transient failure.
    pub fn save(&mut self) -> ServiceResult<()> {
        self.commit_active();
        Ok(())
    }

    /// Number of writes still waiting in the queue.
    pub fn pending_writes(&self) -> usize {
        self.outbox.pending_len()
    }

    /// Drains warnings accumulated by failed queued writes.
    pub fn take_warnings(&mut self) -> Vec<SyncWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Queues the active snapshot and flushes the queue.
    ///
    /// Failures never unwind the in-memory mutation; they surface as
    /// warnings, and the unpersisted revision is re-queued by the next
    /// commit or explicit save.
    fn commit_active(&mut self) {
        let Some(store) = self.active.as_ref() else {
            return;
        };
        self.outbox.enqueue(store.snapshot());
        let warnings = self.outbox.flush(&self.repo);
        self.warnings.extend(warnings);
    }
}

fn normalize_tree_name(value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TreeServiceError::InvalidTreeName);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_names_are_trimmed() {
        assert_eq!(normalize_tree_name("  Smith family ").unwrap(), "Smith family");
    }

    #[test]
    fn blank_tree_names_are_rejected() {
        assert!(matches!(
            normalize_tree_name("   "),
            Err(TreeServiceError::InvalidTreeName)
        ));
    }
}
