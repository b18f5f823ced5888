//! Load-session tracking for tree selection.
//!
//! # Responsibility
//! - Hand out load tickets tied to the current selection generation.
//! - Let late-arriving load results be recognized as stale and dropped.
//!
//! # Invariants
//! - Every `begin` advances the generation, so at most one outstanding
//!   ticket can ever be current.

use crate::model::tree::TreeId;

/// Ticket issued when a tree load starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    tree_uuid: TreeId,
    generation: u64,
}

impl LoadTicket {
    pub fn tree_uuid(&self) -> TreeId {
        self.tree_uuid
    }
}

/// Tracks which tree is currently selected and which load is current.
#[derive(Debug, Default)]
pub struct LoadSession {
    active: Option<TreeId>,
    generation: u64,
}

impl LoadSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `tree_uuid` as the active selection and starts a load.
    pub fn begin(&mut self, tree_uuid: TreeId) -> LoadTicket {
        self.generation += 1;
        self.active = Some(tree_uuid);
        LoadTicket {
            tree_uuid,
            generation: self.generation,
        }
    }

    /// Returns whether a completed load still matches the selection.
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation && self.active == Some(ticket.tree_uuid)
    }

    /// Clears the active selection (tree closed or deleted).
    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<TreeId> {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::LoadSession;
    use uuid::Uuid;

    #[test]
    fn later_begin_invalidates_earlier_ticket() {
        let mut session = LoadSession::new();
        let first = session.begin(Uuid::new_v4());
        let second = session.begin(Uuid::new_v4());

        assert!(!session.is_current(&first));
        assert!(session.is_current(&second));
    }

    #[test]
    fn clear_invalidates_current_ticket() {
        let mut session = LoadSession::new();
        let ticket = session.begin(Uuid::new_v4());

        session.clear();
        assert!(!session.is_current(&ticket));
        assert_eq!(session.active(), None);
    }
}
