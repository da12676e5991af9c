//! # Pending Members
//!
//! Members captured on the cadastro page before the group is saved.
//!
//! The list is volatile, owned by one page, and discarded on navigation.
//! Each entry gets a local identifier that is only meaningful inside the
//! list; the backend assigns the real member id on insert.

use crate::types::MemberDraft;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Local identifier of a pending member.
///
/// Identifiers are issued from a per-list counter and never reused, so a
/// stale id can never remove a later entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingId(pub u64);

impl fmt::Display for PendingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A member waiting to be submitted, tagged with its local id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMember {
    pub id: PendingId,
    #[serde(flatten)]
    pub draft: MemberDraft,
}

/// Ordered list of pending members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingMembers {
    entries: Vec<PendingMember>,
    next_id: u64,
}

impl PendingMembers {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a member and return its local id.
    pub fn add(&mut self, draft: MemberDraft) -> PendingId {
        let id = PendingId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.entries.push(PendingMember { id, draft });
        id
    }

    /// Remove the member with `id`. Unknown ids leave the list untouched.
    pub fn remove(&mut self, id: PendingId) -> Option<MemberDraft> {
        let pos = self.entries.iter().position(|m| m.id == id)?;
        Some(self.entries.remove(pos).draft)
    }

    /// Look up a pending member.
    #[must_use]
    pub fn get(&self, id: PendingId) -> Option<&MemberDraft> {
        self.entries.iter().find(|m| m.id == id).map(|m| &m.draft)
    }

    /// Number of pending members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no member has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingMember> {
        self.entries.iter()
    }

    /// The drafts alone, in insertion order.
    pub fn drafts(&self) -> impl Iterator<Item = &MemberDraft> {
        self.entries.iter().map(|m| &m.draft)
    }

    /// Drop every entry. Ids keep counting from where they were.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl FromIterator<MemberDraft> for PendingMembers {
    fn from_iter<I: IntoIterator<Item = MemberDraft>>(iter: I) -> Self {
        let mut list = Self::new();
        for draft in iter {
            list.add(draft);
        }
        list
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str) -> MemberDraft {
        MemberDraft {
            full_name: name.to_string(),
            cpf: "52998224725".to_string(),
            ..MemberDraft::default()
        }
    }

    #[test]
    fn add_then_remove_restores_entries() {
        let mut list: PendingMembers = [draft("a"), draft("b")].into_iter().collect();
        let before: Vec<_> = list.iter().cloned().collect();

        let id = list.add(draft("c"));
        assert_eq!(list.len(), 3);
        assert_eq!(list.remove(id).map(|d| d.full_name), Some("c".into()));

        let after: Vec<_> = list.iter().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn ids_are_not_reused() {
        let mut list = PendingMembers::new();
        let a = list.add(draft("a"));
        list.remove(a);
        let b = list.add(draft("b"));
        assert_ne!(a, b);
        assert!(list.remove(a).is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut list = PendingMembers::new();
        list.add(draft("a"));
        assert!(list.remove(PendingId(99)).is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn remove_keeps_order() {
        let mut list = PendingMembers::new();
        list.add(draft("a"));
        let b = list.add(draft("b"));
        list.add(draft("c"));
        list.remove(b);
        let names: Vec<_> = list.drafts().map(|d| d.full_name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn clear_empties() {
        let mut list = PendingMembers::new();
        let a = list.add(draft("a"));
        list.clear();
        assert!(list.is_empty());
        assert!(list.get(a).is_none());
    }
}
