//! # Registration
//!
//! The cadastro page as a whole: the group section plus the members added so
//! far. Saving is gated on having at least one member.

use crate::pending::{PendingId, PendingMembers};
use crate::primitives::MAX_PENDING_MEMBERS;
use crate::types::{CadastroError, GroupId, MemberDraft, NewGroup, NewMember, UserId};
use crate::validation::{GroupForm, MemberForm};

/// A registration being filled in.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    /// The group section, validated on submit.
    pub group: GroupForm,
    members: PendingMembers,
}

impl Registration {
    /// Start a registration with the given group section and no members.
    #[must_use]
    pub fn new(group: GroupForm) -> Self {
        Self {
            group,
            members: PendingMembers::new(),
        }
    }

    /// Validate a member form and append it to the pending list.
    pub fn add_member(&mut self, form: &MemberForm) -> Result<PendingId, CadastroError> {
        let draft = form.validate()?;
        self.push_draft(draft)
    }

    /// Append an already validated draft.
    pub fn push_draft(&mut self, draft: MemberDraft) -> Result<PendingId, CadastroError> {
        if self.members.len() >= MAX_PENDING_MEMBERS {
            return Err(CadastroError::TooManyMembers(MAX_PENDING_MEMBERS));
        }
        Ok(self.members.add(draft))
    }

    /// Drop a pending member.
    pub fn remove_member(&mut self, id: PendingId) -> Option<MemberDraft> {
        self.members.remove(id)
    }

    /// The pending members.
    #[must_use]
    pub fn members(&self) -> &PendingMembers {
        &self.members
    }

    /// The save button is enabled only with at least one member.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.members.is_empty()
    }

    /// Validate the group section into its insert payload.
    ///
    /// Fails with `NoMembers` before looking at the form if the member list
    /// is empty.
    pub fn to_new_group(&self, user_id: UserId) -> Result<NewGroup, CadastroError> {
        if !self.can_submit() {
            return Err(CadastroError::NoMembers);
        }
        self.group.validate(user_id)
    }

    /// Batch payload for the members, referencing the saved group.
    #[must_use]
    pub fn to_new_members(&self, group_id: &GroupId) -> Vec<NewMember> {
        self.members
            .drafts()
            .map(|d| d.for_group(group_id))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration::new(GroupForm {
            name: Some("Horta Comunitária".into()),
            representative_name: Some("Carla".into()),
            contact_email: Some("carla@horta.org".into()),
            ..GroupForm::default()
        })
    }

    fn member(name: &str) -> MemberForm {
        MemberForm {
            full_name: Some(name.into()),
            cpf: Some("529.982.247-25".into()),
            ..MemberForm::default()
        }
    }

    #[test]
    fn cannot_submit_without_members() {
        let reg = registration();
        assert!(!reg.can_submit());
        assert!(matches!(
            reg.to_new_group(UserId::new("u1")),
            Err(CadastroError::NoMembers)
        ));
    }

    #[test]
    fn submit_after_member_added() {
        let mut reg = registration();
        reg.add_member(&member("Ana")).expect("valid member");
        assert!(reg.can_submit());
        let group = reg.to_new_group(UserId::new("u1")).expect("valid group");
        assert_eq!(group.user_id.as_str(), "u1");
    }

    #[test]
    fn invalid_member_not_added() {
        let mut reg = registration();
        let bad = MemberForm {
            cpf: Some("000.000.000-01".into()),
            ..member("Ana")
        };
        assert!(reg.add_member(&bad).is_err());
        assert!(reg.members().is_empty());
    }

    #[test]
    fn members_reference_group() {
        let mut reg = registration();
        reg.add_member(&member("Ana")).expect("valid");
        reg.add_member(&member("Bia")).expect("valid");
        let rows = reg.to_new_members(&GroupId::new("g9"));
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.group_id.as_str() == "g9"));
    }

    #[test]
    fn removing_last_member_disables_submit() {
        let mut reg = registration();
        let id = reg.add_member(&member("Ana")).expect("valid");
        reg.remove_member(id);
        assert!(!reg.can_submit());
    }

    #[test]
    fn member_limit() {
        let mut reg = registration();
        let draft = member("Ana").validate().expect("valid");
        for _ in 0..MAX_PENDING_MEMBERS {
            reg.push_draft(draft.clone()).expect("under limit");
        }
        assert!(matches!(
            reg.push_draft(draft),
            Err(CadastroError::TooManyMembers(_))
        ));
    }
}
