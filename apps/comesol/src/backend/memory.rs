//! # In-Memory Backend
//!
//! An in-process stand-in for the hosted backend. Users are seeded up front;
//! sessions are opaque counter-based tokens. Row visibility mirrors the
//! hosted row-level policy: a session only sees its own user's groups and
//! their members.
//!
//! Switches let tests exercise failure paths:
//! - `set_offline`: every call fails as if the backend were unreachable
//! - `set_fail_group_lookup`: only the group lookup fails
//! - `fail_next_member_insert`: the next member batch is rejected

use super::{AuthSession, AuthUser, Backend, BackendError};
use async_trait::async_trait;
use comesol_core::{Group, GroupId, Member, MemberId, NewGroup, NewMember, UserId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

const MEMORY_URL: &str = "memory://comesol";

#[derive(Debug)]
struct Account {
    password: String,
    user: AuthUser,
}

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<String, Account>,
    sessions: BTreeMap<String, UserId>,
    groups: Vec<Group>,
    members: Vec<Member>,
    next_id: u64,
}

impl Tables {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id = self.next_id.saturating_add(1);
        format!("{prefix}-{}", self.next_id)
    }

    fn session_user(&self, token: &str) -> Result<UserId, BackendError> {
        self.sessions
            .get(token)
            .cloned()
            .ok_or(BackendError::Unauthorized)
    }

    fn add_account(&mut self, email: &str, password: &str) -> UserId {
        let id = UserId::new(self.next("user"));
        self.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: AuthUser {
                    id: id.clone(),
                    email: Some(email.to_string()),
                },
            },
        );
        id
    }

    fn owns_group(&self, user: &UserId, group_id: &GroupId) -> bool {
        self.groups
            .iter()
            .any(|g| &g.id == group_id && &g.user_id == user)
    }
}

/// In-process backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    offline: AtomicBool,
    fail_group_lookup: AtomicBool,
    fail_member_insert: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend with no accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend with one account.
    pub fn with_user(email: &str, password: &str) -> Self {
        let mut tables = Tables::default();
        tables.add_account(email, password);
        Self {
            tables: RwLock::new(tables),
            ..Self::default()
        }
    }

    /// Add an account and return its user id.
    pub async fn seed_user(&self, email: &str, password: &str) -> UserId {
        self.tables.write().await.add_account(email, password)
    }

    /// Simulate the backend being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make group lookups fail while everything else works.
    pub fn set_fail_group_lookup(&self, fail: bool) {
        self.fail_group_lookup.store(fail, Ordering::SeqCst);
    }

    /// Reject the next member batch, once.
    pub fn fail_next_member_insert(&self) {
        self.fail_member_insert.store(true, Ordering::SeqCst);
    }

    /// Number of stored groups, across all users.
    pub async fn group_count(&self) -> usize {
        self.tables.read().await.groups.len()
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }

    fn reachable(&self) -> Result<(), BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(BackendError::ConnectionFailed(MEMORY_URL.to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        self.reachable()?;
        let mut tables = self.tables.write().await;
        let user = match tables.accounts.get(email) {
            Some(account) if account.password == password => account.user.clone(),
            _ => return Err(BackendError::Unauthorized),
        };
        let token = tables.next("token");
        tables.sessions.insert(token.clone(), user.id.clone());
        Ok(AuthSession {
            access_token: token,
            refresh_token: None,
            expires_in: Some(3600),
            user,
        })
    }

    fn oauth_authorize_url(&self, provider: &str, redirect_to: &str) -> Result<String, BackendError> {
        reqwest::Url::parse_with_params(
            &format!("{MEMORY_URL}/authorize"),
            &[("provider", provider), ("redirect_to", redirect_to)],
        )
        .map(String::from)
        .map_err(|e| BackendError::ParseError(e.to_string()))
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        self.reachable()?;
        let tables = self.tables.read().await;
        let id = tables.session_user(access_token)?;
        tables
            .accounts
            .values()
            .find(|a| a.user.id == id)
            .map(|a| a.user.clone())
            .ok_or(BackendError::Unauthorized)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        self.reachable()?;
        let mut tables = self.tables.write().await;
        tables
            .sessions
            .remove(access_token)
            .map(|_| ())
            .ok_or(BackendError::Unauthorized)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.reachable()
    }

    async fn find_groups_by_user(
        &self,
        access_token: &str,
        user_id: &UserId,
    ) -> Result<Vec<Group>, BackendError> {
        self.reachable()?;
        if self.fail_group_lookup.load(Ordering::SeqCst) {
            return Err(BackendError::Status(500, "group lookup failed".to_string()));
        }
        let tables = self.tables.read().await;
        let caller = tables.session_user(access_token)?;
        Ok(tables
            .groups
            .iter()
            .filter(|g| &g.user_id == user_id && g.user_id == caller)
            .take(1)
            .cloned()
            .collect())
    }

    async fn insert_group(
        &self,
        access_token: &str,
        group: &NewGroup,
    ) -> Result<Group, BackendError> {
        self.reachable()?;
        let mut tables = self.tables.write().await;
        let caller = tables.session_user(access_token)?;
        if caller != group.user_id {
            return Err(BackendError::Unauthorized);
        }
        let id = GroupId::new(tables.next("group"));
        let row = group
            .clone()
            .into_group(id, Some(chrono::Utc::now().to_rfc3339()));
        tables.groups.push(row.clone());
        Ok(row)
    }

    async fn delete_group(&self, access_token: &str, group_id: &GroupId) -> Result<(), BackendError> {
        self.reachable()?;
        let mut tables = self.tables.write().await;
        let caller = tables.session_user(access_token)?;
        if !tables.owns_group(&caller, group_id) {
            return Err(BackendError::NotFound(format!("group {group_id}")));
        }
        tables.members.retain(|m| &m.group_id != group_id);
        tables.groups.retain(|g| &g.id != group_id);
        Ok(())
    }

    async fn list_members(
        &self,
        access_token: &str,
        group_id: &GroupId,
    ) -> Result<Vec<Member>, BackendError> {
        self.reachable()?;
        let tables = self.tables.read().await;
        let caller = tables.session_user(access_token)?;
        if !tables.owns_group(&caller, group_id) {
            return Ok(Vec::new());
        }
        Ok(tables
            .members
            .iter()
            .filter(|m| &m.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn insert_members(
        &self,
        access_token: &str,
        members: &[NewMember],
    ) -> Result<Vec<Member>, BackendError> {
        self.reachable()?;
        if self.fail_member_insert.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Status(500, "member insert failed".to_string()));
        }
        let mut tables = self.tables.write().await;
        let caller = tables.session_user(access_token)?;
        // All-or-nothing, like a single batch insert.
        if let Some(bad) = members
            .iter()
            .find(|m| !tables.owns_group(&caller, &m.group_id))
        {
            return Err(BackendError::Status(
                409,
                format!("group {} does not exist", bad.group_id),
            ));
        }
        let mut inserted = Vec::with_capacity(members.len());
        for m in members {
            let id = MemberId::new(tables.next("member"));
            inserted.push(m.clone().into_member(id));
        }
        tables.members.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn delete_member(
        &self,
        access_token: &str,
        group_id: &GroupId,
        member_id: &MemberId,
    ) -> Result<(), BackendError> {
        self.reachable()?;
        let mut tables = self.tables.write().await;
        let caller = tables.session_user(access_token)?;
        if !tables.owns_group(&caller, group_id) {
            return Err(BackendError::NotFound(format!("member {member_id}")));
        }
        let before = tables.members.len();
        tables
            .members
            .retain(|m| !(&m.id == member_id && &m.group_id == group_id));
        if tables.members.len() == before {
            return Err(BackendError::NotFound(format!("member {member_id}")));
        }
        Ok(())
    }

    async fn touch_group(
        &self,
        access_token: &str,
        group_id: &GroupId,
        updated_at: &str,
    ) -> Result<Group, BackendError> {
        self.reachable()?;
        let mut tables = self.tables.write().await;
        let caller = tables.session_user(access_token)?;
        let group = tables
            .groups
            .iter_mut()
            .find(|g| &g.id == group_id && g.user_id == caller)
            .ok_or_else(|| BackendError::NotFound(format!("group {group_id}")))?;
        group.updated_at = Some(updated_at.to_string());
        Ok(group.clone())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn signed_in() -> (MemoryBackend, AuthSession) {
        let backend = MemoryBackend::with_user("ana@coop.org", "secret");
        let session = backend
            .sign_in_with_password("ana@coop.org", "secret")
            .await
            .expect("sign in");
        (backend, session)
    }

    fn new_group(user: &UserId) -> NewGroup {
        NewGroup {
            user_id: user.clone(),
            name: "Coop".into(),
            representative_name: "Ana".into(),
            contact_email: "ana@coop.org".into(),
            has_headquarters: false,
            address: None,
        }
    }

    #[tokio::test]
    async fn wrong_password_rejected() {
        let backend = MemoryBackend::with_user("ana@coop.org", "secret");
        let err = backend
            .sign_in_with_password("ana@coop.org", "nope")
            .await
            .expect_err("bad password");
        assert_eq!(err, BackendError::Unauthorized);
    }

    #[tokio::test]
    async fn groups_scoped_to_session() {
        let (backend, session) = signed_in().await;
        let other = backend.seed_user("bia@coop.org", "pw").await;
        backend
            .insert_group(&session.access_token, &new_group(&session.user.id))
            .await
            .expect("insert");

        let own = backend
            .find_groups_by_user(&session.access_token, &session.user.id)
            .await
            .expect("lookup");
        assert_eq!(own.len(), 1);

        let foreign = backend
            .find_groups_by_user(&session.access_token, &other)
            .await
            .expect("lookup");
        assert!(foreign.is_empty());
    }

    #[tokio::test]
    async fn cannot_insert_group_for_someone_else() {
        let (backend, session) = signed_in().await;
        let other = backend.seed_user("bia@coop.org", "pw").await;
        let err = backend
            .insert_group(&session.access_token, &new_group(&other))
            .await
            .expect_err("foreign user");
        assert_eq!(err, BackendError::Unauthorized);
    }

    #[tokio::test]
    async fn delete_group_removes_its_members() {
        let (backend, session) = signed_in().await;
        let token = session.access_token.as_str();
        let group = backend
            .insert_group(token, &new_group(&session.user.id))
            .await
            .expect("insert");
        let member = NewMember {
            group_id: group.id.clone(),
            data: comesol_core::MemberDraft {
                full_name: "Ana".into(),
                cpf: "52998224725".into(),
                ..comesol_core::MemberDraft::default()
            },
        };
        backend
            .insert_members(token, &[member])
            .await
            .expect("members");

        backend.delete_group(token, &group.id).await.expect("delete");
        assert_eq!(backend.group_count().await, 0);
        assert!(backend.list_members(token, &group.id).await.expect("list").is_empty());
        assert!(matches!(
            backend.delete_group(token, &group.id).await,
            Err(BackendError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn member_insert_failure_fires_once() {
        let (backend, session) = signed_in().await;
        let token = session.access_token.as_str();
        backend.fail_next_member_insert();
        assert!(matches!(
            backend.insert_members(token, &[]).await,
            Err(BackendError::Status(500, _))
        ));
        assert!(backend.insert_members(token, &[]).await.is_ok());
    }

    #[tokio::test]
    async fn offline_fails_everything() {
        let (backend, session) = signed_in().await;
        backend.set_offline(true);
        assert!(matches!(
            backend.ping().await,
            Err(BackendError::ConnectionFailed(_))
        ));
        assert!(backend.get_user(&session.access_token).await.is_err());
    }

    #[tokio::test]
    async fn sign_out_invalidates_token() {
        let (backend, session) = signed_in().await;
        backend
            .sign_out(&session.access_token)
            .await
            .expect("sign out");
        assert_eq!(
            backend.get_user(&session.access_token).await,
            Err(BackendError::Unauthorized)
        );
    }
}
