//! # Registration Service
//!
//! The cadastro flow on top of a [`Backend`]:
//!
//! ```text
//! login ──► group lookup ──► /cadastro      (no group)
//!                       ├──► /visualizacao  (group found)
//!                       └──► lookup failed  (retryable, stays on login)
//! ```
//!
//! The service holds no per-user state. Every operation takes the caller's
//! access token and resolves the user through the backend, so one instance
//! is shared by all requests.

use crate::backend::{AuthSession, AuthUser, Backend, BackendError};
use comesol_core::{
    CadastroError, Destination, Group, GroupId, GroupLookup, Member, MemberId, Registration,
    RouteDecision, guard_protected, guard_view, route_after_auth,
};
use serde::Serialize;
use std::sync::Arc;

/// OAuth provider offered on the login page.
pub const OAUTH_PROVIDER: &str = "google";

// =============================================================================
// OUTCOMES
// =============================================================================

/// A successful login and where it leads.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub session: AuthSession,
    pub decision: RouteDecision,
}

/// A registration that was written to the backend.
#[derive(Debug, Clone, Serialize)]
pub struct SavedRegistration {
    pub group: Group,
    pub members: Vec<Member>,
    pub destination: Destination,
}

/// What the view page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome {
    /// The user's group and its members.
    Loaded { group: Group, members: Vec<Member> },
    /// No group to show; go elsewhere.
    Redirect(RouteDecision),
}

// =============================================================================
// SERVICE
// =============================================================================

/// Cadastro operations, parameterized over the backend.
#[derive(Clone)]
pub struct RegistrationService {
    backend: Arc<dyn Backend>,
    oauth_redirect: Option<String>,
}

impl std::fmt::Debug for RegistrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationService")
            .field("oauth_redirect", &self.oauth_redirect)
            .finish_non_exhaustive()
    }
}

impl RegistrationService {
    /// Create a service over `backend`.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            oauth_redirect: None,
        }
    }

    /// Default return URL for OAuth sign-in.
    #[must_use]
    pub fn with_oauth_redirect(mut self, url: impl Into<String>) -> Self {
        self.oauth_redirect = Some(url.into());
        self
    }

    /// Whether the backend answers at all.
    pub async fn check_connection(&self) -> bool {
        match self.backend.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "backend connection check failed");
                false
            }
        }
    }

    /// Sign in with e-mail and password, then decide where to go.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, CadastroError> {
        if email.trim().is_empty() {
            return Err(CadastroError::MissingField("email"));
        }
        if password.is_empty() {
            return Err(CadastroError::MissingField("password"));
        }

        let session = self
            .backend
            .sign_in_with_password(email.trim(), password)
            .await
            .map_err(|e| match e {
                BackendError::Unauthorized => {
                    CadastroError::AuthenticationFailed("invalid e-mail or password".to_string())
                }
                other => other.into(),
            })?;
        let lookup = self
            .lookup_group(&session.access_token, &session.user)
            .await;
        tracing::info!(
            user_id = %session.user.id,
            has_group = lookup.is_found(),
            "user signed in"
        );
        let decision = route_after_auth(true, &lookup);
        Ok(LoginOutcome { session, decision })
    }

    /// URL that starts the OAuth sign-in.
    ///
    /// `redirect_to` falls back to the configured redirect.
    pub fn oauth_url(&self, redirect_to: Option<&str>) -> Result<String, CadastroError> {
        let redirect = redirect_to
            .or(self.oauth_redirect.as_deref())
            .ok_or(CadastroError::MissingField("redirect_to"))?;
        Ok(self.backend.oauth_authorize_url(OAUTH_PROVIDER, redirect)?)
    }

    /// The signed-in user behind `token`.
    pub async fn current_user(&self, token: Option<&str>) -> Result<AuthUser, CadastroError> {
        self.session(token).await.map(|(_, user)| user)
    }

    /// Where an already signed-in visitor belongs.
    ///
    /// No session, or an expired one, means the login page.
    pub async fn route(&self, token: Option<&str>) -> Result<RouteDecision, CadastroError> {
        let Some((token, user)) = self.optional_session(token).await? else {
            return Ok(route_after_auth(false, &GroupLookup::<Group>::Missing));
        };
        let lookup = self.lookup_group(token, &user).await;
        Ok(route_after_auth(true, &lookup))
    }

    /// Where a request for `requested` ends up.
    ///
    /// Protected pages send visitors without a session to login. The view
    /// page also needs a group, so it falls back to `/cadastro` without one.
    pub async fn open_page(
        &self,
        token: Option<&str>,
        requested: Destination,
    ) -> Result<RouteDecision, CadastroError> {
        let session = self.optional_session(token).await?;
        let destination = guard_protected(session.is_some(), requested);
        match session {
            Some((token, user)) if destination == Destination::Visualizacao => {
                let lookup = self.lookup_group(token, &user).await;
                Ok(guard_view(&lookup).unwrap_or(RouteDecision::navigate(destination)))
            }
            _ => Ok(RouteDecision::navigate(destination)),
        }
    }

    /// Write a completed registration: the group first, then its members.
    ///
    /// A user with a group already gets `GroupExists`. When the member batch
    /// fails the group is deleted again, so the next attempt starts clean.
    pub async fn save_registration(
        &self,
        token: Option<&str>,
        registration: &Registration,
    ) -> Result<SavedRegistration, CadastroError> {
        let (token, user) = self.session(token).await?;
        if !self.check_connection().await {
            return Err(CadastroError::Unavailable(
                "no connection to the backend".to_string(),
            ));
        }

        let new_group = registration.to_new_group(user.id.clone())?;
        match self.lookup_group(token, &user).await {
            GroupLookup::Missing => {}
            GroupLookup::Found(existing) => return Err(CadastroError::GroupExists(existing.id)),
            GroupLookup::Failed(reason) => return Err(CadastroError::LookupFailed(reason)),
        }

        let group = self.backend.insert_group(token, &new_group).await?;
        tracing::info!(group_id = %group.id, user_id = %user.id, "group saved");

        let new_members = registration.to_new_members(&group.id);
        let members = match self.backend.insert_members(token, &new_members).await {
            Ok(members) => members,
            Err(e) => {
                tracing::warn!(group_id = %group.id, error = %e, "member batch failed");
                return Err(self.discard_group(token, &group.id, &e).await);
            }
        };
        tracing::info!(group_id = %group.id, count = members.len(), "members saved");

        Ok(SavedRegistration {
            group,
            members,
            destination: Destination::Visualizacao,
        })
    }

    /// Load the signed-in user's group and members.
    pub async fn load_view(&self, token: Option<&str>) -> Result<ViewOutcome, CadastroError> {
        let (token, user) = self.session(token).await?;
        let lookup = self.lookup_group(token, &user).await;
        if let Some(redirect) = guard_view(&lookup) {
            return Ok(ViewOutcome::Redirect(redirect));
        }
        let GroupLookup::Found(group) = lookup else {
            return Ok(ViewOutcome::Redirect(RouteDecision::navigate(
                Destination::Cadastro,
            )));
        };
        let members = self.backend.list_members(token, &group.id).await?;
        Ok(ViewOutcome::Loaded { group, members })
    }

    /// Remove one member from the signed-in user's group.
    pub async fn delete_member(
        &self,
        token: Option<&str>,
        member_id: &MemberId,
    ) -> Result<(), CadastroError> {
        let (token, user) = self.session(token).await?;
        let group = self.require_group(token, &user).await?;
        self.backend
            .delete_member(token, &group.id, member_id)
            .await?;
        tracing::info!(group_id = %group.id, member_id = %member_id, "member deleted");
        Ok(())
    }

    /// Stamp the group's `updated_at` with the current time.
    pub async fn save_all(&self, token: Option<&str>) -> Result<Group, CadastroError> {
        let (token, user) = self.session(token).await?;
        let group = self.require_group(token, &user).await?;
        let now = chrono::Utc::now().to_rfc3339();
        Ok(self.backend.touch_group(token, &group.id, &now).await?)
    }

    /// End the session.
    pub async fn logout(&self, token: Option<&str>) -> Result<(), CadastroError> {
        let token = token.ok_or(CadastroError::NotAuthenticated)?;
        self.backend
            .sign_out(token)
            .await
            .map_err(session_error)?;
        tracing::info!("user signed out");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn session<'a>(
        &self,
        token: Option<&'a str>,
    ) -> Result<(&'a str, AuthUser), CadastroError> {
        let token = token.ok_or(CadastroError::NotAuthenticated)?;
        let user = self
            .backend
            .get_user(token)
            .await
            .map_err(session_error)?;
        Ok((token, user))
    }

    /// Like `session`, but a missing or rejected token is `None`.
    async fn optional_session<'a>(
        &self,
        token: Option<&'a str>,
    ) -> Result<Option<(&'a str, AuthUser)>, CadastroError> {
        match self.session(token).await {
            Ok(found) => Ok(Some(found)),
            Err(CadastroError::NotAuthenticated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Remove a group whose members could not be written.
    ///
    /// The returned error is never retryable: the caller has to resubmit.
    async fn discard_group(
        &self,
        token: &str,
        group_id: &GroupId,
        cause: &BackendError,
    ) -> CadastroError {
        match self.backend.delete_group(token, group_id).await {
            Ok(()) => {
                tracing::info!(group_id = %group_id, "incomplete group removed");
                CadastroError::SaveFailed(format!("members were not saved: {cause}"))
            }
            Err(e) => {
                tracing::error!(group_id = %group_id, error = %e, "incomplete group left behind");
                CadastroError::SaveFailed(format!(
                    "members were not saved ({cause}) and group {group_id} could not be removed"
                ))
            }
        }
    }

    async fn lookup_group(&self, token: &str, user: &AuthUser) -> GroupLookup<Group> {
        let rows = self.backend.find_groups_by_user(token, &user.id).await;
        let lookup = GroupLookup::from_rows(rows);
        if let GroupLookup::Failed(reason) = &lookup {
            tracing::warn!(user_id = %user.id, reason = %reason, "group lookup failed");
        }
        lookup
    }

    async fn require_group(&self, token: &str, user: &AuthUser) -> Result<Group, CadastroError> {
        match self.lookup_group(token, user).await {
            GroupLookup::Found(group) => Ok(group),
            GroupLookup::Missing => Err(CadastroError::GroupNotFound(user.id.clone())),
            GroupLookup::Failed(reason) => Err(CadastroError::LookupFailed(reason)),
        }
    }
}

/// A rejected token means there is no usable session.
fn session_error(err: BackendError) -> CadastroError {
    match err {
        BackendError::Unauthorized => CadastroError::NotAuthenticated,
        other => other.into(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use comesol_core::{GroupForm, MemberForm};

    const EMAIL: &str = "rita@raiz.coop";
    const PASSWORD: &str = "segredo";

    fn setup() -> (Arc<MemoryBackend>, RegistrationService) {
        let backend = Arc::new(MemoryBackend::with_user(EMAIL, PASSWORD));
        let service = RegistrationService::new(backend.clone());
        (backend, service)
    }

    fn registration(members: usize) -> Registration {
        let mut reg = Registration::new(GroupForm {
            name: Some("Cooperativa Raiz".into()),
            representative_name: Some("Rita".into()),
            contact_email: Some(EMAIL.into()),
            ..GroupForm::default()
        });
        for i in 0..members {
            reg.add_member(&MemberForm {
                full_name: Some(format!("Membro {i}")),
                cpf: Some("529.982.247-25".into()),
                ..MemberForm::default()
            })
            .expect("valid member");
        }
        reg
    }

    async fn token(service: &RegistrationService) -> String {
        service
            .login(EMAIL, PASSWORD)
            .await
            .expect("login")
            .session
            .access_token
    }

    #[tokio::test]
    async fn first_login_goes_to_cadastro() {
        let (_, service) = setup();
        let outcome = service.login(EMAIL, PASSWORD).await.expect("login");
        assert_eq!(outcome.decision.destination(), Some(Destination::Cadastro));
    }

    #[tokio::test]
    async fn login_after_save_goes_to_visualizacao() {
        let (_, service) = setup();
        let token = token(&service).await;
        let saved = service
            .save_registration(Some(&token), &registration(2))
            .await
            .expect("save");
        assert_eq!(saved.destination, Destination::Visualizacao);
        assert_eq!(saved.members.len(), 2);

        let outcome = service.login(EMAIL, PASSWORD).await.expect("login");
        assert_eq!(
            outcome.decision.destination(),
            Some(Destination::Visualizacao)
        );
    }

    #[tokio::test]
    async fn wrong_password_is_auth_failure() {
        let (_, service) = setup();
        let err = service.login(EMAIL, "errada").await.expect_err("rejected");
        assert!(matches!(err, CadastroError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn lookup_failure_is_not_cadastro() {
        let (backend, service) = setup();
        backend.set_fail_group_lookup(true);
        let outcome = service.login(EMAIL, PASSWORD).await.expect("login");
        assert!(matches!(
            outcome.decision,
            RouteDecision::LookupFailed { .. }
        ));
    }

    #[tokio::test]
    async fn route_without_session_is_login() {
        let (_, service) = setup();
        let decision = service.route(None).await.expect("route");
        assert_eq!(decision.destination(), Some(Destination::Login));
        let decision = service.route(Some("stale")).await.expect("route");
        assert_eq!(decision.destination(), Some(Destination::Login));
    }

    #[tokio::test]
    async fn save_without_members_refused() {
        let (backend, service) = setup();
        let token = token(&service).await;
        let err = service
            .save_registration(Some(&token), &registration(0))
            .await
            .expect_err("no members");
        assert!(matches!(err, CadastroError::NoMembers));
        assert_eq!(backend.group_count().await, 0);
    }

    #[tokio::test]
    async fn save_offline_refused() {
        let (backend, service) = setup();
        let token = token(&service).await;
        backend.set_offline(true);
        let err = service
            .save_registration(Some(&token), &registration(1))
            .await
            .expect_err("offline");
        assert!(matches!(err, CadastroError::Unavailable(_)));
        backend.set_offline(false);
        assert_eq!(backend.group_count().await, 0);
    }

    #[tokio::test]
    async fn second_registration_refused() {
        let (backend, service) = setup();
        let token = token(&service).await;
        let saved = service
            .save_registration(Some(&token), &registration(1))
            .await
            .expect("save");

        let err = service
            .save_registration(Some(&token), &registration(2))
            .await
            .expect_err("already registered");
        assert!(matches!(err, CadastroError::GroupExists(id) if id == saved.group.id));
        assert_eq!(backend.group_count().await, 1);
    }

    #[tokio::test]
    async fn failed_member_batch_removes_group() {
        let (backend, service) = setup();
        let token = token(&service).await;
        backend.fail_next_member_insert();

        let err = service
            .save_registration(Some(&token), &registration(2))
            .await
            .expect_err("member batch fails");
        assert!(matches!(err, CadastroError::SaveFailed(_)));
        assert_eq!(backend.group_count().await, 0);

        let saved = service
            .save_registration(Some(&token), &registration(2))
            .await
            .expect("second attempt");
        assert_eq!(backend.group_count().await, 1);

        match service.load_view(Some(&token)).await.expect("view") {
            ViewOutcome::Loaded { group, members } => {
                assert_eq!(group.id, saved.group.id);
                assert_eq!(members.len(), 2);
            }
            other => unreachable!("expected a loaded view, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_with_failed_lookup_writes_nothing() {
        let (backend, service) = setup();
        let token = token(&service).await;
        backend.set_fail_group_lookup(true);
        let err = service
            .save_registration(Some(&token), &registration(1))
            .await
            .expect_err("lookup fails");
        assert!(matches!(err, CadastroError::LookupFailed(_)));
        assert_eq!(backend.group_count().await, 0);
    }

    #[tokio::test]
    async fn open_page_guards_protected_pages() {
        let (_, service) = setup();
        let decision = service
            .open_page(None, Destination::Visualizacao)
            .await
            .expect("route");
        assert_eq!(decision.destination(), Some(Destination::Login));

        let token = token(&service).await;
        let decision = service
            .open_page(Some(&token), Destination::Visualizacao)
            .await
            .expect("route");
        assert_eq!(decision.destination(), Some(Destination::Cadastro));

        service
            .save_registration(Some(&token), &registration(1))
            .await
            .expect("save");
        let decision = service
            .open_page(Some(&token), Destination::Visualizacao)
            .await
            .expect("route");
        assert_eq!(decision.destination(), Some(Destination::Visualizacao));

        let decision = service
            .open_page(None, Destination::Login)
            .await
            .expect("route");
        assert_eq!(decision.destination(), Some(Destination::Login));
    }

    #[tokio::test]
    async fn view_without_group_redirects() {
        let (_, service) = setup();
        let token = token(&service).await;
        let view = service.load_view(Some(&token)).await.expect("view");
        assert_eq!(
            view,
            ViewOutcome::Redirect(RouteDecision::navigate(Destination::Cadastro))
        );
    }

    #[tokio::test]
    async fn view_requires_session() {
        let (_, service) = setup();
        let err = service.load_view(None).await.expect_err("no session");
        assert!(matches!(err, CadastroError::NotAuthenticated));
    }

    #[tokio::test]
    async fn delete_member_then_view() {
        let (_, service) = setup();
        let token = token(&service).await;
        let saved = service
            .save_registration(Some(&token), &registration(2))
            .await
            .expect("save");

        service
            .delete_member(Some(&token), &saved.members[0].id)
            .await
            .expect("delete");

        match service.load_view(Some(&token)).await.expect("view") {
            ViewOutcome::Loaded { members, .. } => {
                assert_eq!(members.len(), 1);
                assert_eq!(members[0].id, saved.members[1].id);
            }
            other => unreachable!("expected a loaded view, got {other:?}"),
        }

        let err = service
            .delete_member(Some(&token), &saved.members[0].id)
            .await
            .expect_err("already gone");
        assert!(matches!(err, CadastroError::NotFound(_)));
    }

    #[tokio::test]
    async fn save_all_stamps_updated_at() {
        let (_, service) = setup();
        let token = token(&service).await;
        service
            .save_registration(Some(&token), &registration(1))
            .await
            .expect("save");
        let group = service.save_all(Some(&token)).await.expect("save all");
        assert!(group.updated_at.is_some());
    }

    #[tokio::test]
    async fn save_all_without_group() {
        let (_, service) = setup();
        let token = token(&service).await;
        let err = service.save_all(Some(&token)).await.expect_err("no group");
        assert!(matches!(err, CadastroError::GroupNotFound(_)));
    }

    #[tokio::test]
    async fn logout_ends_session() {
        let (_, service) = setup();
        let token = token(&service).await;
        service.logout(Some(&token)).await.expect("logout");
        let err = service
            .current_user(Some(&token))
            .await
            .expect_err("signed out");
        assert!(matches!(err, CadastroError::NotAuthenticated));
    }

    #[test]
    fn oauth_url_needs_redirect() {
        let (_, service) = setup();
        assert!(matches!(
            service.oauth_url(None),
            Err(CadastroError::MissingField("redirect_to"))
        ));
        let service = service.with_oauth_redirect("http://localhost:5173/login");
        let url = service.oauth_url(None).expect("url");
        assert!(url.contains("provider=google"));
    }
}
