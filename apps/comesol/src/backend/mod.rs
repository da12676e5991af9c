//! # Backend Port
//!
//! The hosted backend owns authentication, the `groups` table and the
//! `members` table. Everything the cadastro needs from it goes through the
//! [`Backend`] trait, so the service can be built against the real HTTP
//! adapter or an in-process double.
//!
//! ## Adapters
//!
//! - [`SupabaseBackend`]: GoTrue auth + PostgREST tables over HTTPS
//! - [`MemoryBackend`]: in-process tables for tests and offline demos

mod memory;
mod supabase;

pub use memory::MemoryBackend;
pub use supabase::SupabaseBackend;

use async_trait::async_trait;
use comesol_core::{
    CadastroError, Group, GroupId, Member, MemberId, NewGroup, NewMember, UserId,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// AUTH TYPES
// =============================================================================

/// The authenticated user as reported by the auth backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// A session returned by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Errors from the backend adapter layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Cannot reach the backend.
    ConnectionFailed(String),
    /// 401/403, or rejected credentials.
    Unauthorized,
    /// 429 Too Many Requests.
    RateLimited,
    /// The addressed row does not exist (or is not visible to this session).
    NotFound(String),
    /// Any other non-success status.
    Status(u16, String),
    /// Failed to parse the response body.
    ParseError(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionFailed(url) => write!(f, "Cannot connect to backend at {url}"),
            Self::Unauthorized => write!(f, "Unauthorized: invalid credentials or session"),
            Self::RateLimited => write!(f, "Rate limited: too many requests"),
            Self::NotFound(what) => write!(f, "Not found: {what}"),
            Self::Status(status, msg) => write!(f, "Backend error ({status}): {msg}"),
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<BackendError> for CadastroError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::ConnectionFailed(_) => Self::Unavailable(err.to_string()),
            BackendError::Unauthorized => Self::AuthenticationFailed(err.to_string()),
            BackendError::NotFound(what) => Self::NotFound(what),
            BackendError::RateLimited
            | BackendError::Status(..)
            | BackendError::ParseError(_) => Self::Backend(err.to_string()),
        }
    }
}

// =============================================================================
// PORT
// =============================================================================

/// Operations the cadastro consumes from the hosted backend.
///
/// Every table operation carries the caller's access token; row visibility
/// is the backend's responsibility.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Exchange e-mail and password for a session.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError>;

    /// URL that starts an OAuth sign-in with `provider`, returning to `redirect_to`.
    fn oauth_authorize_url(&self, provider: &str, redirect_to: &str) -> Result<String, BackendError>;

    /// Resolve an access token to its user.
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError>;

    /// Invalidate a session.
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    /// Lightweight reachability check.
    async fn ping(&self) -> Result<(), BackendError>;

    /// Groups owned by `user_id` (at most one row is requested).
    async fn find_groups_by_user(
        &self,
        access_token: &str,
        user_id: &UserId,
    ) -> Result<Vec<Group>, BackendError>;

    /// Insert a group and return the stored row with its generated id.
    async fn insert_group(&self, access_token: &str, group: &NewGroup)
    -> Result<Group, BackendError>;

    /// Delete a group owned by the caller, along with its members.
    async fn delete_group(&self, access_token: &str, group_id: &GroupId)
    -> Result<(), BackendError>;

    /// Members of a group, in no particular order.
    async fn list_members(
        &self,
        access_token: &str,
        group_id: &GroupId,
    ) -> Result<Vec<Member>, BackendError>;

    /// Insert a batch of members.
    async fn insert_members(
        &self,
        access_token: &str,
        members: &[NewMember],
    ) -> Result<Vec<Member>, BackendError>;

    /// Delete one member of `group_id`.
    async fn delete_member(
        &self,
        access_token: &str,
        group_id: &GroupId,
        member_id: &MemberId,
    ) -> Result<(), BackendError>;

    /// Set a group's `updated_at` and return the stored row.
    async fn touch_group(
        &self,
        access_token: &str,
        group_id: &GroupId,
        updated_at: &str,
    ) -> Result<Group, BackendError>;
}
