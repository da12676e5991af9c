//! # Supabase Adapter
//!
//! Talks to a Supabase project over HTTPS:
//! - `/auth/v1/*` (GoTrue) for sign-in, user lookup and sign-out
//! - `/rest/v1/groups` and `/rest/v1/members` (PostgREST) for the tables
//!
//! Every request carries the project's anon key in the `apikey` header.
//! Table requests carry the user's access token as the bearer, so row-level
//! security decides what each user can see.

use super::{AuthSession, AuthUser, Backend, BackendError};
use async_trait::async_trait;
use comesol_core::primitives::{GROUPS_TABLE, MEMBERS_TABLE};
use comesol_core::{CadastroError, Group, GroupId, Member, MemberId, NewGroup, NewMember, UserId};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for one Supabase project.
#[derive(Clone)]
pub struct SupabaseBackend {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl std::fmt::Debug for SupabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseBackend")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl SupabaseBackend {
    /// Create a client for the project at `base_url` (no trailing slash needed).
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CadastroError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CadastroError::Config(format!("HTTP client: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            anon_key: anon_key.into(),
        })
    }

    /// The project URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with the project key and a bearer token.
    ///
    /// Without a user token the anon key doubles as the bearer.
    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http
            .request(method, &url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(self.anon_key.as_str()))
    }

    fn table(&self, method: Method, table: &str, token: &str) -> RequestBuilder {
        self.request(method, &format!("/rest/v1/{table}"), Some(token))
    }

    /// Send a request and handle connection errors.
    async fn send(&self, req: RequestBuilder) -> Result<Response, BackendError> {
        req.send().await.map_err(|e| {
            tracing::warn!(error = %e, "backend request failed");
            BackendError::ConnectionFailed(format!("{}: {e}", self.base_url))
        })
    }

    /// Check the status code, passing successful responses through.
    async fn check(&self, resp: Response) -> Result<Response, BackendError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Unauthorized);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(BackendError::RateLimited);
        }
        let body = resp.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %body, "backend returned an error");
        Err(BackendError::Status(status.as_u16(), body))
    }

    /// Check the status and decode the JSON body.
    async fn decode<T: DeserializeOwned>(&self, resp: Response) -> Result<T, BackendError> {
        self.check(resp)
            .await?
            .json::<T>()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))
    }

    /// Decode a `return=representation` body and take its single row.
    async fn decode_one<T: DeserializeOwned>(
        &self,
        resp: Response,
        what: &str,
    ) -> Result<T, BackendError> {
        let rows: Vec<T> = self.decode(resp).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(what.to_string()))
    }
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let req = self
            .request(Method::POST, "/auth/v1/token", None)
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }));
        let resp = self.send(req).await?;
        // GoTrue answers bad credentials with 400 invalid_grant.
        if resp.status() == StatusCode::BAD_REQUEST {
            return Err(BackendError::Unauthorized);
        }
        self.decode(resp).await
    }

    fn oauth_authorize_url(&self, provider: &str, redirect_to: &str) -> Result<String, BackendError> {
        reqwest::Url::parse_with_params(
            &format!("{}/auth/v1/authorize", self.base_url),
            &[("provider", provider), ("redirect_to", redirect_to)],
        )
        .map(String::from)
        .map_err(|e| BackendError::ParseError(e.to_string()))
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let req = self.request(Method::GET, "/auth/v1/user", Some(access_token));
        let resp = self.send(req).await?;
        self.decode(resp).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let req = self.request(Method::POST, "/auth/v1/logout", Some(access_token));
        let resp = self.send(req).await?;
        self.check(resp).await.map(|_| ())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let req = self
            .request(Method::GET, &format!("/rest/v1/{GROUPS_TABLE}"), None)
            .query(&[("select", "id"), ("limit", "1")]);
        let resp = self.send(req).await?;
        self.check(resp).await.map(|_| ())
    }

    async fn find_groups_by_user(
        &self,
        access_token: &str,
        user_id: &UserId,
    ) -> Result<Vec<Group>, BackendError> {
        let req = self
            .table(Method::GET, GROUPS_TABLE, access_token)
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("limit", "1".to_string()),
            ]);
        let resp = self.send(req).await?;
        self.decode(resp).await
    }

    async fn insert_group(
        &self,
        access_token: &str,
        group: &NewGroup,
    ) -> Result<Group, BackendError> {
        let req = self
            .table(Method::POST, GROUPS_TABLE, access_token)
            .header("Prefer", "return=representation")
            .json(&[group]);
        let resp = self.send(req).await?;
        self.decode_one(resp, "inserted group").await
    }

    async fn delete_group(&self, access_token: &str, group_id: &GroupId) -> Result<(), BackendError> {
        let members = self
            .table(Method::DELETE, MEMBERS_TABLE, access_token)
            .query(&[("group_id", format!("eq.{group_id}"))]);
        let resp = self.send(members).await?;
        self.check(resp).await?;

        let req = self
            .table(Method::DELETE, GROUPS_TABLE, access_token)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{group_id}"))]);
        let resp = self.send(req).await?;
        let _: Group = self.decode_one(resp, &format!("group {group_id}")).await?;
        Ok(())
    }

    async fn list_members(
        &self,
        access_token: &str,
        group_id: &GroupId,
    ) -> Result<Vec<Member>, BackendError> {
        let req = self
            .table(Method::GET, MEMBERS_TABLE, access_token)
            .query(&[("select", "*".to_string()), ("group_id", format!("eq.{group_id}"))]);
        let resp = self.send(req).await?;
        self.decode(resp).await
    }

    async fn insert_members(
        &self,
        access_token: &str,
        members: &[NewMember],
    ) -> Result<Vec<Member>, BackendError> {
        if members.is_empty() {
            return Ok(Vec::new());
        }
        let req = self
            .table(Method::POST, MEMBERS_TABLE, access_token)
            .header("Prefer", "return=representation")
            .json(members);
        let resp = self.send(req).await?;
        self.decode(resp).await
    }

    async fn delete_member(
        &self,
        access_token: &str,
        group_id: &GroupId,
        member_id: &MemberId,
    ) -> Result<(), BackendError> {
        let req = self
            .table(Method::DELETE, MEMBERS_TABLE, access_token)
            .header("Prefer", "return=representation")
            .query(&[
                ("id", format!("eq.{member_id}")),
                ("group_id", format!("eq.{group_id}")),
            ]);
        let resp = self.send(req).await?;
        let _: Member = self
            .decode_one(resp, &format!("member {member_id}"))
            .await?;
        Ok(())
    }

    async fn touch_group(
        &self,
        access_token: &str,
        group_id: &GroupId,
        updated_at: &str,
    ) -> Result<Group, BackendError> {
        let req = self
            .table(Method::PATCH, GROUPS_TABLE, access_token)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{group_id}"))])
            .json(&serde_json::json!({ "updated_at": updated_at }));
        let resp = self.send(req).await?;
        self.decode_one(resp, &format!("group {group_id}")).await
    }
}

// =============================================================================
// TESTS
// =============================================================================
