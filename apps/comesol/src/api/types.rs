//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API, and how a
//! `CadastroError` becomes a status code plus an error body.

use crate::backend::AuthUser;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use comesol_core::{
    CadastroError, Cpf, Destination, Group, GroupForm, Member, MemberForm, MemberId,
    Registration, RouteDecision, cpf_digits, validate_cpf,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH / CONNECTION
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Backend reachability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionResponse {
    pub connected: bool,
}

// =============================================================================
// CPF
// =============================================================================

/// CPF check request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpfRequest {
    pub cpf: String,
}

/// CPF check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpfResponse {
    pub valid: bool,
    /// The input with everything but digits removed.
    pub digits: String,
    /// `NNN.NNN.NNN-NN`, only for valid CPFs.
    pub formatted: Option<String>,
    /// All eleven digits equal. Passes the checksum but is not a real CPF.
    pub repeated: bool,
}

impl CpfResponse {
    /// Check `input` and describe the result.
    pub fn check(input: &str) -> Self {
        let parsed = Cpf::parse(input).ok();
        Self {
            valid: validate_cpf(input),
            digits: cpf_digits(input),
            formatted: parsed.as_ref().map(Cpf::formatted),
            repeated: parsed.as_ref().is_some_and(Cpf::is_repeated_sequence),
        }
    }
}

// =============================================================================
// AUTH
// =============================================================================

/// Password sign-in request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Sign-in result: the session token plus the routing decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: AuthUser,
    #[serde(flatten)]
    pub decision: RouteDecision,
}

/// Query string for the OAuth start URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthQuery {
    #[serde(default)]
    pub redirect_to: Option<String>,
}

/// `GET /route` query: the page the browser is asking for, if any.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteQuery {
    #[serde(default)]
    pub page: Option<String>,
}

/// Where the browser should go to start OAuth sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthResponse {
    pub url: String,
}

/// The signed-in user, for the page header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: Option<String>,
}

impl From<AuthUser> for SessionResponse {
    fn from(user: AuthUser) -> Self {
        Self {
            user_id: user.id.0,
            email: user.email,
        }
    }
}

/// A client-side navigation instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectResponse {
    pub redirect: String,
}

impl RedirectResponse {
    pub fn to(destination: Destination) -> Self {
        Self {
            redirect: destination.path().to_string(),
        }
    }
}

// =============================================================================
// CADASTRO / VISUALIZACAO
// =============================================================================

/// A complete registration: the group section and every member.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CadastroRequest {
    #[serde(default)]
    pub group: GroupForm,
    #[serde(default)]
    pub members: Vec<MemberForm>,
}

impl CadastroRequest {
    /// Validate every member into a registration.
    ///
    /// The group section is validated later, when the owner is known.
    pub fn to_registration(&self) -> Result<Registration, CadastroError> {
        let mut registration = Registration::new(self.group.clone());
        for member in &self.members {
            registration.add_member(member)?;
        }
        Ok(registration)
    }
}

/// The view page contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewResponse {
    pub group: Group,
    pub members: Vec<Member>,
}

/// Member deletion result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: MemberId,
}

// =============================================================================
// ERRORS
// =============================================================================

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Page the client should navigate to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    /// The request may succeed if repeated.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retry: bool,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            redirect: None,
            retry: false,
        }
    }

    #[must_use]
    pub fn redirect(mut self, destination: Destination) -> Self {
        self.redirect = Some(destination.path().to_string());
        self
    }

    #[must_use]
    pub fn retryable(mut self) -> Self {
        self.retry = true;
        self
    }
}

/// A `CadastroError` on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub CadastroError);

impl From<CadastroError> for ApiError {
    fn from(err: CadastroError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// Status code and body for this error.
    pub fn parts(&self) -> (StatusCode, ErrorResponse) {
        let body = ErrorResponse::new(self.0.to_string());
        match &self.0 {
            CadastroError::NotAuthenticated => {
                (StatusCode::UNAUTHORIZED, body.redirect(Destination::Login))
            }
            CadastroError::AuthenticationFailed(_) => (StatusCode::UNAUTHORIZED, body),
            e if e.is_validation() => (StatusCode::BAD_REQUEST, body),
            CadastroError::GroupNotFound(_) => {
                (StatusCode::NOT_FOUND, body.redirect(Destination::Cadastro))
            }
            CadastroError::GroupExists(_) => {
                (StatusCode::CONFLICT, body.redirect(Destination::Visualizacao))
            }
            CadastroError::NotFound(_) => (StatusCode::NOT_FOUND, body),
            CadastroError::LookupFailed(_) | CadastroError::Unavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, body.retryable())
            }
            CadastroError::Backend(_) | CadastroError::SaveFailed(_) => {
                (StatusCode::BAD_GATEWAY, body)
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, body),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self.0, "request rejected");
        }
        (status, Json(body)).into_response()
    }
}
