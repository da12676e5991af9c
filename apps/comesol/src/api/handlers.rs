//! # API Endpoint Handlers
//!
//! Thin wrappers over `RegistrationService`: extract, call, serialize.
//! Errors flow out as `ApiError`.

use super::{
    AppState,
    auth::BearerToken,
    types::{
        ApiError, CadastroRequest, ConnectionResponse, CpfRequest, CpfResponse, DeleteResponse,
        HealthResponse, LoginRequest, LoginResponse, OAuthQuery, OAuthResponse, RedirectResponse,
        RouteQuery, SessionResponse, ViewResponse,
    },
};
use crate::service::ViewOutcome;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use comesol_core::{CadastroError, Destination, Group, MemberId, RouteDecision};

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// HEALTH / CONNECTION
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Whether the backend answers.
pub async fn connection_handler(State(state): State<AppState>) -> impl IntoResponse {
    let connected = state.service.check_connection().await;
    Json(ConnectionResponse { connected })
}

// =============================================================================
// CPF
// =============================================================================

/// Check a CPF without touching the backend.
pub async fn validate_cpf_handler(Json(request): Json<CpfRequest>) -> impl IntoResponse {
    Json(CpfResponse::check(&request.cpf))
}

// =============================================================================
// AUTH
// =============================================================================

/// Password sign-in, followed by the group lookup.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let outcome = state
        .service
        .login(&request.email, &request.password)
        .await?;
    Ok(Json(LoginResponse {
        access_token: outcome.session.access_token,
        user: outcome.session.user,
        decision: outcome.decision,
    }))
}

/// URL that starts the Google sign-in.
pub async fn oauth_google_handler(
    State(state): State<AppState>,
    Query(query): Query<OAuthQuery>,
) -> ApiResult<Json<OAuthResponse>> {
    let url = state.service.oauth_url(query.redirect_to.as_deref())?;
    Ok(Json(OAuthResponse { url }))
}

/// End the session; the client goes back to login.
pub async fn logout_handler(
    State(state): State<AppState>,
    token: BearerToken,
) -> ApiResult<Json<RedirectResponse>> {
    state.service.logout(token.as_deref()).await?;
    Ok(Json(RedirectResponse::to(Destination::Login)))
}

/// The signed-in user.
pub async fn session_handler(
    State(state): State<AppState>,
    token: BearerToken,
) -> ApiResult<Json<SessionResponse>> {
    let user = state.service.current_user(token.as_deref()).await?;
    Ok(Json(user.into()))
}

/// Where the bearer of this session belongs.
///
/// With `?page=`, the requested page is gated instead.
pub async fn route_handler(
    State(state): State<AppState>,
    token: BearerToken,
    Query(query): Query<RouteQuery>,
) -> ApiResult<Json<RouteDecision>> {
    let decision = match query.page.as_deref() {
        None => state.service.route(token.as_deref()).await?,
        Some(page) => {
            let requested =
                Destination::from_path(page).ok_or_else(|| CadastroError::InvalidOption {
                    field: "page",
                    value: page.to_string(),
                })?;
            state.service.open_page(token.as_deref(), requested).await?
        }
    };
    Ok(Json(decision))
}

// =============================================================================
// CADASTRO
// =============================================================================

/// Save a new registration.
pub async fn cadastro_handler(
    State(state): State<AppState>,
    token: BearerToken,
    Json(request): Json<CadastroRequest>,
) -> ApiResult<Response> {
    // No session means login, whatever the body holds.
    state.service.current_user(token.as_deref()).await?;
    let registration = request.to_registration()?;
    let saved = state
        .service
        .save_registration(token.as_deref(), &registration)
        .await?;
    Ok((StatusCode::CREATED, Json(saved)).into_response())
}

// =============================================================================
// VISUALIZACAO
// =============================================================================

/// The saved group and members, or where to go instead.
pub async fn view_handler(
    State(state): State<AppState>,
    token: BearerToken,
) -> ApiResult<Response> {
    match state.service.load_view(token.as_deref()).await? {
        ViewOutcome::Loaded { group, members } => {
            Ok(Json(ViewResponse { group, members }).into_response())
        }
        ViewOutcome::Redirect(RouteDecision::Navigate { destination }) => {
            Ok(Json(RedirectResponse::to(destination)).into_response())
        }
        ViewOutcome::Redirect(RouteDecision::LookupFailed { reason }) => {
            Err(CadastroError::LookupFailed(reason).into())
        }
    }
}

/// Remove one member.
pub async fn delete_member_handler(
    State(state): State<AppState>,
    token: BearerToken,
    Path(member_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let member_id = MemberId::new(member_id);
    state
        .service
        .delete_member(token.as_deref(), &member_id)
        .await?;
    Ok(Json(DeleteResponse { deleted: member_id }))
}

/// Confirm the registration; stamps `updated_at`.
pub async fn save_all_handler(
    State(state): State<AppState>,
    token: BearerToken,
) -> ApiResult<Json<Group>> {
    Ok(Json(state.service.save_all(token.as_deref()).await?))
}
