use axum::{
    Extension, Json,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, info};

use super::client::ClientMeta;
use super::error::INVALID_ACCESS_TOKEN;
use super::validation::{
    validate_credentials, validate_password_length, validate_session_id, validate_token_field,
};
use super::{
    ApiError, ApiResponse, AppState, ChangePasswordRequest, LoginRequest, MessageResponse,
    OwnSessionDto, PasswordResetConfirmRequest, PasswordResetRequest,
    PasswordResetRequestedResponse, RefreshRequest, RevokedResponse,
};
use crate::services::{LoginResult, PasswordResetError, RefreshResult, ValidatedSession};

const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists for this email, a password reset link has been sent";

// ============================================================================
// Middleware
// ============================================================================

/// Requires `Authorization: Bearer <access token>` bound to a live session.
/// On success the [`ValidatedSession`] is available to handlers as an
/// extension.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(request.headers())
        .ok_or_else(|| ApiError::Unauthorized(INVALID_ACCESS_TOKEN.to_string()))?;

    let validated = state.auth().validate_access_token(token).await?;

    tracing::Span::current().record("user_id", validated.user.id.value());
    request.extensions_mut().insert(validated);

    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientMeta(client): ClientMeta,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, ApiError> {
    let (email, password) = validate_credentials(&payload.email, &payload.password)?;

    let result = state.auth().login(email, password, client).await?;

    Ok(Json(ApiResponse::success(result)))
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    ClientMeta(client): ClientMeta,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<RefreshResult>>, ApiError> {
    let refresh_token = validate_token_field("refresh_token", &payload.refresh_token)?;

    let result = state
        .auth()
        .refresh_token(refresh_token, &client.ip_address)
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(mut current): Extension<ValidatedSession>,
) -> Result<Json<ApiResponse<ValidatedSession>>, ApiError> {
    current.user = state.accounts().profile(current.user.id).await?;
    Ok(Json(ApiResponse::success(current)))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<ValidatedSession>,
) -> Json<ApiResponse<MessageResponse>> {
    state.auth().logout(&current.session.session_id);
    Json(ApiResponse::success(MessageResponse::new("Logged out")))
}

/// POST /auth/logout-all
pub async fn logout_all(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<ValidatedSession>,
) -> Json<ApiResponse<RevokedResponse>> {
    let revoked = state.auth().logout_all(current.user.id);
    Json(ApiResponse::success(RevokedResponse { revoked }))
}

/// GET /auth/sessions
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<ValidatedSession>,
) -> Json<ApiResponse<Vec<OwnSessionDto>>> {
    let sessions = state
        .auth()
        .sessions_for_user(current.user.id)
        .into_iter()
        .map(|session| OwnSessionDto {
            current: session.session_id == current.session.session_id,
            session,
        })
        .collect();

    Json(ApiResponse::success(sessions))
}

/// DELETE /auth/sessions/{session_id}
/// Only sessions owned by the caller can be revoked here.
pub async fn revoke_session(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<ValidatedSession>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let session_id = validate_session_id(&session_id)?;

    let owned = state
        .auth()
        .sessions_for_user(current.user.id)
        .iter()
        .any(|s| s.session_id == session_id);

    if !owned || !state.auth().logout(session_id) {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Session revoked",
    ))))
}

/// PUT /auth/password
/// Other sessions of the caller are revoked; the current one stays valid.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<ValidatedSession>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<RevokedResponse>>, ApiError> {
    validate_password_length(&payload.current_password)?;
    validate_password_length(&payload.new_password)?;

    let revoked = state
        .accounts()
        .change_password(
            current.user.id,
            &current.session.session_id,
            &payload.current_password,
            &payload.new_password,
        )
        .await?;

    Ok(Json(ApiResponse::success(RevokedResponse { revoked })))
}

/// POST /auth/password-reset/request
/// Answers 202 whether or not the account exists.
pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetRequest>,
) -> impl IntoResponse {
    let expose = state.shared.config.password_reset.expose_token_in_response;

    let reset_token = match state.password_reset().request_reset(&payload.email).await {
        Ok(token) => expose.then_some(token.token),
        Err(PasswordResetError::Domain(e)) => {
            debug!(reason = e.code(), "Password reset request ignored");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "Password reset request failed");
            None
        }
    };

    (
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(PasswordResetRequestedResponse {
            message: RESET_REQUESTED_MESSAGE.to_string(),
            reset_token,
        })),
    )
}

/// POST /auth/password-reset/confirm
pub async fn confirm_password_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetConfirmRequest>,
) -> Result<Json<ApiResponse<RevokedResponse>>, ApiError> {
    let token = validate_token_field("token", &payload.token)?;
    validate_password_length(&payload.new_password)?;

    let revoked = state
        .password_reset()
        .confirm_reset(token, &payload.new_password)
        .await?;

    info!(revoked_sessions = revoked, "Password reset confirmed");
    Ok(Json(ApiResponse::success(RevokedResponse { revoked })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer(&with_auth("Bearer abc.def")), Some("abc.def"));
        assert_eq!(extract_bearer(&with_auth("bearer  abc ")), Some("abc"));
        assert_eq!(extract_bearer(&with_auth("Basic abc")), None);
        assert_eq!(extract_bearer(&with_auth("Bearer ")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }
}
