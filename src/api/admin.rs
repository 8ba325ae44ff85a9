use axum::{
    Extension, Json,
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::info;

use super::validation::validate_user_id;
use super::{ApiError, ApiResponse, AppState, RevokedResponse};
use crate::domain::UserId;
use crate::services::{SessionInfo, SessionStats, ValidatedSession};

/// Runs after [`super::auth::require_session`]; rejects non-admin roles.
pub async fn require_admin(
    Extension(current): Extension<ValidatedSession>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !current.user.role.is_admin() {
        return Err(ApiError::Forbidden(
            "Administrator role required".to_string(),
        ));
    }
    Ok(next.run(request).await)
}

/// GET /admin/sessions
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<SessionInfo>>> {
    Json(ApiResponse::success(state.auth().active_sessions()))
}

/// GET /admin/sessions/stats
pub async fn session_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<SessionStats>> {
    Json(ApiResponse::success(state.auth().session_stats()))
}

/// DELETE /admin/sessions
pub async fn clear_sessions(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<ValidatedSession>,
) -> Json<ApiResponse<RevokedResponse>> {
    let revoked = state.auth().clear_all_sessions();
    info!(
        event = "sessions_cleared",
        admin_id = current.user.id.value(),
        revoked,
        "All sessions cleared"
    );
    Json(ApiResponse::success(RevokedResponse { revoked }))
}

/// DELETE /admin/users/{id}/sessions
pub async fn revoke_user_sessions(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<ValidatedSession>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<RevokedResponse>>, ApiError> {
    let user_id = UserId::new(validate_user_id(id)?);

    let revoked = state.auth().logout_all(user_id);
    info!(
        event = "user_sessions_revoked",
        admin_id = current.user.id.value(),
        target_user_id = user_id.value(),
        revoked,
        "User sessions revoked"
    );

    Ok(Json(ApiResponse::success(RevokedResponse { revoked })))
}
