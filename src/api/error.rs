use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use tracing::debug;

use super::ApiResponse;
use crate::services::{AccountError, AuthError, PasswordResetError};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const INVALID_REFRESH_TOKEN: &str = "Invalid or expired refresh token";
pub const INVALID_ACCESS_TOKEN: &str = "Invalid or expired access token";
pub const INVALID_RESET_TOKEN: &str = "Invalid or expired reset token";

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ValidationError(String),

    Conflict(String),

    InternalError(String),

    Unauthorized(String),

    Forbidden(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::InternalError(_) => "INTERNAL_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            Self::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        };

        let body = ApiResponse::<()>::error(error_message, self.code());
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

/// Not-found and expired collapse into one message per token kind.
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        debug!(reason = err.code(), "Authentication failed");
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized(INVALID_CREDENTIALS.to_string()),
            AuthError::InvalidRefreshToken | AuthError::ExpiredRefreshToken => {
                Self::Unauthorized(INVALID_REFRESH_TOKEN.to_string())
            }
            AuthError::InvalidToken | AuthError::ExpiredToken | AuthError::SessionRevoked => {
                Self::Unauthorized(INVALID_ACCESS_TOKEN.to_string())
            }
            AuthError::CredentialStore(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<PasswordResetError> for ApiError {
    fn from(err: PasswordResetError) -> Self {
        debug!(reason = err.code(), "Password reset failed");
        match err {
            PasswordResetError::InvalidToken
            | PasswordResetError::ExpiredToken
            | PasswordResetError::TokenAlreadyUsed => {
                Self::ValidationError(INVALID_RESET_TOKEN.to_string())
            }
            PasswordResetError::WeakPassword(msg) => Self::ValidationError(format!("Password {msg}")),
            PasswordResetError::Domain(e) => Self::ValidationError(e.to_string()),
            PasswordResetError::Database(msg) => Self::DatabaseError(msg),
            PasswordResetError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::UserNotFound => Self::NotFound("User not found".to_string()),
            AccountError::EmailTaken => Self::Conflict(err.to_string()),
            AccountError::Validation(msg) => Self::ValidationError(msg),
            AccountError::InvalidCurrentPassword => Self::ValidationError(err.to_string()),
            AccountError::Domain(e) => Self::ValidationError(e.to_string()),
            AccountError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }
}
