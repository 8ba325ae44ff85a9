//! Domain-layer errors.
//!
//! Every domain error carries a stable machine-readable code and the UTC
//! instant it was raised, so API responses and log lines can be correlated.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainErrorKind {
    #[error("{field} cannot be empty")]
    EmptyField { field: &'static str },

    #[error("{field} has an invalid format: {reason}")]
    InvalidFormat { field: &'static str, reason: String },

    #[error("No user found for password reset")]
    UserNotFoundForPasswordReset,

    #[error("Invalid email for password reset: {0}")]
    InvalidEmailForPasswordReset(String),
}

impl DomainErrorKind {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyField { .. } => "EMPTY_FIELD",
            Self::InvalidFormat { .. } => "INVALID_FORMAT",
            Self::UserNotFoundForPasswordReset => "USER_NOT_FOUND_FOR_PASSWORD_RESET",
            Self::InvalidEmailForPasswordReset(_) => "INVALID_EMAIL_FOR_PASSWORD_RESET",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct DomainError {
    kind: DomainErrorKind,
    timestamp: DateTime<Utc>,
}

impl DomainError {
    #[must_use]
    pub fn new(kind: DomainErrorKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn empty_field(field: &'static str) -> Self {
        Self::new(DomainErrorKind::EmptyField { field })
    }

    pub fn invalid_format(field: &'static str, reason: impl Into<String>) -> Self {
        Self::new(DomainErrorKind::InvalidFormat {
            field,
            reason: reason.into(),
        })
    }

    #[must_use]
    pub fn user_not_found_for_password_reset() -> Self {
        Self::new(DomainErrorKind::UserNotFoundForPasswordReset)
    }

    pub fn invalid_email_for_password_reset(reason: impl Into<String>) -> Self {
        Self::new(DomainErrorKind::InvalidEmailForPasswordReset(reason.into()))
    }

    #[must_use]
    pub const fn kind(&self) -> &DomainErrorKind {
        &self.kind
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(DomainError::empty_field("email").code(), "EMPTY_FIELD");
        assert_eq!(
            DomainError::invalid_format("email", "missing @").code(),
            "INVALID_FORMAT"
        );
        assert_eq!(
            DomainError::user_not_found_for_password_reset().code(),
            "USER_NOT_FOUND_FOR_PASSWORD_RESET"
        );
        assert_eq!(
            DomainError::invalid_email_for_password_reset("bad").code(),
            "INVALID_EMAIL_FOR_PASSWORD_RESET"
        );
    }

    #[test]
    fn display_includes_field_and_reason() {
        let err = DomainError::invalid_format("email", "missing @");
        assert_eq!(err.to_string(), "email has an invalid format: missing @");
        assert_eq!(
            DomainError::empty_field("name").to_string(),
            "name cannot be empty"
        );
    }

    #[test]
    fn timestamp_is_captured_at_construction() {
        let before = Utc::now();
        let err = DomainError::empty_field("email");
        let after = Utc::now();
        assert!(err.timestamp() >= before && err.timestamp() <= after);
    }
}
