use super::ApiError;

/// Upper bound on any password accepted over HTTP. Argon2 cost grows with
/// input length.
pub const MAX_PASSWORD_LENGTH: usize = 1024;

const MAX_SESSION_ID_LENGTH: usize = 128;

pub fn validate_credentials<'a>(
    email: &'a str,
    password: &'a str,
) -> Result<(&'a str, &'a str), ApiError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }
    validate_password_length(password)?;
    Ok((email, password))
}

pub fn validate_password_length(password: &str) -> Result<&str, ApiError> {
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::validation(format!(
            "Password must be {MAX_PASSWORD_LENGTH} bytes or less"
        )));
    }
    Ok(password)
}

pub fn validate_token_field<'a>(field: &str, token: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

pub fn validate_session_id(session_id: &str) -> Result<&str, ApiError> {
    if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LENGTH {
        return Err(ApiError::validation("Invalid session ID"));
    }

    if !session_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::validation("Invalid session ID"));
    }

    Ok(session_id)
}

pub fn validate_user_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid user ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}
