use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Unauthorized - session expired or missing")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    /// A newer login, refresh or logout finished while this call was in flight.
    #[error("Superseded by a newer session change")]
    Superseded,

    #[error("Credential storage error: {0}")]
    Storage(String),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl SessionError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => SessionError::Unauthorized,
            403 => SessionError::Forbidden(truncated),
            404 => SessionError::NotFound(truncated),
            429 => SessionError::RateLimited,
            500..=599 => SessionError::ServerError(truncated),
            _ => SessionError::MalformedResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Map a rejected login or registration. The backend answers unknown
    /// users with 404 and bad passwords with 401; both are credential
    /// rejections from the caller's point of view.
    pub fn from_auth_status(status: reqwest::StatusCode, message: Option<String>, body: &str) -> Self {
        match status.as_u16() {
            400..=499 if status.as_u16() != 403 && status.as_u16() != 429 => {
                let message = message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| Self::truncate_body(body));
                SessionError::InvalidCredentials(message)
            }
            _ => Self::from_status(status, body),
        }
    }

    /// True for failures where the request never got an answer from the backend.
    pub fn is_transport(&self) -> bool {
        matches!(self, SessionError::NetworkError(_))
    }

    /// One line suitable for showing next to a form.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::InvalidCredentials(msg) if !msg.is_empty() => msg.clone(),
            SessionError::InvalidCredentials(_) => "Invalid email or password".to_string(),
            SessionError::PolicyViolation(msg) => msg.clone(),
            SessionError::NetworkError(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            SessionError::MalformedResponse(_) => {
                "The server sent an unexpected response. Please try again later.".to_string()
            }
            SessionError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            SessionError::Forbidden(_) => "You do not have access to this resource.".to_string(),
            SessionError::NotFound(_) => "The requested resource was not found.".to_string(),
            SessionError::RateLimited => "Too many attempts. Please wait a moment and try again.".to_string(),
            SessionError::ServerError(_) => "The server encountered an error. Please try again later.".to_string(),
            SessionError::Superseded => "The session changed while this request was running.".to_string(),
            SessionError::Storage(_) => "Could not access saved login information.".to_string(),
        }
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SessionError::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            SessionError::from_status(status, "")
        } else {
            SessionError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::MalformedResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert_eq!(SessionError::from_status(StatusCode::UNAUTHORIZED, ""), SessionError::Unauthorized);
        assert!(matches!(SessionError::from_status(StatusCode::FORBIDDEN, "no"), SessionError::Forbidden(_)));
        assert!(matches!(SessionError::from_status(StatusCode::NOT_FOUND, ""), SessionError::NotFound(_)));
        assert!(matches!(
            SessionError::from_status(StatusCode::BAD_GATEWAY, "down"),
            SessionError::ServerError(_)
        ));
        assert!(matches!(
            SessionError::from_status(StatusCode::IM_A_TEAPOT, ""),
            SessionError::MalformedResponse(_)
        ));
    }

    #[test]
    fn test_from_auth_status_uses_backend_message() {
        let err = SessionError::from_auth_status(
            StatusCode::UNAUTHORIZED,
            Some("Invalid credentials".to_string()),
            "",
        );
        assert_eq!(err, SessionError::InvalidCredentials("Invalid credentials".to_string()));

        // Unknown user comes back as 404
        let err = SessionError::from_auth_status(StatusCode::NOT_FOUND, None, "User not found");
        assert_eq!(err, SessionError::InvalidCredentials("User not found".to_string()));

        // Server failures are not credential problems
        let err = SessionError::from_auth_status(StatusCode::INTERNAL_SERVER_ERROR, None, "boom");
        assert!(matches!(err, SessionError::ServerError(_)));
    }

    #[test]
    fn test_rate_limit_is_not_a_credential_rejection() {
        assert_eq!(
            SessionError::from_status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            SessionError::RateLimited
        );
        let err = SessionError::from_auth_status(StatusCode::TOO_MANY_REQUESTS, None, "slow down");
        assert_eq!(err, SessionError::RateLimited);
        assert!(err.user_message().contains("wait"));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(600);
        let truncated = SessionError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.ends_with("(truncated, 600 total bytes)"));
        assert_eq!(SessionError::truncate_body("short"), "short");
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let long = "é".repeat(400);
        let truncated = SessionError::truncate_body(&long);
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_is_transport() {
        assert!(SessionError::NetworkError("refused".into()).is_transport());
        assert!(!SessionError::Unauthorized.is_transport());
    }
}
