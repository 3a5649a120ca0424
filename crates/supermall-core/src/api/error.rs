use reqwest::StatusCode;
use thiserror::Error;

/// Message used when a failed response carries no `error` field.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Error, Debug)]
pub enum ApiError {
    /// No response was received (connection refused, DNS failure, timeout).
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
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

    /// Build the error for a non-2xx response from its raw body.
    ///
    /// The server message is taken from the `error` field of a JSON body.
    /// Anything else falls back to [`GENERIC_ERROR_MESSAGE`].
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| Self::server_message(&value))
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());
        ApiError::Api { status, message }
    }

    /// Build the error for a 2xx response whose body could not be decoded.
    pub fn undecodable(body: &str, cause: impl std::fmt::Display) -> Self {
        ApiError::InvalidResponse(format!("{}: {}", cause, Self::truncate_body(body)))
    }

    fn server_message(value: &serde_json::Value) -> Option<String> {
        match value.get("error")? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// HTTP status of an [`ApiError::Api`] failure.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_uses_server_message() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"error":"invalid credentials"}"#);
        assert_eq!(err.to_string(), "invalid credentials");
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_from_status_falls_back_to_generic_message() {
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, r#"{"message":"boom"}"#);
        assert_eq!(err.to_string(), GENERIC_ERROR_MESSAGE);

        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(err.to_string(), GENERIC_ERROR_MESSAGE);
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"error":""}"#);
        assert_eq!(err.to_string(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with("(truncated, 510 total bytes)"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }
}
