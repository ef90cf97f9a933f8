use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status. `message` is the backend's `error` field when it sent one.
    #[error("Backend error: {status} - {}", .message.as_deref().unwrap_or("request failed"))]
    Status { status: u16, message: Option<String> },

    #[error("Failed to parse response from {endpoint}: {details}")]
    ResponseParsing { endpoint: String, details: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ApiError {
    pub fn status(status: u16, message: Option<String>) -> Self {
        ApiError::Status { status, message }
    }

    pub fn parsing<E: Into<String>, D: std::fmt::Display>(endpoint: E, details: D) -> Self {
        ApiError::ResponseParsing {
            endpoint: endpoint.into(),
            details: details.to_string(),
        }
    }

    /// Text shown in the transcript when a dispatch fails.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            ApiError::Status {
                status,
                message: None,
            } => format!("Backend error: {status}"),
            other => other.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_messages_prefer_backend_text() {
        let err = ApiError::status(500, Some("db down".to_string()));
        assert_eq!(err.to_string(), "Backend error: 500 - db down");
        assert_eq!(err.user_message(), "db down");

        let err = ApiError::status(502, None);
        assert_eq!(err.to_string(), "Backend error: 502 - request failed");
        assert_eq!(err.user_message(), "Backend error: 502");
        assert!(!err.is_not_found());
        assert!(ApiError::status(404, None).is_not_found());
    }
}
