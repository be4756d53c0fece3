// Error types for the Invidious client

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Server answered with a non-success status
    #[error("API returned {code}: {reason}")]
    Status { code: u16, reason: String },

    /// Request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Could not reach the server (DNS, refused, reset)
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Any other transport failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body was not the JSON we expected
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Caller passed something unusable (empty id, bad proxy URL)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    /// Server errors and network trouble are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { code, .. } => *code >= 500,
            Self::Timeout(_) | Self::Connect(_) | Self::Http(_) => true,
            Self::Parse(_) | Self::InvalidInput(_) => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout(e.to_string());
        }

        if e.is_connect() {
            return Self::Connect(e.to_string());
        }

        if let Some(status) = e.status() {
            return Self::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            };
        }

        Self::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_retryable() {
        let err = ApiError::Status {
            code: 502,
            reason: "Bad Gateway".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        let err = ApiError::Status {
            code: 404,
            reason: "Not Found".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(!ApiError::InvalidInput("empty id".to_string()).is_retryable());
    }

    #[test]
    fn test_timeout_is_retryable() {
        let err = ApiError::Timeout("deadline".to_string());
        assert!(err.is_retryable());
        assert!(err.is_timeout());
    }

    #[test]
    fn test_parse_error_display() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ApiError::from(parse);
        assert!(err.to_string().starts_with("Parse error"));
        assert!(!err.is_retryable());
    }
}
