use thiserror::Error;

/// Error type shared across the travel assistant
#[derive(Debug, Error)]
pub enum TravelAssistantError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Connection timeout: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{service} API error: {status} - {body}")]
    Upstream {
        service: String,
        status: u16,
        body: String,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TravelAssistantError>;

impl From<reqwest::Error> for TravelAssistantError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Network(e.to_string())
        } else if e.is_decode() {
            Self::Http(format!("failed to decode response body: {e}"))
        } else {
            Self::Http(e.to_string())
        }
    }
}

impl TravelAssistantError {
    /// Short error class name reported to clients in the `type` field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::Validation(_) => "ValidationError",
            Self::Timeout(_) => "ConnectTimeoutError",
            Self::Network(_) => "NetworkError",
            Self::Http(_) => "HttpError",
            Self::Upstream { .. } => "UpstreamError",
            Self::Unauthorized(_) => "UnauthorizedError",
            Self::Serialization(_) => "SerializationError",
            Self::Io(_) => "IoError",
            Self::Internal(_) => "InternalError",
            Self::Other(_) => "UnknownError",
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Network(_) => true,
            Self::Upstream { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(TravelAssistantError::Timeout("slow".into()).is_retryable());
        assert!(
            TravelAssistantError::Upstream {
                service: "PointsYeah".into(),
                status: 503,
                body: String::new(),
            }
            .is_retryable()
        );
        assert!(
            !TravelAssistantError::Upstream {
                service: "PointsYeah".into(),
                status: 400,
                body: String::new(),
            }
            .is_retryable()
        );
        assert!(!TravelAssistantError::Validation("bad".into()).is_retryable());
    }

    #[test]
    fn test_upstream_display() {
        let e = TravelAssistantError::Upstream {
            service: "SerpAPI".into(),
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(e.to_string(), "SerpAPI API error: 502 - bad gateway");
        assert_eq!(e.kind(), "UpstreamError");
    }
}
