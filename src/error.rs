//! Error types for the meta supervisor

use thiserror::Error;

/// Result type alias for supervisor operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// Longest backend body kept inside an error
const BODY_EXCERPT_LEN: usize = 200;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Routing Errors
    // =============================

    #[error("Intent '{0}' is not supported")]
    UnsupportedIntent(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    // =============================
    // Backend Errors
    // =============================

    #[error("{service} API request failed: {message}")]
    BackendUnavailable { service: String, message: String },

    #[error("{service} API returned error: {status} {body}")]
    BackendError {
        service: String,
        status: u16,
        body: String,
    },

    #[error("{service} API returned a malformed response: {message}")]
    MalformedResponse { service: String, message: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    // =============================
    // Ambient Errors
    // =============================

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl OrchestrationError {
    /// Builds a status error, keeping only an excerpt of the body
    pub fn backend_status(service: &str, status: u16, body: &str) -> Self {
        Self::BackendError {
            service: service.to_string(),
            status,
            body: excerpt(body, BODY_EXCERPT_LEN),
        }
    }

    /// Stable code placed in the response envelope.
    ///
    /// Malformed payloads share `BACKEND_ERROR` with status failures since
    /// callers cannot act on the difference.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedIntent(_) => "UNSUPPORTED_INTENT",
            Self::MissingParameter(_) => "MISSING_PARAMETER",
            Self::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE",
            Self::BackendError { .. } | Self::MalformedResponse { .. } => "BACKEND_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Agent(_)
            | Self::Config(_)
            | Self::Internal(_)
            | Self::SerializationError(_)
            | Self::IoError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Network-level failures that a fallback policy may absorb
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. } | Self::Timeout(_))
    }
}

/// Truncates on a char boundary and marks the cut with `...`
pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
