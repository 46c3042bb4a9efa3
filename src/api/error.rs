use reqwest::StatusCode;
use thiserror::Error;

/// Structured error taxonomy for the backend gateway. Permission (403) and
/// NotFound (404) are surfaced as their own variants because callers react to
/// them differently: a 403 on the group or teacher endpoints renders a
/// reduced-capability view, and a 404 on the available-students endpoint
/// triggers a client-side fallback.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed before a response was received: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("permission denied (403) for {url}")]
    Permission { url: String },

    #[error("resource not found (404) at {url}")]
    NotFound { url: String },

    #[error("{field} must be a non-empty identifier")]
    Validation { field: &'static str },

    #[error("API request failed with status {status} for {url}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ApiError {
    pub fn from_status(status: StatusCode, url: String, body: String) -> Self {
        match status {
            StatusCode::FORBIDDEN => ApiError::Permission { url },
            StatusCode::NOT_FOUND => ApiError::NotFound { url },
            _ => ApiError::Status { status, url, body },
        }
    }

    pub fn is_permission(&self) -> bool {
        matches!(self, ApiError::Permission { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Identifier arguments are checked before any network I/O so a malformed id
/// never reaches the backend.
pub fn require_id(value: &str, field: &'static str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation { field });
    }
    Ok(())
}
