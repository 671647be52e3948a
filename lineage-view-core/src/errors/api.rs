//! Errors raised by the lineage API client

use thiserror::Error;

/// Lineage API errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure (connection refused, timeout, TLS)
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server responded with {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Endpoint URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Response body was not a lineage document
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }

    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if (400..500).contains(status))
    }

    /// Server supplied message, if any, for user-facing notifications
    pub fn server_message(&self) -> Option<String> {
        match self {
            ApiError::Status { body, .. } if !body.trim().is_empty() => {
                let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
                parsed
                    .as_ref()
                    .and_then(|v| v.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .or_else(|| Some(body.trim().to_string()))
            }
            _ => None,
        }
    }
}
