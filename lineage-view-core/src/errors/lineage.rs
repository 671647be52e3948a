//! Errors raised while deriving lineage views
//!
//! # Examples
//!
//! ```rust
//! use lineage_view::errors::LineageError;
//!
//! let err = LineageError::EdgeNotFound {
//!     from: "orders".to_string(),
//!     to: "revenue".to_string(),
//! };
//! assert!(err.is_not_found());
//! ```

use thiserror::Error;

/// Lineage view errors
#[derive(Error, Debug)]
pub enum LineageError {
    /// Node not found by identifier
    #[error("Node '{0}' not found")]
    NodeNotFound(String),

    /// Edge not found
    #[error("Edge {from} -> {to} not found")]
    EdgeNotFound {
        /// Source entity identifier
        from: String,
        /// Target entity identifier
        to: String,
    },

    /// Invalid argument or configuration value
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Configuration could not be loaded
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Export operation failed
    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LineageError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LineageError::NodeNotFound(_) | LineageError::EdgeNotFound { .. }
        )
    }

    /// Get error code for API and CLI responses
    pub fn error_code(&self) -> &'static str {
        match self {
            LineageError::NodeNotFound(_) | LineageError::EdgeNotFound { .. } => "NOT_FOUND",
            LineageError::Validation(_) => "VALIDATION_FAILED",
            LineageError::Config(_) | LineageError::Yaml(_) => "INVALID_CONFIG",
            LineageError::ExportFailed(_) => "OPERATION_FAILED",
            LineageError::Io(_) => "IO_ERROR",
            LineageError::Json(_) => "INVALID_DOCUMENT",
        }
    }
}
