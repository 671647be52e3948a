//! Error types for lineage-view-core
//!
//! Two domains are kept apart:
//!
//! - **LineageError**: building, laying out, paginating and exporting lineage views,
//!   plus configuration loading
//! - **ApiError**: talking to the catalog's lineage endpoints
//!
//! Malformed lineage documents are not errors. Edges pointing at unknown entities are
//! dropped while the view is built, so a partially loaded graph still renders.
//!
//! # Examples
//!
//! ```rust
//! use lineage_view::errors::{ApiError, LineageError};
//!
//! let err = LineageError::Validation("page size must be positive".to_string());
//! assert_eq!(err.error_code(), "VALIDATION_FAILED");
//!
//! let err = ApiError::Status { status: 404, body: "not found".to_string() };
//! assert!(err.is_not_found());
//! ```

pub mod api;
pub mod lineage;

pub use api::ApiError;
pub use lineage::LineageError;

/// Result type alias for view derivation operations
pub type LineageResult<T> = Result<T, LineageError>;

/// Result type alias for lineage API calls
pub type ApiResult<T> = Result<T, ApiError>;
