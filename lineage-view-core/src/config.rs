//! YAML configuration for the lineage view
//!
//! ```yaml
//! layout:
//!   direction: LR
//!   dimensions: { width: 400, height: 50, expanded_height: 350 }
//! pagination:
//!   page_size: 20
//! api:
//!   base_url: http://localhost:8585
//!   timeout_secs: 30
//! ```
//!
//! Every field is optional.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::errors::{LineageError, LineageResult};
use crate::layout::{LayeredLayout, LayoutDirection, NodeDimensions};
use crate::pagination::MAX_LINEAGE_LENGTH;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct LineageViewConfig {
    pub layout: LayoutConfig,
    pub pagination: PaginationConfig,
    pub api: ApiConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub direction: LayoutDirection,
    pub dimensions: NodeDimensions,
    pub rank_sep: f64,
    pub node_sep: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let engine = LayeredLayout::default();
        Self {
            direction: LayoutDirection::default(),
            dimensions: NodeDimensions::default(),
            rank_sep: engine.rank_sep,
            node_sep: engine.node_sep,
        }
    }
}

impl LayoutConfig {
    pub fn engine(&self) -> LayeredLayout {
        LayeredLayout {
            rank_sep: self.rank_sep,
            node_sep: self.node_sep,
            ..LayeredLayout::default()
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PaginationConfig {
    pub page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_LINEAGE_LENGTH,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Depth requested on each side when fetching lineage
    pub depth: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8585".to_string(),
            timeout_secs: 30,
            token: None,
            depth: 1,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl LineageViewConfig {
    pub fn load(path: impl AsRef<Path>) -> LineageResult<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> LineageResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> LineageResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> LineageResult<()> {
        if self.pagination.page_size == 0 {
            return Err(LineageError::Config(
                "pagination.page_size must be greater than zero".to_string(),
            ));
        }
        let dims = &self.layout.dimensions;
        if dims.width <= 0.0 || dims.height <= 0.0 || dims.expanded_height <= 0.0 {
            return Err(LineageError::Config(
                "layout.dimensions must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LineageViewConfig::default();
        assert_eq!(config.pagination.page_size, 20);
        assert_eq!(config.layout.direction, LayoutDirection::LeftRight);
        assert_eq!(config.layout.dimensions.expanded_height, 350.0);
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config = LineageViewConfig::from_yaml(
            "layout:\n  direction: TB\npagination:\n  page_size: 5\n",
        )
        .unwrap();
        assert_eq!(config.layout.direction, LayoutDirection::TopBottom);
        assert_eq!(config.layout.dimensions.width, 400.0);
        assert_eq!(config.pagination.page_size, 5);
        assert_eq!(config.api.base_url, "http://localhost:8585");
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = LineageViewConfig::from_yaml("pagination:\n  page_size: 0\n").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api:\n  base_url: https://catalog.example.com\n  depth: 3").unwrap();

        let config = LineageViewConfig::load(file.path()).unwrap();
        assert_eq!(config.api.base_url, "https://catalog.example.com");
        assert_eq!(config.api.depth, 3);
        assert_eq!(config.api.timeout_secs, 30);

        let written = config.to_yaml().unwrap();
        assert_eq!(LineageViewConfig::from_yaml(&written).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = LineageViewConfig::load("/definitely/not/here.yaml").unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
