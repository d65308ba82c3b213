//! Editor configuration.
//!
//! Loaded from a TOML file; every section and field is optional.
//!
//! ```toml
//! [layout]
//! rank_spacing = 100.0
//! timeout_ms = 500
//!
//! [storage]
//! positions_file = "/tmp/clue_positions.json"
//!
//! [api]
//! base_url = "http://localhost:8000/api"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use mystery_model::ApiRoutes;

use crate::error::ConfigError;
use crate::layout::LayoutConfig;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.cluegraph.editor";

/// Default REST base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Platform data directory for the editor, if the platform has one.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub layout: LayoutConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Where dragged positions are kept. `None` uses the platform data directory.
    pub positions_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load configuration, falling back to defaults when the file is missing or invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                tracing::info!("Loaded editor config from {:?}", path);
                config
            }
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!("Failed to load editor config {:?}: {}, using defaults", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Endpoint builder for the configured server.
    pub fn routes(&self) -> ApiRoutes {
        ApiRoutes::new(self.api.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = EditorConfig::from_toml_str(
            r#"
            [layout]
            rank_spacing = 120.0

            [api]
            base_url = "https://mystery.example/api/"
            "#,
        )
        .unwrap();

        assert_eq!(config.layout.rank_spacing, 120.0);
        assert_eq!(config.layout.base_width, LayoutConfig::default().base_width);
        assert_eq!(config.storage.positions_file, None);
        assert_eq!(config.routes().base_url(), "https://mystery.example/api");
    }

    #[test]
    fn test_invalid_config() {
        let err = EditorConfig::from_toml_str("[layout]\nrank_spacing = \"far\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("editor.toml");

        let mut config = EditorConfig::default();
        config.layout.timeout_ms = 250;
        config.storage.positions_file = Some(dir.path().join("positions.json"));
        config.save(&path).unwrap();

        assert_eq!(EditorConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_on_missing_and_corrupt() {
        let dir = tempdir().unwrap();
        assert_eq!(
            EditorConfig::load_or_default(dir.path().join("missing.toml")),
            EditorConfig::default()
        );

        let corrupt = dir.path().join("corrupt.toml");
        std::fs::write(&corrupt, "[layout\n").unwrap();
        assert_eq!(EditorConfig::load_or_default(&corrupt), EditorConfig::default());
    }
}
