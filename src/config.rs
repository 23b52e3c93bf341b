//! Runtime configuration.
//!
//! Mirrors the `sliceConfig.json` / `components.json` pair an app ships with:
//! - [`SliceConfig`] - category paths, production flag, logger and router tuning
//! - [`ComponentCatalog`] - component name → category map
//!
//! The runtime never hard-codes component locations; everything resolves
//! through these two inputs.

use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::ComponentKind;

// =============================================================================
// Slice Config
// =============================================================================

/// Top-level runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceConfig {
    pub paths: PathsConfig,
    /// Production mode skips prop validation.
    #[serde(default)]
    pub production: bool,
    #[serde(default)]
    pub logger: LoggerConfig,
    #[serde(default)]
    pub router: RouterConfig,
}

impl SliceConfig {
    /// Parse a config from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = read_file(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Path entry for a category, if configured.
    pub fn category(&self, category: &str) -> Option<&CategoryPath> {
        self.paths.components.get(category)
    }
}

impl Default for SliceConfig {
    fn default() -> Self {
        let mut components = IndexMap::new();
        components.insert(
            "Visual".to_string(),
            CategoryPath::new("/Components/Visual", ComponentKind::Visual),
        );
        components.insert(
            "Service".to_string(),
            CategoryPath::new("/Components/Service", ComponentKind::Service),
        );
        Self {
            paths: PathsConfig {
                components,
                ..PathsConfig::default()
            },
            production: false,
            logger: LoggerConfig::default(),
            router: RouterConfig::default(),
        }
    }
}

/// Where component, theme and style resources live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathsConfig {
    /// Category name → base path and kind.
    #[serde(default)]
    pub components: IndexMap<String, CategoryPath>,
    /// Fixed location of structural components.
    #[serde(default = "default_structural_path")]
    pub structural: String,
    #[serde(default = "default_themes_path")]
    pub themes: String,
    #[serde(default = "default_styles_path")]
    pub styles: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            components: IndexMap::new(),
            structural: default_structural_path(),
            themes: default_themes_path(),
            styles: default_styles_path(),
        }
    }
}

/// One category entry: `{ "path": "/Components/Visual", "type": "Visual" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPath {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
}

impl CategoryPath {
    pub fn new(path: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

fn default_structural_path() -> String {
    "/Slice/Components/Structural".to_string()
}

fn default_themes_path() -> String {
    "/Themes".to_string()
}

fn default_styles_path() -> String {
    "/Styles".to_string()
}

// =============================================================================
// Logger & Router Tuning
// =============================================================================

/// Logger settings. A disabled logger filters everything out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Router timing and limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouterConfig {
    /// DOM id of the page-level render target.
    pub app_root_id: String,
    /// Window in which repeated route changes collapse into one render.
    pub debounce_ms: u64,
    /// Lifetime of a route-container lookup.
    pub container_cache_ttl_ms: u64,
    /// Longest redirect chain a single navigation may follow.
    pub max_redirect_depth: usize,
}

impl RouterConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn container_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.container_cache_ttl_ms)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            app_root_id: "app".to_string(),
            debounce_ms: 10,
            container_cache_ttl_ms: 100,
            max_redirect_depth: 10,
        }
    }
}

// =============================================================================
// Component Catalog
// =============================================================================

/// Component name → category name, as listed in `components.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentCatalog(IndexMap<String, String>);

impl ComponentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = read_file(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, category: impl Into<String>) -> Self {
        self.insert(name, category);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, category: impl Into<String>) {
        self.0.insert(name.into(), category.into());
    }

    pub fn category_of(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"{
        "paths": {
            "components": {
                "Visual": { "path": "/Components/Visual", "type": "Visual" },
                "Service": { "path": "/Components/Service", "type": "Service" },
                "AppComponents": { "path": "/Components/AppComponents", "type": "Visual" }
            },
            "themes": "/Themes"
        },
        "production": true,
        "logger": { "enabled": false },
        "router": { "debounceMs": 25 }
    }"#;

    #[test]
    fn test_parse_config() {
        let config = SliceConfig::from_json_str(CONFIG).unwrap();

        assert!(config.production);
        assert!(!config.logger.enabled);
        assert_eq!(config.logger.level, "info");
        assert_eq!(config.paths.structural, "/Slice/Components/Structural");
        assert_eq!(config.router.debounce_ms, 25);
        assert_eq!(config.router.container_cache_ttl_ms, 100);
        assert_eq!(config.router.max_redirect_depth, 10);
        assert_eq!(config.router.app_root_id, "app");

        let app = config.category("AppComponents").unwrap();
        assert_eq!(app.path, "/Components/AppComponents");
        assert_eq!(app.kind, ComponentKind::Visual);
        assert_eq!(config.category("Service").unwrap().kind, ComponentKind::Service);
        assert!(config.category("Structural").is_none());
    }

    #[test]
    fn test_parse_config_rejects_bad_kind() {
        let bad = r#"{ "paths": { "components": { "X": { "path": "/x", "type": "Widget" } } } }"#;
        assert!(matches!(
            SliceConfig::from_json_str(bad),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "HomePage": "AppComponents", "Button": "Visual" }}"#).unwrap();

        let catalog = ComponentCatalog::from_path(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.category_of("HomePage"), Some("AppComponents"));
        assert_eq!(catalog.category_of("Missing"), None);
    }

    #[test]
    fn test_missing_file() {
        let err = SliceConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
