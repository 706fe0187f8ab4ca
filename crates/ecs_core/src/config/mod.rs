//! Configuration loading
//!
//! Settings types implement [`Config`] and are read from or written to `.toml`
//! or `.ron` files, picked by extension.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// I/O failure, parse failure or an extension other than `.toml`/`.ron`.
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path)?;

        match format {
            ConfigFormat::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// Serialization or I/O failure, or an unsupported extension.
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum ConfigFormat {
    Toml,
    Ron,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Sizing of the entity/component core
///
/// Capacities are preallocation hints only; every container still grows on
/// demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcsConfig {
    /// Entity slots reserved up front
    pub entity_capacity: usize,
    /// Dense slots reserved in each component store
    pub component_capacity: usize,
    /// Operations that can be queued during iteration before the queue grows
    pub deferred_capacity: usize,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            entity_capacity: 1024,
            component_capacity: 256,
            deferred_capacity: 64,
        }
    }
}

impl Config for EcsConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("ecs_core_{}_{name}", std::process::id()))
    }

    #[test]
    fn test_toml_round_trip() {
        let path = temp_path("config.toml");
        let config = EcsConfig {
            entity_capacity: 10,
            component_capacity: 20,
            deferred_capacity: 30,
        };

        config.save_to_file(&path).unwrap();
        let loaded = EcsConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ron_missing_fields_use_defaults() {
        let path = temp_path("partial.ron");
        std::fs::write(&path, "(entity_capacity: 7)").unwrap();

        let loaded = EcsConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.entity_capacity, 7);
        assert_eq!(loaded.component_capacity, EcsConfig::default().component_capacity);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = EcsConfig::load_from_file("settings.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
