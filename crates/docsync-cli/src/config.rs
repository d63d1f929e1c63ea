//! CLI configuration
//!
//! Optional TOML file:
//!
//! ```toml
//! [logging]
//! profile = "production"   # development | production | test
//!
//! [registry]
//! id_prefix = "doc"        # deterministic ids instead of UUIDv7
//! ```

use std::path::Path;

use docsync_core::logging_facility::Profile;
use docsync_core::{Registry, SequentialIdSource, Side};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "docsync.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub registry: RegistrySettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    #[serde(default)]
    pub profile: Profile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySettings {
    /// Prefix for sequential identifiers; UUIDv7 when absent
    pub id_prefix: Option<String>,
}

impl Settings {
    /// Load from `path`, or from `./docsync.toml` if it exists, or defaults
    ///
    /// # Errors
    /// * `Io` - an explicitly named file cannot be read
    /// * `Parse` - the file is not valid config TOML
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    /// # Errors
    /// * `Io` / `Parse` - see [`Settings::load`]
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// # Errors
    /// * `Parse` - invalid TOML or unknown keys
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Fresh registry for `side`, honouring the configured id scheme
    pub fn registry(&self, side: Side) -> Registry {
        match (&self.registry.id_prefix, side) {
            (Some(prefix), Side::Authoritative) => {
                Registry::with_id_source(side, SequentialIdSource::new(prefix.clone()))
            }
            _ => Registry::for_side(side),
        }
    }
}
