//! Layered configuration.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. a TOML file (`dagstore.toml` in the working directory, or an explicit path)
//! 3. environment variables prefixed `DAGSTORE_`, with `__` between section
//!    and key (`DAGSTORE_TRAVERSAL__MAX_DEPTH=64`)
//!
//! ```toml
//! [traversal]
//! max_depth = 10000
//!
//! [storage]
//! data_dir = "./dagstore-data"
//! sync_on_write = true
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::TraversalConfig;
use crate::store::LogStoreOptions;

/// File read by [`DagConfig::load`] when present.
pub const DEFAULT_CONFIG_FILE: &str = "dagstore.toml";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "DAGSTORE_";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A source could not be read or parsed.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// An explicitly requested file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The merged configuration is not usable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The configuration could not be rendered as TOML.
    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Storage settings for the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the write-ahead log.
    pub data_dir: PathBuf,
    /// fsync after every appended record.
    pub sync_on_write: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./dagstore-data"),
            sync_on_write: true,
        }
    }
}

/// Logging settings, applied by the binary that installs the subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Complete dagstore configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DagConfig {
    /// Traversal limits.
    pub traversal: TraversalConfig,
    /// Durable storage.
    pub storage: StorageConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

impl DagConfig {
    /// The provider chain: defaults, then `file` if given, then environment.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads from defaults, `dagstore.toml` in the working directory if it
    /// exists, and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let file = Path::new(DEFAULT_CONFIG_FILE);
        Self::extract(&Self::figment(file.exists().then_some(file)))
    }

    /// Loads from defaults, the given TOML file, and the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::FileNotFound` if `path` does not exist, or an
    /// error if a source cannot be parsed or the result is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Self::extract(&Self::figment(Some(path)))
    }

    fn extract(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialise fine but cannot work.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.traversal.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "traversal.max_depth must be at least 1".to_string(),
            ));
        }
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.data_dir cannot be empty".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "logging.level cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Options for opening a [`crate::store::LogStore`].
    #[must_use]
    pub fn log_store_options(&self) -> LogStoreOptions {
        LogStoreOptions {
            sync_on_write: self.storage.sync_on_write,
        }
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Render` if serialisation fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
