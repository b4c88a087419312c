//! YAML configuration for a salesflow deployment.
//!
//! One file describes where rows come from, how they are validated, where
//! rejects go and which backend receives the enriched output.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "daily sales"
//!
//! source:
//!   path: "data/sales_data.csv"
//!   delimiter: ","
//!
//! validate:
//!   order_id_max_len: 50
//!   product_name_max_len: 200
//!   use_parallel: false
//!
//! reject:
//!   path: "logs/invalid_records.json"
//!
//! load:
//!   backend: "redb"
//!   path: "data/salesflow.redb"
//!   table: "sales"
//!
//! logging:
//!   level: "info"
//!   json: false
//! ```
//!
//! Any value can be overridden from the environment with a `SALESFLOW_`
//! prefix and `__` between section and key, e.g. `SALESFLOW_LOAD__TABLE=sales_eu`
//! or `SALESFLOW_SOURCE__PATH=/srv/in.csv`. See [`SalesflowConfig::apply_env_overrides`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use store::{CsvSource, JsonRejectSink, LoadBackend};
use thiserror::Error;
use validate::ValidateConfig;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "SALESFLOW";

/// redb file used when `load.path` is not set.
pub const DEFAULT_LOAD_PATH: &str = "data/salesflow.redb";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("failed to apply environment overrides: {0}")]
    Environment(#[from] config::ConfigError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SalesflowConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub source: SourceYamlConfig,

    #[serde(default)]
    pub validate: ValidateConfig,

    #[serde(default)]
    pub reject: RejectYamlConfig,

    #[serde(default)]
    pub load: LoadYamlConfig,

    #[serde(default)]
    pub logging: LoggingYamlConfig,
}

impl Default for SalesflowConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            source: SourceYamlConfig::default(),
            validate: ValidateConfig::default(),
            reject: RejectYamlConfig::default(),
            load: LoadYamlConfig::default(),
            logging: LoggingYamlConfig::default(),
        }
    }
}

impl SalesflowConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: SalesflowConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Layers `SALESFLOW_<SECTION>__<KEY>` environment variables over this
    /// configuration and re-validates the result.
    pub fn apply_env_overrides(&self) -> Result<Self, ConfigLoadError> {
        self.layer_env(None)
    }

    /// `vars` replaces the process environment when given.
    fn layer_env(
        &self,
        vars: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigLoadError> {
        let layered = config::Config::builder()
            .add_source(config::Config::try_from(self)?)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?;
        let config: SalesflowConfig = layered.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.source.validate()?;
        self.validate
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("validate: {e}")))?;
        self.reject.validate()?;
        self.load.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Where input rows are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceYamlConfig {
    /// Input file, used when the CLI is not given `--input`
    pub path: Option<String>,
    /// Single ASCII field delimiter
    pub delimiter: String,
}

impl Default for SourceYamlConfig {
    fn default() -> Self {
        Self {
            path: None,
            delimiter: ",".to_string(),
        }
    }
}

impl SourceYamlConfig {
    /// The delimiter as the byte the CSV reader wants.
    pub fn delimiter_byte(&self) -> Result<u8, ConfigLoadError> {
        match self.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(ConfigLoadError::Validation(format!(
                "source.delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            ))),
        }
    }

    pub fn build(&self) -> Result<CsvSource, ConfigLoadError> {
        Ok(CsvSource::new().with_delimiter(self.delimiter_byte()?))
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.delimiter_byte()?;
        if matches!(&self.path, Some(p) if p.trim().is_empty()) {
            return Err(ConfigLoadError::Validation(
                "source.path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where rejected rows are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RejectYamlConfig {
    pub path: String,
}

impl Default for RejectYamlConfig {
    fn default() -> Self {
        Self {
            path: "logs/invalid_records.json".to_string(),
        }
    }
}

impl RejectYamlConfig {
    pub fn build(&self) -> JsonRejectSink {
        JsonRejectSink::new(&self.path)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.path.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "reject.path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBackendKind {
    /// Kept only for the life of the process. Tests and dry runs.
    InMemory,
    #[default]
    Redb,
}

/// Where enriched records are appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadYamlConfig {
    pub backend: LoadBackendKind,
    /// Database file for `redb`, defaults to [`DEFAULT_LOAD_PATH`]
    pub path: Option<String>,
    /// Target relation
    pub table: String,
}

impl Default for LoadYamlConfig {
    fn default() -> Self {
        Self {
            backend: LoadBackendKind::Redb,
            path: Some(DEFAULT_LOAD_PATH.to_string()),
            table: crate::pipeline::DEFAULT_RELATION.to_string(),
        }
    }
}

impl LoadYamlConfig {
    /// False when loaded rows disappear with the process.
    pub fn is_durable(&self) -> bool {
        self.backend != LoadBackendKind::InMemory
    }

    /// Convert to the store's backend selector.
    pub fn to_backend(&self) -> Result<LoadBackend, ConfigLoadError> {
        match self.backend {
            LoadBackendKind::InMemory => Ok(LoadBackend::in_memory()),
            LoadBackendKind::Redb => match &self.path {
                Some(path) => Ok(LoadBackend::redb(path.clone())),
                None => Err(ConfigLoadError::MissingField("load.path")),
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.table.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "load.table must not be empty".to_string(),
            ));
        }
        self.to_backend().map(|_| ())
    }
}

/// Log output settings for the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingYamlConfig {
    /// Default filter directive; `RUST_LOG` wins when set
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingYamlConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.level.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
