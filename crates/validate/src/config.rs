//! Configuration for the schema validator.
//!
//! [`ValidateConfig`] controls the few knobs the sales schema exposes: string
//! length limits, an optional replacement email grammar, and whether the
//! partitioner may fan out across threads. The defaults encode the standard
//! sales contract, so `ValidateConfig::default()` is what production uses
//! unless a deployment says otherwise.
//!
//! ```rust
//! use validate::ValidateConfig;
//!
//! let config = ValidateConfig::default();
//! assert_eq!(config.order_id_max_len, 50);
//! assert!(config.validate().is_ok());
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime configuration for record validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateConfig {
    /// Configuration version. `0` is reserved and rejected.
    ///
    /// Default: `1`
    pub version: u32,

    /// Maximum length of `order_id`, in characters.
    ///
    /// Default: `50`
    pub order_id_max_len: usize,

    /// Maximum length of `product_name`, in characters.
    ///
    /// Default: `200`
    pub product_name_max_len: usize,

    /// Replacement regular expression for `customer_email`.
    ///
    /// When `None` the built-in grammar
    /// ([`DEFAULT_EMAIL_PATTERN`](crate::DEFAULT_EMAIL_PATTERN)) is used.
    ///
    /// Default: `None`
    pub email_pattern: Option<String>,

    /// Validate records on the rayon pool when the `parallel` feature is
    /// compiled in. Ignored otherwise.
    ///
    /// Default: `false`
    pub use_parallel: bool,
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self {
            version: 1,
            order_id_max_len: 50,
            product_name_max_len: 200,
            email_pattern: None,
            use_parallel: false,
        }
    }
}

/// Errors raised while checking a [`ValidateConfig`] or compiling its rules.
///
/// These are start-up problems; they never occur per record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid configuration: version must be >= 1")]
    InvalidVersion,

    #[error("invalid configuration: {field} max length must be >= 1")]
    ZeroMaxLength { field: &'static str },

    #[error("invalid email pattern {pattern:?}: {reason}")]
    InvalidEmailPattern { pattern: String, reason: String },

    #[error("invalid order date shape: {reason}")]
    InvalidDateShape { reason: String },
}

impl ValidateConfig {
    /// Checks internal consistency. Cheap; call it at start-up.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 {
            return Err(ConfigError::InvalidVersion);
        }
        if self.order_id_max_len == 0 {
            return Err(ConfigError::ZeroMaxLength { field: "order_id" });
        }
        if self.product_name_max_len == 0 {
            return Err(ConfigError::ZeroMaxLength {
                field: "product_name",
            });
        }
        Ok(())
    }
}
