//! drawcalc configuration
//!
//! Settings are read from a TOML file (conventionally `drawcalc.toml`):
//!
//! ```toml
//! [limits]
//! element_limit = 262144
//! scratch_growth = 1.4
//!
//! [store]
//! max_ids = 100
//! max_len = 4194304
//!
//! [engine]
//! poll_interval = 1024
//!
//! [inputs]
//! time_rate = 1.0
//! animation = false
//! ```
//!
//! Every field is optional; missing fields take the defaults below.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Hard ceiling on symbols emitted by one pass (256 Ki elements)
pub const DEFAULT_ELEMENT_LIMIT: usize = 256 << 10;

/// Growth ratio of the scratch buffer's backing allocation
pub const DEFAULT_SCRATCH_GROWTH: f64 = 1.4;

/// Maximum number of store ids
pub const DEFAULT_STORE_MAX_IDS: usize = 100;

/// Maximum length of one store array (4 Mi values)
pub const DEFAULT_STORE_MAX_LEN: usize = 4 << 20;

/// Growth ratio of the store's outer (per-id) array
pub const DEFAULT_STORE_OUTER_GROWTH: f64 = 1.4;

/// Growth ratio of each inner store array; slower since inner arrays get large
pub const DEFAULT_STORE_INNER_GROWTH: f64 = 1.1;

/// Instructions the reference engine runs between cancellation polls
pub const DEFAULT_POLL_INTERVAL: u32 = 1024;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DrawCalcConfig {
    pub limits: LimitsConfig,
    pub store: StoreConfig,
    pub engine: EngineConfig,
    pub inputs: InputsConfig,
}

/// Symbol buffer limits
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Hard symbol-count ceiling enforced by the cap guard
    pub element_limit: usize,
    /// Scratch buffer growth ratio
    pub scratch_growth: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            element_limit: DEFAULT_ELEMENT_LIMIT,
            scratch_growth: DEFAULT_SCRATCH_GROWTH,
        }
    }
}

/// Persistent value store bounds
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub max_ids: usize,
    pub max_len: usize,
    pub outer_growth: f64,
    pub inner_growth: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_ids: DEFAULT_STORE_MAX_IDS,
            max_len: DEFAULT_STORE_MAX_LEN,
            outer_growth: DEFAULT_STORE_OUTER_GROWTH,
            inner_growth: DEFAULT_STORE_INNER_GROWTH,
        }
    }
}

/// Reference engine settings
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Cancellation poll cadence, in executed instructions
    pub poll_interval: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Initial values of the host inputs
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputsConfig {
    pub angle: f64,
    pub time: f64,
    pub time_rate: f64,
    pub k: [f64; 5],
    pub animation: bool,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            angle: 0.0,
            time: 0.0,
            time_rate: 1.0,
            k: [0.0; 5],
            animation: false,
        }
    }
}

/// Error loading or validating a configuration
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read
    Io { path: PathBuf, source: std::io::Error },
    /// The file is not valid TOML or has unknown/mistyped fields
    Parse(toml::de::Error),
    /// A value is out of its allowed range
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config '{}': {}", path.display(), source)
            }
            Self::Parse(e) => write!(f, "invalid config: {}", e),
            Self::Invalid(msg) => write!(f, "invalid config value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

impl DrawCalcConfig {
    /// Parse and validate a configuration from TOML content
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.element_limit == 0 {
            return Err(ConfigError::Invalid("limits.element_limit must be > 0".into()));
        }
        check_ratio("limits.scratch_growth", self.limits.scratch_growth)?;
        if self.store.max_ids == 0 || self.store.max_len == 0 {
            return Err(ConfigError::Invalid(
                "store.max_ids and store.max_len must be > 0".into(),
            ));
        }
        check_ratio("store.outer_growth", self.store.outer_growth)?;
        check_ratio("store.inner_growth", self.store.inner_growth)?;
        if self.engine.poll_interval == 0 {
            return Err(ConfigError::Invalid("engine.poll_interval must be > 0".into()));
        }
        Ok(())
    }
}

fn check_ratio(name: &str, ratio: f64) -> Result<(), ConfigError> {
    if ratio.is_finite() && ratio > 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{} must be a finite ratio > 1, got {}", name, ratio)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DrawCalcConfig::default();
        assert_eq!(config.limits.element_limit, 262144);
        assert_eq!(config.store.max_ids, 100);
        assert_eq!(config.store.max_len, 4194304);
        assert_eq!(config.engine.poll_interval, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = DrawCalcConfig::from_toml_str("").unwrap();
        assert_eq!(config, DrawCalcConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = DrawCalcConfig::from_toml_str(
            r#"
            [limits]
            element_limit = 64

            [inputs]
            k = [1.0, 2.0, 3.0, 4.0, 5.0]
            animation = true
            "#,
        )
        .unwrap();

        assert_eq!(config.limits.element_limit, 64);
        assert_eq!(config.limits.scratch_growth, DEFAULT_SCRATCH_GROWTH);
        assert_eq!(config.inputs.k[4], 5.0);
        assert!(config.inputs.animation);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = DrawCalcConfig::from_toml_str("[limits]\nelement_cap = 3\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let result = DrawCalcConfig::from_toml_str("[store]\ninner_growth = 1.0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let result = DrawCalcConfig::from_toml_str("[engine]\npoll_interval = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = DrawCalcConfig::load(Path::new("/nonexistent/drawcalc.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
