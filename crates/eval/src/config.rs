//! Evaluator configuration.
//!
//! Every field has a default, so an empty TOML file (or no file at all)
//! yields the stock evaluator.
//!
//! ```toml
//! pattern_cache_capacity = 100
//! worker_threads = 4
//! incomparable = "undetermined"   # or "equal"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default number of compiled patterns kept by one matcher.
pub const DEFAULT_PATTERN_CACHE_CAPACITY: usize = 100;

/// What an ordering operator (`$gt`, `$gte`, `$lt`, `$lte`) does when its
/// operands are not mutually comparable, e.g. a string against a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomparablePolicy {
    /// The field evaluates to UNDETERMINED with an "incomparable operands" reason.
    #[default]
    Undetermined,
    /// The operands compare as equal: `$gte`/`$lte` match, `$gt`/`$lt` do not.
    Equal,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluatorConfig {
    /// Capacity of the per-matcher compiled pattern cache.
    pub pattern_cache_capacity: usize,
    /// Size of a dedicated worker pool for criterion fan-out.
    /// `None` runs on the global rayon pool.
    pub worker_threads: Option<usize>,
    pub incomparable: IncomparablePolicy,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig {
            pattern_cache_capacity: DEFAULT_PATTERN_CACHE_CAPACITY,
            worker_threads: None,
            incomparable: IncomparablePolicy::default(),
        }
    }
}

impl EvaluatorConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<EvaluatorConfig, ConfigError> {
        let config: EvaluatorConfig =
            toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<EvaluatorConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        EvaluatorConfig::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pattern_cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "pattern_cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.worker_threads == Some(0) {
            return Err(ConfigError::Invalid(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
