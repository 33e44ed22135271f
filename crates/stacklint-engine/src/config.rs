//! Lint run configuration, loadable from a JSON or YAML file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use stacklint_core::Region;

use crate::error::{ConfigurationError, LintError};

/// Settings for a lint run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LintConfig {
    /// Regions to validate in. Empty means `us-east-1`.
    #[serde(default)]
    pub regions: Vec<Region>,
    /// Rule id prefixes whose findings are dropped.
    #[serde(default)]
    pub ignore_checks: Vec<String>,
    /// Upper bound on candidate values per resolved expression.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// Upper bound on free leaves when enumerating condition scenarios.
    #[serde(default = "default_max_scenario_leaves")]
    pub max_scenario_leaves: usize,
    /// Require exact scalar types instead of deployment coercions.
    #[serde(default)]
    pub strict_types: bool,
    /// Validate regions on scoped threads.
    #[serde(default)]
    pub parallel_regions: bool,
}

fn default_max_candidates() -> usize {
    25
}

fn default_max_scenario_leaves() -> usize {
    16
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            ignore_checks: Vec::new(),
            max_candidates: default_max_candidates(),
            max_scenario_leaves: default_max_scenario_leaves(),
            strict_types: false,
            parallel_regions: false,
        }
    }
}

impl LintConfig {
    /// Parse a configuration file. `.json` files are read as JSON, anything
    /// else as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::ConfigFile`] when the file cannot be read or
    /// parsed, or [`LintError::Configuration`] when a value is out of range.
    pub fn load(path: &Path) -> Result<Self, LintError> {
        let file_err = |reason: String| LintError::ConfigFile {
            path: path.display().to_string(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| file_err(e.to_string()))?;
        let config: Self = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&text).map_err(|e| file_err(e.to_string()))?
        } else {
            serde_yaml::from_str(&text).map_err(|e| file_err(e.to_string()))?
        };
        config.check()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Invalid`] for zero bounds.
    pub fn check(&self) -> Result<(), ConfigurationError> {
        if self.max_candidates == 0 {
            return Err(ConfigurationError::Invalid("max_candidates must be at least 1".into()));
        }
        if self.max_scenario_leaves == 0 {
            return Err(ConfigurationError::Invalid(
                "max_scenario_leaves must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Whether findings of `rule_id` are dropped.
    pub fn is_ignored(&self, rule_id: &str) -> bool {
        self.ignore_checks
            .iter()
            .any(|prefix| !prefix.is_empty() && rule_id.starts_with(prefix.as_str()))
    }

    /// The configured regions, or `us-east-1`.
    pub fn effective_regions(&self) -> Vec<Region> {
        if self.regions.is_empty() {
            Region::new("us-east-1").into_iter().collect()
        } else {
            self.regions.clone()
        }
    }
}
