//! Engine configuration file support.
//!
//! Reads the store backend selection and evaluation settings from a TOML
//! configuration file, with environment-variable overrides.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::factory::RepositoryType;

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub repository: RepositorySettings,
    #[serde(default)]
    pub evaluation: EvaluationSettings,
}

/// Store backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type")]
    pub repo_type: String,
}

/// Evaluation behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSettings {
    /// Default lookahead cutoff (days) applied when a caller passes no
    /// explicit filter. Zero disables the cutoff.
    #[serde(default)]
    pub default_filter_days: u32,
    /// Combine per-profile `is_super_admin_excluded` flags the way the
    /// legacy system did (last profile wins) instead of OR across profiles.
    #[serde(default)]
    pub legacy_super_admin_combination: bool,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        EvaluationSettings {
            default_filter_days: 0,
            legacy_super_admin_combination: false,
        }
    }
}

impl RepositoryConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse repository configuration TOML")
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    /// Resolve the configured backend type, honoring the `REPOSITORY_TYPE`
    /// environment variable over the file value.
    pub fn repository_type(&self) -> Result<RepositoryType> {
        if let Ok(val) = std::env::var("REPOSITORY_TYPE") {
            return RepositoryType::from_str(&val).map_err(anyhow::Error::msg);
        }
        RepositoryType::from_str(&self.repository.repo_type).map_err(anyhow::Error::msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let config = RepositoryConfig::from_toml_str(
            r#"
            [repository]
            type = "local"
            "#,
        )
        .unwrap();
        assert_eq!(config.repository.repo_type, "local");
        assert_eq!(config.evaluation.default_filter_days, 0);
        assert!(!config.evaluation.legacy_super_admin_combination);
    }

    #[test]
    fn test_parse_evaluation_settings() {
        let config = RepositoryConfig::from_toml_str(
            r#"
            [repository]
            type = "local"

            [evaluation]
            default_filter_days = 30
            legacy_super_admin_combination = true
            "#,
        )
        .unwrap();
        assert_eq!(config.evaluation.default_filter_days, 30);
        assert!(config.evaluation.legacy_super_admin_combination);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[repository]\ntype = \"local\"").unwrap();
        let config = RepositoryConfig::from_file(file.path()).unwrap();
        assert_eq!(config.repository.repo_type, "local");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(RepositoryConfig::from_toml_str("[repository").is_err());
    }
}
