//! Typed configuration document for the subguard daemon.
//!
//! The on-disk format is a keyed YAML document. Only the fields below are
//! interpreted; unknown fields are ignored here and preserved verbatim by the
//! source-list editor, which operates on the raw document.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Top-level daemon configuration (kebab-case YAML keys).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AppConfig {
    /// Subscription source URLs to validate each round.
    pub sub_urls: Vec<String>,
    /// Minutes between validation rounds (interval mode).
    pub check_interval: u64,
    /// Optional cron expression; when set (and valid) it replaces interval mode.
    pub cron_expression: String,
    /// Consecutive-failure threshold for source eviction; `<= 0` disables eviction.
    pub sub_urls_fail_remove: i64,
    /// Maximum concurrent source fetches per round.
    pub concurrent: usize,
    /// Per-fetch timeout in seconds.
    pub timeout: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sub_urls: Vec::new(),
            check_interval: 300,
            cron_expression: String::new(),
            sub_urls_fail_remove: 0,
            concurrent: 16,
            timeout: 10,
        }
    }
}

impl AppConfig {
    /// Load and validate the configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Interval between rounds as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.check_interval * 60)
    }

    fn validate(&self) -> Result<()> {
        if self.check_interval == 0 {
            return Err(ConfigError::Validation(
                "check-interval must be at least 1 minute".to_string(),
            ));
        }
        if self.timeout == 0 {
            return Err(ConfigError::Validation(
                "timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_full_config() {
        let file = write_config(
            "sub-urls:\n  - https://a.example/sub\n  - https://b.example/sub\ncheck-interval: 60\ncron-expression: \"0 6 * * *\"\nsub-urls-fail-remove: 3\nconcurrent: 4\ntimeout: 5\n",
        );
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.sub_urls.len(), 2);
        assert_eq!(config.check_interval, 60);
        assert_eq!(config.cron_expression, "0 6 * * *");
        assert_eq!(config.sub_urls_fail_remove, 3);
        assert_eq!(config.concurrent, 4);
        assert_eq!(config.timeout, 5);
    }

    #[test]
    fn load_applies_defaults() {
        let file = write_config("sub-urls:\n  - https://a.example/sub\n");
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.check_interval, 300);
        assert_eq!(config.sub_urls_fail_remove, 0);
        assert_eq!(config.interval(), Duration::from_secs(300 * 60));
    }

    #[test]
    fn load_tolerates_unknown_fields() {
        let file = write_config("sub-urls: []\nlisten-port: \"8080\"\nprint-progress: true\n");
        let config = AppConfig::load(file.path()).unwrap();
        assert!(config.sub_urls.is_empty());
    }

    #[test]
    fn load_rejects_zero_interval() {
        let file = write_config("check-interval: 0\n");
        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let err = AppConfig::load(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn load_malformed_yaml_is_an_error() {
        let file = write_config("sub-urls: [unclosed\n");
        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
