//! Configuration management for fintrack
//!
//! This module handles loading, validation, and management of
//! fintrack configuration from YAML files.

pub mod error;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use error::ConfigError;

/// Slugs of every page the host knows how to mount, in navigation order.
pub const PAGE_SLUGS: &[&str] = &[
    "accounts",
    "account-categories",
    "expenses",
    "expense-categories",
    "contributions",
    "funds",
    "holdings",
];

// ==================== Configuration Types ====================

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

/// Data configuration for the in-memory backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// JSON file with the records loaded at startup
    #[serde(default = "default_seed_file")]
    pub seed_file: PathBuf,
    /// Load the seed file when it exists
    #[serde(default = "default_true")]
    pub load_seed: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            seed_file: default_seed_file(),
            load_seed: true,
        }
    }
}

fn default_seed_file() -> PathBuf {
    PathBuf::from("./data/seed.json")
}

fn default_true() -> bool {
    true
}

/// Currency and number display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Symbol placed before monetary amounts
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    /// Decimal places for monetary amounts
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
    /// Thousands separator
    #[serde(default = "default_thousands_sep")]
    pub thousands_separator: String,
    /// Decimal places for share counts
    #[serde(default = "default_fine_places")]
    pub share_decimals: u32,
    /// Decimal places for percentages
    #[serde(default = "default_fine_places")]
    pub percentage_decimals: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            decimal_places: default_decimal_places(),
            thousands_separator: default_thousands_sep(),
            share_decimals: default_fine_places(),
            percentage_decimals: default_fine_places(),
        }
    }
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_decimal_places() -> u32 {
    2
}

fn default_thousands_sep() -> String {
    ",".to_string()
}

fn default_fine_places() -> u32 {
    3
}

/// Which entity pages are mounted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagesConfig {
    /// Page slugs to mount
    #[serde(default = "default_enabled_pages")]
    pub enabled: Vec<String>,
    /// Show filter controls on pages that support them
    #[serde(default = "default_true")]
    pub filters: bool,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_pages(),
            filters: true,
        }
    }
}

fn default_enabled_pages() -> Vec<String> {
    PAGE_SLUGS.iter().map(|s| s.to_string()).collect()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Data settings
    #[serde(default)]
    pub data: DataConfig,
    /// Display settings
    #[serde(default)]
    pub display: DisplayConfig,
    /// Page settings
    #[serde(default)]
    pub pages: PagesConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|_| ConfigError::IoError)?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|_| ConfigError::InvalidYaml)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        let places = [
            ("display.decimal_places", self.display.decimal_places),
            ("display.share_decimals", self.display.share_decimals),
            ("display.percentage_decimals", self.display.percentage_decimals),
        ];
        for (field, value) in places {
            if value > 10 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "Decimal places must be between 0 and 10".to_string(),
                });
            }
        }

        for slug in &self.pages.enabled {
            if !PAGE_SLUGS.contains(&slug.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "pages.enabled".to_string(),
                    reason: format!("Unknown page '{}', expected one of: {}", slug, PAGE_SLUGS.join(", ")),
                });
            }
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "logging.level".to_string(),
                    reason: format!("Invalid log level: {}", other),
                });
            }
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Check if a page is enabled
    pub fn is_page_enabled(&self, slug: &str) -> bool {
        self.pages.enabled.iter().any(|s| s == slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigErrorCode;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.display.currency_symbol, "$");
        assert_eq!(config.display.share_decimals, 3);
        assert_eq!(config.pages.enabled.len(), PAGE_SLUGS.len());
        assert!(config.pages.filters);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = Config::from_yaml("server:\n  port: 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_generated_default_is_valid() {
        let config = Config::from_yaml(Config::generate_default()).unwrap();
        assert!(config.is_page_enabled("expenses"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_rejects_zero_port() {
        let err = Config::from_yaml("server:\n  port: 0\n").unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::InvalidValue);
    }

    #[test]
    fn test_rejects_unknown_page() {
        let err = Config::from_yaml("pages:\n  enabled: [accounts, budgets]\n").unwrap_err();
        assert!(err.to_string().contains("pages.enabled"));
    }

    #[test]
    fn test_rejects_bad_log_level() {
        let err = Config::from_yaml("logging:\n  level: loud\n").unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::InvalidValue);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Config::from_yaml("server: [unclosed").unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::InvalidYaml);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(PathBuf::from("/nonexistent/fintrack.yaml")).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::FileNotFound);
    }
}
