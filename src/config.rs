//! Configuration module for Folio.

use serde::Deserialize;
use std::path::Path;

use crate::file::DEFAULT_MAX_FILE_SIZE;
use crate::folder::DEFAULT_MAX_DEPTH;
use crate::tag::DEFAULT_TREE_DEPTH;
use crate::{FolioError, Result};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/folio.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/folio.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// File limits.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Maximum file size in megabytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: u64,
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE / (1024 * 1024)
}

impl FilesConfig {
    /// Maximum file size in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size(),
        }
    }
}

/// Folder hierarchy limits.
#[derive(Debug, Clone, Deserialize)]
pub struct FoldersConfig {
    /// Maximum number of nesting levels.
    #[serde(default = "default_max_depth")]
    pub max_depth: i64,
}

fn default_max_depth() -> i64 {
    DEFAULT_MAX_DEPTH
}

impl Default for FoldersConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

/// Tag configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TagsConfig {
    /// Create the default tags at startup.
    #[serde(default = "default_seed_defaults")]
    pub seed_defaults: bool,
    /// Depth bound for tag trees.
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
}

fn default_seed_defaults() -> bool {
    true
}

fn default_max_tree_depth() -> usize {
    DEFAULT_TREE_DEPTH
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            seed_defaults: default_seed_defaults(),
            max_tree_depth: default_max_tree_depth(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// File limits.
    #[serde(default)]
    pub files: FilesConfig,
    /// Folder limits.
    #[serde(default)]
    pub folders: FoldersConfig,
    /// Tag configuration.
    #[serde(default)]
    pub tags: TagsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FolioError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FolioError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FOLIO_DATABASE_PATH`: Override the database path
    /// - `FOLIO_LOG_LEVEL`: Override the log level
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("FOLIO_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(level) = std::env::var("FOLIO_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The database path is empty
    /// - The log level is unknown
    /// - A size or depth limit is zero
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(FolioError::Config("database.path must not be empty".to_string()));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(FolioError::Config(format!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }
        if self.files.max_file_size_mb == 0 {
            return Err(FolioError::Config(
                "files.max_file_size_mb must be positive".to_string(),
            ));
        }
        if self.folders.max_depth < 1 {
            return Err(FolioError::Config(
                "folders.max_depth must be at least 1".to_string(),
            ));
        }
        if self.tags.max_tree_depth == 0 {
            return Err(FolioError::Config(
                "tags.max_tree_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.database.path, "data/folio.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/folio.log");
        assert_eq!(config.files.max_file_size_mb, 100);
        assert_eq!(config.files.max_file_size_bytes(), 100 * 1024 * 1024);
        assert_eq!(config.folders.max_depth, 32);
        assert!(config.tags.seed_defaults);
        assert_eq!(config.tags.max_tree_depth, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[database]
path = "custom/folio.sqlite"

[logging]
level = "debug"
file = "custom/folio.log"

[files]
max_file_size_mb = 5

[folders]
max_depth = 8

[tags]
seed_defaults = false
max_tree_depth = 4
"#;
        let config = Config::parse(toml).unwrap();

        assert_eq!(config.database.path, "custom/folio.sqlite");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/folio.log");
        assert_eq!(config.files.max_file_size_bytes(), 5 * 1024 * 1024);
        assert_eq!(config.folders.max_depth, 8);
        assert!(!config.tags.seed_defaults);
        assert_eq!(config.tags.max_tree_depth, 4);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[folders]
max_depth = 3
"#;
        let config = Config::parse(toml).unwrap();

        assert_eq!(config.folders.max_depth, 3);
        assert_eq!(config.database.path, "data/folio.db");
        assert!(config.tags.seed_defaults);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.database.path, "data/folio.db");
        assert_eq!(config.files.max_file_size_mb, 100);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        if let Err(FolioError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(FolioError::Io(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_apply_env_overrides_database_path() {
        let original = std::env::var("FOLIO_DATABASE_PATH").ok();

        std::env::set_var("FOLIO_DATABASE_PATH", "env/folio.db");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.database.path, "env/folio.db");

        std::env::set_var("FOLIO_DATABASE_PATH", "");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.database.path, "data/folio.db");

        if let Some(val) = original {
            std::env::set_var("FOLIO_DATABASE_PATH", val);
        } else {
            std::env::remove_var("FOLIO_DATABASE_PATH");
        }
    }

    #[test]
    fn test_apply_env_overrides_log_level() {
        let original = std::env::var("FOLIO_LOG_LEVEL").ok();

        std::env::set_var("FOLIO_LOG_LEVEL", "trace");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.logging.level, "trace");

        if let Some(val) = original {
            std::env::set_var("FOLIO_LOG_LEVEL", val);
        } else {
            std::env::remove_var("FOLIO_LOG_LEVEL");
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(matches!(config.validate(), Err(FolioError::Config(_))));

        let mut config = Config::default();
        config.folders.max_depth = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.files.max_file_size_mb = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.database.path = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
