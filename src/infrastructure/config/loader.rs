use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".approvals";

/// Prefix of environment overrides, e.g. `APPROVALS_LOGGING__LEVEL=debug`.
pub const ENV_PREFIX: &str = "APPROVALS_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid max_conflict_retries: {0}. Cannot be 0")]
    InvalidConflictRetries(u32),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .approvals/config.yaml (project config, created by init)
    /// 3. .approvals/local.yaml (project local overrides, optional)
    /// 4. Environment variables (APPROVALS_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(CONFIG_DIR)
    }

    /// Same as [`ConfigLoader::load`] with the config files read from `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.engine.max_conflict_retries == 0 {
            return Err(ConfigError::InvalidConflictRetries(config.engine.max_conflict_retries));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.path, ".approvals/approvals.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.engine.max_conflict_retries, 3);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
database:
  path: /custom/path.db
  max_connections: 2
logging:
  level: debug
  format: json
  log_dir: /var/log/approvals
engine:
  max_conflict_retries: 5
";
        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.database.path, "/custom/path.db");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.log_dir.as_deref(), Some("/var/log/approvals"));
        assert_eq!(config.logging.rotation, "daily");
        assert_eq!(config.engine.max_conflict_retries, 5);
        assert_eq!(config.engine.conflict_backoff_ms, 10);
        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidLogLevel(l)) if l == "verbose"));

        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidLogFormat(_))));

        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidRotation(_))));

        let mut config = Config::default();
        config.database.path = "  ".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::EmptyDatabasePath)));

        let mut config = Config::default();
        config.database.max_connections = 0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidMaxConnections(0))));

        let mut config = Config::default();
        config.engine.max_conflict_retries = 0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidConflictRetries(0))));
    }

    #[test]
    fn test_hierarchical_merging() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "logging:\n  level: info\n  format: json\nengine:\n  conflict_backoff_ms: 50\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("local.yaml"), "logging:\n  level: debug\n").unwrap();

        temp_env::with_vars([("APPROVALS_ENGINE__MAX_CONFLICT_RETRIES", Some("7"))], || {
            let config = ConfigLoader::load_from_dir(dir.path()).unwrap();
            assert_eq!(config.logging.level, "debug", "local.yaml should win");
            assert_eq!(config.logging.format, "json", "Base value should persist when not overridden");
            assert_eq!(config.engine.conflict_backoff_ms, 50);
            assert_eq!(config.engine.max_conflict_retries, 7, "Environment should win");
        });
    }

    #[test]
    fn test_env_override_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_vars([("APPROVALS_LOGGING__LEVEL", Some("loud"))], || {
            assert!(ConfigLoader::load_from_dir(dir.path()).is_err());
        });
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database:\n  path: other.db").unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.database.path, "other.db");
        assert_eq!(config.database.max_connections, 5);
    }
}
