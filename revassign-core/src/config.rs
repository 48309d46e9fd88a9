//! Configuration management for revassign
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (REVASSIGN_*)
//! 3. Config file (~/.config/revassign/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Database-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file
    pub path: PathBuf,

    /// Maximum number of pooled connections
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let path = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("revassign")
            .join("revassign.db");

        Self {
            path,
            max_connections: 5,
        }
    }
}

/// Assignment engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssignmentSettings {
    /// Deadline for a single engine operation
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,

    /// Fixed seed for reviewer selection (random if unset)
    pub seed: Option<u64>,
}

impl Default for AssignmentSettings {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(5),
            seed: None,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseSettings,
    pub assignment: AssignmentSettings,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/revassign/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("revassign").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - REVASSIGN_DB_PATH: database file
    /// - REVASSIGN_MAX_CONNECTIONS: pool size
    /// - REVASSIGN_OPERATION_TIMEOUT: e.g. "500ms", "10s"
    /// - REVASSIGN_SEED: selection seed
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = var("REVASSIGN_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = var("REVASSIGN_MAX_CONNECTIONS") {
            self.database.max_connections = max.parse().map_err(|_| {
                Error::Config(format!("REVASSIGN_MAX_CONNECTIONS is not a number: {}", max))
            })?;
        }

        if let Some(timeout) = var("REVASSIGN_OPERATION_TIMEOUT") {
            self.assignment.operation_timeout = humantime_serde::re::humantime::parse_duration(&timeout)
                .map_err(|e| Error::Config(format!("REVASSIGN_OPERATION_TIMEOUT: {}", e)))?;
        }

        if let Some(seed) = var("REVASSIGN_SEED") {
            self.assignment.seed = Some(seed.parse().map_err(|_| {
                Error::Config(format!("REVASSIGN_SEED is not a number: {}", seed))
            })?);
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, db_path: Option<PathBuf>) -> Self {
        if let Some(path) = db_path {
            self.database.path = path;
        }
        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        config_file: Option<&Path>,
        db_path: Option<PathBuf>,
    ) -> Result<Self> {
        let base = match config_file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };
        Ok(base.with_env_overrides()?.with_cli_overrides(db_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.path.ends_with("revassign/revassign.db"));
        assert_eq!(config.assignment.operation_timeout, Duration::from_secs(5));
        assert!(config.assignment.seed.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[database]
path = "/var/lib/revassign/data.db"
max_connections = 10

[assignment]
operation_timeout = "750ms"
seed = 42
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database.path, PathBuf::from("/var/lib/revassign/data.db"));
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.assignment.operation_timeout, Duration::from_millis(750));
        assert_eq!(config.assignment.seed, Some(42));
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
[assignment]
seed = 7
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.assignment.operation_timeout, Duration::from_secs(5));
        assert_eq!(config.assignment.seed, Some(7));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("REVASSIGN_DB_PATH", "/tmp/r.db"),
            ("REVASSIGN_OPERATION_TIMEOUT", "2s"),
            ("REVASSIGN_SEED", "3"),
        ]
        .into_iter()
        .collect();

        let config = Config::default()
            .with_overrides_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/r.db"));
        assert_eq!(config.assignment.operation_timeout, Duration::from_secs(2));
        assert_eq!(config.assignment.seed, Some(3));
    }

    #[test]
    fn test_bad_env_value() {
        let err = Config::default()
            .with_overrides_from(|k| (k == "REVASSIGN_SEED").then(|| "abc".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_cli_overrides_win() {
        let config = Config::default().with_cli_overrides(Some(PathBuf::from("/cli.db")));
        assert_eq!(config.database.path, PathBuf::from("/cli.db"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[database]\nmax_connections = 2\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.database.max_connections, 2);

        std::fs::write(&path, "[database\n").unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(Error::Config(_))
        ));
    }
}
