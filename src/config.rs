//! Engine configuration.
//!
//! Loaded from a TOML file, then optionally overridden from `LISTBOARD_*`
//! environment variables. Every field has a default, so an empty file is a
//! valid configuration.

use crate::error::{BoardError, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};
use tokio::fs;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub ordering: OrderingConfig,
}

/// Relational store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file; `None` opens an in-memory database
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    /// Write-ahead logging for file databases
    pub wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5_000,
            wal: true,
        }
    }
}

/// What a move or insert does with a target index past the container end
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRange {
    /// Fail with an invalid-argument error
    #[default]
    Reject,
    /// Use the last valid slot instead
    Clamp,
}

impl FromStr for OutOfRange {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "clamp" => Ok(Self::Clamp),
            _ => Err(BoardError::ConfigError(format!(
                "Invalid out-of-range policy '{}'. Valid policies: reject, clamp",
                s
            ))),
        }
    }
}

impl fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Clamp => write!(f, "clamp"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingConfig {
    pub out_of_range: OutOfRange,
}

impl Config {
    pub const ENV_DATABASE_PATH: &'static str = "LISTBOARD_DATABASE_PATH";
    pub const ENV_BUSY_TIMEOUT_MS: &'static str = "LISTBOARD_BUSY_TIMEOUT_MS";
    pub const ENV_WAL: &'static str = "LISTBOARD_WAL";
    pub const ENV_OUT_OF_RANGE: &'static str = "LISTBOARD_OUT_OF_RANGE";

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| BoardError::ConfigError(e.to_string()))
    }

    /// Reads a TOML configuration file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).await?;
        Self::from_toml_str(&contents)
    }

    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up by variable name
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = lookup(Self::ENV_DATABASE_PATH) {
            self.database.path = if path.is_empty() || path == ":memory:" {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }

        if let Some(timeout) = lookup(Self::ENV_BUSY_TIMEOUT_MS) {
            self.database.busy_timeout_ms = timeout.trim().parse().map_err(|_| {
                BoardError::ConfigError(format!(
                    "{} must be a whole number of milliseconds, got '{}'",
                    Self::ENV_BUSY_TIMEOUT_MS,
                    timeout
                ))
            })?;
        }

        if let Some(wal) = lookup(Self::ENV_WAL) {
            self.database.wal = match wal.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(BoardError::ConfigError(format!(
                        "{} must be a boolean, got '{}'",
                        Self::ENV_WAL,
                        wal
                    )))
                }
            };
        }

        if let Some(policy) = lookup(Self::ENV_OUT_OF_RANGE) {
            self.ordering.out_of_range = policy.parse()?;
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert_eq!(config.ordering.out_of_range, OutOfRange::Reject);
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml_str(
            r#"
            [database]
            path = "/var/lib/listboard/board.db"
            busy_timeout_ms = 250
            wal = false

            [ordering]
            out_of_range = "clamp"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.database.path,
            Some(PathBuf::from("/var/lib/listboard/board.db"))
        );
        assert_eq!(config.database.busy_timeout_ms, 250);
        assert!(!config.database.wal);
        assert_eq!(config.ordering.out_of_range, OutOfRange::Clamp);
    }

    #[test]
    fn test_invalid_policy_is_config_error() {
        let result = Config::from_toml_str("[ordering]\nout_of_range = \"wrap\"\n");
        assert!(matches!(result, Err(BoardError::ConfigError(_))));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (Config::ENV_DATABASE_PATH, "/tmp/board.db"),
            (Config::ENV_BUSY_TIMEOUT_MS, "100"),
            (Config::ENV_WAL, "off"),
            (Config::ENV_OUT_OF_RANGE, "Clamp"),
        ]
        .into_iter()
        .collect();

        let config = Config::default()
            .with_overrides_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/board.db")));
        assert_eq!(config.database.busy_timeout_ms, 100);
        assert!(!config.database.wal);
        assert_eq!(config.ordering.out_of_range, OutOfRange::Clamp);
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let result = Config::default().with_overrides_from(|key| {
            (key == Config::ENV_BUSY_TIMEOUT_MS).then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(BoardError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("listboard.toml");
        tokio::fs::write(&path, "[ordering]\nout_of_range = \"clamp\"\n")
            .await
            .unwrap();

        let config = Config::load(&path).await.unwrap();
        assert_eq!(config.ordering.out_of_range, OutOfRange::Clamp);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::load(temp_dir.path().join("missing.toml")).await;
        assert!(matches!(result, Err(BoardError::IoError(_))));
    }
}
