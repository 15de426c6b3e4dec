//! Configuration loading and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default port for the API server.
pub const DEFAULT_API_PORT: u16 = 7920;

/// Environment variable naming an explicit config file path.
pub const CONFIG_PATH_ENV: &str = "RESORT_OS_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Port the API server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Organization all requests are scoped to.
    #[serde(default = "default_org_id")]
    pub org_id: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            port: default_port(),
            org_id: default_org_id(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("resort-os.db")
}

fn default_port() -> u16 {
    DEFAULT_API_PORT
}

fn default_org_id() -> i64 {
    crate::db::DEFAULT_ORG_ID
}

impl Config {
    /// Load configuration.
    ///
    /// Order of precedence for the file path: the explicit argument, the
    /// `RESORT_OS_CONFIG` environment variable, `resort-os.yaml` in the
    /// working directory, then the user config directory. A missing file
    /// yields built-in defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
            .or_else(|| {
                let local = PathBuf::from("resort-os.yaml");
                if local.exists() {
                    return Some(local);
                }
                dirs::config_dir().map(|d| d.join("resort-os").join("config.yaml"))
            });

        let Some(path) = path else {
            return Ok(Self::default());
        };

        if !path.exists() {
            if explicit_path.is_some() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Create the database's parent directory if needed.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_yaml() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.server.port, DEFAULT_API_PORT);
        assert_eq!(config.server.org_id, 1);
        assert_eq!(config.server.db_path, PathBuf::from("resort-os.db"));
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config: Config = serde_yaml::from_str("server:\n  port: 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.org_id, 1);
    }
}
