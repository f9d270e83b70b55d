//! reviewd configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::coordinator::CoordinatorConfig;

/// Main reviewd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener and participant pool configuration
    pub server: ServerConfig,

    /// Coordinator configuration
    pub coordinator: CoordinatorConfig,

    /// Logging configuration
    pub log: LogConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.server.participants < 2 {
            return Err(eyre::eyre!(
                "server.participants must be at least 2 so every author has a possible reviewer (got {})",
                self.server.participants
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .reviewd.yml
        let local_config = PathBuf::from(".reviewd.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/reviewd/reviewd.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("reviewd").join("reviewd.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the configured log level, for use before logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|config| config.log.level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Listener and participant pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds
    pub bind: String,

    /// Fixed number of participant connections to accept at startup
    pub participants: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7077".to_string(),
            participants: 3,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default log level when neither RUST_LOG nor --log-level is set
    pub level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:7077");
        assert_eq!(config.server.participants, 3);
        assert_eq!(config.coordinator.rng_seed, None);
        assert_eq!(config.log.level, None);
    }

    #[test]
    fn test_validate_rejects_tiny_pool() {
        let mut config = Config::default();
        config.server.participants = 1;
        assert!(config.validate().is_err());

        config.server.participants = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  bind: 0.0.0.0:9000\n  participants: 4\ncoordinator:\n  rng-seed: 11\nlog:\n  level: debug"
        )
        .unwrap();

        let path = file.path().to_path_buf();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.server.participants, 4);
        assert_eq!(config.coordinator.rng_seed, Some(11));
        assert_eq!(config.log.level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  participants: 6").unwrap();

        let path = file.path().to_path_buf();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.server.participants, 6);
        assert_eq!(config.server.bind, "127.0.0.1:7077");
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let path = PathBuf::from("/nonexistent/reviewd.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_log_level() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "log:\n  level: TRACE").unwrap();

        let path = file.path().to_path_buf();
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("TRACE"));
    }
}
