//! Catalog configuration
//!
//! A small JSON file naming the database and how to log:
//!
//! ```json
//! {
//!     "path": "/var/lib/devicedb/db.json",
//!     "container_dir": "/etc/devicedb/containers",
//!     "log_format": "json",
//!     "log_level": "info"
//! }
//! ```
//!
//! Only `path` is required. The file is located by, in order: an explicit
//! path, `$DEVICEDB_CFG`, then `devicedb.json` in the working directory.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{LogFormat, LOG_LEVELS};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "DEVICEDB_CFG";

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "devicedb.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Database file (required)
    pub path: String,

    /// Directory of extra container definitions
    #[serde(default)]
    pub container_dir: Option<String>,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl CatalogConfig {
    /// Defaults for the database at `path`
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            container_dir: None,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }

    /// Load and validate configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: CatalogConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.path.trim().is_empty() {
            return Err(ConfigError::Invalid("path must not be empty".into()));
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log_level: '{}'. Expected one of {}.",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

/// Configuration file to use, if any.
///
/// An explicit path always wins, even if the file does not exist, so the
/// caller gets a read error instead of a silent fallback.
pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    locate_from(explicit, std::env::var_os(CONFIG_ENV), Path::new("."))
}

fn locate_from(explicit: Option<&Path>, env: Option<OsString>, cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let local = cwd.join(DEFAULT_CONFIG_FILE);
    local.is_file().then_some(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "cfg.json", r#"{"path": "db.json"}"#);

        let config = CatalogConfig::load(&path).unwrap();
        assert_eq!(config, CatalogConfig::for_path("db.json"));
    }

    #[test]
    fn test_full_config() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "cfg.json",
            r#"{"path": "db.json", "container_dir": "c", "log_format": "json", "log_level": "debug"}"#,
        );

        let config = CatalogConfig::load(&path).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.container_dir.as_deref(), Some("c"));
    }

    #[test]
    fn test_invalid_configs() {
        let tmp = TempDir::new().unwrap();

        let missing_path = write(&tmp, "a.json", r#"{"log_level": "info"}"#);
        assert!(matches!(
            CatalogConfig::load(&missing_path),
            Err(ConfigError::Parse { .. })
        ));

        let empty_path = write(&tmp, "b.json", r#"{"path": " "}"#);
        assert!(matches!(
            CatalogConfig::load(&empty_path),
            Err(ConfigError::Invalid(_))
        ));

        let bad_level = write(&tmp, "c.json", r#"{"path": "db.json", "log_level": "loud"}"#);
        assert!(matches!(
            CatalogConfig::load(&bad_level),
            Err(ConfigError::Invalid(_))
        ));

        assert!(matches!(
            CatalogConfig::load(&tmp.path().join("nope.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_lookup_order() {
        let tmp = TempDir::new().unwrap();
        let explicit = Path::new("/etc/explicit.json");

        assert_eq!(
            locate_from(Some(explicit), Some("env.json".into()), tmp.path()),
            Some(explicit.to_path_buf())
        );
        assert_eq!(
            locate_from(None, Some("env.json".into()), tmp.path()),
            Some(PathBuf::from("env.json"))
        );
        assert_eq!(locate_from(None, None, tmp.path()), None);

        let local = write(&tmp, DEFAULT_CONFIG_FILE, r#"{"path": "db.json"}"#);
        assert_eq!(locate_from(None, Some("".into()), tmp.path()), Some(local));
    }
}
