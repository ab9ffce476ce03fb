//! Configuration management for the backup runner.
//!
//! Loads an optional TOML file; the `SCRATCH` environment variable overrides
//! the scratch root.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable selecting the scratch root
pub const SCRATCH_ENV: &str = "SCRATCH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scratch: ScratchConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchConfig {
    /// Temporary archives and rsync staging directories live here
    #[serde(default = "default_scratch_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Job catalog used when none is given on the command line
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

// Default values
fn default_scratch_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("library.json")
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            dir: default_scratch_dir(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Scratch root, honouring `SCRATCH` when it is set and non-empty.
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_root_with(std::env::var(SCRATCH_ENV).ok())
    }

    fn scratch_root_with(&self, env_value: Option<String>) -> PathBuf {
        match env_value {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => self.scratch.dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.scratch.dir, PathBuf::from("/tmp"));
        assert_eq!(config.log.level, "info");
        assert_eq!(config.catalog.path, PathBuf::from("library.json"));
    }

    #[test]
    fn test_scratch_env_override() {
        let config = Config::default();
        assert_eq!(
            config.scratch_root_with(Some("/custom/scratch".into())),
            PathBuf::from("/custom/scratch")
        );
        assert_eq!(config.scratch_root_with(Some(String::new())), PathBuf::from("/tmp"));
        assert_eq!(config.scratch_root_with(None), PathBuf::from("/tmp"));
    }

    #[test]
    fn test_from_file_partial() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[scratch]\ndir = \"/var/tmp/backups\"\n\n[log]\nlevel = \"debug\"")?;
        file.flush()?;

        let config = Config::from_file(file.path())?;
        assert_eq!(config.scratch.dir, PathBuf::from("/var/tmp/backups"));
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.catalog.path, PathBuf::from("library.json"));
        Ok(())
    }

    #[test]
    fn test_from_file_rejects_garbage() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[scratch\ndir = ")?;
        file.flush()?;
        assert!(Config::from_file(file.path()).is_err());
        Ok(())
    }
}
