//! Layered CLI configuration: defaults, optional TOML file, `ATTEST_*`
//! environment variables, then command-line overrides.

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "ATTEST";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sled,
    /// Process-local; state is discarded on exit.
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestConfig {
    pub data_dir: PathBuf,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Default `max_count` for `sweep`.
    pub sweep_batch: u16,
    pub page_limit: usize,
    pub backend: Backend,
}

impl Default for AttestConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            sweep_batch: 100,
            page_limit: 50,
            backend: Backend::Sled,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("attest"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

impl AttestConfig {
    /// Load configuration. An explicitly named file must exist; environment
    /// variables override file values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                bail!(
                    "Configuration file {} not found (specified via --config)",
                    path.display()
                );
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        let config = builder
            .add_source(env)
            .build()
            .context("failed to assemble configuration")?;
        config
            .try_deserialize()
            .context("invalid configuration values")
    }

    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, log_level: Option<String>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if let Some(level) = log_level {
            self.log_level = level;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn no_env() -> Environment {
        Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::new()))
    }

    #[test]
    fn defaults_apply_without_sources() {
        let config = AttestConfig::load_with_env(None, no_env()).unwrap();
        assert_eq!(config, AttestConfig::default());
        assert_eq!(config.sweep_batch, 100);
        assert_eq!(config.backend, Backend::Sled);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attest.toml");
        fs::write(
            &path,
            "data_dir = \"/var/lib/attest\"\nsweep_batch = 7\nlog_format = \"json\"\n",
        )
        .unwrap();

        let config = AttestConfig::load_with_env(Some(&path), no_env()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/attest"));
        assert_eq!(config.sweep_batch, 7);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.page_limit, 50);
    }

    #[test]
    fn environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attest.toml");
        fs::write(&path, "backend = \"sled\"\npage_limit = 10\n").unwrap();

        let env = Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .source(Some(HashMap::from([
                ("ATTEST_BACKEND".to_string(), "memory".to_string()),
                ("ATTEST_PAGE_LIMIT".to_string(), "25".to_string()),
            ])));
        let config = AttestConfig::load_with_env(Some(&path), env).unwrap();
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.page_limit, 25);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(AttestConfig::load_with_env(Some(&missing), no_env()).is_err());
    }

    #[test]
    fn flags_take_precedence() {
        let config = AttestConfig::default()
            .with_overrides(Some(PathBuf::from("/tmp/x")), Some("debug".into()));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/x"));
        assert_eq!(config.log_level, "debug");
    }
}
