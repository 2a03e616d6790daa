//! # Configuration
//!
//! Top-level runtime configuration and its discovery hierarchy, per
//! spec.md §6. The discovery walk (local project file, then user file,
//! then system file, falling back to built-in defaults, merging
//! nothing across tiers — first file found wins outright) is ported
//! from the teacher's own `env.rs` local-then-home config path
//! resolution; the original system this spec was distilled from
//! (`original_source/src/aiforge/config.py`) only ever loads a single
//! `aiforge.toml` from the working directory with no discovery
//! hierarchy of its own.

use crate::env;
use crate::executor::config::SecurityConfig;
use crate::llm::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

/// `[cache.code]`: retention policy for the code cache, per spec.md §4.2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeCacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_modules_per_task_type")]
    pub max_modules_per_task_type: usize,
}

impl Default for CodeCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_modules_per_task_type: default_max_modules_per_task_type(),
        }
    }
}

fn default_max_modules_per_task_type() -> usize {
    50
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub code: CodeCacheConfig,
}

/// `[optimization]`: knobs for the multi-round controller, per spec.md
/// §4.8.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationConfig {
    #[serde(default = "default_true")]
    pub optimize_tokens: bool,
    #[serde(default = "default_max_history")]
    pub max_conversation_history: usize,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            optimize_tokens: true,
            max_conversation_history: default_max_history(),
        }
    }
}

fn default_max_history() -> usize {
    8
}

fn default_true() -> bool {
    true
}

fn default_workdir() -> PathBuf {
    PathBuf::from(".codeforge-workdir")
}

fn default_max_rounds() -> u32 {
    3
}

fn default_max_optimization_attempts() -> u32 {
    3
}

fn default_locale() -> String {
    "en".to_string()
}

/// Top-level runtime configuration, assembled from whichever single file
/// [`ConfigDiscovery`] finds (or the built-in defaults if none exist).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    #[serde(default = "default_max_optimization_attempts")]
    pub max_optimization_attempts: u32,
    pub default_llm_provider: Option<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub llm: BTreeMap<String, ProviderConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub optimization: OptimizationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            max_rounds: default_max_rounds(),
            max_optimization_attempts: default_max_optimization_attempts(),
            default_llm_provider: None,
            locale: default_locale(),
            llm: BTreeMap::new(),
            cache: CacheConfig::default(),
            security: SecurityConfig::default(),
            optimization: OptimizationConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

/// Searches the configuration hierarchy and loads the first file found:
/// `<current_dir>/codeforge.toml`, then `~/.codeforge/config.toml`, then
/// `/etc/codeforge/config.toml`, falling back to [`Config::default`] when
/// none exist. Mirrors `ConfigDiscovery.find_and_load_config`'s ordered
/// search without any cross-tier merging.
pub struct ConfigDiscovery {
    current_dir: PathBuf,
    home_dir: Option<PathBuf>,
}

impl ConfigDiscovery {
    pub fn new(current_dir: impl Into<PathBuf>, home_dir: Option<PathBuf>) -> Self {
        Self {
            current_dir: current_dir.into(),
            home_dir,
        }
    }

    fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/codeforge").join(env::CONFIG_FILE_NAME)
    }

    /// The ordered list of candidate paths, most-specific first, for
    /// diagnostics/logging.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![env::local_config_file_path(&self.current_dir)];
        if let Some(home) = &self.home_dir {
            paths.push(env::user_config_file_path(home));
        }
        paths.push(Self::system_config_path());
        paths
    }

    pub async fn load(&self) -> Result<Config, ConfigError> {
        for path in self.search_paths() {
            if path.exists() {
                return load_file(&path).await;
            }
        }
        Ok(Config::default())
    }
}

async fn load_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Config::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_with_no_input() {
        let config = Config::default();
        assert_eq!(config.max_rounds, 3);
        assert!(config.cache.code.enabled);
    }

    #[test]
    fn partial_toml_fills_remaining_fields_from_defaults() {
        let config = Config::from_toml_str("max_rounds = 5\n").unwrap();
        assert_eq!(config.max_rounds, 5);
        assert_eq!(config.locale, "en");
    }

    #[tokio::test]
    async fn discovery_falls_back_to_defaults_when_nothing_exists() {
        let dir = tempfile::tempdir().unwrap();
        let discovery = ConfigDiscovery::new(dir.path(), None);
        let config = discovery.load().await.unwrap();
        assert_eq!(config.max_rounds, default_max_rounds());
    }

    #[tokio::test]
    async fn discovery_prefers_local_project_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("codeforge.toml"), "max_rounds = 9\n").await.unwrap();
        let discovery = ConfigDiscovery::new(dir.path(), None);
        let config = discovery.load().await.unwrap();
        assert_eq!(config.max_rounds, 9);
    }
}
