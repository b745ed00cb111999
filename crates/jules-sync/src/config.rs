use crate::policy::CacheValidityPolicy;
use crate::{Error, Result};
use jules_store::StoreBackend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolve the cache data directory based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. JULES_CACHE_PATH environment variable (with tilde expansion)
/// 3. XDG data directory (recommended default)
/// 4. ~/.jules (fallback for systems without XDG)
pub fn resolve_workspace_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("JULES_CACHE_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("jules"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".jules"));
    }

    Err(Error::Config(
        "Could not determine cache path: no HOME directory or XDG data directory found"
            .to_string(),
    ))
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub hot_ttl_secs: u64,
    pub warm_ttl_secs: u64,
    pub frozen_after_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            hot_ttl_secs: 30,
            warm_ttl_secs: 5 * 60,
            frozen_after_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Sessions requested per listing page.
    pub page_size: usize,
    /// Sessions hydrated at once during a deep sync.
    pub concurrency: usize,
    /// Sleep between polls of a live activity stream.
    pub poll_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            concurrency: 3,
            poll_interval_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::default_path()?;
        Self::load_from(&config_path)
    }

    /// Missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(resolve_workspace_path(None)?.join("config.toml"))
    }

    fn validate(&self) -> Result<()> {
        if self.sync.page_size == 0 {
            return Err(Error::Config("sync.page_size must be at least 1".to_string()));
        }
        if self.sync.concurrency == 0 {
            return Err(Error::Config("sync.concurrency must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn policy(&self) -> CacheValidityPolicy {
        CacheValidityPolicy::new(
            Duration::from_secs(self.cache.hot_ttl_secs),
            Duration::from_secs(self.cache.warm_ttl_secs),
            Duration::from_secs(self.cache.frozen_after_secs),
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.sync.poll_interval_ms)
    }
}
