use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::graph::CrawlLimits;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub digfy: DigfyConfig,
    #[serde(default)]
    pub relations: RelationsConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Process-wide settings
#[derive(Debug, Clone, Deserialize)]
pub struct DigfyConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DigfyConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Relation API client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelationsConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout; a timeout counts as any other fetch failure.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// How many of the API's top-ranked related entities are followed per node.
    #[serde(default = "default_related_limit")]
    pub related_limit: usize,
}

impl Default for RelationsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            related_limit: default_related_limit(),
        }
    }
}

/// Crawl limits
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
    /// Deadline for a whole build; 0 disables it.
    #[serde(default)]
    pub build_timeout_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_nodes: default_max_nodes(),
            build_timeout_secs: 0,
        }
    }
}

/// Which graph cache store backs the builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    File,
    Sqlite,
    Memory,
}

/// Graph cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,
    /// Directory for the file backend (one JSON file per root entity).
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Database file for the sqlite backend.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            dir: default_cache_dir(),
            db_path: default_db_path(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://api.deezer.com".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_related_limit() -> usize {
    5
}

fn default_max_depth() -> usize {
    3
}

fn default_max_nodes() -> usize {
    60
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::File
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("digfy.db")
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in DIGFY_CONFIG environment variable
    /// 2. ./config.toml in current directory
    ///
    /// A missing ./config.toml falls back to defaults; a missing file named by
    /// DIGFY_CONFIG is an error.
    pub fn load() -> Result<Self> {
        // Optional .env file; ignore errors
        let _ = dotenv::dotenv();

        let (config_path, explicit) = match std::env::var("DIGFY_CONFIG") {
            Ok(path) => (PathBuf::from(path), true),
            Err(_) => (PathBuf::from("config.toml"), false),
        };

        if !explicit && !config_path.exists() {
            log::debug!("No config.toml found, using defaults");
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        }

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.relations.base_url).with_context(|| {
            format!("relations.base_url is not a valid URL: {}", self.relations.base_url)
        })?;

        if self.relations.timeout_secs == 0 {
            anyhow::bail!("relations.timeout_secs must be greater than 0");
        }

        if self.relations.related_limit == 0 {
            anyhow::bail!("relations.related_limit must be greater than 0");
        }

        if self.crawl.max_nodes == 0 {
            anyhow::bail!("crawl.max_nodes must be greater than 0");
        }

        if self.cache.backend == CacheBackend::File && self.cache.dir.as_os_str().is_empty() {
            anyhow::bail!("cache.dir must be set when cache.backend = \"file\"");
        }

        Ok(())
    }

    /// Per-request timeout for the relation API
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.relations.timeout_secs)
    }

    /// Whole-build deadline, if configured
    pub fn build_timeout(&self) -> Option<Duration> {
        match self.crawl.build_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Default crawl limits from the [crawl] section
    pub fn crawl_limits(&self) -> CrawlLimits {
        CrawlLimits {
            max_depth: self.crawl.max_depth,
            max_nodes: self.crawl.max_nodes,
        }
    }

    /// Get the file cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache.dir
    }

    /// Get the sqlite cache database path
    pub fn db_path(&self) -> &Path {
        &self.cache.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn with_config_env(config_path: &Path, f: impl FnOnce()) {
        let original = std::env::var("DIGFY_CONFIG").ok();
        std::env::set_var("DIGFY_CONFIG", config_path.to_str().unwrap());
        f();
        std::env::remove_var("DIGFY_CONFIG");
        if let Some(val) = original {
            std::env::set_var("DIGFY_CONFIG", val);
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.digfy.log_level, "info");
        assert_eq!(config.relations.base_url, "https://api.deezer.com");
        assert_eq!(config.relations.timeout_secs, 5);
        assert_eq!(config.relations.related_limit, 5);
        assert_eq!(config.crawl.max_depth, 3);
        assert_eq!(config.crawl.max_nodes, 60);
        assert_eq!(config.cache.backend, CacheBackend::File);
        assert!(config.build_timeout().is_none());
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[digfy]
log_level = "debug"

[relations]
base_url = "http://127.0.0.1:9000"
timeout_secs = 2

[crawl]
max_depth = 2
max_nodes = 40
build_timeout_secs = 30

[cache]
backend = "sqlite"
db_path = "graphs.db"
"#,
        )
        .unwrap();

        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.digfy.log_level, "debug");
            assert_eq!(config.request_timeout(), Duration::from_secs(2));
            assert_eq!(config.build_timeout(), Some(Duration::from_secs(30)));
            assert_eq!(config.cache.backend, CacheBackend::Sqlite);
            assert_eq!(config.db_path(), Path::new("graphs.db"));
            let limits = config.crawl_limits();
            assert_eq!(limits.max_depth, 2);
            assert_eq!(limits.max_nodes, 40);
        });
    }

    #[test]
    fn test_config_explicit_path_missing() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_config_env(Path::new("nonexistent-digfy.toml"), || {
            assert!(Config::load().is_err());
        });
    }

    #[test]
    fn test_rejects_zero_budget() {
        let err = Config::from_toml_str("[crawl]\nmax_nodes = 0\n").unwrap_err();
        assert!(format!("{:#}", err).contains("max_nodes"));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let err = Config::from_toml_str("[relations]\nbase_url = \"not a url\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("base_url"));
    }

    #[test]
    fn test_rejects_unknown_backend() {
        assert!(Config::from_toml_str("[cache]\nbackend = \"redis\"\n").is_err());
    }
}
