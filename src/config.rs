//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `MANGAFETCH_*` environment overrides.

use crate::catalog::CatalogSource;
use crate::remote::{GitHubStoreConfig, MalformedPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub state: StateConfig,

    #[serde(default)]
    pub web: WebConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the scraper's output is read from
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// `http(s)://` URL or local path
    #[serde(default = "default_catalog_source")]
    pub source: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_catalog_source() -> String {
    "data/manga_data.json".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source: default_catalog_source(),
            timeout_secs: default_timeout(),
        }
    }
}

impl CatalogConfig {
    pub fn catalog_source(&self) -> CatalogSource {
        CatalogSource::parse(&self.source)
    }
}

/// Repository holding the scraper's inputs and the read-status file
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub repo: String,

    pub branch: Option<String>,

    /// Lowest-precedence token source
    pub token: Option<String>,

    #[serde(default = "default_sources_path")]
    pub sources_path: String,

    #[serde(default = "default_read_status_path")]
    pub read_status_path: String,

    #[serde(default)]
    pub malformed_policy: MalformedPolicy,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_sources_path() -> String {
    "data/manga_sources.json".to_string()
}

fn default_read_status_path() -> String {
    "data/read_status.json".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            owner: String::new(),
            repo: String::new(),
            branch: None,
            token: None,
            sources_path: default_sources_path(),
            read_status_path: default_read_status_path(),
            malformed_policy: MalformedPolicy::default(),
            timeout_secs: default_timeout(),
        }
    }
}

impl GitHubConfig {
    pub fn store_config(&self) -> GitHubStoreConfig {
        GitHubStoreConfig {
            api_base: self.api_base.clone(),
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            branch: self.branch.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

/// Local state location
#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_dir")]
    pub dir: String,
}

fn default_state_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("mangafetch").to_string_lossy().to_string())
        .unwrap_or_else(|| "./mangafetch_data".to_string())
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: default_state_dir(),
        }
    }
}

impl StateConfig {
    /// State directory with a leading `~/` expanded
    pub fn dir_path(&self) -> PathBuf {
        match (self.dir.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(&self.dir),
        }
    }
}

/// Web front-end configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8086
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("mangafetch").join("config.toml")),
            Some(PathBuf::from("./mangafetch.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths).unwrap_or_else(|| {
            tracing::debug!("Using default config with environment overrides");
            Self::from_env()
        })
    }

    /// Load the first existing candidate that parses
    pub fn load_first(candidates: &[PathBuf]) -> Option<Self> {
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_with_env(path) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    return Some(config);
                }
                Err(e) => {
                    tracing::warn!("Failed to load config from {:?}: {}", path, e);
                }
            }
        }
        None
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Catalog overrides
        if let Some(source) = var("MANGAFETCH_CATALOG") {
            self.catalog.source = source;
        }

        // GitHub overrides
        if let Some(owner) = var("MANGAFETCH_GITHUB_OWNER") {
            self.github.owner = owner;
        }
        if let Some(repo) = var("MANGAFETCH_GITHUB_REPO") {
            self.github.repo = repo;
        }
        if let Some(branch) = var("MANGAFETCH_GITHUB_BRANCH") {
            self.github.branch = Some(branch).filter(|b| !b.is_empty());
        }

        // State overrides
        if let Some(dir) = var("MANGAFETCH_STATE_DIR") {
            self.state.dir = dir;
        }

        // Web overrides
        if let Some(host) = var("MANGAFETCH_WEB_HOST") {
            self.web.host = host;
        }
        if let Some(port) = var("MANGAFETCH_WEB_PORT") {
            if let Ok(p) = port.parse() {
                self.web.port = p;
            }
        }

        // Logging overrides
        if let Some(level) = var("MANGAFETCH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("MANGAFETCH_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Token from the config file, if one is set
    pub fn config_token(&self) -> Option<&str> {
        self.github
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Token from the environment, which outranks local state and config
pub fn env_token() -> Option<String> {
    std::env::var("MANGAFETCH_GITHUB_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# MangaFetch Configuration
#
# Environment variables override these settings:
# - MANGAFETCH_CATALOG
# - MANGAFETCH_GITHUB_OWNER
# - MANGAFETCH_GITHUB_REPO
# - MANGAFETCH_GITHUB_BRANCH
# - MANGAFETCH_GITHUB_TOKEN (outranks the stored token and github.token)
# - MANGAFETCH_STATE_DIR
# - MANGAFETCH_WEB_HOST
# - MANGAFETCH_WEB_PORT
# - MANGAFETCH_LOG_LEVEL
# - MANGAFETCH_LOG_FORMAT

[catalog]
# URL or path of the scraper's output (a JSON array)
source = "data/manga_data.json"

# HTTP timeout in seconds
timeout_secs = 30

[github]
# Contents API base URL
api_base = "https://api.github.com"

# Repository holding manga_sources.json and read_status.json
owner = ""
repo = ""

# Branch to commit to (repository default when unset)
# branch = "main"

# Personal access token with contents:write (prefer `mangafetch token set`)
# token = ""

sources_path = "data/manga_sources.json"
read_status_path = "data/read_status.json"

# What to do when a remote file is not valid JSON: abort or reset
malformed_policy = "abort"

# HTTP timeout in seconds
timeout_secs = 30

[state]
# Directory for the local state file
dir = "~/.local/share/mangafetch"

[web]
host = "127.0.0.1"
port = 8086

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_load_first_skips_missing_and_broken() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        let good = dir.path().join("good.toml");
        std::fs::write(&broken, "[web\nport = ").unwrap();
        std::fs::write(&good, "[web]\nport = 9191\n").unwrap();

        let config = Config::load_first(&[dir.path().join("missing.toml"), broken, good]).unwrap();
        assert_eq!(config.web.port, 9191);
        assert!(Config::load_first(&[dir.path().join("missing.toml")]).is_none());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.github.api_base, "https://api.github.com");
        assert_eq!(config.github.sources_path, "data/manga_sources.json");
        assert_eq!(config.github.read_status_path, "data/read_status.json");
        assert_eq!(config.github.malformed_policy, MalformedPolicy::Abort);
        assert_eq!(config.web.port, 8086);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.config_token().is_none());
    }

    #[test]
    fn test_partial_file() {
        let config = Config::parse(
            r#"
            [github]
            owner = "reader"
            repo = "manga-tracker"
            token = "  "
            malformed_policy = "reset"

            [web]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.github.owner, "reader");
        assert_eq!(config.github.malformed_policy, MalformedPolicy::Reset);
        assert_eq!(config.github.read_status_path, "data/read_status.json");
        assert_eq!(config.web.port, 9000);
        assert_eq!(config.web.host, "127.0.0.1");
        assert!(config.config_token().is_none());
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.catalog.source, "data/manga_data.json");
        assert_eq!(config.catalog.catalog_source().to_string(), "data/manga_data.json");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MANGAFETCH_GITHUB_OWNER", "someone"),
            ("MANGAFETCH_GITHUB_BRANCH", ""),
            ("MANGAFETCH_WEB_PORT", "not-a-port"),
            ("MANGAFETCH_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.github.branch = Some("main".into());
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.github.owner, "someone");
        assert_eq!(config.github.branch, None);
        assert_eq!(config.web.port, 8086);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_state_dir_expansion() {
        let state = StateConfig {
            dir: "/var/lib/mangafetch".into(),
        };
        assert_eq!(state.dir_path(), PathBuf::from("/var/lib/mangafetch"));

        if let Some(home) = dirs::home_dir() {
            let state = StateConfig {
                dir: "~/.local/share/mangafetch".into(),
            };
            assert_eq!(state.dir_path(), home.join(".local/share/mangafetch"));
        }
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/mangafetch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
