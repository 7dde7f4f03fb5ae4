//! Service configuration
//!
//! Configuration is layered: built-in defaults, then an optional YAML file
//! named by `CONFIG_FILE`, then environment variables. The environment
//! profile (`FLASK_ENV`) only supplies defaults for `debug` and the log level;
//! anything set explicitly wins.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_BASE_URL: &str = "http://localhost:7004/open-banking/products-services/v2";
pub const DEFAULT_SECRET_KEY: &str = "dev-secret-key-change-in-production";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 25;
pub const DEFAULT_MAX_PAGE_SIZE: u64 = 100;

/// Deployment profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Testing,
}

impl Environment {
    /// Parses a profile name. Unknown names fall back to development.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" => Environment::Production,
            "testing" => Environment::Testing,
            _ => Environment::Development,
        }
    }

    pub fn default_debug(&self) -> bool {
        !matches!(self, Environment::Production)
    }

    pub fn default_log_level(&self) -> &'static str {
        match self {
            Environment::Production => "warn",
            Environment::Development | Environment::Testing => "debug",
        }
    }
}

/// Where and how the upstream open-banking service is reached.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub default_headers: BTreeMap<String, String>,
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        let mut default_headers = BTreeMap::new();
        default_headers.insert("Content-Type".to_string(), "application/json".to_string());
        default_headers.insert("Accept".to_string(), "application/json".to_string());

        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_TIMEOUT_SECS,
            default_headers,
        }
    }
}

/// Pagination defaults used by the validator.
///
/// `max_page_size` is informational: requests above it are logged and
/// forwarded unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationConfig {
    pub default_page: u64,
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: DEFAULT_PAGE,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub listen_addr: String,
    pub environment: Environment,
    pub upstream: UpstreamConfig,
    pub pagination: PaginationConfig,
    /// Explicit log level; `None` means "use the environment's default".
    pub log_level: Option<String>,
    pub cors_origins: String,
    pub secret_key: String,
    pub debug: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            environment: Environment::default(),
            upstream: UpstreamConfig::default(),
            pagination: PaginationConfig::default(),
            log_level: None,
            cors_origins: "*".to_string(),
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            debug: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("listen_addr", &self.listen_addr)
            .field("environment", &self.environment)
            .field("upstream", &self.upstream)
            .field("pagination", &self.pagination)
            .field("log_level", &self.log_level)
            .field("cors_origins", &self.cors_origins)
            .field("secret_key", &"<redacted>")
            .field("debug", &self.debug)
            .finish()
    }
}

impl Config {
    /// Loads configuration from `CONFIG_FILE` (if set) and the process
    /// environment, then validates it.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let cfg = serde_yaml::from_str(raw)?;
        Ok(cfg)
    }

    /// Applies overrides from a variable lookup. `load` passes the process
    /// environment; tests pass a map.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("LISTEN") {
            self.listen_addr = addr;
        }
        if let Some(env) = lookup("FLASK_ENV") {
            self.environment = Environment::parse(&env);
        }
        if let Some(url) = lookup("OPENBANKING_BASE_URL") {
            self.upstream.base_url = url;
        }
        if let Some(key) = lookup("SECRET_KEY") {
            self.secret_key = key;
        }
        if let Some(flag) = lookup("FLASK_DEBUG") {
            self.debug = Some(flag.trim().eq_ignore_ascii_case("true"));
        }
        if let Some(secs) = lookup("REQUEST_TIMEOUT") {
            let secs = parse_number("REQUEST_TIMEOUT", &secs)?;
            self.upstream.timeout_secs = secs;
            self.upstream.connect_timeout_secs = secs;
        }
        if let Some(size) = lookup("DEFAULT_PAGE_SIZE") {
            self.pagination.default_page_size = parse_number("DEFAULT_PAGE_SIZE", &size)?;
        }
        if let Some(size) = lookup("MAX_PAGE_SIZE") {
            self.pagination.max_page_size = parse_number("MAX_PAGE_SIZE", &size)?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = Some(level);
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.cors_origins = origins;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.upstream.base_url)
            .with_context(|| format!("invalid upstream base URL {:?}", self.upstream.base_url))?;
        if url.scheme() != "http" {
            anyhow::bail!(
                "upstream base URL must use http, got {:?}",
                url.scheme()
            );
        }
        if url.host_str().is_none() {
            anyhow::bail!("upstream base URL {:?} has no host", self.upstream.base_url);
        }
        if self.upstream.timeout_secs == 0 || self.upstream.connect_timeout_secs == 0 {
            anyhow::bail!("upstream timeouts must be at least one second");
        }
        if self.pagination.default_page == 0 || self.pagination.default_page_size == 0 {
            anyhow::bail!("pagination defaults must be positive");
        }
        Ok(())
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug.unwrap_or_else(|| self.environment.default_debug())
    }

    /// Log level as a `tracing` filter directive.
    pub fn effective_log_level(&self) -> String {
        match &self.log_level {
            Some(level) => normalize_log_level(level),
            None => self.environment.default_log_level().to_string(),
        }
    }
}

/// Maps Python-style level names onto `tracing` ones.
pub fn normalize_log_level(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    match level.as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        _ => level,
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a non-negative integer, got {value:?}"))
}
