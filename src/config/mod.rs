//! Runtime configuration.
//!
//! Loaded from an optional TOML file, then selectively overridden from
//! `FLECTO_*` environment variables. Every section has usable defaults so an
//! empty file (or no file) yields a working development setup, except for the
//! JWT secret which must be provided for `serve`.

mod server;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

pub use server::ServerConfig;

const DEFAULT_PAGE_SIZE_LIMIT: i64 = 1024 * 1024;
const DEFAULT_PAGE_TOTAL_SIZE_LIMIT: i64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub db: DbConfig,
    pub page: PageConfig,
    pub agent: AgentConfig,
    pub jwt: JwtConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Dialect name, looked up in the store's dialect table.
    pub driver: String,
    pub path: PathBuf,
    /// How long ordinary writers wait for the write lock.
    pub busy_timeout_ms: u64,
}

impl DbConfig {
    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            driver: "sqlite".to_string(),
            path: PathBuf::from("./data/flecto.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Maximum size of a single page body, in bytes.
    pub size_limit: i64,
    /// Maximum combined size of all published pages of a project, in bytes.
    pub total_size_limit: i64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size_limit: DEFAULT_PAGE_SIZE_LIMIT,
            total_size_limit: DEFAULT_PAGE_TOTAL_SIZE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub offline_threshold_secs: u64,
}

impl AgentConfig {
    #[must_use]
    pub fn offline_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.offline_threshold_secs).unwrap_or(i64::MAX))
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            offline_threshold_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub issuer: String,
    pub secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            issuer: "flecto".to_string(),
            secret: String::new(),
            access_token_ttl_secs: 15 * 60,
            refresh_token_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

impl Config {
    /// Loads the configuration file (if any) and applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Applies `FLECTO_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("FLECTO_DB_PATH") {
            self.db.path = PathBuf::from(path);
        }
        if let Some(secret) = lookup("FLECTO_JWT_SECRET") {
            self.jwt.secret = secret;
        }
        if let Some(host) = lookup("FLECTO_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("FLECTO_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page.size_limit <= 0 || self.page.total_size_limit <= 0 {
            return Err(Error::Config("page size limits must be positive".into()));
        }
        if self.page.size_limit > self.page.total_size_limit {
            return Err(Error::Config(
                "page.size_limit cannot exceed page.total_size_limit".into(),
            ));
        }
        if self.jwt.access_token_ttl_secs <= 0 || self.jwt.refresh_token_ttl_secs <= 0 {
            return Err(Error::Config("token TTLs must be positive".into()));
        }
        Ok(())
    }
}
