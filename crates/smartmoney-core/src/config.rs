//! Application configuration management.
//!
//! Holds the backend URL, the session validation strategy, where the
//! credential is stored, and the last email used to log in.
//!
//! Configuration is stored at `~/.config/smart-money/config.json` and can be
//! overridden with `SMART_MONEY_API_URL`, `SMART_MONEY_VALIDATION` and
//! `SMART_MONEY_STORE`.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use crate::auth::{CredentialStore, FileStore, KeyringStore, MemoryStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "smart-money";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Lifetime given to tokens that do not carry their own expiry.
/// Matches the backend's two-hour cookie max-age.
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 120;

/// Buffer time before expiry to trigger refresh
const DEFAULT_REFRESH_BUFFER_MINUTES: i64 = 5;

/// How `is_authenticated` decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStrategy {
    /// Trust the local credential's presence and expiry.
    #[default]
    Local,
    /// Confirm with `GET /users/me` on every check.
    Probe,
}

impl FromStr for ValidationStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "probe" => Ok(Self::Probe),
            other => Err(anyhow::anyhow!("Unknown validation strategy: {}", other)),
        }
    }
}

/// Where the bearer token is kept between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    #[default]
    File,
    Keyring,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            other => Err(anyhow::anyhow!("Unknown credential store: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub validation: ValidationStrategy,
    pub credential_store: StoreKind,
    pub request_timeout_secs: u64,
    pub token_ttl_minutes: i64,
    pub refresh_buffer_minutes: i64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            validation: ValidationStrategy::default(),
            credential_store: StoreKind::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            refresh_buffer_minutes: DEFAULT_REFRESH_BUFFER_MINUTES,
            last_email: None,
        }
    }
}

impl Config {
    /// Load from disk. Environment overrides are applied separately with
    /// [`Config::apply_env_overrides`] once logging is up.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `SMART_MONEY_*` overrides. Invalid values leave the setting
    /// alone and are returned as messages for the caller to report.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut ignored = Vec::new();
        if let Some(url) = lookup("SMART_MONEY_API_URL").filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup("SMART_MONEY_VALIDATION") {
            match raw.parse() {
                Ok(v) => self.validation = v,
                Err(e) => ignored.push(format!("Ignoring SMART_MONEY_VALIDATION: {}", e)),
            }
        }
        if let Some(raw) = lookup("SMART_MONEY_STORE") {
            match raw.parse() {
                Ok(v) => self.credential_store = v,
                Err(e) => ignored.push(format!("Ignoring SMART_MONEY_STORE: {}", e)),
            }
        }
        ignored
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        Self::default_cache_dir()
    }

    /// Cache directory, available before any config is loaded.
    pub fn default_cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::minutes(self.token_ttl_minutes.max(0))
    }

    pub fn refresh_buffer(&self) -> Duration {
        Duration::minutes(self.refresh_buffer_minutes.max(0))
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    /// Build the credential store this configuration asks for.
    pub fn build_store(&self) -> Result<Arc<dyn CredentialStore>> {
        let store: Arc<dyn CredentialStore> = match self.credential_store {
            StoreKind::Memory => Arc::new(MemoryStore::new()),
            StoreKind::File => Arc::new(FileStore::new(self.cache_dir()?)),
            StoreKind::Keyring => Arc::new(KeyringStore::default()),
        };
        Ok(store)
    }
}
