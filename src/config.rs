//! Service configuration.
//!
//! Values are layered: built-in defaults, then a JSON config file, then
//! environment variables. Command-line flags are applied last by the binary.
//!
//! | Variable | Field |
//! |---|---|
//! | `CAT_AGENCY_ENV` | `environment` (`local` or `production`) |
//! | `CAT_AGENCY_HOST` | `server.host` |
//! | `CAT_AGENCY_PORT` | `server.port` |
//! | `CAT_AGENCY_DB_PATH` | `database.path` |
//! | `CAT_AGENCY_BREEDS_URL` | `breeds.url` |

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::breeds::{BreedValidator, CatApiBreedValidator, StaticBreedCatalog, DEFAULT_BREEDS_URL};

const APP_NAME: &str = "cat-agency";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub breeds: BreedsConfig,
}

/// Deployment flavour. Production logs are emitted as JSON.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Local,
    Production,
}

impl Environment {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "local" => Some(Self::Local),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests running longer than this are aborted with 408.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file. Defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreedsConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// When set, breeds are checked against this list and the remote catalog
    /// is never contacted.
    pub allowed: Option<Vec<String>>,
}

impl Default for BreedsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BREEDS_URL.to_string(),
            timeout_secs: 5,
            allowed: None,
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the user config directory when no path is
    /// given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_default_location()?,
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn from_default_location() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Override fields from environment variables read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(env) = lookup("CAT_AGENCY_ENV") {
            self.environment = Environment::from_str(&env)
                .ok_or_else(|| anyhow::anyhow!("Unknown CAT_AGENCY_ENV value: {env}"))?;
        }
        if let Some(host) = lookup("CAT_AGENCY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("CAT_AGENCY_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid CAT_AGENCY_PORT value: {port}"))?;
        }
        if let Some(path) = lookup("CAT_AGENCY_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(url) = lookup("CAT_AGENCY_BREEDS_URL") {
            self.breeds.url = url;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Build the breed validator this configuration asks for.
    pub fn breed_validator(&self) -> Result<Arc<dyn BreedValidator>> {
        match &self.breeds.allowed {
            Some(allowed) => Ok(Arc::new(StaticBreedCatalog::new(allowed.iter().cloned()))),
            None => Ok(Arc::new(CatApiBreedValidator::new(
                self.breeds.url.clone(),
                Duration::from_secs(self.breeds.timeout_secs),
            )?)),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}
