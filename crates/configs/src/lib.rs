//! # configs
//!
//! Layered settings for the comment backend. Sources, lowest priority
//! first:
//!
//! 1. built-in defaults
//! 2. `rusty-talk.toml` (optional)
//! 3. environment variables, e.g. `RUSTY_TALK__SERVER__PORT=8080` or
//!    `RUSTY_TALK__TRUSTED_DOMAINS=https://a.com,https://b.com`
//!
//! A `.env` file is loaded into the process environment before step 3.

use std::collections::HashMap;

use config::{Config, Environment, File, FileFormat};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const ENV_PREFIX: &str = "RUSTY_TALK";
pub const CONFIG_FILE: &str = "rusty-talk";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub admin: AdminSettings,
    /// Origins always allowed by CORS, on top of registered site URLs
    pub trusted_domains: Vec<String>,
    pub ip_region: IpRegionSettings,
    pub cache: CacheSettings,
    pub pagination: PaginationSettings,
    pub frontend: FrontendSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 23366,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// e.g. `sqlite://rusty-talk.db`; the in-memory store is used when unset
    pub url: Option<SecretString>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    /// Argon2 PHC hash of the admin bearer token
    pub token_hash: Option<SecretString>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IpRegionSettings {
    pub enabled: bool,
    pub entries: Vec<RegionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionEntry {
    pub prefix: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
    pub max_limit: i64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self { max_limit: 100 }
    }
}

/// Public frontend options, echoed to clients on the first page of a
/// comment list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendSettings {
    /// Pins the list mode for every request when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flat_mode: Option<bool>,
    pub list_sort: bool,
    pub nest_max: u32,
    pub vote_down: bool,
    pub locale: String,
    pub page_size: u32,
}

impl Default for FrontendSettings {
    fn default() -> Self {
        Self {
            flat_mode: None,
            list_sort: true,
            nest_max: 2,
            vote_down: false,
            locale: "en".into(),
            page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub json: bool,
}

impl Settings {
    /// Loads `.env`, the optional config file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env file");
        }
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(environment(None));
        Self::build(builder)
    }

    /// Builds settings from an inline TOML document and an explicit
    /// environment map instead of the filesystem and process environment.
    pub fn from_sources(
        toml: Option<&str>,
        env: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(toml) = toml {
            builder = builder.add_source(File::from_str(toml, FileFormat::Toml));
        }
        Self::build(builder.add_source(environment(Some(env))))
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must not be 0".into()));
        }
        if self.pagination.max_limit <= 0 {
            return Err(ConfigError::Invalid(
                "pagination.max_limit must be positive".into(),
            ));
        }
        if let Some(entry) = self.ip_region.entries.iter().find(|e| e.prefix.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "ip_region entry for `{}` has an empty prefix",
                entry.region
            )));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn environment(source: Option<HashMap<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("trusted_domains")
        .try_parsing(true)
        .source(source)
}
