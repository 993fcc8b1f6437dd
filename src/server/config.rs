use serde::Deserialize;
use std::fs;
use std::path::Path;
use chrono::TimeDelta;
use std::time::Duration;
use thiserror::Error;

use crate::news::guardian;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse { path: String, source: toml::de::Error },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} is out of range")]
    OutOfRange(&'static str),
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub jwt_secret: String,
    pub database_url: String,
    pub document_database_url: String,
    pub guardian_api_key: String,
    pub guardian_base_url: String,
    pub provider_timeout_secs: u64,
    /// Cached articles older than this are purged and refetched. 0 keeps them forever.
    pub cache_ttl_secs: u64,
    pub token_ttl_hours: i64,
    pub cookie_secure: bool,
    pub max_db_connections: u32,
    pub log_dir: String,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    listen_addr: Option<String>,
    jwt_secret: Option<String>,
    database_url: Option<String>,
    postgres_host: Option<String>,
    postgres_db: Option<String>,
    postgres_user: Option<String>,
    postgres_password: Option<String>,
    document_database_url: Option<String>,
    guardian_api_key: Option<String>,
    guardian_base_url: Option<String>,
    provider_timeout_secs: Option<u64>,
    cache_ttl_secs: Option<u64>,
    token_ttl_hours: Option<i64>,
    cookie_secure: Option<bool>,
    max_db_connections: Option<u32>,
    log_dir: Option<String>,
}

impl PartialServerConfig {
    fn or(self, fallback: PartialServerConfig) -> PartialServerConfig {
        PartialServerConfig {
            listen_addr: self.listen_addr.or(fallback.listen_addr),
            jwt_secret: self.jwt_secret.or(fallback.jwt_secret),
            database_url: self.database_url.or(fallback.database_url),
            postgres_host: self.postgres_host.or(fallback.postgres_host),
            postgres_db: self.postgres_db.or(fallback.postgres_db),
            postgres_user: self.postgres_user.or(fallback.postgres_user),
            postgres_password: self.postgres_password.or(fallback.postgres_password),
            document_database_url: self.document_database_url.or(fallback.document_database_url),
            guardian_api_key: self.guardian_api_key.or(fallback.guardian_api_key),
            guardian_base_url: self.guardian_base_url.or(fallback.guardian_base_url),
            provider_timeout_secs: self.provider_timeout_secs.or(fallback.provider_timeout_secs),
            cache_ttl_secs: self.cache_ttl_secs.or(fallback.cache_ttl_secs),
            token_ttl_hours: self.token_ttl_hours.or(fallback.token_ttl_hours),
            cookie_secure: self.cookie_secure.or(fallback.cookie_secure),
            max_db_connections: self.max_db_connections.or(fallback.max_db_connections),
            log_dir: self.log_dir.or(fallback.log_dir),
        }
    }

    /// `database_url` wins; otherwise the URL is assembled from the postgres_* parts.
    fn relational_url(&self) -> Option<String> {
        if let Some(url) = &self.database_url {
            return Some(url.clone());
        }
        let host = self.postgres_host.as_deref()?;
        let db = self.postgres_db.as_deref()?;
        let user = self.postgres_user.as_deref()?;
        let credentials = match self.postgres_password.as_deref() {
            Some(password) => format!(
                "{}:{}",
                urlencoding::encode(user),
                urlencoding::encode(password)
            ),
            None => urlencoding::encode(user).into_owned(),
        };
        Some(format!("postgres://{credentials}@{host}/{db}"))
    }

    fn finish(self) -> Result<ServerConfig, ConfigError> {
        let database_url = self
            .relational_url()
            .ok_or(ConfigError::Missing("DATABASE_URL (or POSTGRES_HOST/POSTGRES_DB/POSTGRES_USER)"))?;

        let cache_ttl_secs = self.cache_ttl_secs.unwrap_or(6 * 60 * 60);
        if cache_ttl_secs > 0 && cache_ttl(cache_ttl_secs).is_none() {
            return Err(ConfigError::OutOfRange("CACHE_TTL_SECS"));
        }
        let token_ttl_hours = self.token_ttl_hours.unwrap_or(24);
        if token_ttl_hours <= 0 || token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(ConfigError::OutOfRange("TOKEN_TTL_HOURS"));
        }

        Ok(ServerConfig {
            listen_addr: self.listen_addr.unwrap_or_else(default_listen_addr),
            jwt_secret: self.jwt_secret.ok_or(ConfigError::Missing("JWT_SECRET"))?,
            document_database_url: self
                .document_database_url
                .unwrap_or_else(|| database_url.clone()),
            database_url,
            guardian_api_key: self.guardian_api_key.ok_or(ConfigError::Missing("GUARDIAN_API_KEY"))?,
            guardian_base_url: self
                .guardian_base_url
                .unwrap_or_else(|| guardian::DEFAULT_BASE_URL.to_string()),
            provider_timeout_secs: self.provider_timeout_secs.unwrap_or(10),
            cache_ttl_secs,
            token_ttl_hours,
            cookie_secure: self.cookie_secure.unwrap_or(true),
            max_db_connections: self.max_db_connections.unwrap_or(10),
            log_dir: self.log_dir.unwrap_or_else(default_log_dir),
        })
    }
}

/// Ten years.
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

fn cache_ttl(secs: u64) -> Option<TimeDelta> {
    i64::try_from(secs).ok().and_then(TimeDelta::try_seconds)
}

fn default_listen_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl ServerConfig {
    /// Loads the optional TOML file, then lets environment variables override it.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path_str) => Self::read_file(Path::new(path_str))?,
            None => PartialServerConfig::default(),
        };
        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()?;

        env_config.or(file_config).finish()
    }

    /// Parses a TOML document on its own, without consulting the environment.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let partial: PartialServerConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        partial.finish()
    }

    fn read_file(path: &Path) -> Result<PartialServerConfig, ConfigError> {
        if !path.exists() {
            return Ok(PartialServerConfig::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// `None` when cached articles never expire.
    pub fn cache_freshness(&self) -> Option<TimeDelta> {
        match self.cache_ttl_secs {
            0 => None,
            secs => cache_ttl(secs),
        }
    }

    pub fn token_ttl(&self) -> TimeDelta {
        TimeDelta::try_hours(self.token_ttl_hours).unwrap_or(TimeDelta::zero())
    }
}
