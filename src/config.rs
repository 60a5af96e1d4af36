//! Service configuration.
//!
//! Settings come from a TOML file (`COURSECHECK_CONFIG`, default `coursecheck.toml`).
//! A missing file means defaults. A few settings can be overridden from the environment:
//! `PSQL_NAME`, `PSQL_PASS`, `JWT_SECRET_KEY` and `COURSECHECK_BIND`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::Level;

pub const CONFIG_PATH_VAR: &str = "COURSECHECK_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "coursecheck.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub store: StoreConfig,
    pub jwt: JwtConfig,
    pub features: FeatureConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:9090".into(),
            tls_cert: None,
            tls_key: None,
            log_level: "info".into(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bind address {} is not valid", self.bind)))
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level {}", self.log_level)))
    }

    /// Certificate and key paths, when both are set. Setting only one is an error.
    pub fn tls(&self) -> Result<Option<(&Path, &Path)>, ConfigError> {
        match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) => Ok(Some((cert, key))),
            (None, None) => Ok(None),
            _ => Err(ConfigError::Invalid(
                "tls_cert and tls_key must be set together".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub name: String,
    pub pass: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            name: String::new(),
            pass: String::new(),
            max_connections: 10,
        }
    }
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        format!("postgres://{}:{}@{}", self.name, self.pass, self.host)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// JSON seed file for the memory store.
    pub seed: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub secret_key: String,
    pub algorithm: String,
    pub issuer: String,
    pub audience: String,
    pub supported_version: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            algorithm: "HS256".into(),
            issuer: "http://127.0.0.1:8000/oauth2".into(),
            audience: "lms-key".into(),
            supported_version: "1.2.0".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub certificates_html_view: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            certificates_html_view: true,
        }
    }
}

impl Config {
    pub fn parse(contents: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents, &path.display().to_string())
    }

    /// Reads the configured file, or falls back to defaults when it does not exist, then
    /// applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let path = Path::new(&path);

        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };

        config.merge_env_from(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn merge_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup("PSQL_NAME") {
            self.database.name = name;
        }
        if let Some(pass) = lookup("PSQL_PASS") {
            self.database.pass = pass;
        }
        if let Some(secret) = lookup("JWT_SECRET_KEY") {
            self.jwt.secret_key = secret;
        }
        if let Some(bind) = lookup("COURSECHECK_BIND") {
            self.server.bind = bind;
        }
    }
}
