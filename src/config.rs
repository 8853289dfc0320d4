//! Configuration module for gestor.

use serde::Deserialize;
use std::path::Path;

use crate::{GestorError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins (empty = allow any origin).
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (e.g. `sqlite://data/gestor.db`).
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_url() -> String {
    "sqlite://data/gestor.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Which object store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// AWS S3 or an S3-compatible service.
    #[default]
    S3,
    /// Local directory.
    Filesystem,
    /// In-process map; contents are lost on restart.
    Memory,
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Bucket name (s3 backend).
    #[serde(default)]
    pub bucket: String,
    /// Bucket region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Explicit access key id. Falls back to the ambient AWS chain when unset.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Explicit secret access key.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Key prefix prepended to every object key.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Use path-style addressing (MinIO).
    #[serde(default)]
    pub force_path_style: bool,
    /// Directory for the filesystem backend.
    #[serde(default = "default_local_path")]
    pub local_path: String,
    /// Per-call timeout for database and object store calls, in seconds.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_region() -> String {
    "us-east-2".to_string()
}

fn default_local_path() -> String {
    "data/objects".to_string()
}

fn default_call_timeout() -> u64 {
    30
}

fn default_max_upload_size() -> u64 {
    50
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket: String::new(),
            region: default_region(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            prefix: None,
            force_path_style: false,
            local_path: default_local_path(),
            call_timeout_secs: default_call_timeout(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty disables file output.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/gestor.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(GestorError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| GestorError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `GESTOR_DATABASE_URL`, then `DATABASE_URL`
    /// - `S3_BUCKET`, `S3_ENDPOINT`
    /// - `AWS_REGION`, then `AWS_DEFAULT_REGION`
    /// - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = get("GESTOR_DATABASE_URL").or_else(|| get("DATABASE_URL")) {
            self.database.url = url;
        }
        if let Some(bucket) = get("S3_BUCKET") {
            self.storage.bucket = bucket;
        }
        if let Some(endpoint) = get("S3_ENDPOINT") {
            self.storage.endpoint = Some(endpoint);
        }
        if let Some(region) = get("AWS_REGION").or_else(|| get("AWS_DEFAULT_REGION")) {
            self.storage.region = region;
        }
        if let Some(key_id) = get("AWS_ACCESS_KEY_ID") {
            self.storage.access_key_id = Some(key_id);
        }
        if let Some(secret) = get("AWS_SECRET_ACCESS_KEY") {
            self.storage.secret_access_key = Some(secret);
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The s3 backend is selected but no bucket is set
    /// - Only one half of the access key pair is set
    /// - The per-call timeout is zero
    pub fn validate(&self) -> Result<()> {
        let storage = &self.storage;
        if storage.backend == StorageBackend::S3 && storage.bucket.is_empty() {
            return Err(GestorError::Config(
                "storage.backend is s3 but no bucket is set. \
                 Set it in config.toml or via the S3_BUCKET environment variable."
                    .to_string(),
            ));
        }
        if storage.access_key_id.is_some() != storage.secret_access_key.is_some() {
            return Err(GestorError::Config(
                "access_key_id and secret_access_key must be set together".to_string(),
            ));
        }
        if storage.call_timeout_secs == 0 {
            return Err(GestorError::Config(
                "storage.call_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
