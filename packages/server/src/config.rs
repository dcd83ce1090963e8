use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Environments in which uploaded blobs are served directly by this process.
const STATIC_SERVING_ENVS: &[&str] = &["local", "development"];

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Origins allowed to make credentialed cross-origin requests.
    pub trusted_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deployment environment name (`local`, `development`, `production`, ...).
    pub env: String,
    pub cors: CorsConfig,
    /// Upper bound on the time spent handling a single request.
    pub request_timeout_secs: u64,
    /// How long in-flight requests may keep running after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl ServerConfig {
    pub fn serves_static_files(&self) -> bool {
        STATIC_SERVING_ENVS.contains(&self.env.as_str())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory blobs are written to.
    pub upload_dir: PathBuf,
    /// Public URL prefix under which blobs are reachable.
    pub public_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Largest accepted file, in bytes.
    pub max_size: u64,
    pub allowed_content_types: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaginationConfig {
    /// Page size used when the client does not pass `limit`.
    pub default_limit: u64,
    /// Hard cap on the page size, whatever the client asks for.
    pub max_limit: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub pagination: PaginationConfig,
}

impl AppConfig {
    /// Load configuration from `path` (or `config/config` when absent),
    /// with `IMAGE_SERVICE__*` environment variables layered on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("config/config").required(false),
        };

        let s = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 4000)?
            .set_default("server.env", "local")?
            .set_default("server.cors.trusted_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("server.request_timeout_secs", 10)?
            .set_default("server.shutdown_grace_secs", 30)?
            .set_default("database.max_connections", 25)?
            .set_default("database.min_connections", 1)?
            .set_default("database.idle_timeout_secs", 900)?
            .set_default("storage.upload_dir", "./uploads")?
            .set_default("storage.public_path", "/images")?
            .set_default("upload.max_size", 10 * 1024 * 1024)?
            .set_default(
                "upload.allowed_content_types",
                vec!["image/jpeg", "image/jpg", "image/pjpeg"],
            )?
            .set_default("pagination.default_limit", 10)?
            .set_default("pagination.max_limit", 20)?
            .add_source(file)
            // Override from environment (e.g., IMAGE_SERVICE__DATABASE__URL)
            .add_source(
                Environment::with_prefix("IMAGE_SERVICE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors.trusted_origins")
                    .with_list_parse_key("upload.allowed_content_types")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pagination.max_limit == 0 {
            return Err(ConfigError::Message(
                "pagination.max_limit must be at least 1".into(),
            ));
        }
        if self.pagination.default_limit == 0
            || self.pagination.default_limit > self.pagination.max_limit
        {
            return Err(ConfigError::Message(
                "pagination.default_limit must be between 1 and pagination.max_limit".into(),
            ));
        }
        if self.upload.max_size == 0 {
            return Err(ConfigError::Message(
                "upload.max_size must be positive".into(),
            ));
        }
        if self.upload.allowed_content_types.is_empty() {
            return Err(ConfigError::Message(
                "upload.allowed_content_types must not be empty".into(),
            ));
        }
        if !self.storage.public_path.starts_with('/')
            || self.storage.public_path.trim_end_matches('/').is_empty()
        {
            return Err(ConfigError::Message(
                "storage.public_path must start with '/' and name a directory below the root"
                    .into(),
            ));
        }
        Ok(())
    }
}
