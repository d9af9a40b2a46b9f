use std::path::PathBuf;

use common::ObjectStoreConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL used to build the `url` returned from uploads.
    pub public_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Filesystem,
    Object,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Filesystem blob root.
    pub root: PathBuf,
    /// Upload ceiling in bytes.
    pub max_upload_size: usize,
    /// Required when `backend = "object"`.
    pub object: Option<ObjectStoreConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::defaults()?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., IMGVAULT__STORAGE__ROOT)
            .add_source(Environment::with_prefix("IMGVAULT").separator("__"))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.public_url", "http://localhost:8080")?
            .set_default("database.url", "sqlite://images.db?mode=rwc")?
            .set_default("database.max_connections", 16)?
            .set_default("storage.backend", "filesystem")?
            .set_default("storage.root", "./assets")?
            .set_default("storage.max_upload_size", 10 * 1024 * 1024)
    }

    /// Public URL of an image, e.g. `http://localhost:8080/image/7`.
    pub fn image_url(&self, id: i32) -> String {
        format!("{}/image/{id}", self.server.public_url.trim_end_matches('/'))
    }
}
