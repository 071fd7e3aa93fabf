use std::num::NonZeroU32;

use thiserror::Error;

use crate::storage::StoreOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
    /// PBKDF2 iterations for newly hashed passwords
    pub password_iterations: u32,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobBackend {
    /// File content lives in the store's blobs collection
    Embedded,
    /// File content lives under `blob_dir`
    Directory,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: BlobBackend,
    /// Root directory for the directory backend
    pub blob_dir: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::Embedded,
            blob_dir: "./blobs".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            storage: StorageConfig::default(),
            test_mode: false,
            max_upload_size: 50 * 1024 * 1024, // 50MB
            password_iterations: 600_000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from any variable source. Unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let bind_address = lookup("BIND_ADDRESS").unwrap_or(defaults.node.bind_address);
        let data_dir = lookup("DATA_DIR").unwrap_or(defaults.node.data_dir);

        let backend = match lookup("BLOB_BACKEND")
            .unwrap_or_else(|| "embedded".to_string())
            .to_lowercase()
            .as_str()
        {
            "embedded" => BlobBackend::Embedded,
            "directory" => BlobBackend::Directory,
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "BLOB_BACKEND must be 'embedded' or 'directory', got '{other}'"
                )))
            }
        };
        let blob_dir = lookup("BLOB_DIR").unwrap_or(defaults.storage.blob_dir);

        let test_mode = lookup("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let max_upload_size = parse_number(&lookup, "MAX_UPLOAD_SIZE", defaults.max_upload_size)?;
        let password_iterations =
            parse_number(&lookup, "PASSWORD_ITERATIONS", defaults.password_iterations)?;

        let config = Config {
            node: NodeConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig { backend, blob_dir },
            test_mode,
            max_upload_size,
            password_iterations,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.node.data_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "DATA_DIR cannot be empty".to_string(),
            ));
        }

        if self.storage.backend == BlobBackend::Directory && self.storage.blob_dir.trim().is_empty()
        {
            return Err(ConfigError::ValidationError(
                "BLOB_DIR is required when BLOB_BACKEND=directory".to_string(),
            ));
        }

        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.password_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "PASSWORD_ITERATIONS must be greater than 0".to_string(),
            ));
        }

        if self.password_iterations < 100_000 {
            tracing::warn!(
                "PASSWORD_ITERATIONS={} is low; stored password hashes will be cheap to brute-force.",
                self.password_iterations
            );
        }

        Ok(())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            password_iterations: NonZeroU32::new(self.password_iterations)
                .unwrap_or(StoreOptions::default().password_iterations),
        }
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            ConfigError::ValidationError(format!("{name} must be a non-negative integer, got '{raw}'"))
        }),
        None => Ok(default),
    }
}
