use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    pub thumbnails: ThumbnailConfig,
    pub queue: QueueConfig,
    /// How long a login token stays valid
    pub session_ttl: Duration,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory original blobs are written to
    pub folder_path: String,
}

#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    /// Target widths, processed in declaration order. Read-only after startup.
    pub sizes: Arc<[u32]>,
    /// Number of concurrent worker tasks
    pub workers: usize,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// How long a dequeued job stays invisible before it is redelivered
    pub visibility_timeout: Duration,
    /// Deliveries allowed for a job that keeps failing
    pub max_attempts: u32,
}

pub const DEFAULT_THUMBNAIL_SIZES: [u32; 3] = [500, 250, 100];

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            folder_path: "/tmp/files_manager".to_string(),
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            sizes: Arc::from(DEFAULT_THUMBNAIL_SIZES.as_slice()),
            workers: 1,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(300),
            max_attempts: 3,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let folder_path = std::env::var("FOLDER_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| StorageConfig::default().folder_path);

        let sizes = match std::env::var("THUMBNAIL_SIZES") {
            Ok(raw) => parse_sizes(&raw)?,
            Err(_) => DEFAULT_THUMBNAIL_SIZES.to_vec(),
        };

        let workers = std::env::var("WORKER_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        let visibility_timeout = std::env::var("JOB_VISIBILITY_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(300));

        let max_attempts = std::env::var("JOB_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3);

        let session_ttl = std::env::var("SESSION_TTL")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(24 * 60 * 60));

        let test_mode = std::env::var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50 * 1024 * 1024); // 50MB

        let config = Config {
            node: NodeConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig { folder_path },
            thumbnails: ThumbnailConfig {
                sizes: Arc::from(sizes),
                workers,
            },
            queue: QueueConfig {
                visibility_timeout,
                max_attempts,
            },
            session_ttl,
            test_mode,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_sizes(&self.thumbnails.sizes)?;

        if self.thumbnails.workers == 0 {
            return Err(ConfigError::ValidationError(
                "WORKER_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        if self.queue.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "JOB_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        if self.queue.visibility_timeout.is_zero() {
            tracing::warn!(
                "JOB_VISIBILITY_TIMEOUT is 0. Every job will be redelivered while it is \
                 still being processed."
            );
        }

        Ok(())
    }
}

/// Parse a comma-separated list of thumbnail widths, keeping declaration order.
pub fn parse_sizes(raw: &str) -> Result<Vec<u32>, ConfigError> {
    let sizes = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>().map_err(|_| {
                ConfigError::ValidationError(format!("THUMBNAIL_SIZES entry '{s}' is not a width"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    validate_sizes(&sizes)?;
    Ok(sizes)
}

fn validate_sizes(sizes: &[u32]) -> Result<(), ConfigError> {
    if sizes.is_empty() {
        return Err(ConfigError::ValidationError(
            "THUMBNAIL_SIZES cannot be empty".to_string(),
        ));
    }
    if sizes.contains(&0) {
        return Err(ConfigError::ValidationError(
            "THUMBNAIL_SIZES cannot contain 0".to_string(),
        ));
    }
    for (i, size) in sizes.iter().enumerate() {
        if sizes[..i].contains(size) {
            return Err(ConfigError::ValidationError(format!(
                "THUMBNAIL_SIZES lists {size} more than once"
            )));
        }
    }
    Ok(())
}
