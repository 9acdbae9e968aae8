//! Shared test helpers for files-manager unit tests.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, NodeConfig, QueueConfig, StorageConfig, ThumbnailConfig};
use crate::AppState;

/// Create a test AppState with a temporary database and blob directory.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let files_dir = temp_dir.path().join("files");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            folder_path: files_dir.to_string_lossy().to_string(),
        },
        thumbnails: ThumbnailConfig::default(),
        queue: QueueConfig::default(),
        session_ttl: Duration::from_secs(60),
        test_mode: true,
        max_upload_size: 10 * 1024 * 1024, // 10MB for tests
    };

    Arc::new(AppState::open(config).expect("Failed to open test state"))
}
