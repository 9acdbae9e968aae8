use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use files_manager::catalog::NewFile;
use files_manager::config::{Config, NodeConfig, QueueConfig, StorageConfig, ThumbnailConfig};
use files_manager::storage::models::UserRecord;
use files_manager::AppState;

// Changes the working directory, so this file holds a single test.
#[tokio::test]
async fn test_relative_folder_path_stores_resolvable_local_paths() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: "data".to_string(),
        },
        storage: StorageConfig {
            folder_path: "blobs".to_string(),
        },
        thumbnails: ThumbnailConfig::default(),
        queue: QueueConfig::default(),
        session_ttl: Duration::from_secs(60),
        test_mode: true,
        max_upload_size: 1024 * 1024,
    };
    let state = AppState::open(config).unwrap();
    assert!(Path::new(&state.config.storage.folder_path).is_absolute());

    let owner = UserRecord {
        id: "u1".to_string(),
        email: "u1@example.com".to_string(),
        password_hash: String::new(),
    };
    let file = state
        .catalog
        .upload(
            &owner,
            NewFile {
                name: Some("notes.txt".to_string()),
                file_type: Some("file".to_string()),
                data: Some(Bytes::from_static(b"hello")),
                ..NewFile::default()
            },
        )
        .await
        .unwrap();

    let local_path = file.local_path.expect("file should have a blob");
    assert!(Path::new(&local_path).is_absolute());
    assert_eq!(std::fs::read(&local_path).unwrap(), b"hello");
    assert!(!dir.path().join("blobs").join("blobs").exists());
}
