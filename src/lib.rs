//! files-manager - A file storage backend with per-file visibility and thumbnails
//!
//! This crate provides file upload, visibility control and content serving with:
//! - Ownership-scoped metadata in redb (ACID, MVCC, crash-safe)
//! - Read authorization that never reveals private files to other users
//! - A durable at-least-once job queue feeding background thumbnail workers
//! - REST API with JSend envelopes

pub mod access;
pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod object_store;
pub mod queue;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod thumbnail;

pub use error::{Error, Result};

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use access::AccessGate;
use auth::Authenticator;
use catalog::FileCatalog;
use config::Config;
use object_store::{LocalStore, ObjectStore};
use queue::{DurableQueue, JobQueue};
use storage::Database;
use thumbnail::{ImageThumbnailer, VariantPipeline};

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub auth: Authenticator,
    pub access: AccessGate,
    pub catalog: FileCatalog,
    pub queue: Arc<dyn JobQueue>,
    pub pipeline: Arc<VariantPipeline>,
}

impl AppState {
    /// Open the database and blob store and wire every component to them.
    ///
    /// The blob folder is made absolute first, since every stored `local_path`
    /// is built from it and must name its blob from any working directory.
    pub fn open(mut config: Config) -> anyhow::Result<Self> {
        let db = Database::open(&config.node.data_dir)?;
        std::fs::create_dir_all(&config.storage.folder_path)?;
        let folder_path = std::fs::canonicalize(&config.storage.folder_path)?;
        config.storage.folder_path = folder_path.to_string_lossy().to_string();
        let object_store: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(&folder_path)?);
        let queue: Arc<dyn JobQueue> = Arc::new(DurableQueue::new(
            db.clone(),
            config.queue.visibility_timeout,
            config.queue.max_attempts,
        ));
        Ok(Self::with_components(config, db, object_store, queue))
    }

    pub fn with_components(
        config: Config,
        db: Database,
        object_store: Arc<dyn ObjectStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        let auth = Authenticator::new(db.clone(), config.session_ttl);
        let access = AccessGate::new(db.clone(), Arc::clone(&object_store));
        let catalog = FileCatalog::new(
            db.clone(),
            Arc::clone(&object_store),
            Arc::clone(&queue),
            &config.storage.folder_path,
        );
        let pipeline = Arc::new(VariantPipeline::new(
            db.clone(),
            object_store,
            Arc::new(ImageThumbnailer),
            Arc::clone(&config.thumbnails.sizes),
        ));

        Self {
            config,
            db,
            auth,
            access,
            catalog,
            queue,
            pipeline,
        }
    }

    /// Start the configured number of thumbnail workers and the session sweeper.
    pub fn spawn_workers(&self, shutdown: &CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles: Vec<JoinHandle<()>> = (0..self.config.thumbnails.workers)
            .map(|worker_id| {
                tokio::spawn(thumbnail::worker::run(
                    worker_id,
                    Arc::clone(&self.queue),
                    Arc::clone(&self.pipeline),
                    shutdown.clone(),
                ))
            })
            .collect();
        handles.push(tokio::spawn(auth::sweep_sessions(
            self.auth.clone(),
            auth::SESSION_SWEEP_INTERVAL,
            shutdown.clone(),
        )));
        handles
    }
}
