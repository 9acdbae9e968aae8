//! Thumbnail variant generation.
//!
//! Every image gets one resized copy per configured width, stored next to the
//! original at `{local_path}_{width}`:
//! - `VariantPipeline` validates a job and writes the variants
//! - `Thumbnailer` does the actual resizing
//! - `worker::run` drives the pipeline from the job queue

mod resize;
pub mod worker;

pub use resize::{ImageThumbnailer, ThumbnailError, Thumbnailer};

use std::sync::Arc;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::storage::models::{variant_path, FileRecord, FileType, Job};
use crate::storage::Database;

pub struct VariantPipeline {
    db: Database,
    object_store: Arc<dyn ObjectStore>,
    thumbnailer: Arc<dyn Thumbnailer>,
    sizes: Arc<[u32]>,
}

impl VariantPipeline {
    pub fn new(
        db: Database,
        object_store: Arc<dyn ObjectStore>,
        thumbnailer: Arc<dyn Thumbnailer>,
        sizes: Arc<[u32]>,
    ) -> Self {
        Self {
            db,
            object_store,
            thumbnailer,
            sizes,
        }
    }

    /// Generate every variant for the image named by `job`.
    ///
    /// Validation finishes before any blob is touched. Sizes run in
    /// configuration order and the first failure stops the job; variants
    /// already written stay in place and are simply overwritten on the next
    /// delivery.
    pub async fn process(&self, job: &Job) -> Result<()> {
        let file = self.validate(job)?;
        let local_path = file
            .local_path
            .as_deref()
            .ok_or_else(|| Error::invalid("File has no content"))?;

        let mut original: Option<Bytes> = None;
        for &size in self.sizes.iter() {
            let source = match original {
                Some(ref data) => data.clone(),
                None => {
                    let data = self.read_original(local_path, size).await?;
                    original = Some(data.clone());
                    data
                }
            };

            let thumbnailer = Arc::clone(&self.thumbnailer);
            let variant =
                tokio::task::spawn_blocking(move || thumbnailer.thumbnail(&source, size))
                    .await
                    .map_err(|e| Error::GenerationFailure {
                        size,
                        reason: e.to_string(),
                    })?
                    .map_err(|e| Error::GenerationFailure {
                        size,
                        reason: e.to_string(),
                    })?;

            let path = variant_path(local_path, size);
            if let Err(e) = self.object_store.put(&path, Bytes::from(variant)).await {
                tracing::warn!(file_id = %file.id, size, error = %e, "Failed to store variant");
                return Err(e.into());
            }
            tracing::debug!(file_id = %file.id, size, "Stored variant");
        }

        Ok(())
    }

    fn validate(&self, job: &Job) -> Result<FileRecord> {
        let file_id = job
            .file_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::invalid("Missing fileId"))?;
        let user_id = job
            .user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::invalid("Missing userId"))?;

        let file = self
            .db
            .get_file(file_id)?
            .filter(|file| file.user_id == user_id)
            .ok_or(Error::NotFound)?;

        if file.file_type != FileType::Image {
            return Err(Error::invalid("File is not an image"));
        }
        Ok(file)
    }

    async fn read_original(&self, local_path: &str, size: u32) -> Result<Bytes> {
        self.object_store
            .get(local_path)
            .await
            .map_err(|e| match e {
                ObjectStoreError::NotFound(_) => Error::GenerationFailure {
                    size,
                    reason: "original blob is missing".to_string(),
                },
                other => other.into(),
            })
    }
}
