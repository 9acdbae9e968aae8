//! File metadata operations scoped to the owning user.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;

use crate::error::{Error, Result};
use crate::object_store::ObjectStore;
use crate::queue::JobQueue;
use crate::storage::models::{FileRecord, FileType, Job, UserRecord};
use crate::storage::Database;

/// Files returned per listing page
pub const PAGE_SIZE: usize = 20;

/// An upload as received from a client, before validation.
#[derive(Debug, Default, Clone)]
pub struct NewFile {
    pub name: Option<String>,
    pub file_type: Option<String>,
    /// `None` or `"0"` place the file at the root.
    pub parent_id: Option<String>,
    pub is_public: bool,
    /// Raw content. Ignored for folders.
    pub data: Option<Bytes>,
}

pub struct FileCatalog {
    db: Database,
    object_store: Arc<dyn ObjectStore>,
    queue: Arc<dyn JobQueue>,
    folder_path: PathBuf,
}

impl FileCatalog {
    pub fn new(
        db: Database,
        object_store: Arc<dyn ObjectStore>,
        queue: Arc<dyn JobQueue>,
        folder_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            db,
            object_store,
            queue,
            folder_path: folder_path.into(),
        }
    }

    /// Validate and store a new file, folder or image.
    ///
    /// Content is written before metadata. Images get a thumbnail job once
    /// their record is durable.
    pub async fn upload(&self, owner: &UserRecord, new_file: NewFile) -> Result<FileRecord> {
        let name = new_file
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::invalid("Missing name"))?;
        let file_type = new_file
            .file_type
            .as_deref()
            .and_then(FileType::parse)
            .ok_or_else(|| Error::invalid("Missing type"))?;
        let data = match (file_type, new_file.data) {
            (FileType::Folder, _) => None,
            (_, Some(data)) => Some(data),
            (_, None) => return Err(Error::invalid("Missing data")),
        };

        let parent_id = root_or(new_file.parent_id.as_deref()).map(str::to_string);
        if let Some(ref pid) = parent_id {
            let parent = self
                .db
                .get_file(pid)?
                .filter(|p| p.user_id == owner.id)
                .ok_or_else(|| Error::invalid("Parent not found"))?;
            if !parent.is_folder() {
                return Err(Error::invalid("Parent is not a folder"));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let local_path = match data {
            Some(data) => {
                let path = self
                    .folder_path
                    .join(uuid::Uuid::new_v4().to_string())
                    .to_string_lossy()
                    .to_string();
                self.object_store.put(&path, data).await?;
                Some(path)
            }
            None => None,
        };

        let file = FileRecord {
            id: id.clone(),
            user_id: owner.id.clone(),
            name,
            file_type,
            is_public: new_file.is_public,
            parent_id,
            local_path,
            created_at: Utc::now(),
        };

        if let Err(e) = self.db.put_file(&file) {
            // Best-effort cleanup of the uploaded blob
            if let Some(ref path) = file.local_path {
                let _ = self.object_store.delete(path).await;
            }
            return Err(e.into());
        }

        tracing::debug!(file_id = %id, file_type = file_type.as_str(), "Created file");

        if file_type == FileType::Image {
            // The file stays valid without variants until the job is resubmitted.
            if let Err(e) = self.enqueue_thumbnail_job(&file).await {
                tracing::warn!(file_id = %id, error = %e, "Failed to enqueue thumbnail job");
            }
        }

        Ok(file)
    }

    /// Queue variant generation for a persisted image.
    pub async fn enqueue_thumbnail_job(&self, file: &FileRecord) -> Result<()> {
        self.queue
            .enqueue(Job::new(file.id.clone(), file.user_id.clone()))
            .await?;
        Ok(())
    }

    /// Metadata of a file the caller owns.
    pub fn show(&self, owner: &UserRecord, file_id: &str) -> Result<FileRecord> {
        self.db
            .get_file(file_id)?
            .filter(|file| file.user_id == owner.id)
            .ok_or(Error::NotFound)
    }

    pub fn publish(&self, owner: &UserRecord, file_id: &str) -> Result<FileRecord> {
        self.set_visibility(owner, file_id, true)
    }

    pub fn unpublish(&self, owner: &UserRecord, file_id: &str) -> Result<FileRecord> {
        self.set_visibility(owner, file_id, false)
    }

    fn set_visibility(
        &self,
        owner: &UserRecord,
        file_id: &str,
        is_public: bool,
    ) -> Result<FileRecord> {
        let file = self
            .db
            .set_file_visibility(file_id, &owner.id, is_public)?
            .ok_or(Error::NotFound)?;
        tracing::debug!(file_id = %file_id, is_public, "Changed file visibility");
        Ok(file)
    }

    /// One page (0-based) of the caller's files under `parent_id`, oldest first.
    pub fn list(
        &self,
        owner: &UserRecord,
        parent_id: Option<&str>,
        page: usize,
    ) -> Result<Vec<FileRecord>> {
        let offset = page.saturating_mul(PAGE_SIZE);
        Ok(self
            .db
            .list_files(&owner.id, root_or(parent_id), offset, PAGE_SIZE)?)
    }
}

/// Treat `"0"` and empty ids as the root folder.
fn root_or(parent_id: Option<&str>) -> Option<&str> {
    parent_id.filter(|p| !p.is_empty() && *p != "0")
}
