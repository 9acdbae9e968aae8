//! Read authorization for file content.

use std::sync::Arc;

use bytes::Bytes;

use crate::auth::Requestor;
use crate::error::{Error, Result};
use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::storage::models::FileRecord;
use crate::storage::Database;

/// Whether `requestor` may read the content of `file`: public files are
/// readable by anyone, private ones only by their owner.
pub fn can_read(requestor: &Requestor, file: &FileRecord) -> bool {
    file.is_public || requestor.user().is_some_and(|user| user.id == file.user_id)
}

/// Bytes of a file (or one of its variants) cleared for a requestor.
#[derive(Debug)]
pub struct FileContent {
    pub file: FileRecord,
    pub data: Bytes,
    pub mime_type: String,
}

pub struct AccessGate {
    db: Database,
    object_store: Arc<dyn ObjectStore>,
}

impl AccessGate {
    pub fn new(db: Database, object_store: Arc<dyn ObjectStore>) -> Self {
        Self { db, object_store }
    }

    /// Fetch content for `requestor`.
    ///
    /// Absent and unreadable files are both `NotFound`. The folder check only
    /// runs once access is granted, so a private folder never reveals itself.
    /// With `size`, the matching variant is served instead of the original.
    pub async fn open(
        &self,
        requestor: &Requestor,
        file_id: &str,
        size: Option<u32>,
    ) -> Result<FileContent> {
        let file = self
            .db
            .get_file(file_id)?
            .filter(|file| can_read(requestor, file))
            .ok_or(Error::NotFound)?;

        if file.is_folder() {
            return Err(Error::invalid("A folder doesn't have content"));
        }

        let path = match size {
            Some(size) => file.variant_path(size),
            None => file.local_path.clone(),
        }
        .ok_or(Error::NotFound)?;

        let data = self.object_store.get(&path).await.map_err(|e| match e {
            ObjectStoreError::NotFound(_) => Error::NotFound,
            other => other.into(),
        })?;

        let mime_type = mime_guess::from_path(&file.name)
            .first_or_octet_stream()
            .to_string();

        Ok(FileContent {
            file,
            data,
            mime_type,
        })
    }
}
