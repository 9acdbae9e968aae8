use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::FileRecord;
use super::tables::*;

/// Key of the listing index for one owner's folder.
fn folder_key(user_id: &str, parent_id: Option<&str>) -> String {
    format!("{user_id}/{}", parent_id.unwrap_or("0"))
}

impl Database {
    // ========================================================================
    // File operations
    // ========================================================================

    /// Store a file record and append it to its folder's listing index
    pub fn put_file(&self, file: &FileRecord) -> Result<(), DatabaseError> {
        debug_assert!(!file.id.is_empty(), "file id must not be empty");
        debug_assert!(!file.user_id.is_empty(), "file owner must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(FILES)?;
            let data = rmp_serde::to_vec_named(file)?;
            table.insert(file.id.as_str(), data.as_slice())?;

            let key = folder_key(&file.user_id, file.parent_id.as_deref());
            let mut folder_table = write_txn.open_table(FOLDER_FILES)?;
            let mut file_ids: Vec<String> = match folder_table.get(key.as_str())? {
                Some(v) => rmp_serde::from_slice(v.value())?,
                None => Vec::new(),
            };

            if !file_ids.contains(&file.id) {
                file_ids.push(file.id.clone());
                let index_data = rmp_serde::to_vec_named(&file_ids)?;
                folder_table.insert(key.as_str(), index_data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a file by its UUID
    pub fn get_file(&self, id: &str) -> Result<Option<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        match table.get(id)? {
            Some(data) => {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(file))
            }
            None => Ok(None),
        }
    }

    /// Set `is_public` on a file owned by `owner_id`.
    ///
    /// The ownership check and the write share one write transaction, so the
    /// record cannot change between them. Returns `None` both when the file
    /// does not exist and when it belongs to someone else.
    pub fn set_file_visibility(
        &self,
        id: &str,
        owner_id: &str,
        is_public: bool,
    ) -> Result<Option<FileRecord>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing = {
            let table = write_txn.open_table(FILES)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let file: FileRecord = rmp_serde::from_slice(data.value())?;
                    Some(file)
                }
                None => None,
            };
            result
        };

        let updated = match existing {
            Some(mut file) if file.user_id == owner_id => {
                file.is_public = is_public;
                let serialized = rmp_serde::to_vec_named(&file)?;
                let mut table = write_txn.open_table(FILES)?;
                table.insert(id, serialized.as_slice())?;
                Some(file)
            }
            _ => None,
        };

        if updated.is_some() {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(updated)
    }

    /// List one page of an owner's folder in insertion order
    pub fn list_files(
        &self,
        user_id: &str,
        parent_id: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let folder_table = read_txn.open_table(FOLDER_FILES)?;
        let files_table = read_txn.open_table(FILES)?;

        let key = folder_key(user_id, parent_id);
        let file_ids: Vec<String> = match folder_table.get(key.as_str())? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut files = Vec::new();
        for file_id in file_ids.iter().skip(offset).take(limit) {
            if let Some(data) = files_table.get(file_id.as_str())? {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                files.push(file);
            }
        }

        Ok(files)
    }
}
