use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of entry stored in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Folder,
    Image,
}

impl FileType {
    /// Parse the wire name of a file type (`file`, `image`, `folder`).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "file" => Some(FileType::File),
            "folder" => Some(FileType::Folder),
            "image" => Some(FileType::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::File => "file",
            FileType::Folder => "folder",
            FileType::Image => "image",
        }
    }
}

/// A file record stored in redb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    /// Owner. Never changes after creation.
    pub user_id: String,
    pub name: String,
    pub file_type: FileType,
    pub is_public: bool,
    /// `None` means the file lives at the owner's root.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Location of the original blob. Folders have none.
    #[serde(default)]
    pub local_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn is_folder(&self) -> bool {
        self.file_type == FileType::Folder
    }

    /// Blob path of the resized variant at `size` pixels wide.
    pub fn variant_path(&self, size: u32) -> Option<String> {
        self.local_path
            .as_deref()
            .map(|path| variant_path(path, size))
    }
}

/// `{local_path}_{size}`, the on-disk name of a derived variant.
pub fn variant_path(local_path: &str, size: u32) -> String {
    format!("{local_path}_{size}")
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    /// Hex-encoded SHA-1 digest of the password.
    pub password_hash: String,
}

/// A login session, keyed by its token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Thumbnail work item carried by the job queue.
///
/// Both ids are optional so a malformed job survives decoding and is rejected
/// by the pipeline rather than lost.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Job {
    pub fn new(file_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            file_id: Some(file_id.into()),
            user_id: Some(user_id.into()),
        }
    }
}

/// A queued job plus its delivery bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEntry {
    pub job: Job,
    /// Number of times the job has been handed to a worker.
    pub attempts: u32,
    /// While set and in the future, the job is invisible to `dequeue`.
    #[serde(default)]
    pub leased_until: Option<DateTime<Utc>>,
}
