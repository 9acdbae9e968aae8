use thiserror::Error;

use crate::object_store::ObjectStoreError;
use crate::queue::QueueError;
use crate::storage::DatabaseError;

/// Outcome taxonomy shared by the access gate, the catalog and the
/// thumbnail pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The file is absent, private to someone else, or not owned by the caller.
    /// These causes are never told apart.
    #[error("Not found")]
    NotFound,
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// A store or the queue could not be reached; retrying may succeed.
    #[error("Store unavailable: {0}")]
    TransientStore(String),
    #[error("Failed to generate thumbnail for size {size}: {reason}")]
    GenerationFailure { size: u32, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidRequest(message.into())
    }

    /// Whether a job that ended with this error should be dropped rather than
    /// redelivered. Bad input stays bad no matter how often it is retried.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::NotFound | Error::InvalidRequest(_) | Error::Unauthorized
        )
    }
}

impl From<DatabaseError> for Error {
    fn from(e: DatabaseError) -> Self {
        Error::TransientStore(e.to_string())
    }
}

impl From<ObjectStoreError> for Error {
    fn from(e: ObjectStoreError) -> Self {
        Error::TransientStore(e.to_string())
    }
}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Error::TransientStore(e.to_string())
    }
}
