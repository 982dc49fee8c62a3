//! Error types for cloudshelf.

use thiserror::Error;

use crate::store::StoreError;

/// Common error type for cloudshelf operations.
///
/// Every variant renders a message that can be shown to the user verbatim.
#[derive(Error, Debug)]
pub enum ShelfError {
    /// No signed-in account.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Record does not exist or is owned by another account.
    #[error("{0} not found")]
    NotFound(String),

    /// Record does not exist or the caller may not use it.
    #[error("{0} not found or access denied")]
    AccessDenied(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Folder still has children and the delete policy refuses to remove it.
    #[error("folder \"{0}\" is not empty")]
    FolderNotEmpty(String),

    /// The blob bucket has not been created in the backend.
    #[error(
        "storage bucket \"{bucket}\" not found; create the bucket in the storage backend before uploading"
    )]
    StorageNotProvisioned {
        /// Name of the missing bucket.
        bucket: String,
    },

    /// A backend call failed.
    #[error("{context}: {source}")]
    Backend {
        /// What the crate was doing when the call failed.
        context: &'static str,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// The targeted item is not part of the last loaded listing.
    #[error("{0} is not in the current listing")]
    LocalState(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShelfError {
    /// Wrap a store error with the action that produced it.
    pub fn backend(context: &'static str, source: StoreError) -> Self {
        ShelfError::Backend { context, source }
    }
}

/// Result type alias for cloudshelf operations.
pub type Result<T> = std::result::Result<T, ShelfError>;
