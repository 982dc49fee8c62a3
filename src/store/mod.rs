//! Backend ports for cloudshelf.
//!
//! The listing and the mutation coordinator talk to the outside world only
//! through the traits defined here:
//! - [`FolderStore`]: folder records scoped by owner
//! - [`FileStore`]: file metadata records scoped by owner
//! - [`BlobStore`]: file content keyed by a namespaced path
//!
//! Two adapters ship with the crate: [`MemoryBackend`] keeps everything in
//! process, and the local backend pairs [`SqliteStore`] with
//! [`DiskBlobStore`].

mod disk;
mod memory;
#[cfg(feature = "sqlite")]
mod schema;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use disk::DiskBlobStore;
pub use memory::MemoryBackend;
#[cfg(feature = "sqlite")]
pub use schema::MIGRATIONS;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::item::{AccountId, ItemId};

/// Errors reported by backend adapters.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record or blob at the requested key for this owner.
    #[error("resource not found")]
    NotFound,

    /// The blob bucket does not exist.
    #[error("bucket \"{0}\" does not exist")]
    BucketNotFound(String),

    /// A blob already exists at the key and overwriting is not allowed.
    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    /// Any other service-side failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Result type for backend calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A folder as stored by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderRecord {
    pub id: ItemId,
    pub name: String,
    pub parent_id: Option<ItemId>,
    pub owner_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for inserting a folder. The store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewFolderRecord {
    pub name: String,
    pub parent_id: Option<ItemId>,
    pub owner_id: AccountId,
}

/// File metadata as stored by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub id: ItemId,
    pub name: String,
    pub size: u64,
    pub media_type: Option<String>,
    pub storage_path: Option<String>,
    pub parent_id: Option<ItemId>,
    pub owner_id: AccountId,
    pub starred: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for inserting file metadata. The id is chosen by the caller because
/// the blob key embeds it.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub id: ItemId,
    pub name: String,
    pub size: u64,
    pub media_type: Option<String>,
    pub storage_path: String,
    pub parent_id: Option<ItemId>,
    pub owner_id: AccountId,
}

/// Aggregate size of everything an account has stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub used_bytes: u64,
    pub file_count: u64,
}

/// Namespaced key of a blob: `{account}/{id}-{sanitized name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobPath(String);

impl BlobPath {
    /// Build the key for a new upload.
    pub fn for_upload(owner: &AccountId, id: &ItemId, original_name: &str) -> Self {
        Self(format!(
            "{}/{}-{}",
            owner,
            id,
            sanitize_file_name(original_name)
        ))
    }

    /// Wrap a key read back from a file record.
    pub fn from_stored(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Replace every character outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Folder collection port.
#[async_trait]
pub trait FolderStore: Send + Sync {
    /// List folders directly under `parent` (None = root), ordered by name.
    async fn list_folders(
        &self,
        owner: &AccountId,
        parent: Option<&ItemId>,
    ) -> StoreResult<Vec<FolderRecord>>;

    /// Get a folder owned by `owner`.
    async fn get_folder(&self, owner: &AccountId, id: &ItemId)
        -> StoreResult<Option<FolderRecord>>;

    /// Insert a folder and return the stored record.
    async fn insert_folder(&self, folder: &NewFolderRecord) -> StoreResult<FolderRecord>;

    /// Rename a folder. `NotFound` when no folder of `owner` has this id.
    async fn rename_folder(&self, owner: &AccountId, id: &ItemId, name: &str) -> StoreResult<()>;

    /// Delete the folder record only. Children are left untouched.
    async fn delete_folder(&self, owner: &AccountId, id: &ItemId) -> StoreResult<()>;
}

/// File metadata collection port.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// List files directly under `parent` (None = root), ordered by name.
    async fn list_files(
        &self,
        owner: &AccountId,
        parent: Option<&ItemId>,
    ) -> StoreResult<Vec<FileRecord>>;

    /// Get a file owned by `owner`.
    async fn get_file(&self, owner: &AccountId, id: &ItemId) -> StoreResult<Option<FileRecord>>;

    /// Insert file metadata and return the stored record.
    async fn insert_file(&self, file: &NewFileRecord) -> StoreResult<FileRecord>;

    /// Rename a file. `NotFound` when no file of `owner` has this id.
    async fn rename_file(&self, owner: &AccountId, id: &ItemId, name: &str) -> StoreResult<()>;

    /// Set the starred flag. `NotFound` when no file of `owner` has this id.
    async fn set_starred(&self, owner: &AccountId, id: &ItemId, starred: bool)
        -> StoreResult<()>;

    /// Delete the file record.
    async fn delete_file(&self, owner: &AccountId, id: &ItemId) -> StoreResult<()>;

    /// Total size and count of every file `owner` has, in any folder.
    async fn usage(&self, owner: &AccountId) -> StoreResult<UsageTotals>;
}

/// Blob storage port.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store content at `path`. Fails with `AlreadyExists` instead of
    /// overwriting.
    async fn put(&self, path: &BlobPath, content: &[u8], media_type: Option<&str>)
        -> StoreResult<()>;

    /// Read the content at `path`.
    async fn get(&self, path: &BlobPath) -> StoreResult<Vec<u8>>;

    /// Remove the content at `path`.
    async fn remove(&self, path: &BlobPath) -> StoreResult<()>;
}
