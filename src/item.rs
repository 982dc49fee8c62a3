//! Unified listing item for cloudshelf.
//!
//! Folder records and file records come back from the store in two different
//! shapes. Both are normalized into [`Item`] before the listing derives its
//! sorted and filtered view.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{FileRecord, FolderRecord};
use crate::ShelfError;

/// Identifier of the account that owns records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Create an account id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Opaque identifier of a folder or file, unique per owner across both kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create an item id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Discriminator between folders and files.
///
/// The derived ordering puts folders first, which the listing relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Folder,
    File,
}

impl ItemKind {
    /// Get the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Folder => "folder",
            ItemKind::File => "file",
        }
    }

    /// Whether this is the folder kind.
    pub fn is_folder(&self) -> bool {
        matches!(self, ItemKind::Folder)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secondary sort key for the derived listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Name, case-insensitive.
    #[default]
    Name,
    /// Most recently updated first.
    Modified,
    /// Largest first.
    Size,
    /// Media type, ascending.
    Type,
}

impl SortBy {
    /// Get the sort key as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Name => "name",
            SortBy::Modified => "modified",
            SortBy::Size => "size",
            SortBy::Type => "type",
        }
    }
}

impl FromStr for SortBy {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(SortBy::Name),
            "modified" => Ok(SortBy::Modified),
            "size" => Ok(SortBy::Size),
            "type" => Ok(SortBy::Type),
            other => Err(ShelfError::Validation(format!("unknown sort key: {other}"))),
        }
    }
}

/// A folder or file as shown in a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: ItemId,
    pub kind: ItemKind,
    pub name: String,
    /// Always 0 for folders.
    pub size_bytes: u64,
    /// Only set for files.
    pub media_type: Option<String>,
    /// Blob key of a file's content.
    #[serde(skip)]
    pub storage_path: Option<String>,
    /// Containing folder (None = root).
    pub parent_id: Option<ItemId>,
    pub owner_id: AccountId,
    pub starred: bool,
    /// Carried through from the record; nothing in this crate sets it.
    pub shared: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Whether this item is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }
}

impl From<FolderRecord> for Item {
    fn from(folder: FolderRecord) -> Self {
        Self {
            id: folder.id,
            kind: ItemKind::Folder,
            name: folder.name,
            size_bytes: 0,
            media_type: None,
            storage_path: None,
            parent_id: folder.parent_id,
            owner_id: folder.owner_id,
            starred: false,
            shared: false,
            created_at: folder.created_at,
            updated_at: folder.updated_at,
        }
    }
}

impl From<FileRecord> for Item {
    fn from(file: FileRecord) -> Self {
        Self {
            id: file.id,
            kind: ItemKind::File,
            name: file.name,
            size_bytes: file.size,
            media_type: file.media_type,
            storage_path: file.storage_path,
            parent_id: file.parent_id,
            owner_id: file.owner_id,
            starred: file.starred,
            shared: false,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}
