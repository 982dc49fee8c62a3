//! Request and result types of the mutation coordinator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::item::ItemId;
use crate::{Result, ShelfError};

/// Data for a file upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Original file name.
    pub name: String,
    /// Declared media type, if known.
    pub media_type: Option<String>,
    /// File content.
    pub content: Vec<u8>,
}

impl UploadRequest {
    /// Create a new upload request.
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: None,
            content,
        }
    }

    /// Set the declared media type.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Size of the content in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// A downloaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Display name of the file.
    pub name: String,
    /// Media type recorded at upload.
    pub media_type: Option<String>,
    /// File content.
    pub content: Vec<u8>,
}

/// What deleting a non-empty folder does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderDeletePolicy {
    /// Refuse while the folder has children.
    #[default]
    Block,
    /// Delete every descendant first.
    Cascade,
}

impl FolderDeletePolicy {
    /// Get the policy as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FolderDeletePolicy::Block => "block",
            FolderDeletePolicy::Cascade => "cascade",
        }
    }
}

impl fmt::Display for FolderDeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FolderDeletePolicy {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "block" => Ok(FolderDeletePolicy::Block),
            "cascade" => Ok(FolderDeletePolicy::Cascade),
            other => Err(ShelfError::Validation(format!(
                "unknown folder delete policy: {other}"
            ))),
        }
    }
}

/// Outcome of a batch action over several items.
///
/// Items are processed independently; one failure does not stop the rest.
#[derive(Debug, Default)]
pub struct BatchReport<T> {
    /// Items that succeeded, with their result.
    pub succeeded: Vec<(ItemId, T)>,
    /// Items that failed, with their error.
    pub failed: Vec<(ItemId, ShelfError)>,
}

impl<T> BatchReport<T> {
    /// Create an empty report.
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Record the result of one item.
    pub fn record(&mut self, id: ItemId, result: Result<T>) {
        match result {
            Ok(value) => self.succeeded.push((id, value)),
            Err(e) => self.failed.push((id, e)),
        }
    }

    /// Whether every item succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of items processed.
    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Whether no item was processed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Error messages of the failed items, in processing order.
    pub fn error_messages(&self) -> Vec<String> {
        self.failed.iter().map(|(_, e)| e.to_string()).collect()
    }
}
