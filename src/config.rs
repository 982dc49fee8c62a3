//! Configuration module for cloudshelf.

use serde::Deserialize;
use std::path::Path;

use crate::item::SortBy;
use crate::listing::{DEFAULT_QUOTA_BYTES, DEFAULT_ROOT_LABEL};
use crate::mutation::FolderDeletePolicy;
use crate::{Result, ShelfError};

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite metadata database.
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Directory that holds blob buckets.
    #[serde(default = "default_blob_path")]
    pub blob_path: String,
    /// Name of the blob bucket.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Create the bucket directory when it is missing.
    #[serde(default = "default_create_bucket")]
    pub create_bucket: bool,
    /// Storage quota per account in bytes.
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,
}

fn default_database_path() -> String {
    "data/cloudshelf.db".to_string()
}

fn default_blob_path() -> String {
    "data/blobs".to_string()
}

fn default_bucket() -> String {
    "files".to_string()
}

fn default_create_bucket() -> bool {
    true
}

fn default_quota_bytes() -> u64 {
    DEFAULT_QUOTA_BYTES
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            blob_path: default_blob_path(),
            bucket: default_bucket(),
            create_bucket: default_create_bucket(),
            quota_bytes: default_quota_bytes(),
        }
    }
}

/// Listing display configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    /// Label of the root breadcrumb.
    #[serde(default = "default_root_label")]
    pub root_label: String,
    /// Sort key used when the caller does not pick one.
    #[serde(default)]
    pub default_sort: SortBy,
    /// Timezone for displaying dates (e.g., "Europe/Berlin", "UTC").
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_root_label() -> String {
    DEFAULT_ROOT_LABEL.to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            root_label: default_root_label(),
            default_sort: SortBy::default(),
            timezone: default_timezone(),
        }
    }
}

/// Mutation configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MutationConfig {
    /// What deleting a non-empty folder does (block / cascade).
    #[serde(default)]
    pub folder_delete: FolderDeletePolicy,
}

/// Session configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    /// Account signed in at startup. Empty means no session.
    #[serde(default)]
    pub account_id: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/cloudshelf.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub mutation: MutationConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ShelfError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ShelfError::Config(format!("parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `CLOUDSHELF_ACCOUNT_ID`: Override the signed-in account
    /// - `CLOUDSHELF_DATABASE_PATH`: Override the metadata database path
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(account_id) = std::env::var("CLOUDSHELF_ACCOUNT_ID") {
            if !account_id.is_empty() {
                self.session.account_id = account_id;
            }
        }

        if let Ok(database_path) = std::env::var("CLOUDSHELF_DATABASE_PATH") {
            if !database_path.is_empty() {
                self.storage.database_path = database_path;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The bucket name is empty or contains a path separator
    /// - The quota is zero
    /// - The root label is blank
    /// - The timezone is not a known IANA name
    pub fn validate(&self) -> Result<()> {
        let bucket = &self.storage.bucket;
        if bucket.is_empty() || bucket.contains('/') || bucket.contains('\\') || bucket == ".." {
            return Err(ShelfError::Config(format!(
                "invalid bucket name {bucket:?}; use a single directory name"
            )));
        }

        if self.storage.quota_bytes == 0 {
            return Err(ShelfError::Config(
                "storage.quota_bytes must be greater than zero".to_string(),
            ));
        }

        if self.listing.root_label.trim().is_empty() {
            return Err(ShelfError::Config(
                "listing.root_label cannot be empty".to_string(),
            ));
        }

        if self.listing.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ShelfError::Config(format!(
                "unknown timezone {:?}",
                self.listing.timezone
            )));
        }

        Ok(())
    }

    /// Account to sign in at startup, if any.
    pub fn account_id(&self) -> Option<&str> {
        let id = self.session.account_id.trim();
        (!id.is_empty()).then_some(id)
    }
}
