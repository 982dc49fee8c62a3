//! cloudshelf - personal file storage core
//!
//! Folder navigation, upload and download, rename, delete, starring and
//! storage quota for a signed-in account, over pluggable backend stores.

pub mod auth;
pub mod config;
pub mod datetime;
pub mod drive;
pub mod error;
pub mod item;
pub mod listing;
pub mod logging;
pub mod mutation;
pub mod store;

pub use auth::{AccountSession, SessionPort, SessionStore, SessionSubscription};
pub use config::Config;
pub use datetime::{format_relative_date, format_utc_datetime};
pub use drive::Drive;
pub use error::{Result, ShelfError};
pub use item::{AccountId, Item, ItemId, ItemKind, SortBy};
pub use listing::{
    derive_view, format_file_size, Breadcrumb, BreadcrumbPath, ListingViewModel, StorageUsage,
};
pub use mutation::{BatchReport, Download, FolderDeletePolicy, MutationCoordinator, UploadRequest};
pub use store::{BlobStore, FileStore, FolderStore, MemoryBackend, StoreError};
