//! Folder listing for cloudshelf.
//!
//! This module provides:
//! - Breadcrumb navigation from the root
//! - The sorted and filtered view of a folder's children
//! - Storage usage and size formatting
//! - [`ListingViewModel`], which ties them to the backend stores

mod breadcrumb;
mod usage;
mod view;
mod view_model;

pub use breadcrumb::{Breadcrumb, BreadcrumbPath, DEFAULT_ROOT_LABEL};
pub use usage::{format_file_size, StorageUsage, DEFAULT_QUOTA_BYTES};
pub use view::{compare_names, derive_view};
pub use view_model::{ListingViewModel, NOT_AUTHENTICATED_MESSAGE};
