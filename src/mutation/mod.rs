//! State-changing operations for cloudshelf.
//!
//! This module provides:
//! - Upload with target folder check and blob cleanup on failure
//! - Folder creation, rename and star toggling
//! - Delete with a configurable policy for non-empty folders
//! - Download and batch actions over a selection

mod coordinator;
mod request;

pub use coordinator::MutationCoordinator;
pub use request::{BatchReport, Download, FolderDeletePolicy, UploadRequest};
