//! Test helpers for integration tests.
//!
//! Provides drive builders over the memory and local backends.

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;

use cloudshelf::{Config, Drive, Item, ItemId, MemoryBackend, UploadRequest};

/// Account used by most tests.
pub const ALICE: &str = "alice";

/// Config with `account` signed in and everything else default.
pub fn config_for(account: &str) -> Config {
    let mut config = Config::default();
    config.session.account_id = account.to_string();
    config
}

/// Drive over a fresh memory backend with alice signed in.
pub fn memory_drive() -> (Drive, Arc<MemoryBackend>) {
    Drive::in_memory(&config_for(ALICE))
}

/// Drive over SQLite and on-disk blobs inside a temporary directory.
///
/// Keep the returned directory alive for the duration of the test.
pub async fn local_drive(config: Config) -> (Drive, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = local_config(config, &dir);
    let drive = Drive::open_local(&config).await.expect("open local drive");
    (drive, dir)
}

/// Point the storage paths of `config` into `dir`.
pub fn local_config(mut config: Config, dir: &TempDir) -> Config {
    config.storage.database_path = dir.path().join("cloudshelf.db").display().to_string();
    config.storage.blob_path = dir.path().join("blobs").display().to_string();
    config
}

/// Plain text upload request.
pub fn text_file(name: &str, body: &str) -> UploadRequest {
    UploadRequest::new(name, body.as_bytes().to_vec()).with_media_type("text/plain")
}

/// Upload request with `size` zero bytes.
pub fn sized_file(name: &str, size: usize) -> UploadRequest {
    UploadRequest::new(name, vec![0; size])
}

/// Names of items in order.
pub fn names(items: &[Item]) -> Vec<String> {
    items.iter().map(|i| i.name.clone()).collect()
}

/// Find a listed item by name.
pub async fn find_by_name(drive: &Drive, name: &str) -> Option<Item> {
    drive
        .listing()
        .items()
        .await
        .into_iter()
        .find(|i| i.name == name)
}

/// Ids of the given items.
pub fn ids(items: &[&Item]) -> Vec<ItemId> {
    items.iter().map(|i| i.id.clone()).collect()
}
