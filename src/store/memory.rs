//! In-process backend for cloudshelf.
//!
//! Holds folders, file metadata and blobs in memory. Besides serving as a
//! lightweight backend it exposes switches that make selected calls fail, so
//! callers can exercise their failure paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    BlobPath, BlobStore, FileRecord, FileStore, FolderRecord, FolderStore, NewFileRecord,
    NewFolderRecord, StoreError, StoreResult, UsageTotals,
};
use crate::item::{AccountId, ItemId};

#[derive(Debug, Default)]
struct MemoryState {
    folders: HashMap<ItemId, FolderRecord>,
    files: HashMap<ItemId, FileRecord>,
    blobs: HashMap<String, Vec<u8>>,
}

/// Memory-backed implementation of all three store ports.
#[derive(Debug)]
pub struct MemoryBackend {
    bucket: String,
    state: RwLock<MemoryState>,
    bucket_exists: AtomicBool,
    fail_file_inserts: AtomicBool,
    fail_folder_lists: AtomicBool,
    fail_blob_removes: AtomicBool,
    blob_calls: AtomicUsize,
}

impl MemoryBackend {
    /// Create an empty backend with a provisioned bucket.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            state: RwLock::new(MemoryState::default()),
            bucket_exists: AtomicBool::new(true),
            fail_file_inserts: AtomicBool::new(false),
            fail_folder_lists: AtomicBool::new(false),
            fail_blob_removes: AtomicBool::new(false),
            blob_calls: AtomicUsize::new(0),
        }
    }

    /// Name of the blob bucket.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Make the bucket appear provisioned or missing.
    pub fn set_bucket_exists(&self, exists: bool) {
        self.bucket_exists.store(exists, Ordering::SeqCst);
    }

    /// Make every file metadata insert fail.
    pub fn fail_file_inserts(&self, fail: bool) {
        self.fail_file_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make every folder listing fail.
    pub fn fail_folder_lists(&self, fail: bool) {
        self.fail_folder_lists.store(fail, Ordering::SeqCst);
    }

    /// Make every blob removal fail.
    pub fn fail_blob_removes(&self, fail: bool) {
        self.fail_blob_removes.store(fail, Ordering::SeqCst);
    }

    /// Number of blob store calls received so far.
    pub fn blob_calls(&self) -> usize {
        self.blob_calls.load(Ordering::SeqCst)
    }

    /// Number of blobs currently stored.
    pub async fn blob_count(&self) -> usize {
        self.state.read().await.blobs.len()
    }

    /// Whether a blob exists at `path`.
    pub async fn has_blob(&self, path: &str) -> bool {
        self.state.read().await.blobs.contains_key(path)
    }

    /// Number of folder records of any owner.
    pub async fn folder_count(&self) -> usize {
        self.state.read().await.folders.len()
    }

    /// Number of file records of any owner.
    pub async fn file_count(&self) -> usize {
        self.state.read().await.files.len()
    }

    fn record_blob_call(&self) -> StoreResult<()> {
        self.blob_calls.fetch_add(1, Ordering::SeqCst);
        if self.bucket_exists.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::BucketNotFound(self.bucket.clone()))
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new("files")
    }
}

#[async_trait]
impl FolderStore for MemoryBackend {
    async fn list_folders(
        &self,
        owner: &AccountId,
        parent: Option<&ItemId>,
    ) -> StoreResult<Vec<FolderRecord>> {
        if self.fail_folder_lists.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("folder listing unavailable".to_string()));
        }

        let state = self.state.read().await;
        let mut folders: Vec<FolderRecord> = state
            .folders
            .values()
            .filter(|f| &f.owner_id == owner && f.parent_id.as_ref() == parent)
            .cloned()
            .collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }

    async fn get_folder(
        &self,
        owner: &AccountId,
        id: &ItemId,
    ) -> StoreResult<Option<FolderRecord>> {
        let state = self.state.read().await;
        Ok(state
            .folders
            .get(id)
            .filter(|f| &f.owner_id == owner)
            .cloned())
    }

    async fn insert_folder(&self, folder: &NewFolderRecord) -> StoreResult<FolderRecord> {
        let now = Utc::now();
        let record = FolderRecord {
            id: ItemId::generate(),
            name: folder.name.clone(),
            parent_id: folder.parent_id.clone(),
            owner_id: folder.owner_id.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.write().await;
        state.folders.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn rename_folder(&self, owner: &AccountId, id: &ItemId, name: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.folders.get_mut(id) {
            Some(folder) if &folder.owner_id == owner => {
                folder.name = name.to_string();
                folder.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn delete_folder(&self, owner: &AccountId, id: &ItemId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.folders.get(id) {
            Some(folder) if &folder.owner_id == owner => {
                state.folders.remove(id);
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl FileStore for MemoryBackend {
    async fn list_files(
        &self,
        owner: &AccountId,
        parent: Option<&ItemId>,
    ) -> StoreResult<Vec<FileRecord>> {
        let state = self.state.read().await;
        let mut files: Vec<FileRecord> = state
            .files
            .values()
            .filter(|f| &f.owner_id == owner && f.parent_id.as_ref() == parent)
            .cloned()
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn get_file(&self, owner: &AccountId, id: &ItemId) -> StoreResult<Option<FileRecord>> {
        let state = self.state.read().await;
        Ok(state.files.get(id).filter(|f| &f.owner_id == owner).cloned())
    }

    async fn insert_file(&self, file: &NewFileRecord) -> StoreResult<FileRecord> {
        if self.fail_file_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("file insert rejected".to_string()));
        }

        let mut state = self.state.write().await;
        if state.files.contains_key(&file.id) || state.folders.contains_key(&file.id) {
            return Err(StoreError::AlreadyExists(file.id.to_string()));
        }

        let now = Utc::now();
        let record = FileRecord {
            id: file.id.clone(),
            name: file.name.clone(),
            size: file.size,
            media_type: file.media_type.clone(),
            storage_path: Some(file.storage_path.clone()),
            parent_id: file.parent_id.clone(),
            owner_id: file.owner_id.clone(),
            starred: false,
            created_at: now,
            updated_at: now,
        };
        state.files.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn rename_file(&self, owner: &AccountId, id: &ItemId, name: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.files.get_mut(id) {
            Some(file) if &file.owner_id == owner => {
                file.name = name.to_string();
                file.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn set_starred(
        &self,
        owner: &AccountId,
        id: &ItemId,
        starred: bool,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.files.get_mut(id) {
            Some(file) if &file.owner_id == owner => {
                file.starred = starred;
                file.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn delete_file(&self, owner: &AccountId, id: &ItemId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.files.get(id) {
            Some(file) if &file.owner_id == owner => {
                state.files.remove(id);
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn usage(&self, owner: &AccountId) -> StoreResult<UsageTotals> {
        let state = self.state.read().await;
        let mut totals = UsageTotals::default();
        for file in state.files.values().filter(|f| &f.owner_id == owner) {
            totals.used_bytes += file.size;
            totals.file_count += 1;
        }
        Ok(totals)
    }
}

#[async_trait]
impl BlobStore for MemoryBackend {
    async fn put(
        &self,
        path: &BlobPath,
        content: &[u8],
        _media_type: Option<&str>,
    ) -> StoreResult<()> {
        self.record_blob_call()?;

        let mut state = self.state.write().await;
        if state.blobs.contains_key(path.as_str()) {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        state.blobs.insert(path.to_string(), content.to_vec());
        Ok(())
    }

    async fn get(&self, path: &BlobPath) -> StoreResult<Vec<u8>> {
        self.record_blob_call()?;

        let state = self.state.read().await;
        state
            .blobs
            .get(path.as_str())
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn remove(&self, path: &BlobPath) -> StoreResult<()> {
        self.record_blob_call()?;

        if self.fail_blob_removes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("blob removal failed".to_string()));
        }

        let mut state = self.state.write().await;
        state.blobs.remove(path.as_str());
        Ok(())
    }
}
