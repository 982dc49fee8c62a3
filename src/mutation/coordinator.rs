//! Mutation coordinator.
//!
//! Every operation resolves the signed-in account first, performs its side
//! effect against the stores and then reloads the listing. A failure aborts
//! the operation and is returned to the caller; the listing is not reloaded
//! for failed operations.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::request::{BatchReport, Download, FolderDeletePolicy, UploadRequest};
use crate::auth::SessionPort;
use crate::item::{AccountId, Item, ItemId, ItemKind};
use crate::listing::ListingViewModel;
use crate::store::{
    BlobPath, BlobStore, FileRecord, FileStore, FolderRecord, FolderStore, NewFileRecord,
    NewFolderRecord, StoreError,
};
use crate::{Result, ShelfError};

/// Map a store error, keeping not-found and missing-bucket distinct.
fn store_error(context: &'static str, what: &str, e: StoreError) -> ShelfError {
    match e {
        StoreError::NotFound => ShelfError::NotFound(what.to_string()),
        StoreError::BucketNotFound(bucket) => ShelfError::StorageNotProvisioned { bucket },
        other => ShelfError::backend(context, other),
    }
}

/// Trim a user-entered name and reject it when nothing is left.
fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ShelfError::Validation("name cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Runs state-changing operations and resynchronizes the listing.
pub struct MutationCoordinator {
    session: Arc<dyn SessionPort>,
    folders: Arc<dyn FolderStore>,
    files: Arc<dyn FileStore>,
    blobs: Arc<dyn BlobStore>,
    listing: Arc<ListingViewModel>,
    folder_delete: FolderDeletePolicy,
}

impl MutationCoordinator {
    /// Create a coordinator with the blocking folder delete policy.
    pub fn new(
        session: Arc<dyn SessionPort>,
        folders: Arc<dyn FolderStore>,
        files: Arc<dyn FileStore>,
        blobs: Arc<dyn BlobStore>,
        listing: Arc<ListingViewModel>,
    ) -> Self {
        Self {
            session,
            folders,
            files,
            blobs,
            listing,
            folder_delete: FolderDeletePolicy::default(),
        }
    }

    /// Set what deleting a non-empty folder does.
    pub fn with_folder_delete_policy(mut self, policy: FolderDeletePolicy) -> Self {
        self.folder_delete = policy;
        self
    }

    /// Current folder delete policy.
    pub fn folder_delete_policy(&self) -> FolderDeletePolicy {
        self.folder_delete
    }

    async fn account(&self) -> Result<AccountId> {
        self.session
            .current_account()
            .await
            .ok_or(ShelfError::NotAuthenticated)
    }

    /// Upload a file into `target` (None = root).
    ///
    /// The target folder is checked before anything is written. When the
    /// metadata insert fails, the stored content is removed again.
    pub async fn upload(&self, request: UploadRequest, target: Option<&ItemId>) -> Result<Item> {
        let owner = self.account().await?;
        validate_name(&request.name)?;

        if let Some(folder_id) = target {
            let folder = self
                .folders
                .get_folder(&owner, folder_id)
                .await
                .map_err(|e| store_error("failed to look up target folder", "target folder", e))?;
            if folder.is_none() {
                return Err(ShelfError::AccessDenied("target folder".to_string()));
            }
        }

        let id = ItemId::generate();
        let path = BlobPath::for_upload(&owner, &id, &request.name);
        let size = request.size();

        self.blobs
            .put(&path, &request.content, request.media_type.as_deref())
            .await
            .map_err(|e| store_error("failed to store file content", "file content", e))?;

        let new_file = NewFileRecord {
            id,
            name: request.name,
            size,
            media_type: request.media_type,
            storage_path: path.to_string(),
            parent_id: target.cloned(),
            owner_id: owner,
        };

        let record = match self.files.insert_file(&new_file).await {
            Ok(record) => record,
            Err(e) => {
                if let Err(cleanup) = self.blobs.remove(&path).await {
                    warn!(
                        path = %path,
                        error = %cleanup,
                        "Failed to remove content after metadata insert failed"
                    );
                }
                return Err(ShelfError::backend("failed to save file metadata", e));
            }
        };

        info!(
            file_id = %record.id,
            name = %record.name,
            size = record.size,
            "File uploaded"
        );

        self.listing.refresh().await;
        Ok(Item::from(record))
    }

    /// Create a folder under `parent` (None = root).
    pub async fn create_folder(&self, name: &str, parent: Option<&ItemId>) -> Result<Item> {
        let owner = self.account().await?;
        let name = validate_name(name)?;

        if let Some(parent_id) = parent {
            let folder = self
                .folders
                .get_folder(&owner, parent_id)
                .await
                .map_err(|e| store_error("failed to look up parent folder", "parent folder", e))?;
            if folder.is_none() {
                return Err(ShelfError::AccessDenied("parent folder".to_string()));
            }
        }

        let record = self
            .folders
            .insert_folder(&NewFolderRecord {
                name,
                parent_id: parent.cloned(),
                owner_id: owner,
            })
            .await
            .map_err(|e| ShelfError::backend("failed to create folder", e))?;

        info!(folder_id = %record.id, name = %record.name, "Folder created");

        self.listing.refresh().await;
        Ok(Item::from(record))
    }

    /// Rename a folder or file owned by the caller.
    pub async fn rename(&self, id: &ItemId, new_name: &str, kind: ItemKind) -> Result<()> {
        let owner = self.account().await?;
        let name = validate_name(new_name)?;

        match kind {
            ItemKind::Folder => self
                .folders
                .rename_folder(&owner, id, &name)
                .await
                .map_err(|e| store_error("failed to rename folder", "folder", e))?,
            ItemKind::File => self
                .files
                .rename_file(&owner, id, &name)
                .await
                .map_err(|e| store_error("failed to rename file", "file", e))?,
        }

        info!(item_id = %id, kind = %kind, name = %name, "Item renamed");

        self.listing.refresh().await;
        Ok(())
    }

    /// Delete a folder or file owned by the caller.
    ///
    /// Folders follow the configured [`FolderDeletePolicy`].
    pub async fn delete_item(&self, id: &ItemId, kind: ItemKind) -> Result<()> {
        let owner = self.account().await?;
        self.delete_owned(&owner, id, kind).await?;
        self.listing.refresh().await;
        Ok(())
    }

    async fn delete_owned(&self, owner: &AccountId, id: &ItemId, kind: ItemKind) -> Result<()> {
        match kind {
            ItemKind::File => {
                let file = self
                    .files
                    .get_file(owner, id)
                    .await
                    .map_err(|e| store_error("failed to look up file", "file", e))?
                    .ok_or_else(|| ShelfError::NotFound("file".to_string()))?;
                self.remove_file(owner, &file).await?;
                info!(file_id = %id, name = %file.name, "File deleted");
            }
            ItemKind::Folder => {
                let folder = self
                    .folders
                    .get_folder(owner, id)
                    .await
                    .map_err(|e| store_error("failed to look up folder", "folder", e))?
                    .ok_or_else(|| ShelfError::NotFound("folder".to_string()))?;
                match self.folder_delete {
                    FolderDeletePolicy::Block => self.delete_empty_folder(owner, &folder).await?,
                    FolderDeletePolicy::Cascade => self.delete_folder_tree(owner, &folder).await?,
                }
                info!(
                    folder_id = %id,
                    name = %folder.name,
                    policy = %self.folder_delete,
                    "Folder deleted"
                );
            }
        }
        Ok(())
    }

    /// Remove a file's content (best effort) and then its record.
    async fn remove_file(&self, owner: &AccountId, file: &FileRecord) -> Result<()> {
        if let Some(path) = &file.storage_path {
            let path = BlobPath::from_stored(path.as_str());
            if let Err(e) = self.blobs.remove(&path).await {
                warn!(path = %path, error = %e, "Failed to remove file content");
            }
        }

        self.files
            .delete_file(owner, &file.id)
            .await
            .map_err(|e| store_error("failed to delete file", "file", e))
    }

    async fn delete_empty_folder(&self, owner: &AccountId, folder: &FolderRecord) -> Result<()> {
        let subfolders = self
            .folders
            .list_folders(owner, Some(&folder.id))
            .await
            .map_err(|e| ShelfError::backend("failed to list subfolders", e))?;
        let files = self
            .files
            .list_files(owner, Some(&folder.id))
            .await
            .map_err(|e| ShelfError::backend("failed to list folder files", e))?;

        if !subfolders.is_empty() || !files.is_empty() {
            return Err(ShelfError::FolderNotEmpty(folder.name.clone()));
        }

        self.folders
            .delete_folder(owner, &folder.id)
            .await
            .map_err(|e| store_error("failed to delete folder", "folder", e))
    }

    /// Delete a folder with everything below it, deepest folders first.
    async fn delete_folder_tree(&self, owner: &AccountId, root: &FolderRecord) -> Result<()> {
        let mut order = vec![root.id.clone()];
        let mut seen: HashSet<ItemId> = order.iter().cloned().collect();
        let mut next = 0;

        while next < order.len() {
            let children = self
                .folders
                .list_folders(owner, Some(&order[next]))
                .await
                .map_err(|e| ShelfError::backend("failed to list subfolders", e))?;
            for child in children {
                if seen.insert(child.id.clone()) {
                    order.push(child.id);
                }
            }
            next += 1;
        }

        for folder_id in order.iter().rev() {
            let files = self
                .files
                .list_files(owner, Some(folder_id))
                .await
                .map_err(|e| ShelfError::backend("failed to list folder files", e))?;
            for file in &files {
                self.remove_file(owner, file).await?;
            }

            self.folders
                .delete_folder(owner, folder_id)
                .await
                .map_err(|e| store_error("failed to delete folder", "folder", e))?;
            debug!(folder_id = %folder_id, files = files.len(), "Removed folder");
        }

        Ok(())
    }

    /// Flip the starred flag of a file in the loaded listing.
    ///
    /// The current flag is read from the listing, not re-fetched. Returns the
    /// new value.
    pub async fn toggle_star(&self, id: &ItemId) -> Result<bool> {
        let owner = self.account().await?;

        let item = self
            .listing
            .find(id)
            .await
            .filter(|item| item.kind == ItemKind::File)
            .ok_or_else(|| ShelfError::LocalState(format!("file {id}")))?;

        let starred = !item.starred;
        self.files
            .set_starred(&owner, id, starred)
            .await
            .map_err(|e| store_error("failed to update star", "file", e))?;

        info!(file_id = %id, starred, "Star toggled");

        self.listing.refresh().await;
        Ok(starred)
    }

    /// Fetch a file's content. The listing is not reloaded.
    pub async fn download(&self, id: &ItemId) -> Result<Download> {
        let owner = self.account().await?;

        let file = self
            .files
            .get_file(&owner, id)
            .await
            .map_err(|e| store_error("failed to look up file", "file", e))?
            .ok_or_else(|| ShelfError::NotFound("file".to_string()))?;

        let path = file
            .storage_path
            .as_deref()
            .map(BlobPath::from_stored)
            .ok_or_else(|| ShelfError::NotFound("storage path".to_string()))?;

        let content = self
            .blobs
            .get(&path)
            .await
            .map_err(|e| store_error("failed to download file", "file content", e))?;

        debug!(file_id = %id, size = content.len(), "File downloaded");

        Ok(Download {
            name: file.name,
            media_type: file.media_type,
            content,
        })
    }

    /// Write a download into `dir` under its display name.
    ///
    /// Only the final component of the name is used. Returns the written path.
    pub async fn save_download(&self, download: &Download, dir: &Path) -> Result<PathBuf> {
        let file_name = Path::new(&download.name)
            .file_name()
            .ok_or_else(|| {
                ShelfError::Validation(format!("cannot save file named {:?}", download.name))
            })?;

        let path = dir.join(file_name);
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, &download.content).await?;

        info!(path = %path.display(), size = download.content.len(), "Download saved");
        Ok(path)
    }

    /// Delete several items of the loaded listing.
    ///
    /// Kinds are resolved from the listing before anything is deleted. The
    /// listing is reloaded once at the end.
    pub async fn delete_many(&self, ids: &[ItemId]) -> Result<BatchReport<()>> {
        let owner = self.account().await?;

        let mut targets = Vec::with_capacity(ids.len());
        for id in ids {
            targets.push((id.clone(), self.listing.find(id).await.map(|item| item.kind)));
        }

        let mut report = BatchReport::new();
        for (id, kind) in targets {
            let result = match kind {
                Some(kind) => self.delete_owned(&owner, &id, kind).await,
                None => Err(ShelfError::LocalState(format!("item {id}"))),
            };
            if let Err(e) = &result {
                warn!(item_id = %id, error = %e, "Batch delete failed for item");
            }
            report.record(id, result);
        }

        self.listing.refresh().await;
        self.listing.clear_selection().await;
        Ok(report)
    }

    /// Download several files.
    pub async fn download_many(&self, ids: &[ItemId]) -> Result<BatchReport<Download>> {
        self.account().await?;

        let mut report = BatchReport::new();
        for id in ids {
            let result = self.download(id).await;
            if let Err(e) = &result {
                warn!(item_id = %id, error = %e, "Batch download failed for item");
            }
            report.record(id.clone(), result);
        }
        Ok(report)
    }

    /// The listing this coordinator reloads.
    pub fn listing(&self) -> &Arc<ListingViewModel> {
        &self.listing
    }
}
