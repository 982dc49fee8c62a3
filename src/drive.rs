//! Wiring of the session, the stores, the listing and the coordinator.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::auth::{AccountSession, SessionStore};
use crate::config::{Config, ListingConfig};
use crate::datetime::format_relative_date;
use crate::item::{AccountId, Item};
use crate::listing::ListingViewModel;
use crate::mutation::MutationCoordinator;
use crate::store::{BlobStore, FileStore, FolderStore, MemoryBackend};

/// A configured drive for one process.
pub struct Drive {
    session: Arc<SessionStore>,
    listing: Arc<ListingViewModel>,
    coordinator: MutationCoordinator,
    display: ListingConfig,
}

impl Drive {
    /// Assemble a drive over the given stores.
    ///
    /// When the config names an account it is signed in right away.
    pub fn new(
        config: &Config,
        folders: Arc<dyn FolderStore>,
        files: Arc<dyn FileStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let session = Arc::new(SessionStore::new());
        if let Some(account_id) = config.account_id() {
            session.sign_in(AccountSession::new(AccountId::new(account_id)));
        }

        let listing = Arc::new(
            ListingViewModel::new(folders.clone(), files.clone(), session.clone())
                .with_root_label(config.listing.root_label.clone())
                .with_quota(config.storage.quota_bytes),
        );

        let coordinator =
            MutationCoordinator::new(session.clone(), folders, files, blobs, listing.clone())
                .with_folder_delete_policy(config.mutation.folder_delete);

        Self {
            session,
            listing,
            coordinator,
            display: config.listing.clone(),
        }
    }

    /// Open the local backend: SQLite metadata plus on-disk blobs.
    #[cfg(feature = "sqlite")]
    pub async fn open_local(config: &Config) -> crate::Result<Self> {
        use crate::store::{DiskBlobStore, SqliteStore};
        use crate::ShelfError;

        config.validate()?;

        let store = Arc::new(
            SqliteStore::open(&config.storage.database_path)
                .await
                .map_err(|e| ShelfError::backend("failed to open metadata database", e))?,
        );
        let blobs = Arc::new(
            DiskBlobStore::new(
                &config.storage.blob_path,
                &config.storage.bucket,
                config.storage.create_bucket,
            )
            .map_err(|e| ShelfError::backend("failed to open blob bucket", e))?,
        );

        info!(
            database = %config.storage.database_path,
            bucket = %blobs.bucket_path().display(),
            "Local drive opened"
        );

        Ok(Self::new(config, store.clone(), store, blobs))
    }

    /// Build a drive over a fresh memory backend.
    ///
    /// The backend is returned as well so callers can inspect it.
    pub fn in_memory(config: &Config) -> (Self, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new(config.storage.bucket.clone()));
        let drive = Self::new(config, backend.clone(), backend.clone(), backend.clone());
        (drive, backend)
    }

    /// The session store.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// The listing view-model.
    pub fn listing(&self) -> &Arc<ListingViewModel> {
        &self.listing
    }

    /// The mutation coordinator.
    pub fn coordinator(&self) -> &MutationCoordinator {
        &self.coordinator
    }

    /// Filtered listing in the configured default sort order.
    pub async fn default_view(&self, query: &str) -> Vec<Item> {
        self.listing.view(query, self.display.default_sort).await
    }

    /// Modification time of an item relative to `now`, in the configured timezone.
    pub fn format_modified(&self, item: &Item, now: &DateTime<Utc>) -> String {
        format_relative_date(&item.updated_at, now, &self.display.timezone)
    }

    /// Reset the listing to the root whenever the session changes.
    ///
    /// The task ends when the session store is dropped; abort the handle to
    /// stop it earlier.
    pub fn watch_session(&self) -> JoinHandle<()> {
        let mut subscription = self.session.subscribe();
        let listing = self.listing.clone();

        tokio::spawn(async move {
            while let Some(session) = subscription.changed().await {
                debug!(
                    account = ?session.as_ref().map(|s| s.account_id.to_string()),
                    "Session changed, resetting listing"
                );
                listing.reset_to_root().await;
            }
            subscription.unsubscribe();
        })
    }
}

impl std::fmt::Debug for Drive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Drive")
            .field("listing", &self.listing)
            .field("folder_delete", &self.coordinator.folder_delete_policy())
            .finish()
    }
}
