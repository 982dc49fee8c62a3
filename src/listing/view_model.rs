//! Listing view-model.
//!
//! Owns the folder context, the breadcrumb path, the loaded items and the
//! selection. Every context change and every refresh reloads the folder
//! children and file children of the current folder as two independent
//! fetches.
//!
//! # Refresh sequencing
//!
//! Each reload takes a generation number from a monotonic counter. A fetch
//! applies its result only if its generation is still the newest one issued,
//! so when two refreshes overlap the older response is dropped no matter
//! which one arrives last.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::breadcrumb::{BreadcrumbPath, DEFAULT_ROOT_LABEL};
use super::usage::{StorageUsage, DEFAULT_QUOTA_BYTES};
use super::view::derive_view;
use crate::auth::SessionPort;
use crate::item::{AccountId, Item, ItemId, SortBy};
use crate::store::{FileStore, FolderStore};

/// Message recorded when a refresh runs without a session.
pub const NOT_AUTHENTICATED_MESSAGE: &str = "Not authenticated";

#[derive(Debug)]
struct ListingState {
    context: Option<ItemId>,
    path: BreadcrumbPath,
    folders: Vec<Item>,
    files: Vec<Item>,
    selection: Vec<ItemId>,
    error: Option<String>,
    usage: StorageUsage,
}

/// Decrements the in-flight counter when a fetch finishes, however it ends.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// View-model over the children of one folder.
pub struct ListingViewModel {
    folder_store: Arc<dyn FolderStore>,
    file_store: Arc<dyn FileStore>,
    session: Arc<dyn SessionPort>,
    state: RwLock<ListingState>,
    generation: AtomicU64,
    in_flight: AtomicUsize,
}

impl ListingViewModel {
    /// Create a view-model positioned at the root. Nothing is fetched until
    /// the first refresh or context change.
    pub fn new(
        folder_store: Arc<dyn FolderStore>,
        file_store: Arc<dyn FileStore>,
        session: Arc<dyn SessionPort>,
    ) -> Self {
        Self {
            folder_store,
            file_store,
            session,
            state: RwLock::new(ListingState {
                context: None,
                path: BreadcrumbPath::new(DEFAULT_ROOT_LABEL),
                folders: Vec::new(),
                files: Vec::new(),
                selection: Vec::new(),
                error: None,
                usage: StorageUsage::empty(DEFAULT_QUOTA_BYTES),
            }),
            generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Set the label of the root crumb.
    pub fn with_root_label(mut self, label: impl Into<String>) -> Self {
        self.state.get_mut().path = BreadcrumbPath::new(label);
        self
    }

    /// Set the quota used for storage usage.
    pub fn with_quota(mut self, total_bytes: u64) -> Self {
        self.state.get_mut().usage = StorageUsage::empty(total_bytes);
        self
    }

    /// Switch to another folder (None = root) and reload.
    ///
    /// The loaded items and the selection are cleared before the fetch.
    pub async fn set_folder_context(&self, folder_id: Option<ItemId>) {
        let (generation, context) = {
            let mut state = self.state.write().await;
            self.switch_context(&mut state, folder_id)
        };
        self.load(generation, context).await;
    }

    /// Reload the current folder.
    pub async fn refresh(&self) {
        let (generation, context) = {
            let state = self.state.write().await;
            (self.next_generation(), state.context.clone())
        };
        self.load(generation, context).await;
    }

    /// Open a child folder, appending it to the breadcrumb path.
    pub async fn navigate(&self, folder_id: ItemId, name: impl Into<String>) {
        let (generation, context) = {
            let mut state = self.state.write().await;
            state.path.push(folder_id.clone(), name);
            self.switch_context(&mut state, Some(folder_id))
        };
        self.load(generation, context).await;
    }

    /// Jump back to a crumb of the current path (None = root).
    ///
    /// Returns false without touching the path or the context when no crumb
    /// points at `folder_id`.
    pub async fn navigate_to_breadcrumb(&self, folder_id: Option<&ItemId>) -> bool {
        let (generation, context) = {
            let mut state = self.state.write().await;
            if !state.path.truncate_to(folder_id) {
                debug!(folder = ?folder_id, "No breadcrumb for folder, ignoring");
                return false;
            }
            self.switch_context(&mut state, folder_id.cloned())
        };
        self.load(generation, context).await;
        true
    }

    /// Return to the root with a fresh path and reload.
    pub async fn reset_to_root(&self) {
        let (generation, context) = {
            let mut state = self.state.write().await;
            state.path.reset();
            self.switch_context(&mut state, None)
        };
        self.load(generation, context).await;
    }

    fn switch_context(
        &self,
        state: &mut ListingState,
        folder_id: Option<ItemId>,
    ) -> (u64, Option<ItemId>) {
        state.context = folder_id;
        state.folders.clear();
        state.files.clear();
        state.selection.clear();
        (self.next_generation(), state.context.clone())
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn load(&self, generation: u64, context: Option<ItemId>) {
        let account = match self.session.current_account().await {
            Some(account) => account,
            None => {
                let mut state = self.state.write().await;
                if self.is_current(generation) {
                    state.error = Some(NOT_AUTHENTICATED_MESSAGE.to_string());
                }
                return;
            }
        };

        {
            let mut state = self.state.write().await;
            if self.is_current(generation) {
                state.error = None;
            }
        }

        debug!(
            account = %account,
            folder = ?context,
            generation,
            "Fetching listing"
        );

        tokio::join!(
            self.load_folders(&account, context.as_ref(), generation),
            self.load_files(&account, context.as_ref(), generation),
            self.load_usage(&account, generation),
        );
    }

    async fn load_folders(&self, account: &AccountId, parent: Option<&ItemId>, generation: u64) {
        let _in_flight = InFlight::start(&self.in_flight);
        let result = self.folder_store.list_folders(account, parent).await;

        let mut state = self.state.write().await;
        if !self.is_current(generation) {
            debug!(generation, "Discarding stale folder listing");
            return;
        }
        match result {
            Ok(records) => {
                state.folders = records.into_iter().map(Item::from).collect();
                Self::prune_selection(&mut state);
            }
            Err(e) => {
                warn!(error = %e, "Error fetching folders");
                state.error = Some(format!("Error fetching folders: {e}"));
            }
        }
    }

    async fn load_files(&self, account: &AccountId, parent: Option<&ItemId>, generation: u64) {
        let _in_flight = InFlight::start(&self.in_flight);
        let result = self.file_store.list_files(account, parent).await;

        let mut state = self.state.write().await;
        if !self.is_current(generation) {
            debug!(generation, "Discarding stale file listing");
            return;
        }
        match result {
            Ok(records) => {
                state.files = records.into_iter().map(Item::from).collect();
                Self::prune_selection(&mut state);
            }
            Err(e) => {
                warn!(error = %e, "Error fetching files");
                state.error = Some(format!("Error fetching files: {e}"));
            }
        }
    }

    async fn load_usage(&self, account: &AccountId, generation: u64) {
        let result = self.file_store.usage(account).await;

        let mut state = self.state.write().await;
        if !self.is_current(generation) {
            return;
        }
        match result {
            Ok(totals) => {
                state.usage = StorageUsage::from_totals(totals, state.usage.total_bytes);
            }
            Err(e) => warn!(error = %e, "Error fetching storage usage"),
        }
    }

    /// Loaded items, folders first, in store order.
    pub async fn items(&self) -> Vec<Item> {
        let state = self.state.read().await;
        state.folders.iter().chain(state.files.iter()).cloned().collect()
    }

    /// Look up a loaded item.
    pub async fn find(&self, id: &ItemId) -> Option<Item> {
        let state = self.state.read().await;
        state
            .folders
            .iter()
            .chain(state.files.iter())
            .find(|item| &item.id == id)
            .cloned()
    }

    /// Filtered and sorted items for display.
    pub async fn view(&self, query: &str, sort_by: SortBy) -> Vec<Item> {
        derive_view(&self.items().await, query, sort_by)
    }

    /// Folder whose children are listed (None = root).
    pub async fn current_folder(&self) -> Option<ItemId> {
        self.state.read().await.context.clone()
    }

    /// Snapshot of the breadcrumb path.
    pub async fn path(&self) -> BreadcrumbPath {
        self.state.read().await.path.clone()
    }

    /// Most recent fetch error of the current generation.
    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    /// Storage usage of the signed-in account.
    pub async fn storage_usage(&self) -> StorageUsage {
        self.state.read().await.usage
    }

    /// Whether a folder or file fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Number of reloads issued so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Selected item ids in selection order.
    pub async fn selection(&self) -> Vec<ItemId> {
        self.state.read().await.selection.clone()
    }

    /// Replace the selection with a single loaded item.
    ///
    /// Returns false when the item is not in the listing.
    pub async fn select_only(&self, id: &ItemId) -> bool {
        let mut state = self.state.write().await;
        if !Self::contains(&state, id) {
            return false;
        }
        state.selection = vec![id.clone()];
        true
    }

    /// Add or remove a loaded item from the selection.
    ///
    /// Returns whether the item is selected afterwards.
    pub async fn toggle_selection(&self, id: &ItemId) -> bool {
        let mut state = self.state.write().await;
        if let Some(pos) = state.selection.iter().position(|s| s == id) {
            state.selection.remove(pos);
            return false;
        }
        if !Self::contains(&state, id) {
            return false;
        }
        state.selection.push(id.clone());
        true
    }

    /// Clear the selection.
    pub async fn clear_selection(&self) {
        self.state.write().await.selection.clear();
    }

    /// Drop selected ids that are no longer in the listing.
    fn prune_selection(state: &mut ListingState) {
        let kept: Vec<ItemId> = state
            .selection
            .iter()
            .filter(|id| Self::contains(state, id))
            .cloned()
            .collect();
        state.selection = kept;
    }

    fn contains(state: &ListingState, id: &ItemId) -> bool {
        state
            .folders
            .iter()
            .chain(state.files.iter())
            .any(|item| &item.id == id)
    }
}

impl std::fmt::Debug for ListingViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingViewModel")
            .field("generation", &self.generation())
            .field("loading", &self.is_loading())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccountSession, SessionStore};
    use crate::store::{
        FolderRecord, MemoryBackend, NewFileRecord, NewFolderRecord, StoreResult,
    };
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Notify;

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    fn setup() -> (Arc<MemoryBackend>, Arc<SessionStore>, ListingViewModel) {
        let backend = Arc::new(MemoryBackend::default());
        let session = Arc::new(SessionStore::signed_in(alice()));
        let vm = ListingViewModel::new(backend.clone(), backend.clone(), session.clone());
        (backend, session, vm)
    }

    async fn add_folder(backend: &MemoryBackend, name: &str, parent: Option<&ItemId>) -> ItemId {
        backend
            .insert_folder(&NewFolderRecord {
                name: name.to_string(),
                parent_id: parent.cloned(),
                owner_id: alice(),
            })
            .await
            .unwrap()
            .id
    }

    async fn add_file(backend: &MemoryBackend, name: &str, size: u64, parent: Option<&ItemId>) {
        let id = ItemId::generate();
        backend
            .insert_file(&NewFileRecord {
                storage_path: format!("alice/{id}-{name}"),
                id,
                name: name.to_string(),
                size,
                media_type: None,
                parent_id: parent.cloned(),
                owner_id: alice(),
            })
            .await
            .unwrap();
    }

    fn names(items: &[Item]) -> Vec<String> {
        items.iter().map(|i| i.name.clone()).collect()
    }

    #[tokio::test]
    async fn test_refresh_merges_folders_and_files() {
        let (backend, _session, vm) = setup();
        add_folder(&backend, "docs", None).await;
        add_file(&backend, "a.txt", 10, None).await;

        vm.refresh().await;

        let items = vm.items().await;
        assert_eq!(names(&items), vec!["docs", "a.txt"]);
        assert!(vm.error().await.is_none());
        assert!(!vm.is_loading());
    }

    #[tokio::test]
    async fn test_listing_contains_only_direct_children() {
        let (backend, _session, vm) = setup();
        let docs = add_folder(&backend, "docs", None).await;
        let inner = add_folder(&backend, "inner", Some(&docs)).await;
        add_file(&backend, "deep.txt", 1, Some(&inner)).await;
        add_file(&backend, "top.txt", 1, None).await;

        vm.set_folder_context(Some(docs.clone())).await;

        let items = vm.items().await;
        assert_eq!(names(&items), vec!["inner"]);
        assert!(items.iter().all(|i| i.parent_id.as_ref() == Some(&docs)));
    }

    #[tokio::test]
    async fn test_refresh_without_session_reports_error() {
        let (_backend, session, vm) = setup();
        session.sign_out();

        vm.refresh().await;

        assert_eq!(vm.error().await.as_deref(), Some(NOT_AUTHENTICATED_MESSAGE));
        assert!(vm.items().await.is_empty());
    }

    #[tokio::test]
    async fn test_folder_failure_does_not_block_files() {
        let (backend, _session, vm) = setup();
        add_folder(&backend, "docs", None).await;
        add_file(&backend, "a.txt", 10, None).await;
        backend.fail_folder_lists(true);

        vm.refresh().await;

        assert_eq!(names(&vm.items().await), vec!["a.txt"]);
        let error = vm.error().await.unwrap();
        assert!(error.starts_with("Error fetching folders:"));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_listing() {
        let (backend, _session, vm) = setup();
        add_folder(&backend, "docs", None).await;
        vm.refresh().await;

        backend.fail_folder_lists(true);
        vm.refresh().await;

        assert_eq!(names(&vm.items().await), vec!["docs"]);
        assert!(vm.error().await.is_some());

        backend.fail_folder_lists(false);
        vm.refresh().await;
        assert!(vm.error().await.is_none());
    }

    #[tokio::test]
    async fn test_navigate_and_breadcrumbs() {
        let (backend, _session, vm) = setup();
        let a = add_folder(&backend, "A", None).await;
        let b = add_folder(&backend, "B", Some(&a)).await;
        add_file(&backend, "in-b.txt", 1, Some(&b)).await;

        vm.navigate(a.clone(), "A").await;
        vm.navigate(b.clone(), "B").await;

        assert_eq!(vm.path().await.len(), 3);
        assert_eq!(vm.current_folder().await, Some(b.clone()));
        assert_eq!(names(&vm.items().await), vec!["in-b.txt"]);

        assert!(vm.navigate_to_breadcrumb(Some(&a)).await);
        let path = vm.path().await;
        assert_eq!(path.len(), 2);
        assert_eq!(path.current().folder_id, Some(a.clone()));
        assert_eq!(vm.current_folder().await, Some(a));
        assert_eq!(names(&vm.items().await), vec!["B"]);
    }

    #[tokio::test]
    async fn test_navigate_to_unknown_breadcrumb_is_noop() {
        let (backend, _session, vm) = setup();
        let a = add_folder(&backend, "A", None).await;
        vm.navigate(a.clone(), "A").await;
        let generation = vm.generation();

        assert!(!vm.navigate_to_breadcrumb(Some(&ItemId::new("missing"))).await);

        assert_eq!(vm.path().await.len(), 2);
        assert_eq!(vm.current_folder().await, Some(a));
        assert_eq!(vm.generation(), generation);
    }

    #[tokio::test]
    async fn test_context_change_clears_selection() {
        let (backend, _session, vm) = setup();
        let docs = add_folder(&backend, "docs", None).await;
        vm.refresh().await;

        assert!(vm.select_only(&docs).await);
        assert_eq!(vm.selection().await, vec![docs.clone()]);

        vm.set_folder_context(Some(docs)).await;
        assert!(vm.selection().await.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_drops_vanished_selection() {
        let (backend, _session, vm) = setup();
        let a = add_folder(&backend, "a", None).await;
        let b = add_folder(&backend, "b", None).await;
        vm.refresh().await;
        vm.toggle_selection(&a).await;
        vm.toggle_selection(&b).await;

        backend.delete_folder(&alice(), &a).await.unwrap();
        vm.refresh().await;

        assert_eq!(vm.selection().await, vec![b]);
    }

    #[tokio::test]
    async fn test_toggle_selection() {
        let (backend, _session, vm) = setup();
        let a = add_folder(&backend, "a", None).await;
        let b = add_folder(&backend, "b", None).await;
        vm.refresh().await;

        assert!(vm.toggle_selection(&a).await);
        assert!(vm.toggle_selection(&b).await);
        assert!(!vm.toggle_selection(&a).await);
        assert_eq!(vm.selection().await, vec![b]);

        assert!(!vm.toggle_selection(&ItemId::new("ghost")).await);
        vm.clear_selection().await;
        assert!(vm.selection().await.is_empty());
    }

    #[tokio::test]
    async fn test_storage_usage_spans_folders() {
        let (backend, _session, vm) = setup();
        let docs = add_folder(&backend, "docs", None).await;
        add_file(&backend, "a.txt", 10, None).await;
        add_file(&backend, "b.txt", 20, Some(&docs)).await;

        let vm = vm.with_quota(1000);
        vm.refresh().await;

        let usage = vm.storage_usage().await;
        assert_eq!(usage.used_bytes, 30);
        assert_eq!(usage.file_count, 2);
        assert_eq!(usage.total_bytes, 1000);
    }

    #[tokio::test]
    async fn test_reset_to_root() {
        let (backend, session, vm) = setup();
        let a = add_folder(&backend, "A", None).await;
        vm.navigate(a, "A").await;

        session.sign_in(AccountSession::new(AccountId::new("bob")));
        vm.reset_to_root().await;

        assert_eq!(vm.path().await.len(), 1);
        assert!(vm.current_folder().await.is_none());
        assert!(vm.items().await.is_empty());
    }

    #[tokio::test]
    async fn test_root_label() {
        let (_backend, _session, vm) = setup();
        let vm = vm.with_root_label("Home");
        assert_eq!(vm.path().await.root().name, "Home");
    }

    /// Folder store whose first listing returns and then waits for a signal.
    struct GatedFolders {
        inner: Arc<MemoryBackend>,
        hold: AtomicBool,
        reached: Notify,
        release: Notify,
    }

    #[async_trait]
    impl FolderStore for GatedFolders {
        async fn list_folders(
            &self,
            owner: &AccountId,
            parent: Option<&ItemId>,
        ) -> StoreResult<Vec<FolderRecord>> {
            let result = self.inner.list_folders(owner, parent).await;
            if self.hold.swap(false, Ordering::SeqCst) {
                self.reached.notify_one();
                self.release.notified().await;
            }
            result
        }

        async fn get_folder(
            &self,
            owner: &AccountId,
            id: &ItemId,
        ) -> StoreResult<Option<FolderRecord>> {
            self.inner.get_folder(owner, id).await
        }

        async fn insert_folder(&self, folder: &NewFolderRecord) -> StoreResult<FolderRecord> {
            self.inner.insert_folder(folder).await
        }

        async fn rename_folder(
            &self,
            owner: &AccountId,
            id: &ItemId,
            name: &str,
        ) -> StoreResult<()> {
            self.inner.rename_folder(owner, id, name).await
        }

        async fn delete_folder(&self, owner: &AccountId, id: &ItemId) -> StoreResult<()> {
            self.inner.delete_folder(owner, id).await
        }
    }

    #[tokio::test]
    async fn test_stale_refresh_is_discarded() {
        let backend = Arc::new(MemoryBackend::default());
        add_folder(&backend, "old", None).await;

        let gated = Arc::new(GatedFolders {
            inner: backend.clone(),
            hold: AtomicBool::new(true),
            reached: Notify::new(),
            release: Notify::new(),
        });
        let session = Arc::new(SessionStore::signed_in(alice()));
        let vm = Arc::new(ListingViewModel::new(
            gated.clone(),
            backend.clone(),
            session,
        ));

        let first = {
            let vm = vm.clone();
            tokio::spawn(async move { vm.refresh().await })
        };
        gated.reached.notified().await;
        assert!(vm.is_loading());

        add_folder(&backend, "new", None).await;
        vm.refresh().await;
        assert_eq!(names(&vm.items().await), vec!["new", "old"]);

        gated.release.notify_one();
        first.await.unwrap();

        assert_eq!(names(&vm.items().await), vec!["new", "old"]);
        assert!(!vm.is_loading());
    }
}
