//! SQLite-backed folder and file metadata store.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::schema::MIGRATIONS;
use super::{
    FileRecord, FileStore, FolderRecord, FolderStore, NewFileRecord, NewFolderRecord, StoreError,
    StoreResult, UsageTotals,
};
use crate::item::{AccountId, ItemId};

#[derive(Debug, sqlx::FromRow)]
struct FolderRow {
    id: String,
    name: String,
    parent_id: Option<String>,
    owner_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FolderRow> for FolderRecord {
    fn from(row: FolderRow) -> Self {
        Self {
            id: ItemId::new(row.id),
            name: row.name,
            parent_id: row.parent_id.map(ItemId::new),
            owner_id: AccountId::new(row.owner_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FileRow {
    id: String,
    name: String,
    size: i64,
    media_type: Option<String>,
    storage_path: Option<String>,
    folder_id: Option<String>,
    owner_id: String,
    starred: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        Self {
            id: ItemId::new(row.id),
            name: row.name,
            size: u64::try_from(row.size).unwrap_or(0),
            media_type: row.media_type,
            storage_path: row.storage_path,
            parent_id: row.folder_id.map(ItemId::new),
            owner_id: AccountId::new(row.owner_id),
            starred: row.starred,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const FOLDER_COLUMNS: &str = "id, name, parent_id, owner_id, created_at, updated_at";

const FILE_COLUMNS: &str = "id, name, size, media_type, storage_path, folder_id, owner_id, \
                            starred, created_at, updated_at";

/// Folder and file metadata store on an SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open a database at the specified path, creating it if needed.
    ///
    /// Migrations are applied automatically.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        info!("Opening database at {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Open an in-memory database.
    pub async fn open_in_memory() -> StoreResult<Self> {
        debug!("Opening in-memory database");
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every connection to :memory: is a separate database, so keep
        // exactly one alive for the lifetime of the pool.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the current schema version.
    pub async fn schema_version(&self) -> StoreResult<i64> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        )
        .fetch_one(&self.pool)
        .await?;

        if !exists.0 {
            return Ok(0);
        }

        let version: (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_version")
                .fetch_one(&self.pool)
                .await?;
        Ok(version.0)
    }

    async fn migrate(&self) -> StoreResult<()> {
        let current_version = self.schema_version().await?;

        if current_version as usize >= MIGRATIONS.len() {
            debug!("Database is up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating database from version {} to {}",
            current_version,
            MIGRATIONS.len()
        );

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version     INTEGER PRIMARY KEY,
                applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        for (i, migration) in MIGRATIONS.iter().enumerate().skip(current_version as usize) {
            let version = (i + 1) as i64;
            info!("Applying migration v{}", version);

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
        }

        Ok(())
    }
}

fn ensure_affected(rows: u64) -> StoreResult<()> {
    if rows == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl FolderStore for SqliteStore {
    async fn list_folders(
        &self,
        owner: &AccountId,
        parent: Option<&ItemId>,
    ) -> StoreResult<Vec<FolderRecord>> {
        let query = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE owner_id = ? AND parent_id IS ? ORDER BY name"
        );
        let rows = sqlx::query_as::<_, FolderRow>(&query)
            .bind(owner.as_str())
            .bind(parent.map(ItemId::as_str))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(FolderRecord::from).collect())
    }

    async fn get_folder(
        &self,
        owner: &AccountId,
        id: &ItemId,
    ) -> StoreResult<Option<FolderRecord>> {
        let query = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ? AND owner_id = ?");
        let row = sqlx::query_as::<_, FolderRow>(&query)
            .bind(id.as_str())
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(FolderRecord::from))
    }

    async fn insert_folder(&self, folder: &NewFolderRecord) -> StoreResult<FolderRecord> {
        let id = ItemId::generate();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO folders (id, name, parent_id, owner_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.as_str())
        .bind(&folder.name)
        .bind(folder.parent_id.as_ref().map(ItemId::as_str))
        .bind(folder.owner_id.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_folder(&folder.owner_id, &id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn rename_folder(&self, owner: &AccountId, id: &ItemId, name: &str) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE folders SET name = ?, updated_at = ? WHERE id = ? AND owner_id = ?")
                .bind(name)
                .bind(Utc::now())
                .bind(id.as_str())
                .bind(owner.as_str())
                .execute(&self.pool)
                .await?;

        ensure_affected(result.rows_affected())
    }

    async fn delete_folder(&self, owner: &AccountId, id: &ItemId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ? AND owner_id = ?")
            .bind(id.as_str())
            .bind(owner.as_str())
            .execute(&self.pool)
            .await?;

        ensure_affected(result.rows_affected())
    }
}

#[async_trait]
impl FileStore for SqliteStore {
    async fn list_files(
        &self,
        owner: &AccountId,
        parent: Option<&ItemId>,
    ) -> StoreResult<Vec<FileRecord>> {
        let query = format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE owner_id = ? AND folder_id IS ? ORDER BY name"
        );
        let rows = sqlx::query_as::<_, FileRow>(&query)
            .bind(owner.as_str())
            .bind(parent.map(ItemId::as_str))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(FileRecord::from).collect())
    }

    async fn get_file(&self, owner: &AccountId, id: &ItemId) -> StoreResult<Option<FileRecord>> {
        let query = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ? AND owner_id = ?");
        let row = sqlx::query_as::<_, FileRow>(&query)
            .bind(id.as_str())
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(FileRecord::from))
    }

    async fn insert_file(&self, file: &NewFileRecord) -> StoreResult<FileRecord> {
        let size = i64::try_from(file.size)
            .map_err(|_| StoreError::Backend(format!("file size {} out of range", file.size)))?;
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO files (id, name, size, media_type, storage_path, folder_id, owner_id,
                                starred, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(file.id.as_str())
        .bind(&file.name)
        .bind(size)
        .bind(&file.media_type)
        .bind(&file.storage_path)
        .bind(file.parent_id.as_ref().map(ItemId::as_str))
        .bind(file.owner_id.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_file(&file.owner_id, &file.id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn rename_file(&self, owner: &AccountId, id: &ItemId, name: &str) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE files SET name = ?, updated_at = ? WHERE id = ? AND owner_id = ?")
                .bind(name)
                .bind(Utc::now())
                .bind(id.as_str())
                .bind(owner.as_str())
                .execute(&self.pool)
                .await?;

        ensure_affected(result.rows_affected())
    }

    async fn set_starred(
        &self,
        owner: &AccountId,
        id: &ItemId,
        starred: bool,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE files SET starred = ?, updated_at = ? WHERE id = ? AND owner_id = ?",
        )
        .bind(starred)
        .bind(Utc::now())
        .bind(id.as_str())
        .bind(owner.as_str())
        .execute(&self.pool)
        .await?;

        ensure_affected(result.rows_affected())
    }

    async fn delete_file(&self, owner: &AccountId, id: &ItemId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM files WHERE id = ? AND owner_id = ?")
            .bind(id.as_str())
            .bind(owner.as_str())
            .execute(&self.pool)
            .await?;

        ensure_affected(result.rows_affected())
    }

    async fn usage(&self, owner: &AccountId) -> StoreResult<UsageTotals> {
        let (used, count): (i64, i64) =
            sqlx::query_as("SELECT COALESCE(SUM(size), 0), COUNT(*) FROM files WHERE owner_id = ?")
                .bind(owner.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(UsageTotals {
            used_bytes: u64::try_from(used).unwrap_or(0),
            file_count: u64::try_from(count).unwrap_or(0),
        })
    }
}
