//! On-disk blob storage.
//!
//! Blobs live under a bucket directory; the namespaced key maps directly to a
//! relative path:
//! ```text
//! {root}/{bucket}/
//! ├── {account}/
//! │   ├── 6f1c...-report.pdf
//! │   └── 91ab...-photo.jpg
//! └── ...
//! ```

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use super::{BlobPath, BlobStore, StoreError, StoreResult};

/// Write `content` to a freshly created file, removing it again if the write
/// fails so no partial blob is left behind.
async fn write_or_remove<W>(mut file: W, file_path: &Path, content: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match file.write_all(content).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        drop(file);
        if let Err(cleanup) = fs::remove_file(file_path).await {
            warn!("Failed to remove partial blob {}: {}", file_path.display(), cleanup);
        }
        return Err(e);
    }
    Ok(())
}

/// Blob store writing files below a bucket directory.
#[derive(Debug, Clone)]
pub struct DiskBlobStore {
    bucket: String,
    bucket_path: PathBuf,
}

impl DiskBlobStore {
    /// Create a store for `bucket` under `root`.
    ///
    /// With `create_bucket` the bucket directory is created when missing;
    /// otherwise uploads fail with `BucketNotFound` until it exists.
    pub fn new(
        root: impl Into<PathBuf>,
        bucket: impl Into<String>,
        create_bucket: bool,
    ) -> StoreResult<Self> {
        let bucket = bucket.into();
        let bucket_path = root.into().join(&bucket);

        if create_bucket {
            std::fs::create_dir_all(&bucket_path)?;
        }

        Ok(Self {
            bucket,
            bucket_path,
        })
    }

    /// Get the bucket directory.
    pub fn bucket_path(&self) -> &Path {
        &self.bucket_path
    }

    /// Resolve a key to its file path, rejecting keys that would escape the
    /// bucket.
    pub fn file_path(&self, path: &BlobPath) -> StoreResult<PathBuf> {
        let relative = Path::new(path.as_str());
        let safe = !path.as_str().is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !safe {
            return Err(StoreError::Backend(format!("invalid blob key: {path}")));
        }
        Ok(self.bucket_path.join(relative))
    }

    async fn ensure_bucket(&self) -> StoreResult<()> {
        match fs::metadata(&self.bucket_path).await {
            Ok(m) if m.is_dir() => Ok(()),
            Ok(_) => Err(StoreError::BucketNotFound(self.bucket.clone())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::BucketNotFound(self.bucket.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn put(
        &self,
        path: &BlobPath,
        content: &[u8],
        media_type: Option<&str>,
    ) -> StoreResult<()> {
        self.ensure_bucket().await?;
        let file_path = self.file_path(path)?;

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        write_or_remove(file, &file_path, content).await?;

        debug!(
            "Stored blob {} ({} bytes, {})",
            path,
            content.len(),
            media_type.unwrap_or("application/octet-stream")
        );
        Ok(())
    }

    async fn get(&self, path: &BlobPath) -> StoreResult<Vec<u8>> {
        self.ensure_bucket().await?;
        let file_path = self.file_path(path)?;

        match fs::read(&file_path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, path: &BlobPath) -> StoreResult<()> {
        self.ensure_bucket().await?;
        let file_path = self.file_path(path)?;

        match fs::remove_file(&file_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}
