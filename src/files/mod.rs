//! Bucket/file store.
//!
//! Blobs live on the filesystem: one directory per bucket under a configured
//! root, one file per stored object. Bucket and file names are validated
//! before any path is built, so traversal outside the root is impossible by
//! construction. Errors use the same taxonomy as the document store.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::{Error, Result};

/// Maximum bucket or file name length in characters.
const MAX_SEGMENT_LEN: usize = 255;

/// Metadata for one stored file.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
}

/// Validates a single path segment (bucket or file name):
/// `[A-Za-z0-9._-]`, no leading dot, no separators.
fn validate_segment(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidName("name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_SEGMENT_LEN {
        return Err(Error::InvalidName(format!(
            "name cannot be longer than {} characters",
            MAX_SEGMENT_LEN
        )));
    }
    if name.starts_with('.') {
        return Err(Error::InvalidName(
            "name cannot start with a dot".to_string(),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return Err(Error::InvalidName(
            "name can only contain letters, numbers, '.', '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

/// Filesystem-backed blob store rooted at a fixed directory.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens the store, creating the root directory if needed.
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        info!(root = %root.display(), "File store opened");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf> {
        validate_segment(bucket)?;
        Ok(self.root.join(bucket))
    }

    fn file_path(&self, bucket: &str, file: &str) -> Result<PathBuf> {
        validate_segment(file)?;
        Ok(self.bucket_path(bucket)?.join(file))
    }

    /// Creates a bucket. Fails with `AlreadyExists` if present.
    #[instrument(skip(self))]
    pub async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let path = self.bucket_path(bucket)?;
        if fs::try_exists(&path).await? {
            return Err(Error::AlreadyExists(format!("bucket '{}'", bucket)));
        }
        fs::create_dir(&path).await?;
        info!(bucket = %bucket, "Bucket created");
        Ok(())
    }

    /// Lists bucket names in ascending order.
    pub async fn list_buckets(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Ok(name) = entry.file_name().into_string() {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Deletes a bucket and everything in it.
    #[instrument(skip(self))]
    pub async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let path = self.bucket_path(bucket)?;
        if !fs::try_exists(&path).await? {
            return Err(Error::NotFound(format!("bucket '{}'", bucket)));
        }
        fs::remove_dir_all(&path).await?;
        info!(bucket = %bucket, "Bucket deleted");
        Ok(())
    }

    /// Writes (or replaces) a file in an existing bucket. Returns the
    /// stored size in bytes.
    #[instrument(skip(self, bytes))]
    pub async fn put_file(&self, bucket: &str, file: &str, bytes: &[u8]) -> Result<u64> {
        let bucket_path = self.bucket_path(bucket)?;
        if !fs::try_exists(&bucket_path).await? {
            return Err(Error::NotFound(format!("bucket '{}'", bucket)));
        }
        validate_segment(file)?;
        fs::write(bucket_path.join(file), bytes).await?;
        Ok(bytes.len() as u64)
    }

    /// Reads a file's contents.
    pub async fn get_file(&self, bucket: &str, file: &str) -> Result<Vec<u8>> {
        let path = self.file_path(bucket, file)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("file '{}/{}'", bucket, file)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes a file.
    #[instrument(skip(self))]
    pub async fn delete_file(&self, bucket: &str, file: &str) -> Result<()> {
        let path = self.file_path(bucket, file)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("file '{}/{}'", bucket, file)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lists files in a bucket, ascending by name.
    pub async fn list_files(&self, bucket: &str) -> Result<Vec<FileInfo>> {
        let path = self.bucket_path(bucket)?;
        if !fs::try_exists(&path).await? {
            return Err(Error::NotFound(format!("bucket '{}'", bucket)));
        }

        let mut files = Vec::new();
        let mut entries = fs::read_dir(&path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Ok(name) = entry.file_name().into_string() {
                    let size = entry.metadata().await?.len();
                    files.push(FileInfo { name, size });
                }
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}
