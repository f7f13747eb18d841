use async_trait::async_trait;
use axum::body::Bytes;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use uuid::Uuid;

use crate::repository::StoreError;

/// StorageService
///
/// Where admin uploads end up. The production implementation writes into the directory
/// served under `/uploads`; tests use the in-memory mock.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Makes sure the upload target exists. Called once at startup.
    async fn ensure_ready(&self) -> Result<(), StoreError>;

    /// Stores `bytes` under a fresh name derived from `original_name` and returns that name.
    async fn save_upload(&self, original_name: &str, bytes: Bytes) -> Result<String, StoreError>;
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;

/// LocalDiskStorage
///
/// Stores uploads as plain files in one flat directory.
#[derive(Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl StorageService for LocalDiskStorage {
    async fn ensure_ready(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn save_upload(&self, original_name: &str, bytes: Bytes) -> Result<String, StoreError> {
        let name = upload_name(original_name);
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&name), &bytes).await?;
        tracing::info!(file = %name, size = bytes.len(), "stored upload");
        Ok(name)
    }
}

/// upload_name
///
/// `<uuid>.<ext>`, keeping only an ASCII-alphanumeric extension of the client's file name.
/// Client-supplied path components never reach the file system.
pub fn upload_name(original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(|ext| {
            ext.chars()
                .filter(char::is_ascii_alphanumeric)
                .take(10)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "bin".to_string());

    format!("{}.{}", Uuid::new_v4(), extension)
}

/// MockStorageService
///
/// Records uploads in memory. With `should_fail` every call returns an I/O error.
#[derive(Clone, Default)]
pub struct MockStorageService {
    pub should_fail: bool,
    pub saved: Arc<Mutex<Vec<(String, usize)>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Names and sizes of everything stored so far.
    pub fn saved(&self) -> Vec<(String, usize)> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn simulated_failure() -> StoreError {
        StoreError::Io(std::io::Error::other("Mock Storage Error: Simulation requested"))
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_ready(&self) -> Result<(), StoreError> {
        if self.should_fail {
            return Err(Self::simulated_failure());
        }
        Ok(())
    }

    async fn save_upload(&self, original_name: &str, bytes: Bytes) -> Result<String, StoreError> {
        if self.should_fail {
            return Err(Self::simulated_failure());
        }
        let name = upload_name(original_name);
        if let Ok(mut saved) = self.saved.lock() {
            saved.push((name.clone(), bytes.len()));
        }
        Ok(name)
    }
}
