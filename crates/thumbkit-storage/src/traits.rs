//! Storage abstraction trait
//!
//! This module defines the Storage trait that every backend holding originals
//! and thumbnails must implement.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked object content, as returned by [`Storage::get_stream`]
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage abstraction trait
///
/// Keys are relative, `/`-separated paths.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read an object by key
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Read an object as a stream of chunks
    ///
    /// Use this for sources that only need to be copied elsewhere (a temp
    /// file for an external tool) so large objects never sit in memory whole.
    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Write an object, replacing any previous content.
    ///
    /// Implementations must never leave a truncated object at `key`: either the
    /// full content is visible afterwards or the key is left as it was.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete objects. Missing keys are not an error.
    async fn delete(&self, keys: &[String]) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;
}
