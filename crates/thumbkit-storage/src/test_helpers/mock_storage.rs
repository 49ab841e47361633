//! Mock Storage implementation for testing

use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Chunk size used by [`MockStorage::get_stream`]
const STREAM_CHUNK: usize = 4;

/// Mock storage implementation that stores files in memory
///
/// Failures can be injected for reads and writes. A failing write stores a
/// truncated copy of the data before reporting the error, which mimics a
/// backend without atomic writes and lets callers verify their own cleanup.
#[derive(Clone, Default)]
pub struct MockStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_puts: Arc<AtomicBool>,
    fail_gets: Arc<AtomicBool>,
    puts: Arc<AtomicUsize>,
    gets: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a file in the mock storage
    pub fn set_file(&self, key: &str, data: impl Into<Vec<u8>>) {
        self.files.lock().unwrap().insert(key.to_string(), data.into());
    }

    /// Remove a file from the mock storage
    pub fn remove_file(&self, key: &str) {
        self.files.lock().unwrap().remove(key);
    }

    /// Check if a file exists in the mock storage
    pub fn has_file(&self, key: &str) -> bool {
        self.files.lock().unwrap().contains_key(key)
    }

    /// Get file data (for test assertions)
    pub fn get_file(&self, key: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(key).cloned()
    }

    /// All stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StorageError::ReadFailed(format!("injected read failure: {}", key)));
        }

        self.files
            .lock()
            .unwrap()
            .get(key)
            .map(|data| Bytes::from(data.clone()))
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream> {
        let data = self.get(key).await?;
        let chunks: Vec<StorageResult<Bytes>> = (0..data.len())
            .step_by(STREAM_CHUNK)
            .map(|start| Ok(data.slice(start..(start + STREAM_CHUNK).min(data.len()))))
            .collect();

        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            let truncated = data[..data.len() / 2].to_vec();
            self.files.lock().unwrap().insert(key.to_string(), truncated);
            return Err(StorageError::WriteFailed(format!("injected write failure: {}", key)));
        }

        self.files.lock().unwrap().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut files = self.files.lock().unwrap();
        for key in keys {
            files.remove(key);
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.has_file(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failing_put_leaves_truncated_object() {
        let storage = MockStorage::new();
        storage.fail_puts(true);

        let result = storage.put("a", Bytes::from_static(b"abcdef")).await;
        assert!(matches!(result, Err(StorageError::WriteFailed(_))));
        assert_eq!(storage.get_file("a"), Some(b"abc".to_vec()));
        assert_eq!(storage.put_count(), 1);
    }

    #[tokio::test]
    async fn test_stream_yields_small_chunks() {
        use futures::StreamExt;

        let storage = MockStorage::new();
        storage.set_file("k", b"0123456789".to_vec());

        let chunks: Vec<Bytes> = storage
            .get_stream("k")
            .await
            .unwrap()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), b"0123456789".to_vec());
        assert_eq!(storage.get_count(), 1);
    }

    #[tokio::test]
    async fn test_get_and_delete() {
        let storage = MockStorage::new();
        storage.set_file("k", b"v".to_vec());

        assert_eq!(&storage.get("k").await.unwrap()[..], b"v");
        storage.delete(&["k".to_string(), "missing".to_string()]).await.unwrap();
        assert!(matches!(storage.get("k").await, Err(StorageError::NotFound(_))));
    }
}
