//! Source content handed to strategies

use bytes::Bytes;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use thumbkit_core::{ThumbError, ThumbResult};
use thumbkit_storage::Storage;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Where a strategy reads the file it renders.
///
/// Stored sources are fetched lazily: strategies that only need a URL never
/// touch storage, and strategies that feed an external tool through a file
/// stream the object instead of buffering it.
#[derive(Clone)]
pub enum SourceData {
    Memory(Bytes),
    Stored {
        storage: Arc<dyn Storage>,
        key: String,
    },
}

impl SourceData {
    pub fn stored(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self::Stored {
            storage,
            key: key.into(),
        }
    }

    /// Whole content, for in-process decoding and stdin pipes
    pub async fn read_all(&self) -> ThumbResult<Bytes> {
        match self {
            Self::Memory(data) => Ok(data.clone()),
            Self::Stored { storage, key } => storage
                .get(key)
                .await
                .map_err(|e| ThumbError::SourceRead(format!("{}: {}", key, e))),
        }
    }

    /// Copy the content into `writer` chunk by chunk and return the byte count
    pub async fn copy_to<W>(&self, writer: &mut W) -> ThumbResult<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let written = match self {
            Self::Memory(data) => {
                writer.write_all(data).await?;
                data.len() as u64
            }
            Self::Stored { storage, key } => {
                let mut stream = storage
                    .get_stream(key)
                    .await
                    .map_err(|e| ThumbError::SourceRead(format!("{}: {}", key, e)))?;

                let mut written = 0u64;
                while let Some(chunk) = stream.next().await {
                    let chunk =
                        chunk.map_err(|e| ThumbError::SourceRead(format!("{}: {}", key, e)))?;
                    writer.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
                written
            }
        };

        writer.flush().await?;
        Ok(written)
    }
}

impl From<Bytes> for SourceData {
    fn from(data: Bytes) -> Self {
        Self::Memory(data)
    }
}

impl From<Vec<u8>> for SourceData {
    fn from(data: Vec<u8>) -> Self {
        Self::Memory(Bytes::from(data))
    }
}

impl fmt::Debug for SourceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(data) => f.debug_tuple("Memory").field(&data.len()).finish(),
            Self::Stored { key, .. } => f.debug_struct("Stored").field("key", key).finish(),
        }
    }
}
