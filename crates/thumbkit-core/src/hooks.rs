//! Collaborator traits for the surrounding application
//!
//! Thumbnail generation does not own file records, settings or download links.
//! The host application implements these traits and injects them into the
//! thumbnail service.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::ThumbResult;
use crate::models::{PictureInfo, SourceFile, StoragePolicy};

/// Setting key holding the lifetime of download links handed to document viewers
pub const DOC_PREVIEW_TIMEOUT_KEY: &str = "doc_preview_timeout";
/// Setting key holding the cache lifetime of a served thumbnail, in seconds
pub const PREVIEW_TIMEOUT_KEY: &str = "preview_timeout";
pub const THUMB_WIDTH_KEY: &str = "thumb_width";
pub const THUMB_HEIGHT_KEY: &str = "thumb_height";

/// File records, per-file picture info and dynamic settings.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Look up a file record by id
    async fn file_by_id(&self, file_id: u64) -> ThumbResult<Option<SourceFile>>;

    /// Persist the original raster dimensions of a file
    async fn update_picture_info(&self, file_id: u64, info: &PictureInfo) -> ThumbResult<()>;

    /// Remove the picture info of a file
    async fn clear_picture_info(&self, file_id: u64) -> ThumbResult<()>;

    /// Read dynamic settings by name. Missing keys are simply absent from the map.
    async fn settings(&self, keys: &[&str]) -> ThumbResult<HashMap<String, String>>;

    /// Storage policy of the given owner
    async fn policy_for_owner(&self, owner_id: u64) -> ThumbResult<StoragePolicy>;
}

/// Issues temporary, externally fetchable links to a file's bytes.
#[async_trait]
pub trait UrlProvider: Send + Sync {
    /// Signed download URL whose lifetime is read from `ttl_setting_key`
    async fn download_url(&self, file_id: u64, ttl_setting_key: &str) -> ThumbResult<String>;
}

/// URL provider for deployments without any strategy that needs links
pub struct NoUrlProvider;

#[async_trait]
impl UrlProvider for NoUrlProvider {
    async fn download_url(&self, file_id: u64, _ttl_setting_key: &str) -> ThumbResult<String> {
        Err(crate::error::ThumbError::Config(format!(
            "No URL provider configured (file {})",
            file_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_url_provider_fails() {
        let result = NoUrlProvider.download_url(3, DOC_PREVIEW_TIMEOUT_KEY).await;
        assert!(result.is_err());
    }
}
