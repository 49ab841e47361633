//! Building blocks of the `thumbkit` binary: tracing setup and the in-process
//! collaborators used when thumbnails are generated for plain local files.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use thumbkit_core::{
    MetadataStore, PictureInfo, SourceFile, StoragePolicy, ThumbError, ThumbResult, UrlProvider,
};
use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "thumbkit=info".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        let console_fmt = tracing_subscriber::fmt::layer()
            .event_format(Format::default().compact().with_target(false).without_time())
            .with_writer(std::io::stderr);
        tracing_subscriber::registry()
            .with(filter)
            .with(console_fmt)
            .init();
    }
}

/// Metadata for local files that are not tracked in any database.
///
/// There are no dynamic settings, so the static thumbnail size always applies;
/// picture info is kept in memory.
pub struct LocalMetadata {
    thumb_dir: String,
    picture_info: Mutex<HashMap<u64, PictureInfo>>,
}

impl LocalMetadata {
    pub fn new(thumb_dir: impl Into<String>) -> Self {
        Self {
            thumb_dir: thumb_dir.into(),
            picture_info: Mutex::new(HashMap::new()),
        }
    }

    pub fn picture_info(&self, file_id: u64) -> Option<PictureInfo> {
        self.picture_info
            .lock()
            .ok()
            .and_then(|map| map.get(&file_id).copied())
    }
}

#[async_trait]
impl MetadataStore for LocalMetadata {
    async fn file_by_id(&self, _file_id: u64) -> ThumbResult<Option<SourceFile>> {
        Ok(None)
    }

    async fn update_picture_info(&self, file_id: u64, info: &PictureInfo) -> ThumbResult<()> {
        self.picture_info
            .lock()
            .map_err(|_| ThumbError::Metadata("picture info lock poisoned".to_string()))?
            .insert(file_id, *info);
        Ok(())
    }

    async fn clear_picture_info(&self, file_id: u64) -> ThumbResult<()> {
        self.picture_info
            .lock()
            .map_err(|_| ThumbError::Metadata("picture info lock poisoned".to_string()))?
            .remove(&file_id);
        Ok(())
    }

    async fn settings(&self, _keys: &[&str]) -> ThumbResult<HashMap<String, String>> {
        Ok(HashMap::new())
    }

    async fn policy_for_owner(&self, _owner_id: u64) -> ThumbResult<StoragePolicy> {
        Ok(StoragePolicy {
            id: 0,
            thumb_dir: self.thumb_dir.clone(),
        })
    }
}

/// Hands out a fixed, already public URL for the file being processed.
pub struct StaticUrlProvider {
    url: Option<String>,
}

impl StaticUrlProvider {
    pub fn new(url: Option<String>) -> Self {
        Self { url }
    }
}

#[async_trait]
impl UrlProvider for StaticUrlProvider {
    async fn download_url(&self, file_id: u64, _ttl_setting_key: &str) -> ThumbResult<String> {
        self.url.clone().ok_or_else(|| {
            ThumbError::Config(format!(
                "File {} needs a public URL for the remote viewer, pass --public-url",
                file_id
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thumbkit_core::hooks::{DOC_PREVIEW_TIMEOUT_KEY, THUMB_WIDTH_KEY};

    #[tokio::test]
    async fn test_local_metadata() {
        let metadata = LocalMetadata::new(".thumbs");

        assert!(metadata.settings(&[THUMB_WIDTH_KEY]).await.unwrap().is_empty());
        assert_eq!(metadata.policy_for_owner(5).await.unwrap().thumb_dir, ".thumbs");

        metadata
            .update_picture_info(3, &PictureInfo::new(800, 600))
            .await
            .unwrap();
        assert_eq!(metadata.picture_info(3), Some(PictureInfo::new(800, 600)));

        metadata.clear_picture_info(3).await.unwrap();
        assert_eq!(metadata.picture_info(3), None);
    }

    #[tokio::test]
    async fn test_static_url_provider() {
        let none = StaticUrlProvider::new(None);
        assert!(none.download_url(1, DOC_PREVIEW_TIMEOUT_KEY).await.is_err());

        let some = StaticUrlProvider::new(Some("https://cdn.test/a.docx".to_string()));
        assert_eq!(
            some.download_url(1, DOC_PREVIEW_TIMEOUT_KEY).await.unwrap(),
            "https://cdn.test/a.docx"
        );
    }
}
