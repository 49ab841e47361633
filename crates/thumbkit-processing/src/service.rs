//! Thumbnail orchestration: dispatch, generate, normalize, persist, record.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thumbkit_core::hooks::{
    DOC_PREVIEW_TIMEOUT_KEY, PREVIEW_TIMEOUT_KEY, THUMB_HEIGHT_KEY, THUMB_WIDTH_KEY,
};
use thumbkit_core::{
    DeploymentMode, LogLevel, MetadataStore, PictureInfo, SourceFile, TargetSize, ThumbConfig,
    ThumbError, ThumbResult, UrlProvider,
};
use thumbkit_storage::keys::thumb_key;
use thumbkit_storage::Storage;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::registry::StrategyRegistry;
use crate::strategy::{GenerateRequest, SourceData, ThumbStrategy};

/// A thumbnail persisted at its deterministic path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbArtifact {
    pub path: String,
    /// Dimensions of the original, before the cover crop
    pub picture_info: PictureInfo,
}

/// Answer to a thumbnail read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbLookup {
    Ready {
        path: String,
        /// Cache lifetime for the response, master deployments only
        max_age: Option<Duration>,
    },
    Unavailable,
}

pub struct ThumbnailService {
    storage: Arc<dyn Storage>,
    metadata: Arc<dyn MetadataStore>,
    urls: Arc<dyn UrlProvider>,
    registry: Arc<StrategyRegistry>,
    config: ThumbConfig,
}

impl ThumbnailService {
    pub fn new(
        storage: Arc<dyn Storage>,
        metadata: Arc<dyn MetadataStore>,
        urls: Arc<dyn UrlProvider>,
        registry: Arc<StrategyRegistry>,
        config: ThumbConfig,
    ) -> Self {
        Self {
            storage,
            metadata,
            urls,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ThumbConfig {
        &self.config
    }

    /// Extensions this deployment can produce thumbnails for
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        self.registry.supported_extensions()
    }

    /// Deterministic artifact path: `{policy thumb dir}/{owner_id}_{name}{suffix}`
    pub async fn output_path(&self, file: &SourceFile) -> ThumbResult<String> {
        let policy = self.metadata.policy_for_owner(file.owner_id).await?;
        Ok(thumb_key(
            &policy.thumb_dir_for(file.owner_id),
            file.owner_id,
            &file.name,
            &self.config.file_suffix,
        ))
    }

    /// Thumbnail size for the next generation.
    ///
    /// Master deployments read the size from dynamic settings and fall back to
    /// the static maximum when a value is missing or unusable.
    pub async fn resolve_target_size(&self) -> TargetSize {
        let fallback = TargetSize {
            width: self.config.max_width.max(1),
            height: self.config.max_height.max(1),
        };

        if self.config.mode != DeploymentMode::Master {
            return fallback;
        }

        let settings = match self
            .metadata
            .settings(&[THUMB_WIDTH_KEY, THUMB_HEIGHT_KEY])
            .await
        {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read thumbnail size settings, using static size");
                return fallback;
            }
        };

        let parse = |key: &str| {
            settings
                .get(key)
                .and_then(|raw| raw.trim().parse::<u32>().ok())
        };

        match (parse(THUMB_WIDTH_KEY), parse(THUMB_HEIGHT_KEY)) {
            (Some(width), Some(height)) => TargetSize::new(width, height).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Invalid thumbnail size settings, using static size");
                fallback
            }),
            _ => {
                tracing::warn!(
                    width = ?settings.get(THUMB_WIDTH_KEY),
                    height = ?settings.get(THUMB_HEIGHT_KEY),
                    "Thumbnail size settings missing or not numeric, using static size"
                );
                fallback
            }
        }
    }

    /// Run one generation cycle for `file`.
    ///
    /// Returns `Ok(None)` without any I/O when no strategy claims the file.
    /// Once the artifact path is known, any failure removes whatever sits at
    /// that path before the error is returned.
    #[tracing::instrument(skip(self, file, cancel), fields(file_id = file.id, file_name = %file.name))]
    pub async fn generate_thumbnail(
        &self,
        file: &mut SourceFile,
        cancel: &CancellationToken,
    ) -> ThumbResult<Option<ThumbArtifact>> {
        let Some(strategy) = self.registry.find(&file.name).cloned() else {
            tracing::debug!("No thumbnail strategy for file");
            return Ok(None);
        };

        if cancel.is_cancelled() {
            return Err(ThumbError::Cancelled);
        }

        let start = Instant::now();
        let target = self.resolve_target_size().await;
        let path = self.output_path(file).await?;

        match self.run_cycle(file, &path, target, strategy.as_ref(), cancel).await {
            Ok(picture_info) => {
                tracing::info!(
                    strategy = strategy.name(),
                    path = %path,
                    picture_info = %picture_info,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Thumbnail generated"
                );
                Ok(Some(ThumbArtifact { path, picture_info }))
            }
            Err(e) => {
                self.remove_artifact(&path).await;
                Err(e)
            }
        }
    }

    async fn run_cycle(
        &self,
        file: &mut SourceFile,
        path: &str,
        target: TargetSize,
        strategy: &dyn ThumbStrategy,
        cancel: &CancellationToken,
    ) -> ThumbResult<PictureInfo> {
        let source = SourceData::stored(self.storage.clone(), file.source_name.clone());
        let mut request =
            GenerateRequest::new(source, file.name.clone()).with_cancel(cancel.clone());
        if strategy.needs_url() {
            let url = self
                .urls
                .download_url(file.id, DOC_PREVIEW_TIMEOUT_KEY)
                .await?;
            request = request.with_url(url);
        }

        let mut thumb = strategy.generate(request).await?;
        let (width, height) = thumb.size();
        let picture_info = PictureInfo::new(width, height);

        thumb = tokio::task::spawn_blocking(move || {
            thumb.cover_crop(target);
            thumb
        })
        .await
        .map_err(|e| ThumbError::Io(format!("resize task failed: {}", e)))?;

        thumb.save(self.storage.as_ref(), path).await?;

        if file.is_persisted() {
            self.metadata
                .update_picture_info(file.id, &picture_info)
                .await?;
        }
        file.picture_info = Some(picture_info.to_string());

        Ok(picture_info)
    }

    async fn remove_artifact(&self, path: &str) {
        if let Err(e) = self.storage.delete(&[path.to_string()]).await {
            tracing::warn!(path = %path, error = %e, "Failed to remove thumbnail artifact");
        }
    }

    /// Make sure `file` has a thumbnail, generating one when needed.
    ///
    /// Failures are logged and reported as absent; they never reach the caller.
    #[tracing::instrument(skip(self, file, cancel), fields(file_id = file.id, file_name = %file.name))]
    pub async fn ensure_thumbnail(
        &self,
        file: &mut SourceFile,
        force: bool,
        cancel: &CancellationToken,
    ) -> Option<ThumbArtifact> {
        if file.size == 0 {
            tracing::debug!("Empty file, skipping thumbnail");
            return None;
        }

        if !force {
            if let Some(artifact) = self.existing_artifact(file).await {
                return Some(artifact);
            }
        }

        match self.generate_thumbnail(file, cancel).await {
            Ok(artifact) => artifact,
            Err(e) => {
                log_failure(file, &e);
                if self.config.clear_picture_info_on_failure && !e.is_absent() {
                    self.clear_picture_info(file).await;
                }
                None
            }
        }
    }

    async fn existing_artifact(&self, file: &SourceFile) -> Option<ThumbArtifact> {
        let picture_info = file.picture()?;
        let path = self.output_path(file).await.ok()?;

        match self.storage.exists(&path).await {
            Ok(true) => Some(ThumbArtifact { path, picture_info }),
            Ok(false) => None,
            Err(e) => {
                tracing::debug!(path = %path, error = %e, "Could not check thumbnail artifact");
                None
            }
        }
    }

    async fn clear_picture_info(&self, file: &mut SourceFile) {
        if file.is_persisted() {
            if let Err(e) = self.metadata.clear_picture_info(file.id).await {
                tracing::warn!(file_id = file.id, error = %e, "Failed to clear picture info");
                return;
            }
        }
        file.picture_info = None;
    }

    /// Resolve the thumbnail of a stored file for a read request.
    ///
    /// A file whose record carries picture info but whose artifact is missing
    /// gets regenerated; that request still answers `Unavailable`.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn lookup_thumbnail(
        &self,
        file_id: u64,
        cancel: &CancellationToken,
    ) -> ThumbLookup {
        let mut file = match self.metadata.file_by_id(file_id).await {
            Ok(Some(file)) => file,
            Ok(None) => return ThumbLookup::Unavailable,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load file record");
                return ThumbLookup::Unavailable;
            }
        };

        if !file.has_picture_info() {
            return ThumbLookup::Unavailable;
        }

        let path = match self.output_path(&file).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to resolve thumbnail path");
                return ThumbLookup::Unavailable;
            }
        };

        match self.storage.exists(&path).await {
            Ok(true) => ThumbLookup::Ready {
                path,
                max_age: self.response_max_age().await,
            },
            _ => {
                tracing::info!(path = %path, "Thumbnail missing, regenerating");
                self.ensure_thumbnail(&mut file, true, cancel).await;
                ThumbLookup::Unavailable
            }
        }
    }

    async fn response_max_age(&self) -> Option<Duration> {
        if self.config.mode != DeploymentMode::Master {
            return None;
        }

        let secs = match self.metadata.settings(&[PREVIEW_TIMEOUT_KEY]).await {
            Ok(settings) => settings
                .get(PREVIEW_TIMEOUT_KEY)
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .unwrap_or(self.config.preview_max_age_secs),
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read preview timeout setting");
                self.config.preview_max_age_secs
            }
        };

        Some(Duration::from_secs(secs))
    }

    /// Generate in the background, typically right after an upload.
    pub fn spawn_generation(
        self: Arc<Self>,
        file: SourceFile,
    ) -> JoinHandle<Option<ThumbArtifact>> {
        tokio::spawn(async move {
            let mut file = file;
            self.ensure_thumbnail(&mut file, false, &CancellationToken::new())
                .await
        })
    }
}

fn log_failure(file: &SourceFile, error: &ThumbError) {
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(
            file_id = file.id,
            file_name = %file.name,
            error = %error,
            "No thumbnail generated"
        ),
        LogLevel::Warn => tracing::warn!(
            file_id = file.id,
            file_name = %file.name,
            error_code = error.error_code(),
            error = %error,
            "Thumbnail generation failed"
        ),
        LogLevel::Error => tracing::error!(
            file_id = file.id,
            file_name = %file.name,
            error_code = error.error_code(),
            error = %error,
            "Thumbnail generation failed"
        ),
    }
}
