//! Ordered strategy registry

use std::sync::Arc;
use thumbkit_core::{ThumbConfig, ThumbResult};

#[cfg(feature = "document")]
use thumbkit_core::DocumentBackend;
#[cfg(feature = "pdf")]
use thumbkit_core::PdfBackend;

use crate::process::ProcessRunner;
use crate::strategy::{ImageStrategy, ThumbStrategy};

/// Strategies in dispatch order. The first strategy that claims a file name
/// handles it; later strategies never see that extension.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn ThumbStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy; it is consulted after every strategy registered before it.
    pub fn register(mut self, strategy: Arc<dyn ThumbStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Build the registry for a deployment: image, video, PDF, then documents.
    pub fn from_config(
        config: &ThumbConfig,
        runner: Arc<dyn ProcessRunner>,
    ) -> ThumbResult<Self> {
        let mut registry = Self::new().register(Arc::new(ImageStrategy));

        #[cfg(feature = "video")]
        {
            registry = registry.register(Arc::new(crate::strategy::VideoStrategy::new(
                runner.clone(),
                &config.ffmpeg_path,
                config.video_seek_min_secs,
                config.video_seek_max_secs,
            )));
        }

        #[cfg(feature = "pdf")]
        {
            let pdf: Arc<dyn ThumbStrategy> = match config.pdf_backend {
                PdfBackend::Raster => Arc::new(crate::strategy::PdfRasterStrategy::new(
                    runner.clone(),
                    &config.pdftoppm_path,
                    config.pdf_dpi,
                )),
                PdfBackend::Convert => Arc::new(crate::strategy::PdfConvertStrategy::new(
                    runner.clone(),
                    &config.magick_path,
                )),
            };
            registry = registry.register(pdf);
        }

        #[cfg(feature = "document")]
        {
            match config.document_backend {
                DocumentBackend::Local => {
                    registry = registry.register(Arc::new(
                        crate::strategy::OfficeLocalStrategy::new(runner, &config.soffice_path),
                    ));
                }
                DocumentBackend::Remote => {
                    registry = registry.register(remote_viewer(config)?);
                }
                DocumentBackend::Disabled => {}
            }
        }

        tracing::debug!(
            strategies = ?registry.names(),
            "Thumbnail strategy registry built"
        );

        Ok(registry)
    }

    /// Strategy claiming `filename`, if any
    pub fn find(&self, filename: &str) -> Option<&Arc<dyn ThumbStrategy>> {
        self.strategies.iter().find(|s| s.can_handle(filename))
    }

    /// Every claimed extension, in registration order, without duplicates
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::new();
        for strategy in &self.strategies {
            for ext in strategy.extensions() {
                if !out.contains(ext) {
                    out.push(*ext);
                }
            }
        }
        out
    }

    pub fn strategies(&self) -> &[Arc<dyn ThumbStrategy>] {
        &self.strategies
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[cfg(all(feature = "document", feature = "remote-viewer"))]
fn remote_viewer(config: &ThumbConfig) -> ThumbResult<Arc<dyn ThumbStrategy>> {
    Ok(Arc::new(crate::strategy::RemoteViewerStrategy::new(
        &config.doc_viewer_endpoint,
        &config.doc_viewer_pattern,
        config.http_timeout,
        config.remote_viewer_handles_pdf,
    )?))
}

#[cfg(all(feature = "document", not(feature = "remote-viewer")))]
fn remote_viewer(_config: &ThumbConfig) -> ThumbResult<Arc<dyn ThumbStrategy>> {
    Err(thumbkit_core::ThumbError::Config(
        "document_backend=remote needs the remote-viewer feature".to_string(),
    ))
}
