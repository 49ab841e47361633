//! Office previews rendered by an online document viewer

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;
use reqwest::{Client, Url};
use std::time::Duration;
use thumbkit_core::{ThumbError, ThumbResult};
use tokio_util::sync::CancellationToken;

use super::{GenerateRequest, ThumbStrategy, OFFICE_EXTENSIONS, PDF_EXTENSIONS};
use crate::codec::Thumb;

/// Pull the preview image URL out of a viewer page.
///
/// Uses the first capture group of `pattern` and undoes the `&amp;` escaping
/// of HTML attributes.
pub fn extract_thumbnail_url(pattern: &Regex, html: &str) -> Option<String> {
    pattern
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
        .filter(|url| !url.is_empty())
}

/// Asks a remote viewer to render the document behind a pre-signed URL and
/// downloads the preview it advertises.
pub struct RemoteViewerStrategy {
    client: Client,
    endpoint: Url,
    pattern: Regex,
    extensions: Vec<&'static str>,
}

impl RemoteViewerStrategy {
    pub fn new(
        endpoint: &str,
        pattern: &str,
        timeout: Duration,
        handles_pdf: bool,
    ) -> ThumbResult<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            ThumbError::Config(format!("Invalid viewer endpoint {}: {}", endpoint, e))
        })?;
        let pattern = Regex::new(pattern)
            .map_err(|e| ThumbError::Config(format!("Invalid viewer pattern: {}", e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ThumbError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let mut extensions = OFFICE_EXTENSIONS.to_vec();
        if handles_pdf {
            extensions.extend_from_slice(PDF_EXTENSIONS);
        }

        Ok(Self {
            client,
            endpoint,
            pattern,
            extensions,
        })
    }

    async fn fetch(&self, url: Url) -> ThumbResult<Bytes> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ThumbError::RemoteFetch(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(ThumbError::RemoteFetch(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| ThumbError::RemoteFetch(format!("reading {} failed: {}", url, e)))
    }

    async fn render(&self, source_url: &str) -> ThumbResult<Thumb> {
        let page_url = Url::parse_with_params(self.endpoint.as_str(), &[("src", source_url)])
            .map_err(|e| ThumbError::Config(format!("Invalid viewer endpoint: {}", e)))?;

        let page = self.fetch(page_url).await?;
        let html = String::from_utf8_lossy(&page);

        let raw = extract_thumbnail_url(&self.pattern, &html).ok_or_else(|| {
            ThumbError::RemoteFetch("viewer page does not advertise a preview".to_string())
        })?;
        let preview_url = self
            .endpoint
            .join(&raw)
            .map_err(|e| ThumbError::RemoteFetch(format!("Invalid preview URL {}: {}", raw, e)))?;

        tracing::debug!(preview_url = %preview_url, "Fetching remote preview");
        let image = self.fetch(preview_url).await?;

        Thumb::decode(&image, "preview.png")
    }
}

#[async_trait]
impl ThumbStrategy for RemoteViewerStrategy {
    fn name(&self) -> &'static str {
        "remote-viewer"
    }

    fn extensions(&self) -> &[&'static str] {
        &self.extensions
    }

    fn needs_url(&self) -> bool {
        true
    }

    async fn generate(&self, request: GenerateRequest) -> ThumbResult<Thumb> {
        let source_url = request.url.as_deref().ok_or_else(|| {
            ThumbError::Config(format!("No download URL for {}", request.filename))
        })?;

        race_cancel(&request.cancel, self.render(source_url)).await
    }
}

async fn race_cancel<T>(
    cancel: &CancellationToken,
    work: impl std::future::Future<Output = ThumbResult<T>>,
) -> ThumbResult<T> {
    tokio::select! {
        result = work => result,
        _ = cancel.cancelled() => Err(ThumbError::Cancelled),
    }
}
