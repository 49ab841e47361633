//! First-page rasterization of PDF documents

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thumbkit_core::ThumbResult;

use super::{GenerateRequest, ThumbStrategy, PDF_EXTENSIONS};
use crate::codec::Thumb;
use crate::process::{ExternalCommand, ProcessRunner};

/// Renders page one with poppler's `pdftoppm`, streaming the document over stdin.
pub struct PdfRasterStrategy {
    runner: Arc<dyn ProcessRunner>,
    pdftoppm_path: String,
    dpi: u32,
}

impl PdfRasterStrategy {
    pub fn new(runner: Arc<dyn ProcessRunner>, pdftoppm_path: impl Into<String>, dpi: u32) -> Self {
        Self {
            runner,
            pdftoppm_path: pdftoppm_path.into(),
            dpi,
        }
    }

    fn command(&self, document: Bytes) -> ExternalCommand {
        ExternalCommand::new(&self.pdftoppm_path, "pdftoppm")
            .args(["-f", "1", "-l", "1", "-singlefile", "-png", "-r"])
            .arg(self.dpi.to_string())
            .arg("-")
            .stdin(document)
    }
}

#[async_trait]
impl ThumbStrategy for PdfRasterStrategy {
    fn name(&self) -> &'static str {
        "pdf-raster"
    }

    fn extensions(&self) -> &[&'static str] {
        PDF_EXTENSIONS
    }

    async fn generate(&self, request: GenerateRequest) -> ThumbResult<Thumb> {
        let document = request.source.read_all().await?;
        let png = self.runner.run(&self.command(document), &request.cancel).await?;
        Thumb::decode(&png, "page.png")
    }
}

/// Size of the intermediate page preview rendered by ImageMagick
const CONVERT_PREVIEW: &str = "300x285";

/// Two-step ImageMagick pipeline: flatten page one to JPEG, then cut a
/// top-anchored preview out of it.
pub struct PdfConvertStrategy {
    runner: Arc<dyn ProcessRunner>,
    magick_path: String,
}

impl PdfConvertStrategy {
    pub fn new(runner: Arc<dyn ProcessRunner>, magick_path: impl Into<String>) -> Self {
        Self {
            runner,
            magick_path: magick_path.into(),
        }
    }

    fn render_command(&self, document: Bytes) -> ExternalCommand {
        ExternalCommand::new(&self.magick_path, "magick-render")
            .args([
                "-density",
                "150",
                "pdf:-[0]",
                "-background",
                "white",
                "-alpha",
                "remove",
                "jpeg:-",
            ])
            .stdin(document)
    }

    fn preview_command(&self, page: Bytes) -> ExternalCommand {
        ExternalCommand::new(&self.magick_path, "magick-preview")
            .args(["jpeg:-", "-gravity", "North", "-resize"])
            .arg(format!("{}^", CONVERT_PREVIEW))
            .args(["-extent", CONVERT_PREVIEW, "-quality", "100", "jpeg:-"])
            .stdin(page)
    }
}

#[async_trait]
impl ThumbStrategy for PdfConvertStrategy {
    fn name(&self) -> &'static str {
        "pdf-convert"
    }

    fn extensions(&self) -> &[&'static str] {
        PDF_EXTENSIONS
    }

    async fn generate(&self, request: GenerateRequest) -> ThumbResult<Thumb> {
        let document = request.source.read_all().await?;
        let page = self
            .runner
            .run(&self.render_command(document), &request.cancel)
            .await?;

        let preview = self
            .runner
            .run(&self.preview_command(page), &request.cancel)
            .await?;

        Thumb::decode(&preview, "page.jpg")
    }
}
