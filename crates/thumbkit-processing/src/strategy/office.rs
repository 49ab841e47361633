//! Office document conversion through a local LibreOffice install

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use thumbkit_core::{ThumbError, ThumbResult};

use super::{GenerateRequest, ThumbStrategy, OFFICE_EXTENSIONS};
use crate::codec::{extension_of, Thumb};
use crate::process::{ExternalCommand, ProcessRunner};

/// Converts the first page of an office document to PNG with `soffice --headless`.
///
/// Every run gets its own scratch directory, including a private LibreOffice
/// profile so concurrent conversions do not fight over the profile lock.
pub struct OfficeLocalStrategy {
    runner: Arc<dyn ProcessRunner>,
    soffice_path: String,
}

impl OfficeLocalStrategy {
    pub fn new(runner: Arc<dyn ProcessRunner>, soffice_path: impl Into<String>) -> Self {
        Self {
            runner,
            soffice_path: soffice_path.into(),
        }
    }

    fn command(&self, scratch: &Path, input: &Path, out_dir: &Path) -> ExternalCommand {
        ExternalCommand::new(&self.soffice_path, "soffice")
            .arg(format!(
                "-env:UserInstallation=file://{}",
                scratch.join("profile").display()
            ))
            .args(["--headless", "--convert-to", "png", "--outdir"])
            .arg(out_dir.to_string_lossy())
            .arg(input.to_string_lossy())
            .allow_empty_stdout()
    }
}

#[async_trait]
impl ThumbStrategy for OfficeLocalStrategy {
    fn name(&self) -> &'static str {
        "office-local"
    }

    fn extensions(&self) -> &[&'static str] {
        OFFICE_EXTENSIONS
    }

    async fn generate(&self, request: GenerateRequest) -> ThumbResult<Thumb> {
        // Removed on drop, whatever happens below.
        let scratch: TempDir = tempfile::Builder::new()
            .prefix("thumbkit-office-")
            .tempdir()?;

        let ext = extension_of(&request.filename).unwrap_or_default();
        let input = scratch.path().join(format!("source{}", ext));
        let out_dir = scratch.path().join("out");
        let mut file = tokio::fs::File::create(&input).await?;
        request.source.copy_to(&mut file).await?;
        drop(file);
        tokio::fs::create_dir_all(&out_dir).await?;

        self.runner
            .run(&self.command(scratch.path(), &input, &out_dir), &request.cancel)
            .await?;

        let mut entries = tokio::fs::read_dir(&out_dir).await?;
        let converted = entries.next_entry().await?.ok_or_else(|| {
            ThumbError::Process(format!(
                "soffice produced no output for {}",
                request.filename
            ))
        })?;

        let data = tokio::fs::read(converted.path()).await?;
        Thumb::decode(&data, &converted.file_name().to_string_lossy())
    }
}
