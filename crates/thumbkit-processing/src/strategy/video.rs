//! Video frame extraction through ffmpeg

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use tempfile::NamedTempFile;
use thumbkit_core::{ThumbError, ThumbResult};

use super::{GenerateRequest, ThumbStrategy, VIDEO_EXTENSIONS};
use crate::codec::{extension_of, Thumb};
use crate::process::{run_fallback_chain, ExternalCommand, ProcessRunner};

/// Grabs one frame with ffmpeg.
///
/// The first attempt seeks to a random offset inside the configured window so
/// thumbnails skip black intro frames; short clips that end before the seek
/// point fall back to the very first frame.
pub struct VideoStrategy {
    runner: Arc<dyn ProcessRunner>,
    ffmpeg_path: String,
    seek_min_secs: f64,
    seek_max_secs: f64,
}

impl VideoStrategy {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        ffmpeg_path: impl Into<String>,
        seek_min_secs: f64,
        seek_max_secs: f64,
    ) -> Self {
        Self {
            runner,
            ffmpeg_path: ffmpeg_path.into(),
            seek_min_secs,
            seek_max_secs,
        }
    }

    fn seek_offset(&self) -> f64 {
        if self.seek_min_secs.is_finite()
            && self.seek_max_secs.is_finite()
            && self.seek_max_secs > self.seek_min_secs
        {
            rand::rng().random_range(self.seek_min_secs..self.seek_max_secs)
        } else {
            self.seek_min_secs
        }
    }

    fn commands(&self, input: &str) -> Vec<ExternalCommand> {
        let frame_args = ["-vframes", "1", "-f", "image2pipe", "-vcodec", "mjpeg", "-"];

        vec![
            ExternalCommand::new(&self.ffmpeg_path, "ffmpeg-seek")
                .args(["-ss".to_string(), format!("{:.3}", self.seek_offset())])
                .args(["-i", input])
                .args(frame_args),
            ExternalCommand::new(&self.ffmpeg_path, "ffmpeg-first-frame")
                .args(["-i", input])
                .args(frame_args),
        ]
    }
}

/// Stream the source into a temp file that keeps the original extension;
/// several demuxers only probe correctly with it.
async fn spill_to_temp_file(request: &GenerateRequest) -> ThumbResult<NamedTempFile> {
    let suffix = extension_of(&request.filename).unwrap_or_default();

    let temp = tokio::task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix("thumbkit-video-")
            .suffix(&suffix)
            .tempfile()
    })
    .await
    .map_err(|e| ThumbError::Io(format!("temp file task failed: {}", e)))??;

    let mut file = tokio::fs::File::from_std(temp.reopen()?);
    let written = request.source.copy_to(&mut file).await?;
    tracing::debug!(
        path = %temp.path().display(),
        size_bytes = written,
        "Source spilled to temp file"
    );

    Ok(temp)
}

#[async_trait]
impl ThumbStrategy for VideoStrategy {
    fn name(&self) -> &'static str {
        "video"
    }

    fn extensions(&self) -> &[&'static str] {
        VIDEO_EXTENSIONS
    }

    async fn generate(&self, request: GenerateRequest) -> ThumbResult<Thumb> {
        let input = spill_to_temp_file(&request).await?;
        let input_path = input.path().to_string_lossy().to_string();

        let frame = run_fallback_chain(
            self.runner.as_ref(),
            &self.commands(&input_path),
            &request.cancel,
        )
        .await?;

        // `input` stays alive until every attempt has finished.
        drop(input);

        Thumb::decode(&frame, "frame.jpg")
    }
}
