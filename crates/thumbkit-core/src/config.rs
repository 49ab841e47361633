//! Configuration module
//!
//! Static thumbnail configuration loaded from the environment. Live-tunable
//! values (thumbnail size in master mode, preview cache lifetime) are read
//! through the `MetadataStore` at request time instead.

use std::env;
use std::time::Duration;

pub use crate::backends::{DeploymentMode, DocumentBackend, PdfBackend};

const MAX_WIDTH: u32 = 400;
const MAX_HEIGHT: u32 = 300;
const FILE_SUFFIX: &str = "._thumb";
const PROCESS_TIMEOUT_SECS: u64 = 30;
const HTTP_TIMEOUT_SECS: u64 = 15;
const VIDEO_SEEK_MIN_SECS: f64 = 1.0;
const VIDEO_SEEK_MAX_SECS: f64 = 5.0;
const PDF_DPI: u32 = 72;
const PREVIEW_MAX_AGE_SECS: u64 = 60;
const AVATAR_SIZES: [u32; 3] = [50, 130, 200];

pub const DOC_VIEWER_ENDPOINT: &str = "https://view.officeapps.live.com/op/view.aspx";
pub const DOC_VIEWER_PATTERN: &str = r#"<meta\s+property="og:image"\s+content="([^"]+)""#;

/// Thumbnail generation configuration
#[derive(Clone, Debug)]
pub struct ThumbConfig {
    pub mode: DeploymentMode,
    // Static output size (slave mode, and fallback for broken settings)
    pub max_width: u32,
    pub max_height: u32,
    /// Appended to `{owner}_{name}` to form the thumbnail file name
    pub file_suffix: String,
    pub process_timeout: Duration,
    pub http_timeout: Duration,
    // External binaries
    pub ffmpeg_path: String,
    pub pdftoppm_path: String,
    pub magick_path: String,
    pub soffice_path: String,
    // Strategy tuning
    pub video_seek_min_secs: f64,
    pub video_seek_max_secs: f64,
    pub pdf_dpi: u32,
    pub pdf_backend: PdfBackend,
    pub document_backend: DocumentBackend,
    pub doc_viewer_endpoint: String,
    pub doc_viewer_pattern: String,
    pub remote_viewer_handles_pdf: bool,
    /// Clear existing picture info when a regeneration fails
    pub clear_picture_info_on_failure: bool,
    /// Cache lifetime used when the `preview_timeout` setting is missing
    pub preview_max_age_secs: u64,
    pub avatar_sizes: [u32; 3],
}

impl Default for ThumbConfig {
    fn default() -> Self {
        Self {
            mode: DeploymentMode::Master,
            max_width: MAX_WIDTH,
            max_height: MAX_HEIGHT,
            file_suffix: FILE_SUFFIX.to_string(),
            process_timeout: Duration::from_secs(PROCESS_TIMEOUT_SECS),
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            ffmpeg_path: "ffmpeg".to_string(),
            pdftoppm_path: "pdftoppm".to_string(),
            magick_path: "magick".to_string(),
            soffice_path: "soffice".to_string(),
            video_seek_min_secs: VIDEO_SEEK_MIN_SECS,
            video_seek_max_secs: VIDEO_SEEK_MAX_SECS,
            pdf_dpi: PDF_DPI,
            pdf_backend: PdfBackend::Raster,
            document_backend: DocumentBackend::Local,
            doc_viewer_endpoint: DOC_VIEWER_ENDPOINT.to_string(),
            doc_viewer_pattern: DOC_VIEWER_PATTERN.to_string(),
            remote_viewer_handles_pdf: false,
            clear_picture_info_on_failure: false,
            preview_max_age_secs: PREVIEW_MAX_AGE_SECS,
            avatar_sizes: AVATAR_SIZES,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_bool_or(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().to_lowercase().parse::<bool>().ok())
        .unwrap_or(default)
}

fn parse_avatar_sizes(raw: &str) -> Result<[u32; 3], anyhow::Error> {
    let sizes: Vec<u32> = raw
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<u32>()
                .map_err(|_| anyhow::anyhow!("Invalid avatar size: {}", s))
        })
        .collect::<Result<_, _>>()?;

    match sizes.as_slice() {
        [s, m, l] => Ok([*s, *m, *l]),
        _ => Err(anyhow::anyhow!(
            "THUMB_AVATAR_SIZES must list exactly three sizes, got {}",
            sizes.len()
        )),
    }
}

impl ThumbConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = ThumbConfig::default();

        let mode = match env::var("THUMB_MODE") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.mode,
        };
        let pdf_backend = match env::var("THUMB_PDF_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.pdf_backend,
        };
        let document_backend = match env::var("THUMB_DOCUMENT_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.document_backend,
        };
        let avatar_sizes = match env::var("THUMB_AVATAR_SIZES") {
            Ok(raw) => parse_avatar_sizes(&raw)?,
            Err(_) => defaults.avatar_sizes,
        };

        let config = ThumbConfig {
            mode,
            max_width: parse_or("THUMB_MAX_WIDTH", defaults.max_width),
            max_height: parse_or("THUMB_MAX_HEIGHT", defaults.max_height),
            file_suffix: env::var("THUMB_FILE_SUFFIX").unwrap_or(defaults.file_suffix),
            process_timeout: Duration::from_secs(parse_or(
                "THUMB_PROCESS_TIMEOUT_SECS",
                PROCESS_TIMEOUT_SECS,
            )),
            http_timeout: Duration::from_secs(parse_or(
                "THUMB_HTTP_TIMEOUT_SECS",
                HTTP_TIMEOUT_SECS,
            )),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            pdftoppm_path: env::var("PDFTOPPM_PATH").unwrap_or(defaults.pdftoppm_path),
            magick_path: env::var("MAGICK_PATH").unwrap_or(defaults.magick_path),
            soffice_path: env::var("SOFFICE_PATH").unwrap_or(defaults.soffice_path),
            video_seek_min_secs: parse_or(
                "THUMB_VIDEO_SEEK_MIN_SECS",
                defaults.video_seek_min_secs,
            ),
            video_seek_max_secs: parse_or(
                "THUMB_VIDEO_SEEK_MAX_SECS",
                defaults.video_seek_max_secs,
            ),
            pdf_dpi: parse_or("THUMB_PDF_DPI", defaults.pdf_dpi),
            pdf_backend,
            document_backend,
            doc_viewer_endpoint: env::var("THUMB_DOC_VIEWER_ENDPOINT")
                .unwrap_or(defaults.doc_viewer_endpoint),
            doc_viewer_pattern: env::var("THUMB_DOC_VIEWER_PATTERN")
                .unwrap_or(defaults.doc_viewer_pattern),
            remote_viewer_handles_pdf: parse_bool_or(
                "THUMB_REMOTE_VIEWER_PDF",
                defaults.remote_viewer_handles_pdf,
            ),
            clear_picture_info_on_failure: parse_bool_or(
                "THUMB_CLEAR_INFO_ON_FAILURE",
                defaults.clear_picture_info_on_failure,
            ),
            preview_max_age_secs: parse_or(
                "THUMB_PREVIEW_MAX_AGE_SECS",
                defaults.preview_max_age_secs,
            ),
            avatar_sizes,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(anyhow::anyhow!(
                "THUMB_MAX_WIDTH and THUMB_MAX_HEIGHT must be greater than 0"
            ));
        }

        if self.process_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "THUMB_PROCESS_TIMEOUT_SECS must be greater than 0"
            ));
        }

        if !(self.video_seek_min_secs.is_finite()
            && self.video_seek_max_secs.is_finite()
            && self.video_seek_min_secs >= 0.0
            && self.video_seek_min_secs < self.video_seek_max_secs)
        {
            return Err(anyhow::anyhow!(
                "Video seek window must satisfy 0 <= min < max (got {}..{})",
                self.video_seek_min_secs,
                self.video_seek_max_secs
            ));
        }

        if self.avatar_sizes.contains(&0) {
            return Err(anyhow::anyhow!("Avatar sizes must be greater than 0"));
        }

        for (name, path) in [
            ("FFMPEG_PATH", &self.ffmpeg_path),
            ("PDFTOPPM_PATH", &self.pdftoppm_path),
            ("MAGICK_PATH", &self.magick_path),
            ("SOFFICE_PATH", &self.soffice_path),
        ] {
            let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
            if path.is_empty() || path.chars().any(|c| dangerous_chars.contains(&c)) {
                return Err(anyhow::anyhow!("{} is empty or contains dangerous characters", name));
            }
        }

        if self.document_backend == DocumentBackend::Remote {
            regex_is_plausible(&self.doc_viewer_pattern)?;
        }

        Ok(())
    }
}

// The regex itself is compiled by the remote viewer strategy; here we only make
// sure it has a capture group to read the thumbnail URL from.
fn regex_is_plausible(pattern: &str) -> Result<(), anyhow::Error> {
    if !pattern.contains('(') {
        return Err(anyhow::anyhow!(
            "THUMB_DOC_VIEWER_PATTERN must contain a capture group"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ThumbConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mode, DeploymentMode::Master);
        assert_eq!(config.file_suffix, "._thumb");
        assert!(!config.clear_picture_info_on_failure);
    }

    #[test]
    fn test_rejects_zero_size() {
        let config = ThumbConfig {
            max_width: 0,
            ..ThumbConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_seek_window() {
        let config = ThumbConfig {
            video_seek_min_secs: 5.0,
            video_seek_max_secs: 1.0,
            ..ThumbConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_seek_window() {
        for (min, max) in [(1.0, f64::INFINITY), (f64::NAN, 5.0), (1.0, f64::NAN)] {
            let config = ThumbConfig {
                video_seek_min_secs: min,
                video_seek_max_secs: max,
                ..ThumbConfig::default()
            };
            assert!(config.validate().is_err(), "{}..{}", min, max);
        }
    }

    #[test]
    fn test_rejects_shell_metacharacters_in_binary_path() {
        let config = ThumbConfig {
            ffmpeg_path: "ffmpeg; rm -rf /".to_string(),
            ..ThumbConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_remote_pattern_needs_capture_group() {
        let config = ThumbConfig {
            document_backend: DocumentBackend::Remote,
            doc_viewer_pattern: "thumbnail".to_string(),
            ..ThumbConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_avatar_sizes() {
        assert_eq!(parse_avatar_sizes("50, 130,200").unwrap(), [50, 130, 200]);
        assert!(parse_avatar_sizes("50,130").is_err());
        assert!(parse_avatar_sizes("a,b,c").is_err());
    }
}
