//! Thumbnail generation strategies
//!
//! A strategy turns the content of one stored file into a decoded [`Thumb`].
//! Each strategy claims a fixed set of lower-cased extensions; the registry
//! asks them in order and the first one that claims a file name handles it.

use async_trait::async_trait;
use thumbkit_core::ThumbResult;
use tokio_util::sync::CancellationToken;

use crate::codec::{extension_of, Thumb};

pub mod image;
#[cfg(feature = "document")]
pub mod office;
#[cfg(feature = "pdf")]
pub mod pdf;
#[cfg(feature = "remote-viewer")]
pub mod remote;
pub mod source;
#[cfg(feature = "video")]
pub mod video;

pub use self::image::ImageStrategy;
pub use source::SourceData;
#[cfg(feature = "document")]
pub use office::OfficeLocalStrategy;
#[cfg(feature = "pdf")]
pub use pdf::{PdfConvertStrategy, PdfRasterStrategy};
#[cfg(feature = "remote-viewer")]
pub use remote::{extract_thumbnail_url, RemoteViewerStrategy};
#[cfg(feature = "video")]
pub use video::VideoStrategy;

pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif"];

pub const PDF_EXTENSIONS: &[&str] = &[".pdf"];

pub const OFFICE_EXTENSIONS: &[&str] = &[".doc", ".docx", ".ppt", ".pptx", ".xls", ".xlsx"];

/// Containers and raw streams ffmpeg can demux.
///
/// Pure audio formats are listed too; ffmpeg extracts embedded cover art from
/// them when present.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    ".str", ".aa", ".aac", ".ac3", ".acm", ".adf", ".adp", ".dtk", ".ads", ".ss2", ".adx",
    ".aea", ".afc", ".aix", ".al", ".ape", ".apl", ".mac", ".aptx", ".aptxhd", ".aqt",
    ".ast", ".avi", ".avs", ".avr", ".avs2", ".bfstm", ".bcstm", ".bit", ".bmv", ".brstm",
    ".cdg", ".cdxl", ".xl", ".c2", ".302", ".daud", ".dav", ".dss", ".dts", ".dtshd",
    ".dv", ".dif", ".cdata", ".eac3", ".paf", ".fap", ".flm", ".flac", ".flv", ".fsb",
    ".g722", ".722", ".tco", ".rco", ".g723_1", ".g729", ".genh", ".gsm", ".h261", ".h26l",
    ".h264", ".264", ".avc", ".hevc", ".h265", ".265", ".idf", ".ifv", ".cgi", ".sf",
    ".ircam", ".ivr", ".kux", ".669", ".amf", ".ams", ".dbm", ".digi", ".dmf", ".dsm",
    ".dtm", ".far", ".gdm", ".ice", ".imf", ".it", ".j2b", ".m15", ".mdl", ".med",
    ".mmcmp", ".mms", ".mo3", ".mod", ".mptm", ".mt2", ".mtm", ".nst", ".okt", ".plm",
    ".ppm", ".psm", ".pt36", ".ptm", ".s3m", ".sfx", ".sfx2", ".st26", ".stk", ".stm",
    ".stp", ".ult", ".umx", ".wow", ".xm", ".xpk", ".lvf", ".m4v", ".mkv", ".mk3d", ".mka",
    ".mks", ".mjpg", ".mjpeg", ".mpo", ".j2k", ".mlp", ".mov", ".mp4", ".m4a", ".3gp",
    ".3g2", ".mj2", ".mp2", ".mp3", ".m2a", ".mpa", ".mpc", ".txt", ".mpl2", ".sub",
    ".msf", ".mtaf", ".ul", ".musx", ".mvi", ".mxg", ".v", ".nist", ".sph", ".nsp", ".nut",
    ".ogg", ".oma", ".omg", ".aa3", ".pjs", ".pvf", ".yuv", ".cif", ".qcif", ".rgb", ".rt",
    ".rsd", ".rso", ".sw", ".sb", ".smi", ".sami", ".sbc", ".msbc", ".sbg", ".scc",
    ".sdr2", ".sds", ".sdx", ".ser", ".shn", ".vb", ".son", ".sln", ".stl", ".sup",
    ".svag", ".tak", ".thd", ".tta", ".ans", ".art", ".asc", ".diz", ".nfo", ".vt", ".ty",
    ".ty+", ".uw", ".ub", ".v210", ".yuv10", ".vag", ".vc1", ".rcv", ".viv", ".idx",
    ".vpk", ".vqf", ".vql", ".vqe", ".vtt", ".wsd", ".xmv", ".xvag", ".yop", ".y4m",
];

/// Input of a single generation
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Content of the source file
    pub source: SourceData,
    /// Display name, used for extension dispatch
    pub filename: String,
    /// Temporary download link, present when the strategy needs one
    pub url: Option<String>,
    pub cancel: CancellationToken,
}

impl GenerateRequest {
    pub fn new(source: impl Into<SourceData>, filename: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            filename: filename.into(),
            url: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[async_trait]
pub trait ThumbStrategy: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Lower-cased, dot-prefixed extensions this strategy claims
    fn extensions(&self) -> &[&'static str];

    /// Whether `generate` needs a pre-signed URL instead of, or in addition
    /// to, the source content
    fn needs_url(&self) -> bool {
        false
    }

    fn can_handle(&self, filename: &str) -> bool {
        extension_of(filename)
            .map(|ext| self.extensions().contains(&ext.as_str()))
            .unwrap_or(false)
    }

    async fn generate(&self, request: GenerateRequest) -> ThumbResult<Thumb>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_extension_lists_are_normalized() {
        for list in [IMAGE_EXTENSIONS, PDF_EXTENSIONS, OFFICE_EXTENSIONS, VIDEO_EXTENSIONS] {
            let unique: HashSet<_> = list.iter().collect();
            assert_eq!(unique.len(), list.len());
            for ext in list {
                assert!(ext.starts_with('.'), "{}", ext);
                assert_eq!(*ext, ext.to_lowercase());
            }
        }
    }

    #[test]
    fn test_common_video_containers() {
        for ext in [".mp4", ".mkv", ".mov", ".avi", ".flv", ".m4v", ".mp3", ".ogg"] {
            assert!(VIDEO_EXTENSIONS.contains(&ext), "{}", ext);
        }
    }
}
