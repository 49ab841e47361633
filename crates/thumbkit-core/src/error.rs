//! Error types module
//!
//! Every failure inside thumbnail generation is reported as a `ThumbError`.
//! Strategies, the image codec and the process adapter all return this type so
//! the orchestrator can decide, per kind, whether the outcome is "no thumbnail
//! available" or a failed cycle that needs cleanup.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected outcomes like unsupported file types
    Debug,
    /// Warning level - for failed generation cycles
    Warn,
    /// Error level - for unexpected failures of our own collaborators
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum ThumbError {
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Source read error: {0}")]
    SourceRead(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Remote fetch error: {0}")]
    RemoteFetch(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Generation cancelled")]
    Cancelled,
}

/// Result type for thumbnail operations
pub type ThumbResult<T> = Result<T, ThumbError>;

impl From<io::Error> for ThumbError {
    fn from(err: io::Error) -> Self {
        ThumbError::Io(err.to_string())
    }
}

impl ThumbError {
    /// Machine-readable error code (e.g., "PROCESS_ERROR")
    pub fn error_code(&self) -> &'static str {
        match self {
            ThumbError::UnsupportedType(_) => "UNSUPPORTED_TYPE",
            ThumbError::SourceRead(_) => "SOURCE_READ_ERROR",
            ThumbError::Process(_) => "PROCESS_ERROR",
            ThumbError::RemoteFetch(_) => "REMOTE_FETCH_ERROR",
            ThumbError::Decode(_) => "DECODE_ERROR",
            ThumbError::Io(_) => "IO_ERROR",
            ThumbError::Metadata(_) => "METADATA_ERROR",
            ThumbError::Config(_) => "CONFIG_ERROR",
            ThumbError::Cancelled => "CANCELLED",
        }
    }

    /// Whether the error only means that no thumbnail can exist for the file
    pub fn is_absent(&self) -> bool {
        matches!(self, ThumbError::UnsupportedType(_))
    }

    /// Log level for this error
    pub fn log_level(&self) -> LogLevel {
        match self {
            ThumbError::UnsupportedType(_) | ThumbError::Cancelled => LogLevel::Debug,
            ThumbError::SourceRead(_)
            | ThumbError::Process(_)
            | ThumbError::RemoteFetch(_)
            | ThumbError::Decode(_)
            | ThumbError::Io(_) => LogLevel::Warn,
            ThumbError::Metadata(_) | ThumbError::Config(_) => LogLevel::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_is_absent() {
        let err = ThumbError::UnsupportedType(".xyz".to_string());
        assert!(err.is_absent());
        assert_eq!(err.error_code(), "UNSUPPORTED_TYPE");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_generation_failures_are_not_absent() {
        for err in [
            ThumbError::SourceRead("gone".to_string()),
            ThumbError::Process("exit 1".to_string()),
            ThumbError::RemoteFetch("404".to_string()),
            ThumbError::Decode("bad header".to_string()),
            ThumbError::Io("disk full".to_string()),
        ] {
            assert!(!err.is_absent());
            assert_eq!(err.log_level(), LogLevel::Warn);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let err: ThumbError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, ThumbError::Io(_)));
        assert!(err.to_string().contains("boom"));
    }
}
