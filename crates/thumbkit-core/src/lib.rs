//! Thumbkit Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration and
//! collaborator traits shared by every thumbkit component.

pub mod backends;
pub mod config;
pub mod error;
pub mod hooks;
pub mod models;

// Re-export commonly used types
pub use backends::{DeploymentMode, DocumentBackend, PdfBackend};
pub use config::ThumbConfig;
pub use error::{LogLevel, ThumbError, ThumbResult};
pub use hooks::{MetadataStore, NoUrlProvider, UrlProvider};
pub use models::{PictureInfo, SourceFile, StoragePolicy, TargetSize};
