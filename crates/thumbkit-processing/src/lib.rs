//! Thumbkit Processing Library
//!
//! Thumbnail generation for stored files: an image codec that cover-crops to
//! the target size, a bounded external process adapter, content-specific
//! generation strategies, the ordered strategy registry and the
//! `ThumbnailService` that ties them to storage and metadata.

pub mod codec;
pub mod process;
pub mod registry;
pub mod service;
pub mod strategy;

// Re-export commonly used types
pub use codec::{cover_crop_geometry, CropGeometry, Thumb};
pub use process::{run_fallback_chain, ExternalCommand, ProcessRunner, TokioProcessRunner};
pub use registry::StrategyRegistry;
pub use service::{ThumbArtifact, ThumbLookup, ThumbnailService};
pub use strategy::{GenerateRequest, SourceData, ThumbStrategy};
