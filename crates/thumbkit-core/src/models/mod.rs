//! Data models for thumbnail generation
//!
//! Each sub-module represents one piece of the file/thumbnail domain.

mod file;
mod picture;
mod policy;
mod size;

// Re-export all models for convenient imports
pub use file::SourceFile;
pub use picture::PictureInfo;
pub use policy::StoragePolicy;
pub use size::TargetSize;
