//! Thumbkit Storage Library
//!
//! This crate provides the storage abstraction used for source files, thumbnails
//! and avatars, plus a local filesystem implementation.
//!
//! # Storage key format
//!
//! - **Thumbnails**: `{thumb_dir}/{owner_id}_{file_name}{suffix}`
//! - **Avatars**: `{dir}/avatar_{owner_id}_{index}.png`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all callers stay consistent.

pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::MockStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
