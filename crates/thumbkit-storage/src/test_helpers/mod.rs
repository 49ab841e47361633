//! Test helpers for crates that depend on storage

pub mod mock_storage;

pub use mock_storage::MockStorage;
