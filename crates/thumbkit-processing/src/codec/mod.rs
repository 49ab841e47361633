//! Image codec: decode, cover-crop, encode and persist thumbnails.

pub mod geometry;
pub mod thumb;

pub use geometry::{cover_crop_geometry, CropGeometry};
pub use thumb::{extension_of, Thumb};
