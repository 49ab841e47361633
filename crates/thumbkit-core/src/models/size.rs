use serde::{Deserialize, Serialize};

use crate::error::{ThumbError, ThumbResult};

/// Output dimensions of a thumbnail, in pixels. Both sides are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> ThumbResult<Self> {
        if width == 0 || height == 0 {
            return Err(ThumbError::Config(format!(
                "Thumbnail size must be positive, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn square(side: u32) -> ThumbResult<Self> {
        Self::new(side, side)
    }
}
