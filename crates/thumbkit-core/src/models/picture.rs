use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Original pixel dimensions of a file's decoded raster.
///
/// Persisted as the plain string `"<width>,<height>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PictureInfo {
    pub width: u32,
    pub height: u32,
}

impl PictureInfo {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Display for PictureInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{},{}", self.width, self.height)
    }
}

impl FromStr for PictureInfo {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(',')
            .ok_or_else(|| anyhow::anyhow!("Invalid picture info: {}", s))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid picture width: {}", w))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid picture height: {}", h))?;
        Ok(PictureInfo { width, height })
    }
}
