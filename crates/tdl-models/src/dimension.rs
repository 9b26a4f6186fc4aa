//! Video geometry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fallback width when probing finds no video stream header.
pub const DEFAULT_VIDEO_WIDTH: u32 = 1920;
/// Fallback height when probing finds no video stream header.
pub const DEFAULT_VIDEO_HEIGHT: u32 = 1080;

/// Pixel size of a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoDimension {
    pub width: u32,
    pub height: u32,
}

impl VideoDimension {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for VideoDimension {
    fn default() -> Self {
        Self {
            width: DEFAULT_VIDEO_WIDTH,
            height: DEFAULT_VIDEO_HEIGHT,
        }
    }
}

impl fmt::Display for VideoDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
