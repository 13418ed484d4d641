//! CLI command implementations

pub mod backends;
pub mod segment;

use anyhow::{Context, Result};
use seg_core::GrayImage;
use std::path::Path;

/// Load image from path as 8-bit grayscale
pub fn load_image(path: &Path) -> Result<GrayImage> {
    let gray = image::open(path)
        .with_context(|| format!("Failed to load: {}", path.display()))?
        .to_luma8();
    let (width, height) = gray.dimensions();
    GrayImage::new(width, height, gray.into_raw())
        .with_context(|| format!("Failed to load: {}", path.display()))
}

/// Save packed RGB8 pixels to path
pub fn save_rgb(path: &Path, width: u32, height: u32, rgb: Vec<u8>) -> Result<()> {
    let image = image::RgbImage::from_raw(width, height, rgb)
        .with_context(|| format!("RGB buffer does not match {}x{}", width, height))?;
    image
        .save(path)
        .with_context(|| format!("Failed to save: {}", path.display()))
}

/// Format a duration for display
pub fn format_duration(elapsed: std::time::Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs >= 1.0 {
        format!("{:.2} s", secs)
    } else {
        format!("{:.2} ms", secs * 1000.0)
    }
}
