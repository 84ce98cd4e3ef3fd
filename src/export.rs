use std::path::Path;

use egui::ColorImage;
use image::{ImageFormat, RgbaImage};

use crate::error::{EditorError, Result};

pub const EXPORT_FILE_NAME: &str = "schema.png";

/// Writes a captured frame region as PNG.
pub fn save_png(capture: &ColorImage, path: &Path) -> Result<()> {
    let [width, height] = capture.size;
    if width == 0 || height == 0 {
        return Err(EditorError::Export("captured image is empty".to_string()));
    }
    let image = RgbaImage::from_raw(width as u32, height as u32, capture.as_raw().to_vec())
        .ok_or_else(|| EditorError::Export("captured image has an unexpected size".to_string()))?;
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|err| EditorError::Export(err.to_string()))?;
    tracing::info!(path = %path.display(), width, height, "exported schema image");
    Ok(())
}
