//! Window icon loading
//!
//! Decodes the configured ICO or PNG file into straight RGBA8 pixels that the GUI
//! wraps in a pixel buffer.

use crate::error::{RelayPanelError, Result};
use image::ImageReader;
use std::path::Path;

/// Decoded icon
#[derive(Debug, Clone)]
pub struct IconPixels {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major RGBA8 data, `width * height * 4` bytes
    pub rgba: Vec<u8>,
}

/// Load and decode the icon at `path`
///
/// For multi-size ICO files the decoder picks the largest entry.
pub fn load_window_icon(path: &Path) -> Result<IconPixels> {
    let to_error = |source| RelayPanelError::IconLoadFailed {
        path: path.to_path_buf(),
        source,
    };

    let img = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(to_error)?;

    let rgba_img = img.to_rgba8();
    let (width, height) = rgba_img.dimensions();
    Ok(IconPixels {
        width,
        height,
        rgba: rgba_img.into_raw(),
    })
}
