// Screenshot functionality
//
// Saves a framebuffer snapshot as an RGB8 PNG file.

use crate::display::Framebuffer;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during screenshot operations
#[derive(Debug, Error)]
pub enum ScreenshotError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// PNG encoding error
    #[error("PNG encoding error: {0}")]
    PngEncoding(#[from] png::EncodingError),

    /// The picture has no pixels
    #[error("cannot save an empty picture")]
    Empty,
}

/// Save a screenshot of the current picture
///
/// # Arguments
///
/// * `frame` - Snapshot to save
/// * `directory` - Target directory, created if missing
/// * `include_timestamp` - Append the local time to the file name
///
/// # Returns
///
/// Result containing the path to the saved screenshot or an error
pub fn save_screenshot(
    frame: &Framebuffer,
    directory: &Path,
    include_timestamp: bool,
) -> Result<PathBuf, ScreenshotError> {
    fs::create_dir_all(directory)?;
    let file_path = directory.join(screenshot_file_name(include_timestamp));
    save_png(&file_path, frame)?;
    Ok(file_path)
}

/// File name for a new screenshot
fn screenshot_file_name(include_timestamp: bool) -> String {
    if include_timestamp {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        format!("vga_{}.png", timestamp)
    } else {
        "vga.png".to_string()
    }
}

/// Write a framebuffer as a PNG file
///
/// # Arguments
///
/// * `path` - Path to save the PNG file
/// * `frame` - Picture to encode
pub fn save_png(path: &Path, frame: &Framebuffer) -> Result<(), ScreenshotError> {
    if frame.is_empty() {
        return Err(ScreenshotError::Empty);
    }

    let file = fs::File::create(path)?;
    let w = io::BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, frame.width() as u32, frame.height() as u32);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(frame.as_slice())?;

    Ok(())
}
