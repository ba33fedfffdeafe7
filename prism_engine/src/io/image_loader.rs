/// Image decoding interface
///
/// Decoding (PNG, JPEG, ...) is left to the application; the texture cache
/// only needs RGBA8 pixels.

use std::path::Path;
use crate::error::Result;

/// Decoded RGBA8 image, rows top to bottom
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Single-color image (placeholder textures)
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            width,
            height,
            pixels: rgba.repeat(width as usize * height as usize),
        }
    }
}

/// Decodes image files into RGBA8
pub trait ImageLoader {
    /// A missing or undecodable file is `Error::InvalidResource`
    fn load_rgba8(&self, path: &Path) -> Result<DecodedImage>;
}
