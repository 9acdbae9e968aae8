use std::io::Cursor;

use image::imageops::FilterType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid width: {0}")]
    InvalidWidth(u32),
}

/// Produces a resized copy of an image.
///
/// Implementations must be deterministic: the same input and width always
/// yield the same bytes, which is what makes regenerating a variant safe.
pub trait Thumbnailer: Send + Sync {
    fn thumbnail(&self, original: &[u8], width: u32) -> Result<Vec<u8>, ThumbnailError>;
}

/// Width-constrained resize that keeps the aspect ratio and the source format.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageThumbnailer;

impl Thumbnailer for ImageThumbnailer {
    fn thumbnail(&self, original: &[u8], width: u32) -> Result<Vec<u8>, ThumbnailError> {
        if width == 0 {
            return Err(ThumbnailError::InvalidWidth(width));
        }

        let format = image::guess_format(original)?;
        let img = image::load_from_memory_with_format(original, format)?;

        let height = (u64::from(img.height()) * u64::from(width) / u64::from(img.width().max(1)))
            .clamp(1, u64::from(u32::MAX)) as u32;
        let resized = img.resize_exact(width, height, FilterType::Lanczos3);

        let mut out = Cursor::new(Vec::new());
        resized.write_to(&mut out, format)?;
        Ok(out.into_inner())
    }
}
