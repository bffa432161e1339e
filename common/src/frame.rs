use image::{ImageError, ImageReader, RgbImage};
use std::io::Cursor;

/// A decoded camera frame with capture metadata.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub image: RgbImage,
    pub captured_at_ms: i64,
    pub seq: u64,
}

impl CapturedFrame {
    /// Decode encoded image bytes (JPEG, PNG, ... guessed from content).
    pub fn decode(data: &[u8], captured_at_ms: i64, seq: u64) -> Result<Self, FrameError> {
        Ok(Self {
            image: decode_frame(data)?,
            captured_at_ms,
            seq,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Decode encoded image bytes into an 8-bit RGB buffer.
pub fn decode_frame(data: &[u8]) -> Result<RgbImage, FrameError> {
    if data.is_empty() {
        return Err(FrameError::Empty);
    }

    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| FrameError::Decode {
            len: data.len(),
            source: ImageError::IoError(e),
        })?
        .decode()
        .map_err(|source| FrameError::Decode {
            len: data.len(),
            source,
        })?;

    Ok(img.to_rgb8())
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame payload is empty")]
    Empty,
    #[error("failed to decode {len}-byte frame: {source}")]
    Decode {
        len: usize,
        #[source]
        source: ImageError,
    },
}
