use std::fmt;
use std::ops::Range;

/// A rectangular scan area inside a frame.
///
/// Bounds are 1-based and inclusive: the first pixel is `1` and the last is
/// the frame width (or height). This is the format region lists are written in
/// by hand, e.g. `[[1, 50], [1, 75]]` for the top-left 50x75 block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    #[error("bounds {0} are 1-based, 0 is not a valid coordinate")]
    ZeroBound(Region),
    #[error("bounds {0} are inverted (min > max)")]
    Inverted(Region),
    #[error("bounds {region} exceed the {width}x{height} frame")]
    OutOfFrame {
        region: Region,
        width: u32,
        height: u32,
    },
}

impl Region {
    pub fn new(x: [u32; 2], y: [u32; 2]) -> Self {
        Self {
            x_min: x[0],
            x_max: x[1],
            y_min: y[0],
            y_max: y[1],
        }
    }

    /// The single region used when none are configured.
    pub fn whole_frame(width: u32, height: u32) -> Self {
        Self::new([1, width], [1, height])
    }

    /// Checks `1 <= min <= max <= dimension` on both axes.
    pub fn check(&self, width: u32, height: u32) -> Result<(), RegionError> {
        if self.x_min == 0 || self.y_min == 0 {
            return Err(RegionError::ZeroBound(*self));
        }
        if self.x_min > self.x_max || self.y_min > self.y_max {
            return Err(RegionError::Inverted(*self));
        }
        if self.x_max > width || self.y_max > height {
            return Err(RegionError::OutOfFrame {
                region: *self,
                width,
                height,
            });
        }
        Ok(())
    }

    /// Zero-based column range covered by the region.
    pub fn columns(&self) -> Range<u32> {
        self.x_min - 1..self.x_max
    }

    /// Zero-based row range covered by the region.
    pub fn rows(&self) -> Range<u32> {
        self.y_min - 1..self.y_max
    }

    /// Number of pixels scanned for this region.
    pub fn area(&self) -> u64 {
        (self.x_max - self.x_min + 1) as u64 * (self.y_max - self.y_min + 1) as u64
    }
}

impl From<[[u32; 2]; 2]> for Region {
    fn from(bounds: [[u32; 2]; 2]) -> Self {
        Self::new(bounds[0], bounds[1])
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[[{}, {}], [{}, {}]]",
            self.x_min, self.x_max, self.y_min, self.y_max
        )
    }
}
