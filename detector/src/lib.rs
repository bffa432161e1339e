pub mod comparator;
pub mod overlay;
pub mod region;

pub use comparator::{DetectorConfig, DetectorError, MotionComparator, Verdict};
pub use region::Region;

/// Frame buffer consumed and produced by the comparator.
pub type PixelBuffer = image::RgbImage;

/// Channel compared between frames. Green carries the most detail on
/// Bayer-pattern sensors.
pub const GREEN_CHANNEL: usize = 1;
