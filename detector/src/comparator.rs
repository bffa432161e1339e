use tracing::{debug, trace};

use crate::overlay;
use crate::region::Region;
use crate::{PixelBuffer, GREEN_CHANNEL};

/// Immutable settings for a [`MotionComparator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorConfig {
    pub width: u32,
    pub height: u32,
    /// Largest green-channel difference still treated as "unchanged".
    pub threshold: u8,
    /// Motion is declared when the changed-pixel count is strictly greater.
    pub sensitivity: u64,
    /// Scan areas. Empty means the whole frame.
    pub regions: Vec<Region>,
    /// Produce a debug overlay with every comparison.
    pub diagnostics: bool,
}

impl DetectorConfig {
    pub fn new(width: u32, height: u32, threshold: u8, sensitivity: u64) -> Self {
        Self {
            width,
            height,
            threshold,
            sensitivity,
            regions: Vec::new(),
            diagnostics: false,
        }
    }

    pub fn with_regions(mut self, regions: Vec<Region>) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// Outcome of one comparison.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub changed: bool,
    /// Changed pixels summed over every region scan. A pixel inside `n`
    /// overlapping regions contributes `n`.
    pub changed_pixels: u64,
    pub debug_overlay: Option<PixelBuffer>,
}

impl Verdict {
    fn baseline() -> Self {
        Self {
            changed: false,
            changed_pixels: 0,
            debug_overlay: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error(
        "frame is {width}x{height}, comparator expects {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },
}

/// Decides whether successive frames differ enough inside the configured
/// regions to count as motion.
///
/// The comparator keeps the previous frame between calls. The first frame
/// after construction or [`reset`](Self::reset) only becomes the baseline and
/// never reports motion.
pub struct MotionComparator {
    config: DetectorConfig,
    previous: Option<PixelBuffer>,
}

impl MotionComparator {
    /// Validates the configuration. An empty region list is replaced with a
    /// single region covering the whole frame.
    pub fn new(mut config: DetectorConfig) -> Result<Self, DetectorError> {
        if config.width == 0 || config.height == 0 {
            return Err(DetectorError::InvalidConfiguration(format!(
                "frame dimensions must be positive, got {}x{}",
                config.width, config.height
            )));
        }

        if config.regions.is_empty() {
            config.regions = vec![Region::whole_frame(config.width, config.height)];
        }

        for (index, region) in config.regions.iter().enumerate() {
            region
                .check(config.width, config.height)
                .map_err(|e| DetectorError::InvalidConfiguration(format!("region {index}: {e}")))?;
        }

        debug!(
            width = config.width,
            height = config.height,
            threshold = config.threshold,
            sensitivity = config.sensitivity,
            regions = config.regions.len(),
            scanned_pixels = scanned_pixels(&config.regions),
            diagnostics = config.diagnostics,
            "motion comparator configured"
        );

        Ok(Self {
            config,
            previous: None,
        })
    }

    /// Pixel comparisons made per frame. Pixels shared by overlapping regions
    /// are counted once per region, so this is also the largest possible
    /// changed-pixel count.
    pub fn scanned_pixels(&self) -> u64 {
        scanned_pixels(&self.config.regions)
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Whether a previous frame is held for the next comparison.
    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }

    /// Drops the stored frame. The next call to [`compare`](Self::compare)
    /// becomes the new baseline.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Compares `frame` against the previous one and stores it for the next
    /// call.
    ///
    /// A frame with the wrong dimensions is rejected and the stored baseline
    /// is kept.
    pub fn compare(&mut self, frame: PixelBuffer) -> Result<Verdict, DetectorError> {
        let (width, height) = frame.dimensions();
        if (width, height) != (self.config.width, self.config.height) {
            return Err(DetectorError::DimensionMismatch {
                expected_width: self.config.width,
                expected_height: self.config.height,
                width,
                height,
            });
        }

        let Some(previous) = self.previous.take() else {
            debug!("first frame, storing as baseline");
            self.previous = Some(frame);
            return Ok(Verdict::baseline());
        };

        let mut debug_overlay = self.config.diagnostics.then(|| frame.clone());
        let changed_pixels = self.scan(&previous, &frame, debug_overlay.as_mut());
        let changed = changed_pixels > self.config.sensitivity;

        if let Some(overlay) = debug_overlay.as_mut() {
            overlay::draw_regions(overlay, &self.config.regions, changed);
        }

        debug!(
            changed_pixels,
            sensitivity = self.config.sensitivity,
            changed,
            "frame comparison"
        );

        self.previous = Some(frame);

        Ok(Verdict {
            changed,
            changed_pixels,
            debug_overlay,
        })
    }

    /// Counts pixels whose green difference exceeds the threshold, region by
    /// region. Changed pixels are painted onto `overlay` when given.
    fn scan(
        &self,
        previous: &PixelBuffer,
        current: &PixelBuffer,
        mut overlay: Option<&mut PixelBuffer>,
    ) -> u64 {
        let threshold = self.config.threshold;
        let mut total = 0u64;

        for region in &self.config.regions {
            let mut in_region = 0u64;
            for y in region.rows() {
                for x in region.columns() {
                    let before = previous.get_pixel(x, y).0[GREEN_CHANNEL];
                    let after = current.get_pixel(x, y).0[GREEN_CHANNEL];
                    if before.abs_diff(after) > threshold {
                        in_region += 1;
                        if let Some(overlay) = overlay.as_deref_mut() {
                            overlay::mark_changed(overlay, x, y);
                        }
                    }
                }
            }
            trace!(%region, changed_pixels = in_region, "region scanned");
            total += in_region;
        }

        total
    }
}

fn scanned_pixels(regions: &[Region]) -> u64 {
    regions.iter().map(Region::area).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{ALERT_MARKER, CHANGED_MARKER, REGION_MARKER};
    use image::Rgb;

    fn uniform(width: u32, height: u32, green: u8) -> PixelBuffer {
        PixelBuffer::from_pixel(width, height, Rgb([50, green, 50]))
    }

    /// 4x4 frame with green=100 everywhere except two pixels at green=200.
    fn frame_b() -> PixelBuffer {
        let mut img = uniform(4, 4, 100);
        img.put_pixel(1, 1, Rgb([50, 200, 50]));
        img.put_pixel(2, 2, Rgb([50, 200, 50]));
        img
    }

    fn comparator(config: DetectorConfig) -> MotionComparator {
        MotionComparator::new(config).unwrap()
    }

    #[test]
    fn first_frame_never_reports_motion() {
        let mut cmp = comparator(DetectorConfig::new(4, 4, 0, 0).with_diagnostics(true));
        assert!(!cmp.has_baseline());

        let verdict = cmp.compare(frame_b()).unwrap();
        assert!(!verdict.changed);
        assert_eq!(verdict.changed_pixels, 0);
        assert!(verdict.debug_overlay.is_none());
        assert!(cmp.has_baseline());
    }

    #[test]
    fn count_equal_to_sensitivity_is_not_motion() {
        let mut cmp = comparator(DetectorConfig::new(4, 4, 30, 2));

        let v = cmp.compare(uniform(4, 4, 100)).unwrap();
        assert_eq!((v.changed, v.changed_pixels), (false, 0));

        let v = cmp.compare(frame_b()).unwrap();
        assert_eq!((v.changed, v.changed_pixels), (false, 2));

        // Reverting to frame A is a change too.
        let v = cmp.compare(uniform(4, 4, 100)).unwrap();
        assert_eq!((v.changed, v.changed_pixels), (false, 2));
    }

    #[test]
    fn count_above_sensitivity_is_motion() {
        let mut cmp = comparator(DetectorConfig::new(4, 4, 30, 1));
        cmp.compare(uniform(4, 4, 100)).unwrap();

        let v = cmp.compare(frame_b()).unwrap();
        assert!(v.changed);
        assert_eq!(v.changed_pixels, 2);
    }

    #[test]
    fn identical_frames_have_no_changed_pixels() {
        let regions = vec![Region::new([1, 2], [1, 4]), Region::new([2, 4], [3, 4])];
        let mut cmp = comparator(DetectorConfig::new(4, 4, 0, 0).with_regions(regions));
        cmp.compare(frame_b()).unwrap();

        let v = cmp.compare(frame_b()).unwrap();
        assert_eq!(v.changed_pixels, 0);
        assert!(!v.changed);
    }

    #[test]
    fn difference_equal_to_threshold_is_unchanged() {
        let mut cmp = comparator(DetectorConfig::new(2, 2, 30, 0));
        cmp.compare(uniform(2, 2, 100)).unwrap();
        assert_eq!(cmp.compare(uniform(2, 2, 130)).unwrap().changed_pixels, 0);
        assert_eq!(cmp.compare(uniform(2, 2, 161)).unwrap().changed_pixels, 4);
        // Decreasing values count the same as increasing ones.
        assert_eq!(cmp.compare(uniform(2, 2, 100)).unwrap().changed_pixels, 4);
    }

    #[test]
    fn only_green_channel_is_compared() {
        let mut cmp = comparator(DetectorConfig::new(2, 2, 10, 0));
        cmp.compare(PixelBuffer::from_pixel(2, 2, Rgb([0, 100, 0])))
            .unwrap();

        let v = cmp
            .compare(PixelBuffer::from_pixel(2, 2, Rgb([255, 100, 255])))
            .unwrap();
        assert_eq!(v.changed_pixels, 0);
    }

    #[test]
    fn overlapping_regions_count_shared_pixels_per_region() {
        // Both regions contain zero-based (1, 1); only region one contains (2, 2).
        let regions = vec![Region::new([1, 3], [1, 3]), Region::new([2, 2], [1, 4])];
        let mut cmp = comparator(DetectorConfig::new(4, 4, 30, 0).with_regions(regions));
        cmp.compare(uniform(4, 4, 100)).unwrap();

        let v = cmp.compare(frame_b()).unwrap();
        assert_eq!(v.changed_pixels, 3);
    }

    #[test]
    fn pixels_outside_regions_are_ignored() {
        let regions = vec![Region::new([4, 4], [1, 4])];
        let mut cmp = comparator(DetectorConfig::new(4, 4, 30, 0).with_regions(regions));
        cmp.compare(uniform(4, 4, 100)).unwrap();

        let v = cmp.compare(frame_b()).unwrap();
        assert_eq!(v.changed_pixels, 0);
    }

    #[test]
    fn raising_threshold_never_raises_count() {
        let mut previous_count = u64::MAX;
        for threshold in [0u8, 30, 99, 100, 150, 255] {
            let mut cmp = comparator(DetectorConfig::new(4, 4, threshold, 0));
            let mut a = uniform(4, 4, 100);
            a.put_pixel(0, 0, Rgb([0, 40, 0]));
            cmp.compare(a).unwrap();
            let count = cmp.compare(frame_b()).unwrap().changed_pixels;
            assert!(count <= previous_count, "threshold {threshold}");
            previous_count = count;
        }
        assert_eq!(previous_count, 0);
    }

    #[test]
    fn raising_sensitivity_only_clears_motion() {
        let verdicts: Vec<bool> = (0..5)
            .map(|sensitivity| {
                let mut cmp = comparator(DetectorConfig::new(4, 4, 30, sensitivity));
                cmp.compare(uniform(4, 4, 100)).unwrap();
                cmp.compare(frame_b()).unwrap().changed
            })
            .collect();
        assert_eq!(verdicts, vec![true, true, false, false, false]);
    }

    #[test]
    fn dimension_mismatch_keeps_baseline() {
        let mut cmp = comparator(DetectorConfig::new(4, 4, 30, 1));
        cmp.compare(uniform(4, 4, 100)).unwrap();

        let err = cmp.compare(uniform(4, 3, 100)).unwrap_err();
        assert!(matches!(
            err,
            DetectorError::DimensionMismatch {
                expected_width: 4,
                expected_height: 4,
                width: 4,
                height: 3,
            }
        ));

        // The rejected frame did not replace the baseline.
        let v = cmp.compare(frame_b()).unwrap();
        assert_eq!(v.changed_pixels, 2);
    }

    #[test]
    fn dimension_mismatch_on_first_frame() {
        let mut cmp = comparator(DetectorConfig::new(4, 4, 30, 1));
        assert!(cmp.compare(uniform(5, 4, 100)).is_err());
        assert!(!cmp.has_baseline());
    }

    #[test]
    fn reset_restores_first_frame_behaviour() {
        let mut cmp = comparator(DetectorConfig::new(4, 4, 30, 0));
        cmp.compare(uniform(4, 4, 100)).unwrap();
        cmp.reset();
        assert!(!cmp.has_baseline());

        let v = cmp.compare(frame_b()).unwrap();
        assert_eq!((v.changed, v.changed_pixels), (false, 0));
    }

    #[test]
    fn empty_region_list_defaults_to_whole_frame() {
        let cmp = comparator(DetectorConfig::new(320, 240, 30, 20));
        assert_eq!(cmp.config().regions, vec![Region::whole_frame(320, 240)]);
        assert_eq!(cmp.scanned_pixels(), 320 * 240);
    }

    #[test]
    fn scanned_pixels_bounds_the_changed_count() {
        // 9 + 4 pixels; column 2, rows 1 to 3 are scanned by both regions.
        let regions = vec![Region::new([1, 3], [1, 3]), Region::new([2, 2], [1, 4])];
        let mut cmp = comparator(DetectorConfig::new(4, 4, 0, 0).with_regions(regions));
        assert_eq!(cmp.scanned_pixels(), 13);

        cmp.compare(uniform(4, 4, 0)).unwrap();
        let v = cmp.compare(uniform(4, 4, 255)).unwrap();
        assert_eq!(v.changed_pixels, cmp.scanned_pixels());
    }

    #[test]
    fn rejects_zero_dimensions() {
        let err = MotionComparator::new(DetectorConfig::new(0, 240, 30, 20)).err();
        assert!(matches!(err, Some(DetectorError::InvalidConfiguration(_))));
    }

    #[test]
    fn rejects_invalid_regions() {
        let cases: [[[u32; 2]; 2]; 3] = [[[0, 4], [1, 4]], [[3, 2], [1, 4]], [[1, 5], [1, 4]]];
        for bounds in cases {
            let config = DetectorConfig::new(4, 4, 30, 0)
                .with_regions(vec![Region::new([1, 4], [1, 4]), Region::from(bounds)]);
            match MotionComparator::new(config) {
                Err(DetectorError::InvalidConfiguration(msg)) => {
                    assert!(msg.starts_with("region 1:"), "{msg}")
                }
                other => panic!("expected invalid configuration, got {:?}", other.err()),
            }
        }
    }

    #[test]
    fn overlay_marks_changes_and_alert_ring() {
        let regions = vec![Region::new([2, 5], [2, 5])];
        let config = DetectorConfig::new(8, 8, 30, 0)
            .with_regions(regions)
            .with_diagnostics(true);
        let mut cmp = comparator(config);
        cmp.compare(uniform(8, 8, 100)).unwrap();

        let mut moved = uniform(8, 8, 100);
        moved.put_pixel(2, 2, Rgb([50, 200, 50]));
        let v = cmp.compare(moved).unwrap();
        assert!(v.changed);

        let overlay = v.debug_overlay.unwrap();
        assert_eq!(*overlay.get_pixel(2, 2), CHANGED_MARKER);
        assert_eq!(*overlay.get_pixel(1, 1), REGION_MARKER);
        assert_eq!(*overlay.get_pixel(0, 3), ALERT_MARKER);
        assert_eq!(*overlay.get_pixel(5, 5), ALERT_MARKER);
        assert_eq!(*overlay.get_pixel(7, 7), Rgb([50, 100, 50]));
    }

    #[test]
    fn overlay_without_motion_has_no_alert_ring() {
        let regions = vec![Region::new([2, 5], [2, 5])];
        let config = DetectorConfig::new(8, 8, 30, 5)
            .with_regions(regions)
            .with_diagnostics(true);
        let mut cmp = comparator(config);
        cmp.compare(uniform(8, 8, 100)).unwrap();

        let v = cmp.compare(uniform(8, 8, 100)).unwrap();
        assert!(!v.changed);
        let overlay = v.debug_overlay.unwrap();
        assert_eq!(*overlay.get_pixel(1, 1), REGION_MARKER);
        assert!(overlay.pixels().all(|p| *p != ALERT_MARKER));
    }

    #[test]
    fn no_overlay_without_diagnostics() {
        let mut cmp = comparator(DetectorConfig::new(4, 4, 30, 0));
        cmp.compare(uniform(4, 4, 100)).unwrap();
        assert!(cmp.compare(frame_b()).unwrap().debug_overlay.is_none());
    }
}
