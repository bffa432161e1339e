//! Debug overlay painting.
//!
//! The overlay is a copy of the newest frame with the comparator's decision
//! drawn on top: changed pixels, the outline of every scanned region, and an
//! outer alert ring around each region when motion was declared.

use image::Rgb;

use crate::region::Region;
use crate::PixelBuffer;

/// Paint for pixels whose difference exceeded the threshold.
pub const CHANGED_MARKER: Rgb<u8> = Rgb([0, 255, 0]);
/// Paint for the one-pixel outline of each region.
pub const REGION_MARKER: Rgb<u8> = Rgb([0, 0, 255]);
/// Paint for the ring drawn just outside each region when motion is declared.
pub const ALERT_MARKER: Rgb<u8> = Rgb([255, 255, 255]);

/// Marks a single changed pixel. Coordinates are zero-based.
pub(crate) fn mark_changed(overlay: &mut PixelBuffer, x: u32, y: u32) {
    overlay.put_pixel(x, y, CHANGED_MARKER);
}

/// Draws the outline of every region, plus the alert ring when `changed`.
pub(crate) fn draw_regions(overlay: &mut PixelBuffer, regions: &[Region], changed: bool) {
    for region in regions {
        draw_border(overlay, region);
        if changed {
            draw_alert_ring(overlay, region);
        }
    }
}

/// Outline on the region's own edge pixels, clipped like the alert ring.
fn draw_border(overlay: &mut PixelBuffer, region: &Region) {
    let left = region.x_min as i64 - 1;
    let right = region.x_max as i64 - 1;
    let top = region.y_min as i64 - 1;
    let bottom = region.y_max as i64 - 1;

    for x in left..=right {
        put_clipped(overlay, x, top, REGION_MARKER);
        put_clipped(overlay, x, bottom, REGION_MARKER);
    }
    for y in top..=bottom {
        put_clipped(overlay, left, y, REGION_MARKER);
        put_clipped(overlay, right, y, REGION_MARKER);
    }
}

/// Ring one pixel outside the region outline, corners included. Pixels that
/// fall outside the frame are skipped.
fn draw_alert_ring(overlay: &mut PixelBuffer, region: &Region) {
    let left = region.x_min as i64 - 2;
    let right = region.x_max as i64;
    let top = region.y_min as i64 - 2;
    let bottom = region.y_max as i64;

    for x in left..=right {
        put_clipped(overlay, x, top, ALERT_MARKER);
        put_clipped(overlay, x, bottom, ALERT_MARKER);
    }
    for y in top..=bottom {
        put_clipped(overlay, left, y, ALERT_MARKER);
        put_clipped(overlay, right, y, ALERT_MARKER);
    }
}

fn put_clipped(overlay: &mut PixelBuffer, x: i64, y: i64, color: Rgb<u8>) {
    let (width, height) = overlay.dimensions();
    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return;
    }
    overlay.put_pixel(x as u32, y as u32, color);
}
