// Framebuffer Compositor - Writes closed pixel runs into the visible area
//
// A run is the interval between two consecutive events, painted in the
// color that was current during it. Its horizontal extent is measured from
// the last HS level change and converted to pixels with the calibrated time
// per pixel. Only the part that overlaps the
// visible window is written; porches and sync pulses are blanking.

use super::clock::{elapsed, Timestamp};
use super::event::{ColorSample, Rgb};
use super::raster::RasterState;
use super::timing::TimingGeometry;
use crate::display::Framebuffer;

/// Close the run ending at `run_end` and paint it in `color`
///
/// Returns the number of framebuffer cells written. `state.last_flush`
/// becomes `run_end` whether or not anything was visible.
pub fn flush(
    geometry: &TimingGeometry,
    state: &mut RasterState,
    framebuffer: &mut Framebuffer,
    color: Rgb,
    run_end: Timestamp,
) -> usize {
    let origin = state.hsync_at;
    let run_span = elapsed(run_end, origin);
    let flush_span = elapsed(state.last_flush, origin);

    // A previous flush that lies before the origin wraps to a span
    // longer than the run itself: start from the origin instead.
    let x_start = if flush_span <= run_span {
        to_pixels(flush_span, state.time_per_pixel)
    } else {
        0
    };
    let x_end = to_pixels(run_span, state.time_per_pixel);

    let written = paint_run(geometry, framebuffer, state.y, x_start, x_end, color);
    state.last_flush = run_end;
    written
}

/// Paint pixel offsets `[x_start, x_end)` of scanline `y`, clipped to the visible window
///
/// Offsets are measured from the last HS change; the visible window starts
/// after the horizontal back porch. Scanlines are visible from the vertical
/// back porch on.
pub fn paint_run(
    geometry: &TimingGeometry,
    framebuffer: &mut Framebuffer,
    y: i64,
    x_start: i64,
    x_end: i64,
    color: Rgb,
) -> usize {
    let v_offset = i64::from(geometry.vertical().back);
    let row = y - v_offset;
    if row < 0 || row >= i64::from(geometry.height()) {
        return 0;
    }

    let h_offset = i64::from(geometry.horizontal().back);
    let first = x_start.max(h_offset);
    let last = x_end.min(h_offset + i64::from(geometry.width()));
    if first >= last {
        return 0;
    }

    let columns = (first - h_offset) as usize..(last - h_offset) as usize;
    let written = columns.len();
    framebuffer.fill_span(row as usize, columns, color);
    written
}

/// Convert a span in timestamp units to a whole number of pixels
#[inline]
fn to_pixels(span: u64, time_per_pixel: f64) -> i64 {
    // Float-to-int casts saturate, so tiny calibrations cannot overflow
    (span as f64 / time_per_pixel).floor() as i64
}

/// Expand a reduced-depth channel sample to the full 8-bit range
///
/// The sample is shifted into the high bits so brightness stays
/// proportional: a 2-bit `3` becomes `0xC0`. Bits above the configured depth
/// are ignored.
#[inline]
pub fn scale_channel(value: u32, depth: u8) -> u8 {
    let depth = u32::from(depth.clamp(1, 8));
    let mask = (1u32 << depth) - 1;
    ((value & mask) << (8 - depth)) as u8
}

/// Expand all three channels of a color sample
pub fn scale_sample(sample: &ColorSample, depth: u8) -> Rgb {
    Rgb::new(
        scale_channel(sample.r, depth),
        scale_channel(sample.g, depth),
        scale_channel(sample.b, depth),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::timing::{Porches, SyncPolarity, TimingSettings};

    const RED: Rgb = Rgb::new(0xFF, 0, 0);

    /// 4×2 visible, 2 px back porch and 1 line vertical back porch
    fn geometry() -> TimingGeometry {
        TimingGeometry::new(TimingSettings {
            width: 4,
            height: 2,
            horizontal: Porches::new(1, 2, 2),
            vertical: Porches::new(1, 1, 1),
            polarity: SyncPolarity::ActiveHigh,
            color_depth: 8,
        })
        .unwrap()
    }

    fn visible_line() -> (TimingGeometry, RasterState, Framebuffer) {
        let geometry = geometry();
        let mut state = RasterState::new(&geometry);
        state.y = 1;
        (geometry, state, Framebuffer::new(4, 2))
    }

    #[test]
    fn test_scale_channel() {
        assert_eq!(scale_channel(3, 2), 0xC0);
        assert_eq!(scale_channel(0, 2), 0);
        assert_eq!(scale_channel(1, 2), 0x40);
        assert_eq!(scale_channel(1, 1), 0x80);
        assert_eq!(scale_channel(255, 8), 0xFF);
        assert_eq!(scale_channel(0xAB, 8), 0xAB);
    }

    #[test]
    fn test_scale_channel_ignores_excess_bits() {
        assert_eq!(scale_channel(0b111, 2), 0xC0);
        assert_eq!(scale_channel(0x1FF, 8), 0xFF);
    }

    #[test]
    fn test_run_inside_visible_window() {
        let (geometry, mut state, mut fb) = visible_line();
        let written = flush(&geometry, &mut state, &mut fb, RED, 6);
        // Offsets 0..6, visible 2..6 -> columns 0..4
        assert_eq!(written, 4);
        assert!((0..4).all(|x| fb.get_pixel(x, 0) == RED));
        assert!((0..4).all(|x| fb.get_pixel(x, 1) == Rgb::BLACK));
        assert_eq!(state.last_flush, 6);
    }

    #[test]
    fn test_run_in_back_porch_writes_nothing() {
        let (geometry, mut state, mut fb) = visible_line();
        assert_eq!(flush(&geometry, &mut state, &mut fb, RED, 2), 0);
        assert!(fb.as_slice().iter().all(|&b| b == 0));
        assert_eq!(state.last_flush, 2);
    }

    #[test]
    fn test_run_past_visible_window_writes_nothing() {
        let (geometry, mut state, mut fb) = visible_line();
        state.last_flush = 6;
        assert_eq!(flush(&geometry, &mut state, &mut fb, RED, 20), 0);
        assert!(fb.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_run_is_clipped_on_both_sides() {
        let (geometry, mut state, mut fb) = visible_line();
        state.last_flush = 3;
        assert_eq!(flush(&geometry, &mut state, &mut fb, RED, 5), 2);
        assert_eq!(fb.get_pixel(0, 0), Rgb::BLACK);
        assert_eq!(fb.get_pixel(1, 0), RED);
        assert_eq!(fb.get_pixel(2, 0), RED);
        assert_eq!(fb.get_pixel(3, 0), Rgb::BLACK);
    }

    #[test]
    fn test_rows_outside_vertical_window() {
        let (geometry, mut state, mut fb) = visible_line();
        for y in [0, 3, 4, -1] {
            state.y = y;
            state.last_flush = 0;
            assert_eq!(flush(&geometry, &mut state, &mut fb, RED, 6), 0, "y = {y}");
        }
        assert!(fb.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_time_per_pixel_scales_offsets() {
        let (geometry, mut state, mut fb) = visible_line();
        state.time_per_pixel = 10.0;
        state.last_flush = 25;
        // Offsets 2.5 -> 2 and 4.9 -> 4: columns 0..2
        assert_eq!(flush(&geometry, &mut state, &mut fb, RED, 49), 2);
        assert_eq!(fb.get_pixel(1, 0), RED);
        assert_eq!(fb.get_pixel(2, 0), Rgb::BLACK);
    }

    #[test]
    fn test_flush_before_origin_clamps_to_zero() {
        let (geometry, mut state, mut fb) = visible_line();
        state.hsync_at = 100;
        state.last_flush = 90;
        assert_eq!(flush(&geometry, &mut state, &mut fb, RED, 104), 2);
        assert_eq!(fb.get_pixel(0, 0), RED);
        assert_eq!(fb.get_pixel(1, 0), RED);
    }

    #[test]
    fn test_run_across_timestamp_wraparound() {
        let (geometry, mut state, mut fb) = visible_line();
        state.hsync_at = u32::MAX - 1;
        state.last_flush = u32::MAX - 1;
        // Offsets 0..6 with the counter wrapping after two units
        assert_eq!(flush(&geometry, &mut state, &mut fb, RED, 4), 4);
        assert!((0..4).all(|x| fb.get_pixel(x, 0) == RED));
    }
}
