// Raster Tracker - Scanline position, sync state and pixel-clock calibration
//
// Line and frame structure is recovered from sync edges alone:
// - the trailing edge of an HS pulse starts a new scanline
// - every HS level change (either edge) is the origin for horizontal pixel
//   offsets until the next change
// - a VS event at the idle level restarts the frame at scanline 0
// - the duration of each complete HS pulse, divided by the configured pulse
//   width, gives the time per pixel
//
// Every event first closes the pixel run accumulated since the previous
// event, using the color that was current during that run.

use super::clock::{elapsed, Timestamp};
use super::compositor;
use super::event::{ColorSample, Rgb, SyncEdge};
use super::timing::TimingGeometry;
use crate::display::Framebuffer;
use tracing::debug;

/// Mutable reconstruction state, owned by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct RasterState {
    /// Current scanline, counted from the trailing edge of the last VS pulse
    pub y: i64,
    /// Current HS wire level
    pub hsync_level: bool,
    /// Time of the last HS level change: origin for horizontal offsets
    pub hsync_at: Timestamp,
    /// Leading edge of the HS pulse in progress, if one was observed
    pub pulse_start: Option<Timestamp>,
    /// Current VS wire level
    pub vsync_level: bool,
    /// Time of the last VS level change
    pub vsync_at: Timestamp,
    /// Color of the run in progress, already scaled to 8 bits per channel
    pub color: Rgb,
    /// End of the last run written to the framebuffer
    pub last_flush: Timestamp,
    /// Timestamp units per pixel
    pub time_per_pixel: f64,
    /// Whether `time_per_pixel` has been measured from a complete pulse
    pub calibrated: bool,
    /// Framebuffer cells written so far
    pub pixels_written: u64,
}

/// What an HS event did to the raster position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineTransition {
    /// Same level as before; only the pending run was closed
    Unchanged,
    /// A sync pulse started
    PulseStart,
    /// A sync pulse ended and a new scanline began
    LineStart {
        /// Scanline index after the increment
        y: i64,
        /// New time per pixel, when this pulse recalibrated the clock
        time_per_pixel: Option<f64>,
    },
}

/// What a VS event did to the raster position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTransition {
    /// A VS pulse is asserted (or stays asserted)
    Pulse,
    /// The VS line is idle: the frame restarts at scanline 0
    FrameStart,
}

impl RasterState {
    /// Initial state: both sync lines idle, no calibration, black pending color
    pub fn new(geometry: &TimingGeometry) -> Self {
        let idle = geometry.polarity().idle_level();
        Self {
            y: 0,
            hsync_level: idle,
            hsync_at: 0,
            pulse_start: None,
            vsync_level: idle,
            vsync_at: 0,
            color: Rgb::BLACK,
            last_flush: 0,
            time_per_pixel: 1.0,
            calibrated: false,
            pixels_written: 0,
        }
    }

    /// Apply a horizontal sync edge
    ///
    /// Closes the pending run first, then applies the level change.
    pub fn on_hsync(
        &mut self,
        geometry: &TimingGeometry,
        framebuffer: &mut Framebuffer,
        edge: SyncEdge,
    ) -> LineTransition {
        let color = self.color;
        let written = compositor::flush(geometry, self, framebuffer, color, edge.at);
        self.pixels_written += written as u64;

        if edge.level == self.hsync_level {
            return LineTransition::Unchanged;
        }
        self.hsync_level = edge.level;
        self.hsync_at = edge.at;

        if geometry.polarity().is_pulse(edge.level) {
            self.pulse_start = Some(edge.at);
            return LineTransition::PulseStart;
        }

        let recalibrated = self
            .pulse_start
            .take()
            .and_then(|start| self.calibrate(geometry, elapsed(edge.at, start)));
        self.y += 1;

        debug!(
            y = self.y,
            at = edge.at,
            time_per_pixel = self.time_per_pixel,
            "hsync: line start"
        );

        LineTransition::LineStart {
            y: self.y,
            time_per_pixel: recalibrated,
        }
    }

    /// Apply a vertical sync edge
    pub fn on_vsync(
        &mut self,
        geometry: &TimingGeometry,
        framebuffer: &mut Framebuffer,
        edge: SyncEdge,
    ) -> FrameTransition {
        let color = self.color;
        let written = compositor::flush(geometry, self, framebuffer, color, edge.at);
        self.pixels_written += written as u64;

        if edge.level != self.vsync_level {
            self.vsync_level = edge.level;
            self.vsync_at = edge.at;
        }

        if geometry.polarity().is_pulse(edge.level) {
            return FrameTransition::Pulse;
        }

        debug!(previous_y = self.y, at = edge.at, "vsync: frame start");
        self.y = 0;
        FrameTransition::FrameStart
    }

    /// Apply a color change: close the run in the old color, then switch
    pub fn on_color(
        &mut self,
        geometry: &TimingGeometry,
        framebuffer: &mut Framebuffer,
        sample: ColorSample,
    ) {
        let color = self.color;
        let written = compositor::flush(geometry, self, framebuffer, color, sample.at);
        self.pixels_written += written as u64;
        self.color = compositor::scale_sample(&sample, geometry.color_depth());
    }

    /// Derive the time per pixel from an observed pulse duration
    fn calibrate(&mut self, geometry: &TimingGeometry, pulse: u64) -> Option<f64> {
        if pulse == 0 {
            debug!("hsync: zero-length pulse, calibration kept");
            return None;
        }
        self.time_per_pixel = pulse as f64 / f64::from(geometry.horizontal().sync);
        self.calibrated = true;
        Some(self.time_per_pixel)
    }
}
