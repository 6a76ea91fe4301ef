// Timing Geometry - Porch, sync and visible-area dimensions of the raster
//
// `TimingSettings` is the plain, serializable form that lives in the
// configuration file. `TimingGeometry` is the validated, immutable value the
// engine is built from.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Electrical polarity of the sync pulses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncPolarity {
    /// Pulses are driven high and the line idles low
    #[default]
    ActiveHigh,
    /// Pulses are driven low and the line idles high
    ActiveLow,
}

impl SyncPolarity {
    /// Wire level of a sync line while its pulse is asserted
    pub fn pulse_level(self) -> bool {
        matches!(self, SyncPolarity::ActiveHigh)
    }

    /// Wire level of a sync line between pulses
    pub fn idle_level(self) -> bool {
        !self.pulse_level()
    }

    /// Whether `level` means the pulse is asserted
    pub fn is_pulse(self, level: bool) -> bool {
        level == self.pulse_level()
    }
}

/// Blanking intervals around the visible part of a line or frame
///
/// Horizontal porches are counted in pixels, vertical ones in lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Porches {
    /// Front porch (between the visible area and the sync pulse)
    pub front: u32,
    /// Sync pulse width
    pub sync: u32,
    /// Back porch (between the sync pulse and the visible area)
    pub back: u32,
}

impl Porches {
    /// Create porch widths
    pub const fn new(front: u32, sync: u32, back: u32) -> Self {
        Self { front, sync, back }
    }

    /// Sum of all three intervals
    pub fn total(&self) -> u32 {
        self.front + self.sync + self.back
    }
}

/// Serializable timing description, validated into a [`TimingGeometry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Visible width in pixels
    pub width: u32,
    /// Visible height in lines
    pub height: u32,
    /// Horizontal porches in pixels
    pub horizontal: Porches,
    /// Vertical porches in lines
    pub vertical: Porches,
    /// Sync pulse polarity, shared by HS and VS
    #[serde(default)]
    pub polarity: SyncPolarity,
    /// Bits per color channel on the wire (1-8)
    pub color_depth: u8,
}

impl TimingSettings {
    /// 800×600 timing with a 2-bit DAC, as driven by the Tiny VGA model
    pub const fn svga_800x600() -> Self {
        Self {
            width: 800,
            height: 600,
            horizontal: Porches::new(40, 128, 88),
            vertical: Porches::new(1, 4, 23),
            polarity: SyncPolarity::ActiveHigh,
            color_depth: 2,
        }
    }

    /// 640×480 at 60 Hz (industry-standard timing, negative sync)
    pub const fn vga_640x480() -> Self {
        Self {
            width: 640,
            height: 480,
            horizontal: Porches::new(16, 96, 48),
            vertical: Porches::new(10, 2, 33),
            polarity: SyncPolarity::ActiveLow,
            color_depth: 8,
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self::svga_800x600()
    }
}

/// Reasons a timing description cannot be turned into a geometry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// A dimension that must be positive is zero
    #[error("{0} must be greater than zero")]
    ZeroDimension(&'static str),

    /// The color depth does not fit an 8-bit channel
    #[error("color depth must be between 1 and 8 bits, got {0}")]
    ColorDepth(u8),

    /// Total line or frame period does not fit the pixel index range
    #[error("{0} period overflows")]
    Overflow(&'static str),
}

/// Validated, immutable raster timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingGeometry {
    settings: TimingSettings,
}

impl TimingGeometry {
    /// Validate `settings` into a geometry
    ///
    /// Visible width and height and both sync pulse widths must be positive;
    /// porches may be zero. The color depth must be 1-8 bits.
    pub fn new(settings: TimingSettings) -> Result<Self, GeometryError> {
        let checks = [
            (settings.width, "visible width"),
            (settings.height, "visible height"),
            (settings.horizontal.sync, "horizontal sync pulse"),
            (settings.vertical.sync, "vertical sync pulse"),
        ];
        for (value, name) in checks {
            if value == 0 {
                return Err(GeometryError::ZeroDimension(name));
            }
        }

        if !(1..=8).contains(&settings.color_depth) {
            return Err(GeometryError::ColorDepth(settings.color_depth));
        }

        let period = |visible: u32, porches: Porches| {
            [visible, porches.front, porches.sync, porches.back]
                .into_iter()
                .map(u64::from)
                .sum::<u64>()
        };
        let h_total = period(settings.width, settings.horizontal);
        let v_total = period(settings.height, settings.vertical);
        if h_total > u64::from(u32::MAX) {
            return Err(GeometryError::Overflow("horizontal"));
        }
        if v_total > u64::from(u32::MAX) {
            return Err(GeometryError::Overflow("vertical"));
        }

        Ok(Self { settings })
    }

    /// The settings this geometry was validated from
    pub fn settings(&self) -> &TimingSettings {
        &self.settings
    }

    /// Visible width in pixels
    pub fn width(&self) -> u32 {
        self.settings.width
    }

    /// Visible height in lines
    pub fn height(&self) -> u32 {
        self.settings.height
    }

    /// Horizontal porches in pixels
    pub fn horizontal(&self) -> Porches {
        self.settings.horizontal
    }

    /// Vertical porches in lines
    pub fn vertical(&self) -> Porches {
        self.settings.vertical
    }

    /// Sync pulse polarity
    pub fn polarity(&self) -> SyncPolarity {
        self.settings.polarity
    }

    /// Bits per color channel on the wire
    pub fn color_depth(&self) -> u8 {
        self.settings.color_depth
    }

    /// Pixels per line including all blanking
    pub fn total_width(&self) -> u32 {
        self.settings.width + self.settings.horizontal.total()
    }

    /// Lines per frame including all blanking
    pub fn total_height(&self) -> u32 {
        self.settings.height + self.settings.vertical.total()
    }
}

impl TryFrom<TimingSettings> for TimingGeometry {
    type Error = GeometryError;

    fn try_from(settings: TimingSettings) -> Result<Self, Self::Error> {
        Self::new(settings)
    }
}
