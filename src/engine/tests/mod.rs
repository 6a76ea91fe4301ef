//! Engine tests
//!
//! Scenario tests that drive the whole pipeline through `ingest`, organized
//! by behavior.

use super::*;

// ========================================
// Test Helper Functions
// ========================================

/// Encode an HS record
pub(crate) fn hs(level: bool, at: Timestamp) -> String {
    format!("[displayvga]-{{\"type\":\"hs\",\"value\":{level},\"timestamp\":{at}}}\n")
}

/// Encode a VS record
pub(crate) fn vs(level: bool, at: Timestamp) -> String {
    format!("[displayvga]-{{\"type\":\"vs\",\"value\":{level},\"timestamp\":{at}}}\n")
}

/// Encode an RGB record
pub(crate) fn rgb(r: u32, g: u32, b: u32, at: Timestamp) -> String {
    format!("[displayvga]-{{\"type\":\"rgb\",\"r\":{r},\"g\":{g},\"b\":{b},\"timestamp\":{at}}}\n")
}

/// 4×2 visible, 4 px HS pulse, no porches, 1 line VS pulse, 8-bit color
pub(crate) fn small_geometry(polarity: SyncPolarity) -> TimingGeometry {
    TimingGeometry::new(TimingSettings {
        width: 4,
        height: 2,
        horizontal: Porches::new(0, 4, 0),
        vertical: Porches::new(0, 1, 0),
        polarity,
        color_depth: 8,
    })
    .unwrap()
}

pub(crate) fn small_engine(polarity: SyncPolarity) -> ReconstructionEngine {
    ReconstructionEngine::new(small_geometry(polarity), DEFAULT_SOURCE_TAG)
}

pub(crate) const RED: Rgb = Rgb::new(0xFF, 0, 0);
pub(crate) const GREEN: Rgb = Rgb::new(0, 0xFF, 0);
pub(crate) const BLUE: Rgb = Rgb::new(0, 0, 0xFF);

pub(crate) fn row_is(fb: &Framebuffer, y: usize, color: Rgb) -> bool {
    (0..fb.width()).all(|x| fb.get_pixel(x, y) == color)
}

// ========================================
// Test Modules
// ========================================

mod scenario;
