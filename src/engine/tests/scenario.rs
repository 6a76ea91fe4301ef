//! End-to-end raster scenarios
//!
//! Events are written in terms of the idle and pulse levels of the sync
//! lines, so each scenario runs under both polarities.

use super::*;

/// Records for two short lines after a frame start
///
/// Red is driven during the first HS pulse, green and blue during the
/// second line.
fn two_line_records(polarity: SyncPolarity) -> Vec<String> {
    let idle = polarity.idle_level();
    let pulse = polarity.pulse_level();
    vec![
        vs(idle, 0),
        hs(idle, 0),
        hs(pulse, 4),
        rgb(255, 0, 0, 4),
        hs(idle, 8),
        rgb(0, 255, 0, 8),
        hs(pulse, 12),
        rgb(0, 0, 255, 12),
        hs(idle, 16),
    ]
}

#[test]
fn test_two_line_scenario() {
    for polarity in [SyncPolarity::ActiveHigh, SyncPolarity::ActiveLow] {
        let mut engine = small_engine(polarity);
        let report = engine.ingest(two_line_records(polarity).concat().as_bytes());
        assert_eq!(report.events, 9);
        assert_eq!(report.dropped, 0);

        let fb = engine.snapshot();
        assert!(row_is(&fb, 0, RED), "{polarity:?}");
        // Blue is flushed onto row 1 before the final edge moves to row 2
        assert!(row_is(&fb, 1, BLUE), "{polarity:?}");

        assert_eq!(engine.state().y, 2);
        assert_eq!(engine.state().time_per_pixel, 1.0);
        assert!(engine.state().calibrated);
        assert_eq!(engine.stats().lines, 2);
        assert_eq!(engine.stats().frames, 1);
    }
}

#[test]
fn test_second_line_is_green_before_blue_run() {
    for polarity in [SyncPolarity::ActiveHigh, SyncPolarity::ActiveLow] {
        let records = two_line_records(polarity);
        let mut engine = small_engine(polarity);

        // Up to and including the HS edge that closes the green run
        engine.ingest(records[..7].concat().as_bytes());
        assert!(row_is(engine.framebuffer(), 0, RED), "{polarity:?}");
        assert!(row_is(engine.framebuffer(), 1, GREEN), "{polarity:?}");
        assert_eq!(engine.state().y, 1);

        engine.ingest(records[7..].concat().as_bytes());
        assert!(row_is(engine.framebuffer(), 1, BLUE), "{polarity:?}");
    }
}

#[test]
fn test_runs_during_pulse_offset_from_leading_edge() {
    for polarity in [SyncPolarity::ActiveHigh, SyncPolarity::ActiveLow] {
        let records = [
            hs(polarity.pulse_level(), 10),
            rgb(255, 0, 0, 12),
            hs(polarity.idle_level(), 14),
        ]
        .concat();

        let mut engine = small_engine(polarity);
        engine.ingest(records.as_bytes());

        let fb = engine.framebuffer();
        assert_eq!(fb.get_pixel(0, 0), Rgb::BLACK, "{polarity:?}");
        assert_eq!(fb.get_pixel(1, 0), Rgb::BLACK, "{polarity:?}");
        assert_eq!(fb.get_pixel(2, 0), RED, "{polarity:?}");
        assert_eq!(fb.get_pixel(3, 0), RED, "{polarity:?}");
        assert_eq!(engine.state().hsync_at, 14);
        assert_eq!(engine.state().y, 1);
    }
}

#[test]
fn test_rows_beyond_visible_height_are_not_written() {
    let polarity = SyncPolarity::ActiveHigh;
    let mut records = vs(false, 0);
    records.push_str(&rgb(255, 255, 255, 0));
    let mut t = 0;
    for _ in 0..6 {
        records.push_str(&hs(true, t + 4));
        records.push_str(&hs(false, t + 8));
        t += 8;
    }

    let mut engine = small_engine(polarity);
    engine.ingest(records.as_bytes());
    // Only rows 0 and 1 exist, each painted once per HS edge; later lines
    // must not wrap around into them
    assert_eq!(engine.stats().pixels_written, 16);
    assert_eq!(engine.state().y, 6);
}

#[test]
fn test_vsync_restarts_frame() {
    let polarity = SyncPolarity::ActiveLow;
    let idle = polarity.idle_level();
    let pulse = polarity.pulse_level();

    let mut engine = small_engine(polarity);
    engine.ingest(two_line_records(polarity).concat().as_bytes());
    assert_eq!(engine.state().y, 2);

    // Second frame: VS pulse spanning one HS pulse, then green over the
    // first visible line
    let records = [
        vs(pulse, 20),
        hs(pulse, 20),
        hs(idle, 24),
        vs(idle, 24),
        rgb(0, 255, 0, 24),
        hs(pulse, 28),
        rgb(0, 0, 0, 28),
    ]
    .concat();
    engine.ingest(records.as_bytes());

    let fb = engine.framebuffer();
    assert_eq!(engine.state().y, 0);
    assert!(row_is(fb, 0, GREEN));
    assert!(row_is(fb, 1, BLUE), "previous frame content is kept");
    assert_eq!(engine.stats().frames, 2);
}

#[test]
fn test_vertical_back_porch_offsets_rows() {
    let geometry = TimingGeometry::new(TimingSettings {
        width: 4,
        height: 2,
        horizontal: Porches::new(0, 4, 0),
        vertical: Porches::new(0, 1, 1),
        polarity: SyncPolarity::ActiveHigh,
        color_depth: 8,
    })
    .unwrap();
    let mut engine = ReconstructionEngine::new(geometry, DEFAULT_SOURCE_TAG);

    // Line 0 is back porch, line 1 is the first visible row
    let records = [
        vs(false, 0),
        rgb(255, 0, 0, 0),
        hs(true, 4),
        hs(false, 8),
        rgb(0, 255, 0, 8),
        hs(true, 12),
    ]
    .concat();
    engine.ingest(records.as_bytes());

    assert!(row_is(engine.framebuffer(), 0, GREEN));
    assert!(row_is(engine.framebuffer(), 1, Rgb::BLACK));
}

#[test]
fn test_horizontal_back_porch_clips_run() {
    let geometry = TimingGeometry::new(TimingSettings {
        width: 4,
        height: 1,
        horizontal: Porches::new(2, 4, 2),
        vertical: Porches::new(0, 1, 0),
        polarity: SyncPolarity::ActiveHigh,
        color_depth: 8,
    })
    .unwrap();
    let mut engine = ReconstructionEngine::new(geometry, DEFAULT_SOURCE_TAG);

    // White for offsets 0..5 of line 0: back porch 0..2, visible columns 0..3
    let records = [vs(false, 0), rgb(255, 255, 255, 0), rgb(0, 0, 0, 5), hs(true, 8)].concat();
    engine.ingest(records.as_bytes());

    let fb = engine.framebuffer();
    let white = Rgb::new(0xFF, 0xFF, 0xFF);
    assert_eq!(fb.get_pixel(0, 0), white);
    assert_eq!(fb.get_pixel(2, 0), white);
    assert_eq!(fb.get_pixel(3, 0), Rgb::BLACK);
    assert_eq!(engine.stats().pixels_written, 4);
}

#[test]
fn test_reduced_depth_colors_are_scaled() {
    let geometry = TimingGeometry::new(TimingSettings {
        color_depth: 2,
        ..*small_geometry(SyncPolarity::ActiveHigh).settings()
    })
    .unwrap();
    let mut engine = ReconstructionEngine::new(geometry, DEFAULT_SOURCE_TAG);

    let records = [vs(false, 0), rgb(3, 0, 2, 0), hs(true, 4)].concat();
    engine.ingest(records.as_bytes());

    assert!(row_is(engine.framebuffer(), 0, Rgb::new(0xC0, 0x00, 0x80)));
}
