// Engine module - Signal-to-framebuffer reconstruction
//
// Turns the byte stream emitted by a simulated video timing generator into a
// picture. The pipeline per record is:
//
//   FrameDecoder -> RasterState (sync edges, calibration) -> compositor
//
// The engine is single-owner: it is driven by one consumer and never shares
// its state, so it needs no locking. Decoding problems are never fatal; they
// are counted and logged, and the record is skipped.

pub mod clock;
pub mod compositor;
pub mod decoder;
pub mod event;
pub mod raster;
pub mod timing;

pub use clock::{elapsed, Timestamp, TIMESTAMP_MODULUS};
pub use decoder::{parse_payload, DecodeError, Decoded, FrameDecoder, DEFAULT_SOURCE_TAG};
pub use event::{ColorSample, Event, Rgb, SyncEdge};
pub use raster::{FrameTransition, LineTransition, RasterState};
pub use timing::{GeometryError, Porches, SyncPolarity, TimingGeometry, TimingSettings};

use crate::display::Framebuffer;
use tracing::warn;

/// Default number of events between redraws
pub const DEFAULT_REDRAW_EVERY: u32 = 300;

/// Redraw throttle: signals a redraw once every `every` processed events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedrawCadence {
    every: u32,
    pending: u32,
}

impl RedrawCadence {
    /// Create a cadence; an interval of 0 is treated as 1 (redraw on every event)
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            pending: 0,
        }
    }

    /// Events between redraws
    pub fn every(&self) -> u32 {
        self.every
    }

    /// Count `events` processed events; returns true if a redraw is now due
    pub fn tick(&mut self, events: u32) -> bool {
        self.pending = self.pending.saturating_add(events);
        if self.pending >= self.every {
            self.pending %= self.every;
            true
        } else {
            false
        }
    }
}

impl Default for RedrawCadence {
    fn default() -> Self {
        Self::new(DEFAULT_REDRAW_EVERY)
    }
}

/// What a single [`ReconstructionEngine::ingest`] call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Events decoded and applied
    pub events: u32,
    /// Records skipped because they belong to another sub-stream
    pub foreign: u32,
    /// Tagged records dropped as undecodable
    pub dropped: u32,
    /// Whether the redraw cadence elapsed during this call
    pub redraw_due: bool,
}

/// Running totals since the engine was built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Raw bytes ingested
    pub bytes: u64,
    /// Events applied
    pub events: u64,
    /// Horizontal sync events applied
    pub hsync_events: u64,
    /// Vertical sync events applied
    pub vsync_events: u64,
    /// Color samples applied
    pub color_events: u64,
    /// Scanlines started (HS pulse completions)
    pub lines: u64,
    /// Frames started (VS returning to idle)
    pub frames: u64,
    /// Records from other sub-streams
    pub foreign: u64,
    /// Dropped records
    pub dropped: u64,
    /// Framebuffer cells written
    pub pixels_written: u64,
}

/// Reconstruction engine
///
/// Owns the decoder, the raster state and the framebuffer. Feed it raw
/// transport bytes with [`ingest`](Self::ingest) and read the picture with
/// [`snapshot`](Self::snapshot) or [`framebuffer`](Self::framebuffer).
#[derive(Debug)]
pub struct ReconstructionEngine {
    geometry: TimingGeometry,
    decoder: FrameDecoder,
    state: RasterState,
    framebuffer: Framebuffer,
    cadence: RedrawCadence,
    stats: EngineStats,
}

impl ReconstructionEngine {
    /// Create an engine for a validated geometry
    ///
    /// # Arguments
    /// * `geometry` - Raster timing
    /// * `tag` - Source tag of the records to reconstruct from
    pub fn new(geometry: TimingGeometry, tag: impl Into<String>) -> Self {
        Self {
            geometry,
            decoder: FrameDecoder::new(tag),
            state: RasterState::new(&geometry),
            framebuffer: Framebuffer::new(geometry.width() as usize, geometry.height() as usize),
            cadence: RedrawCadence::default(),
            stats: EngineStats::default(),
        }
    }

    /// Validate `settings` and create an engine using the default source tag
    ///
    /// # Errors
    /// Returns the validation error if the settings describe an impossible raster
    pub fn from_settings(settings: TimingSettings) -> Result<Self, GeometryError> {
        Ok(Self::new(TimingGeometry::new(settings)?, DEFAULT_SOURCE_TAG))
    }

    /// Replace the redraw cadence
    pub fn with_redraw_every(mut self, every: u32) -> Self {
        self.cadence = RedrawCadence::new(every);
        self
    }

    /// Append transport bytes and apply every complete record they finish
    ///
    /// Never fails: undecodable records are logged, counted and skipped. A
    /// trailing partial record is kept for the next call.
    pub fn ingest(&mut self, bytes: &[u8]) -> IngestReport {
        let mut report = IngestReport::default();
        self.stats.bytes += bytes.len() as u64;
        self.decoder.push(bytes);

        while let Some(decoded) = self.decoder.next_frame() {
            match decoded {
                Decoded::Event(event) => {
                    self.apply(event);
                    report.events += 1;
                }
                Decoded::Foreign => {
                    self.stats.foreign += 1;
                    report.foreign += 1;
                }
                Decoded::Rejected(err) => {
                    match &err {
                        DecodeError::UnknownType(kind) => {
                            warn!(kind = %kind, "dropping record of unknown type")
                        }
                        _ => warn!(error = %err, "dropping undecodable record"),
                    }
                    self.stats.dropped += 1;
                    report.dropped += 1;
                }
            }
        }

        report.redraw_due = self.cadence.tick(report.events);
        report
    }

    /// Apply one already-decoded event
    pub fn apply(&mut self, event: Event) {
        let before = self.state.pixels_written;
        match event {
            Event::HSync(edge) => {
                self.stats.hsync_events += 1;
                let transition = self
                    .state
                    .on_hsync(&self.geometry, &mut self.framebuffer, edge);
                if let LineTransition::LineStart { .. } = transition {
                    self.stats.lines += 1;
                }
            }
            Event::VSync(edge) => {
                self.stats.vsync_events += 1;
                let transition = self
                    .state
                    .on_vsync(&self.geometry, &mut self.framebuffer, edge);
                if transition == FrameTransition::FrameStart {
                    self.stats.frames += 1;
                }
            }
            Event::Color(sample) => {
                self.stats.color_events += 1;
                self.state
                    .on_color(&self.geometry, &mut self.framebuffer, sample);
            }
        }
        self.stats.events += 1;
        self.stats.pixels_written += self.state.pixels_written - before;
    }

    /// Copy of the current picture
    pub fn snapshot(&self) -> Framebuffer {
        self.framebuffer.clone()
    }

    /// Borrow the current picture
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Timing the engine was built with
    pub fn geometry(&self) -> &TimingGeometry {
        &self.geometry
    }

    /// Current raster position and calibration
    pub fn state(&self) -> &RasterState {
        &self.state
    }

    /// Totals since construction
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Bytes of an incomplete record waiting for its terminator
    pub fn pending_bytes(&self) -> usize {
        self.decoder.pending_len()
    }
}

#[cfg(test)]
mod tests;
