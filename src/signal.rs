// Signal Generator - Synthesizes the event stream of a video timing generator
//
// Stands in for the hardware simulation: walks the raster of one frame at a
// fixed number of timestamp units per pixel and emits the sync edges and
// color changes a timing generator would put on the wire. Each line is laid
// out as
//
//   [HS pulse][back porch][visible][front porch]
//
// and the frame restarts (VS returns to idle) at the end of the HS pulse of
// line 0. Timestamps are a wrapping 32-bit counter that continues across
// frames.
//
// Color is blank during the HS pulse. The engine measures the pulse from its
// leading edge, so when the pulse is wider than the back porch the blanking
// lands on the leftmost visible columns of the previous row.

use crate::engine::{ColorSample, Event, SyncEdge, Timestamp, TimingGeometry, DEFAULT_SOURCE_TAG};
use serde_json::json;

/// A color on the wire, at the geometry's color depth
pub type WireColor = (u32, u32, u32);

const BLANK: WireColor = (0, 0, 0);

/// Built-in test pictures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Eight vertical bars: white, yellow, cyan, green, magenta, red, blue, black
    ColorBars,
    /// Red ramps left to right, green top to bottom, blue is the inverse of red
    Gradient,
    /// Alternating white and black 16×16 squares
    Checkerboard,
}

impl Pattern {
    /// Wire color of visible pixel (`x`, `y`)
    pub fn color(self, geometry: &TimingGeometry, x: u32, y: u32) -> WireColor {
        let max = (1u32 << geometry.color_depth()) - 1;
        let ramp = |pos: u32, len: u32| {
            if len <= 1 {
                max
            } else {
                (u64::from(pos) * u64::from(max) / u64::from(len - 1)) as u32
            }
        };

        match self {
            Pattern::ColorBars => {
                const BARS: [(bool, bool, bool); 8] = [
                    (true, true, true),
                    (true, true, false),
                    (false, true, true),
                    (false, true, false),
                    (true, false, true),
                    (true, false, false),
                    (false, false, true),
                    (false, false, false),
                ];
                let bar = (u64::from(x) * 8 / u64::from(geometry.width())) as usize;
                let (r, g, b) = BARS[bar.min(7)];
                let level = |on: bool| if on { max } else { 0 };
                (level(r), level(g), level(b))
            }
            Pattern::Gradient => {
                let r = ramp(x, geometry.width());
                let g = ramp(y, geometry.height());
                (r, g, max - r)
            }
            Pattern::Checkerboard => {
                if ((x / 16) + (y / 16)) % 2 == 0 {
                    (max, max, max)
                } else {
                    BLANK
                }
            }
        }
    }
}

/// Produces per-frame event sequences for a geometry
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    geometry: TimingGeometry,
    time_per_pixel: u32,
    now: Timestamp,
    color: WireColor,
    tag: String,
    frames: u64,
}

impl SignalGenerator {
    /// Create a generator starting at timestamp 0
    ///
    /// # Arguments
    /// * `geometry` - Raster timing to emit
    /// * `time_per_pixel` - Timestamp units per pixel (at least 1)
    pub fn new(geometry: TimingGeometry, time_per_pixel: u32) -> Self {
        Self {
            geometry,
            time_per_pixel: time_per_pixel.max(1),
            now: 0,
            color: BLANK,
            tag: DEFAULT_SOURCE_TAG.to_string(),
            frames: 0,
        }
    }

    /// Start the counter at `at` instead of 0
    pub fn starting_at(mut self, at: Timestamp) -> Self {
        self.now = at;
        self
    }

    /// Use `tag` as the record prefix
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Timestamp at which the next frame starts
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Frames generated so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Timestamp units per line
    pub fn line_period(&self) -> u64 {
        u64::from(self.geometry.total_width()) * u64::from(self.time_per_pixel)
    }

    /// Timestamp units per frame
    pub fn frame_period(&self) -> u64 {
        self.line_period() * u64::from(self.geometry.total_height())
    }

    /// Events of one frame, colored by `pixel(x, y)` over the visible area
    pub fn frame_events<F>(&mut self, mut pixel: F) -> Vec<Event>
    where
        F: FnMut(u32, u32) -> WireColor,
    {
        let g = self.geometry;
        let h = g.horizontal();
        let v = g.vertical();
        let polarity = g.polarity();
        let mask = (1u32 << g.color_depth()) - 1;
        let visible_rows = v.back..v.back + g.height();
        let vsync_line = v.back + g.height() + v.front;

        let now = self.now;
        let tpp = u64::from(self.time_per_pixel);
        let line_period = self.line_period();

        let mut events = Vec::new();
        for line in 0..g.total_height() {
            let line_base = u64::from(line) * line_period;
            let at_px = move |px: u32| wrap(now, line_base + u64::from(px) * tpp);

            events.push(Event::HSync(SyncEdge {
                level: polarity.pulse_level(),
                at: at_px(0),
            }));
            let origin = at_px(h.sync);
            events.push(Event::HSync(SyncEdge {
                level: polarity.idle_level(),
                at: origin,
            }));
            if line == 0 {
                events.push(Event::VSync(SyncEdge {
                    level: polarity.idle_level(),
                    at: origin,
                }));
            } else if line == vsync_line {
                events.push(Event::VSync(SyncEdge {
                    level: polarity.pulse_level(),
                    at: origin,
                }));
            }

            if visible_rows.contains(&line) {
                let row = line - v.back;
                for x in 0..g.width() {
                    let (r, green, b) = pixel(x, row);
                    let color = (r & mask, green & mask, b & mask);
                    self.push_color(&mut events, color, at_px(h.sync + h.back + x));
                }
                self.push_color(&mut events, BLANK, at_px(h.sync + h.back + g.width()));
            }
        }

        self.now = wrap(now, self.frame_period());
        self.frames += 1;
        events
    }

    /// Events of one frame of a built-in pattern
    pub fn pattern_events(&mut self, pattern: Pattern) -> Vec<Event> {
        let geometry = self.geometry;
        self.frame_events(|x, y| pattern.color(&geometry, x, y))
    }

    /// Wire records of one frame, colored by `pixel(x, y)`
    pub fn frame_records<F>(&mut self, pixel: F) -> String
    where
        F: FnMut(u32, u32) -> WireColor,
    {
        let events = self.frame_events(pixel);
        let mut out = String::with_capacity(events.len() * 64);
        for event in &events {
            out.push_str(&encode_event(&self.tag, event));
        }
        out
    }

    /// Wire records of one frame of a built-in pattern
    pub fn pattern_records(&mut self, pattern: Pattern) -> String {
        let geometry = self.geometry;
        self.frame_records(|x, y| pattern.color(&geometry, x, y))
    }

    fn push_color(&mut self, events: &mut Vec<Event>, color: WireColor, at: Timestamp) {
        if color == self.color {
            return;
        }
        self.color = color;
        events.push(Event::Color(ColorSample {
            r: color.0,
            g: color.1,
            b: color.2,
            at,
        }));
    }
}

/// Advance a timestamp by `offset` units on the wrapping counter
fn wrap(base: Timestamp, offset: u64) -> Timestamp {
    base.wrapping_add(offset as u32)
}

/// Encode one event as a newline-terminated wire record
pub fn encode_event(tag: &str, event: &Event) -> String {
    let payload = match *event {
        Event::HSync(edge) => json!({"type": "hs", "value": edge.level, "timestamp": edge.at}),
        Event::VSync(edge) => json!({"type": "vs", "value": edge.level, "timestamp": edge.at}),
        Event::Color(sample) => json!({
            "type": "rgb",
            "r": sample.r,
            "g": sample.g,
            "b": sample.b,
            "timestamp": sample.at,
        }),
    };
    format!("{}{}\n", tag, payload)
}
