// Event Model - The three kinds of timing events carried by the stream

use super::clock::Timestamp;

/// A level change on one of the sync lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncEdge {
    /// Raw wire level after the change
    pub level: bool,
    /// When the change happened
    pub at: Timestamp,
}

/// A new color on the DAC outputs, at the wire's reduced bit depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSample {
    /// Red sample
    pub r: u32,
    /// Green sample
    pub g: u32,
    /// Blue sample
    pub b: u32,
    /// When the change happened
    pub at: Timestamp,
}

/// One decoded timing event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Horizontal sync changed level
    HSync(SyncEdge),
    /// Vertical sync changed level
    VSync(SyncEdge),
    /// Pixel color changed
    Color(ColorSample),
}

impl Event {
    /// Timestamp carried by the event
    pub fn at(&self) -> Timestamp {
        match self {
            Event::HSync(edge) | Event::VSync(edge) => edge.at,
            Event::Color(sample) => sample.at,
        }
    }

    /// Whether the event is a sync edge (horizontal or vertical)
    pub fn is_sync(&self) -> bool {
        matches!(self, Event::HSync(_) | Event::VSync(_))
    }
}

/// An 8-bit-per-channel color as stored in the framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Rgb {
    /// Black
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    /// Create a color from full-range channels
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as an array in R, G, B order
    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_timestamp() {
        let hs = Event::HSync(SyncEdge { level: true, at: 7 });
        let rgb = Event::Color(ColorSample { r: 1, g: 2, b: 3, at: 9 });
        assert_eq!(hs.at(), 7);
        assert_eq!(rgb.at(), 9);
        assert!(hs.is_sync());
        assert!(!rgb.is_sync());
    }

    #[test]
    fn test_rgb_array() {
        assert_eq!(Rgb::new(1, 2, 3).to_array(), [1, 2, 3]);
        assert_eq!(Rgb::default(), Rgb::BLACK);
    }
}
