// Common test utilities for integration tests
//
// Shared geometry, expected-picture and loopback networking helpers for the
// reconstruction, relay and session suites.

#![allow(dead_code)]

use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};
use vga_view::engine::compositor::scale_channel;
use vga_view::engine::{Porches, Rgb, SyncPolarity, TimingGeometry, TimingSettings};
use vga_view::signal::Pattern;
use vga_view::Framebuffer;

/// How long loopback tests wait for something to happen
pub const NETWORK_TIMEOUT: Duration = Duration::from_secs(5);

/// 32×16 visible with every porch non-zero
///
/// The HS pulse is no wider than the back porch, so the blanking driven
/// during the pulse stays left of the visible window.
pub fn test_settings(polarity: SyncPolarity, color_depth: u8) -> TimingSettings {
    TimingSettings {
        width: 32,
        height: 16,
        horizontal: Porches::new(2, 4, 6),
        vertical: Porches::new(1, 2, 3),
        polarity,
        color_depth,
    }
}

pub fn test_geometry(polarity: SyncPolarity, color_depth: u8) -> TimingGeometry {
    TimingGeometry::new(test_settings(polarity, color_depth)).unwrap()
}

/// The picture a pattern should reconstruct to
pub fn expected_frame(geometry: &TimingGeometry, pattern: Pattern) -> Framebuffer {
    let depth = geometry.color_depth();
    let mut frame = Framebuffer::new(geometry.width() as usize, geometry.height() as usize);
    for y in 0..geometry.height() {
        for x in 0..geometry.width() {
            let (r, g, b) = pattern.color(geometry, x, y);
            let color = Rgb::new(
                scale_channel(r, depth),
                scale_channel(g, depth),
                scale_channel(b, depth),
            );
            frame.set_pixel(x as usize, y as usize, color);
        }
    }
    frame
}

/// First differing pixel, for readable assertion failures
pub fn first_mismatch(actual: &Framebuffer, expected: &Framebuffer) -> Option<(usize, usize)> {
    for y in 0..expected.height() {
        for x in 0..expected.width() {
            if actual.get_pixel(x, y) != expected.get_pixel(x, y) {
                return Some((x, y));
            }
        }
    }
    None
}

/// Poll `condition` until it holds or the timeout passes
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + NETWORK_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Open a plain client connection to a relay
pub fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(NETWORK_TIMEOUT)).unwrap();
    stream
}
