// Display module - Holds the reconstructed picture and shows it
//
// This module provides:
// - Framebuffer (visible resolution, RGB)
// - Viewer window with scaling support, behind the `gui` feature

pub mod framebuffer;
#[cfg(feature = "gui")]
pub mod window;

pub use framebuffer::{Framebuffer, BYTES_PER_PIXEL};
#[cfg(feature = "gui")]
pub use window::{run_viewer, DisplayError, ViewerWindow, WindowConfig, PUMP_BUDGET};
