// VGA Viewer Library
// Core library for reconstructing a VGA picture from simulated signal events

// Public modules
pub mod config;
pub mod display;
pub mod engine;
pub mod input;
pub mod net;
pub mod screenshot;
pub mod session;
pub mod signal;

// Re-export main types for convenience
pub use config::{ConfigError, ViewerConfig, CONFIG_FILE};
pub use display::Framebuffer;
#[cfg(feature = "gui")]
pub use display::{run_viewer, ViewerWindow, WindowConfig};
pub use engine::{
    DecodeError, EngineStats, Event, GeometryError, IngestReport, ReconstructionEngine, Rgb,
    SyncPolarity, TimingGeometry, TimingSettings,
};
pub use input::{Button, GamepadReporter, GamepadState};
pub use net::{Connection, Relay, RelayError, RelayHandle};
pub use screenshot::{save_png, save_screenshot, ScreenshotError};
pub use session::{HeadlessOutcome, PumpReport, Session, SessionError};
pub use signal::{Pattern, SignalGenerator};
