// Window module - Live viewer window
//
// Owns a session, drains it between window events and paints the
// reconstructed picture using the winit and pixels crates. The pixel buffer
// has the visible resolution; pixels scales it to the window.

use crate::config::{ScreenshotConfig, ViewerConfig};
use crate::input::{GamepadHandler, GamepadMapping, GamepadReporter, KeyboardMapping};
use crate::screenshot::save_screenshot;
use crate::session::Session;
use pixels::{Pixels, SurfaceTexture};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Transport chunks consumed per event-loop iteration
pub const PUMP_BUDGET: usize = 256;

/// Errors that stop the viewer
#[derive(Debug, Error)]
pub enum DisplayError {
    /// The event loop could not be created or failed
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// The window could not be created
    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),

    /// The pixel surface failed
    #[error("render error: {0}")]
    Pixels(#[from] pixels::Error),
}

/// Window configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Visible width of the picture
    pub width: u32,
    /// Visible height of the picture
    pub height: u32,
    /// Scale factor (1x, 2x, 3x, 4x, etc.)
    pub scale: u32,
    /// Target frame rate in Hz
    pub target_fps: u32,
    /// Whether to enable VSync
    pub vsync: bool,
}

impl WindowConfig {
    /// Create a new window configuration for a picture size
    ///
    /// Default: 1x scale, 60 FPS, VSync enabled
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scale: 1,
            target_fps: 60,
            vsync: true,
        }
    }

    /// Window configuration from the viewer settings
    pub fn from_viewer(config: &ViewerConfig) -> Self {
        Self::new(config.timing.width, config.timing.height)
            .with_scale(config.display.scale)
            .with_fps(config.display.fps)
            .with_vsync(config.display.vsync)
    }

    /// Set the scale factor
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.clamp(1, 8); // Clamp between 1x and 8x
        self
    }

    /// Set the target frame rate
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps.max(1);
        self
    }

    /// Set VSync enabled or disabled
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Get the window width in pixels
    pub fn window_width(&self) -> u32 {
        self.width * self.scale
    }

    /// Get the window height in pixels
    pub fn window_height(&self) -> u32 {
        self.height * self.scale
    }

    /// Get the frame duration for the target FPS
    pub fn frame_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.target_fps as u64)
    }
}

/// Viewer window for a live session
pub struct ViewerWindow {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    config: WindowConfig,
    session: Session,
    screenshot: ScreenshotConfig,
    keyboard: KeyboardMapping,
    gamepads: Option<GamepadHandler>,
    reporter: Option<GamepadReporter<TcpStream>>,
    redraw_pending: bool,
    last_frame_time: Instant,
    error: Option<DisplayError>,
}

impl ViewerWindow {
    /// Create a viewer (the window is created when the event loop starts)
    pub fn new(config: &ViewerConfig, session: Session) -> Self {
        let reporter = if config.gamepad.enabled {
            match session.writer() {
                Ok(writer) => Some(GamepadReporter::new(writer, config.gamepad.source_tag.clone())),
                Err(err) => {
                    warn!(error = %err, "gamepad reporting disabled");
                    None
                }
            }
        } else {
            None
        };
        let gamepads = reporter
            .as_ref()
            .and_then(|_| GamepadHandler::new(GamepadMapping::default_mapping()));

        Self {
            window: None,
            pixels: None,
            config: WindowConfig::from_viewer(config),
            session,
            screenshot: config.screenshot.clone(),
            keyboard: KeyboardMapping::default_mapping(),
            gamepads,
            reporter,
            redraw_pending: true,
            last_frame_time: Instant::now(),
            error: None,
        }
    }

    /// The session being displayed
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: DisplayError) {
        error!(error = %err, "viewer stopped");
        self.error = Some(err);
        event_loop.exit();
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), DisplayError> {
        let window_attributes = Window::default_attributes()
            .with_title(format!(
                "VGA Display - {}x{}",
                self.config.width, self.config.height
            ))
            .with_inner_size(LogicalSize::new(
                self.config.window_width(),
                self.config.window_height(),
            ))
            .with_resizable(false);

        // Wrap window in Arc for shared ownership
        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let window_size = window.inner_size();

        let surface_texture =
            SurfaceTexture::new(window_size.width, window_size.height, window.clone());
        let pixels = Pixels::new(self.config.width, self.config.height, surface_texture)?;

        self.window = Some(window);
        self.pixels = Some(pixels);
        Ok(())
    }

    /// Render the current picture to the window
    fn render(&mut self) -> Result<(), pixels::Error> {
        if let Some(pixels) = &mut self.pixels {
            self.session
                .engine()
                .framebuffer()
                .to_rgba(pixels.frame_mut());
            pixels.render()?;
        }
        self.redraw_pending = false;
        Ok(())
    }

    /// Check if enough time has passed for the next frame
    fn should_render_frame(&mut self) -> bool {
        let elapsed = self.last_frame_time.elapsed();
        if self.redraw_pending || elapsed >= self.config.frame_duration() {
            self.last_frame_time = Instant::now();
            true
        } else {
            false
        }
    }

    fn report_button(&mut self, button: crate::input::Button, pressed: bool) {
        let Some(reporter) = &mut self.reporter else {
            return;
        };
        if let Err(err) = reporter.update(button, pressed) {
            warn!(error = %err, "gamepad reporting stopped");
            self.reporter = None;
        }
    }

    fn take_screenshot(&self) {
        let frame = self.session.snapshot();
        match save_screenshot(
            &frame,
            &self.screenshot.screenshot_directory,
            self.screenshot.include_timestamp,
        ) {
            Ok(path) => info!(path = %path.display(), "screenshot saved"),
            Err(err) => warn!(error = %err, "screenshot failed"),
        }
    }
}

impl ApplicationHandler for ViewerWindow {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.create_window(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("close requested, exiting");
                if let Some(reporter) = &mut self.reporter {
                    if let Err(err) = reporter.release_all() {
                        warn!(error = %err, "could not release gamepad buttons");
                    }
                }
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key,
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                let pressed = state == ElementState::Pressed;
                if physical_key == PhysicalKey::Code(KeyCode::F9) {
                    if pressed && !repeat {
                        self.take_screenshot();
                    }
                    return;
                }
                if let Some(button) = self.keyboard.button_for(physical_key) {
                    self.report_button(button, pressed);
                }
            }
            WindowEvent::RedrawRequested => {
                if self.should_render_frame() {
                    if let Err(err) = self.render() {
                        self.fail(event_loop, err.into());
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let was_closed = self.session.is_closed();
        let report = self.session.pump(PUMP_BUDGET);
        if report.redraw_due || (report.closed && !was_closed) {
            self.redraw_pending = true;
        }

        let changes = self
            .gamepads
            .as_mut()
            .map(GamepadHandler::update)
            .unwrap_or_default();
        for (button, pressed) in changes {
            self.report_button(button, pressed);
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }

        if self.config.vsync {
            event_loop.set_control_flow(ControlFlow::WaitUntil(
                Instant::now() + self.config.frame_duration(),
            ));
        }
    }
}

/// Create and run the viewer window until it is closed
///
/// # Returns
/// The session, so the caller can inspect the final picture
pub fn run_viewer(config: &ViewerConfig, session: Session) -> Result<Session, DisplayError> {
    let event_loop = EventLoop::new()?;

    // Set control flow based on VSync setting
    if config.display.vsync {
        event_loop.set_control_flow(ControlFlow::Wait);
    } else {
        event_loop.set_control_flow(ControlFlow::Poll);
    }

    let mut viewer = ViewerWindow::new(config, session);
    info!(
        width = viewer.config.width,
        height = viewer.config.height,
        scale = viewer.config.scale,
        fps = viewer.config.target_fps,
        vsync = viewer.config.vsync,
        "starting viewer"
    );

    event_loop.run_app(&mut viewer)?;

    match viewer.error.take() {
        Some(err) => Err(err),
        None => Ok(viewer.session),
    }
}
