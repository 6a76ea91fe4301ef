// Input module - Gamepad reporter for the simulated gamepad model
//
// Button state is sent to the relay as one record per change:
//
//   [gamepad]-{"u":false,"d":false,"l":false,"r":false,"a":true,"b":false}
//
// Keyboard and physical gamepad mappings live behind the `gui` feature.

#[cfg(feature = "gui")]
pub mod gamepad;
#[cfg(feature = "gui")]
pub mod keyboard;

#[cfg(feature = "gui")]
pub use gamepad::{GamepadHandler, GamepadMapping};
#[cfg(feature = "gui")]
pub use keyboard::KeyboardMapping;

use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use tracing::debug;

/// Source tag of gamepad records
pub const GAMEPAD_SOURCE_TAG: &str = "[gamepad]-";

/// Gamepad button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// Up on D-pad
    Up,
    /// Down on D-pad
    Down,
    /// Left on D-pad
    Left,
    /// Right on D-pad
    Right,
    /// A button
    A,
    /// B button
    B,
}

/// Pressed state of every button, in wire field order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamepadState {
    /// Up on D-pad
    #[serde(rename = "u")]
    pub up: bool,
    /// Down on D-pad
    #[serde(rename = "d")]
    pub down: bool,
    /// Left on D-pad
    #[serde(rename = "l")]
    pub left: bool,
    /// Right on D-pad
    #[serde(rename = "r")]
    pub right: bool,
    /// A button
    #[serde(rename = "a")]
    pub a: bool,
    /// B button
    #[serde(rename = "b")]
    pub b: bool,
}

impl GamepadState {
    /// Set one button; returns true if its state changed
    pub fn set(&mut self, button: Button, pressed: bool) -> bool {
        let slot = match button {
            Button::Up => &mut self.up,
            Button::Down => &mut self.down,
            Button::Left => &mut self.left,
            Button::Right => &mut self.right,
            Button::A => &mut self.a,
            Button::B => &mut self.b,
        };
        let changed = *slot != pressed;
        *slot = pressed;
        changed
    }

    /// Whether a button is pressed
    pub fn is_pressed(&self, button: Button) -> bool {
        match button {
            Button::Up => self.up,
            Button::Down => self.down,
            Button::Left => self.left,
            Button::Right => self.right,
            Button::A => self.a,
            Button::B => self.b,
        }
    }

    /// Encode as a newline-terminated wire record
    pub fn to_record(&self, tag: &str) -> Result<String, serde_json::Error> {
        Ok(format!("{}{}\n", tag, serde_json::to_string(self)?))
    }
}

/// Sends the gamepad state to the relay whenever it changes
#[derive(Debug)]
pub struct GamepadReporter<W: Write> {
    writer: W,
    tag: String,
    state: GamepadState,
}

impl<W: Write> GamepadReporter<W> {
    /// Create a reporter writing records prefixed by `tag`
    pub fn new(writer: W, tag: impl Into<String>) -> Self {
        Self {
            writer,
            tag: tag.into(),
            state: GamepadState::default(),
        }
    }

    /// Current button state
    pub fn state(&self) -> GamepadState {
        self.state
    }

    /// Apply a press or release; sends a record if the state changed
    ///
    /// # Returns
    /// Whether a record was sent
    pub fn update(&mut self, button: Button, pressed: bool) -> io::Result<bool> {
        if !self.state.set(button, pressed) {
            return Ok(false);
        }
        let record = self.state.to_record(&self.tag)?;
        debug!(record = record.trim_end(), "gamepad -> relay");
        self.writer.write_all(record.as_bytes())?;
        self.writer.flush()?;
        Ok(true)
    }

    /// Release every button, sending one record per released button
    pub fn release_all(&mut self) -> io::Result<()> {
        for button in [
            Button::Up,
            Button::Down,
            Button::Left,
            Button::Right,
            Button::A,
            Button::B,
        ] {
            self.update(button, false)?;
        }
        Ok(())
    }

    /// Borrow the underlying writer
    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}
