// Gamepad input mapping module
//
// Maps physical controller buttons (via gilrs) to gamepad buttons. Button
// changes are returned to the caller, which forwards them to the reporter.

use super::Button;
use gilrs::{Button as GilrsButton, Event, EventType, Gilrs};
use tracing::{info, warn};

/// Gamepad mapping configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamepadMapping {
    /// Button for Up on D-pad
    pub up: GilrsButton,
    /// Button for Down on D-pad
    pub down: GilrsButton,
    /// Button for Left on D-pad
    pub left: GilrsButton,
    /// Button for Right on D-pad
    pub right: GilrsButton,
    /// Button for A
    pub button_a: GilrsButton,
    /// Button for B
    pub button_b: GilrsButton,
}

impl GamepadMapping {
    /// Create default gamepad mapping
    ///
    /// # Default Mappings (Standard Gamepad Layout)
    /// - D-pad: D-pad buttons
    /// - East button (B/Circle): A button
    /// - South button (A/Cross): B button
    pub fn default_mapping() -> Self {
        Self {
            up: GilrsButton::DPadUp,
            down: GilrsButton::DPadDown,
            left: GilrsButton::DPadLeft,
            right: GilrsButton::DPadRight,
            button_a: GilrsButton::East,
            button_b: GilrsButton::South,
        }
    }

    /// Get the button for a given controller button
    ///
    /// # Returns
    /// Some(Button) if the controller button is mapped, None otherwise
    pub fn get_button(&self, button: GilrsButton) -> Option<Button> {
        [
            (self.up, Button::Up),
            (self.down, Button::Down),
            (self.left, Button::Left),
            (self.right, Button::Right),
            (self.button_a, Button::A),
            (self.button_b, Button::B),
        ]
        .into_iter()
        .find_map(|(mapped, target)| (mapped == button).then_some(target))
    }
}

impl Default for GamepadMapping {
    fn default() -> Self {
        Self::default_mapping()
    }
}

/// Physical gamepad input handler
///
/// Every connected controller drives the same buttons.
pub struct GamepadHandler {
    /// Gilrs instance for gamepad events
    gilrs: Gilrs,
    /// Button mapping
    mapping: GamepadMapping,
}

impl GamepadHandler {
    /// Initialize gamepad support
    ///
    /// # Returns
    /// None if the platform backend is unavailable; keyboard input still works
    pub fn new(mapping: GamepadMapping) -> Option<Self> {
        match Gilrs::new() {
            Ok(gilrs) => {
                for (id, gamepad) in gilrs.gamepads() {
                    info!(id = usize::from(id), name = gamepad.name(), "gamepad found");
                }
                Some(Self { gilrs, mapping })
            }
            Err(err) => {
                warn!(error = %err, "gamepad support unavailable");
                None
            }
        }
    }

    /// Process pending gamepad events
    ///
    /// # Returns
    /// Mapped button changes, in order, as (button, pressed)
    pub fn update(&mut self) -> Vec<(Button, bool)> {
        let mut changes = Vec::new();
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::ButtonPressed(button, _) => {
                    if let Some(mapped) = self.mapping.get_button(button) {
                        changes.push((mapped, true));
                    }
                }
                EventType::ButtonReleased(button, _) => {
                    if let Some(mapped) = self.mapping.get_button(button) {
                        changes.push((mapped, false));
                    }
                }
                EventType::Connected => info!(id = usize::from(id), "gamepad connected"),
                EventType::Disconnected => info!(id = usize::from(id), "gamepad disconnected"),
                _ => {}
            }
        }
        changes
    }

    /// Active button mapping
    pub fn mapping(&self) -> &GamepadMapping {
        &self.mapping
    }
}
