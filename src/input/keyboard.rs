// Keyboard input mapping module
//
// Maps physical keys to gamepad buttons. The default layout is WASD for the
// D-pad with M and K as the A and B buttons.

use super::Button;
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keyboard mapping configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardMapping {
    /// Key for Up on D-pad
    pub up: KeyCode,
    /// Key for Down on D-pad
    pub down: KeyCode,
    /// Key for Left on D-pad
    pub left: KeyCode,
    /// Key for Right on D-pad
    pub right: KeyCode,
    /// Key for A button
    pub button_a: KeyCode,
    /// Key for B button
    pub button_b: KeyCode,
}

impl KeyboardMapping {
    /// Create the default keyboard mapping
    ///
    /// # Default Mappings
    /// - WASD: D-pad
    /// - M: A button
    /// - K: B button
    pub fn default_mapping() -> Self {
        Self {
            up: KeyCode::KeyW,
            down: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
            button_a: KeyCode::KeyM,
            button_b: KeyCode::KeyK,
        }
    }

    /// Get the button for a given key code
    ///
    /// # Arguments
    /// * `key` - The key code to check
    ///
    /// # Returns
    /// Some(Button) if the key is mapped to a button, None otherwise
    pub fn get_button(&self, key: KeyCode) -> Option<Button> {
        [
            (self.up, Button::Up),
            (self.down, Button::Down),
            (self.left, Button::Left),
            (self.right, Button::Right),
            (self.button_a, Button::A),
            (self.button_b, Button::B),
        ]
        .into_iter()
        .find_map(|(code, button)| (code == key).then_some(button))
    }

    /// Button for a physical key, if it is a mapped key code
    pub fn button_for(&self, physical_key: PhysicalKey) -> Option<Button> {
        match physical_key {
            PhysicalKey::Code(code) => self.get_button(code),
            PhysicalKey::Unidentified(_) => None,
        }
    }
}

impl Default for KeyboardMapping {
    fn default() -> Self {
        Self::default_mapping()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_mapping_default() {
        let mapping = KeyboardMapping::default_mapping();
        assert_eq!(mapping.up, KeyCode::KeyW);
        assert_eq!(mapping.down, KeyCode::KeyS);
        assert_eq!(mapping.left, KeyCode::KeyA);
        assert_eq!(mapping.right, KeyCode::KeyD);
        assert_eq!(mapping.button_a, KeyCode::KeyM);
        assert_eq!(mapping.button_b, KeyCode::KeyK);
    }

    #[test]
    fn test_keyboard_mapping_get_button() {
        let mapping = KeyboardMapping::default();
        assert_eq!(mapping.get_button(KeyCode::KeyM), Some(Button::A));
        assert_eq!(mapping.get_button(KeyCode::KeyK), Some(Button::B));
        assert_eq!(mapping.get_button(KeyCode::KeyW), Some(Button::Up));
        assert_eq!(mapping.get_button(KeyCode::KeyQ), None);
    }

    #[test]
    fn test_button_for_physical_key() {
        let mapping = KeyboardMapping::default();
        assert_eq!(
            mapping.button_for(PhysicalKey::Code(KeyCode::KeyD)),
            Some(Button::Right)
        );
        assert_eq!(mapping.button_for(PhysicalKey::Code(KeyCode::F9)), None);
    }
}
