//! Pointer and keyboard input delivered by the host.

use serde::{Deserialize, Serialize};

/// Pointer buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// Keyboard keys (the subset the editor reacts to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    /// Printable key, lowercase
    Char(char),
    Enter,
    Escape,
    Backspace,
    Delete,
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    /// Arrow direction as a unit delta (y down), if this is an arrow key.
    pub fn arrow_delta(&self) -> Option<(f32, f32)> {
        match self {
            Key::Up => Some((0.0, -1.0)),
            Key::Down => Some((0.0, 1.0)),
            Key::Left => Some((-1.0, 0.0)),
            Key::Right => Some((1.0, 0.0)),
            _ => None,
        }
    }

    /// Normalize character keys to lowercase.
    pub fn normalized(self) -> Key {
        match self {
            Key::Char(c) => Key::Char(c.to_ascii_lowercase()),
            other => other,
        }
    }
}

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}
