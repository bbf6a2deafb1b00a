//! Input events as the host delivers them to the canvas.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Key text that cycles through select candidates.
pub const KEY_SPACE: &str = " ";
/// Key text that cancels the select tool.
pub const KEY_ESCAPE: &str = "\u{1b}";

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
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

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    /// Keys held in either set.
    pub fn union(self, other: Modifiers) -> Modifiers {
        Modifiers {
            shift: self.shift || other.shift,
            ctrl: self.ctrl || other.ctrl,
            alt: self.alt || other.alt,
            meta: self.meta || other.meta,
        }
    }

    pub fn is_empty(self) -> bool {
        self == Modifiers::NONE
    }
}

/// What a wheel event asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WheelKind {
    Scroll,
    /// Wheel turned with ctrl held.
    Zoom,
}

/// Pointer event in device coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        global: Point,
        button: MouseButton,
        modifiers: Modifiers,
    },
    Up {
        position: Point,
        global: Point,
        button: MouseButton,
        modifiers: Modifiers,
    },
    Move {
        position: Point,
    },
    Scroll {
        delta: Vec2,
        modifiers: Modifiers,
    },
}

/// Keyboard event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed { text: String, modifiers: Modifiers },
    Released { text: String },
}
