//! Backend-neutral input events consumed by the window system.

use crate::rect::{Point, Size};

bitflags::bitflags! {
    /// Keyboard modifiers held while an event was produced.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT   = 0b0000_0001;
        const CONTROL = 0b0000_0010;
        const ALT     = 0b0000_0100;
        const SUPER   = 0b0000_1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    WheelUp,
    WheelDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    Tab,
    BackTab,
    Backspace,
    Delete,
    Insert,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
    Unknown,
}

/// One input event as delivered by an [`InputDriver`](crate::drivers::InputDriver).
///
/// Pointer coordinates are absolute device coordinates; the window system
/// rescales them to its base resolution before hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    MouseMove {
        x: i32,
        y: i32,
        modifiers: Modifiers,
    },
    MouseDown {
        x: i32,
        y: i32,
        button: MouseButton,
        modifiers: Modifiers,
    },
    MouseUp {
        x: i32,
        y: i32,
        button: MouseButton,
        modifiers: Modifiers,
    },
    KeyDown {
        key: Key,
        modifiers: Modifiers,
    },
    KeyUp {
        key: Key,
        modifiers: Modifiers,
    },
    Resize {
        width: i32,
        height: i32,
    },
    Quit,
}

impl Event {
    pub fn mouse_move(x: i32, y: i32) -> Self {
        Self::MouseMove {
            x,
            y,
            modifiers: Modifiers::empty(),
        }
    }

    pub fn mouse_down(x: i32, y: i32, button: MouseButton) -> Self {
        Self::MouseDown {
            x,
            y,
            button,
            modifiers: Modifiers::empty(),
        }
    }

    pub fn mouse_up(x: i32, y: i32, button: MouseButton) -> Self {
        Self::MouseUp {
            x,
            y,
            button,
            modifiers: Modifiers::empty(),
        }
    }

    pub fn key_down(key: Key) -> Self {
        Self::KeyDown {
            key,
            modifiers: Modifiers::empty(),
        }
    }

    pub fn key_up(key: Key) -> Self {
        Self::KeyUp {
            key,
            modifiers: Modifiers::empty(),
        }
    }

    pub fn is_quit(&self) -> bool {
        matches!(self, Self::Quit)
    }

    /// Pointer position carried by mouse events.
    pub fn position(&self) -> Option<Point> {
        match *self {
            Self::MouseMove { x, y, .. }
            | Self::MouseDown { x, y, .. }
            | Self::MouseUp { x, y, .. } => Some(Point::new(x, y)),
            _ => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match *self {
            Self::MouseMove { modifiers, .. }
            | Self::MouseDown { modifiers, .. }
            | Self::MouseUp { modifiers, .. }
            | Self::KeyDown { modifiers, .. }
            | Self::KeyUp { modifiers, .. } => modifiers,
            Self::Resize { .. } | Self::Quit => Modifiers::empty(),
        }
    }

    /// Map pointer coordinates from a `device` resolution into `base`.
    pub fn scaled(self, device: Size, base: Size) -> Self {
        if device == base || device.w <= 0 || device.h <= 0 {
            return self;
        }
        let sx = |x: i32| (i64::from(x) * i64::from(base.w) / i64::from(device.w)) as i32;
        let sy = |y: i32| (i64::from(y) * i64::from(base.h) / i64::from(device.h)) as i32;
        match self {
            Self::MouseMove { x, y, modifiers } => Self::MouseMove {
                x: sx(x),
                y: sy(y),
                modifiers,
            },
            Self::MouseDown {
                x,
                y,
                button,
                modifiers,
            } => Self::MouseDown {
                x: sx(x),
                y: sy(y),
                button,
                modifiers,
            },
            Self::MouseUp {
                x,
                y,
                button,
                modifiers,
            } => Self::MouseUp {
                x: sx(x),
                y: sy(y),
                button,
                modifiers,
            },
            other => other,
        }
    }
}
