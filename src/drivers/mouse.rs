use crossterm::event::{self as ct, MouseEventKind};

use crate::event::{Event, MouseButton};

use super::keyboard::translate_modifiers;

fn translate_button(button: ct::MouseButton) -> MouseButton {
    match button {
        ct::MouseButton::Left => MouseButton::Left,
        ct::MouseButton::Right => MouseButton::Right,
        ct::MouseButton::Middle => MouseButton::Middle,
    }
}

/// Map a terminal mouse report to an event in cell coordinates. Drags are
/// plain moves; the window system tracks button state through capture.
/// Wheel notches become presses of the wheel buttons.
pub fn translate_mouse(mouse: ct::MouseEvent) -> Option<Event> {
    let x = i32::from(mouse.column);
    let y = i32::from(mouse.row);
    let modifiers = translate_modifiers(mouse.modifiers);
    let event = match mouse.kind {
        MouseEventKind::Down(button) => Event::MouseDown {
            x,
            y,
            button: translate_button(button),
            modifiers,
        },
        MouseEventKind::Up(button) => Event::MouseUp {
            x,
            y,
            button: translate_button(button),
            modifiers,
        },
        MouseEventKind::Drag(_) | MouseEventKind::Moved => Event::MouseMove { x, y, modifiers },
        MouseEventKind::ScrollUp => Event::MouseDown {
            x,
            y,
            button: MouseButton::WheelUp,
            modifiers,
        },
        MouseEventKind::ScrollDown => Event::MouseDown {
            x,
            y,
            button: MouseButton::WheelDown,
            modifiers,
        },
        MouseEventKind::ScrollLeft | MouseEventKind::ScrollRight => return None,
    };
    Some(event)
}
