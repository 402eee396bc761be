use crossterm::event::{self as ct, KeyCode, KeyEventKind, KeyModifiers};

use crate::event::{Event, Key, Modifiers};

use super::mouse::translate_mouse;

pub fn translate_modifiers(mods: KeyModifiers) -> Modifiers {
    let mut out = Modifiers::empty();
    if mods.contains(KeyModifiers::SHIFT) {
        out |= Modifiers::SHIFT;
    }
    if mods.contains(KeyModifiers::CONTROL) {
        out |= Modifiers::CONTROL;
    }
    if mods.contains(KeyModifiers::ALT) {
        out |= Modifiers::ALT;
    }
    if mods.intersects(KeyModifiers::SUPER | KeyModifiers::META) {
        out |= Modifiers::SUPER;
    }
    out
}

pub fn translate_key(code: KeyCode) -> Key {
    match code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Esc,
        KeyCode::Tab => Key::Tab,
        KeyCode::BackTab => Key::BackTab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Insert => Key::Insert,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::F(n) => Key::F(n),
        _ => Key::Unknown,
    }
}

/// Turns raw crossterm events into window-system events.
///
/// Shift+Tab is folded into `BackTab`. Windows consoles report repeats and
/// releases for every key and a held Esc as a stream of presses; those are
/// collapsed so a single physical press yields a single `KeyDown`.
#[derive(Default)]
pub struct KeyboardNormalizer {
    esc_down: bool,
    modifiers: Modifiers,
}

impl KeyboardNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Modifiers carried by the last translated event.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn normalize(&mut self, evt: ct::Event) -> Option<Event> {
        match evt {
            ct::Event::Key(mut key) => {
                if key.code == KeyCode::Tab && key.modifiers.contains(KeyModifiers::SHIFT) {
                    key.code = KeyCode::BackTab;
                    key.modifiers.remove(KeyModifiers::SHIFT);
                }
                let modifiers = translate_modifiers(key.modifiers);
                self.modifiers = modifiers;
                let code = translate_key(key.code);
                if cfg!(windows) {
                    match key.kind {
                        KeyEventKind::Release => {
                            if key.code == KeyCode::Esc {
                                self.esc_down = false;
                            }
                            return Some(Event::KeyUp {
                                key: code,
                                modifiers,
                            });
                        }
                        KeyEventKind::Repeat => return None,
                        KeyEventKind::Press => {}
                    }
                    if key.code == KeyCode::Esc {
                        if self.esc_down {
                            return None;
                        }
                        self.esc_down = true;
                    } else {
                        self.esc_down = false;
                    }
                } else if key.kind == KeyEventKind::Release {
                    return Some(Event::KeyUp {
                        key: code,
                        modifiers,
                    });
                }
                Some(Event::KeyDown {
                    key: code,
                    modifiers,
                })
            }
            ct::Event::Mouse(mouse) => {
                self.modifiers = translate_modifiers(mouse.modifiers);
                translate_mouse(mouse)
            }
            ct::Event::Resize(width, height) => Some(Event::Resize {
                width: i32::from(width),
                height: i32::from(height),
            }),
            _ => None,
        }
    }
}
