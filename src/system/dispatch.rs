//! Routing of input events to windows.
//!
//! Mouse events go to the captured window, else to the innermost window
//! under the pointer. Key events go to the focused window. While a modal
//! context is active only its window and descendants receive anything;
//! quit always gets through. Unhandled events bubble to the parent while
//! the window has [`WindowFlags::BUBBLE_EVENTS`], but never past the modal
//! window.

use tracing::{debug, trace};

use crate::event::{Event, Key, Modifiers, MouseButton};
use crate::rect::{Point, Size};
use crate::window::{KeyEvent, MouseEvent, WindowFlags, WindowId};

use super::{Deferred, WindowSystem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MouseKind {
    Move,
    Down,
    Up,
}

impl WindowSystem {
    /// Dispatch one event. Returns `false` for quit.
    pub(crate) fn dispatch(&mut self, event: Event) -> bool {
        let event = event.scaled(self.config.resolution, self.config.base());
        match event {
            Event::Quit => {
                debug!("quit event");
                return false;
            }
            Event::Resize { width, height } => {
                debug!(width, height, "device resized");
                self.config.resolution = Size::new(width, height);
                self.invalidate_all();
            }
            Event::MouseMove { x, y, modifiers } => {
                self.dispatch_mouse(MouseKind::Move, x, y, None, modifiers);
            }
            Event::MouseDown {
                x,
                y,
                button,
                modifiers,
            } => self.dispatch_mouse(MouseKind::Down, x, y, Some(button), modifiers),
            Event::MouseUp {
                x,
                y,
                button,
                modifiers,
            } => self.dispatch_mouse(MouseKind::Up, x, y, Some(button), modifiers),
            Event::KeyDown { key, modifiers } => self.dispatch_key(true, key, modifiers),
            Event::KeyUp { key, modifiers } => self.dispatch_key(false, key, modifiers),
        }
        true
    }

    /// True when `target` may receive input under the current modal context.
    fn modal_allows(&self, target: WindowId) -> bool {
        self.modal
            .top()
            .is_none_or(|modal| self.tree.is_ancestor_or_self(modal, target))
    }

    fn dispatch_mouse(
        &mut self,
        kind: MouseKind,
        x: i32,
        y: i32,
        button: Option<MouseButton>,
        modifiers: Modifiers,
    ) {
        self.pointer = Point::new(x, y);
        let path = self.tree.hit_test(x, y);
        self.update_hover(&path);

        let Some(target) = self.capture.or_else(|| path.last().copied()) else {
            return;
        };
        if !self.modal_allows(target) {
            trace!(window = ?target, "mouse event swallowed by modal");
            return;
        }
        self.deliver_mouse(target, kind, button, modifiers);
    }

    fn mouse_event_for(
        &self,
        window: WindowId,
        button: Option<MouseButton>,
        modifiers: Modifiers,
    ) -> Option<MouseEvent> {
        let origin = self.tree.absolute_origin(window)?;
        Some(MouseEvent {
            window,
            x: self.pointer.x - origin.x,
            y: self.pointer.y - origin.y,
            screen: self.pointer,
            button,
            modifiers,
        })
    }

    fn deliver_mouse(
        &mut self,
        target: WindowId,
        kind: MouseKind,
        button: Option<MouseButton>,
        modifiers: Modifiers,
    ) {
        let mut current = target;
        loop {
            let Some(event) = self.mouse_event_for(current, button, modifiers) else {
                return;
            };
            let handled = self
                .with_handler(current, |h, sys| match kind {
                    MouseKind::Move => h.on_mouse_move(sys, &event),
                    MouseKind::Down => h.on_mouse_button_down(sys, &event),
                    MouseKind::Up => h.on_mouse_button_up(sys, &event),
                })
                .unwrap_or(false);
            match self.bubble_parent(current, handled) {
                Some(parent) => current = parent,
                None => return,
            }
        }
    }

    fn dispatch_key(&mut self, down: bool, key: Key, modifiers: Modifiers) {
        let Some(target) = self.focus else {
            trace!(key = ?key, "key event without focus");
            return;
        };
        if !self.modal_allows(target) {
            trace!(window = ?target, "key event swallowed by modal");
            return;
        }
        let mut current = target;
        loop {
            let event = KeyEvent {
                window: current,
                key,
                modifiers,
            };
            let handled = self
                .with_handler(current, |h, sys| {
                    if down {
                        h.on_key_down(sys, &event)
                    } else {
                        h.on_key_up(sys, &event)
                    }
                })
                .unwrap_or(false);
            match self.bubble_parent(current, handled) {
                Some(parent) => current = parent,
                None => return,
            }
        }
    }

    /// Next window an unhandled event travels to, if any.
    fn bubble_parent(&self, current: WindowId, handled: bool) -> Option<WindowId> {
        if handled {
            return None;
        }
        // Also stops when the handler destroyed its own window.
        let node = self.tree.get(current)?;
        if !node.flags.contains(WindowFlags::BUBBLE_EVENTS) || self.modal.top() == Some(current) {
            return None;
        }
        node.parent
    }

    /// Bring the hover chain in line with `path` (outermost first). Windows
    /// left receive `on_mouse_leave` innermost first, windows entered
    /// receive `on_mouse_enter` outermost first. A window whose handler is
    /// running gets its notification once that handler returns.
    fn update_hover(&mut self, path: &[WindowId]) {
        let path: Vec<WindowId> = match self.modal.top() {
            Some(modal) => path
                .iter()
                .copied()
                .filter(|w| self.tree.is_ancestor_or_self(modal, *w))
                .collect(),
            None => path.to_vec(),
        };
        let common = self
            .hover
            .iter()
            .zip(&path)
            .take_while(|(a, b)| a == b)
            .count();
        if common == self.hover.len() && common == path.len() {
            return;
        }
        let left = self.hover.split_off(common);
        self.hover = path.clone();
        for &w in left.iter().rev() {
            self.notify(w, Deferred::Leave);
        }
        for &w in &path[common..] {
            self.notify(w, Deferred::Enter);
        }
        self.restart_hover_timer();
    }

    /// Hover delay expired for `window`.
    pub(super) fn deliver_hover(&mut self, window: WindowId) {
        if self.hover.last() != Some(&window) || !self.modal_allows(window) {
            return;
        }
        let modifiers = self.events.key_modifiers();
        let Some(event) = self.mouse_event_for(window, None, modifiers) else {
            return;
        };
        trace!(window = ?window, "hover");
        self.with_handler(window, |h, sys| h.on_mouse_hover(sys, &event));
    }
}
