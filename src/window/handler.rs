use crate::drivers::timer::TimerId;
use crate::event::{Key, Modifiers, MouseButton};
use crate::graphics::{Color, Graphics};
use crate::rect::{Point, Rect};
use crate::system::WindowSystem;

use super::WindowId;

/// Pointer event delivered to a window handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    /// Window receiving this delivery; changes while the event bubbles.
    pub window: WindowId,
    /// Position in the receiving window's local space.
    pub x: i32,
    pub y: i32,
    /// Position in absolute (root) space.
    pub screen: Point,
    /// `None` for plain moves.
    pub button: Option<MouseButton>,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub window: WindowId,
    pub key: Key,
    pub modifiers: Modifiers,
}

/// Event-handler slots of a window.
///
/// Every method has a no-op default. Input handlers return `true` when they
/// handled the event, which stops bubbling to the parent; paint return
/// values are informational only, every window overlapping the damage is
/// painted regardless.
///
/// Handlers receive the [`WindowSystem`] so they can restructure the tree,
/// move capture or focus, and enter or leave modal state from inside a
/// callback.
pub trait WindowHandler {
    fn on_paint(&mut self, _ctx: &mut PaintContext<'_>) -> bool {
        false
    }

    fn on_mouse_move(&mut self, _sys: &mut WindowSystem, _event: &MouseEvent) -> bool {
        false
    }

    fn on_mouse_button_down(&mut self, _sys: &mut WindowSystem, _event: &MouseEvent) -> bool {
        false
    }

    fn on_mouse_button_up(&mut self, _sys: &mut WindowSystem, _event: &MouseEvent) -> bool {
        false
    }

    fn on_mouse_enter(&mut self, _sys: &mut WindowSystem, _window: WindowId) {}

    fn on_mouse_leave(&mut self, _sys: &mut WindowSystem, _window: WindowId) {}

    /// The cursor rested inside the window for its hover delay.
    fn on_mouse_hover(&mut self, _sys: &mut WindowSystem, _event: &MouseEvent) {}

    fn on_key_down(&mut self, _sys: &mut WindowSystem, _event: &KeyEvent) -> bool {
        false
    }

    fn on_key_up(&mut self, _sys: &mut WindowSystem, _event: &KeyEvent) -> bool {
        false
    }

    fn on_focus_gained(&mut self, _sys: &mut WindowSystem, _window: WindowId) {}

    fn on_focus_lost(&mut self, _sys: &mut WindowSystem, _window: WindowId) {}

    fn on_timer(&mut self, _sys: &mut WindowSystem, _window: WindowId, _timer: TimerId) {}

    /// Called once while the window is being removed from the tree. The
    /// system is mid-teardown, so no system access is offered.
    fn on_destroy(&mut self, _window: WindowId) {}
}

/// Drawing context handed to [`WindowHandler::on_paint`].
///
/// The backend clip is already set to the damaged part of the window.
/// Helper methods take window-local coordinates; [`PaintContext::graphics`]
/// exposes the raw backend in absolute coordinates.
pub struct PaintContext<'a> {
    window: WindowId,
    gfx: &'a mut dyn Graphics,
    bounds: Rect,
    clip: Rect,
}

impl<'a> PaintContext<'a> {
    pub(crate) fn new(window: WindowId, gfx: &'a mut dyn Graphics, bounds: Rect, clip: Rect) -> Self {
        Self {
            window,
            gfx,
            bounds,
            clip,
        }
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    /// Window rectangle in absolute space, before clipping.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Absolute rectangle being repainted.
    pub fn clip(&self) -> Rect {
        self.clip
    }

    /// Window rectangle in its own local space.
    pub fn local_bounds(&self) -> Rect {
        Rect::new(0, 0, self.bounds.w(), self.bounds.h())
    }

    pub fn local_clip(&self) -> Rect {
        self.clip.translated(-self.bounds.x(), -self.bounds.y())
    }

    pub fn graphics(&mut self) -> &mut dyn Graphics {
        self.gfx
    }

    pub fn set_color(&mut self, color: Color) {
        self.gfx.set_color(color);
    }

    pub fn fill_rect(&mut self, local: Rect) {
        self.gfx.fill_rect(self.to_absolute(local));
    }

    pub fn stroke_rect(&mut self, local: Rect) {
        self.gfx.stroke_rect(self.to_absolute(local));
    }

    pub fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        self.gfx
            .draw_text(self.bounds.x() + x, self.bounds.y() + y, text);
    }

    /// Fill the whole window with `color`.
    pub fn clear(&mut self, color: Color) {
        self.gfx.set_color(color);
        self.gfx.fill_rect(self.bounds);
    }

    fn to_absolute(&self, local: Rect) -> Rect {
        local.translated(self.bounds.x(), self.bounds.y())
    }
}
