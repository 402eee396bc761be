//! Window nodes: identifiers, flags, and the per-node record kept in the
//! [`WindowTree`] arena.

mod handler;
mod tree;

use std::time::Duration;

use crate::rect::{Point, Rect};

pub use handler::{KeyEvent, MouseEvent, PaintContext, WindowHandler};
pub use tree::WindowTree;

/// Generational handle of a window. A handle outlives its window; once the
/// window is destroyed every query with it reports a stale window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u32, u32);

impl WindowId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

bitflags::bitflags! {
    /// Per-window behaviour switches.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct WindowFlags: u8 {
        /// Window and its subtree are painted and hit-tested.
        const VISIBLE        = 0b0000_0001;
        /// Children are clipped to this window's rectangle.
        const CLIP_CHILDREN  = 0b0000_0010;
        /// Unhandled input is re-dispatched to the parent.
        const BUBBLE_EVENTS  = 0b0000_0100;
        /// Window takes part in pointer hit-testing.
        const HANDLE_EVENTS  = 0b0000_1000;
    }
}

impl Default for WindowFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::CLIP_CHILDREN | Self::BUBBLE_EVENTS | Self::HANDLE_EVENTS
    }
}

/// Pointer shape requested while the cursor is over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CursorShape {
    #[default]
    Arrow,
    Text,
    Hand,
    Crosshair,
    Move,
    ResizeHorizontal,
    ResizeVertical,
    Wait,
    Hidden,
}

pub(crate) struct Window {
    pub(crate) generation: u32,
    pub(crate) parent: Option<WindowId>,
    /// Paint order: the last child is drawn last and is topmost.
    pub(crate) children: Vec<WindowId>,
    /// Position and size in the parent's content space.
    pub(crate) rect: Rect,
    /// Scroll offset applied to the content (and children) of this window.
    pub(crate) origin: Point,
    pub(crate) flags: WindowFlags,
    pub(crate) cursor: CursorShape,
    /// `None` inherits the system default.
    pub(crate) hover_delay: Option<Duration>,
    /// Empty while the handler is running or when none was installed.
    pub(crate) handler: Option<Box<dyn WindowHandler>>,
}

impl Window {
    pub(crate) fn new(generation: u32, parent: Option<WindowId>, rect: Rect) -> Self {
        Self {
            generation,
            parent,
            children: Vec::new(),
            rect,
            origin: Point::default(),
            flags: WindowFlags::default(),
            cursor: CursorShape::default(),
            hover_delay: None,
            handler: None,
        }
    }

    pub(crate) fn visible(&self) -> bool {
        self.flags.contains(WindowFlags::VISIBLE)
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("rect", &self.rect)
            .field("origin", &self.origin)
            .field("flags", &self.flags)
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}
