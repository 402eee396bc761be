//! Window-tree compositor.
//!
//! Windows form a tree of rectangles positioned relative to their parents.
//! Changes to the tree queue damage rectangles; [`WindowSystem::update`]
//! repaints every window overlapping the damage in z-order, and
//! [`WindowSystem::step`] routes input to the captured, focused or hit
//! window, honouring nested modal contexts.

pub mod config;
pub mod constants;
pub mod damage;
pub mod drivers;
pub mod error;
pub mod event;
pub mod event_loop;
pub mod graphics;
pub mod rect;
pub mod system;
pub mod tracing_sub;
pub mod window;

pub use config::{CompositorConfig, ConfigError};
pub use damage::DamageList;
pub use drivers::timer::{Clock, ManualClock, SystemClock, TimerId};
pub use error::{Result, WindowError};
pub use event::{Event, Key, Modifiers, MouseButton};
pub use graphics::{Color, Graphics, GraphicsError};
pub use rect::{Point, Rect, RectError, Size};
pub use system::{ModalMode, WindowSystem, WindowSystemBuilder};
pub use window::{
    CursorShape, KeyEvent, MouseEvent, PaintContext, WindowFlags, WindowHandler, WindowId,
};
