//! Graphics and surface backends used during paint callbacks.
//!
//! Every coordinate handed to a [`Graphics`] backend is absolute. The window
//! system sets the clip before each paint callback; backends must discard
//! anything outside it.

mod pixel;
mod terminal;

use thiserror::Error;

use crate::rect::Rect;

pub use pixel::{PixelGraphics, PixelSurface};
pub use terminal::TerminalGraphics;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    #[error("surface is already locked")]
    SurfaceLocked,
    #[error("rectangle lies outside the surface")]
    OutOfBounds,
    #[error("graphics backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const DARK_GRAY: Color = Color::rgb(48, 48, 48);
    pub const RED: Color = Color::rgb(200, 40, 40);
    pub const GREEN: Color = Color::rgb(40, 180, 80);
    pub const BLUE: Color = Color::rgb(40, 90, 200);
    pub const YELLOW: Color = Color::rgb(230, 200, 40);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(self) -> bool {
        self.a == 0
    }
}

/// Drawing backend.
pub trait Graphics {
    /// Prepare the target for drawing. A failure skips the paint callback
    /// and leaves the damage pending.
    fn begin(&mut self) -> Result<(), GraphicsError>;
    fn end(&mut self);
    fn set_clip(&mut self, clip: Rect);
    fn clip(&self) -> Rect;
    fn set_color(&mut self, color: Color);
    fn fill_rect(&mut self, rect: Rect);
    fn stroke_rect(&mut self, rect: Rect);
    fn draw_text(&mut self, x: i32, y: i32, text: &str);
}

/// Backend that draws nothing. Used by headless systems and benchmarks.
#[derive(Debug, Default)]
pub struct NullGraphics {
    clip: Rect,
    frames: u64,
}

impl NullGraphics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed `begin`/`end` pairs.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Graphics for NullGraphics {
    fn begin(&mut self) -> Result<(), GraphicsError> {
        Ok(())
    }

    fn end(&mut self) {
        self.frames += 1;
    }

    fn set_clip(&mut self, clip: Rect) {
        self.clip = clip;
    }

    fn clip(&self) -> Rect {
        self.clip
    }

    fn set_color(&mut self, _color: Color) {}

    fn fill_rect(&mut self, _rect: Rect) {}

    fn stroke_rect(&mut self, _rect: Rect) {}

    fn draw_text(&mut self, _x: i32, _y: i32, _text: &str) {}
}

/// The four one-unit-thick edges of `rect`, empty ones included.
pub(crate) fn outline(rect: Rect) -> [Rect; 4] {
    let (x, y, w, h) = (rect.x(), rect.y(), rect.w(), rect.h());
    [
        Rect::new(x, y, w, h.min(1)),
        Rect::new(x, y + h - 1, w, h.min(1)),
        Rect::new(x, y, w.min(1), h),
        Rect::new(x + w - 1, y, w.min(1), h),
    ]
}
