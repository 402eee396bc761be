use std::cell::RefCell;
use std::rc::Rc;

use crate::rect::{Point, Rect, Size};

use super::{Color, Graphics, GraphicsError, outline};

/// In-memory RGBA surface.
///
/// Raw access is bracketed by [`PixelSurface::lock`] and
/// [`PixelSurface::unlock`]; a surface can be locked by one user at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSurface {
    size: Size,
    data: Vec<Color>,
    locked: bool,
}

impl PixelSurface {
    pub fn new(width: i32, height: i32) -> Self {
        let size = Size::new(width.max(0), height.max(0));
        Self {
            size,
            data: vec![Color::TRANSPARENT; (size.w as usize) * (size.h as usize)],
            locked: false,
        }
    }

    /// Wrap existing row-major pixel data.
    pub fn from_data(width: i32, height: i32, data: Vec<Color>) -> Result<Self, GraphicsError> {
        if width < 0 || height < 0 || data.len() != (width as usize) * (height as usize) {
            return Err(GraphicsError::OutOfBounds);
        }
        Ok(Self {
            size: Size::new(width, height),
            data,
            locked: false,
        })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.size.w, self.size.h)
    }

    /// Reallocate to a new size. Contents are cleared.
    pub fn set_size(&mut self, width: i32, height: i32) -> Result<(), GraphicsError> {
        if self.locked {
            return Err(GraphicsError::SurfaceLocked);
        }
        if width < 0 || height < 0 {
            return Err(GraphicsError::OutOfBounds);
        }
        *self = Self::new(width, height);
        Ok(())
    }

    pub fn lock(&mut self) -> Result<(), GraphicsError> {
        if self.locked {
            return Err(GraphicsError::SurfaceLocked);
        }
        self.locked = true;
        Ok(())
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Row-major pixels, available only while locked.
    pub fn pixels_mut(&mut self) -> Option<&mut [Color]> {
        self.locked.then_some(self.data.as_mut_slice())
    }

    pub fn pixels(&self) -> &[Color] {
        &self.data
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y).map(|i| self.data[i])
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.bounds()
            .point_inside(x, y)
            .then(|| (y as usize) * (self.size.w as usize) + x as usize)
    }

    /// Paint `rect` with `color`, clipped to the surface.
    pub fn fill(&mut self, rect: Rect, color: Color) {
        let Some(area) = rect.intersect(&self.bounds()) else {
            return;
        };
        let width = self.size.w as usize;
        for y in area.y()..=area.bottom() {
            let row = (y as usize) * width;
            self.data[row + area.x() as usize..=row + area.right() as usize].fill(color);
        }
    }

    /// Copy `src_rect` of `src` so its top-left lands on `dst`. The copy is
    /// clipped against both surfaces; neither may be locked.
    pub fn blit(&mut self, src: &PixelSurface, src_rect: Rect, dst: Point) -> Result<(), GraphicsError> {
        if self.locked || src.locked {
            return Err(GraphicsError::SurfaceLocked);
        }
        let from = src_rect
            .intersect(&src.bounds())
            .ok_or(GraphicsError::OutOfBounds)?;
        let shifted = from.translated(dst.x - src_rect.x(), dst.y - src_rect.y());
        let Some(to) = shifted.intersect(&self.bounds()) else {
            return Ok(());
        };
        let dx = from.x() - shifted.x();
        let dy = from.y() - shifted.y();
        for y in to.y()..=to.bottom() {
            for x in to.x()..=to.right() {
                if let (Some(d), Some(color)) = (self.index(x, y), src.pixel(x + dx, y + dy)) {
                    self.data[d] = color;
                }
            }
        }
        Ok(())
    }
}

/// [`Graphics`] backend drawing into a shared [`PixelSurface`].
///
/// The surface is locked from `begin` to `end`. Text has no glyphs here:
/// every non-space character covers one pixel.
#[derive(Debug)]
pub struct PixelGraphics {
    surface: Rc<RefCell<PixelSurface>>,
    clip: Rect,
    color: Color,
    drawing: bool,
}

impl PixelGraphics {
    pub fn new(surface: Rc<RefCell<PixelSurface>>) -> Self {
        Self {
            surface,
            clip: Rect::ZERO,
            color: Color::BLACK,
            drawing: false,
        }
    }

    pub fn surface(&self) -> &Rc<RefCell<PixelSurface>> {
        &self.surface
    }

    fn fill_clipped(&mut self, rect: Rect) {
        if !self.drawing || self.color.is_transparent() {
            return;
        }
        let Some(area) = rect.intersect(&self.clip) else {
            return;
        };
        if let Ok(mut surface) = self.surface.try_borrow_mut() {
            surface.fill(area, self.color);
        }
    }
}

impl Graphics for PixelGraphics {
    fn begin(&mut self) -> Result<(), GraphicsError> {
        let mut surface = self
            .surface
            .try_borrow_mut()
            .map_err(|_| GraphicsError::SurfaceLocked)?;
        surface.lock()?;
        self.clip = surface.bounds();
        self.drawing = true;
        Ok(())
    }

    fn end(&mut self) {
        if let Ok(mut surface) = self.surface.try_borrow_mut() {
            surface.unlock();
        }
        self.drawing = false;
    }

    fn set_clip(&mut self, clip: Rect) {
        self.clip = clip;
    }

    fn clip(&self) -> Rect {
        self.clip
    }

    fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.fill_clipped(rect);
    }

    fn stroke_rect(&mut self, rect: Rect) {
        for edge in outline(rect) {
            self.fill_clipped(edge);
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        for (i, ch) in text.chars().enumerate() {
            if !ch.is_whitespace() {
                self.fill_clipped(Rect::new(x + i as i32, y, 1, 1));
            }
        }
    }
}
