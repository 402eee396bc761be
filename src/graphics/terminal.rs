use std::cell::RefCell;
use std::rc::Rc;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect as CellRect;
use ratatui::style::Color as CellColor;

use crate::rect::Rect;

use super::{Color, Graphics, GraphicsError};

fn cell_color(color: Color) -> CellColor {
    CellColor::Rgb(color.r, color.g, color.b)
}

/// [`Graphics`] backend composing into a ratatui [`Buffer`] where one cell
/// is one unit. Fills set the background; strokes and text set the
/// foreground.
///
/// The buffer is shared so the host can present it after `update()`;
/// [`TerminalGraphics::take_dirty`] reports whether anything was drawn since
/// the last call.
#[derive(Debug)]
pub struct TerminalGraphics {
    buffer: Rc<RefCell<Buffer>>,
    clip: Rect,
    color: Color,
    dirty: bool,
}

impl TerminalGraphics {
    pub fn new(buffer: Rc<RefCell<Buffer>>) -> Self {
        Self {
            buffer,
            clip: Rect::ZERO,
            color: Color::WHITE,
            dirty: false,
        }
    }

    pub fn buffer(&self) -> &Rc<RefCell<Buffer>> {
        &self.buffer
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    // Intersect with the clip and the buffer, then convert to cells.
    fn clip_rect(&self, rect: Rect, area: CellRect) -> Option<CellRect> {
        let bounds = Rect::new(
            i32::from(area.x),
            i32::from(area.y),
            i32::from(area.width),
            i32::from(area.height),
        );
        let clipped = rect.intersect(&self.clip)?.intersect(&bounds)?;
        Some(CellRect::new(
            u16::try_from(clipped.x()).ok()?,
            u16::try_from(clipped.y()).ok()?,
            u16::try_from(clipped.w()).ok()?,
            u16::try_from(clipped.h()).ok()?,
        ))
    }

    fn for_each_cell(&mut self, rect: Rect, mut f: impl FnMut(&mut ratatui::buffer::Cell)) {
        let Ok(mut buffer) = self.buffer.try_borrow_mut() else {
            return;
        };
        let Some(area) = self.clip_rect(rect, buffer.area) else {
            return;
        };
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                if let Some(cell) = buffer.cell_mut((x, y)) {
                    f(cell);
                }
            }
        }
        self.dirty = true;
    }
}

impl Graphics for TerminalGraphics {
    fn begin(&mut self) -> Result<(), GraphicsError> {
        let buffer = self
            .buffer
            .try_borrow()
            .map_err(|_| GraphicsError::SurfaceLocked)?;
        let area = buffer.area;
        self.clip = Rect::new(
            i32::from(area.x),
            i32::from(area.y),
            i32::from(area.width),
            i32::from(area.height),
        );
        Ok(())
    }

    fn end(&mut self) {}

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
        if self.color.is_transparent() {
            return;
        }
        let bg = cell_color(self.color);
        self.for_each_cell(rect, |cell| {
            cell.set_symbol(" ");
            cell.set_bg(bg);
        });
    }

    fn stroke_rect(&mut self, rect: Rect) {
        if rect.is_empty() || self.color.is_transparent() {
            return;
        }
        let fg = cell_color(self.color);
        let (left, top, right, bottom) = (rect.x(), rect.y(), rect.right(), rect.bottom());
        for y in top..=bottom {
            for x in left..=right {
                let symbol = match (x == left || x == right, y == top || y == bottom) {
                    (false, false) => continue,
                    (true, true) => match (x == left, y == top) {
                        (true, true) => "┌",
                        (false, true) => "┐",
                        (true, false) => "└",
                        (false, false) => "┘",
                    },
                    (true, false) => "│",
                    (false, true) => "─",
                };
                self.for_each_cell(Rect::new(x, y, 1, 1), |cell| {
                    cell.set_symbol(symbol);
                    cell.set_fg(fg);
                });
            }
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        let fg = cell_color(self.color);
        for (i, ch) in text.chars().enumerate() {
            let symbol = ch.to_string();
            self.for_each_cell(Rect::new(x + i as i32, y, 1, 1), |cell| {
                cell.set_symbol(&symbol);
                cell.set_fg(fg);
            });
        }
    }
}
