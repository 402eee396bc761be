//! Integer rectangle algebra shared by the damage list and the window tree.
//!
//! Two edge conventions coexist and both are load-bearing:
//!
//! - [`Rect::point_inside`] is half-open: `x` in `[x, x + w)`.
//! - [`Rect::contains`], [`Rect::intersect`] and [`Rect::subtract`] treat the
//!   right and bottom edges as inclusive pixels (`x + w - 1`), so two boxes
//!   overlap only when at least one pixel is shared.
//!
//! Degenerate rectangles (`w == 0` or `h == 0`) cover no pixels. They never
//! intersect anything and are dropped by damage and paint code.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RectError {
    #[error("rectangles do not intersect")]
    NotFound,
    #[error("negative rectangle size {w}x{h}")]
    NegativeSize { w: i32, h: i32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Width/height pair. Both components are kept non-negative by its users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub w: i32,
    pub h: i32,
}

impl Size {
    pub const fn new(w: i32, h: i32) -> Self {
        Self { w, h }
    }
}

/// Axis-aligned integer rectangle with a non-negative size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        x: 0,
        y: 0,
        w: 0,
        h: 0,
    };

    /// Build a rectangle, clamping negative dimensions to zero.
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            x,
            y,
            w: if w < 0 { 0 } else { w },
            h: if h < 0 { 0 } else { h },
        }
    }

    /// Build a rectangle and report whether the input was already valid.
    ///
    /// Negative sizes are clamped to zero; the flag is `false` in that case.
    pub const fn init(x: i32, y: i32, w: i32, h: i32) -> (Self, bool) {
        (Self::new(x, y, w, h), w >= 0 && h >= 0)
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.w, size.h)
    }

    pub const fn x(&self) -> i32 {
        self.x
    }

    pub const fn y(&self) -> i32 {
        self.y
    }

    pub const fn w(&self) -> i32 {
        self.w
    }

    pub const fn h(&self) -> i32 {
        self.h
    }

    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub const fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }

    /// Inclusive right edge (`x + w - 1`).
    pub const fn right(&self) -> i32 {
        self.x + self.w - 1
    }

    /// Inclusive bottom edge (`y + h - 1`).
    pub const fn bottom(&self) -> i32 {
        self.y + self.h - 1
    }

    pub const fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    pub const fn area(&self) -> i64 {
        self.w as i64 * self.h as i64
    }

    /// Half-open point test.
    pub const fn point_inside(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.w && y >= self.y && y < self.y + self.h
    }

    /// True when `inner`'s inclusive bounding box lies within this one.
    pub const fn contains(&self, inner: &Rect) -> bool {
        inner.x >= self.x
            && inner.y >= self.y
            && inner.right() <= self.right()
            && inner.bottom() <= self.bottom()
    }

    /// Pixel overlap of two rectangles, `None` when no pixel is shared.
    ///
    /// The overlap is the middle interval of the sorted edges on each axis.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        if self.is_empty() || other.is_empty() {
            return None;
        }
        if other.right() < self.x
            || self.right() < other.x
            || other.bottom() < self.y
            || self.bottom() < other.y
        {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Some(Rect::new(x, y, right - x + 1, bottom - y + 1))
    }

    /// [`Rect::intersect`] as a `Result`, for callers that propagate with `?`.
    pub fn intersect_checked(&self, other: &Rect) -> Result<Rect, RectError> {
        self.intersect(other).ok_or(RectError::NotFound)
    }

    /// Split the part of `self` not covered by `cut` into up to four
    /// disjoint pieces: left and right full-height strips, then top and
    /// bottom strips spanning the overlap's width.
    ///
    /// Returns [`RectError::NotFound`] when the two do not intersect; the
    /// caller should then treat `self` as untouched by `cut`.
    pub fn subtract(&self, cut: &Rect) -> Result<Subtraction, RectError> {
        let overlap = self.intersect_checked(cut)?;
        let mut out = Subtraction::default();
        out.push(Rect::new(self.x, self.y, overlap.x - self.x, self.h));
        out.push(Rect::new(
            overlap.right() + 1,
            self.y,
            self.right() - overlap.right(),
            self.h,
        ));
        out.push(Rect::new(overlap.x, self.y, overlap.w, overlap.y - self.y));
        out.push(Rect::new(
            overlap.x,
            overlap.bottom() + 1,
            overlap.w,
            self.bottom() - overlap.bottom(),
        ));
        Ok(out)
    }

    pub fn move_by(&mut self, dx: i32, dy: i32) {
        self.x += dx;
        self.y += dy;
    }

    /// Copy of `self` translated by `(dx, dy)`.
    pub fn translated(mut self, dx: i32, dy: i32) -> Self {
        self.move_by(dx, dy);
        self
    }

    pub fn move_to(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    /// Grow or shrink by `(dw, dh)`, clamping at zero. Returns `false` when
    /// clamping was needed.
    pub fn resize(&mut self, dw: i32, dh: i32) -> bool {
        let w = self.w + dw;
        let h = self.h + dh;
        self.w = w.max(0);
        self.h = h.max(0);
        w >= 0 && h >= 0
    }

    /// Explicit size setter. Negative sizes are rejected and leave `self`
    /// unchanged.
    pub fn set_size(&mut self, w: i32, h: i32) -> Result<(), RectError> {
        if w < 0 || h < 0 {
            return Err(RectError::NegativeSize { w, h });
        }
        self.w = w;
        self.h = h;
        Ok(())
    }

    /// Grow the bounding box to also cover `cover`.
    ///
    /// This is a bounding-box union, so the result may cover pixels that
    /// neither input did.
    pub fn extend(&mut self, cover: &Rect) {
        if cover.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *cover;
            return;
        }
        let x = self.x.min(cover.x);
        let y = self.y.min(cover.y);
        let x1 = (self.x + self.w).max(cover.x + cover.w);
        let y1 = (self.y + self.h).max(cover.y + cover.h);
        *self = Rect::new(x, y, x1 - x, y1 - y);
    }

    /// Bounding box of `self` and `other`.
    pub fn union(mut self, other: &Rect) -> Self {
        self.extend(other);
        self
    }
}

/// Remainder pieces produced by [`Rect::subtract`]. Empty pieces are not
/// stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Subtraction {
    pieces: [Rect; 4],
    len: usize,
}

impl Subtraction {
    fn push(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        self.pieces[self.len] = rect;
        self.len += 1;
    }

    pub fn as_slice(&self) -> &[Rect] {
        &self.pieces[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rect> {
        self.as_slice().iter()
    }
}

impl IntoIterator for Subtraction {
    type Item = Rect;
    type IntoIter = std::iter::Take<std::array::IntoIter<Rect, 4>>;

    fn into_iter(self) -> Self::IntoIter {
        self.pieces.into_iter().take(self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covered(rects: &[Rect], x: i32, y: i32) -> usize {
        rects.iter().filter(|r| r.point_inside(x, y)).count()
    }

    #[test]
    fn init_clamps_and_reports() {
        let (r, valid) = Rect::init(1, 2, -3, 4);
        assert!(!valid);
        assert_eq!((r.w(), r.h()), (0, 4));
        let (r, valid) = Rect::init(1, 2, 3, 4);
        assert!(valid);
        assert_eq!(r, Rect::new(1, 2, 3, 4));
    }

    #[test]
    fn point_inside_is_half_open() {
        let r = Rect::new(1, 1, 2, 2);
        assert!(r.point_inside(1, 1));
        assert!(r.point_inside(2, 2));
        assert!(!r.point_inside(3, 2));
        assert!(!r.point_inside(2, 3));
        assert!(!Rect::new(0, 0, 0, 5).point_inside(0, 0));
    }

    #[test]
    fn contains_uses_inclusive_edges() {
        let outer = Rect::new(0, 0, 5, 5);
        assert!(outer.contains(&Rect::new(4, 4, 1, 1)));
        assert!(!outer.contains(&Rect::new(4, 4, 2, 1)));
        assert!(outer.contains(&outer));
    }

    #[test]
    fn intersect_touching_edges_do_not_overlap() {
        let a = Rect::new(0, 0, 2, 2);
        assert_eq!(a.intersect(&Rect::new(2, 0, 2, 2)), None);
        assert_eq!(
            a.intersect(&Rect::new(1, 1, 2, 2)),
            Some(Rect::new(1, 1, 1, 1))
        );
        assert_eq!(a.intersect(&Rect::new(1, 1, 0, 2)), None);
        assert_eq!(
            Rect::new(1, 1, 1, 1).intersect_checked(&Rect::new(3, 3, 1, 1)),
            Err(RectError::NotFound)
        );
    }

    #[test]
    fn subtract_shrunk_window_yields_four_strips() {
        let old = Rect::new(1, 1, 3, 3);
        let new = Rect::new(2, 2, 1, 1);
        let pieces = old.subtract(&new).unwrap();
        assert_eq!(
            pieces.as_slice(),
            &[
                Rect::new(1, 1, 1, 3),
                Rect::new(3, 1, 1, 3),
                Rect::new(2, 1, 1, 1),
                Rect::new(2, 3, 1, 1),
            ]
        );
    }

    #[test]
    fn subtract_covered_rect_is_empty() {
        let pieces = Rect::new(2, 2, 1, 1)
            .subtract(&Rect::new(2, 2, 2, 2))
            .unwrap();
        assert!(pieces.is_empty());
        assert_eq!(
            Rect::new(2, 2, 1, 1).subtract(&Rect::new(3, 3, 1, 1)),
            Err(RectError::NotFound)
        );
    }

    #[test]
    fn subtract_partitions_base_rect() {
        let base = Rect::new(2, 3, 5, 4);
        for cx in -1..9 {
            for cy in 0..9 {
                for (cw, ch) in [(1, 1), (2, 3), (4, 2), (7, 7)] {
                    let cut = Rect::new(cx, cy, cw, ch);
                    let Some(overlap) = base.intersect(&cut) else {
                        assert!(base.subtract(&cut).is_err());
                        continue;
                    };
                    let mut pieces: Vec<Rect> = base.subtract(&cut).unwrap().into_iter().collect();
                    pieces.push(overlap);
                    let total: i64 = pieces.iter().map(Rect::area).sum();
                    assert_eq!(total, base.area(), "cut {cut:?}");
                    for x in base.x()..base.x() + base.w() {
                        for y in base.y()..base.y() + base.h() {
                            assert_eq!(covered(&pieces, x, y), 1, "pixel {x},{y} cut {cut:?}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn resize_clamps_and_set_size_rejects() {
        let mut r = Rect::new(0, 0, 2, 2);
        assert!(!r.resize(-5, 1));
        assert_eq!(r.size(), Size::new(0, 3));
        assert_eq!(
            r.set_size(-1, 1),
            Err(RectError::NegativeSize { w: -1, h: 1 })
        );
        assert_eq!(r.size(), Size::new(0, 3));
        r.set_size(4, 4).unwrap();
        assert_eq!(r.size(), Size::new(4, 4));
    }

    #[test]
    fn extend_is_bounding_box_union() {
        let mut r = Rect::new(1, 1, 1, 1);
        r.extend(&Rect::new(3, 3, 1, 1));
        assert_eq!(r, Rect::new(1, 1, 3, 3));
        r.extend(&Rect::new(9, 9, 0, 0));
        assert_eq!(r, Rect::new(1, 1, 3, 3));
        let mut empty = Rect::ZERO;
        empty.extend(&Rect::new(2, 2, 1, 1));
        assert_eq!(empty, Rect::new(2, 2, 1, 1));
    }
}
