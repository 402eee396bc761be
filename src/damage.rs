//! Pending repaint rectangles in absolute (root) coordinates.
//!
//! Entries are kept in FIFO order of invalidation. A new rectangle that
//! overlaps an existing entry is folded into it with [`Rect::extend`], and
//! the grown entry then absorbs any other entries it now overlaps. Merging is
//! a bounding-box union, so the list may over-approximate the damaged area
//! but never loses any of it.

use std::collections::TryReserveError;

use crate::constants::DEFAULT_MAX_DAMAGE_ENTRIES;
use crate::rect::Rect;

#[derive(Debug, Clone)]
pub struct DamageList {
    entries: Vec<Rect>,
    max_entries: usize,
}

impl Default for DamageList {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DAMAGE_ENTRIES)
    }
}

impl DamageList {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record `rect` as needing repaint. Degenerate rectangles are ignored.
    ///
    /// When the list is full every entry collapses into one bounding box.
    pub fn push(&mut self, rect: Rect) -> Result<(), TryReserveError> {
        if rect.is_empty() {
            return Ok(());
        }
        if let Some(idx) = self
            .entries
            .iter()
            .position(|entry| entry.intersect(&rect).is_some())
        {
            self.entries[idx].extend(&rect);
            self.coalesce(idx);
            return Ok(());
        }
        if self.entries.len() >= self.max_entries {
            let bounds = self.bounding_box().unwrap_or(rect).union(&rect);
            tracing::trace!(
                entries = self.entries.len(),
                bounds = ?bounds,
                "damage list full, collapsing"
            );
            self.entries.clear();
            self.entries.push(bounds);
            return Ok(());
        }
        self.entries.try_reserve(1)?;
        self.entries.push(rect);
        Ok(())
    }

    /// Fold `rect` and every pending entry into a single bounding box.
    ///
    /// Only reuses existing storage when entries are pending, so it is the
    /// fallback when [`DamageList::push`] cannot allocate.
    pub fn collapse_with(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        let bounds = self.bounding_box().map_or(rect, |b| b.union(&rect));
        if self.entries.is_empty() {
            self.entries.push(bounds);
        } else {
            self.entries.truncate(1);
            self.entries[0] = bounds;
        }
    }

    // Fold every entry overlapping `entries[idx]` into it, keeping the
    // merged entry at the earliest position.
    fn coalesce(&mut self, mut idx: usize) {
        while let Some(other) = (0..self.entries.len()).find(|&i| {
            i != idx && self.entries[i].intersect(&self.entries[idx]).is_some()
        }) {
            let (keep, gone) = (idx.min(other), idx.max(other));
            let absorbed = self.entries.remove(gone);
            self.entries[keep].extend(&absorbed);
            idx = keep;
        }
    }

    /// Remove and return all pending rectangles in FIFO order.
    pub fn take(&mut self) -> Vec<Rect> {
        std::mem::take(&mut self.entries)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rect> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Rect] {
        &self.entries
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn bounding_box(&self) -> Option<Rect> {
        let mut it = self.entries.iter().copied();
        let first = it.next()?;
        Some(it.fold(first, |acc, r| acc.union(&r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_degenerate_rects() {
        let mut list = DamageList::default();
        list.push(Rect::new(3, 3, 0, 4)).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn disjoint_rects_keep_fifo_order() {
        let mut list = DamageList::default();
        list.push(Rect::new(2, 2, 1, 1)).unwrap();
        list.push(Rect::new(3, 3, 1, 1)).unwrap();
        assert_eq!(
            list.as_slice(),
            &[Rect::new(2, 2, 1, 1), Rect::new(3, 3, 1, 1)]
        );
    }

    #[test]
    fn overlapping_rect_extends_existing_entry() {
        let mut list = DamageList::default();
        list.push(Rect::new(1, 1, 3, 3)).unwrap();
        list.push(Rect::new(2, 2, 1, 1)).unwrap();
        list.push(Rect::new(3, 1, 2, 1)).unwrap();
        assert_eq!(list.as_slice(), &[Rect::new(1, 1, 4, 3)]);
    }

    #[test]
    fn bridging_rect_coalesces_neighbours() {
        let mut list = DamageList::default();
        list.push(Rect::new(0, 0, 2, 2)).unwrap();
        list.push(Rect::new(10, 10, 1, 1)).unwrap();
        list.push(Rect::new(4, 0, 2, 2)).unwrap();
        list.push(Rect::new(1, 0, 4, 1)).unwrap();
        assert_eq!(
            list.as_slice(),
            &[Rect::new(0, 0, 6, 2), Rect::new(10, 10, 1, 1)]
        );
    }

    #[test]
    fn overflow_collapses_to_bounding_box() {
        let mut list = DamageList::new(2);
        list.push(Rect::new(0, 0, 1, 1)).unwrap();
        list.push(Rect::new(5, 5, 1, 1)).unwrap();
        list.push(Rect::new(9, 0, 1, 1)).unwrap();
        assert_eq!(list.as_slice(), &[Rect::new(0, 0, 10, 6)]);
    }

    #[test]
    fn collapse_with_keeps_a_single_entry() {
        let mut list = DamageList::default();
        list.push(Rect::new(0, 0, 1, 1)).unwrap();
        list.push(Rect::new(4, 4, 1, 1)).unwrap();
        list.collapse_with(Rect::new(2, 8, 1, 1));
        assert_eq!(list.as_slice(), &[Rect::new(0, 0, 5, 9)]);
    }

    #[test]
    fn take_drains_entries() {
        let mut list = DamageList::default();
        list.push(Rect::new(0, 0, 1, 1)).unwrap();
        assert_eq!(list.take(), vec![Rect::new(0, 0, 1, 1)]);
        assert!(list.is_empty());
        assert_eq!(list.bounding_box(), None);
    }
}
