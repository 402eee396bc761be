//! Arena of window nodes: structure, coordinate transforms and hit-testing.
//!
//! The tree only answers geometric and structural questions. Invalidation,
//! reference cleanup and event delivery live in [`WindowSystem`], which is
//! the only code allowed to mutate the structure.
//!
//! [`WindowSystem`]: crate::system::WindowSystem

use crate::error::{Result, WindowError};
use crate::rect::{Point, Rect};

use super::{Window, WindowFlags, WindowHandler, WindowId};

/// One window overlapping a damage rectangle, in paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PaintItem {
    pub(crate) window: WindowId,
    /// Absolute window rectangle before clipping.
    pub(crate) bounds: Rect,
    /// Absolute area to repaint.
    pub(crate) clip: Rect,
}

pub struct WindowTree {
    slots: Vec<Option<Window>>,
    /// Last generation per slot, kept across frees.
    generations: Vec<u32>,
    free_list: Vec<usize>,
    /// Top-level windows in paint order; the last one is topmost.
    roots: Vec<WindowId>,
}

impl Default for WindowTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WindowTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowTree")
            .field("slots", &self.slots.len())
            .field("alive", &self.len())
            .field("free_list", &self.free_list.len())
            .field("roots", &self.roots)
            .finish()
    }
}

impl WindowTree {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            roots: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_alive(&self, id: WindowId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn get(&self, id: WindowId) -> Option<&Window> {
        self.slots
            .get(id.idx())
            .and_then(Option::as_ref)
            .filter(|node| node.generation == id.generation())
    }

    pub(crate) fn get_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.slots
            .get_mut(id.idx())
            .and_then(Option::as_mut)
            .filter(|node| node.generation == id.generation())
    }

    pub(crate) fn node(&self, id: WindowId) -> Result<&Window> {
        self.get(id).ok_or(WindowError::StaleWindow(id))
    }

    pub(crate) fn node_mut(&mut self, id: WindowId) -> Result<&mut Window> {
        self.get_mut(id).ok_or(WindowError::StaleWindow(id))
    }

    /// Allocate a window and append it as the topmost child of `parent`, or
    /// as the topmost root.
    ///
    /// Every allocation happens before the tree is touched, so on failure
    /// the tree is unchanged.
    pub(crate) fn insert(&mut self, parent: Option<WindowId>, rect: Rect) -> Result<WindowId> {
        let oom = |_| WindowError::OutOfMemory("window");
        match parent {
            Some(p) => self.node_mut(p)?.children.try_reserve(1).map_err(oom)?,
            None => self.roots.try_reserve(1).map_err(oom)?,
        }
        let idx = match self.free_list.pop() {
            Some(idx) => {
                let generation = self.generations[idx].saturating_add(1);
                self.generations[idx] = generation;
                self.slots[idx] = Some(Window::new(generation, parent, rect));
                idx
            }
            None => {
                self.slots.try_reserve(1).map_err(oom)?;
                self.generations.try_reserve(1).map_err(oom)?;
                self.slots.push(Some(Window::new(1, parent, rect)));
                self.generations.push(1);
                self.slots.len() - 1
            }
        };
        let id = WindowId::new(idx as u32, self.generations[idx]);
        match parent {
            Some(p) => self.node_mut(p)?.children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Remove `id` and its subtree, children before parents. Returns the
    /// removed ids together with their handlers so the caller can notify
    /// them.
    pub(crate) fn remove(&mut self, id: WindowId) -> Vec<(WindowId, Option<Box<dyn WindowHandler>>)> {
        let mut removed = Vec::new();
        if !self.is_alive(id) {
            return removed;
        }
        self.unlink(id);
        self.remove_recursive(id, &mut removed);
        removed
    }

    fn remove_recursive(
        &mut self,
        id: WindowId,
        out: &mut Vec<(WindowId, Option<Box<dyn WindowHandler>>)>,
    ) {
        let children = self
            .get(id)
            .map(|node| node.children.clone())
            .unwrap_or_default();
        for child in children {
            self.remove_recursive(child, out);
        }
        if let Some(node) = self.slots[id.idx()].take() {
            self.free_list.push(id.idx());
            out.push((id, node.handler));
        }
    }

    /// Take `id` out of its parent's child list (or the root list). The
    /// window stays alive but detached.
    pub(crate) fn unlink(&mut self, id: WindowId) {
        let Some(parent) = self.get(id).map(|node| node.parent) else {
            return;
        };
        match parent {
            Some(p) => {
                if let Some(pn) = self.get_mut(p) {
                    pn.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }
    }

    /// Make room for one more child of `parent` (or root) so a following
    /// [`WindowTree::link`] cannot fail on allocation.
    pub(crate) fn reserve_link(&mut self, parent: Option<WindowId>) -> Result<()> {
        let oom = |_| WindowError::OutOfMemory("window link");
        match parent {
            Some(p) => self.node_mut(p)?.children.try_reserve(1).map_err(oom),
            None => self.roots.try_reserve(1).map_err(oom),
        }
    }

    /// Attach a detached window as the topmost child of `parent` (or root).
    pub(crate) fn link(&mut self, id: WindowId, parent: Option<WindowId>) -> Result<()> {
        self.node(id)?;
        self.reserve_link(parent)?;
        match parent {
            Some(p) => self.node_mut(p)?.children.push(id),
            None => self.roots.push(id),
        }
        self.node_mut(id)?.parent = parent;
        Ok(())
    }

    pub fn roots(&self) -> &[WindowId] {
        &self.roots
    }

    pub fn parent_of(&self, id: WindowId) -> Option<WindowId> {
        self.get(id).and_then(|node| node.parent)
    }

    /// Children of `id` in paint order (bottom first).
    pub fn children_of(&self, id: WindowId) -> &[WindowId] {
        self.get(id).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    pub fn rect(&self, id: WindowId) -> Option<Rect> {
        self.get(id).map(|node| node.rect)
    }

    pub fn origin(&self, id: WindowId) -> Option<Point> {
        self.get(id).map(|node| node.origin)
    }

    pub fn flags(&self, id: WindowId) -> Option<WindowFlags> {
        self.get(id).map(|node| node.flags)
    }

    fn top_of(&self, id: WindowId) -> Option<WindowId> {
        let mut current = id;
        while let Some(parent) = self.get(current)?.parent {
            current = parent;
        }
        Some(current)
    }

    /// True when `id` is reachable from a root.
    pub fn is_attached(&self, id: WindowId) -> bool {
        self.top_of(id).is_some_and(|top| self.roots.contains(&top))
    }

    /// True when `id` and all its ancestors are visible and attached.
    pub fn is_shown(&self, id: WindowId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            match self.get(cur) {
                Some(node) if node.visible() => current = node.parent,
                _ => return false,
            }
        }
        self.is_attached(id)
    }

    pub fn is_ancestor_or_self(&self, ancestor: WindowId, id: WindowId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            current = self.parent_of(cur);
        }
        false
    }

    /// `id` followed by all of its descendants, parents before children.
    pub fn subtree(&self, id: WindowId) -> Vec<WindowId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(node) = self.get(cur) else {
                continue;
            };
            out.push(cur);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Absolute position of the window's top-left corner: the sum of parent
    /// offsets up to the root, minus every ancestor's scroll origin.
    pub fn absolute_origin(&self, id: WindowId) -> Option<Point> {
        let node = self.get(id)?;
        let mut x = node.rect.x();
        let mut y = node.rect.y();
        let mut current = node.parent;
        while let Some(parent) = current {
            let pn = self.get(parent)?;
            x += pn.rect.x() - pn.origin.x;
            y += pn.rect.y() - pn.origin.y;
            current = pn.parent;
        }
        Some(Point::new(x, y))
    }

    /// Transform `local` from the window's own space into absolute space.
    pub fn rect_absolute(&self, id: WindowId, local: Rect) -> Option<Rect> {
        let origin = self.absolute_origin(id)?;
        Some(local.translated(origin.x, origin.y))
    }

    /// Unclipped absolute rectangle of the window.
    pub fn absolute_rect(&self, id: WindowId) -> Option<Rect> {
        let origin = self.absolute_origin(id)?;
        Some(Rect::from_origin_size(origin, self.get(id)?.rect.size()))
    }

    /// Absolute screen area the window itself occupies: its absolute rect
    /// intersected with every clipping ancestor. `None` when hidden,
    /// detached or clipped away entirely.
    pub fn visible_rect(&self, id: WindowId) -> Option<Rect> {
        if !self.is_shown(id) {
            return None;
        }
        let mut rect = self.absolute_rect(id)?;
        if rect.is_empty() {
            return None;
        }
        let mut current = self.get(id)?.parent;
        while let Some(parent) = current {
            let pn = self.get(parent)?;
            if pn.flags.contains(WindowFlags::CLIP_CHILDREN) {
                rect = rect.intersect(&self.absolute_rect(parent)?)?;
            }
            current = pn.parent;
        }
        Some(rect)
    }

    /// Bounding box of everything the subtree paints on screen. Equal to
    /// [`WindowTree::visible_rect`] unless children may overflow.
    pub fn footprint(&self, id: WindowId) -> Option<Rect> {
        let node = self.get(id)?;
        let mut area = self.visible_rect(id);
        if !node.flags.contains(WindowFlags::CLIP_CHILDREN) {
            for &child in &node.children {
                if let Some(r) = self.footprint(child) {
                    area = Some(area.map_or(r, |a| a.union(&r)));
                }
            }
        }
        area
    }

    /// Topmost child of `parent` containing the point, given in `parent`'s
    /// local space. Hidden children and children that ignore input are
    /// skipped.
    pub fn get_child_xy(&self, parent: WindowId, x: i32, y: i32) -> Option<WindowId> {
        let node = self.get(parent)?;
        let cx = x + node.origin.x;
        let cy = y + node.origin.y;
        node.children.iter().rev().copied().find(|child| {
            self.get(*child).is_some_and(|cn| {
                cn.visible()
                    && cn.flags.contains(WindowFlags::HANDLE_EVENTS)
                    && cn.rect.point_inside(cx, cy)
            })
        })
    }

    /// Windows under an absolute point, from the topmost root down to the
    /// innermost window. Empty when nothing is hit.
    pub fn hit_test(&self, x: i32, y: i32) -> Vec<WindowId> {
        let mut path = Vec::new();
        let Some(root) = self.roots.iter().rev().copied().find(|root| {
            self.get(*root).is_some_and(|node| {
                node.visible()
                    && node.flags.contains(WindowFlags::HANDLE_EVENTS)
                    && node.rect.point_inside(x, y)
            })
        }) else {
            return path;
        };
        path.push(root);
        let mut current = root;
        while let Some(origin) = self.absolute_origin(current)
            && let Some(child) = self.get_child_xy(current, x - origin.x, y - origin.y)
        {
            path.push(child);
            current = child;
        }
        path
    }

    /// Windows overlapping `damage`, parents before children and siblings
    /// bottom to top.
    pub(crate) fn paint_list(&self, damage: Rect) -> Vec<PaintItem> {
        let mut items = Vec::new();
        for &root in &self.roots {
            self.collect_paint(root, Point::default(), None, damage, &mut items);
        }
        items
    }

    fn collect_paint(
        &self,
        id: WindowId,
        base: Point,
        clip: Option<Rect>,
        damage: Rect,
        out: &mut Vec<PaintItem>,
    ) {
        let Some(node) = self.get(id) else {
            return;
        };
        if !node.visible() {
            return;
        }
        let bounds = node.rect.translated(base.x, base.y);
        let visible = match clip {
            Some(c) => bounds.intersect(&c),
            None => (!bounds.is_empty()).then_some(bounds),
        };
        if let Some(v) = visible
            && let Some(paint_clip) = v.intersect(&damage)
        {
            out.push(PaintItem {
                window: id,
                bounds,
                clip: paint_clip,
            });
        }
        let child_clip = if node.flags.contains(WindowFlags::CLIP_CHILDREN) {
            match visible {
                Some(v) => Some(v),
                None => return,
            }
        } else {
            clip
        };
        let child_base = Point::new(bounds.x() - node.origin.x, bounds.y() - node.origin.y);
        for &child in &node.children {
            self.collect_paint(child, child_base, child_clip, damage, out);
        }
    }

    fn siblings_mut(&mut self, id: WindowId) -> Option<&mut Vec<WindowId>> {
        match self.get(id)?.parent {
            Some(parent) => self.get_mut(parent).map(|pn| &mut pn.children),
            None if self.roots.contains(&id) => Some(&mut self.roots),
            None => None,
        }
    }

    /// Move `id` to the top of its siblings. Returns whether the order changed.
    pub(crate) fn raise(&mut self, id: WindowId) -> bool {
        let Some(siblings) = self.siblings_mut(id) else {
            return false;
        };
        match siblings.iter().position(|s| *s == id) {
            Some(pos) if pos + 1 < siblings.len() => {
                let moved = siblings.remove(pos);
                siblings.push(moved);
                true
            }
            _ => false,
        }
    }

    /// Move `id` to the bottom of its siblings. Returns whether the order changed.
    pub(crate) fn lower(&mut self, id: WindowId) -> bool {
        let Some(siblings) = self.siblings_mut(id) else {
            return false;
        };
        match siblings.iter().position(|s| *s == id) {
            Some(pos) if pos > 0 => {
                let moved = siblings.remove(pos);
                siblings.insert(0, moved);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn take_handler(&mut self, id: WindowId) -> Option<Box<dyn WindowHandler>> {
        self.get_mut(id)?.handler.take()
    }

    /// Put a handler back after a callback. Dropped if the window died or
    /// a replacement was installed while it ran.
    pub(crate) fn restore_handler(&mut self, id: WindowId, handler: Box<dyn WindowHandler>) {
        if let Some(node) = self.get_mut(id)
            && node.handler.is_none()
        {
            node.handler = Some(handler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> (WindowTree, WindowId, [WindowId; 3]) {
        let mut tree = WindowTree::new();
        let root = tree.insert(None, Rect::new(0, 0, 5, 5)).unwrap();
        let c1 = tree.insert(Some(root), Rect::new(1, 1, 1, 1)).unwrap();
        let c2 = tree.insert(Some(root), Rect::new(2, 2, 1, 1)).unwrap();
        let c3 = tree.insert(Some(root), Rect::new(3, 3, 1, 1)).unwrap();
        (tree, root, [c1, c2, c3])
    }

    #[test]
    fn removed_slots_are_reused_with_new_generation() {
        let (mut tree, root, [c1, ..]) = layout();
        let removed = tree.remove(c1);
        assert_eq!(removed.len(), 1);
        assert!(!tree.is_alive(c1));
        let again = tree.insert(Some(root), Rect::new(0, 0, 1, 1)).unwrap();
        assert_eq!(again.idx(), c1.idx());
        assert_ne!(again, c1);
        assert!(tree.get(c1).is_none());
        assert!(matches!(tree.node(c1), Err(WindowError::StaleWindow(_))));
    }

    #[test]
    fn remove_takes_subtree_children_first() {
        let (mut tree, root, [c1, c2, c3]) = layout();
        let grandchild = tree.insert(Some(c2), Rect::new(0, 0, 1, 1)).unwrap();
        let removed: Vec<WindowId> = tree.remove(root).into_iter().map(|(id, _)| id).collect();
        assert_eq!(removed, vec![c1, grandchild, c2, c3, root]);
        assert!(tree.is_empty());
        assert!(tree.roots().is_empty());
    }

    #[test]
    fn absolute_coordinates_subtract_scroll_origin() {
        let mut tree = WindowTree::new();
        let root = tree.insert(None, Rect::new(10, 10, 100, 100)).unwrap();
        let panel = tree.insert(Some(root), Rect::new(5, 5, 50, 50)).unwrap();
        let item = tree.insert(Some(panel), Rect::new(20, 30, 10, 10)).unwrap();
        tree.get_mut(panel).unwrap().origin = Point::new(0, 25);
        assert_eq!(tree.absolute_origin(item), Some(Point::new(35, 20)));
        assert_eq!(
            tree.rect_absolute(item, Rect::new(1, 1, 2, 2)),
            Some(Rect::new(36, 21, 2, 2))
        );
    }

    #[test]
    fn visible_rect_is_clipped_by_clipping_ancestors() {
        let mut tree = WindowTree::new();
        let root = tree.insert(None, Rect::new(0, 0, 10, 10)).unwrap();
        let child = tree.insert(Some(root), Rect::new(8, 8, 5, 5)).unwrap();
        assert_eq!(tree.visible_rect(child), Some(Rect::new(8, 8, 2, 2)));
        tree.get_mut(root).unwrap().flags.remove(WindowFlags::CLIP_CHILDREN);
        assert_eq!(tree.visible_rect(child), Some(Rect::new(8, 8, 5, 5)));
        assert_eq!(tree.footprint(root), Some(Rect::new(0, 0, 13, 13)));
        tree.get_mut(root).unwrap().flags.remove(WindowFlags::VISIBLE);
        assert_eq!(tree.visible_rect(child), None);
    }

    #[test]
    fn detached_windows_are_not_shown() {
        let (mut tree, _, [c1, ..]) = layout();
        tree.unlink(c1);
        assert!(tree.is_alive(c1));
        assert!(!tree.is_attached(c1));
        assert!(!tree.is_shown(c1));
        assert_eq!(tree.paint_list(Rect::new(0, 0, 5, 5)).len(), 3);
    }

    #[test]
    fn hit_test_prefers_topmost_child() {
        let mut tree = WindowTree::new();
        let root = tree.insert(None, Rect::new(0, 0, 10, 10)).unwrap();
        let below = tree.insert(Some(root), Rect::new(0, 0, 6, 6)).unwrap();
        let above = tree.insert(Some(root), Rect::new(3, 3, 6, 6)).unwrap();
        assert_eq!(tree.hit_test(4, 4), vec![root, above]);
        assert_eq!(tree.hit_test(1, 1), vec![root, below]);
        assert_eq!(tree.get_child_xy(root, 4, 4), Some(above));
        assert!(tree.raise(below));
        assert_eq!(tree.hit_test(4, 4), vec![root, below]);
        assert!(tree.hit_test(20, 20).is_empty());
    }

    #[test]
    fn hit_test_skips_windows_ignoring_input() {
        let (mut tree, root, [_, c2, _]) = layout();
        tree.get_mut(c2).unwrap().flags.remove(WindowFlags::HANDLE_EVENTS);
        assert_eq!(tree.hit_test(2, 2), vec![root]);
    }

    #[test]
    fn paint_list_orders_parent_before_children() {
        let (tree, root, [c1, c2, c3]) = layout();
        let order: Vec<(WindowId, Rect)> = tree
            .paint_list(Rect::new(0, 0, 5, 5))
            .into_iter()
            .map(|item| (item.window, item.clip))
            .collect();
        assert_eq!(
            order,
            vec![
                (root, Rect::new(0, 0, 5, 5)),
                (c1, Rect::new(1, 1, 1, 1)),
                (c2, Rect::new(2, 2, 1, 1)),
                (c3, Rect::new(3, 3, 1, 1)),
            ]
        );
        let partial: Vec<WindowId> = tree
            .paint_list(Rect::new(2, 2, 2, 2))
            .into_iter()
            .map(|item| item.window)
            .collect();
        assert_eq!(partial, vec![root, c2, c3]);
    }

    #[test]
    fn raise_and_lower_report_changes() {
        let (mut tree, root, [c1, c2, c3]) = layout();
        assert!(!tree.raise(c3));
        assert!(tree.lower(c3));
        assert_eq!(tree.children_of(root), &[c3, c1, c2]);
        assert!(!tree.lower(c3));
        assert!(!tree.raise(root));
    }
}
