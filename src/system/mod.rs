//! The compositor: owns the window tree, the damage list and the
//! capture/focus/modal/hover slots, and drives the invalidate/repaint cycle.
//!
//! Every structural change goes through [`WindowSystem`] so that the screen
//! area a change affects is invalidated and references to windows that are
//! no longer shown are released before the next event is dispatched.

mod dispatch;
mod modal;

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::config::CompositorConfig;
use crate::damage::DamageList;
use crate::drivers::timer::{Clock, SystemClock, TimerId, TimerQueue};
use crate::drivers::{InputDriver, QueueInputDriver};
use crate::error::{Result, WindowError};
use crate::event::{Event, Modifiers};
use crate::event_loop::EventLoop;
use crate::graphics::{Graphics, NullGraphics};
use crate::rect::{Point, Rect, Size};
use crate::window::{CursorShape, PaintContext, WindowFlags, WindowHandler, WindowId, WindowTree};

pub use modal::ModalMode;
use modal::ModalStack;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerAction {
    Hover(WindowId),
    Window(WindowId),
}

impl TimerAction {
    fn window(self) -> WindowId {
        match self {
            Self::Hover(w) | Self::Window(w) => w,
        }
    }
}

/// Work aimed at a window whose handler is running further up the stack.
/// Replayed in order once the handler is back in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    Paint(Rect),
    Enter,
    Leave,
    FocusGained,
    FocusLost,
}

/// Assembles a [`WindowSystem`] from its backends. Anything not supplied
/// falls back to a headless default: a [`QueueInputDriver`],
/// [`NullGraphics`] and the [`SystemClock`].
pub struct WindowSystemBuilder {
    config: CompositorConfig,
    input: Option<Box<dyn InputDriver>>,
    graphics: Option<Box<dyn Graphics>>,
    clock: Option<Box<dyn Clock>>,
}

impl WindowSystemBuilder {
    pub fn input(mut self, driver: impl InputDriver + 'static) -> Self {
        self.input = Some(Box::new(driver));
        self
    }

    pub fn graphics(mut self, graphics: impl Graphics + 'static) -> Self {
        self.graphics = Some(Box::new(graphics));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn build(self) -> WindowSystem {
        let input = self
            .input
            .unwrap_or_else(|| Box::new(QueueInputDriver::new()));
        debug!(
            resolution = ?self.config.resolution,
            base = ?self.config.base(),
            "window system created"
        );
        WindowSystem {
            tree: WindowTree::new(),
            damage: DamageList::new(self.config.max_damage_entries),
            events: EventLoop::new(input, self.config.poll_interval),
            graphics: self.graphics.unwrap_or_else(|| Box::new(NullGraphics::new())),
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock::new())),
            timers: TimerQueue::new(),
            capture: None,
            focus: None,
            modal: ModalStack::default(),
            hover: Vec::new(),
            hover_timer: None,
            pointer: Point::default(),
            busy: Vec::new(),
            deferred: Vec::new(),
            config: self.config,
        }
    }
}

pub struct WindowSystem {
    config: CompositorConfig,
    tree: WindowTree,
    damage: DamageList,
    events: EventLoop,
    graphics: Box<dyn Graphics>,
    clock: Box<dyn Clock>,
    timers: TimerQueue<TimerAction>,
    capture: Option<WindowId>,
    focus: Option<WindowId>,
    modal: ModalStack,
    /// Windows under the pointer, outermost first.
    hover: Vec<WindowId>,
    hover_timer: Option<TimerId>,
    /// Last pointer position in base coordinates.
    pointer: Point,
    /// Windows whose handler is currently taken out by `with_handler`.
    busy: Vec<WindowId>,
    deferred: Vec<(WindowId, Deferred)>,
}

impl std::fmt::Debug for WindowSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowSystem")
            .field("tree", &self.tree)
            .field("damage", &self.damage)
            .field("capture", &self.capture)
            .field("focus", &self.focus)
            .field("modal", &self.modal)
            .field("hover", &self.hover)
            .finish_non_exhaustive()
    }
}

impl WindowSystem {
    /// Headless system: queued input, no drawing, wall-clock timers.
    pub fn new(config: CompositorConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: CompositorConfig) -> WindowSystemBuilder {
        WindowSystemBuilder {
            config,
            input: None,
            graphics: None,
            clock: None,
        }
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Layout resolution windows are positioned in.
    pub fn resolution(&self) -> Size {
        self.config.base()
    }

    /// Resolution input events arrive in.
    pub fn device_resolution(&self) -> Size {
        self.config.resolution
    }

    pub fn tree(&self) -> &WindowTree {
        &self.tree
    }

    pub fn damage(&self) -> &DamageList {
        &self.damage
    }

    pub fn graphics(&self) -> &dyn Graphics {
        self.graphics.as_ref()
    }

    pub fn graphics_mut(&mut self) -> &mut dyn Graphics {
        self.graphics.as_mut()
    }

    pub fn input_driver(&mut self) -> &mut dyn InputDriver {
        self.events.driver()
    }

    pub fn key_modifiers(&self) -> Modifiers {
        self.events.key_modifiers()
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Queue `event` behind any pending input.
    pub fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Ask the running loop to stop.
    pub fn quit(&mut self) {
        debug!("quit requested");
        self.events.push(Event::Quit);
    }

    // ---------------------------------------------------------------------
    // Tree structure
    // ---------------------------------------------------------------------

    /// Create a window as the topmost child of `parent`, or as the topmost
    /// root. On failure nothing changes.
    pub fn create_window(&mut self, parent: Option<WindowId>, rect: Rect) -> Result<WindowId> {
        let id = self.tree.insert(parent, rect)?;
        debug!(window = ?id, parent = ?parent, rect = ?rect, "window created");
        if let Some(area) = self.tree.footprint(id) {
            self.invalidate(area);
        }
        Ok(id)
    }

    /// Destroy `id` and its subtree. Children are notified through
    /// [`WindowHandler::on_destroy`] before their parents.
    pub fn destroy_window(&mut self, id: WindowId) -> Result<()> {
        self.tree.node(id)?;
        let area = self.tree.footprint(id);
        let removed = self.tree.remove(id);
        debug!(window = ?id, count = removed.len(), "window destroyed");
        // Dying windows get no leave/focus callbacks, only on_destroy.
        self.release_references(false);
        for (window, handler) in removed {
            if let Some(mut handler) = handler {
                handler.on_destroy(window);
            }
        }
        if let Some(area) = area {
            self.invalidate(area);
        }
        Ok(())
    }

    /// Move `id` under `parent` (or make it a root) as the topmost child.
    /// Both the vacated and the new screen area are invalidated.
    pub fn set_parent(&mut self, id: WindowId, parent: Option<WindowId>) -> Result<()> {
        self.tree.node(id)?;
        if let Some(p) = parent {
            self.tree.node(p)?;
            if self.tree.is_ancestor_or_self(id, p) {
                return Err(WindowError::InvalidArgument(
                    "a window cannot be reparented into its own subtree",
                ));
            }
        }
        self.tree.reserve_link(parent)?;
        let old = self.tree.footprint(id);
        self.tree.unlink(id);
        self.tree.link(id, parent)?;
        debug!(window = ?id, parent = ?parent, "window reparented");
        if let Some(area) = old {
            self.invalidate(area);
        }
        if let Some(area) = self.tree.footprint(id) {
            self.invalidate(area);
        }
        self.release_references(true);
        Ok(())
    }

    /// Take `id` out of its parent without destroying it. Roots stay where
    /// they are.
    pub fn detach(&mut self, id: WindowId) -> Result<()> {
        if self.tree.node(id)?.parent.is_none() {
            return Ok(());
        }
        let old = self.tree.footprint(id);
        self.tree.unlink(id);
        debug!(window = ?id, "window detached");
        if let Some(area) = old {
            self.invalidate(area);
        }
        self.release_references(true);
        Ok(())
    }

    /// Re-attach a detached window; shorthand for [`WindowSystem::set_parent`].
    pub fn attach(&mut self, id: WindowId, parent: Option<WindowId>) -> Result<()> {
        self.set_parent(id, parent)
    }

    pub fn raise_top(&mut self, id: WindowId) -> Result<()> {
        self.tree.node(id)?;
        if self.tree.raise(id) {
            trace!(window = ?id, "window raised");
            self.invalidate_footprint(id);
        }
        Ok(())
    }

    pub fn lower_bottom(&mut self, id: WindowId) -> Result<()> {
        self.tree.node(id)?;
        if self.tree.lower(id) {
            trace!(window = ?id, "window lowered");
            self.invalidate_footprint(id);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Geometry and attributes
    // ---------------------------------------------------------------------

    pub fn rect(&self, id: WindowId) -> Result<Rect> {
        Ok(self.tree.node(id)?.rect)
    }

    /// Move and/or resize `id` within its parent.
    ///
    /// The parts of the old footprint the new one no longer covers are
    /// invalidated first, then the new footprint. An unchanged rectangle is
    /// a no-op.
    pub fn set_rect(&mut self, id: WindowId, rect: Rect) -> Result<()> {
        if self.tree.node(id)?.rect == rect {
            return Ok(());
        }
        let old = self.tree.footprint(id);
        self.tree.node_mut(id)?.rect = rect;
        let new = self.tree.footprint(id);
        trace!(window = ?id, rect = ?rect, "window rect changed");
        self.invalidate_change(old, new);
        Ok(())
    }

    pub fn move_window(&mut self, id: WindowId, x: i32, y: i32) -> Result<()> {
        let mut rect = self.rect(id)?;
        rect.move_to(x, y);
        self.set_rect(id, rect)
    }

    /// Transform `local` from `id`'s space into absolute space.
    pub fn rect_absolute(&self, id: WindowId, local: Rect) -> Result<Rect> {
        self.tree
            .rect_absolute(id, local)
            .ok_or(WindowError::StaleWindow(id))
    }

    pub fn absolute_rect(&self, id: WindowId) -> Result<Rect> {
        self.tree
            .absolute_rect(id)
            .ok_or(WindowError::StaleWindow(id))
    }

    /// On-screen part of `id`, `None` when hidden or clipped away.
    pub fn visible_rect(&self, id: WindowId) -> Result<Option<Rect>> {
        self.tree.node(id)?;
        Ok(self.tree.visible_rect(id))
    }

    pub fn origin(&self, id: WindowId) -> Result<Point> {
        Ok(self.tree.node(id)?.origin)
    }

    /// Scroll the content of `id`: children are laid out relative to
    /// `origin` instead of the window's top-left corner.
    pub fn set_origin(&mut self, id: WindowId, origin: Point) -> Result<()> {
        if self.tree.node(id)?.origin == origin {
            return Ok(());
        }
        let old = self.tree.footprint(id);
        self.tree.node_mut(id)?.origin = origin;
        let new = self.tree.footprint(id);
        if let Some(area) = old {
            self.invalidate(area);
        }
        if let Some(area) = new {
            self.invalidate(area);
        }
        Ok(())
    }

    pub fn flags(&self, id: WindowId) -> Result<WindowFlags> {
        Ok(self.tree.node(id)?.flags)
    }

    pub fn set_flags(&mut self, id: WindowId, flags: WindowFlags) -> Result<()> {
        if self.tree.node(id)?.flags == flags {
            return Ok(());
        }
        let old = self.tree.footprint(id);
        self.tree.node_mut(id)?.flags = flags;
        let new = self.tree.footprint(id);
        trace!(window = ?id, flags = ?flags, "window flags changed");
        if let Some(area) = old {
            self.invalidate(area);
        }
        if let Some(area) = new {
            self.invalidate(area);
        }
        self.release_references(true);
        Ok(())
    }

    pub fn set_visible(&mut self, id: WindowId, visible: bool) -> Result<()> {
        let mut flags = self.flags(id)?;
        flags.set(WindowFlags::VISIBLE, visible);
        self.set_flags(id, flags)
    }

    pub fn show(&mut self, id: WindowId) -> Result<()> {
        self.set_visible(id, true)
    }

    pub fn hide(&mut self, id: WindowId) -> Result<()> {
        self.set_visible(id, false)
    }

    pub fn is_shown(&self, id: WindowId) -> bool {
        self.tree.is_shown(id)
    }

    pub fn is_alive(&self, id: WindowId) -> bool {
        self.tree.is_alive(id)
    }

    pub fn parent(&self, id: WindowId) -> Result<Option<WindowId>> {
        Ok(self.tree.node(id)?.parent)
    }

    pub fn children(&self, id: WindowId) -> Result<&[WindowId]> {
        Ok(&self.tree.node(id)?.children)
    }

    pub fn roots(&self) -> &[WindowId] {
        self.tree.roots()
    }

    pub fn cursor(&self, id: WindowId) -> Result<CursorShape> {
        Ok(self.tree.node(id)?.cursor)
    }

    pub fn set_cursor(&mut self, id: WindowId, cursor: CursorShape) -> Result<()> {
        self.tree.node_mut(id)?.cursor = cursor;
        Ok(())
    }

    /// Cursor shape for the current pointer position: the captured window's,
    /// else the innermost hovered window's.
    pub fn current_cursor(&self) -> CursorShape {
        self.capture
            .or_else(|| self.hover.last().copied())
            .and_then(|id| self.tree.get(id))
            .map_or(CursorShape::Arrow, |node| node.cursor)
    }

    /// Per-window hover delay; `None` falls back to the configured default.
    pub fn set_hover_delay(&mut self, id: WindowId, delay: Option<Duration>) -> Result<()> {
        self.tree.node_mut(id)?.hover_delay = delay;
        Ok(())
    }

    /// Install the event handler of `id` and schedule a repaint of it.
    pub fn set_handler<H: WindowHandler + 'static>(&mut self, id: WindowId, handler: H) -> Result<()> {
        self.tree.node_mut(id)?.handler = Some(Box::new(handler));
        self.invalidate_footprint(id);
        Ok(())
    }

    pub fn clear_handler(&mut self, id: WindowId) -> Result<()> {
        self.tree.node_mut(id)?.handler = None;
        Ok(())
    }

    /// Topmost child of `parent` under a point in `parent`'s local space.
    pub fn get_child_xy(&self, parent: WindowId, x: i32, y: i32) -> Result<Option<WindowId>> {
        self.tree.node(parent)?;
        Ok(self.tree.get_child_xy(parent, x, y))
    }

    /// Innermost window under an absolute point.
    pub fn window_at(&self, x: i32, y: i32) -> Option<WindowId> {
        self.tree.hit_test(x, y).last().copied()
    }

    // ---------------------------------------------------------------------
    // Invalidation and repaint
    // ---------------------------------------------------------------------

    /// Queue `rect` (absolute) for repaint.
    pub fn invalidate_rect(&mut self, rect: Rect) -> Result<()> {
        self.damage
            .push(rect)
            .map_err(|_| WindowError::OutOfMemory("damage entry"))
    }

    /// Queue the whole screen and every root for repaint.
    pub fn invalidate_all(&mut self) {
        let base = self.config.base();
        let mut area = Rect::new(0, 0, base.w, base.h);
        for &root in self.tree.roots() {
            if let Some(r) = self.tree.footprint(root) {
                area.extend(&r);
            }
        }
        self.invalidate(area);
    }

    /// Queue everything `id` and its subtree show on screen.
    pub fn invalidate_window(&mut self, id: WindowId) -> Result<()> {
        self.tree.node(id)?;
        self.invalidate_footprint(id);
        Ok(())
    }

    /// Queue part of `id`, given in its local space and clipped to what is
    /// visible of it.
    pub fn invalidate_window_rect(&mut self, id: WindowId, local: Rect) -> Result<()> {
        let abs = self.rect_absolute(id, local)?;
        if let Some(visible) = self.tree.visible_rect(id)
            && let Some(area) = abs.intersect(&visible)
        {
            self.invalidate(area);
        }
        Ok(())
    }

    // Internal invalidation never fails: if the damage list cannot grow it
    // collapses into one bounding box instead.
    fn invalidate(&mut self, rect: Rect) {
        if self.damage.push(rect).is_err() {
            warn!(rect = ?rect, "damage list allocation failed, collapsing");
            self.damage.collapse_with(rect);
        }
    }

    fn invalidate_footprint(&mut self, id: WindowId) {
        if let Some(area) = self.tree.footprint(id) {
            self.invalidate(area);
        }
    }

    fn invalidate_change(&mut self, old: Option<Rect>, new: Option<Rect>) {
        if let Some(old) = old {
            match new.map(|n| old.subtract(&n)) {
                Some(Ok(pieces)) => {
                    for piece in pieces {
                        self.invalidate(piece);
                    }
                }
                Some(Err(_)) | None => self.invalidate(old),
            }
        }
        if let Some(new) = new {
            self.invalidate(new);
        }
    }

    /// Repaint all pending damage. Returns the number of paint callbacks
    /// that ran.
    ///
    /// Damage rectangles are handled in FIFO order; for each, every window
    /// overlapping it paints parents first and siblings bottom to top. When
    /// the backend fails to begin a window's paint that window is skipped
    /// and the rectangle stays pending for the next call. A window whose
    /// handler is running further up the stack (e.g. it entered a blocking
    /// modal) keeps its clip pending until that handler returns.
    pub fn update(&mut self) -> usize {
        if self.damage.is_empty() {
            return 0;
        }
        let pending = self.damage.take();
        let mut retry = Vec::new();
        let mut painted = 0;
        for rect in pending {
            let mut failed = false;
            for item in self.tree.paint_list(rect) {
                let Some(mut handler) = self.tree.take_handler(item.window) else {
                    if self.busy.contains(&item.window) {
                        self.defer(item.window, Deferred::Paint(item.clip));
                    }
                    continue;
                };
                match self.graphics.begin() {
                    Ok(()) => {
                        self.graphics.set_clip(item.clip);
                        let mut ctx = PaintContext::new(
                            item.window,
                            self.graphics.as_mut(),
                            item.bounds,
                            item.clip,
                        );
                        handler.on_paint(&mut ctx);
                        self.graphics.end();
                        painted += 1;
                    }
                    Err(err) => {
                        warn!(window = ?item.window, rect = ?item.clip, error = %err, "paint deferred");
                        failed = true;
                    }
                }
                self.tree.restore_handler(item.window, handler);
            }
            if failed {
                retry.push(rect);
            }
        }
        for rect in retry {
            self.invalidate(rect);
        }
        painted
    }

    // ---------------------------------------------------------------------
    // Capture, focus, hover, timers
    // ---------------------------------------------------------------------

    pub fn capture(&self) -> Option<WindowId> {
        self.capture
    }

    /// Route every mouse event to `window` regardless of position, or
    /// release capture with `None`.
    pub fn set_capture(&mut self, window: Option<WindowId>) -> Result<()> {
        if let Some(w) = window {
            self.tree.node(w)?;
            if !self.tree.is_shown(w) {
                return Err(WindowError::InvalidArgument("capture target is not shown"));
            }
        }
        if self.capture != window {
            debug!(window = ?window, "capture changed");
            self.capture = window;
        }
        Ok(())
    }

    pub fn focus(&self) -> Option<WindowId> {
        self.focus
    }

    /// Direct keyboard input to `window`. The previous focus receives
    /// `on_focus_lost`, the new one `on_focus_gained`.
    pub fn set_focus(&mut self, window: Option<WindowId>) -> Result<()> {
        if let Some(w) = window {
            self.tree.node(w)?;
            if !self.tree.is_shown(w) {
                return Err(WindowError::InvalidArgument("focus target is not shown"));
            }
        }
        let old = self.focus;
        if old == window {
            return Ok(());
        }
        debug!(from = ?old, to = ?window, "focus changed");
        self.focus = window;
        if let Some(old) = old {
            self.notify(old, Deferred::FocusLost);
        }
        if let Some(new) = window {
            self.notify(new, Deferred::FocusGained);
        }
        Ok(())
    }

    /// Windows under the pointer, outermost first.
    pub fn hovered(&self) -> &[WindowId] {
        &self.hover
    }

    pub fn pointer(&self) -> Point {
        self.pointer
    }

    /// Call [`WindowHandler::on_timer`] of `window` once `delay` has passed.
    pub fn add_timer(&mut self, window: WindowId, delay: Duration) -> Result<TimerId> {
        self.tree.node(window)?;
        let now = self.clock.now();
        Ok(self.timers.add_timer(now, delay, TimerAction::Window(window)))
    }

    /// Cancel a window timer. Returns whether it was still pending.
    pub fn remove_timer(&mut self, timer: TimerId) -> bool {
        if self.hover_timer == Some(timer) {
            return false;
        }
        self.timers.remove_timer(timer).is_some()
    }

    // ---------------------------------------------------------------------
    // Modal contexts
    // ---------------------------------------------------------------------

    /// Topmost modal window.
    pub fn modal(&self) -> Option<WindowId> {
        self.modal.top()
    }

    pub fn modal_depth(&self) -> usize {
        self.modal.depth()
    }

    pub fn is_modal(&self, window: WindowId) -> bool {
        self.modal.windows().any(|w| w == window)
    }

    /// Make `window` the exclusive recipient of input.
    ///
    /// The window is shown, raised and focused. With [`ModalMode::Block`]
    /// this runs a nested event loop and returns the code passed to
    /// [`WindowSystem::modal_exit`], or 0 when the window was hidden or
    /// destroyed, or a quit event arrived (which is re-queued for the
    /// enclosing loop). With [`ModalMode::Unblock`] it returns 0 at once.
    pub fn modal_enter(&mut self, window: WindowId, mode: ModalMode) -> Result<i32> {
        self.tree.node(window)?;
        self.modal
            .reserve()
            .map_err(|_| WindowError::OutOfMemory("modal context"))?;
        self.show(window)?;
        if !self.tree.is_shown(window) {
            return Err(WindowError::InvalidArgument("modal window is not shown"));
        }
        self.raise_top(window)?;
        let token = self.modal.push(window, mode, self.focus);
        debug!(window = ?window, mode = ?mode, depth = self.modal.depth(), "modal entered");
        if let Some(c) = self.capture
            && !self.tree.is_ancestor_or_self(window, c)
        {
            debug!(window = ?c, "capture released by modal");
            self.capture = None;
        }
        if !self
            .focus
            .is_some_and(|f| self.tree.is_ancestor_or_self(window, f))
        {
            self.set_focus(Some(window))?;
        }
        if mode == ModalMode::Unblock {
            return Ok(0);
        }
        loop {
            if let Some(code) = self.modal.take_result(token) {
                return Ok(code);
            }
            match self.step() {
                Ok(true) => {}
                Ok(false) => {
                    let removed = self.modal.unwind_token(token);
                    self.finish_modal(&removed);
                    self.events.push(Event::Quit);
                    return Ok(self.modal.take_result(token).unwrap_or(0));
                }
                Err(err) => {
                    let removed = self.modal.unwind_token(token);
                    self.finish_modal(&removed);
                    self.modal.take_result(token);
                    return Err(err);
                }
            }
        }
    }

    /// End the modal context of `window` with `code` and hide it. Contexts
    /// entered after it end too, with 0.
    pub fn modal_exit(&mut self, window: WindowId, code: i32) -> Result<()> {
        self.tree.node(window)?;
        let idx = self
            .modal
            .position(window)
            .ok_or(WindowError::NotModal(window))?;
        let removed = self.modal.unwind_from(idx, code);
        debug!(window = ?window, code, depth = self.modal.depth(), "modal exited");
        self.hide(window)?;
        self.finish_modal(&removed);
        Ok(())
    }

    // Restore the focus saved by the lowest ended context if the focus is
    // gone or still inside one of the ended windows.
    fn finish_modal(&mut self, removed: &[modal::ModalEntry]) {
        let Some(first) = removed.first() else {
            return;
        };
        let focus_inside = self.focus.is_none_or(|f| {
            removed
                .iter()
                .any(|entry| self.tree.is_ancestor_or_self(entry.window, f))
        });
        if !focus_inside {
            return;
        }
        let restore = first.prev_focus.filter(|w| self.tree.is_shown(*w));
        if let Err(err) = self.set_focus(restore) {
            trace!(error = %err, "focus not restored after modal");
        }
    }

    // ---------------------------------------------------------------------
    // Event loop
    // ---------------------------------------------------------------------

    /// Process at most one input event, fire due timers, then repaint.
    /// Returns `false` once a quit event was processed.
    pub fn step(&mut self) -> Result<bool> {
        self.fire_timers();
        let wait = match self.timers.next_deadline() {
            Some(deadline) => deadline.saturating_sub(self.clock.now()),
            None => self.events.poll_interval(),
        };
        let keep_going = match self.events.poll_timeout(wait)? {
            Some(event) => self.dispatch(event),
            None => true,
        };
        self.fire_timers();
        self.update();
        Ok(keep_going)
    }

    /// Run [`WindowSystem::step`] until a quit event.
    pub fn run(&mut self) -> Result<()> {
        while self.step()? {}
        debug!("event loop finished");
        Ok(())
    }

    fn fire_timers(&mut self) {
        let now = self.clock.now();
        for (id, action) in self.timers.take_due(now) {
            match action {
                TimerAction::Hover(window) => {
                    if self.hover_timer == Some(id) {
                        self.hover_timer = None;
                        self.deliver_hover(window);
                    }
                }
                TimerAction::Window(window) => {
                    self.with_handler(window, |h, sys| h.on_timer(sys, window, id));
                }
            }
        }
    }

    fn restart_hover_timer(&mut self) {
        if let Some(old) = self.hover_timer.take() {
            self.timers.remove_timer(old);
        }
        let Some(&inner) = self.hover.last() else {
            return;
        };
        let delay = self
            .tree
            .get(inner)
            .and_then(|node| node.hover_delay)
            .or(self.config.hover_delay);
        if let Some(delay) = delay {
            let now = self.clock.now();
            self.hover_timer = Some(self.timers.add_timer(now, delay, TimerAction::Hover(inner)));
        }
    }

    /// Run `f` with the handler of `id` taken out of the tree, so the
    /// callback may freely mutate the system. Returns `None` when the
    /// window is gone or has no handler (or its handler is already
    /// running further up the stack).
    pub(crate) fn with_handler<R>(
        &mut self,
        id: WindowId,
        f: impl FnOnce(&mut dyn WindowHandler, &mut WindowSystem) -> R,
    ) -> Option<R> {
        let mut handler = self.tree.take_handler(id)?;
        self.busy.push(id);
        let out = f(handler.as_mut(), self);
        if let Some(pos) = self.busy.iter().rposition(|w| *w == id) {
            self.busy.remove(pos);
        }
        if self.tree.is_alive(id) {
            self.tree.restore_handler(id, handler);
            self.replay_deferred(id);
        } else {
            // The window was destroyed while its own handler ran.
            self.deferred.retain(|(w, _)| *w != id);
            handler.on_destroy(id);
        }
        Some(out)
    }

    /// Deliver an enter/leave/focus notification, or queue it when the
    /// window's handler is busy.
    fn notify(&mut self, id: WindowId, note: Deferred) {
        let delivered = match note {
            Deferred::Enter => self.with_handler(id, |h, sys| h.on_mouse_enter(sys, id)),
            Deferred::Leave => self.with_handler(id, |h, sys| h.on_mouse_leave(sys, id)),
            Deferred::FocusGained => self.with_handler(id, |h, sys| h.on_focus_gained(sys, id)),
            Deferred::FocusLost => self.with_handler(id, |h, sys| h.on_focus_lost(sys, id)),
            Deferred::Paint(rect) => {
                self.invalidate(rect);
                Some(())
            }
        };
        if delivered.is_none() && self.busy.contains(&id) {
            self.defer(id, note);
        }
    }

    fn defer(&mut self, id: WindowId, note: Deferred) {
        if let Deferred::Paint(rect) = note {
            // One pending clip per window is enough.
            for (w, queued) in &mut self.deferred {
                if let Deferred::Paint(area) = queued
                    && *w == id
                {
                    area.extend(&rect);
                    return;
                }
            }
        }
        trace!(window = ?id, note = ?note, "deferred until handler returns");
        self.deferred.push((id, note));
    }

    fn replay_deferred(&mut self, id: WindowId) {
        if !self.deferred.iter().any(|(w, _)| *w == id) {
            return;
        }
        let (mine, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deferred)
            .into_iter()
            .partition(|(w, _)| *w == id);
        self.deferred = rest;
        for (_, note) in mine {
            if self.tree.is_alive(id) {
                self.notify(id, note);
            }
        }
    }

    /// Drop capture, focus, hover and modal references to windows that are
    /// no longer shown, and timers of windows that no longer exist. With
    /// `notify`, surviving windows that lose focus or hover are told.
    pub(crate) fn release_references(&mut self, notify: bool) {
        if let Some(c) = self.capture
            && !self.tree.is_shown(c)
        {
            debug!(window = ?c, "capture released");
            self.capture = None;
        }

        if let Some(f) = self.focus
            && !self.tree.is_shown(f)
        {
            debug!(window = ?f, "focus released");
            self.focus = None;
            if notify {
                self.notify(f, Deferred::FocusLost);
            }
        }

        if let Some(cut) = self.hover.iter().position(|w| !self.tree.is_shown(*w)) {
            let left = self.hover.split_off(cut);
            trace!(count = left.len(), "hover released");
            if notify {
                for &w in left.iter().rev() {
                    self.notify(w, Deferred::Leave);
                }
            }
            self.restart_hover_timer();
        }

        let tree = &self.tree;
        let ended = self.modal.remove_where(|w| !tree.is_shown(w));
        if !ended.is_empty() {
            debug!(count = ended.len(), depth = self.modal.depth(), "modal contexts ended");
            self.finish_modal(&ended);
        }

        let tree = &self.tree;
        self.timers.retain(|action| tree.is_alive(action.window()));
        if let Some(timer) = self.hover_timer
            && !self.timers.contains(timer)
        {
            self.hover_timer = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system() -> WindowSystem {
        WindowSystem::new(CompositorConfig::default())
    }

    #[test]
    fn create_invalidates_new_window() {
        let mut sys = system();
        let root = sys.create_window(None, Rect::new(0, 0, 10, 10)).unwrap();
        assert_eq!(sys.damage().as_slice(), &[Rect::new(0, 0, 10, 10)]);
        sys.update();
        assert!(sys.damage().is_empty());
        assert_eq!(sys.roots(), &[root]);
    }

    #[test]
    fn stale_ids_are_rejected() {
        let mut sys = system();
        let root = sys.create_window(None, Rect::new(0, 0, 10, 10)).unwrap();
        sys.destroy_window(root).unwrap();
        assert!(matches!(
            sys.set_rect(root, Rect::new(0, 0, 1, 1)),
            Err(WindowError::StaleWindow(id)) if id == root
        ));
        assert!(matches!(sys.destroy_window(root), Err(WindowError::StaleWindow(_))));
    }

    #[test]
    fn reparenting_into_own_subtree_fails() {
        let mut sys = system();
        let root = sys.create_window(None, Rect::new(0, 0, 10, 10)).unwrap();
        let child = sys.create_window(Some(root), Rect::new(1, 1, 2, 2)).unwrap();
        assert!(matches!(
            sys.set_parent(root, Some(child)),
            Err(WindowError::InvalidArgument(_))
        ));
        assert_eq!(sys.parent(child).unwrap(), Some(root));
    }

    #[test]
    fn hiding_releases_capture_and_focus() {
        let mut sys = system();
        let root = sys.create_window(None, Rect::new(0, 0, 10, 10)).unwrap();
        let child = sys.create_window(Some(root), Rect::new(1, 1, 2, 2)).unwrap();
        sys.set_capture(Some(child)).unwrap();
        sys.set_focus(Some(child)).unwrap();
        sys.hide(root).unwrap();
        assert_eq!(sys.capture(), None);
        assert_eq!(sys.focus(), None);
        assert!(matches!(
            sys.set_focus(Some(child)),
            Err(WindowError::InvalidArgument(_))
        ));
    }

    #[test]
    fn detached_window_keeps_living() {
        let mut sys = system();
        let root = sys.create_window(None, Rect::new(0, 0, 10, 10)).unwrap();
        let child = sys.create_window(Some(root), Rect::new(1, 1, 2, 2)).unwrap();
        sys.update();
        sys.detach(child).unwrap();
        assert!(sys.is_alive(child));
        assert!(!sys.is_shown(child));
        assert_eq!(sys.damage().as_slice(), &[Rect::new(1, 1, 2, 2)]);
        sys.detach(root).unwrap();
        assert_eq!(sys.roots(), &[root]);
        sys.set_parent(child, Some(root)).unwrap();
        assert_eq!(sys.children(root).unwrap(), &[child]);
    }

    #[test]
    fn modal_exit_requires_modal_window() {
        let mut sys = system();
        let root = sys.create_window(None, Rect::new(0, 0, 10, 10)).unwrap();
        assert!(matches!(sys.modal_exit(root, 1), Err(WindowError::NotModal(_))));
        assert_eq!(sys.modal_enter(root, ModalMode::Unblock).unwrap(), 0);
        assert_eq!(sys.modal(), Some(root));
        assert_eq!(sys.focus(), Some(root));
        sys.modal_exit(root, 1).unwrap();
        assert_eq!(sys.modal_depth(), 0);
        assert!(!sys.is_shown(root));
    }

    #[test]
    fn timers_of_destroyed_windows_are_dropped() {
        let mut sys = system();
        let root = sys.create_window(None, Rect::new(0, 0, 10, 10)).unwrap();
        let timer = sys.add_timer(root, Duration::from_secs(60)).unwrap();
        sys.destroy_window(root).unwrap();
        assert!(!sys.remove_timer(timer));
    }
}
