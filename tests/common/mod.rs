#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use wintree::{
    Color, CompositorConfig, Key, KeyEvent, ModalMode, MouseEvent, PaintContext, Rect, Size,
    TimerId, WindowHandler, WindowId, WindowSystem,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Paint(&'static str, Rect),
    Move(&'static str, i32, i32),
    Down(&'static str, i32, i32),
    Up(&'static str, i32, i32),
    Key(&'static str, Key),
    Enter(&'static str),
    Leave(&'static str),
    Hover(&'static str),
    FocusGained(&'static str),
    FocusLost(&'static str),
    Timer(&'static str),
    Destroy(&'static str),
    /// A blocking modal entered from this window's handler returned.
    Returned(&'static str, i32),
}

pub type Log = Rc<RefCell<Vec<Entry>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn drain(log: &Log) -> Vec<Entry> {
    std::mem::take(&mut *log.borrow_mut())
}

/// Handler that records every callback. Paints fill the window with
/// `color` and record the absolute clip.
pub struct Recorder {
    pub name: &'static str,
    pub log: Log,
    pub color: Color,
    /// Returned from input callbacks; `false` lets events bubble.
    pub handles: bool,
}

impl Recorder {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: Rc::clone(log),
            color: Color::WHITE,
            handles: true,
        }
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn passthrough(mut self) -> Self {
        self.handles = false;
        self
    }

    fn push(&self, entry: Entry) {
        self.log.borrow_mut().push(entry);
    }
}

impl WindowHandler for Recorder {
    fn on_paint(&mut self, ctx: &mut PaintContext<'_>) -> bool {
        self.push(Entry::Paint(self.name, ctx.clip()));
        ctx.clear(self.color);
        true
    }

    fn on_mouse_move(&mut self, _sys: &mut WindowSystem, event: &MouseEvent) -> bool {
        self.push(Entry::Move(self.name, event.x, event.y));
        self.handles
    }

    fn on_mouse_button_down(&mut self, _sys: &mut WindowSystem, event: &MouseEvent) -> bool {
        self.push(Entry::Down(self.name, event.x, event.y));
        self.handles
    }

    fn on_mouse_button_up(&mut self, _sys: &mut WindowSystem, event: &MouseEvent) -> bool {
        self.push(Entry::Up(self.name, event.x, event.y));
        self.handles
    }

    fn on_mouse_enter(&mut self, _sys: &mut WindowSystem, _window: WindowId) {
        self.push(Entry::Enter(self.name));
    }

    fn on_mouse_leave(&mut self, _sys: &mut WindowSystem, _window: WindowId) {
        self.push(Entry::Leave(self.name));
    }

    fn on_mouse_hover(&mut self, _sys: &mut WindowSystem, _event: &MouseEvent) {
        self.push(Entry::Hover(self.name));
    }

    fn on_key_down(&mut self, _sys: &mut WindowSystem, event: &KeyEvent) -> bool {
        self.push(Entry::Key(self.name, event.key));
        self.handles
    }

    fn on_focus_gained(&mut self, _sys: &mut WindowSystem, _window: WindowId) {
        self.push(Entry::FocusGained(self.name));
    }

    fn on_focus_lost(&mut self, _sys: &mut WindowSystem, _window: WindowId) {
        self.push(Entry::FocusLost(self.name));
    }

    fn on_timer(&mut self, _sys: &mut WindowSystem, _window: WindowId, _timer: TimerId) {
        self.push(Entry::Timer(self.name));
    }

    fn on_destroy(&mut self, _window: WindowId) {
        self.push(Entry::Destroy(self.name));
    }
}

pub fn config(w: i32, h: i32) -> CompositorConfig {
    CompositorConfig {
        resolution: Size::new(w, h),
        ..CompositorConfig::default()
    }
}

/// Create a window with a [`Recorder`] handler.
pub fn window(
    sys: &mut WindowSystem,
    parent: Option<WindowId>,
    rect: Rect,
    name: &'static str,
    log: &Log,
) -> WindowId {
    let id = sys.create_window(parent, rect).unwrap();
    sys.set_handler(id, Recorder::new(name, log)).unwrap();
    id
}

/// Recorder that enters `dialog` as a blocking modal from its own
/// mouse-down handler.
pub struct ModalOpener {
    pub inner: Recorder,
    pub dialog: WindowId,
}

impl WindowHandler for ModalOpener {
    fn on_paint(&mut self, ctx: &mut PaintContext<'_>) -> bool {
        self.inner.on_paint(ctx)
    }

    fn on_mouse_button_down(&mut self, sys: &mut WindowSystem, _event: &MouseEvent) -> bool {
        let code = sys.modal_enter(self.dialog, ModalMode::Block).unwrap();
        self.inner.push(Entry::Returned(self.inner.name, code));
        true
    }

    fn on_mouse_enter(&mut self, sys: &mut WindowSystem, window: WindowId) {
        self.inner.on_mouse_enter(sys, window);
    }

    fn on_mouse_leave(&mut self, sys: &mut WindowSystem, window: WindowId) {
        self.inner.on_mouse_leave(sys, window);
    }

    fn on_focus_gained(&mut self, sys: &mut WindowSystem, window: WindowId) {
        self.inner.on_focus_gained(sys, window);
    }

    fn on_focus_lost(&mut self, sys: &mut WindowSystem, window: WindowId) {
        self.inner.on_focus_lost(sys, window);
    }
}

/// Recorder that leaves its modal with code 1 on Enter.
pub struct Closer(pub Recorder);

impl WindowHandler for Closer {
    fn on_paint(&mut self, ctx: &mut PaintContext<'_>) -> bool {
        self.0.on_paint(ctx)
    }

    fn on_key_down(&mut self, sys: &mut WindowSystem, event: &KeyEvent) -> bool {
        if event.key == Key::Enter {
            sys.modal_exit(event.window, 1).unwrap();
            return true;
        }
        false
    }

    fn on_mouse_enter(&mut self, sys: &mut WindowSystem, window: WindowId) {
        self.0.on_mouse_enter(sys, window);
    }

    fn on_mouse_leave(&mut self, sys: &mut WindowSystem, window: WindowId) {
        self.0.on_mouse_leave(sys, window);
    }
}

/// Root `desktop` (0,0,10,10) whose handler opens the hidden `dialog`
/// (4,4,3,3) on mouse-down. Input comes from `events`, then quit.
pub fn blocking_dialog(
    events: Vec<wintree::Event>,
    log: &Log,
) -> (WindowSystem, WindowId, WindowId) {
    let driver =
        wintree::drivers::QueueInputDriver::with_events(events).quit_when_drained(true);
    let mut sys = WindowSystem::builder(config(10, 10)).input(driver).build();
    let desktop = sys.create_window(None, Rect::new(0, 0, 10, 10)).unwrap();
    let dialog = sys.create_window(Some(desktop), Rect::new(4, 4, 3, 3)).unwrap();
    sys.set_handler(dialog, Closer(Recorder::new("dialog", log)))
        .unwrap();
    sys.hide(dialog).unwrap();
    sys.set_handler(
        desktop,
        ModalOpener {
            inner: Recorder::new("desktop", log),
            dialog,
        },
    )
    .unwrap();
    sys.update();
    drain(log);
    (sys, desktop, dialog)
}
