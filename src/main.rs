use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect as CellRect;

use wintree::drivers::console::ConsoleOutputDriver;
use wintree::drivers::{ConsoleInputDriver, InputDriver};
use wintree::graphics::TerminalGraphics;
use wintree::tracing_sub;
use wintree::{
    Color, CompositorConfig, CursorShape, Graphics, GraphicsError, Key, KeyEvent, ModalMode,
    Modifiers, MouseButton, MouseEvent, PaintContext, Point, Rect, WindowHandler, WindowId,
    WindowSystem,
};

const HELP: &str = indoc::indoc! {"
    wintree demo
    click a panel to raise and focus it
    drag a title bar to move a panel
    m: open a modal dialog
    ctrl+q: quit
"};

#[derive(Parser, Debug)]
#[command(
    name = "wintree",
    version = env!("CARGO_PKG_VERSION"),
    about = "Interactive window-tree compositor demo in the terminal"
)]
struct Cli {
    /// Write debug logs to this file.
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Override a configuration key, e.g. `--set input.hover_delay_ms=300`.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
}

fn invalid_input(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg.into())
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    tracing_sub::init_default(cli.log_file.as_deref())?;

    let output = ConsoleOutputDriver::new()?;
    let size = output.size()?;
    let mut pairs = vec![
        ("video.width".to_string(), size.w.to_string()),
        ("video.height".to_string(), size.h.to_string()),
    ];
    for entry in &cli.set {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| invalid_input(format!("expected KEY=VALUE, got `{entry}`")))?;
        pairs.push((key.trim().to_string(), value.trim().to_string()));
    }
    let config =
        CompositorConfig::from_pairs(pairs).map_err(|err| invalid_input(err.to_string()))?;

    let buffer = Rc::new(RefCell::new(Buffer::empty(cell_area(size.w, size.h))));
    let output = Rc::new(RefCell::new(output));
    let mut input = ConsoleInputDriver::new();
    output.borrow_mut().enter()?;
    input.set_mouse_capture(true)?;

    let screen = Screen {
        inner: TerminalGraphics::new(Rc::clone(&buffer)),
        output: Rc::clone(&output),
    };
    let mut sys = WindowSystem::builder(config)
        .input(input)
        .graphics(screen)
        .build();

    let result = build_demo(&mut sys)
        .and_then(|desktop| run(&mut sys, desktop, &buffer))
        .map_err(|err| io::Error::other(err.to_string()));
    output.borrow_mut().exit()?;
    result
}

fn cell_area(w: i32, h: i32) -> CellRect {
    CellRect::new(
        0,
        0,
        u16::try_from(w).unwrap_or(u16::MAX),
        u16::try_from(h).unwrap_or(u16::MAX),
    )
}

/// Terminal graphics that push each finished paint to the screen, so frames
/// keep flowing while a blocking modal runs inside a handler.
struct Screen {
    inner: TerminalGraphics,
    output: Rc<RefCell<ConsoleOutputDriver>>,
}

impl Screen {
    fn present(&mut self) {
        if !self.inner.take_dirty() {
            return;
        }
        let buffer = self.inner.buffer().borrow();
        if let Err(err) = self.output.borrow_mut().present(&buffer) {
            tracing::warn!(error = %err, "present failed");
        }
    }
}

impl Graphics for Screen {
    fn begin(&mut self) -> Result<(), GraphicsError> {
        let size = self
            .output
            .borrow()
            .size()
            .map_err(|err| GraphicsError::Backend(err.to_string()))?;
        let area = cell_area(size.w, size.h);
        let mut buffer = self.inner.buffer().borrow_mut();
        if buffer.area != area {
            buffer.resize(area);
        }
        drop(buffer);
        self.inner.begin()
    }

    fn end(&mut self) {
        self.inner.end();
        self.present();
    }

    fn set_clip(&mut self, clip: Rect) {
        self.inner.set_clip(clip);
    }

    fn clip(&self) -> Rect {
        self.inner.clip()
    }

    fn set_color(&mut self, color: Color) {
        self.inner.set_color(color);
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.inner.fill_rect(rect);
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.inner.stroke_rect(rect);
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        self.inner.draw_text(x, y, text);
    }
}

fn run(sys: &mut WindowSystem, desktop: WindowId, buffer: &Rc<RefCell<Buffer>>) -> wintree::Result<()> {
    sys.update();
    while sys.step()? {
        let size = sys.resolution();
        if sys.rect(desktop)?.size() != size {
            let area = cell_area(size.w, size.h);
            buffer.borrow_mut().resize(area);
            sys.set_rect(desktop, Rect::new(0, 0, size.w, size.h))?;
            sys.update();
        }
    }
    Ok(())
}

fn build_demo(sys: &mut WindowSystem) -> wintree::Result<WindowId> {
    let size = sys.resolution();
    let desktop = sys.create_window(None, Rect::new(0, 0, size.w, size.h))?;
    sys.set_handler(desktop, Desktop)?;

    let panels = [
        ("alpha", Rect::new(4, 3, 30, 10), Color::BLUE),
        ("beta", Rect::new(20, 8, 34, 12), Color::GREEN),
        ("gamma", Rect::new(40, 2, 26, 9), Color::RED),
    ];
    for (title, rect, color) in panels {
        let panel = sys.create_window(Some(desktop), rect)?;
        sys.set_cursor(panel, CursorShape::Hand)?;
        sys.set_handler(panel, Panel::new(title, color))?;
        let label = sys.create_window(Some(panel), Rect::new(2, 3, rect.w() - 4, 3))?;
        sys.set_handler(label, Label::new(format!("{title} content")))?;
    }
    sys.set_focus(Some(desktop))?;
    Ok(desktop)
}

fn ctrl_q(event: &KeyEvent) -> bool {
    event.key == Key::Char('q') && event.modifiers.contains(Modifiers::CONTROL)
}

struct Desktop;

impl WindowHandler for Desktop {
    fn on_paint(&mut self, ctx: &mut PaintContext<'_>) -> bool {
        ctx.clear(Color::DARK_GRAY);
        ctx.set_color(Color::GRAY);
        let bottom = ctx.local_bounds().h();
        let lines: Vec<&str> = HELP.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            ctx.draw_text(1, bottom - lines.len() as i32 + i as i32 - 1, line);
        }
        true
    }

    fn on_key_down(&mut self, sys: &mut WindowSystem, event: &KeyEvent) -> bool {
        if ctrl_q(event) {
            sys.quit();
            return true;
        }
        if event.key == Key::Char('m') {
            if let Err(err) = open_dialog(sys, event.window) {
                tracing::warn!(error = %err, "dialog failed");
            }
            return true;
        }
        false
    }
}

fn open_dialog(sys: &mut WindowSystem, desktop: WindowId) -> wintree::Result<()> {
    let size = sys.rect(desktop)?.size();
    let rect = Rect::new(size.w / 2 - 20, size.h / 2 - 4, 40, 8);
    let dialog = sys.create_window(Some(desktop), rect)?;
    sys.set_handler(dialog, Dialog)?;
    let code = sys.modal_enter(dialog, ModalMode::Block)?;
    tracing::info!(code, "dialog closed");
    if sys.is_alive(dialog) {
        sys.destroy_window(dialog)?;
    }
    Ok(())
}

struct Dialog;

impl WindowHandler for Dialog {
    fn on_paint(&mut self, ctx: &mut PaintContext<'_>) -> bool {
        let bounds = ctx.local_bounds();
        ctx.clear(Color::BLACK);
        ctx.set_color(Color::YELLOW);
        ctx.stroke_rect(bounds);
        ctx.set_color(Color::WHITE);
        ctx.draw_text(2, 2, "Modal dialog");
        ctx.draw_text(2, 4, "enter: ok   esc: cancel");
        true
    }

    fn on_key_down(&mut self, sys: &mut WindowSystem, event: &KeyEvent) -> bool {
        let result = match event.key {
            Key::Enter => sys.modal_exit(event.window, 1),
            Key::Esc => sys.modal_exit(event.window, 0),
            _ if ctrl_q(event) => {
                sys.quit();
                Ok(())
            }
            _ => return false,
        };
        if let Err(err) = result {
            tracing::warn!(error = %err, "modal exit failed");
        }
        true
    }
}

struct Panel {
    title: &'static str,
    color: Color,
    hot: bool,
    hinted: bool,
    /// Grab point inside the title bar while dragging.
    drag: Option<Point>,
}

impl Panel {
    fn new(title: &'static str, color: Color) -> Self {
        Self {
            title,
            color,
            hot: false,
            hinted: false,
            drag: None,
        }
    }

    fn repaint(sys: &mut WindowSystem, window: WindowId) {
        if let Err(err) = sys.invalidate_window(window) {
            tracing::debug!(error = %err, "panel repaint skipped");
        }
    }
}

impl WindowHandler for Panel {
    fn on_paint(&mut self, ctx: &mut PaintContext<'_>) -> bool {
        let bounds = ctx.local_bounds();
        ctx.clear(Color::BLACK);
        ctx.set_color(if self.hot { Color::WHITE } else { self.color });
        ctx.stroke_rect(bounds);
        ctx.fill_rect(Rect::new(0, 0, bounds.w(), 1));
        ctx.set_color(Color::BLACK);
        ctx.draw_text(2, 0, self.title);
        if self.hinted {
            ctx.set_color(Color::GRAY);
            ctx.draw_text(2, bounds.h() - 2, "drag the title bar");
        }
        true
    }

    fn on_mouse_enter(&mut self, sys: &mut WindowSystem, window: WindowId) {
        self.hot = true;
        Self::repaint(sys, window);
    }

    fn on_mouse_leave(&mut self, sys: &mut WindowSystem, window: WindowId) {
        self.hot = false;
        self.hinted = false;
        Self::repaint(sys, window);
    }

    fn on_mouse_hover(&mut self, sys: &mut WindowSystem, event: &MouseEvent) {
        self.hinted = true;
        Self::repaint(sys, event.window);
    }

    fn on_mouse_button_down(&mut self, sys: &mut WindowSystem, event: &MouseEvent) -> bool {
        if event.button != Some(MouseButton::Left) {
            return false;
        }
        let outcome = sys
            .raise_top(event.window)
            .and_then(|()| sys.set_focus(Some(event.window)));
        if event.y == 0 {
            self.drag = Some(Point::new(event.x, event.y));
            if let Err(err) = outcome.and_then(|()| sys.set_capture(Some(event.window))) {
                tracing::debug!(error = %err, "drag not started");
                self.drag = None;
            }
        }
        true
    }

    fn on_mouse_move(&mut self, sys: &mut WindowSystem, event: &MouseEvent) -> bool {
        let Some(grab) = self.drag else {
            return false;
        };
        let Ok(Some(parent)) = sys.parent(event.window) else {
            return false;
        };
        let Ok(origin) = sys.absolute_rect(parent) else {
            return false;
        };
        let x = event.screen.x - origin.x() - grab.x;
        let y = event.screen.y - origin.y() - grab.y;
        sys.move_window(event.window, x, y).is_ok()
    }

    fn on_mouse_button_up(&mut self, sys: &mut WindowSystem, _event: &MouseEvent) -> bool {
        if self.drag.take().is_some() {
            let _ = sys.set_capture(None);
            return true;
        }
        false
    }

    fn on_key_down(&mut self, sys: &mut WindowSystem, event: &KeyEvent) -> bool {
        if event.key == Key::Tab {
            let _ = sys.lower_bottom(event.window);
            return true;
        }
        false
    }
}

struct Label {
    text: String,
}

impl Label {
    fn new(text: String) -> Self {
        Self { text }
    }
}

impl WindowHandler for Label {
    fn on_paint(&mut self, ctx: &mut PaintContext<'_>) -> bool {
        ctx.set_color(Color::WHITE);
        ctx.draw_text(0, 1, &self.text);
        true
    }
}
