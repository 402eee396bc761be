use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;

use super::InputDriver;
use super::keyboard::KeyboardNormalizer;
use crate::event::{Event, Modifiers};
use crate::rect::Size;

/// Terminal input through crossterm. Pointer coordinates are cells.
pub struct ConsoleInputDriver {
    normalizer: KeyboardNormalizer,
    event_queue: VecDeque<Event>,
}

impl Default for ConsoleInputDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleInputDriver {
    pub fn new() -> Self {
        Self {
            normalizer: KeyboardNormalizer::new(),
            event_queue: VecDeque::new(),
        }
    }
}

impl InputDriver for ConsoleInputDriver {
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        if let Some(evt) = self.event_queue.pop_front() {
            return Ok(Some(evt));
        }
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !crossterm::event::poll(remaining)? {
                return Ok(None);
            }
            // Events the normaliser swallows (repeats, focus, paste) do not
            // count as input; keep waiting for the rest of the interval.
            if let Some(evt) = self.normalizer.normalize(crossterm::event::read()?) {
                return Ok(Some(evt));
            }
        }
    }

    fn push_event(&mut self, event: Event) {
        self.event_queue.push_back(event);
    }

    fn key_modifiers(&self) -> Modifiers {
        self.normalizer.modifiers()
    }

    fn set_mouse_capture(&mut self, enabled: bool) -> io::Result<()> {
        if enabled {
            execute!(std::io::stdout(), EnableMouseCapture)
        } else {
            execute!(std::io::stdout(), DisableMouseCapture)
        }
    }
}

/// Owns the terminal while the demo runs and presents composed frames.
pub struct ConsoleOutputDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    entered: bool,
}

impl ConsoleOutputDriver {
    pub fn new() -> io::Result<Self> {
        let stdout = io::stdout();
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self {
            terminal,
            entered: false,
        })
    }

    pub fn enter(&mut self) -> io::Result<()> {
        if self.entered {
            return Ok(());
        }
        execute!(self.terminal.backend_mut(), EnterAlternateScreen)?;
        terminal::enable_raw_mode()?;
        self.terminal.hide_cursor()?;
        self.entered = true;
        Ok(())
    }

    pub fn exit(&mut self) -> io::Result<()> {
        if !self.entered {
            return Ok(());
        }
        terminal::disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            DisableMouseCapture,
            LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()?;
        self.entered = false;
        Ok(())
    }

    pub fn size(&self) -> io::Result<Size> {
        let size = self.terminal.size()?;
        Ok(Size::new(i32::from(size.width), i32::from(size.height)))
    }

    /// Copy `composed` onto the screen. Only cells inside both the frame
    /// and the composed buffer are written.
    pub fn present(&mut self, composed: &Buffer) -> io::Result<()> {
        self.terminal
            .draw(|frame| {
                let area = frame.area().intersection(composed.area);
                let buffer = frame.buffer_mut();
                for y in area.top()..area.bottom() {
                    for x in area.left()..area.right() {
                        if let (Some(dst), Some(src)) =
                            (buffer.cell_mut((x, y)), composed.cell((x, y)))
                        {
                            *dst = src.clone();
                        }
                    }
                }
            })
            .map(|_| ())
            .map_err(|err| io::Error::other(err.to_string()))
    }
}

impl Drop for ConsoleOutputDriver {
    fn drop(&mut self) {
        let _ = self.exit();
    }
}
