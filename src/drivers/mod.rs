pub mod console;
pub mod keyboard;
pub mod mouse;
pub mod queue;
pub mod timer;

use std::io;
use std::time::Duration;

use crate::event::{Event, Modifiers};

pub use console::ConsoleInputDriver;
pub use queue::QueueInputDriver;

/// Source of input events for the window system.
pub trait InputDriver {
    /// Wait up to `timeout` for the next event. `Ok(None)` means nothing
    /// arrived in time.
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Event>>;

    /// Inject a synthetic event. Injected events are delivered in FIFO order
    /// before any further device input.
    fn push_event(&mut self, event: Event);

    /// Modifiers currently held, as last observed by the driver.
    fn key_modifiers(&self) -> Modifiers;

    fn set_mouse_capture(&mut self, _enabled: bool) -> io::Result<()> {
        Ok(())
    }
}

impl<T: InputDriver + ?Sized> InputDriver for &mut T {
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        (**self).poll(timeout)
    }

    fn push_event(&mut self, event: Event) {
        (**self).push_event(event)
    }

    fn key_modifiers(&self) -> Modifiers {
        (**self).key_modifiers()
    }

    fn set_mouse_capture(&mut self, enabled: bool) -> io::Result<()> {
        (**self).set_mouse_capture(enabled)
    }
}

impl<T: InputDriver + ?Sized> InputDriver for Box<T> {
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        (**self).poll(timeout)
    }

    fn push_event(&mut self, event: Event) {
        (**self).push_event(event)
    }

    fn key_modifiers(&self) -> Modifiers {
        (**self).key_modifiers()
    }

    fn set_mouse_capture(&mut self, enabled: bool) -> io::Result<()> {
        (**self).set_mouse_capture(enabled)
    }
}
