use std::io;
use std::time::Duration;

use crate::drivers::InputDriver;
use crate::event::{Event, Modifiers};

/// Event source of the window system: an input driver plus the interval a
/// single poll may block for.
///
/// This is the only place that calls `driver.poll()`. Injected events go
/// through the same driver queue so that synthetic and device input are
/// delivered in one order.
pub struct EventLoop {
    driver: Box<dyn InputDriver>,
    poll_interval: Duration,
}

impl EventLoop {
    pub fn new(driver: Box<dyn InputDriver>, poll_interval: Duration) -> Self {
        Self {
            driver,
            poll_interval,
        }
    }

    /// Wait up to the poll interval for one event.
    pub fn poll(&mut self) -> io::Result<Option<Event>> {
        self.poll_timeout(self.poll_interval)
    }

    /// Wait up to `timeout`, capped at the poll interval.
    pub fn poll_timeout(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        self.driver.poll(timeout.min(self.poll_interval))
    }

    pub fn push(&mut self, event: Event) {
        self.driver.push_event(event);
    }

    pub fn key_modifiers(&self) -> Modifiers {
        self.driver.key_modifiers()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    pub fn driver(&mut self) -> &mut dyn InputDriver {
        self.driver.as_mut()
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
