use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::event::{Event, Modifiers};

use super::InputDriver;

/// Input driver fed only by [`InputDriver::push_event`].
///
/// Never blocks. With [`QueueInputDriver::quit_when_drained`] an empty queue
/// reports [`Event::Quit`], which keeps nested event loops from spinning
/// when a script of events runs out.
#[derive(Debug, Default)]
pub struct QueueInputDriver {
    queue: VecDeque<Event>,
    modifiers: Modifiers,
    quit_when_drained: bool,
}

impl QueueInputDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            queue: events.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn quit_when_drained(mut self, enabled: bool) -> Self {
        self.quit_when_drained = enabled;
        self
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl InputDriver for QueueInputDriver {
    fn poll(&mut self, _timeout: Duration) -> io::Result<Option<Event>> {
        match self.queue.pop_front() {
            Some(event) => {
                if !matches!(event, Event::Resize { .. } | Event::Quit) {
                    self.modifiers = event.modifiers();
                }
                Ok(Some(event))
            }
            None if self.quit_when_drained => Ok(Some(Event::Quit)),
            None => Ok(None),
        }
    }

    fn push_event(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    fn key_modifiers(&self) -> Modifiers {
        self.modifiers
    }
}
