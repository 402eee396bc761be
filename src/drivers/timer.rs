//! Timer backend: a monotonic clock and a queue of one-shot timers.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source, measured from an arbitrary start.
pub trait Clock {
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

#[derive(Debug)]
struct Timer<T> {
    id: TimerId,
    deadline: Duration,
    payload: T,
}

/// One-shot timers carrying a payload of type `T`.
#[derive(Debug)]
pub struct TimerQueue<T> {
    timers: Vec<Timer<T>>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            timers: Vec::new(),
            next_id: 1,
        }
    }

    pub fn add_timer(&mut self, now: Duration, delay: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            deadline: now.saturating_add(delay),
            payload,
        });
        id
    }

    /// Cancel a timer. Returns its payload if it was still pending.
    pub fn remove_timer(&mut self, id: TimerId) -> Option<T> {
        let pos = self.timers.iter().position(|t| t.id == id)?;
        Some(self.timers.remove(pos).payload)
    }

    /// Drop every pending timer whose payload fails `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.timers.retain(|t| keep(&t.payload));
    }

    /// Remove and return the timers expired at `now`, earliest deadline
    /// first; ties fire in creation order.
    pub fn take_due(&mut self, now: Duration) -> Vec<(TimerId, T)> {
        let mut due = Vec::new();
        let mut idx = 0;
        while idx < self.timers.len() {
            if self.timers[idx].deadline <= now {
                due.push(self.timers.remove(idx));
            } else {
                idx += 1;
            }
        }
        due.sort_by_key(|t| (t.deadline, t.id));
        due.into_iter().map(|t| (t.id, t.payload)).collect()
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.iter().map(|t| t.deadline).min()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
