//! Nested modal contexts.
//!
//! Each `modal_enter` pushes an entry; only the topmost entry restricts
//! dispatch. Results are kept per entry token until the blocking loop that
//! owns the token picks them up.

use std::collections::TryReserveError;

use crate::window::WindowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalMode {
    /// `modal_enter` runs a nested event loop until the context ends.
    #[default]
    Block,
    /// `modal_enter` returns immediately; the normal loop keeps running.
    Unblock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct ModalToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ModalEntry {
    pub(crate) token: ModalToken,
    pub(crate) window: WindowId,
    pub(crate) mode: ModalMode,
    /// Focus when the context was entered, restored when it ends.
    pub(crate) prev_focus: Option<WindowId>,
}

#[derive(Debug, Default)]
pub(crate) struct ModalStack {
    entries: Vec<ModalEntry>,
    results: Vec<(ModalToken, i32)>,
    next_token: u64,
}

impl ModalStack {
    pub(crate) fn reserve(&mut self) -> Result<(), TryReserveError> {
        self.entries.try_reserve(1)?;
        self.results.try_reserve(1)
    }

    pub(crate) fn push(
        &mut self,
        window: WindowId,
        mode: ModalMode,
        prev_focus: Option<WindowId>,
    ) -> ModalToken {
        self.next_token += 1;
        let token = ModalToken(self.next_token);
        self.entries.push(ModalEntry {
            token,
            window,
            mode,
            prev_focus,
        });
        token
    }

    pub(crate) fn top(&self) -> Option<WindowId> {
        self.entries.last().map(|entry| entry.window)
    }

    pub(crate) fn depth(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn windows(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.entries.iter().map(|entry| entry.window)
    }

    /// Index of the topmost entry for `window`.
    pub(crate) fn position(&self, window: WindowId) -> Option<usize> {
        self.entries.iter().rposition(|entry| entry.window == window)
    }

    fn position_of_token(&self, token: ModalToken) -> Option<usize> {
        self.entries.iter().position(|entry| entry.token == token)
    }

    fn record(&mut self, entry: &ModalEntry, code: i32) {
        if entry.mode == ModalMode::Block {
            self.results.push((entry.token, code));
        }
    }

    /// End the entry at `idx` with `code` and every entry above it with 0.
    /// Returned entries are ordered bottom to top.
    pub(crate) fn unwind_from(&mut self, idx: usize, code: i32) -> Vec<ModalEntry> {
        if idx >= self.entries.len() {
            return Vec::new();
        }
        let removed: Vec<ModalEntry> = self.entries.drain(idx..).collect();
        for (i, entry) in removed.iter().enumerate() {
            self.record(entry, if i == 0 { code } else { 0 });
        }
        removed
    }

    /// End the context identified by `token` (and any above it) with 0.
    pub(crate) fn unwind_token(&mut self, token: ModalToken) -> Vec<ModalEntry> {
        match self.position_of_token(token) {
            Some(idx) => self.unwind_from(idx, 0),
            None => Vec::new(),
        }
    }

    /// Drop every entry whose window matches `gone`, each ending with 0.
    pub(crate) fn remove_where(&mut self, mut gone: impl FnMut(WindowId) -> bool) -> Vec<ModalEntry> {
        let mut removed = Vec::new();
        let mut idx = 0;
        while idx < self.entries.len() {
            if gone(self.entries[idx].window) {
                let entry = self.entries.remove(idx);
                self.record(&entry, 0);
                removed.push(entry);
            } else {
                idx += 1;
            }
        }
        removed
    }

    pub(crate) fn take_result(&mut self, token: ModalToken) -> Option<i32> {
        let pos = self.results.iter().position(|(t, _)| *t == token)?;
        Some(self.results.remove(pos).1)
    }
}
