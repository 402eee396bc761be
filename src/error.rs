use std::io;

use thiserror::Error;

use crate::rect::RectError;
use crate::window::WindowId;

/// Errors surfaced by the window system API.
#[derive(Debug, Error)]
pub enum WindowError {
    /// An allocation failed; no partial state was kept.
    #[error("out of memory while allocating {0}")]
    OutOfMemory(&'static str),
    /// The handle refers to a window that has been destroyed.
    #[error("window {0:?} no longer exists")]
    StaleWindow(WindowId),
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// `modal_exit` was called for a window with no modal context.
    #[error("window {0:?} is not modal")]
    NotModal(WindowId),
    #[error("input backend error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Rect(#[from] RectError),
}

pub type Result<T, E = WindowError> = std::result::Result<T, E>;
