//! Shared crate-wide constants.

use std::time::Duration;

/// Upper bound on separate pending damage rectangles.
///
/// Past this many disjoint entries the damage list collapses into a single
/// bounding box. Over-invalidating is always safe; tracking hundreds of tiny
/// rectangles costs more in tree walks than repainting the union.
pub const DEFAULT_MAX_DAMAGE_ENTRIES: usize = 64;

/// Delay before a window under a resting cursor receives `on_mouse_hover`
/// when neither the window nor the configuration overrides it.
pub const DEFAULT_HOVER_DELAY: Duration = Duration::from_millis(500);

/// How long a single `step` may wait on the input backend for an event.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Device resolution assumed until a backend or the configuration says
/// otherwise.
pub const DEFAULT_RESOLUTION_WIDTH: i32 = 640;
pub const DEFAULT_RESOLUTION_HEIGHT: i32 = 480;
