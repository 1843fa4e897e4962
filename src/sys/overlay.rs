//! The overlay rendering seam.

use crate::geometry::{Point, Rect};
use crate::sys::window::WindowId;

/// Everything the renderer needs to draw one labeled window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySpec {
    pub frame: Rect,
    pub label: String,
    /// Screen position to center the label text on; `None` when the window
    /// is fully occluded. The window stays selectable either way.
    pub anchor: Option<Point>,
    /// Window to stack the overlay behind, mirroring the target's own
    /// z-order position.
    pub insert_after: Option<WindowId>,
}

/// Rendering collaborator. Indexes refer to positions in the slice passed
/// to [`show`](OverlayHost::show) and stay valid until the next `show`.
pub trait OverlayHost {
    fn show(&mut self, overlays: &[OverlaySpec]);

    /// Replace the visible text of one overlay with the label's remaining
    /// suffix.
    fn set_suffix(&mut self, index: usize, suffix: &str);

    /// Remove one overlay for the rest of the session.
    fn dismiss(&mut self, index: usize);

    fn dismiss_all(&mut self);
}
