//! Window snapshot types and the window-system capability seam.

use tracing::debug;

use crate::geometry::Rect;

/// Windows smaller than this are toasts, tooltips and similar chrome that
/// never deserve a label.
pub const MIN_WINDOW_AREA: i64 = 2500;

/// Window server id of a top-level window. Opaque outside the platform
/// backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u32);

/// One entry of a z-ordered window snapshot, taken fresh per activation.
#[derive(Debug, Clone)]
pub struct WindowInfo {
    pub id: WindowId,
    /// Owning process, needed to focus the window later.
    pub pid: i32,
    pub frame: Rect,
    /// Window immediately in front in the z-order, if any. Only used to
    /// relay overlay stacking to the renderer.
    pub insert_after: Option<WindowId>,
}

/// Desktop capabilities consumed by the input pipeline. The live
/// implementation talks to the window server; tests substitute stubs.
pub trait WindowSystem {
    /// Visible top-level windows, front to back, already filtered through
    /// [`filter_snapshot`].
    fn list_windows(&mut self) -> Vec<WindowInfo>;

    /// Bring the window to the foreground.
    fn focus(&mut self, window: &WindowInfo);

    /// Inject a synthetic key-up that defuses the physical keystroke whose
    /// key-down completed the hotkey chord.
    fn cancel_pending_keystroke(&mut self);
}

/// Drops windows too small to label and windows nested inside an
/// already-listed window (a window and its shadow frame can report as two
/// entries). Preserves the front-to-back order of the survivors.
pub fn filter_snapshot(raw: Vec<WindowInfo>) -> Vec<WindowInfo> {
    let mut windows: Vec<WindowInfo> = Vec::with_capacity(raw.len());
    for window in raw {
        if window.frame.area() < MIN_WINDOW_AREA {
            continue;
        }
        if windows.iter().any(|kept| kept.frame.contains_with_margin(&window.frame)) {
            debug!("dropping window {:?} nested inside an earlier window", window.id);
            continue;
        }
        windows.push(window);
    }
    windows
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn entry(id: u32, frame: Rect) -> WindowInfo {
        WindowInfo { id: WindowId(id), pid: 100, frame, insert_after: None }
    }

    #[test]
    fn drops_windows_below_the_area_threshold() {
        let kept = entry(1, Rect::new(0, 0, 50, 50));
        let tiny = entry(2, Rect::new(500, 500, 549, 549));
        let filtered = filter_snapshot(vec![kept.clone(), tiny]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, kept.id);
    }

    #[test]
    fn drops_windows_nested_inside_an_earlier_window() {
        let front = entry(1, Rect::new(0, 0, 800, 600));
        let shadow = entry(2, Rect::new(5, 5, 795, 595));
        let separate = entry(3, Rect::new(900, 0, 1200, 300));
        let filtered = filter_snapshot(vec![front, shadow, separate]);
        assert_eq!(
            filtered.iter().map(|w| w.id).collect::<Vec<_>>(),
            vec![WindowId(1), WindowId(3)]
        );
    }

    #[test]
    fn keeps_frontward_windows_over_nested_later_ones() {
        // Nesting only ever removes the window further back in z-order.
        let small_front = entry(1, Rect::new(10, 10, 200, 200));
        let large_back = entry(2, Rect::new(0, 0, 800, 600));
        let filtered = filter_snapshot(vec![small_front, large_back]);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn empty_snapshot_stays_empty() {
        assert_eq!(filter_snapshot(Vec::new()).len(), 0);
    }
}
