//! One activation's labeled windows and prefix narrowing.
//!
//! A session is built from a fresh window snapshot when the hotkey fires and
//! lives until a label is fully typed, every window is dismissed, or the
//! user cancels. All state is session-local; nothing survives into the next
//! activation.

use crate::geometry::{self, Point, Rect};
use crate::labels::LabelAlphabet;
use crate::sys::overlay::OverlaySpec;
use crate::sys::window::WindowInfo;

#[derive(Debug)]
pub struct LabeledWindow {
    pub info: WindowInfo,
    pub label: String,
    /// Frames of the windows strictly in front of this one that intersect
    /// it, in z-order.
    pub occluders: Vec<Rect>,
    pub anchor: Option<Point>,
    dismissed: bool,
}

/// How a typed character changed the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Exactly one window's label equals the typed prefix.
    Selected(usize),
    /// At least one window still matches; keep consuming keys.
    Narrowed,
    /// Nothing matches any more; the session is dead.
    NoMatch,
}

/// Overlay consequences of a typed character, in the order they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayUpdate {
    Suffix { index: usize, text: String },
    Dismiss { index: usize },
}

#[derive(Debug)]
pub struct AdvanceResult {
    pub outcome: Advance,
    pub updates: Vec<OverlayUpdate>,
}

#[derive(Debug)]
pub struct Session {
    /// Kept in snapshot z-order; indexes double as overlay indexes.
    windows: Vec<LabeledWindow>,
    typed: String,
}

impl Session {
    /// Pairs every window with its occluders, assigns labels in
    /// left-to-right reading order, and computes label anchors.
    pub fn build(snapshot: Vec<WindowInfo>, alphabet: &LabelAlphabet) -> Session {
        let mut windows: Vec<LabeledWindow> = snapshot
            .iter()
            .enumerate()
            .map(|(index, window)| {
                let occluders: Vec<Rect> = snapshot[..index]
                    .iter()
                    .filter(|front| front.frame.intersects(&window.frame))
                    .map(|front| front.frame)
                    .collect();
                let anchor = geometry::label_anchor(window.frame, &occluders);
                LabeledWindow {
                    info: window.clone(),
                    label: String::new(),
                    occluders,
                    anchor,
                    dismissed: false,
                }
            })
            .collect();

        // Labels follow screen position, not z-order, so the codes read
        // stably left to right regardless of stacking.
        let mut order: Vec<usize> = (0..windows.len()).collect();
        order.sort_by_key(|&index| {
            let frame = windows[index].info.frame;
            (frame.left, frame.bottom, frame.right, frame.top)
        });

        let codes = alphabet.combinations(windows.len());
        for (&index, code) in order.iter().zip(codes) {
            // A lone window gets the zero-length code; promote it so there
            // is still something to type.
            windows[index].label = if code.is_empty() {
                alphabet.first().to_string()
            } else {
                code
            };
        }

        Session { windows, typed: String::new() }
    }

    pub fn len(&self) -> usize { self.windows.len() }

    pub fn is_empty(&self) -> bool { self.windows.is_empty() }

    pub fn typed(&self) -> &str { &self.typed }

    pub fn window(&self, index: usize) -> &WindowInfo { &self.windows[index].info }

    pub fn windows(&self) -> &[LabeledWindow] { &self.windows }

    pub fn overlay_specs(&self) -> Vec<OverlaySpec> {
        self.windows
            .iter()
            .map(|window| OverlaySpec {
                frame: window.info.frame,
                label: window.label.clone(),
                anchor: window.anchor,
                insert_after: window.info.insert_after,
            })
            .collect()
    }

    /// Applies one typed character to the prefix and narrows the session.
    ///
    /// Windows whose labels stop matching are dismissed permanently. An
    /// exact match wins immediately and dismisses everything else.
    pub fn advance(&mut self, ch: char) -> AdvanceResult {
        self.typed.push(ch);
        let mut updates = Vec::new();
        let mut any_alive = false;

        for index in 0..self.windows.len() {
            if self.windows[index].dismissed {
                continue;
            }
            let label = &self.windows[index].label;
            if let Some(suffix) = label.strip_prefix(self.typed.as_str()) {
                if suffix.is_empty() {
                    let survivors: Vec<usize> = (0..self.windows.len())
                        .filter(|&other| !self.windows[other].dismissed)
                        .collect();
                    for other in survivors {
                        self.windows[other].dismissed = true;
                        updates.push(OverlayUpdate::Dismiss { index: other });
                    }
                    return AdvanceResult { outcome: Advance::Selected(index), updates };
                }
                updates.push(OverlayUpdate::Suffix { index, text: suffix.to_string() });
                any_alive = true;
            } else {
                self.windows[index].dismissed = true;
                updates.push(OverlayUpdate::Dismiss { index });
            }
        }

        let outcome = if any_alive { Advance::Narrowed } else { Advance::NoMatch };
        AdvanceResult { outcome, updates }
    }
}
