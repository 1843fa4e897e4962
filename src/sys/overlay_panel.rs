//! On-screen label overlays.
//!
//! One borderless, mouse-transparent panel per labeled window, stacked just
//! above its target so the labels interleave with the real z-order instead
//! of floating above everything. Panels are pooled by session index and
//! reused across activations.

use objc2::rc::Retained;
use objc2::{MainThreadMarker, msg_send};
use objc2_app_kit::{
    NSBackingStoreType, NSColor, NSPopUpMenuWindowLevel, NSWindow, NSWindowOrderingMode,
    NSWindowStyleMask,
};
use objc2_core_foundation::{CGPoint, CGRect, CGSize};
use objc2_core_graphics::{CGColor, CGDisplayBounds, CGMainDisplayID};
use objc2_foundation::NSString;
use objc2_quartz_core::{CATextLayer, CATransaction};
use once_cell::sync::Lazy;
use tracing::warn;

use crate::common::config::OverlaySettings;
use crate::geometry::Rect;
use crate::sys::overlay::{OverlayHost, OverlaySpec};

static LABEL_TEXT_COLOR: Lazy<Retained<CGColor>> =
    Lazy::new(|| CGColor::new_generic_gray(1.0, 1.0).into());

/// Total inset of the overlay box within the window frame, so the border
/// reads as part of the window rather than covering its edges.
const BORDER_INSET: i32 = 16;

struct Panel {
    window: Retained<NSWindow>,
    text: Retained<CATextLayer>,
    shown: bool,
}

pub struct OverlayPanels {
    settings: OverlaySettings,
    mtm: MainThreadMarker,
    border_color: Retained<CGColor>,
    background_color: Retained<CGColor>,
    panels: Vec<Panel>,
}

impl OverlayPanels {
    pub fn new(settings: OverlaySettings, mtm: MainThreadMarker) -> OverlayPanels {
        let (r, g, b) = settings.border_rgb().unwrap_or_else(|| {
            warn!(color = %settings.border_color, "unparseable border color; using default");
            (0.31, 0.61, 0.98)
        });
        let border_color = CGColor::new_generic_rgb(r, g, b, 1.0).into();
        let background_color = CGColor::new_generic_gray(0.0, settings.opacity).into();
        OverlayPanels {
            settings,
            mtm,
            border_color,
            background_color,
            panels: Vec::new(),
        }
    }

    fn create_panel(&self) -> Panel {
        let window = unsafe {
            NSWindow::initWithContentRect_styleMask_backing_defer(
                self.mtm.alloc(),
                CGRect::new(CGPoint::new(0.0, 0.0), CGSize::new(1.0, 1.0)),
                NSWindowStyleMask::Borderless,
                NSBackingStoreType::Buffered,
                false,
            )
        };
        unsafe {
            window.setReleasedWhenClosed(false);
            window.setOpaque(false);
            window.setBackgroundColor(Some(&NSColor::clearColor()));
            window.setLevel(NSPopUpMenuWindowLevel);
            window.setIgnoresMouseEvents(true);
            window.setHasShadow(false);
        }

        let view = window.contentView().expect("borderless window has a content view");
        view.setWantsLayer(true);
        let layer = view.layer().expect("layer-backed content view");
        layer.setBorderWidth(self.settings.border_width);
        layer.setBorderColor(Some(&self.border_color));
        layer.setBackgroundColor(Some(&self.background_color));
        layer.setCornerRadius(6.0);

        let text = unsafe { CATextLayer::new() };
        unsafe {
            let font = NSString::from_str(&self.settings.font_family);
            let _: () = msg_send![&*text, setFont: &*font];
            let alignment = NSString::from_str("center");
            let _: () = msg_send![&*text, setAlignmentMode: &*alignment];
        }
        text.setFontSize(self.settings.font_size);
        text.setForegroundColor(Some(&LABEL_TEXT_COLOR));
        text.setContentsScale(window.backingScaleFactor());
        layer.addSublayer(&text);

        Panel { window, text, shown: false }
    }

    fn set_text(text: &CATextLayer, value: &str) {
        unsafe {
            let value = NSString::from_str(value);
            let _: () = msg_send![text, setString: &*value];
        }
    }

    /// Window frames arrive in the window server's top-left coordinates;
    /// panels are positioned in Cocoa's bottom-left ones.
    fn cocoa_frame(frame: Rect, screen_height: f64) -> CGRect {
        CGRect::new(
            CGPoint::new(frame.left as f64, screen_height - frame.bottom as f64),
            CGSize::new(frame.width() as f64, frame.height() as f64),
        )
    }

    fn inset_frame(frame: Rect) -> Rect {
        if frame.width() > BORDER_INSET && frame.height() > BORDER_INSET {
            Rect::new(
                frame.left + BORDER_INSET / 2,
                frame.top + BORDER_INSET / 2,
                frame.right - BORDER_INSET / 2,
                frame.bottom - BORDER_INSET / 2,
            )
        } else {
            frame
        }
    }

    fn configure_panel(&mut self, index: usize, spec: &OverlaySpec, screen_height: f64) {
        if self.panels.len() == index {
            let panel = self.create_panel();
            self.panels.push(panel);
        }
        let panel = &mut self.panels[index];
        let frame = Self::inset_frame(spec.frame);

        unsafe {
            panel.window.setFrame_display(Self::cocoa_frame(frame, screen_height), false);
        }

        Self::set_text(&panel.text, &spec.label);
        match spec.anchor {
            Some(anchor) => {
                // Center an estimated text box on the anchor, in the
                // panel's local bottom-left coordinates.
                let width = self.settings.font_size * 0.62 * spec.label.chars().count() as f64;
                let height = self.settings.font_size * 1.3;
                let local_x = (anchor.x - frame.left) as f64 - width / 2.0;
                let local_y = (frame.bottom - anchor.y) as f64 - height / 2.0;
                panel.text.setHidden(false);
                panel.text.setFrame(CGRect::new(
                    CGPoint::new(local_x, local_y),
                    CGSize::new(width, height),
                ));
            }
            // Fully occluded: the window is still selectable, there is
            // just nowhere sensible to draw the code.
            None => panel.text.setHidden(true),
        }

        match spec.insert_after {
            Some(after) => unsafe {
                panel
                    .window
                    .orderWindow_relativeTo(NSWindowOrderingMode::Below, after.0 as isize);
            },
            None => panel.window.orderFrontRegardless(),
        }
        panel.shown = true;
    }
}

impl OverlayHost for OverlayPanels {
    fn show(&mut self, overlays: &[OverlaySpec]) {
        let screen_height = CGDisplayBounds(CGMainDisplayID()).size.height;

        CATransaction::begin();
        CATransaction::setDisableActions(true);
        for (index, spec) in overlays.iter().enumerate() {
            self.configure_panel(index, spec, screen_height);
        }
        // Panels beyond this session's window count stay pooled but hidden.
        for panel in &mut self.panels[overlays.len()..] {
            if panel.shown {
                panel.window.orderOut(None);
                panel.shown = false;
            }
        }
        CATransaction::commit();
    }

    fn set_suffix(&mut self, index: usize, suffix: &str) {
        let Some(panel) = self.panels.get(index) else {
            return;
        };
        CATransaction::begin();
        CATransaction::setDisableActions(true);
        Self::set_text(&panel.text, suffix);
        CATransaction::commit();
    }

    fn dismiss(&mut self, index: usize) {
        if let Some(panel) = self.panels.get_mut(index) {
            panel.window.orderOut(None);
            panel.shown = false;
        }
    }

    fn dismiss_all(&mut self) {
        for panel in &mut self.panels {
            if panel.shown {
                panel.window.orderOut(None);
                panel.shown = false;
            }
        }
    }
}
