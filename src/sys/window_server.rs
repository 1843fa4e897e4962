//! Live window enumeration, focusing, and key injection.

use std::ffi::c_void;
use std::ptr;
use std::time::Instant;

use objc2::msg_send;
use objc2_app_kit::NSRunningApplication;
use objc2_core_foundation::{CFRetained, CFString, CGRect};
use tracing::{info, warn};

use super::cg::{
    _AXUIElementGetWindow, AXUIElementCopyAttributeValue, AXUIElementCreateApplication,
    AXUIElementPerformAction, CFArrayGetCount, CFArrayGetValueAtIndex, CFDictionaryGetValue,
    CFNumberGetValue, CFRelease, CGEventCreateKeyboardEvent, CGEventPost,
    CGRectMakeWithDictionaryRepresentation, CGWindowListCopyWindowInfo, kAXErrorSuccess,
    kCFNumberSInt64Type, kCGHIDEventTap, kCGWindowListExcludeDesktopElements,
    kCGWindowListOptionOnScreenOnly,
};
use crate::geometry::Rect;
use crate::sys::window::{WindowId, WindowInfo, WindowSystem, filter_snapshot};

/// Shell chrome that never deserves a label.
const EXCLUDED_OWNERS: [&str; 4] = ["Dock", "Window Server", "WindowManager", "Control Center"];

const ENUMERATION_WARN_MS: u128 = 100;

/// Injected to defuse the swallowed chord keystroke; not a real key on any
/// keyboard.
const DEFUSE_KEYCODE: u16 = 0xFF;

pub struct WindowServer {
    key_number: CFRetained<CFString>,
    key_pid: CFRetained<CFString>,
    key_layer: CFRetained<CFString>,
    key_name: CFRetained<CFString>,
    key_owner: CFRetained<CFString>,
    key_bounds: CFRetained<CFString>,
    ax_windows: CFRetained<CFString>,
    ax_raise: CFRetained<CFString>,
}

impl WindowServer {
    pub fn new() -> WindowServer {
        WindowServer {
            key_number: CFString::from_str("kCGWindowNumber"),
            key_pid: CFString::from_str("kCGWindowOwnerPID"),
            key_layer: CFString::from_str("kCGWindowLayer"),
            key_name: CFString::from_str("kCGWindowName"),
            key_owner: CFString::from_str("kCGWindowOwnerName"),
            key_bounds: CFString::from_str("kCGWindowBounds"),
            ax_windows: CFString::from_str("AXWindows"),
            ax_raise: CFString::from_str("AXRaise"),
        }
    }

    unsafe fn dict_value(dict: *const c_void, key: &CFRetained<CFString>) -> *const c_void {
        let key = CFRetained::<CFString>::as_ptr(key).as_ptr() as *const c_void;
        unsafe { CFDictionaryGetValue(dict, key) }
    }

    unsafe fn dict_i64(dict: *const c_void, key: &CFRetained<CFString>) -> Option<i64> {
        let value = unsafe { Self::dict_value(dict, key) };
        if value.is_null() {
            return None;
        }
        let mut out: i64 = 0;
        let ok = unsafe {
            CFNumberGetValue(value, kCFNumberSInt64Type, &mut out as *mut i64 as *mut c_void)
        };
        ok.then_some(out)
    }

    unsafe fn dict_string(dict: *const c_void, key: &CFRetained<CFString>) -> Option<String> {
        let value = unsafe { Self::dict_value(dict, key) };
        if value.is_null() {
            return None;
        }
        let string: &CFString = unsafe { &*(value as *const CFString) };
        Some(string.to_string())
    }

    unsafe fn dict_rect(dict: *const c_void, key: &CFRetained<CFString>) -> Option<Rect> {
        let value = unsafe { Self::dict_value(dict, key) };
        if value.is_null() {
            return None;
        }
        let mut bounds = CGRect::default();
        if !unsafe { CGRectMakeWithDictionaryRepresentation(value, &mut bounds) } {
            return None;
        }
        Some(Rect::new(
            bounds.origin.x.round() as i32,
            bounds.origin.y.round() as i32,
            (bounds.origin.x + bounds.size.width).round() as i32,
            (bounds.origin.y + bounds.size.height).round() as i32,
        ))
    }
}

impl WindowSystem for WindowServer {
    fn list_windows(&mut self) -> Vec<WindowInfo> {
        let start = Instant::now();
        let mut raw = Vec::new();

        unsafe {
            let list = CGWindowListCopyWindowInfo(
                kCGWindowListOptionOnScreenOnly | kCGWindowListExcludeDesktopElements,
                0,
            );
            if list.is_null() {
                warn!("window server returned no window list");
                return Vec::new();
            }

            let count = CFArrayGetCount(list);
            let mut previous: Option<WindowId> = None;
            for index in 0..count {
                let dict = CFArrayGetValueAtIndex(list, index);
                let Some(number) = Self::dict_i64(dict, &self.key_number) else {
                    continue;
                };
                let id = WindowId(number as u32);
                let insert_after = previous;
                previous = Some(id);

                if Self::dict_i64(dict, &self.key_layer).unwrap_or(0) != 0 {
                    continue;
                }
                // The window name is only readable with the screen
                // recording permission; filter on it when present.
                if Self::dict_string(dict, &self.key_name).is_some_and(|name| name.is_empty()) {
                    continue;
                }
                if let Some(owner) = Self::dict_string(dict, &self.key_owner) {
                    if EXCLUDED_OWNERS.contains(&owner.as_str()) {
                        continue;
                    }
                }
                let Some(pid) = Self::dict_i64(dict, &self.key_pid) else {
                    continue;
                };
                let Some(frame) = Self::dict_rect(dict, &self.key_bounds) else {
                    continue;
                };

                raw.push(WindowInfo { id, pid: pid as i32, frame, insert_after });
            }
            CFRelease(list);
        }

        let windows = filter_snapshot(raw);
        let elapsed = start.elapsed().as_millis();
        if elapsed > ENUMERATION_WARN_MS {
            info!("window enumeration took {elapsed}ms");
        }
        windows
    }

    fn focus(&mut self, window: &WindowInfo) {
        unsafe {
            let app = AXUIElementCreateApplication(window.pid);
            if app.is_null() {
                warn!(pid = window.pid, "no accessibility element for process");
                return;
            }

            let mut windows_value: *const c_void = ptr::null();
            let attribute =
                CFRetained::<CFString>::as_ptr(&self.ax_windows).as_ptr() as *const c_void;
            let err = AXUIElementCopyAttributeValue(app, attribute, &mut windows_value);
            if err == kAXErrorSuccess && !windows_value.is_null() {
                let action =
                    CFRetained::<CFString>::as_ptr(&self.ax_raise).as_ptr() as *const c_void;
                let count = CFArrayGetCount(windows_value);
                for index in 0..count {
                    let ax_window = CFArrayGetValueAtIndex(windows_value, index) as *mut c_void;
                    let mut server_id: u32 = 0;
                    if _AXUIElementGetWindow(ax_window, &mut server_id) == kAXErrorSuccess
                        && server_id == window.id.0
                    {
                        let err = AXUIElementPerformAction(ax_window, action);
                        if err != kAXErrorSuccess {
                            warn!(?window.id, err, "raise action failed");
                        }
                        break;
                    }
                }
                CFRelease(windows_value);
            } else {
                warn!(pid = window.pid, err, "could not read the process window list");
            }
            CFRelease(app);

            // Raising alone does not switch applications.
            if let Some(running) =
                NSRunningApplication::runningApplicationWithProcessIdentifier(window.pid)
            {
                // NSApplicationActivateIgnoringOtherApps
                let _: bool = msg_send![&*running, activateWithOptions: 1usize << 1];
            }
        }
    }

    fn cancel_pending_keystroke(&mut self) {
        unsafe {
            let event = CGEventCreateKeyboardEvent(ptr::null(), DEFUSE_KEYCODE, false);
            if !event.is_null() {
                CGEventPost(kCGHIDEventTap, event);
                CFRelease(event);
            }
        }
    }
}

impl Default for WindowServer {
    fn default() -> Self { WindowServer::new() }
}
