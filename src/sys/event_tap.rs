//! The system-wide keyboard event tap.
//!
//! One tap per process: the tap is the single activation pipeline, and a
//! second one would mean two pipelines fighting over the same keystrokes.
//! Installed once at startup, torn down when the process exits.

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use super::cg::{
    CFMachPortCreateRunLoopSource, CFRelease, CFRunLoopAddSource, CFRunLoopGetCurrent,
    CFRunLoopRemoveSource, CGEventGetIntegerValueField, CGEventTapCreate, CGEventTapEnable,
    kCFRunLoopCommonModes, kCGEventKeyDown, kCGEventKeyUp, kCGEventTapDisabledByTimeout,
    kCGEventTapDisabledByUserInput, kCGEventTapOptionDefault, kCGHeadInsertEventTap,
    kCGKeyboardEventKeycode, kCGSessionEventTap,
};
use crate::input::{HookAction, KeyEventHandler};
use crate::sys::keycode::{KeyEvent, KeyEventKind};
use crate::sys::overlay::OverlayHost;
use crate::sys::window::WindowSystem;

static TAP_INSTALLED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("a keyboard event tap is already installed in this process")]
    AlreadyInstalled,
    #[error("the system refused the event tap; is the accessibility permission granted?")]
    CreateFailed,
}

type TapHandler = Box<dyn FnMut(KeyEvent) -> HookAction>;

struct TapState {
    port: *mut c_void,
    handler: TapHandler,
}

/// Owns the installed tap. Dropping it (at process exit) tears the tap
/// down and frees the handler.
pub struct EventTap {
    port: *mut c_void,
    source: *mut c_void,
    state: *mut TapState,
}

impl EventTap {
    pub fn install<S, H>(handler: KeyEventHandler<S, H>) -> Result<EventTap, HookError>
    where
        S: WindowSystem + 'static,
        H: OverlayHost + 'static,
    {
        let mut handler = handler;
        Self::install_callback(Box::new(move |event| handler.handle_event(event)))
    }

    fn install_callback(handler: TapHandler) -> Result<EventTap, HookError> {
        if TAP_INSTALLED.swap(true, Ordering::SeqCst) {
            return Err(HookError::AlreadyInstalled);
        }

        let state = Box::into_raw(Box::new(TapState { port: ptr::null_mut(), handler }));
        let mask = (1u64 << kCGEventKeyDown) | (1u64 << kCGEventKeyUp);

        let port = unsafe {
            CGEventTapCreate(
                kCGSessionEventTap,
                kCGHeadInsertEventTap,
                kCGEventTapOptionDefault,
                mask,
                tap_callback,
                state as *mut c_void,
            )
        };
        if port.is_null() {
            unsafe { drop(Box::from_raw(state)) };
            TAP_INSTALLED.store(false, Ordering::SeqCst);
            return Err(HookError::CreateFailed);
        }

        let source = unsafe { CFMachPortCreateRunLoopSource(ptr::null(), port, 0) };
        if source.is_null() {
            unsafe {
                CFRelease(port);
                drop(Box::from_raw(state));
            }
            TAP_INSTALLED.store(false, Ordering::SeqCst);
            return Err(HookError::CreateFailed);
        }

        unsafe {
            (*state).port = port;
            CFRunLoopAddSource(CFRunLoopGetCurrent(), source, kCFRunLoopCommonModes);
            CGEventTapEnable(port, true);
        }

        Ok(EventTap { port, source, state })
    }
}

impl Drop for EventTap {
    fn drop(&mut self) {
        unsafe {
            CGEventTapEnable(self.port, false);
            CFRunLoopRemoveSource(CFRunLoopGetCurrent(), self.source, kCFRunLoopCommonModes);
            CFRelease(self.source);
            CFRelease(self.port);
            drop(Box::from_raw(self.state));
        }
        TAP_INSTALLED.store(false, Ordering::SeqCst);
    }
}

unsafe extern "C-unwind" fn tap_callback(
    _proxy: *mut c_void,
    event_type: u32,
    event: *mut c_void,
    user_info: *mut c_void,
) -> *mut c_void {
    let state = unsafe { &mut *(user_info as *mut TapState) };

    let kind = match event_type {
        kCGEventKeyDown => KeyEventKind::Down,
        kCGEventKeyUp => KeyEventKind::Up,
        kCGEventTapDisabledByTimeout | kCGEventTapDisabledByUserInput => {
            // The system disables taps that respond too slowly; recover
            // instead of going silently deaf.
            warn!("event tap disabled by the system; re-enabling");
            if !state.port.is_null() {
                unsafe { CGEventTapEnable(state.port, true) };
            }
            return event;
        }
        _ => return event,
    };

    let code = unsafe { CGEventGetIntegerValueField(event, kCGKeyboardEventKeycode) } as u16;
    match (state.handler)(KeyEvent::raw(code, kind)) {
        HookAction::Consumed => ptr::null_mut(),
        HookAction::PassThrough => event,
    }
}
