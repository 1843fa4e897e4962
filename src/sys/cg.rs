//! Hand-declared CoreGraphics and HIServices entry points.
//!
//! These calls are either not exposed by the `objc2-*` crates we build
//! against or are private (`_AXUIElementGetWindow`), so they are declared
//! here directly against the system frameworks. Everything is raw pointers;
//! the callers own retain/release discipline.

#![allow(non_upper_case_globals)]

use std::ffi::c_void;

use objc2_core_foundation::CGRect;

// CGWindowListCopyWindowInfo options.
pub const kCGWindowListOptionOnScreenOnly: u32 = 1 << 0;
pub const kCGWindowListExcludeDesktopElements: u32 = 1 << 4;

// CGEventTapCreate parameters.
pub const kCGSessionEventTap: u32 = 1;
pub const kCGHeadInsertEventTap: u32 = 0;
pub const kCGEventTapOptionDefault: u32 = 0;

// CGEventType values the tap cares about.
pub const kCGEventKeyDown: u32 = 10;
pub const kCGEventKeyUp: u32 = 11;
pub const kCGEventTapDisabledByTimeout: u32 = 0xFFFFFFFE;
pub const kCGEventTapDisabledByUserInput: u32 = 0xFFFFFFFF;

// CGEventField.
pub const kCGKeyboardEventKeycode: u32 = 9;

// CGEventPost tap location.
pub const kCGHIDEventTap: u32 = 0;

// CFNumberGetValue type.
pub const kCFNumberSInt32Type: isize = 3;
pub const kCFNumberSInt64Type: isize = 4;

pub type CGEventTapCallBack = unsafe extern "C-unwind" fn(
    proxy: *mut c_void,
    event_type: u32,
    event: *mut c_void,
    user_info: *mut c_void,
) -> *mut c_void;

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C-unwind" {
    pub fn CGWindowListCopyWindowInfo(option: u32, relative_to_window: u32) -> *const c_void;
    pub fn CGRectMakeWithDictionaryRepresentation(
        dict: *const c_void,
        rect: *mut CGRect,
    ) -> bool;

    pub fn CGEventTapCreate(
        tap: u32,
        place: u32,
        options: u32,
        events_of_interest: u64,
        callback: CGEventTapCallBack,
        user_info: *mut c_void,
    ) -> *mut c_void;
    pub fn CGEventTapEnable(tap: *mut c_void, enable: bool);
    pub fn CGEventGetIntegerValueField(event: *mut c_void, field: u32) -> i64;
    pub fn CGEventCreateKeyboardEvent(
        source: *const c_void,
        virtual_key: u16,
        key_down: bool,
    ) -> *mut c_void;
    pub fn CGEventPost(tap_location: u32, event: *mut c_void);
}

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C-unwind" {
    pub fn CFRelease(cf: *const c_void);
    pub fn CFArrayGetCount(array: *const c_void) -> isize;
    pub fn CFArrayGetValueAtIndex(array: *const c_void, index: isize) -> *const c_void;
    pub fn CFDictionaryGetValue(dict: *const c_void, key: *const c_void) -> *const c_void;
    pub fn CFNumberGetValue(
        number: *const c_void,
        number_type: isize,
        value: *mut c_void,
    ) -> bool;
    pub fn CFMachPortCreateRunLoopSource(
        allocator: *const c_void,
        port: *mut c_void,
        order: isize,
    ) -> *mut c_void;
    pub fn CFRunLoopGetCurrent() -> *mut c_void;
    pub fn CFRunLoopAddSource(run_loop: *mut c_void, source: *mut c_void, mode: *const c_void);
    pub fn CFRunLoopRemoveSource(run_loop: *mut c_void, source: *mut c_void, mode: *const c_void);

    pub static kCFRunLoopCommonModes: *const c_void;
}

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C-unwind" {
    pub fn AXUIElementCreateApplication(pid: i32) -> *mut c_void;
    pub fn AXUIElementCopyAttributeValue(
        element: *mut c_void,
        attribute: *const c_void,
        value: *mut *const c_void,
    ) -> i32;
    pub fn AXUIElementPerformAction(element: *mut c_void, action: *const c_void) -> i32;
    // Private; the supported API has no way to map an AX window to its
    // window server id.
    pub fn _AXUIElementGetWindow(element: *mut c_void, out_window_id: *mut u32) -> i32;
}

pub const kAXErrorSuccess: i32 = 0;
