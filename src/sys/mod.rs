pub mod keycode;
pub mod overlay;
pub mod window;

#[cfg(target_os = "macos")]
pub mod cg;
#[cfg(target_os = "macos")]
pub mod event_tap;
#[cfg(target_os = "macos")]
pub mod overlay_panel;
#[cfg(target_os = "macos")]
pub mod window_server;

pub use keycode::{KeyCode, KeyEvent, KeyEventKind};
pub use overlay::{OverlayHost, OverlaySpec};
pub use window::{WindowId, WindowInfo, WindowSystem};
