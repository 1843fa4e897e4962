//! The activation state machine.
//!
//! Runs synchronously on the thread delivering intercepted key events, so
//! nothing here may block or wait on another component; a slow return here
//! stalls all keyboard input system-wide.

use std::time::Instant;

use tracing::{debug, info};

use crate::common::collections::HashSet;
use crate::common::config::Config;
use crate::labels::LabelAlphabet;
use crate::session::{Advance, OverlayUpdate, Session};
use crate::sys::keycode::{KeyCode, KeyEvent, KeyEventKind};
use crate::sys::overlay::OverlayHost;
use crate::sys::window::WindowSystem;

/// Session construction is the one unbounded cost on the event thread;
/// overruns are logged, never aborted, because a partial window list is
/// worse than a slow one.
const SESSION_BUILD_WARN_MS: u128 = 200;

/// What the native hook should do with the intercepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Swallow the event; other applications never see it.
    Consumed,
    /// Forward the event down the native input chain.
    PassThrough,
}

/// Turns the raw key event stream into hotkey detection, session building,
/// and label narrowing. Owns its collaborators for the process lifetime.
pub struct KeyEventHandler<S, H> {
    system: S,
    overlays: H,
    hotkey: HashSet<u16>,
    alphabet: LabelAlphabet,
    /// Keys currently held while idle. The chord must be exactly this set;
    /// releasing any key resets progress.
    pressed: HashSet<u16>,
    session: Option<Session>,
}

impl<S: WindowSystem, H: OverlayHost> KeyEventHandler<S, H> {
    pub fn new(config: &Config, system: S, overlays: H) -> KeyEventHandler<S, H> {
        KeyEventHandler {
            system,
            overlays,
            hotkey: config.hotkey.iter().map(|key| key.code()).collect(),
            alphabet: config.alphabet.clone(),
            pressed: HashSet::default(),
            session: None,
        }
    }

    pub fn handle_event(&mut self, event: KeyEvent) -> HookAction {
        debug!(?event, active = self.session.is_some(), "key event");
        match self.session.take() {
            None => self.handle_idle(event),
            Some(session) => self.handle_active(session, event),
        }
    }

    fn handle_idle(&mut self, event: KeyEvent) -> HookAction {
        match event.kind {
            KeyEventKind::Down => {
                self.pressed.insert(event.code);
            }
            // Releasing any key while building the chord resets progress;
            // the chord only counts when held simultaneously.
            KeyEventKind::Up => self.pressed.clear(),
        }

        if self.pressed == self.hotkey {
            self.activate();
            HookAction::Consumed
        } else {
            HookAction::PassThrough
        }
    }

    fn activate(&mut self) {
        // The key-down completing the chord is swallowed, but the OS still
        // believes that key is in flight; a synthetic key-up settles it.
        self.system.cancel_pending_keystroke();

        let snapshot = self.system.list_windows();

        let start = Instant::now();
        let session = Session::build(snapshot, &self.alphabet);
        self.overlays.show(&session.overlay_specs());
        let elapsed = start.elapsed().as_millis();
        if elapsed > SESSION_BUILD_WARN_MS {
            info!("displayed {} windows after {elapsed}ms", session.len());
        }

        self.session = Some(session);
    }

    fn handle_active(&mut self, mut session: Session, event: KeyEvent) -> HookAction {
        if event.kind == KeyEventKind::Up {
            self.session = Some(session);
            return HookAction::PassThrough;
        }

        let ch = KeyCode::try_from(event.code).ok().and_then(KeyCode::label_char);
        let Some(ch) = ch else {
            // No label can ever contain this key; treat it as a cancel.
            debug!(code = event.code, "cancelling session on unmappable key");
            self.overlays.dismiss_all();
            return HookAction::PassThrough;
        };

        let result = session.advance(ch);
        for update in &result.updates {
            match update {
                OverlayUpdate::Suffix { index, text } => self.overlays.set_suffix(*index, text),
                OverlayUpdate::Dismiss { index } => self.overlays.dismiss(*index),
            }
        }

        match result.outcome {
            Advance::Selected(index) => {
                self.system.focus(session.window(index));
                HookAction::Consumed
            }
            Advance::Narrowed => {
                self.session = Some(session);
                HookAction::Consumed
            }
            Advance::NoMatch => HookAction::PassThrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::config::OverlaySettings;
    use crate::geometry::Rect;
    use crate::sys::overlay::OverlaySpec;
    use crate::sys::window::{WindowId, WindowInfo};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        CancelKeystroke,
        ListWindows,
        Focus(WindowId),
        Show(usize),
        Suffix(usize, String),
        Dismiss(usize),
        DismissAll,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        windows: Vec<WindowInfo>,
    }

    type Shared = Rc<RefCell<Recorder>>;

    struct StubSystem(Shared);

    impl WindowSystem for StubSystem {
        fn list_windows(&mut self) -> Vec<WindowInfo> {
            self.0.borrow_mut().calls.push(Call::ListWindows);
            self.0.borrow().windows.clone()
        }

        fn focus(&mut self, window: &WindowInfo) {
            self.0.borrow_mut().calls.push(Call::Focus(window.id));
        }

        fn cancel_pending_keystroke(&mut self) {
            self.0.borrow_mut().calls.push(Call::CancelKeystroke);
        }
    }

    struct StubOverlays(Shared);

    impl OverlayHost for StubOverlays {
        fn show(&mut self, overlays: &[OverlaySpec]) {
            self.0.borrow_mut().calls.push(Call::Show(overlays.len()));
        }

        fn set_suffix(&mut self, index: usize, suffix: &str) {
            self.0.borrow_mut().calls.push(Call::Suffix(index, suffix.to_string()));
        }

        fn dismiss(&mut self, index: usize) {
            self.0.borrow_mut().calls.push(Call::Dismiss(index));
        }

        fn dismiss_all(&mut self) {
            self.0.borrow_mut().calls.push(Call::DismissAll);
        }
    }

    fn window(id: u32, frame: Rect) -> WindowInfo {
        WindowInfo { id: WindowId(id), pid: 7, frame, insert_after: None }
    }

    fn config(hotkey: &[KeyCode]) -> Config {
        Config {
            hotkey: hotkey.iter().copied().collect(),
            alphabet: LabelAlphabet::default(),
            overlay: OverlaySettings::default(),
        }
    }

    fn handler(
        hotkey: &[KeyCode],
        windows: Vec<WindowInfo>,
    ) -> (KeyEventHandler<StubSystem, StubOverlays>, Shared) {
        let shared: Shared = Rc::new(RefCell::new(Recorder { calls: Vec::new(), windows }));
        let handler = KeyEventHandler::new(
            &config(hotkey),
            StubSystem(shared.clone()),
            StubOverlays(shared.clone()),
        );
        (handler, shared)
    }

    fn drain(shared: &Shared) -> Vec<Call> { std::mem::take(&mut shared.borrow_mut().calls) }

    #[test_log::test]
    fn hotkey_activates_and_builds_a_session_once() {
        let frames = vec![window(1, Rect::new(0, 0, 100, 100))];
        let (mut handler, shared) = handler(&[KeyCode::Z], frames);

        let action = handler.handle_event(KeyEvent::down(KeyCode::Z));
        assert_eq!(action, HookAction::Consumed);
        assert_eq!(
            drain(&shared),
            vec![Call::CancelKeystroke, Call::ListWindows, Call::Show(1)]
        );
    }

    #[test]
    fn non_hotkey_keys_pass_through_while_idle() {
        let (mut handler, shared) = handler(&[KeyCode::Z], Vec::new());

        assert_eq!(handler.handle_event(KeyEvent::down(KeyCode::A)), HookAction::PassThrough);
        assert_eq!(handler.handle_event(KeyEvent::up(KeyCode::A)), HookAction::PassThrough);
        assert_eq!(drain(&shared), vec![]);
    }

    #[test]
    fn chord_requires_every_key_held_simultaneously() {
        let (mut handler, shared) = handler(&[KeyCode::Control, KeyCode::Space], Vec::new());

        assert_eq!(
            handler.handle_event(KeyEvent::down(KeyCode::Control)),
            HookAction::PassThrough
        );
        // Releasing mid-chord resets progress.
        assert_eq!(handler.handle_event(KeyEvent::up(KeyCode::Control)), HookAction::PassThrough);
        assert_eq!(
            handler.handle_event(KeyEvent::down(KeyCode::Space)),
            HookAction::PassThrough
        );
        assert_eq!(drain(&shared), vec![]);

        assert_eq!(handler.handle_event(KeyEvent::up(KeyCode::Space)), HookAction::PassThrough);
        assert_eq!(
            handler.handle_event(KeyEvent::down(KeyCode::Control)),
            HookAction::PassThrough
        );
        assert_eq!(handler.handle_event(KeyEvent::down(KeyCode::Space)), HookAction::Consumed);
    }

    #[test]
    fn extra_held_keys_never_activate() {
        let (mut handler, shared) = handler(&[KeyCode::Z], Vec::new());

        handler.handle_event(KeyEvent::down(KeyCode::Shift));
        assert_eq!(handler.handle_event(KeyEvent::down(KeyCode::Z)), HookAction::PassThrough);
        assert_eq!(drain(&shared), vec![]);
    }

    #[test]
    fn typing_an_exact_label_focuses_the_window() {
        let frames = vec![
            window(1, Rect::new(0, 0, 100, 100)),
            window(2, Rect::new(200, 0, 300, 100)),
        ];
        let (mut handler, shared) = handler(&[KeyCode::Z], frames);

        handler.handle_event(KeyEvent::down(KeyCode::Z));
        drain(&shared);

        // Window 1 is leftmost, so its label is "A".
        let action = handler.handle_event(KeyEvent::down(KeyCode::A));
        assert_eq!(action, HookAction::Consumed);
        assert_eq!(
            drain(&shared),
            vec![Call::Dismiss(0), Call::Dismiss(1), Call::Focus(WindowId(1))]
        );

        // Back to idle: the next key passes through without side effects.
        assert_eq!(handler.handle_event(KeyEvent::down(KeyCode::A)), HookAction::PassThrough);
        assert_eq!(drain(&shared), vec![]);
    }

    #[test]
    fn prefix_and_exact_labels_resolve_like_the_spec_scenario() {
        // Labels "A" and "AB" cannot both come out of the generator, but a
        // session can be narrowed to this shape; drive it via ten windows
        // instead: codes are two letters, "AA".."SS".
        let frames: Vec<WindowInfo> = (0..10)
            .map(|index| window(index as u32 + 1, Rect::new(index * 110, 0, index * 110 + 100, 100)))
            .collect();
        let (mut handler, shared) = handler(&[KeyCode::Z], frames);

        handler.handle_event(KeyEvent::down(KeyCode::Z));
        drain(&shared);

        // 'A' narrows to the nine windows labeled "A?".
        let action = handler.handle_event(KeyEvent::down(KeyCode::A));
        assert_eq!(action, HookAction::Consumed);
        let calls = drain(&shared);
        let suffixes = calls.iter().filter(|call| matches!(call, Call::Suffix(..))).count();
        let dismissed = calls.iter().filter(|call| matches!(call, Call::Dismiss(_))).count();
        assert_eq!(suffixes, 9);
        assert_eq!(dismissed, 1);

        // 'S' completes "AS", the second window in reading order.
        let action = handler.handle_event(KeyEvent::down(KeyCode::S));
        assert_eq!(action, HookAction::Consumed);
        let calls = drain(&shared);
        assert!(calls.contains(&Call::Focus(WindowId(2))));
    }

    #[test]
    fn unmatched_character_dismisses_everything_and_passes_through() {
        let frames = vec![window(1, Rect::new(0, 0, 100, 100))];
        let (mut handler, shared) = handler(&[KeyCode::Z], frames);

        handler.handle_event(KeyEvent::down(KeyCode::Z));
        drain(&shared);

        // No label starts with "B".
        let action = handler.handle_event(KeyEvent::down(KeyCode::B));
        assert_eq!(action, HookAction::PassThrough);
        assert_eq!(drain(&shared), vec![Call::Dismiss(0)]);

        // The session is gone; keys behave as idle again.
        assert_eq!(handler.handle_event(KeyEvent::down(KeyCode::B)), HookAction::PassThrough);
    }

    #[test]
    fn key_up_passes_through_during_a_session() {
        let frames = vec![window(1, Rect::new(0, 0, 100, 100))];
        let (mut handler, shared) = handler(&[KeyCode::Z], frames);

        handler.handle_event(KeyEvent::down(KeyCode::Z));
        drain(&shared);

        assert_eq!(handler.handle_event(KeyEvent::up(KeyCode::Z)), HookAction::PassThrough);
        assert_eq!(drain(&shared), vec![]);

        // The session is still alive afterwards.
        assert_eq!(handler.handle_event(KeyEvent::down(KeyCode::A)), HookAction::Consumed);
    }

    #[test]
    fn unmappable_key_cancels_the_session() {
        let frames = vec![window(1, Rect::new(0, 0, 100, 100))];
        let (mut handler, shared) = handler(&[KeyCode::Z], frames);

        handler.handle_event(KeyEvent::down(KeyCode::Z));
        drain(&shared);

        let action = handler.handle_event(KeyEvent::down(KeyCode::Escape));
        assert_eq!(action, HookAction::PassThrough);
        assert_eq!(drain(&shared), vec![Call::DismissAll]);
        assert_eq!(handler.handle_event(KeyEvent::down(KeyCode::A)), HookAction::PassThrough);
    }

    #[test]
    fn empty_snapshot_yields_an_immediately_dead_session() {
        let (mut handler, shared) = handler(&[KeyCode::Z], Vec::new());

        assert_eq!(handler.handle_event(KeyEvent::down(KeyCode::Z)), HookAction::Consumed);
        assert_eq!(
            drain(&shared),
            vec![Call::CancelKeystroke, Call::ListWindows, Call::Show(0)]
        );

        assert_eq!(handler.handle_event(KeyEvent::down(KeyCode::A)), HookAction::PassThrough);
        assert_eq!(drain(&shared), vec![]);
    }

    #[test]
    fn unknown_raw_keys_still_block_the_chord() {
        let (mut handler, _shared) = handler(&[KeyCode::Z], Vec::new());

        // A key outside the KeyCode table joins the pressed set, so the
        // chord is a superset and must not fire.
        handler.handle_event(KeyEvent::raw(0x0A, KeyEventKind::Down));
        assert_eq!(handler.handle_event(KeyEvent::down(KeyCode::Z)), HookAction::PassThrough);
    }
}
