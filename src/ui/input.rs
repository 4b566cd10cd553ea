/// Keyboard input: held-key tracking and the mapping to player intent.
///
/// Held keys drive continuous aiming; fresh presses drive one-shot actions
/// (release, restart, quit).
///
/// Terminals differ in what they report. With keyboard enhancement a
/// Release event ends a hold; without it a hold expires HOLD_TIMEOUT after
/// the last Press/Repeat for that key.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::sim::FrameInput;

/// After this long without a Press/Repeat, a key counts as released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    AimLeft,
    AimRight,
    Release,
    Restart,
    Quit,
}

/// Fixed key bindings.
pub fn action_for(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Action::AimLeft),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Action::AimRight),
        KeyCode::Down | KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('s') | KeyCode::Char('S') => {
            Some(Action::Release)
        }
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Action::Restart),
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Some(Action::Quit),
        _ => None,
    }
}

pub struct InputState {
    /// Last Press/Repeat per key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from "not held" to "held" during the last drain.
    fresh_presses: Vec<KeyCode>,
    /// Raw key events of the last drain, for modifier checks.
    raw_events: Vec<KeyEvent>,
    /// Honor Release events. Only set once keyboard enhancement is confirmed.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Read every pending terminal event without blocking. Call once per
    /// frame, before the game step.
    pub fn drain_events(&mut self) {
        self.begin_frame();
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.feed(key, Instant::now());
            }
        }
        self.expire(Instant::now());
    }

    fn begin_frame(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
    }

    /// Record one key event observed at `now`.
    fn feed(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // Unconfirmed releases are left to the timeout.
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.held_at(key.code, now);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    fn expire(&mut self, now: Instant) {
        self.last_active
            .retain(|_, t| now.saturating_duration_since(*t) < HOLD_TIMEOUT);
    }

    fn held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active
            .get(&code)
            .is_some_and(|t| now.saturating_duration_since(*t) < HOLD_TIMEOUT)
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.held_at(code, Instant::now())
    }

    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn action_held(&self, action: Action) -> bool {
        self.last_active
            .keys()
            .any(|&code| action_for(code) == Some(action) && self.is_held(code))
    }

    pub fn action_pressed(&self, action: Action) -> bool {
        self.fresh_presses.iter().any(|&code| action_for(code) == Some(action))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }

    pub fn quit_requested(&self) -> bool {
        self.ctrl_c_pressed() || self.action_pressed(Action::Quit)
    }

    /// Player intent for this frame. Held aim keys nudge `aim_x` by
    /// `aim_speed * dt`; opposite keys cancel. The core clamps the result.
    pub fn frame_input(&self, aim_x: f32, aim_speed: f32, dt: f32) -> FrameInput {
        let mut dir = 0.0;
        if self.action_held(Action::AimLeft) {
            dir -= 1.0;
        }
        if self.action_held(Action::AimRight) {
            dir += 1.0;
        }
        FrameInput {
            pointer_x: (dir != 0.0).then(|| aim_x + dir * aim_speed * dt),
            release: self.action_pressed(Action::Release),
        }
    }
}

impl Default for InputState {
    fn default() -> Self {
        InputState::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    fn press(input: &mut InputState, code: KeyCode) {
        input.feed(key(code, KeyEventKind::Press), Instant::now());
    }

    #[test]
    fn bindings() {
        assert_eq!(action_for(KeyCode::Left), Some(Action::AimLeft));
        assert_eq!(action_for(KeyCode::Char('d')), Some(Action::AimRight));
        assert_eq!(action_for(KeyCode::Char(' ')), Some(Action::Release));
        assert_eq!(action_for(KeyCode::Char('R')), Some(Action::Restart));
        assert_eq!(action_for(KeyCode::Esc), Some(Action::Quit));
        assert_eq!(action_for(KeyCode::Char('x')), None);
    }

    #[test]
    fn first_press_is_fresh_repeat_is_not() {
        let mut input = InputState::new();
        press(&mut input, KeyCode::Enter);
        assert!(input.was_pressed(KeyCode::Enter));
        assert!(input.action_pressed(Action::Release));

        input.begin_frame();
        input.feed(key(KeyCode::Enter, KeyEventKind::Repeat), Instant::now());
        assert!(!input.was_pressed(KeyCode::Enter));
        assert!(input.is_held(KeyCode::Enter));
    }

    #[test]
    fn release_honored_only_when_enabled() {
        let mut input = InputState::new();
        press(&mut input, KeyCode::Left);
        input.feed(key(KeyCode::Left, KeyEventKind::Release), Instant::now());
        assert!(input.is_held(KeyCode::Left));

        input.honor_release = true;
        input.feed(key(KeyCode::Left, KeyEventKind::Release), Instant::now());
        assert!(!input.is_held(KeyCode::Left));
    }

    #[test]
    fn holds_expire_after_timeout() {
        let mut input = InputState::new();
        let then = Instant::now();
        input.feed(key(KeyCode::Right, KeyEventKind::Press), then);
        input.expire(then + HOLD_TIMEOUT);
        assert!(!input.held_at(KeyCode::Right, then + HOLD_TIMEOUT));
        assert!(input.last_active.is_empty());
    }

    #[test]
    fn ctrl_c_quits() {
        let mut input = InputState::new();
        input.feed(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), Instant::now());
        assert!(input.quit_requested());
    }

    #[test]
    fn aim_follows_held_keys() {
        let mut input = InputState::new();
        assert_eq!(input.frame_input(100.0, 200.0, 0.5), FrameInput::default());

        press(&mut input, KeyCode::Right);
        let f = input.frame_input(100.0, 200.0, 0.5);
        assert_eq!(f.pointer_x, Some(200.0));
        assert!(!f.release);

        press(&mut input, KeyCode::Left);
        assert_eq!(input.frame_input(100.0, 200.0, 0.5).pointer_x, None);
    }

    #[test]
    fn release_is_edge_triggered() {
        let mut input = InputState::new();
        press(&mut input, KeyCode::Char(' '));
        assert!(input.frame_input(0.0, 1.0, 0.1).release);
        input.begin_frame();
        assert!(!input.frame_input(0.0, 1.0, 0.1).release);
    }
}
