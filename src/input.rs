use std::collections::HashSet;
use winit::event::{ElementState, KeyboardInput, ModifiersState, VirtualKeyCode};

/// One frame's worth of viewer controls
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct InputState {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub yaw_left: bool,
    pub yaw_right: bool,
    pub pitch_up: bool,
    pub pitch_down: bool,
    /// One-shot: half turn about the viewer's up axis
    pub turn_around: bool,
    /// One-shot: face the world origin
    pub look_at_origin: bool,
    /// One-shot: return to the starting pose
    pub reset: bool,
    /// One-shot: save the screen image
    pub snapshot: bool,
}

/// Tracks held keys from winit events, and turns them into an `InputState` once per frame
#[derive(Debug, Default)]
pub struct KeyboardState {
    held: HashSet<VirtualKeyCode>,
    pressed: HashSet<VirtualKeyCode>,
    shift_pressed: bool,
    modifiers: ModifiersState,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_modifiers(&mut self, modifiers: ModifiersState) {
        self.modifiers = modifiers;
    }

    pub fn handle_input(&mut self, input: &KeyboardInput) {
        let key = match input.virtual_keycode {
            Some(key) => key,
            None => return,
        };
        match input.state {
            ElementState::Pressed => {
                // Key repeat arrives as more presses; only the first one counts as a new press
                if self.held.insert(key) {
                    self.pressed.insert(key);
                    if key == VirtualKeyCode::O && self.modifiers.shift() {
                        self.shift_pressed = true;
                    }
                }
            }
            ElementState::Released => {
                self.held.remove(&key);
            }
        }
    }

    /// Forget every held key, e.g. when the window loses focus and releases go elsewhere
    pub fn release_all(&mut self) {
        self.held.clear();
        self.modifiers = ModifiersState::empty();
    }

    /// Sample the current controls. One-shot actions fire once per key press.
    pub fn snapshot(&mut self) -> InputState {
        use VirtualKeyCode::*;
        let held = |key| self.held.contains(&key);
        let pressed = |key| self.pressed.contains(&key);
        let reset = self.shift_pressed;
        let state = InputState {
            move_forward: held(W),
            move_backward: held(S),
            move_left: held(A),
            move_right: held(D),
            move_up: held(Z),
            move_down: held(X),
            yaw_left: held(J),
            yaw_right: held(L),
            pitch_up: held(I),
            pitch_down: held(K),
            turn_around: pressed(U),
            look_at_origin: pressed(O) && !reset,
            reset,
            snapshot: pressed(P),
        };
        self.pressed.clear();
        self.shift_pressed = false;
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(deprecated)]
    fn key(key: VirtualKeyCode, state: ElementState) -> KeyboardInput {
        KeyboardInput {
            scancode: 0,
            state,
            virtual_keycode: Some(key),
            modifiers: ModifiersState::empty(),
        }
    }

    #[test]
    fn held_keys_persist_across_frames() {
        let mut keyboard = KeyboardState::new();
        keyboard.handle_input(&key(VirtualKeyCode::W, ElementState::Pressed));
        assert!(keyboard.snapshot().move_forward);
        assert!(keyboard.snapshot().move_forward);
        keyboard.handle_input(&key(VirtualKeyCode::W, ElementState::Released));
        assert!(!keyboard.snapshot().move_forward);
    }

    #[test]
    fn one_shot_actions_fire_once() {
        let mut keyboard = KeyboardState::new();
        keyboard.handle_input(&key(VirtualKeyCode::U, ElementState::Pressed));
        // Auto-repeat
        keyboard.handle_input(&key(VirtualKeyCode::U, ElementState::Pressed));
        assert!(keyboard.snapshot().turn_around);
        assert!(!keyboard.snapshot().turn_around);
    }

    #[test]
    fn shift_o_resets_instead_of_looking() {
        let mut keyboard = KeyboardState::new();
        keyboard.handle_modifiers(ModifiersState::SHIFT);
        keyboard.handle_input(&key(VirtualKeyCode::O, ElementState::Pressed));
        let state = keyboard.snapshot();
        assert!(state.reset);
        assert!(!state.look_at_origin);

        keyboard.handle_input(&key(VirtualKeyCode::O, ElementState::Released));
        keyboard.handle_modifiers(ModifiersState::empty());
        keyboard.handle_input(&key(VirtualKeyCode::O, ElementState::Pressed));
        let state = keyboard.snapshot();
        assert!(!state.reset);
        assert!(state.look_at_origin);
    }

    #[test]
    fn losing_focus_releases_held_keys() {
        let mut keyboard = KeyboardState::new();
        keyboard.handle_input(&key(VirtualKeyCode::W, ElementState::Pressed));
        keyboard.handle_input(&key(VirtualKeyCode::J, ElementState::Pressed));
        keyboard.release_all();
        let state = keyboard.snapshot();
        assert!(!state.move_forward);
        assert!(!state.yaw_left);

        // Pressing again after refocus counts as a fresh press
        keyboard.handle_input(&key(VirtualKeyCode::W, ElementState::Pressed));
        assert!(keyboard.snapshot().move_forward);
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let mut keyboard = KeyboardState::new();
        keyboard.handle_input(&key(VirtualKeyCode::Q, ElementState::Pressed));
        assert_eq!(keyboard.snapshot(), InputState::default());
    }
}
