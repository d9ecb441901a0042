//! Keyboard bindings and the per-tick input snapshot.

use bevy::input::ButtonInput;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Logical keys the player can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Action,
}

impl Key {
    pub const ALL: [Key; 5] = [Key::Left, Key::Right, Key::Up, Key::Down, Key::Action];
}

#[derive(Resource, Debug, Clone)]
pub struct KeyBindings {
    pub left: Vec<KeyCode>,
    pub right: Vec<KeyCode>,
    pub up: Vec<KeyCode>,
    pub down: Vec<KeyCode>,
    pub action: Vec<KeyCode>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            left: vec![KeyCode::KeyA, KeyCode::ArrowLeft],
            right: vec![KeyCode::KeyD, KeyCode::ArrowRight],
            up: vec![KeyCode::KeyW, KeyCode::ArrowUp],
            down: vec![KeyCode::KeyS, KeyCode::ArrowDown],
            action: vec![KeyCode::Space],
        }
    }
}

impl KeyBindings {
    pub fn codes(&self, key: Key) -> &[KeyCode] {
        match key {
            Key::Left => &self.left,
            Key::Right => &self.right,
            Key::Up => &self.up,
            Key::Down => &self.down,
            Key::Action => &self.action,
        }
    }

    pub fn primary(&self, key: Key) -> Option<KeyCode> {
        self.codes(key).first().copied()
    }
}

/// Action key edges seen since the last fixed step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionEdges {
    pub pressed: bool,
    pub released: bool,
}

/// Action key edges collected by the frame loop until a fixed step takes
/// them. `ButtonInput` only keeps an edge for one render frame, and that
/// frame may run no fixed step at all.
#[derive(Resource, Debug, Default)]
pub struct ActionPresses {
    pending: ActionEdges,
}

impl ActionPresses {
    pub fn record(&mut self, edges: ActionEdges) {
        self.pending.pressed |= edges.pressed;
        self.pending.released |= edges.released;
    }

    /// Edges since the previous call.
    pub fn take(&mut self) -> ActionEdges {
        std::mem::take(&mut self.pending)
    }
}

pub fn buffer_action_presses(
    keys: Res<ButtonInput<KeyCode>>,
    bindings: Res<KeyBindings>,
    mut presses: ResMut<ActionPresses>,
) {
    let codes = &bindings.action;
    presses.record(ActionEdges {
        pressed: keys.any_just_pressed(codes.iter().copied()),
        released: keys.any_just_released(codes.iter().copied()),
    });
}

/// Directional keys are level-triggered. The action key reports whether it
/// is held now plus the edges since the previous tick, so a tap released
/// before the tick ran still counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub action_held: bool,
    pub action_pressed: bool,
    pub action_released: bool,
}

impl ControlInput {
    pub fn read(keys: &ButtonInput<KeyCode>, bindings: &KeyBindings, edges: ActionEdges) -> Self {
        let held = |key: Key| keys.any_pressed(bindings.codes(key).iter().copied());
        Self {
            left: held(Key::Left),
            right: held(Key::Right),
            up: held(Key::Up),
            down: held(Key::Down),
            action_held: held(Key::Action),
            action_pressed: edges.pressed,
            action_released: edges.released,
        }
    }

    /// Snapshot for a tick where exactly `keys` are held and the action key
    /// counts as pressed if it is among them.
    pub fn holding(keys: &[Key]) -> Self {
        let action = keys.contains(&Key::Action);
        Self {
            left: keys.contains(&Key::Left),
            right: keys.contains(&Key::Right),
            up: keys.contains(&Key::Up),
            down: keys.contains(&Key::Down),
            action_held: action,
            action_pressed: action,
            action_released: false,
        }
    }
}
