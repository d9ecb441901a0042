//! The narrow interface gameplay state machines use to drive an
//! engine-owned sprite body.

use bevy::prelude::*;

use crate::motion::{Clip, Facing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tint {
    #[default]
    None,
    Damaged,
}

pub trait Body {
    fn position(&self) -> Vec2;
    fn set_velocity(&mut self, velocity: Vec2);
    fn play(&mut self, clip: Clip, restart_if_same: bool);
    fn set_tint(&mut self, tint: Tint);
    /// Mirrors the sprite and moves the hitbox to match.
    fn face(&mut self, facing: Facing);
    /// Faint animation plus whatever physical response the host wants.
    fn defeated(&mut self);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records every request so tests can assert on hook calls.
    #[derive(Debug, Default)]
    pub struct RecordingBody {
        pub position: Vec2,
        pub velocity: Vec2,
        pub tint: Tint,
        pub facing: Facing,
        pub clips: Vec<Clip>,
        pub defeated: u32,
    }

    impl Body for RecordingBody {
        fn position(&self) -> Vec2 {
            self.position
        }

        fn set_velocity(&mut self, velocity: Vec2) {
            self.velocity = velocity;
        }

        fn play(&mut self, clip: Clip, restart_if_same: bool) {
            if restart_if_same || self.clips.last() != Some(&clip) {
                self.clips.push(clip);
            }
        }

        fn set_tint(&mut self, tint: Tint) {
            self.tint = tint;
        }

        fn face(&mut self, facing: Facing) {
            self.facing = facing;
        }

        fn defeated(&mut self) {
            self.defeated += 1;
        }
    }
}
