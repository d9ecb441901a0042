//! [`Body`] implemented over bevy sprite components.

use bevy::ecs::query::QueryData;
use bevy::prelude::*;

use crate::body::{Body, Tint};
use crate::motion::{Clip, Facing};
use crate::physics::{Collider, Velocity};

const DAMAGE_TINT: Color = Color::srgb(1.0, 0.0, 0.0);

/// Currently playing animation clip.
#[derive(Component, Debug, Clone)]
pub struct ClipPlayer {
    current: Clip,
}

impl ClipPlayer {
    pub fn new(clip: Clip) -> Self {
        Self { current: clip }
    }

    pub fn current(&self) -> Clip {
        self.current
    }

    /// Returns false when `clip` is already playing and no restart was
    /// requested.
    pub fn play(&mut self, clip: Clip, restart_if_same: bool) -> bool {
        if clip == self.current && !restart_if_same {
            return false;
        }
        self.current = clip;
        true
    }
}

/// Per-sprite presentation constants.
#[derive(Component, Debug, Clone, Copy)]
pub struct SpriteRig {
    pub base_color: Color,
    pub hitbox_offset_x: f32,
    pub mirrored_hitbox_offset_x: f32,
}

#[derive(QueryData)]
#[query_data(mutable)]
pub struct SpriteBody {
    pub transform: &'static mut Transform,
    pub velocity: &'static mut Velocity,
    pub sprite: &'static mut Sprite,
    pub clips: &'static mut ClipPlayer,
    pub collider: &'static mut Collider,
    pub rig: &'static SpriteRig,
}

impl Body for SpriteBodyItem<'_> {
    fn position(&self) -> Vec2 {
        self.transform.translation.truncate()
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity.0 = velocity;
    }

    fn play(&mut self, clip: Clip, restart_if_same: bool) {
        self.clips.play(clip, restart_if_same);
    }

    fn set_tint(&mut self, tint: Tint) {
        self.sprite.color = match tint {
            Tint::None => self.rig.base_color,
            Tint::Damaged => DAMAGE_TINT,
        };
    }

    fn face(&mut self, facing: Facing) {
        self.sprite.flip_x = facing.mirrored;
        self.collider.offset.x = if facing.mirrored {
            self.rig.mirrored_hitbox_offset_x
        } else {
            self.rig.hitbox_offset_x
        };
    }

    fn defeated(&mut self) {
        let current = self.clips.current();
        self.clips.play(Clip::faint(current.kind, current.axis), true);
        self.velocity.0 = Vec2::ZERO;
    }
}

/// Parts of a pooled body toggled on acquire and release.
#[derive(QueryData)]
#[query_data(mutable)]
pub struct PooledBody {
    pub transform: &'static mut Transform,
    pub velocity: &'static mut Velocity,
    pub collider: &'static mut Collider,
    pub visibility: &'static mut Visibility,
}

impl PooledBodyItem<'_> {
    pub fn activate(&mut self, position: Vec2, velocity: Vec2) {
        self.transform.translation.x = position.x;
        self.transform.translation.y = position.y;
        self.velocity.0 = velocity;
        self.collider.enabled = true;
        *self.visibility = Visibility::Inherited;
    }

    pub fn deactivate(&mut self) {
        self.velocity.0 = Vec2::ZERO;
        self.collider.enabled = false;
        *self.visibility = Visibility::Hidden;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::{Axis, ClipAction};

    #[test]
    fn replaying_same_clip_needs_restart_flag() {
        let mut player = ClipPlayer::new(Clip::idle("faune", Axis::Down));
        assert!(!player.play(Clip::idle("faune", Axis::Down), false));
        assert!(player.play(Clip::idle("faune", Axis::Down), true));
        assert!(player.play(Clip::run("faune", Axis::Side), false));
        assert_eq!(player.current().action, ClipAction::Run);
    }
}
