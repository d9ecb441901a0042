//! Contact responses between the player and enemies.

use bevy::prelude::*;
use tracing::info;

use crate::body::Body;
use crate::events::EventChannel;
use crate::health::{CombatantHealth, DamageOutcome};

/// Push from `enemy` towards `player`, scaled to `magnitude`. Coincident
/// centres produce no push.
pub fn knockback(enemy: Vec2, player: Vec2, magnitude: f32) -> Vec2 {
    (player - enemy).normalize_or_zero() * magnitude
}

/// Which player/enemy contact handlers are live. The damage handler is
/// detached once the player is defeated; body separation always runs.
#[derive(Resource, Debug, Clone)]
pub struct ContactHandlers {
    enemy_damage: bool,
}

impl Default for ContactHandlers {
    fn default() -> Self {
        Self { enemy_damage: true }
    }
}

impl ContactHandlers {
    pub fn enemy_damage_attached(&self) -> bool {
        self.enemy_damage
    }

    pub fn detach_enemy_damage(&mut self) {
        self.enemy_damage = false;
    }
}

pub fn on_enemy_contact(
    handlers: &mut ContactHandlers,
    health: &mut CombatantHealth,
    body: &mut impl Body,
    enemy_position: Vec2,
    magnitude: f32,
    channel: &EventChannel,
) -> DamageOutcome {
    if !handlers.enemy_damage_attached() {
        return DamageOutcome::Ignored;
    }
    let push = knockback(enemy_position, body.position(), magnitude);
    let outcome = health.apply_damage(push, body, channel);
    if outcome == DamageOutcome::Incapacitated {
        handlers.detach_enemy_damage();
        info!(target: "dungeon_core.combat", "player defeated, enemy damage handler detached");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::testing::RecordingBody;
    use crate::events::Topic;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn knockback_points_away_from_enemy() {
        let push = knockback(Vec2::new(10.0, 0.0), Vec2::new(0.0, 0.0), 200.0);
        assert_eq!(push, Vec2::new(-200.0, 0.0));
        let diagonal = knockback(Vec2::ZERO, Vec2::new(3.0, 4.0), 200.0);
        assert!((diagonal.length() - 200.0).abs() < 1e-3);
        assert_eq!(knockback(Vec2::ONE, Vec2::ONE, 200.0), Vec2::ZERO);
    }

    #[test]
    fn defeat_detaches_damage_handler() {
        let channel = EventChannel::new();
        let published = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&published);
        channel.subscribe(Topic::HealthChanged, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let mut handlers = ContactHandlers::default();
        let mut health = CombatantHealth::new(2);
        let mut body = RecordingBody::default();
        let enemy = Vec2::new(8.0, 0.0);

        let first = on_enemy_contact(&mut handlers, &mut health, &mut body, enemy, 200.0, &channel);
        assert_eq!(first, DamageOutcome::Recoiling { hit_points: 1 });
        assert_eq!(body.velocity, Vec2::new(-200.0, 0.0));
        health.advance(Duration::from_millis(250), &mut body);

        let second = on_enemy_contact(&mut handlers, &mut health, &mut body, enemy, 200.0, &channel);
        assert_eq!(second, DamageOutcome::Incapacitated);
        assert!(!handlers.enemy_damage_attached());

        let third = on_enemy_contact(&mut handlers, &mut health, &mut body, enemy, 200.0, &channel);
        assert_eq!(third, DamageOutcome::Ignored);
        assert_eq!(published.load(Ordering::SeqCst), 2);
    }
}
