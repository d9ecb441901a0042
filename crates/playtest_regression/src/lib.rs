//! Helpers for deterministic regression tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bevy::prelude::*;
use dungeon_core::body::{Body, Tint};
use dungeon_core::combat::{on_enemy_contact, ContactHandlers};
use dungeon_core::gameplay::SimulationRng;
use dungeon_core::health::CombatantHealth;
use dungeon_core::motion::{Clip, Direction, Facing};
use dungeon_core::wander::{WanderAi, RETARGET_INTERVAL};
use dungeon_core::{EventChannel, GameConfig, Topic};
use playtest_core::TraceEntry;
use rand::Rng;
use serde_json::json;

pub const DEFAULT_SEED: u64 = 42;
pub const TICK: Duration = Duration::from_millis(16);

/// Default tuning with no enemies and no chests.
pub fn quiet_arena() -> GameConfig {
    let mut config = GameConfig::default();
    config.enemy.spawn_points.clear();
    config.chest.positions.clear();
    config
}

/// No enemies; one chest a short walk to the right of the spawn point.
pub fn chest_ahead() -> GameConfig {
    let mut config = quiet_arena();
    config.chest.positions = vec![[40.0, 0.0]];
    config
}

/// Motionless enemies, so contacts happen exactly where they are placed.
pub fn still_enemies() -> GameConfig {
    let mut config = quiet_arena();
    config.enemy.speed = 0.0;
    config
}

/// Body that only remembers what it was told.
#[derive(Debug, Default)]
pub struct TraceBody {
    pub position: Vec2,
    pub velocity: Vec2,
    pub tint: Tint,
    pub defeated: bool,
}

impl Body for TraceBody {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    fn play(&mut self, _clip: Clip, _restart_if_same: bool) {}

    fn set_tint(&mut self, tint: Tint) {
        self.tint = tint;
    }

    fn face(&mut self, _facing: Facing) {}

    fn defeated(&mut self) {
        self.defeated = true;
    }
}

/// An enemy touching the player on every tick, recoil aging first as in
/// the fixed-step schedule. Returns the health publishes per tick.
pub fn strike_every_tick(max_hit_points: u32, ticks: u64) -> Vec<TraceEntry> {
    let channel = EventChannel::new();
    let published = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&published);
    let _recorder = channel.subscribe_scoped(Topic::HealthChanged, move |value| {
        if let Ok(mut seen) = sink.lock() {
            seen.push(value);
        }
    });

    let mut handlers = ContactHandlers::default();
    let mut health = CombatantHealth::new(max_hit_points);
    let mut body = TraceBody::default();
    let enemy = Vec2::new(12.0, 0.0);
    let mut trace = Vec::new();
    for tick in 0..ticks {
        health.advance(TICK, &mut body);
        on_enemy_contact(&mut handlers, &mut health, &mut body, enemy, 200.0, &channel);
        if let Ok(mut seen) = published.lock() {
            trace.extend(seen.drain(..).map(|value| TraceEntry {
                tick,
                topic: Topic::HealthChanged,
                value,
            }));
        }
    }
    trace
}

/// Directions a wanderer picks over `steps` retarget periods.
pub fn wander_directions(rng: &mut impl Rng, steps: usize) -> Vec<Direction> {
    let mut wander = WanderAi::new(Entity::PLACEHOLDER, Direction::Right, RETARGET_INTERVAL);
    (0..steps)
        .map(|_| {
            wander.tick(RETARGET_INTERVAL, rng);
            wander.direction()
        })
        .collect()
}

pub fn wander_trace(seed: u64, steps: usize) -> serde_json::Value {
    let mut rng = SimulationRng::new(seed);
    let directions = wander_directions(&mut rng, steps);
    json!({ "seed": seed, "directions": directions })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wander_trace_is_deterministic() {
        assert_eq!(wander_trace(DEFAULT_SEED, 8), wander_trace(DEFAULT_SEED, 8));
    }
}
