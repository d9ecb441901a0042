//! Headless driver for the gameplay plugin.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bevy::input::ButtonInput;
use bevy::prelude::*;
use dungeon_core::gameplay::{self, EnemyPool, Player, ProjectilePool};
use dungeon_core::health::{CombatantHealth, HealthState};
use dungeon_core::input::{Key, KeyBindings};
use dungeon_core::interaction::InteractionResolver;
use dungeon_core::{EventChannel, GameConfig, GameplayPlugin, SimulationParams, Subscription, Topic};
use serde::{Deserialize, Serialize};

/// One channel publish, stamped with the zero-based step it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub tick: u64,
    pub topic: Topic,
    pub value: u32,
}

type Pending = Arc<Mutex<Vec<(Topic, u32)>>>;

pub struct Harness {
    app: App,
    tick: u64,
    pending: Pending,
    trace: Vec<TraceEntry>,
    _recorders: Vec<Subscription>,
}

impl Harness {
    /// Builds the app and runs startup. Nothing has ticked yet.
    pub fn new(config: GameConfig, seed: u64) -> Self {
        let mut app = App::new();
        app.insert_resource(SimulationParams::from_seed(seed))
            .insert_resource(config)
            .add_plugins(MinimalPlugins)
            .add_plugins(GameplayPlugin);
        app.update();

        let pending: Pending = Arc::default();
        let channel = app.world().resource::<EventChannel>().clone();
        let recorders = Topic::ALL
            .into_iter()
            .map(|topic| {
                let sink = Arc::clone(&pending);
                channel.subscribe_scoped(topic, move |value| {
                    sink.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push((topic, value));
                })
            })
            .collect();

        tracing::debug!(target: "playtest.harness", seed, "harness ready");
        Self {
            app,
            tick: 0,
            pending,
            trace: Vec::new(),
            _recorders: recorders,
        }
    }

    /// Runs one fixed step with exactly `keys` held. Keys held on the
    /// previous step stay held, so they only count as just pressed once.
    pub fn step(&mut self, keys: &[Key], dt: Duration) -> u64 {
        let world = self.app.world_mut();
        let bindings = world.resource::<KeyBindings>().clone();
        {
            let mut input = world.resource_mut::<ButtonInput<KeyCode>>();
            input.clear();
            for key in Key::ALL {
                let Some(code) = bindings.primary(key) else {
                    continue;
                };
                if keys.contains(&key) {
                    input.press(code);
                } else {
                    input.release(code);
                }
            }
        }
        world.resource_mut::<Time>().advance_by(dt);
        world.run_schedule(FixedUpdate);

        let published: Vec<(Topic, u32)> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        let tick = self.tick;
        self.trace.extend(
            published
                .into_iter()
                .map(|(topic, value)| TraceEntry { tick, topic, value }),
        );
        self.tick += 1;
        tick
    }

    /// Steps completed so far.
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// Payloads published on `topic`, oldest first.
    pub fn values(&self, topic: Topic) -> Vec<u32> {
        self.trace
            .iter()
            .filter(|entry| entry.topic == topic)
            .map(|entry| entry.value)
            .collect()
    }

    pub fn player_health(&mut self) -> Option<CombatantHealth> {
        let world = self.app.world_mut();
        let mut query = world.query_filtered::<&CombatantHealth, With<Player>>();
        query.get_single(world).ok().cloned()
    }

    pub fn player_state(&mut self) -> Option<HealthState> {
        self.player_health().map(|health| health.state())
    }

    pub fn player_position(&mut self) -> Option<Vec2> {
        let world = self.app.world_mut();
        let mut query = world.query_filtered::<&Transform, With<Player>>();
        query
            .get_single(world)
            .ok()
            .map(|transform| transform.translation.truncate())
    }

    pub fn resolver(&mut self) -> Option<InteractionResolver> {
        let world = self.app.world_mut();
        let mut query = world.query_filtered::<&InteractionResolver, With<Player>>();
        query.get_single(world).ok().cloned()
    }

    pub fn coins(&mut self) -> u32 {
        self.resolver().map_or(0, |resolver| resolver.coins())
    }

    pub fn active_projectiles(&self) -> usize {
        self.app
            .world()
            .get_resource::<ProjectilePool>()
            .map_or(0, |pool| pool.active_count())
    }

    pub fn active_enemies(&self) -> usize {
        self.app
            .world()
            .get_resource::<EnemyPool>()
            .map_or(0, |pool| pool.active_count())
    }

    /// Wakes a pooled enemy at `position`.
    pub fn place_enemy(&mut self, position: Vec2) -> Option<Entity> {
        gameplay::activate_enemy(self.app.world_mut(), position)
    }

    pub fn channel(&self) -> EventChannel {
        self.app.world().resource::<EventChannel>().clone()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(16);

    fn quiet_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.enemy.spawn_points.clear();
        config.chest.positions.clear();
        config
    }

    #[test]
    fn held_action_throws_once() {
        let mut harness = Harness::new(quiet_config(), 42);
        harness.step(&[Key::Action], TICK);
        assert_eq!(harness.active_projectiles(), 1);
        harness.step(&[Key::Action], TICK);
        harness.step(&[Key::Action], TICK);
        assert_eq!(harness.active_projectiles(), 1);

        harness.step(&[], TICK);
        harness.step(&[Key::Action], TICK);
        assert_eq!(harness.active_projectiles(), 2);
        assert_eq!(harness.ticks(), 5);
    }

    #[test]
    fn walking_moves_the_player() {
        let mut harness = Harness::new(quiet_config(), 42);
        // Velocity is set during the step and integrated in the same step.
        for _ in 0..10 {
            harness.step(&[Key::Right], TICK);
        }
        let position = harness.player_position().unwrap();
        assert!(position.x > 10.0, "got {position}");
        assert_eq!(position.y, 0.0);
        assert!(harness.trace().is_empty());
    }
}
