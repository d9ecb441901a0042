use bevy::prelude::*;
use dungeon_core::gameplay::Projectile;
use dungeon_core::input::Key;
use dungeon_core::physics::{Collider, Velocity};
use dungeon_core::wander::WanderAi;
use playtest_core::Harness;
use playtest_regression::{quiet_arena, still_enemies, DEFAULT_SEED, TICK};

fn flying_knives(harness: &mut Harness) -> Vec<(Vec2, Vec2)> {
    let world = harness.world_mut();
    let mut query = world.query_filtered::<(&Transform, &Velocity, &Collider), With<Projectile>>();
    query
        .iter(world)
        .filter(|(_, _, collider)| collider.enabled)
        .map(|(transform, velocity, _)| (transform.translation.truncate(), velocity.0))
        .collect()
}

#[test]
fn knife_leaves_along_the_facing() {
    let mut harness = Harness::new(quiet_arena(), DEFAULT_SEED);
    harness.step(&[Key::Action], TICK);

    let knives = flying_knives(&mut harness);
    assert_eq!(knives.len(), 1);
    let (position, velocity) = knives[0];
    assert_eq!(velocity, Vec2::new(0.0, -300.0));
    // Spawned 16 below the player, then one step of flight.
    assert!((position.y - (-16.0 - 300.0 * TICK.as_secs_f32())).abs() < 1e-3);
    assert_eq!(position.x, 0.0);
}

#[test]
fn holding_action_throws_once() {
    let mut harness = Harness::new(quiet_arena(), DEFAULT_SEED);
    for _ in 0..10 {
        harness.step(&[Key::Action], TICK);
    }
    assert_eq!(harness.active_projectiles(), 1);
}

#[test]
fn empty_pool_skips_the_throw() {
    let mut harness = Harness::new(quiet_arena(), DEFAULT_SEED);
    for _ in 0..4 {
        harness.step(&[Key::Action], TICK);
        harness.step(&[], TICK);
    }
    assert_eq!(harness.active_projectiles(), 3);
}

#[test]
fn knives_come_back_after_hitting_a_wall() {
    let mut harness = Harness::new(quiet_arena(), DEFAULT_SEED);
    harness.step(&[Key::Left], TICK);
    harness.step(&[Key::Action], TICK);
    assert_eq!(harness.active_projectiles(), 1);
    for _ in 0..60 {
        harness.step(&[], TICK);
    }
    assert_eq!(harness.active_projectiles(), 0);
    assert!(flying_knives(&mut harness).is_empty());
}

#[test]
fn knife_returns_enemy_to_the_pool() {
    let mut harness = Harness::new(still_enemies(), DEFAULT_SEED);
    harness.place_enemy(Vec2::new(0.0, -80.0)).unwrap();
    assert_eq!(harness.active_enemies(), 1);

    harness.step(&[Key::Action], TICK);
    for _ in 0..30 {
        harness.step(&[], TICK);
    }
    assert_eq!(harness.active_enemies(), 0);
    assert_eq!(harness.active_projectiles(), 0);
    assert_eq!(harness.player_state(), Some(Default::default()));
}

#[test]
fn pooled_enemy_stops_retargeting() {
    let mut harness = Harness::new(still_enemies(), DEFAULT_SEED);
    let enemy = harness.place_enemy(Vec2::new(0.0, -80.0)).unwrap();
    harness.step(&[Key::Action], TICK);
    for _ in 0..30 {
        harness.step(&[], TICK);
    }
    assert_eq!(harness.active_enemies(), 0);

    let parked = |harness: &mut Harness| {
        let world = harness.world_mut();
        let wander = world.get::<WanderAi>(enemy).unwrap();
        let position = world.get::<Transform>(enemy).unwrap().translation;
        (wander.direction(), wander.is_suspended(), position)
    };
    let before = parked(&mut harness);
    assert!(before.1);

    // Three retarget intervals of stepping.
    for _ in 0..400 {
        harness.step(&[], TICK);
    }
    assert_eq!(parked(&mut harness), before);
}
