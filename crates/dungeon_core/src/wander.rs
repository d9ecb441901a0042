//! Random-walk steering for enemies.

use std::time::Duration;

use bevy::prelude::*;
use rand::Rng;
use tracing::debug;

use crate::motion::Direction;

pub const RETARGET_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Component, Debug, Clone)]
pub struct WanderAi {
    body: Entity,
    direction: Direction,
    retarget: Timer,
}

impl WanderAi {
    pub fn new(body: Entity, initial: Direction, interval: Duration) -> Self {
        Self {
            body,
            direction: initial,
            retarget: Timer::new(interval, TimerMode::Repeating),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn body(&self) -> Entity {
        self.body
    }

    /// Drives the periodic retarget. Returns true when at least one retarget
    /// fired during `delta`.
    pub fn tick(&mut self, delta: Duration, rng: &mut impl Rng) -> bool {
        let fired = self.retarget.tick(delta).times_finished_this_tick();
        for _ in 0..fired {
            self.on_retarget_tick(rng);
        }
        fired > 0
    }

    pub fn on_retarget_tick(&mut self, rng: &mut impl Rng) {
        self.direction = self.direction.reroll(rng);
        debug!(target: "dungeon_core.wander", body = ?self.body, direction = ?self.direction, "retarget");
    }

    /// Collision notifications are broadcast to every wanderer, so contacts
    /// for other bodies are ignored.
    pub fn on_obstacle_collision(
        &mut self,
        moving: Entity,
        collided: Entity,
        rng: &mut impl Rng,
    ) -> bool {
        if moving != self.body {
            return false;
        }
        self.direction = self.direction.reroll(rng);
        debug!(
            target: "dungeon_core.wander",
            body = ?self.body,
            obstacle = ?collided,
            direction = ?self.direction,
            "bumped"
        );
        true
    }

    pub fn current_velocity(&self, speed: f32) -> Vec2 {
        self.direction.unit() * speed
    }

    /// Stops the retarget timer while the body sits in its pool.
    pub fn suspend(&mut self) {
        self.retarget.pause();
        self.retarget.reset();
    }

    pub fn resume(&mut self) {
        self.retarget.reset();
        self.retarget.unpause();
    }

    pub fn is_suspended(&self) -> bool {
        self.retarget.paused()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn body(raw: u32) -> Entity {
        Entity::from_raw(raw)
    }

    #[test]
    fn periodic_retarget_fires_on_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut ai = WanderAi::new(body(1), Direction::Right, RETARGET_INTERVAL);
        assert!(!ai.tick(Duration::from_millis(1999), &mut rng));
        assert_eq!(ai.direction(), Direction::Right);
        assert!(ai.tick(Duration::from_millis(1), &mut rng));
        assert_ne!(ai.direction(), Direction::Right);
    }

    #[test]
    fn collision_for_another_body_is_ignored() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut ai = WanderAi::new(body(1), Direction::Up, RETARGET_INTERVAL);
        assert!(!ai.on_obstacle_collision(body(2), body(9), &mut rng));
        assert_eq!(ai.direction(), Direction::Up);
        assert!(ai.on_obstacle_collision(body(1), body(9), &mut rng));
        assert_ne!(ai.direction(), Direction::Up);
    }

    #[test]
    fn consecutive_retargets_always_change_direction() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut ai = WanderAi::new(body(1), Direction::Left, RETARGET_INTERVAL);
        for _ in 0..1000 {
            let before = ai.direction();
            ai.on_retarget_tick(&mut rng);
            assert_ne!(ai.direction(), before);
        }
    }

    #[test]
    fn velocity_is_axis_aligned() {
        let ai = WanderAi::new(body(1), Direction::Down, RETARGET_INTERVAL);
        assert_eq!(ai.current_velocity(50.0), Vec2::new(0.0, -50.0));
        let ai = WanderAi::new(body(1), Direction::Left, RETARGET_INTERVAL);
        assert_eq!(ai.current_velocity(50.0), Vec2::new(-50.0, 0.0));
    }

    #[test]
    fn suspended_timer_does_not_fire() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut ai = WanderAi::new(body(1), Direction::Right, RETARGET_INTERVAL);
        ai.suspend();
        assert!(ai.is_suspended());
        assert!(!ai.tick(Duration::from_secs(10), &mut rng));
        ai.resume();
        assert!(ai.tick(RETARGET_INTERVAL, &mut rng));
    }
}
