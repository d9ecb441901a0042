//! Per-tick player input handling: movement, chest opening and knife
//! throwing.

use bevy::prelude::*;
use tracing::debug;

use crate::body::Body;
use crate::events::{EventChannel, Topic};
use crate::health::CombatantHealth;
use crate::input::ControlInput;
use crate::motion::{Clip, Direction, Facing};
use crate::pool::SlotHandle;

/// Host services the resolver calls into when the action key fires.
pub trait ActionHost {
    /// Opens the container and returns what it yielded, or `None` if the
    /// target no longer exists.
    fn open_container(&mut self, target: Entity) -> Option<u32>;
    /// Recycles a projectile from the pool. `None` when the pool is empty.
    fn launch_projectile(&mut self, origin: Vec2, velocity: Vec2) -> Option<SlotHandle>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverTuning {
    pub move_speed: f32,
    pub projectile_speed: f32,
    /// Distance in front of the body where projectiles appear.
    pub projectile_offset: f32,
}

impl Default for ResolverTuning {
    fn default() -> Self {
        Self {
            move_speed: 100.0,
            projectile_speed: 300.0,
            projectile_offset: 16.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Recoiling or incapacitated.
    Suppressed,
    OpenedContainer { yielded: u32, total: u32 },
    Launched(SlotHandle),
    /// Action fired but nothing happened: empty pool or stale target.
    ActionSkipped,
    Moved(Direction),
    Idle,
}

#[derive(Component, Debug, Clone)]
pub struct InteractionResolver {
    kind: &'static str,
    tuning: ResolverTuning,
    facing: Facing,
    target: Option<Entity>,
    coins: u32,
    action_latched: bool,
}

impl InteractionResolver {
    pub fn new(kind: &'static str, tuning: ResolverTuning) -> Self {
        Self {
            kind,
            tuning,
            facing: Facing::default(),
            target: None,
            coins: 0,
            action_latched: false,
        }
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    pub fn coins(&self) -> u32 {
        self.coins
    }

    pub fn idle_clip(&self) -> Clip {
        Clip::idle(self.kind, self.facing.axis)
    }

    /// Called when the body overlaps a container.
    pub fn attach_target(&mut self, target: Entity) {
        self.target = Some(target);
    }

    pub fn detach_target(&mut self) {
        self.target = None;
    }

    pub fn update(
        &mut self,
        input: &ControlInput,
        health: &CombatantHealth,
        body: &mut impl Body,
        host: &mut impl ActionHost,
        channel: &EventChannel,
    ) -> TickOutcome {
        // The edge comes from the latch, not the host, so a press whose
        // frame ran no fixed step still fires on the next tick. Latch
        // before the lockout check so a press made while recoiling never
        // fires later.
        if input.action_released {
            self.action_latched = false;
        }
        let fresh_press = (input.action_held || input.action_pressed) && !self.action_latched;
        self.action_latched = input.action_held;

        if !health.accepts_input() {
            return TickOutcome::Suppressed;
        }

        if fresh_press {
            return self.act(body, host, channel);
        }

        let direction = if input.left {
            Some(Direction::Left)
        } else if input.right {
            Some(Direction::Right)
        } else if input.up {
            Some(Direction::Up)
        } else if input.down {
            Some(Direction::Down)
        } else {
            None
        };

        match direction {
            Some(direction) => {
                self.target = None;
                self.facing = self.facing.turned(direction);
                body.face(self.facing);
                body.set_velocity(direction.unit() * self.tuning.move_speed);
                body.play(Clip::run(self.kind, self.facing.axis), false);
                TickOutcome::Moved(direction)
            }
            None => {
                body.set_velocity(Vec2::ZERO);
                body.play(self.idle_clip(), false);
                TickOutcome::Idle
            }
        }
    }

    fn act(
        &mut self,
        body: &mut impl Body,
        host: &mut impl ActionHost,
        channel: &EventChannel,
    ) -> TickOutcome {
        if let Some(target) = self.target {
            let Some(yielded) = host.open_container(target) else {
                debug!(target: "dungeon_core.interaction", ?target, "container gone, detaching");
                self.target = None;
                return TickOutcome::ActionSkipped;
            };
            self.coins += yielded;
            channel.publish(Topic::CoinsChanged, self.coins);
            return TickOutcome::OpenedContainer {
                yielded,
                total: self.coins,
            };
        }

        let heading = self.facing.unit();
        let origin = body.position() + heading * self.tuning.projectile_offset;
        match host.launch_projectile(origin, heading * self.tuning.projectile_speed) {
            Some(handle) => TickOutcome::Launched(handle),
            None => {
                debug!(target: "dungeon_core.interaction", "projectile pool exhausted, throw skipped");
                TickOutcome::ActionSkipped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::testing::RecordingBody;
    use crate::input::Key;
    use crate::motion::Axis;
    use crate::pool::Pool;
    use std::sync::{Arc, Mutex};

    struct FakeHost {
        chests: Vec<(Entity, u32)>,
        opened: Vec<Entity>,
        pool: Pool<()>,
        launches: Vec<(Vec2, Vec2)>,
    }

    impl FakeHost {
        fn new(capacity: usize) -> Self {
            Self {
                chests: vec![(Entity::from_raw(40), 120)],
                opened: Vec::new(),
                pool: Pool::from_fn(capacity, |_| ()),
                launches: Vec::new(),
            }
        }
    }

    impl ActionHost for FakeHost {
        fn open_container(&mut self, target: Entity) -> Option<u32> {
            let (_, coins) = self.chests.iter_mut().find(|(e, _)| *e == target)?;
            self.opened.push(target);
            Some(std::mem::take(coins))
        }

        fn launch_projectile(&mut self, origin: Vec2, velocity: Vec2) -> Option<SlotHandle> {
            let (handle, _) = self.pool.acquire()?;
            self.launches.push((origin, velocity));
            Some(handle)
        }
    }

    struct Rig {
        resolver: InteractionResolver,
        health: CombatantHealth,
        body: RecordingBody,
        host: FakeHost,
        channel: EventChannel,
        coins: Arc<Mutex<Vec<u32>>>,
    }

    impl Rig {
        fn new() -> Self {
            let channel = EventChannel::new();
            let coins = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&coins);
            channel.subscribe(Topic::CoinsChanged, move |v| sink.lock().unwrap().push(v));
            Self {
                resolver: InteractionResolver::new("faune", ResolverTuning::default()),
                health: CombatantHealth::new(3),
                body: RecordingBody {
                    position: Vec2::new(10.0, 20.0),
                    ..Default::default()
                },
                host: FakeHost::new(3),
                channel,
                coins,
            }
        }

        fn tick(&mut self, keys: &[Key]) -> TickOutcome {
            self.tick_with(ControlInput::holding(keys))
        }

        fn tick_with(&mut self, input: ControlInput) -> TickOutcome {
            self.resolver.update(
                &input,
                &self.health,
                &mut self.body,
                &mut self.host,
                &self.channel,
            )
        }
    }

    #[test]
    fn fresh_press_throws_one_knife_along_facing() {
        let mut rig = Rig::new();
        let outcome = rig.tick(&[Key::Action]);
        assert!(matches!(outcome, TickOutcome::Launched(_)));
        assert_eq!(rig.host.launches.len(), 1);
        let (origin, velocity) = rig.host.launches[0];
        assert_eq!(velocity, Vec2::new(0.0, -300.0));
        assert_eq!(velocity.length(), 300.0);
        assert_eq!(origin, Vec2::new(10.0, 4.0));
        assert_eq!(rig.host.pool.active_count(), 1);
    }

    #[test]
    fn held_action_fires_once() {
        let mut rig = Rig::new();
        rig.tick(&[Key::Action]);
        // Host still reports the press as new on the second tick.
        assert_eq!(rig.tick(&[Key::Action]), TickOutcome::Idle);
        let held = ControlInput {
            action_held: true,
            ..Default::default()
        };
        rig.tick_with(held);
        assert_eq!(rig.host.launches.len(), 1);

        rig.tick(&[]);
        assert!(matches!(rig.tick(&[Key::Action]), TickOutcome::Launched(_)));
    }

    #[test]
    fn held_key_fires_even_when_the_edge_was_missed() {
        let mut rig = Rig::new();
        let held = ControlInput {
            action_held: true,
            ..Default::default()
        };
        assert!(matches!(rig.tick_with(held), TickOutcome::Launched(_)));
        assert_eq!(rig.tick_with(held), TickOutcome::Idle);
        assert_eq!(rig.host.launches.len(), 1);
    }

    #[test]
    fn tap_released_before_the_tick_fires() {
        let mut rig = Rig::new();
        let tap = ControlInput {
            action_pressed: true,
            action_released: true,
            ..Default::default()
        };
        assert!(matches!(rig.tick_with(tap), TickOutcome::Launched(_)));
        assert!(matches!(rig.tick_with(tap), TickOutcome::Launched(_)));
        assert_eq!(rig.host.launches.len(), 2);
    }

    #[test]
    fn release_and_press_between_ticks_fires_again() {
        let mut rig = Rig::new();
        rig.tick(&[Key::Action]);
        let repressed = ControlInput {
            action_held: true,
            action_pressed: true,
            action_released: true,
            ..Default::default()
        };
        assert!(matches!(rig.tick_with(repressed), TickOutcome::Launched(_)));
        assert_eq!(rig.host.launches.len(), 2);
    }

    #[test]
    fn exhausted_pool_skips_the_throw() {
        let mut rig = Rig::new();
        rig.host = FakeHost::new(0);
        assert_eq!(rig.tick(&[Key::Action]), TickOutcome::ActionSkipped);
        assert!(rig.host.launches.is_empty());
    }

    #[test]
    fn action_opens_attached_container_and_publishes_total() {
        let mut rig = Rig::new();
        let chest = Entity::from_raw(40);
        rig.resolver.attach_target(chest);
        assert_eq!(
            rig.tick(&[Key::Action]),
            TickOutcome::OpenedContainer {
                yielded: 120,
                total: 120
            }
        );
        rig.tick(&[]);
        rig.tick(&[Key::Action]);
        assert_eq!(*rig.coins.lock().unwrap(), vec![120, 120]);
        assert!(rig.host.launches.is_empty());
        assert_eq!(rig.resolver.coins(), 120);
    }

    #[test]
    fn movement_detaches_target() {
        let mut rig = Rig::new();
        rig.resolver.attach_target(Entity::from_raw(40));
        assert_eq!(rig.tick(&[Key::Up]), TickOutcome::Moved(Direction::Up));
        assert_eq!(rig.resolver.target(), None);
        rig.tick(&[]);
        assert!(matches!(rig.tick(&[Key::Action]), TickOutcome::Launched(_)));
        assert!(rig.host.opened.is_empty());
        assert!(rig.coins.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_container_is_a_no_op() {
        let mut rig = Rig::new();
        rig.resolver.attach_target(Entity::from_raw(99));
        assert_eq!(rig.tick(&[Key::Action]), TickOutcome::ActionSkipped);
        assert_eq!(rig.resolver.target(), None);
        assert!(rig.coins.lock().unwrap().is_empty());
    }

    #[test]
    fn direction_priority_is_left_right_up_down() {
        let mut rig = Rig::new();
        assert_eq!(
            rig.tick(&[Key::Down, Key::Up, Key::Right, Key::Left]),
            TickOutcome::Moved(Direction::Left)
        );
        assert_eq!(rig.body.velocity, Vec2::new(-100.0, 0.0));
        assert!(rig.body.facing.mirrored);
        assert_eq!(
            rig.tick(&[Key::Down, Key::Up, Key::Right]),
            TickOutcome::Moved(Direction::Right)
        );
        assert_eq!(rig.tick(&[Key::Down, Key::Up]), TickOutcome::Moved(Direction::Up));
        assert_eq!(rig.tick(&[Key::Down]), TickOutcome::Moved(Direction::Down));
    }

    #[test]
    fn idle_plays_clip_for_last_axis() {
        let mut rig = Rig::new();
        rig.tick(&[Key::Right]);
        rig.tick(&[Key::Right]);
        assert_eq!(rig.tick(&[]), TickOutcome::Idle);
        assert_eq!(rig.body.velocity, Vec2::ZERO);
        let names: Vec<String> = rig.body.clips.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["faune-run-side", "faune-idle-side"]);
        assert_eq!(rig.resolver.facing().axis, Axis::Side);
    }

    #[test]
    fn action_and_movement_are_exclusive_within_a_tick() {
        let mut rig = Rig::new();
        assert!(matches!(
            rig.tick(&[Key::Action, Key::Left]),
            TickOutcome::Launched(_)
        ));
        assert_eq!(rig.body.velocity, Vec2::ZERO);
    }

    #[test]
    fn input_is_ignored_while_locked_out() {
        let mut rig = Rig::new();
        rig.health.apply_damage(Vec2::X * 200.0, &mut rig.body, &rig.channel);
        assert_eq!(rig.tick(&[Key::Action, Key::Left]), TickOutcome::Suppressed);
        assert_eq!(rig.body.velocity, Vec2::X * 200.0);
        assert!(rig.host.launches.is_empty());

        // The press happened during the lockout, so it never fires.
        rig.health.advance(std::time::Duration::from_millis(250), &mut rig.body);
        assert_eq!(rig.tick(&[Key::Action]), TickOutcome::Idle);
        assert!(rig.host.launches.is_empty());
    }

    #[test]
    fn incapacitated_blocks_movement_forever() {
        let mut rig = Rig::new();
        for _ in 0..3 {
            rig.health.apply_damage(Vec2::X, &mut rig.body, &rig.channel);
            rig.health.advance(std::time::Duration::from_millis(300), &mut rig.body);
        }
        assert!(rig.health.is_incapacitated());
        for keys in [&[Key::Left][..], &[Key::Action][..], &[][..]] {
            assert_eq!(rig.tick(keys), TickOutcome::Suppressed);
        }
        assert_eq!(rig.body.velocity, Vec2::ZERO);
    }
}
