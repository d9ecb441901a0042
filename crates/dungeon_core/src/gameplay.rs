use bevy::input::{ButtonInput, InputSystem};
use bevy::prelude::*;
use bevy::time::{Fixed, Time};
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};
use std::ops::RangeInclusive;

use crate::combat::{self, ContactHandlers};
use crate::config::GameConfig;
use crate::events::EventChannel;
use crate::health::CombatantHealth;
use crate::input::{buffer_action_presses, ActionPresses, ControlInput, KeyBindings};
use crate::interaction::{ActionHost, InteractionResolver, TickOutcome};
use crate::motion::{Axis, Clip, Direction};
use crate::physics::{integrate_bodies, penetration, BodyKind, Collider, Contact, Velocity};
use crate::pool::{Pool, SlotHandle};
use crate::sprite_body::{ClipPlayer, PooledBody, SpriteBody, SpriteRig};
use crate::wander::WanderAi;

const DEFAULT_SEED: u64 = 42;
const DEFAULT_FIXED_DELTA: f64 = 1.0 / 60.0;
pub const PLAYER_KIND: &str = "faune";

const FLOOR_COLOR: Color = Color::srgb(0.12, 0.1, 0.14);
const WALL_COLOR: Color = Color::srgb(0.32, 0.28, 0.36);
const PLAYER_COLOR: Color = Color::srgb(0.86, 0.93, 1.0);
const ENEMY_COLOR: Color = Color::srgb(0.35, 0.8, 0.35);
const KNIFE_COLOR: Color = Color::srgb(0.85, 0.85, 0.9);
const CHEST_COLOR: Color = Color::srgb(0.7, 0.45, 0.15);
const CHEST_OPEN_COLOR: Color = Color::srgb(0.94, 0.76, 0.16);

/// Player, enemies, chests and knives driven on the fixed timestep.
/// Resources already present in the app (config, seed, channel) are kept,
/// so tests and tools can preconfigure them.
pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<SimulationParams>() {
            app.insert_resource(SimulationParams::from_env());
        }
        if !app.world().contains_resource::<GameConfig>() {
            app.insert_resource(GameConfig::default());
        }
        if !app.world().contains_resource::<KeyBindings>() {
            app.insert_resource(KeyBindings::default());
        }
        if !app.world().contains_resource::<EventChannel>() {
            app.insert_resource(EventChannel::new());
        }
        if app
            .world()
            .get_resource::<ButtonInput<KeyCode>>()
            .is_none()
        {
            app.world_mut()
                .insert_resource(ButtonInput::<KeyCode>::default());
        }

        app.init_resource::<SimulationRng>()
            .init_resource::<ContactHandlers>()
            .init_resource::<ActionPresses>()
            .add_event::<Contact>()
            .configure_sets(
                Last,
                (ChannelTeardown::ReleaseSubscribers, ChannelTeardown::Close).chain(),
            )
            .add_systems(
                Startup,
                (
                    configure_fixed_time,
                    spawn_arena,
                    spawn_player,
                    spawn_enemies,
                    spawn_chests,
                    spawn_projectiles,
                )
                    .chain(),
            )
            .add_systems(PreUpdate, buffer_action_presses.after(InputSystem))
            .add_systems(
                FixedUpdate,
                (
                    // Recoil must age before input is read in the same tick.
                    advance_recoil,
                    drive_player,
                    drive_wanderers,
                    integrate_bodies,
                    resolve_player_contacts,
                    resolve_projectile_hits,
                    retarget_on_collision,
                )
                    .chain(),
            )
            .add_systems(Last, close_event_channel.in_set(ChannelTeardown::Close));
    }
}

/// Exit ordering: subscribers let go of the channel before it closes.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelTeardown {
    ReleaseSubscribers,
    Close,
}

#[derive(Resource, Clone, Debug)]
pub struct SimulationParams {
    pub seed: u64,
    pub fixed_delta: f64,
}

impl SimulationParams {
    pub fn from_env() -> Self {
        let seed = std::env::var("SIMULATION_SEED")
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(DEFAULT_SEED);
        let fixed_delta = std::env::var("SIMULATION_FIXED_DT")
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(DEFAULT_FIXED_DELTA);
        Self { seed, fixed_delta }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            fixed_delta: DEFAULT_FIXED_DELTA,
        }
    }
}

/// Seeded RNG shared by every gameplay roll so runs replay exactly.
#[derive(Resource, Debug)]
pub struct SimulationRng {
    seed: u64,
    rng: StdRng,
}

impl SimulationRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn gen_range(&mut self, range: RangeInclusive<u32>) -> u32 {
        self.rng.gen_range(range)
    }
}

impl RngCore for SimulationRng {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

impl FromWorld for SimulationRng {
    fn from_world(world: &mut World) -> Self {
        let seed = world
            .get_resource::<SimulationParams>()
            .cloned()
            .unwrap_or_default()
            .seed;
        Self::new(seed)
    }
}

#[derive(Component, Debug)]
pub struct Player;

#[derive(Component, Debug)]
pub struct Enemy;

#[derive(Component, Debug)]
pub struct Projectile;

#[derive(Component, Debug)]
pub struct Wall;

#[derive(Component, Debug, Clone)]
pub struct Chest {
    coins: u32,
    opened: bool,
}

impl Chest {
    pub fn new(coins: u32) -> Self {
        Self {
            coins,
            opened: false,
        }
    }

    /// Coins on the first open, nothing afterwards.
    pub fn open(&mut self) -> u32 {
        if self.opened {
            return 0;
        }
        self.opened = true;
        self.coins
    }

    pub fn is_opened(&self) -> bool {
        self.opened
    }
}

#[derive(Resource, Debug, Deref, DerefMut)]
pub struct ProjectilePool(pub Pool<Entity>);

#[derive(Resource, Debug, Deref, DerefMut)]
pub struct EnemyPool(pub Pool<Entity>);

/// Takes the lowest free enemy slot and wakes it at `position`. Returns
/// `None` when every enemy is already out.
pub fn activate_enemy(world: &mut World, position: Vec2) -> Option<Entity> {
    let entity = {
        let mut pool = world.get_resource_mut::<EnemyPool>()?;
        let (_, entity) = pool.acquire()?;
        *entity
    };
    let mut enemies = world.query_filtered::<(&mut WanderAi, PooledBody), With<Enemy>>();
    let (mut wander, mut body) = enemies.get_mut(world, entity).ok()?;
    wander.resume();
    body.activate(position, Vec2::ZERO);
    info!(target: "dungeon_core.gameplay", enemy = ?entity, "enemy taken from pool");
    Some(entity)
}

fn configure_fixed_time(mut fixed_time: ResMut<Time<Fixed>>, params: Res<SimulationParams>) {
    fixed_time.set_timestep_seconds(params.fixed_delta);
}

fn spawn_arena(mut commands: Commands, config: Res<GameConfig>) {
    let [width, height] = config.arena.size;
    let thickness = config.arena.wall_thickness;

    commands.spawn((
        Sprite {
            color: FLOOR_COLOR,
            custom_size: Some(Vec2::new(width, height)),
            ..default()
        },
        Transform::from_xyz(0.0, 0.0, -0.5),
    ));

    let horizontal = Vec2::new(width + thickness * 2.0, thickness);
    let vertical = Vec2::new(thickness, height);
    let walls = [
        (Vec2::new(0.0, (height + thickness) * 0.5), horizontal),
        (Vec2::new(0.0, -(height + thickness) * 0.5), horizontal),
        (Vec2::new(-(width + thickness) * 0.5, 0.0), vertical),
        (Vec2::new((width + thickness) * 0.5, 0.0), vertical),
    ];
    for (position, size) in walls {
        commands.spawn((
            Wall,
            Sprite {
                color: WALL_COLOR,
                custom_size: Some(size),
                ..default()
            },
            Transform::from_xyz(position.x, position.y, 0.0),
            Velocity::default(),
            Collider::new(BodyKind::Wall, size),
        ));
    }
}

fn spawn_player(mut commands: Commands, config: Res<GameConfig>) {
    let cfg = &config.player;
    let size = Vec2::from(cfg.size);
    let mut collider = Collider::new(BodyKind::Player, size);
    collider.offset.x = cfg.hitbox_offset_x;

    commands.spawn((
        Player,
        CombatantHealth::with_recoil(cfg.max_hit_points, config.recoil_duration()),
        InteractionResolver::new(PLAYER_KIND, config.resolver_tuning()),
        Sprite {
            color: PLAYER_COLOR,
            custom_size: Some(size),
            ..default()
        },
        Transform::from_xyz(cfg.spawn[0], cfg.spawn[1], 1.0),
        Velocity::default(),
        ClipPlayer::new(Clip::idle(PLAYER_KIND, Axis::Down)),
        collider,
        SpriteRig {
            base_color: PLAYER_COLOR,
            hitbox_offset_x: cfg.hitbox_offset_x,
            mirrored_hitbox_offset_x: cfg.mirrored_hitbox_offset_x,
        },
    ));
    info!(target: "dungeon_core.gameplay", hit_points = cfg.max_hit_points, "player spawned");
}

fn spawn_enemies(mut commands: Commands, config: Res<GameConfig>) {
    let cfg = &config.enemy;
    let size = Vec2::from(cfg.size);
    let interval = config.retarget_interval();

    let mut pool = Pool::from_fn(cfg.pool_capacity, |idx| {
        let entity = commands.spawn_empty().id();
        let mut wander = WanderAi::new(entity, Direction::Right, interval);
        let mut collider = Collider::new(BodyKind::Enemy, size);
        let (position, visibility) = match cfg.spawn_points.get(idx) {
            Some(point) => (Vec2::from(*point), Visibility::Inherited),
            None => {
                wander.suspend();
                collider.enabled = false;
                (Vec2::ZERO, Visibility::Hidden)
            }
        };
        commands.entity(entity).insert((
            Enemy,
            wander,
            Sprite {
                color: ENEMY_COLOR,
                custom_size: Some(size),
                ..default()
            },
            Transform::from_xyz(position.x, position.y, 0.9),
            visibility,
            Velocity::default(),
            collider,
        ));
        entity
    });
    for _ in &cfg.spawn_points {
        pool.acquire();
    }
    info!(
        target: "dungeon_core.gameplay",
        active = pool.active_count(),
        capacity = pool.capacity(),
        "enemy pool ready"
    );
    commands.insert_resource(EnemyPool(pool));
}

fn spawn_chests(mut commands: Commands, config: Res<GameConfig>, mut rng: ResMut<SimulationRng>) {
    let size = Vec2::from(config.chest.size);
    for point in &config.chest.positions {
        let coins = rng.gen_range(config.chest.coin_range());
        commands.spawn((
            Chest::new(coins),
            Sprite {
                color: CHEST_COLOR,
                custom_size: Some(size),
                ..default()
            },
            Transform::from_xyz(point[0], point[1], 0.5),
            Velocity::default(),
            Collider::new(BodyKind::Chest, size),
        ));
    }
}

fn spawn_projectiles(mut commands: Commands, config: Res<GameConfig>) {
    let size = Vec2::from(config.projectile.size);
    let pool = Pool::from_fn(config.projectile.pool_capacity, |_| {
        commands
            .spawn((
                Projectile,
                Sprite {
                    color: KNIFE_COLOR,
                    custom_size: Some(size),
                    ..default()
                },
                Transform::from_xyz(0.0, 0.0, 1.1),
                Visibility::Hidden,
                Velocity::default(),
                Collider::new(BodyKind::Projectile, size).disabled(),
            ))
            .id()
    });
    commands.insert_resource(ProjectilePool(pool));
}

fn advance_recoil(
    time: Res<Time>,
    mut players: Query<(&mut CombatantHealth, SpriteBody), With<Player>>,
) {
    for (mut health, mut body) in &mut players {
        health.advance(time.delta(), &mut body);
    }
}

type ChestQuery<'w, 's> = Query<'w, 's, (&'static mut Chest, &'static mut Sprite), Without<Player>>;
type KnifeQuery<'w, 's> = Query<'w, 's, PooledBody, (With<Projectile>, Without<Player>)>;

/// Chest and knife-pool access handed to the player's resolver.
struct ActionWorld<'a, 'cw, 'cs, 'kw, 'ks> {
    chests: &'a mut ChestQuery<'cw, 'cs>,
    knives: &'a mut KnifeQuery<'kw, 'ks>,
    pool: &'a mut ProjectilePool,
}

impl ActionHost for ActionWorld<'_, '_, '_, '_, '_> {
    fn open_container(&mut self, target: Entity) -> Option<u32> {
        let (mut chest, mut sprite) = self.chests.get_mut(target).ok()?;
        let yielded = chest.open();
        sprite.color = CHEST_OPEN_COLOR;
        Some(yielded)
    }

    fn launch_projectile(&mut self, origin: Vec2, velocity: Vec2) -> Option<SlotHandle> {
        let (slot, entity) = self.pool.acquire()?;
        let entity = *entity;
        let Ok(mut knife) = self.knives.get_mut(entity) else {
            self.pool.release(slot);
            return None;
        };
        knife.activate(origin, velocity);
        knife.transform.rotation = Quat::from_rotation_z(velocity.y.atan2(velocity.x));
        Some(slot)
    }
}

fn drive_player(
    keys: Res<ButtonInput<KeyCode>>,
    bindings: Res<KeyBindings>,
    mut presses: ResMut<ActionPresses>,
    channel: Res<EventChannel>,
    mut pool: ResMut<ProjectilePool>,
    mut players: Query<(&CombatantHealth, &mut InteractionResolver, SpriteBody), With<Player>>,
    mut chests: ChestQuery,
    mut knives: KnifeQuery,
) {
    let input = ControlInput::read(&keys, &bindings, presses.take());
    let Ok((health, mut resolver, mut body)) = players.get_single_mut() else {
        return;
    };
    let mut host = ActionWorld {
        chests: &mut chests,
        knives: &mut knives,
        pool: &mut pool,
    };
    match resolver.update(&input, health, &mut body, &mut host, &channel) {
        TickOutcome::Launched(slot) => {
            debug!(target: "dungeon_core.gameplay", %slot, "knife thrown");
        }
        TickOutcome::OpenedContainer { yielded, total } => {
            info!(target: "dungeon_core.gameplay", yielded, total, "chest opened");
        }
        _ => {}
    }
}

fn drive_wanderers(
    time: Res<Time>,
    config: Res<GameConfig>,
    mut rng: ResMut<SimulationRng>,
    mut enemies: Query<(&mut WanderAi, &mut Velocity, &Collider), With<Enemy>>,
) {
    for (mut wander, mut velocity, collider) in &mut enemies {
        if !collider.enabled {
            continue;
        }
        wander.tick(time.delta(), &mut *rng);
        velocity.0 = wander.current_velocity(config.enemy.speed);
    }
}

fn resolve_player_contacts(
    mut contacts: EventReader<Contact>,
    config: Res<GameConfig>,
    channel: Res<EventChannel>,
    mut handlers: ResMut<ContactHandlers>,
    mut players: Query<(&mut CombatantHealth, &mut InteractionResolver, SpriteBody), With<Player>>,
    enemies: Query<(&Transform, &Collider), (With<Enemy>, Without<Player>)>,
) {
    for contact in contacts.read() {
        if let Some((player, chest)) = contact.between(BodyKind::Player, BodyKind::Chest) {
            if let Ok((_, mut resolver, _)) = players.get_mut(player) {
                resolver.attach_target(chest);
            }
            continue;
        }
        let Some((player, enemy)) = contact.between(BodyKind::Player, BodyKind::Enemy) else {
            continue;
        };
        let Ok((mut health, _, mut body)) = players.get_mut(player) else {
            continue;
        };
        let Ok((enemy_transform, enemy_collider)) = enemies.get(enemy) else {
            continue;
        };
        let enemy_position = enemy_transform.translation.truncate();

        combat::on_enemy_contact(
            &mut handlers,
            &mut health,
            &mut body,
            enemy_position,
            config.player.knockback,
            &channel,
        );

        // Separation stays attached after defeat.
        let player_box = body.collider.aabb(body.transform.translation.truncate());
        if let Some(push) = penetration(player_box, enemy_collider.aabb(enemy_position)) {
            body.transform.translation += push.extend(0.0);
        }
    }
}

fn resolve_projectile_hits(
    mut contacts: EventReader<Contact>,
    mut knife_pool: ResMut<ProjectilePool>,
    mut enemy_pool: ResMut<EnemyPool>,
    mut knives: Query<PooledBody, (With<Projectile>, Without<Enemy>)>,
    mut enemies: Query<(&mut WanderAi, PooledBody), (With<Enemy>, Without<Projectile>)>,
) {
    for contact in contacts.read() {
        let (knife, other, other_kind) = if contact.moving_kind == BodyKind::Projectile {
            (contact.moving, contact.other, contact.other_kind)
        } else if contact.other_kind == BodyKind::Projectile {
            (contact.other, contact.moving, contact.moving_kind)
        } else {
            continue;
        };
        if !matches!(
            other_kind,
            BodyKind::Wall | BodyKind::Chest | BodyKind::Enemy
        ) {
            continue;
        }

        // A knife touching two things in one tick is only recycled once.
        let Some(slot) = knife_pool.handle_of(&knife) else {
            continue;
        };
        if !knife_pool.release(slot) {
            continue;
        }
        if let Ok(mut body) = knives.get_mut(knife) {
            body.deactivate();
        }

        if other_kind != BodyKind::Enemy {
            continue;
        }
        let Some(enemy_slot) = enemy_pool.handle_of(&other) else {
            continue;
        };
        if !enemy_pool.release(enemy_slot) {
            continue;
        }
        if let Ok((mut wander, mut body)) = enemies.get_mut(other) {
            wander.suspend();
            body.deactivate();
        }
        info!(target: "dungeon_core.gameplay", enemy = ?other, "enemy returned to pool");
    }
}

fn retarget_on_collision(
    mut contacts: EventReader<Contact>,
    mut rng: ResMut<SimulationRng>,
    mut wanderers: Query<&mut WanderAi>,
) {
    for contact in contacts.read() {
        if contact.moving_kind != BodyKind::Enemy || !contact.other_kind.is_static() {
            continue;
        }
        // Every wanderer hears every contact and filters on its own body.
        for mut wander in &mut wanderers {
            wander.on_obstacle_collision(contact.moving, contact.other, &mut *rng);
        }
    }
}

fn close_event_channel(mut exits: EventReader<AppExit>, channel: Res<EventChannel>) {
    if exits.read().last().is_none() {
        return;
    }
    let leaked = channel.shutdown();
    if leaked > 0 {
        warn!(target: "dungeon_core.gameplay", leaked, "event channel closed with live subscribers");
    } else {
        info!(target: "dungeon_core.gameplay", "event channel closed");
    }
}
