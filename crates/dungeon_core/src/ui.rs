use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bevy::prelude::*;

use crate::config::GameConfig;
use crate::events::{EventChannel, Subscription, Topic};
use crate::gameplay::ChannelTeardown;

const FULL_HEART: Color = Color::srgb(0.86, 0.16, 0.2);
const EMPTY_HEART: Color = Color::srgb(0.25, 0.22, 0.28);
const HEART_SIZE: f32 = 14.0;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(Color::srgb_u8(5, 6, 16)))
            .add_systems(Startup, spawn_hud)
            .add_systems(Update, redraw_hud)
            .add_systems(
                Last,
                release_hud_binding.in_set(ChannelTeardown::ReleaseSubscribers),
            );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartIcon {
    Full,
    Empty,
}

/// One icon per max hit point; heart `i` is full iff `i < hit_points`.
pub fn heart_icons(hit_points: u32, max_hit_points: u32) -> Vec<HeartIcon> {
    (0..max_hit_points)
        .map(|idx| {
            if idx < hit_points {
                HeartIcon::Full
            } else {
                HeartIcon::Empty
            }
        })
        .collect()
}

/// What the HUD shows. Written from channel callbacks, read by the redraw
/// system.
#[derive(Debug, Clone, PartialEq)]
pub struct HudModel {
    pub hit_points: u32,
    pub max_hit_points: u32,
    pub coins: u32,
    dirty: bool,
}

impl HudModel {
    pub fn new(max_hit_points: u32) -> Self {
        Self {
            hit_points: max_hit_points,
            max_hit_points,
            coins: 0,
            dirty: true,
        }
    }

    pub fn hearts(&self) -> Vec<HeartIcon> {
        heart_icons(self.hit_points, self.max_hit_points)
    }
}

#[derive(Resource)]
pub struct HudBinding {
    model: Arc<Mutex<HudModel>>,
    subscriptions: Vec<Subscription>,
}

impl HudBinding {
    pub fn attach(channel: &EventChannel, max_hit_points: u32) -> Self {
        let model = Arc::new(Mutex::new(HudModel::new(max_hit_points)));

        let health = Arc::clone(&model);
        let on_health = channel.subscribe_scoped(Topic::HealthChanged, move |hit_points| {
            let mut model = lock(&health);
            model.hit_points = hit_points;
            model.dirty = true;
        });
        let coins = Arc::clone(&model);
        let on_coins = channel.subscribe_scoped(Topic::CoinsChanged, move |total| {
            let mut model = lock(&coins);
            model.coins = total;
            model.dirty = true;
        });

        Self {
            model,
            subscriptions: vec![on_health, on_coins],
        }
    }

    pub fn is_attached(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    /// Drops the subscription guards. Returns how many were held.
    pub fn release(&mut self) -> usize {
        let held = self.subscriptions.len();
        self.subscriptions.clear();
        held
    }

    /// Hands out the model if it changed since the last call.
    fn take_dirty(&self) -> Option<HudModel> {
        let mut model = lock(&self.model);
        if !model.dirty {
            return None;
        }
        model.dirty = false;
        Some(model.clone())
    }
}

fn lock(model: &Mutex<HudModel>) -> MutexGuard<'_, HudModel> {
    model.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Component, Debug)]
pub struct HeartSlot(pub u32);

#[derive(Component, Debug)]
pub struct CoinCounter;

fn spawn_hud(mut commands: Commands, config: Res<GameConfig>, channel: Res<EventChannel>) {
    commands.spawn(Camera2d);

    let max_hit_points = config.player.max_hit_points;
    commands
        .spawn(Node {
            position_type: PositionType::Absolute,
            top: Val::Px(16.0),
            left: Val::Px(16.0),
            column_gap: Val::Px(4.0),
            align_items: AlignItems::Center,
            ..default()
        })
        .with_children(|row| {
            for idx in 0..max_hit_points {
                row.spawn((
                    HeartSlot(idx),
                    Node {
                        width: Val::Px(HEART_SIZE),
                        height: Val::Px(HEART_SIZE),
                        ..default()
                    },
                    BackgroundColor(FULL_HEART),
                ));
            }
            row.spawn((
                CoinCounter,
                Text::new("0"),
                TextFont {
                    font_size: 18.0,
                    ..default()
                },
                TextColor(Color::srgb(0.94, 0.76, 0.16)),
                Node {
                    margin: UiRect::left(Val::Px(12.0)),
                    ..default()
                },
            ));
        });

    commands.insert_resource(HudBinding::attach(&channel, max_hit_points));
}

fn redraw_hud(
    binding: Option<Res<HudBinding>>,
    mut hearts: Query<(&HeartSlot, &mut BackgroundColor)>,
    mut counter: Query<&mut Text, With<CoinCounter>>,
) {
    let Some(model) = binding.and_then(|binding| binding.take_dirty()) else {
        return;
    };
    let icons = model.hearts();
    for (slot, mut background) in &mut hearts {
        let full = icons.get(slot.0 as usize) == Some(&HeartIcon::Full);
        background.0 = if full { FULL_HEART } else { EMPTY_HEART };
    }
    if let Ok(mut text) = counter.get_single_mut() {
        model.coins.to_string().clone_into(&mut **text);
    }
}

fn release_hud_binding(mut exits: EventReader<AppExit>, binding: Option<ResMut<HudBinding>>) {
    if exits.read().last().is_none() {
        return;
    }
    if let Some(mut binding) = binding {
        let released = binding.release();
        debug!(target: "dungeon_core.ui", released, "hud subscriptions released");
    }
}
