//! Top-down dungeon gameplay: a knife-throwing player, wandering lizards,
//! coin chests and the event channel that keeps the HUD in sync.
//!
//! The gameplay rules live in engine-free modules ([`health`], [`wander`],
//! [`interaction`], [`events`], [`pool`]) that act on a [`body::Body`]. The
//! bevy plugins wire those rules to sprites, colliders and the fixed
//! timestep.

pub mod body;
pub mod combat;
pub mod config;
pub mod diagnostics;
pub mod events;
pub mod gameplay;
pub mod health;
pub mod input;
pub mod interaction;
pub mod motion;
pub mod physics;
pub mod pool;
pub mod sprite_body;
pub mod ui;
pub mod wander;

use bevy::prelude::*;

pub use config::{ConfigError, GameConfig};
pub use events::{EventChannel, Subscription, Topic};
pub use gameplay::{GameplayPlugin, SimulationParams};

/// Everything the playable build needs on top of `DefaultPlugins`.
pub struct CoreGamePlugin;

impl Plugin for CoreGamePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            gameplay::GameplayPlugin,
            ui::UiPlugin,
            diagnostics::DiagnosticsPlugin,
        ));
    }
}
