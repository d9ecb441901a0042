mod config_source;

use bevy::asset::AssetPlugin;
use bevy::prelude::*;
use bevy::window::{PresentMode, Window, WindowPlugin, WindowResolution};
use config_source::ConfigSourcePlugin;
use dungeon_core::CoreGamePlugin;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg_attr(target_arch = "wasm32", wasm_bindgen(start))]
pub fn main() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let mut app = App::new();
    configure_default_plugins(&mut app);
    // The config has to be in place before the gameplay plugin falls back
    // to defaults.
    app.add_plugins(ConfigSourcePlugin::default())
        .add_plugins(CoreGamePlugin);
    app.run();
}

fn configure_default_plugins(app: &mut App) {
    #[cfg(target_arch = "wasm32")]
    let window_plugin = WindowPlugin {
        primary_window: Some(Window {
            canvas: Some("#bevy-canvas".into()),
            fit_canvas_to_parent: true,
            present_mode: PresentMode::AutoVsync,
            ..default()
        }),
        ..default()
    };

    #[cfg(not(target_arch = "wasm32"))]
    let window_plugin = WindowPlugin {
        primary_window: Some(Window {
            title: "Dungeon Crawler".into(),
            present_mode: PresentMode::Fifo,
            resolution: WindowResolution::new(960.0, 640.0),
            resizable: true,
            ..default()
        }),
        ..default()
    };

    let mut plugins = DefaultPlugins
        .set(window_plugin)
        .set(ImagePlugin::default_nearest());

    #[cfg(target_arch = "wasm32")]
    {
        plugins = plugins.set(AssetPlugin {
            file_path: "assets".into(),
            ..default()
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        plugins = plugins.set(AssetPlugin {
            watch_for_changes_override: Some(true),
            ..default()
        });
    }

    app.add_plugins(plugins);
}
