use bevy::prelude::*;
use dungeon_core::{ConfigError, GameConfig};
use std::path::PathBuf;

const CONFIG_ENV: &str = "DUNGEON_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/dungeon.toml";

/// Loads [`GameConfig`] from disk once at startup.
pub struct ConfigSourcePlugin {
    path: PathBuf,
}

impl Default for ConfigSourcePlugin {
    fn default() -> Self {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self { path }
    }
}

impl Plugin for ConfigSourcePlugin {
    fn build(&self, app: &mut App) {
        let source = ConfigSource::resolve(self.path.clone());
        app.insert_resource(source.config.clone())
            .insert_resource(source)
            .add_systems(Startup, log_config_source);
    }
}

#[derive(Resource, Debug)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub config: GameConfig,
    /// Why the file was not used, when defaults were substituted.
    pub fallback: Option<String>,
}

impl ConfigSource {
    fn resolve(path: PathBuf) -> Self {
        match GameConfig::from_path(&path) {
            Ok(config) => Self {
                path,
                config,
                fallback: None,
            },
            Err(err) => Self::with_defaults(path, &err),
        }
    }

    fn with_defaults(path: PathBuf, err: &ConfigError) -> Self {
        Self {
            path,
            config: GameConfig::default(),
            fallback: Some(err.to_string()),
        }
    }
}

fn log_config_source(source: Res<ConfigSource>) {
    match &source.fallback {
        None => info!(
            target: "config",
            "Loaded game config from {}",
            source.path.display()
        ),
        Some(reason) => warn!(
            target: "config",
            "Using default game config ({reason}); set {CONFIG_ENV} to point at a config file",
        ),
    }
}
