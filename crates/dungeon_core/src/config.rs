//! Gameplay tuning loaded from TOML.

use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interaction::ResolverTuning;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{field} must be {expected}")]
    Invalid {
        field: &'static str,
        expected: &'static str,
    },
}

#[derive(Resource, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    pub arena: ArenaConfig,
    pub player: PlayerConfig,
    pub enemy: EnemyConfig,
    pub projectile: ProjectileConfig,
    pub chest: ChestConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArenaConfig {
    /// Inner width and height; walls sit outside this box.
    pub size: [f32; 2],
    pub wall_thickness: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            size: [480.0, 320.0],
            wall_thickness: 16.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerConfig {
    pub spawn: [f32; 2],
    pub max_hit_points: u32,
    pub speed: f32,
    pub recoil_ms: u64,
    pub knockback: f32,
    pub size: [f32; 2],
    /// Horizontal hitbox shift for the unmirrored and mirrored sprite.
    pub hitbox_offset_x: f32,
    pub mirrored_hitbox_offset_x: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            spawn: [0.0, 0.0],
            max_hit_points: 3,
            speed: 100.0,
            recoil_ms: 250,
            knockback: 200.0,
            size: [16.0, 26.0],
            hitbox_offset_x: 1.0,
            mirrored_hitbox_offset_x: -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnemyConfig {
    pub speed: f32,
    pub retarget_ms: u64,
    pub size: [f32; 2],
    pub pool_capacity: usize,
    pub spawn_points: Vec<[f32; 2]>,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            speed: 50.0,
            retarget_ms: 2000,
            size: [16.0, 16.0],
            pool_capacity: 4,
            spawn_points: vec![[-120.0, 60.0], [140.0, -80.0]],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectileConfig {
    pub speed: f32,
    pub spawn_offset: f32,
    pub size: [f32; 2],
    pub pool_capacity: usize,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            speed: 300.0,
            spawn_offset: 16.0,
            size: [6.0, 6.0],
            pool_capacity: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChestConfig {
    pub min_coins: u32,
    pub max_coins: u32,
    pub size: [f32; 2],
    pub positions: Vec<[f32; 2]>,
}

impl Default for ChestConfig {
    fn default() -> Self {
        Self {
            min_coins: 50,
            max_coins: 200,
            size: [16.0, 16.0],
            positions: vec![[96.0, 64.0]],
        }
    }
}

impl ChestConfig {
    pub fn coin_range(&self) -> RangeInclusive<u32> {
        self.min_coins..=self.max_coins
    }
}

impl GameConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        let cfg: GameConfig = toml::from_str(data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (
                self.player.max_hit_points > 0,
                "player.max_hit_points",
                "at least 1",
            ),
            (self.player.speed >= 0.0, "player.speed", "non-negative"),
            (self.enemy.speed >= 0.0, "enemy.speed", "non-negative"),
            (self.enemy.retarget_ms > 0, "enemy.retarget_ms", "positive"),
            (
                self.enemy.pool_capacity >= self.enemy.spawn_points.len(),
                "enemy.pool_capacity",
                "at least the number of spawn points",
            ),
            (self.projectile.speed > 0.0, "projectile.speed", "positive"),
            (
                self.chest.min_coins <= self.chest.max_coins,
                "chest.min_coins",
                "no greater than chest.max_coins",
            ),
            (
                self.arena.size.iter().all(|side| *side > 0.0),
                "arena.size",
                "positive on both axes",
            ),
        ];
        for (ok, field, expected) in checks {
            if !ok {
                return Err(ConfigError::Invalid { field, expected });
            }
        }
        Ok(())
    }

    pub fn recoil_duration(&self) -> Duration {
        Duration::from_millis(self.player.recoil_ms)
    }

    pub fn retarget_interval(&self) -> Duration {
        Duration::from_millis(self.enemy.retarget_ms)
    }

    pub fn resolver_tuning(&self) -> ResolverTuning {
        ResolverTuning {
            move_speed: self.player.speed,
            projectile_speed: self.projectile.speed,
            projectile_offset: self.projectile.spawn_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_tables_keep_defaults() {
        let cfg = GameConfig::from_toml_str(
            r#"
            [player]
            max_hit_points = 5

            [enemy]
            spawn_points = [[0.0, 100.0]]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.player.max_hit_points, 5);
        assert_eq!(cfg.player.recoil_ms, 250);
        assert_eq!(cfg.enemy.spawn_points, vec![[0.0, 100.0]]);
        assert_eq!(cfg.projectile.pool_capacity, 3);
        assert_eq!(cfg.retarget_interval(), Duration::from_secs(2));
    }

    #[test]
    fn rejects_inverted_coin_range() {
        let err = GameConfig::from_toml_str("[chest]\nmin_coins = 10\nmax_coins = 1\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "chest.min_coins",
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = GameConfig::from_toml_str("[player]\nlives = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = GameConfig::from_path(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.toml"));
    }
}
