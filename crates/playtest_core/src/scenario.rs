//! Scripted playtest scenarios stored as TOML.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dungeon_core::health::HealthState;
use dungeon_core::input::Key;
use dungeon_core::{ConfigError, GameConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_SEED: u64 = 42;
const DEFAULT_TICK_MS: u64 = 16;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scenario: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("scenario game config: {0}")]
    Game(#[from] ConfigError),
    #[error("scenario `{0}` must run at least one tick")]
    NoTicks(String),
    #[error("tick_ms must be positive")]
    ZeroTickLength,
    #[error("input span {index} ends before it starts ({from_tick} > {to_tick})")]
    InvertedSpan {
        index: usize,
        from_tick: u64,
        to_tick: u64,
    },
    #[error("input span {index} starts at tick {from_tick}, past the last tick {last}")]
    SpanOutOfRange { index: usize, from_tick: u64, last: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub ticks: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub input: Vec<InputSpan>,
    #[serde(default)]
    pub expect: Expectations,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

/// Keys held from `from_tick` through `to_tick`, both inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputSpan {
    pub from_tick: u64,
    pub to_tick: u64,
    pub keys: Vec<Key>,
}

impl InputSpan {
    pub fn covers(&self, tick: u64) -> bool {
        (self.from_tick..=self.to_tick).contains(&tick)
    }
}

/// End-of-run assertions. Unset fields are not checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Expectations {
    pub hit_points: Option<u32>,
    pub health_changes: Option<Vec<u32>>,
    pub coins_at_least: Option<u32>,
    pub active_projectiles: Option<usize>,
    pub player_state: Option<HealthState>,
}

impl Scenario {
    pub fn from_path(path: &Path) -> Result<Self, ScenarioError> {
        let data = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(data: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = toml::from_str(data)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.ticks == 0 {
            return Err(ScenarioError::NoTicks(self.name.clone()));
        }
        if self.tick_ms == 0 {
            return Err(ScenarioError::ZeroTickLength);
        }
        let last = self.ticks - 1;
        for (index, span) in self.input.iter().enumerate() {
            if span.from_tick > span.to_tick {
                return Err(ScenarioError::InvertedSpan {
                    index,
                    from_tick: span.from_tick,
                    to_tick: span.to_tick,
                });
            }
            if span.from_tick > last {
                return Err(ScenarioError::SpanOutOfRange {
                    index,
                    from_tick: span.from_tick,
                    last,
                });
            }
        }
        self.game.validate()?;
        Ok(())
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Union of the keys held by every span covering `tick`.
    pub fn keys_at(&self, tick: u64) -> Vec<Key> {
        let mut keys: Vec<Key> = Vec::new();
        for span in self.input.iter().filter(|span| span.covers(tick)) {
            for key in &span.keys {
                if !keys.contains(key) {
                    keys.push(*key);
                }
            }
        }
        keys
    }
}
