//! Directions, facing and animation clip naming shared by the player and
//! enemies.

use std::fmt;

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Axis-aligned movement direction. +y is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn unit(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::Y,
            Direction::Down => Vec2::NEG_Y,
            Direction::Left => Vec2::NEG_X,
            Direction::Right => Vec2::X,
        }
    }

    /// Uniform pick among the three directions other than `self`.
    pub fn reroll(self, rng: &mut impl Rng) -> Direction {
        let pick = rng.gen_range(0..Self::ALL.len() - 1);
        Self::ALL
            .into_iter()
            .filter(|candidate| *candidate != self)
            .nth(pick)
            .unwrap_or(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Up,
    Down,
    Side,
}

impl Axis {
    pub const fn as_str(self) -> &'static str {
        match self {
            Axis::Up => "up",
            Axis::Down => "down",
            Axis::Side => "side",
        }
    }
}

/// Which way a sprite looks. Stored alongside the animation state instead of
/// being recovered from the clip name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facing {
    pub axis: Axis,
    /// Only meaningful on the side axis: the art faces right, so left is
    /// drawn mirrored.
    pub mirrored: bool,
}

impl Default for Facing {
    fn default() -> Self {
        Self {
            axis: Axis::Down,
            mirrored: false,
        }
    }
}

impl Facing {
    /// Facing after moving in `direction`. Vertical moves keep the current
    /// mirror flag.
    pub fn turned(self, direction: Direction) -> Facing {
        match direction {
            Direction::Up => Facing {
                axis: Axis::Up,
                ..self
            },
            Direction::Down => Facing {
                axis: Axis::Down,
                ..self
            },
            Direction::Left => Facing {
                axis: Axis::Side,
                mirrored: true,
            },
            Direction::Right => Facing {
                axis: Axis::Side,
                mirrored: false,
            },
        }
    }

    pub fn unit(self) -> Vec2 {
        match (self.axis, self.mirrored) {
            (Axis::Up, _) => Vec2::Y,
            (Axis::Down, _) => Vec2::NEG_Y,
            (Axis::Side, true) => Vec2::NEG_X,
            (Axis::Side, false) => Vec2::X,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipAction {
    Idle,
    Run,
    Faint,
}

impl ClipAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            ClipAction::Idle => "idle",
            ClipAction::Run => "run",
            ClipAction::Faint => "faint",
        }
    }
}

/// Animation clip key, rendered as `<kind>-<action>-<axis>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Clip {
    pub kind: &'static str,
    pub action: ClipAction,
    pub axis: Axis,
}

impl Clip {
    pub const fn new(kind: &'static str, action: ClipAction, axis: Axis) -> Self {
        Self { kind, action, axis }
    }

    pub const fn idle(kind: &'static str, axis: Axis) -> Self {
        Self::new(kind, ClipAction::Idle, axis)
    }

    pub const fn run(kind: &'static str, axis: Axis) -> Self {
        Self::new(kind, ClipAction::Run, axis)
    }

    pub const fn faint(kind: &'static str, axis: Axis) -> Self {
        Self::new(kind, ClipAction::Faint, axis)
    }
}

impl fmt::Display for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.kind,
            self.action.as_str(),
            self.axis.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn reroll_never_repeats_previous_direction() {
        let mut rng = StdRng::seed_from_u64(7);
        for prior in Direction::ALL {
            let mut seen = Vec::new();
            for _ in 0..500 {
                let next = prior.reroll(&mut rng);
                assert_ne!(next, prior);
                if !seen.contains(&next) {
                    seen.push(next);
                }
            }
            assert_eq!(seen.len(), 3, "all three alternatives reachable from {prior:?}");
        }
    }

    #[test]
    fn clip_names_follow_kind_action_axis() {
        assert_eq!(Clip::run("faune", Axis::Side).to_string(), "faune-run-side");
        assert_eq!(Clip::idle("faune", Axis::Up).to_string(), "faune-idle-up");
        assert_eq!(Clip::faint("faune", Axis::Down).to_string(), "faune-faint-down");
    }

    #[test]
    fn vertical_turns_keep_mirror_flag() {
        let left = Facing::default().turned(Direction::Left);
        assert_eq!(left.unit(), Vec2::NEG_X);
        let up = left.turned(Direction::Up);
        assert_eq!(up.axis, Axis::Up);
        assert!(up.mirrored);
        assert_eq!(up.unit(), Vec2::Y);
        assert!(!up.turned(Direction::Right).mirrored);
    }
}
