//! Hit points and the damage/recoil state machine.

use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::body::{Body, Tint};
use crate::events::{EventChannel, Topic};

pub const RECOIL_DURATION: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    #[default]
    Normal,
    /// Knocked back and invulnerable until the recoil window expires.
    Recoiling,
    /// Terminal.
    Incapacitated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Already recoiling or incapacitated.
    Ignored,
    Recoiling { hit_points: u32 },
    Incapacitated,
}

#[derive(Component, Debug, Clone)]
pub struct CombatantHealth {
    max_hit_points: u32,
    hit_points: u32,
    state: HealthState,
    recoil_elapsed: Duration,
    recoil_duration: Duration,
}

impl CombatantHealth {
    pub fn new(max_hit_points: u32) -> Self {
        Self::with_recoil(max_hit_points, RECOIL_DURATION)
    }

    pub fn with_recoil(max_hit_points: u32, recoil_duration: Duration) -> Self {
        let state = if max_hit_points == 0 {
            HealthState::Incapacitated
        } else {
            HealthState::Normal
        };
        Self {
            max_hit_points,
            hit_points: max_hit_points,
            state,
            recoil_elapsed: Duration::ZERO,
            recoil_duration,
        }
    }

    pub fn current_hit_points(&self) -> u32 {
        self.hit_points
    }

    pub fn max_hit_points(&self) -> u32 {
        self.max_hit_points
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    /// Movement and actions are only honoured in the normal state.
    pub fn accepts_input(&self) -> bool {
        self.state == HealthState::Normal
    }

    pub fn is_incapacitated(&self) -> bool {
        self.state == HealthState::Incapacitated
    }

    /// Takes one hit point and pushes the body along `push`. Publishes the
    /// remaining hit points on [`Topic::HealthChanged`] once the new state
    /// is in place.
    pub fn apply_damage(
        &mut self,
        push: Vec2,
        body: &mut impl Body,
        channel: &EventChannel,
    ) -> DamageOutcome {
        if self.hit_points == 0 || self.state == HealthState::Recoiling {
            debug!(target: "dungeon_core.health", state = ?self.state, "damage ignored");
            return DamageOutcome::Ignored;
        }

        self.hit_points -= 1;
        let outcome = if self.hit_points == 0 {
            self.state = HealthState::Incapacitated;
            body.set_velocity(Vec2::ZERO);
            body.defeated();
            DamageOutcome::Incapacitated
        } else {
            self.state = HealthState::Recoiling;
            self.recoil_elapsed = Duration::ZERO;
            body.set_tint(Tint::Damaged);
            body.set_velocity(push);
            DamageOutcome::Recoiling {
                hit_points: self.hit_points,
            }
        };
        info!(
            target: "dungeon_core.health",
            current = self.hit_points,
            max = self.max_hit_points,
            state = ?self.state,
            "health updated"
        );
        channel.publish(Topic::HealthChanged, self.hit_points);
        outcome
    }

    /// Ages the recoil window. Returns true on the call that ends it.
    pub fn advance(&mut self, delta: Duration, body: &mut impl Body) -> bool {
        if self.state != HealthState::Recoiling {
            return false;
        }
        self.recoil_elapsed += delta;
        if self.recoil_elapsed < self.recoil_duration {
            return false;
        }
        self.state = HealthState::Normal;
        self.recoil_elapsed = Duration::ZERO;
        body.set_tint(Tint::None);
        true
    }
}
