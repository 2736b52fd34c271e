//! Projectiles fired by engaged ships, and the explosions left behind.

use serde::{Deserialize, Serialize};

use crate::ids::{OperatorId, ProjectileId, ShipId};
use crate::math::Vec2;
use crate::time::Millis;

/// A shot in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Identifier.
    pub id: ProjectileId,
    /// Operator of the firing ship.
    pub owner: OperatorId,
    /// Firing ship.
    pub origin: ShipId,
    /// Ship aimed at.
    pub target: ShipId,
    /// Current position.
    pub position: Vec2,
    /// Displacement per tick.
    pub velocity: Vec2,
    /// Distance covered so far.
    pub traveled: f64,
    /// Distance after which it fizzles.
    pub max_range: f64,
    /// Damage on hit.
    pub damage: f64,
}

impl Projectile {
    /// Aim a projectile from `from` at `at`.
    #[must_use]
    pub fn aimed(
        id: ProjectileId,
        owner: OperatorId,
        origin: ShipId,
        target: ShipId,
        from: Vec2,
        at: Vec2,
        speed: f64,
        max_range: f64,
        damage: f64,
    ) -> Self {
        Self {
            id,
            owner,
            origin,
            target,
            position: from,
            velocity: (at - from).normalize() * speed,
            traveled: 0.0,
            max_range,
            damage,
        }
    }

    /// Move one tick.
    pub fn advance(&mut self) {
        self.position += self.velocity;
        self.traveled += self.velocity.length();
    }

    /// Out of range.
    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.traveled > self.max_range
    }

    /// Whether a ship at `position` is hit, using `radius` as the
    /// collision radius.
    #[must_use]
    pub fn hits(&self, position: Vec2, radius: f64) -> bool {
        self.position.distance(position) <= radius
    }
}

/// A short-lived visual burst where a ship died.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Explosion {
    /// Center.
    pub position: Vec2,
    /// Radius at full size.
    pub radius: f64,
    /// Start time.
    pub started: Millis,
    /// Lifetime.
    pub duration_ms: Millis,
}

impl Explosion {
    /// Done playing.
    #[must_use]
    pub fn is_finished(&self, now: Millis) -> bool {
        now.saturating_sub(self.started) >= self.duration_ms
    }

    /// Playback progress in `[0, 1]`.
    #[must_use]
    pub fn progress(&self, now: Millis) -> f64 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        (now.saturating_sub(self.started) as f64 / self.duration_ms as f64).min(1.0)
    }
}
