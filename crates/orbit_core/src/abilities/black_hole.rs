//! Black hole: a timed, positioned vortex that grinds down nearby enemy
//! planets.

use serde::{Deserialize, Serialize};

use crate::ids::OperatorId;
use crate::math::Vec2;
use crate::time::Millis;

/// Largest event horizon any black hole can reach.
pub const MAX_EVENT_HORIZON: f64 = 150.0;

/// Extra gap between the anchor planet's surface and the horizon.
pub const PLACEMENT_GAP: f64 = 30.0;

/// Rotation added per update, for the renderer.
pub const ROTATION_STEP: f64 = 0.1;

/// One black hole instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackHole {
    /// Caster.
    pub owner: OperatorId,
    /// Center.
    pub position: Vec2,
    /// Event horizon diameter.
    pub event_horizon: f64,
    /// Ability power.
    pub power: u32,
    /// Visual rotation.
    pub rotation: f64,
    /// Activation time.
    pub started: Millis,
    /// Expiry time.
    pub expires: Millis,
}

impl BlackHole {
    /// Create a black hole at `position`.
    #[must_use]
    pub fn new(owner: OperatorId, position: Vec2, power: u32, now: Millis, duration: Millis) -> Self {
        Self {
            owner,
            position,
            event_horizon: f64::from(power).min(MAX_EVENT_HORIZON),
            power,
            rotation: 0.0,
            started: now,
            expires: now + duration,
        }
    }

    /// Event horizon for a given power, without building an instance.
    #[must_use]
    pub fn horizon_for(power: u32) -> f64 {
        f64::from(power).min(MAX_EVENT_HORIZON)
    }

    /// Where to put a black hole next to a planet of `planet_radius`,
    /// at `angle` around it.
    #[must_use]
    pub fn placement_near(planet: Vec2, planet_radius: f64, power: u32, angle: f64) -> Vec2 {
        let distance = planet_radius + Self::horizon_for(power) / 2.0 + PLACEMENT_GAP;
        planet + Vec2::from_angle(angle, distance)
    }

    /// Still active at `now`.
    #[must_use]
    pub fn is_active(&self, now: Millis) -> bool {
        now < self.expires
    }

    /// Radius inside which planets take damage.
    #[must_use]
    pub fn damage_radius(&self) -> f64 {
        self.event_horizon / 2.0
    }

    /// Damage per update to each planet in range.
    #[must_use]
    pub fn damage_per_update(&self) -> f64 {
        (f64::from(self.power) / 10.0).max(10.0)
    }

    /// Whether `point` is inside the damage radius.
    #[must_use]
    pub fn reaches(&self, point: Vec2) -> bool {
        self.position.distance(point) < self.damage_radius()
    }

    /// Spin for one update.
    pub fn advance(&mut self) {
        self.rotation = crate::math::normalize_angle(self.rotation + ROTATION_STEP);
    }
}
