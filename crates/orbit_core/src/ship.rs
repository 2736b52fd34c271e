//! Ships: the fleets planets send at each other.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::ids::{OperatorId, PlanetId, ShipId};
use crate::math::Vec2;
use crate::time::Millis;

/// Where a ship is heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Destination {
    /// A planet, resolved to its position every tick.
    Planet(PlanetId),
    /// A fixed map point.
    Point(Vec2),
}

/// Stats rolled at production time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShipStats {
    /// Distance per tick.
    pub speed: f64,
    /// Starting and max health.
    pub health: f64,
    /// Damage dealt on arrival.
    pub damage: f64,
}

/// One trail sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailPoint {
    /// Where the ship was.
    pub position: Vec2,
    /// When it was there.
    pub time: Millis,
}

/// A ship in flight, in combat, or docked in a planet's reserve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    /// Identifier.
    pub id: ShipId,
    /// Owning operator.
    pub owner: OperatorId,
    /// Planet that produced this ship. Missiles have none.
    pub origin: Option<PlanetId>,
    /// Current destination.
    pub destination: Option<Destination>,
    /// Current position.
    pub position: Vec2,
    /// Distance per tick.
    pub speed: f64,
    /// Current health.
    pub health: f64,
    /// Health at launch.
    pub max_health: f64,
    /// Damage dealt on arrival.
    pub damage: f64,
    /// Facing in radians.
    pub direction: f64,
    /// Missile-type ship from a barrage.
    pub missile: bool,
    /// Held in place by combat.
    pub stationary: bool,
    /// Ship currently being fired at, if engaged.
    pub combat_target: Option<ShipId>,
    trail: VecDeque<TrailPoint>,
}

impl Ship {
    /// Create a ship with no destination yet.
    #[must_use]
    pub fn new(
        id: ShipId,
        owner: OperatorId,
        origin: Option<PlanetId>,
        position: Vec2,
        stats: ShipStats,
    ) -> Self {
        Self {
            id,
            owner,
            origin,
            destination: None,
            position,
            speed: stats.speed,
            health: stats.health,
            max_health: stats.health,
            damage: stats.damage,
            direction: 0.0,
            missile: false,
            stationary: false,
            combat_target: None,
            trail: VecDeque::new(),
        }
    }

    /// Still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Health as a fraction of launch health.
    #[must_use]
    pub fn health_fraction(&self) -> f64 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            (self.health / self.max_health).clamp(0.0, 1.0)
        }
    }

    /// Destination planet, if heading for one.
    #[must_use]
    pub fn destination_planet(&self) -> Option<PlanetId> {
        match self.destination {
            Some(Destination::Planet(id)) => Some(id),
            _ => None,
        }
    }

    /// Whether this ship is inbound toward `planet`.
    #[must_use]
    pub fn is_heading_to(&self, planet: PlanetId) -> bool {
        self.destination_planet() == Some(planet)
    }

    /// Prepare a docked ship to launch again.
    pub fn reset_for_dispatch(&mut self, destination: Destination) {
        self.destination = Some(destination);
        self.stationary = false;
        self.combat_target = None;
        self.trail.clear();
    }

    /// Move up to `speed` toward `target`, turning to face it.
    pub fn step_towards(&mut self, target: Vec2) {
        let delta = target - self.position;
        let distance = delta.length();
        if distance <= 0.1 {
            return;
        }
        self.direction = delta.angle();
        let step = self.speed.min(distance);
        self.position += delta.normalize() * step;
    }

    /// Record the current position and drop stale trail points.
    pub fn record_trail(&mut self, now: Millis, max_points: usize, max_age_ms: Millis) {
        self.trail.push_back(TrailPoint {
            position: self.position,
            time: now,
        });
        while self.trail.len() > max_points {
            self.trail.pop_front();
        }
        while self
            .trail
            .front()
            .is_some_and(|p| now.saturating_sub(p.time) > max_age_ms)
        {
            self.trail.pop_front();
        }
    }

    /// Trail samples, oldest first.
    #[must_use]
    pub fn trail(&self) -> &VecDeque<TrailPoint> {
        &self.trail
    }
}
