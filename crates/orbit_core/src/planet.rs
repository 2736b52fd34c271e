//! Planets: orbiting, producing, regenerating, changing hands.
//!
//! This module holds the per-planet state and the arithmetic that only
//! needs that state:
//! - elliptical orbit position and depth scaling
//! - the target list with its health-derived cap
//! - damage mitigation and the capture flip
//! - the adjusted spawn interval
//!
//! Anything that needs other entities (owner upgrades, ability effects,
//! spawning ships) lives in the game tick.

use std::collections::VecDeque;
use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::ids::{OperatorId, PlanetId};
use crate::math::{normalize_angle, Vec2};
use crate::ship::Ship;
use crate::time::Millis;

/// Planet specialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanetType {
    /// No modifiers.
    Normal,
    /// Stronger ships, one extra target slot.
    Attack,
    /// Harder to capture, regenerates faster.
    Defence,
    /// Faster ships and production.
    Speed,
}

/// Multipliers a planet type applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanetTypeStats {
    /// Ship damage multiplier.
    pub attack: f64,
    /// Ship health multiplier and incoming damage divisor.
    pub defence: f64,
    /// Ship speed multiplier.
    pub ship_speed: f64,
    /// Production rate multiplier.
    pub production: f64,
    /// Health regeneration multiplier.
    pub regen: f64,
    /// Extra outbound target slots.
    pub extra_targets: u32,
}

impl PlanetType {
    /// All planet types.
    pub const ALL: [Self; 4] = [Self::Normal, Self::Attack, Self::Defence, Self::Speed];

    /// Parameter table entry.
    #[must_use]
    pub const fn stats(self) -> PlanetTypeStats {
        match self {
            Self::Normal => PlanetTypeStats {
                attack: 1.0,
                defence: 1.0,
                ship_speed: 1.0,
                production: 1.0,
                regen: 1.0,
                extra_targets: 0,
            },
            Self::Attack => PlanetTypeStats {
                attack: 1.5,
                defence: 0.8,
                ship_speed: 1.0,
                production: 1.0,
                regen: 1.0,
                extra_targets: 1,
            },
            Self::Defence => PlanetTypeStats {
                attack: 0.8,
                defence: 1.5,
                ship_speed: 0.9,
                production: 0.9,
                regen: 1.5,
                extra_targets: 0,
            },
            Self::Speed => PlanetTypeStats {
                attack: 0.9,
                defence: 0.9,
                ship_speed: 1.5,
                production: 1.3,
                regen: 1.0,
                extra_targets: 0,
            },
        }
    }

    /// Upper-case name, as used by challenge exclusions.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Attack => "ATTACK",
            Self::Defence => "DEFENCE",
            Self::Speed => "SPEED",
        }
    }
}

/// Elliptical orbit around a fixed center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    /// Orbit center.
    pub center: Vec2,
    /// Semi-major axis.
    pub semi_major: f64,
    /// Semi-minor axis.
    pub semi_minor: f64,
    /// Current angle in `[0, 2π)`.
    pub angle: f64,
    /// Radians advanced per tick. Negative orbits run clockwise.
    pub angular_speed: f64,
    /// Swap the axes so the long side is vertical.
    pub vertical: bool,
    /// Depth in `[-1, 1]`; nearer planets draw and collide larger.
    pub z_index: f64,
}

impl Orbit {
    /// A planet that never moves.
    #[must_use]
    pub const fn stationary(position: Vec2) -> Self {
        Self {
            center: position,
            semi_major: 0.0,
            semi_minor: 0.0,
            angle: 0.0,
            angular_speed: 0.0,
            vertical: false,
            z_index: 0.0,
        }
    }

    /// Position at an arbitrary angle on this ellipse.
    #[must_use]
    pub fn position_at(&self, angle: f64) -> Vec2 {
        let (rx, ry) = if self.vertical {
            (self.semi_minor, self.semi_major)
        } else {
            (self.semi_major, self.semi_minor)
        };
        Vec2::new(
            self.center.x + rx * angle.cos(),
            self.center.y + ry * angle.sin(),
        )
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position_at(self.angle)
    }

    /// Advance one tick along the orbit.
    pub fn advance(&mut self) {
        self.angle = normalize_angle(self.angle + self.angular_speed);
    }

    /// Size multiplier derived from depth.
    #[must_use]
    pub fn depth_scale(&self) -> f64 {
        1.0 + self.z_index * 0.3
    }
}

/// Incoming-damage modifiers, applied in declaration order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mitigation {
    /// Owner's shield (player) or debug invincibility.
    pub immune: bool,
    /// Damage fraction kept by an active bot shield, if any.
    pub bot_shield: Option<f64>,
    /// Owner's damage-reduction upgrade in percent.
    pub reduction_percent: f64,
    /// Planet-type defence divisor.
    pub defence: f64,
}

impl Default for Mitigation {
    fn default() -> Self {
        Self {
            immune: false,
            bot_shield: None,
            reduction_percent: 0.0,
            defence: 1.0,
        }
    }
}

/// Attenuate raw enemy damage. Every stage floors, like the damage
/// numbers players see.
#[must_use]
pub fn mitigate_damage(raw: f64, mitigation: &Mitigation) -> f64 {
    if mitigation.immune {
        return 0.0;
    }
    let mut damage = raw.max(0.0);
    if let Some(factor) = mitigation.bot_shield {
        damage = (damage * factor).floor();
    }
    if mitigation.reduction_percent > 0.0 {
        damage = (damage * (1.0 - mitigation.reduction_percent / 100.0)).floor();
    }
    if mitigation.defence > 0.0 {
        damage = (damage / mitigation.defence).floor();
    }
    damage.max(0.0)
}

/// Spawn interval after all production modifiers, floored and clamped
/// to `min_ms`.
#[must_use]
pub fn adjusted_spawn_interval(
    base_ms: f64,
    spawn_speed_multiplier: f64,
    hype_multiplier: f64,
    production_multiplier: f64,
    min_ms: Millis,
) -> Millis {
    let divisor = spawn_speed_multiplier.max(f64::EPSILON)
        * hype_multiplier.max(f64::EPSILON)
        * production_multiplier.max(f64::EPSILON);
    let interval = (base_ms / divisor).floor();
    (interval.max(0.0) as Millis).max(min_ms)
}

/// Result of enemy damage reaching a planet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Health dropped but the owner held.
    Held,
    /// Health reached zero and the planet flipped.
    Captured {
        /// Owner before the flip.
        previous: Option<OperatorId>,
    },
}

/// Result of a same-owner ship arriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealOutcome {
    /// Health went up (clamped at max).
    Healed,
    /// Already at full health; the ship should dock instead.
    Full,
}

/// A planet and everything it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    /// Identifier.
    pub id: PlanetId,
    /// Orbital parameters.
    pub orbit: Orbit,
    /// Cached Cartesian position, refreshed after every orbit step.
    pub position: Vec2,
    /// Specialisation.
    pub planet_type: PlanetType,
    owner: Option<OperatorId>,
    health: f64,
    max_health: f64,
    targets: Vec<PlanetId>,
    max_targets: u32,
    target_index: usize,
    stationed: VecDeque<Ship>,
    /// Time of the last produced ship.
    pub last_spawn: Millis,
    /// Time of the last regeneration step.
    pub last_regen: Millis,
}

impl Planet {
    /// Create a planet at full control of `owner`.
    #[must_use]
    pub fn new(
        id: PlanetId,
        orbit: Orbit,
        planet_type: PlanetType,
        owner: Option<OperatorId>,
        health: f64,
        max_health: f64,
    ) -> Self {
        let mut planet = Self {
            id,
            position: orbit.position(),
            orbit,
            planet_type,
            owner,
            health: 0.0,
            max_health: max_health.max(1.0),
            targets: Vec::new(),
            max_targets: 1,
            target_index: 0,
            stationed: VecDeque::new(),
            last_spawn: 0,
            last_regen: 0,
        };
        planet.set_health(health);
        planet
    }

    /// Current owner, `None` while neutral.
    #[must_use]
    pub const fn owner(&self) -> Option<OperatorId> {
        self.owner
    }

    /// Whether `operator` owns this planet.
    #[must_use]
    pub fn is_owned_by(&self, operator: OperatorId) -> bool {
        self.owner == Some(operator)
    }

    /// Whether this planet belongs to someone other than `operator`.
    /// Neutral planets are not enemies of anyone.
    #[must_use]
    pub fn is_enemy_of(&self, operator: OperatorId) -> bool {
        matches!(self.owner, Some(owner) if owner != operator)
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> f64 {
        self.health
    }

    /// Current effective max health.
    #[must_use]
    pub const fn max_health(&self) -> f64 {
        self.max_health
    }

    /// Health as a fraction of max.
    #[must_use]
    pub fn health_fraction(&self) -> f64 {
        (self.health / self.max_health).clamp(0.0, 1.0)
    }

    /// Set health, clamped to `[0, max]`, and recompute the target cap.
    pub fn set_health(&mut self, health: f64) {
        self.health = if health.is_finite() {
            health.clamp(0.0, self.max_health)
        } else {
            0.0
        };
        self.recompute_max_targets();
    }

    /// Change effective max health (owner upgrades changed).
    pub fn set_max_health(&mut self, max_health: f64) {
        if max_health.is_finite() && max_health >= 1.0 {
            self.max_health = max_health;
        }
        self.set_health(self.health);
    }

    /// Outbound target cap.
    #[must_use]
    pub const fn max_targets(&self) -> u32 {
        self.max_targets
    }

    fn recompute_max_targets(&mut self) {
        let quarter = self.max_health / 4.0;
        let from_health = if quarter > 0.0 {
            (self.health / quarter).floor() as u32
        } else {
            0
        };
        self.max_targets = (from_health + self.planet_type.stats().extra_targets).max(1);
    }

    /// Collision and arrival radius.
    #[must_use]
    pub fn radius(&self, planet_size: f64) -> f64 {
        planet_size * self.orbit.depth_scale() / 2.0
    }

    /// Outbound targets in insertion order.
    #[must_use]
    pub fn targets(&self) -> &[PlanetId] {
        &self.targets
    }

    /// Whether `target` is already an outbound target.
    #[must_use]
    pub fn has_target(&self, target: PlanetId) -> bool {
        self.targets.contains(&target)
    }

    /// Add an outbound target if there is room.
    pub fn add_target(&mut self, target: PlanetId) -> bool {
        if target == self.id
            || self.has_target(target)
            || self.targets.len() >= self.max_targets as usize
        {
            return false;
        }
        self.targets.push(target);
        true
    }

    /// Remove an outbound target.
    pub fn remove_target(&mut self, target: PlanetId) -> bool {
        let before = self.targets.len();
        self.targets.retain(|t| *t != target);
        if self.target_index >= self.targets.len() {
            self.target_index = 0;
        }
        before != self.targets.len()
    }

    /// Next target in round-robin order.
    pub fn next_target(&mut self) -> Option<PlanetId> {
        if self.targets.is_empty() {
            return None;
        }
        let index = self.target_index % self.targets.len();
        self.target_index = (index + 1) % self.targets.len();
        Some(self.targets[index])
    }

    /// Ships held in reserve.
    #[must_use]
    pub fn stationed(&self) -> &VecDeque<Ship> {
        &self.stationed
    }

    /// Put a ship in reserve.
    pub fn station(&mut self, ship: Ship) {
        self.stationed.push_back(ship);
    }

    /// Take the oldest reserve ship.
    pub fn take_stationed(&mut self) -> Option<Ship> {
        self.stationed.pop_front()
    }

    /// Apply already-mitigated enemy damage from `attacker`.
    ///
    /// When health reaches zero or below, the overshoot becomes the new
    /// health and ownership, targets and reserve reset together.
    pub fn apply_damage(&mut self, damage: f64, attacker: OperatorId) -> DamageOutcome {
        if damage <= 0.0 {
            return DamageOutcome::Held;
        }
        let remaining = self.health - damage;
        if remaining > 0.0 {
            self.set_health(remaining);
            return DamageOutcome::Held;
        }

        let previous = self.owner;
        self.owner = Some(attacker);
        self.targets.clear();
        self.target_index = 0;
        self.stationed.clear();
        self.set_health(remaining.abs());
        DamageOutcome::Captured { previous }
    }

    /// Heal from a friendly arrival.
    pub fn heal(&mut self, amount: f64) -> HealOutcome {
        if self.health >= self.max_health {
            return HealOutcome::Full;
        }
        self.set_health(self.health + amount.max(0.0));
        HealOutcome::Healed
    }

    /// Assign a new owner outside of combat (world setup, tests).
    pub fn set_owner(&mut self, owner: Option<OperatorId>) {
        if self.owner != owner {
            self.owner = owner;
            self.targets.clear();
            self.target_index = 0;
            self.stationed.clear();
        }
    }

    /// Advance the orbit and refresh the cached position.
    pub fn advance_orbit(&mut self, frozen: bool) {
        if !frozen {
            self.orbit.advance();
        }
        self.position = self.orbit.position();
    }

    /// Where this planet will be after `ticks` more orbit steps.
    #[must_use]
    pub fn predicted_position(&self, ticks: f64) -> Vec2 {
        let angle = self.orbit.angle + self.orbit.angular_speed * ticks;
        self.orbit.position_at(angle.rem_euclid(TAU))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ship::ShipStats;

    fn planet(health: f64, max: f64, planet_type: PlanetType) -> Planet {
        Planet::new(
            PlanetId(1),
            Orbit::stationary(Vec2::new(100.0, 100.0)),
            planet_type,
            Some(OperatorId(1)),
            health,
            max,
        )
    }

    #[test]
    fn test_capture_flips_overshoot_to_positive_health() {
        let mut p = planet(1000.0, 1000.0, PlanetType::Normal);
        let outcome = p.apply_damage(1200.0, OperatorId::PLAYER);
        assert_eq!(
            outcome,
            DamageOutcome::Captured {
                previous: Some(OperatorId(1))
            }
        );
        assert_eq!(p.owner(), Some(OperatorId::PLAYER));
        assert!((p.health() - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_capture_clears_targets_and_reserve() {
        let mut p = planet(400.0, 1000.0, PlanetType::Normal);
        assert!(p.add_target(PlanetId(2)));
        p.station(Ship::new(
            crate::ids::ShipId(1),
            OperatorId(1),
            Some(p.id),
            p.position,
            ShipStats {
                speed: 1.0,
                health: 10.0,
                damage: 10.0,
            },
        ));
        p.apply_damage(500.0, OperatorId(2));
        assert!(p.targets().is_empty());
        assert!(p.stationed().is_empty());
    }

    #[test]
    fn test_exact_zero_captures() {
        let mut p = planet(500.0, 1000.0, PlanetType::Normal);
        let outcome = p.apply_damage(500.0, OperatorId(3));
        assert!(matches!(outcome, DamageOutcome::Captured { .. }));
        assert!(p.health().abs() < f64::EPSILON);
        assert_eq!(p.max_targets(), 1);
    }

    #[test]
    fn test_huge_overshoot_clamped_to_max() {
        let mut p = planet(10.0, 1000.0, PlanetType::Normal);
        p.apply_damage(5000.0, OperatorId(3));
        assert!((p.health() - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_max_targets_follows_health() {
        let mut p = planet(1000.0, 1000.0, PlanetType::Normal);
        assert_eq!(p.max_targets(), 4);
        p.set_health(499.0);
        assert_eq!(p.max_targets(), 1);
        p.set_health(100.0);
        assert_eq!(p.max_targets(), 1);

        let attack = planet(1000.0, 1000.0, PlanetType::Attack);
        assert_eq!(attack.max_targets(), 5);
    }

    #[test]
    fn test_add_target_rules() {
        let mut p = planet(250.0, 1000.0, PlanetType::Normal);
        assert_eq!(p.max_targets(), 1);
        assert!(!p.add_target(PlanetId(1)), "self-targeting");
        assert!(p.add_target(PlanetId(2)));
        assert!(!p.add_target(PlanetId(2)), "duplicate");
        assert!(!p.add_target(PlanetId(3)), "over cap");
    }

    #[test]
    fn test_round_robin_targets() {
        let mut p = planet(1000.0, 1000.0, PlanetType::Normal);
        p.add_target(PlanetId(2));
        p.add_target(PlanetId(3));
        assert_eq!(p.next_target(), Some(PlanetId(2)));
        assert_eq!(p.next_target(), Some(PlanetId(3)));
        assert_eq!(p.next_target(), Some(PlanetId(2)));
        p.remove_target(PlanetId(2));
        assert_eq!(p.next_target(), Some(PlanetId(3)));
    }

    #[test]
    fn test_heal_reports_full() {
        let mut p = planet(900.0, 1000.0, PlanetType::Normal);
        assert_eq!(p.heal(500.0), HealOutcome::Healed);
        assert!((p.health() - 1000.0).abs() < f64::EPSILON);
        assert_eq!(p.heal(1.0), HealOutcome::Full);
    }

    #[test]
    fn test_mitigation_order() {
        let m = Mitigation {
            immune: false,
            bot_shield: Some(0.5),
            reduction_percent: 10.0,
            defence: 1.5,
        };
        // 1001 -> 500 -> 450 -> 300
        assert!((mitigate_damage(1001.0, &m) - 300.0).abs() < f64::EPSILON);
        let immune = Mitigation {
            immune: true,
            ..m
        };
        assert!(mitigate_damage(1001.0, &immune).abs() < f64::EPSILON);
    }

    #[test]
    fn test_spawn_interval_with_upgrade_and_hype() {
        assert_eq!(adjusted_spawn_interval(2000.0, 1.25, 3.0, 1.0, 100), 533);
        assert_eq!(adjusted_spawn_interval(2000.0, 1.0, 1.0, 1.0, 100), 2000);
        assert_eq!(adjusted_spawn_interval(2000.0, 10.0, 3.0, 1.0, 100), 100);
    }

    #[test]
    fn test_vertical_orbit_swaps_axes() {
        let mut orbit = Orbit {
            center: Vec2::new(0.0, 0.0),
            semi_major: 200.0,
            semi_minor: 100.0,
            angle: 0.0,
            angular_speed: 0.01,
            vertical: false,
            z_index: 0.0,
        };
        assert!((orbit.position().x - 200.0).abs() < 1e-9);
        orbit.vertical = true;
        assert!((orbit.position().x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_frozen_orbit_holds_angle() {
        let mut p = planet(10.0, 100.0, PlanetType::Normal);
        p.orbit.semi_major = 50.0;
        p.orbit.semi_minor = 50.0;
        p.orbit.angular_speed = 0.1;
        p.advance_orbit(true);
        assert!(p.orbit.angle.abs() < f64::EPSILON);
        p.advance_orbit(false);
        assert!((p.orbit.angle - 0.1).abs() < 1e-12);
    }
}
