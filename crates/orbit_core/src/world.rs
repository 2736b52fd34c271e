//! Entity storage.
//!
//! All planets, ships, projectiles, explosions and operators live here and
//! refer to each other by id. Ordered maps give deterministic iteration
//! without sorting on every tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{OperatorId, PlanetId, ProjectileId, ShipId};
use crate::math::Vec2;
use crate::operator::Operator;
use crate::planet::Planet;
use crate::projectile::{Explosion, Projectile};
use crate::ship::{Ship, ShipStats};
use crate::time::Millis;

/// The entity arena for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    width: f64,
    height: f64,
    planets: Vec<Planet>,
    ships: BTreeMap<ShipId, Ship>,
    projectiles: BTreeMap<ProjectileId, Projectile>,
    explosions: Vec<Explosion>,
    operators: Vec<Operator>,
    next_ship_id: u64,
    next_projectile_id: u64,
}

impl World {
    /// Empty world with the player and `bot_count` bots.
    #[must_use]
    pub fn new(width: f64, height: f64, bot_count: u32) -> Self {
        let mut operators = vec![Operator::player()];
        operators.extend((1..=bot_count).map(Operator::bot));
        Self {
            width,
            height,
            planets: Vec::new(),
            ships: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            explosions: Vec::new(),
            operators,
            next_ship_id: 1,
            next_projectile_id: 1,
        }
    }

    /// Map width.
    #[must_use]
    pub const fn width(&self) -> f64 {
        self.width
    }

    /// Map height.
    #[must_use]
    pub const fn height(&self) -> f64 {
        self.height
    }

    /// Map center.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    // ------------------------------------------------------------------
    // Planets
    // ------------------------------------------------------------------

    /// Next id a planet would receive.
    #[must_use]
    pub fn next_planet_id(&self) -> PlanetId {
        PlanetId(self.planets.len() as u32)
    }

    /// Insert a planet; its id is rewritten to the next free slot.
    pub fn add_planet(&mut self, mut planet: Planet) -> PlanetId {
        let id = self.next_planet_id();
        planet.id = id;
        self.planets.push(planet);
        id
    }

    /// Planet by id.
    #[must_use]
    pub fn planet(&self, id: PlanetId) -> Option<&Planet> {
        self.planets.get(id.0 as usize)
    }

    /// Mutable planet by id.
    pub fn planet_mut(&mut self, id: PlanetId) -> Option<&mut Planet> {
        self.planets.get_mut(id.0 as usize)
    }

    /// All planets in id order.
    pub fn planets(&self) -> impl Iterator<Item = &Planet> {
        self.planets.iter()
    }

    /// All planets, mutably.
    pub fn planets_mut(&mut self) -> impl Iterator<Item = &mut Planet> {
        self.planets.iter_mut()
    }

    /// Planet ids in order.
    #[must_use]
    pub fn planet_ids(&self) -> Vec<PlanetId> {
        self.planets.iter().map(|p| p.id).collect()
    }

    /// Number of planets.
    #[must_use]
    pub fn planet_count(&self) -> usize {
        self.planets.len()
    }

    /// Planets owned by `operator`, read from the owner fields.
    #[must_use]
    pub fn planets_owned_by(&self, operator: OperatorId) -> Vec<PlanetId> {
        self.planets
            .iter()
            .filter(|p| p.is_owned_by(operator))
            .map(|p| p.id)
            .collect()
    }

    /// Planets owned by anyone other than `operator` (neutral excluded).
    #[must_use]
    pub fn enemy_planets_of(&self, operator: OperatorId) -> Vec<PlanetId> {
        self.planets
            .iter()
            .filter(|p| p.is_enemy_of(operator))
            .map(|p| p.id)
            .collect()
    }

    /// Planets with no owner.
    #[must_use]
    pub fn neutral_planet_count(&self) -> usize {
        self.planets.iter().filter(|p| p.owner().is_none()).count()
    }

    /// Planet whose disc contains `point`, nearest first.
    #[must_use]
    pub fn find_planet_at(&self, point: Vec2, planet_size: f64) -> Option<PlanetId> {
        self.planets
            .iter()
            .filter(|p| p.position.distance(point) <= p.radius(planet_size))
            .min_by(|a, b| {
                a.position
                    .distance_squared(point)
                    .total_cmp(&b.position.distance_squared(point))
            })
            .map(|p| p.id)
    }

    // ------------------------------------------------------------------
    // Ships
    // ------------------------------------------------------------------

    /// Allocate a ship id.
    pub fn allocate_ship_id(&mut self) -> ShipId {
        let id = ShipId(self.next_ship_id);
        self.next_ship_id += 1;
        id
    }

    /// Build a ship with a fresh id (not yet inserted).
    pub fn build_ship(
        &mut self,
        owner: OperatorId,
        origin: Option<PlanetId>,
        position: Vec2,
        stats: ShipStats,
    ) -> Ship {
        let id = self.allocate_ship_id();
        Ship::new(id, owner, origin, position, stats)
    }

    /// Put a ship into play.
    pub fn insert_ship(&mut self, ship: Ship) -> ShipId {
        let id = ship.id;
        self.ships.insert(id, ship);
        id
    }

    /// Take a ship out of play.
    pub fn remove_ship(&mut self, id: ShipId) -> Option<Ship> {
        self.ships.remove(&id)
    }

    /// Ship by id.
    #[must_use]
    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.get(&id)
    }

    /// Mutable ship by id.
    pub fn ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.ships.get_mut(&id)
    }

    /// Ships in play, in id order.
    pub fn ships(&self) -> impl Iterator<Item = &Ship> {
        self.ships.values()
    }

    /// Snapshot of ship ids, safe to iterate while ships are removed.
    #[must_use]
    pub fn ship_ids(&self) -> Vec<ShipId> {
        self.ships.keys().copied().collect()
    }

    /// Number of ships in play.
    #[must_use]
    pub fn ship_count(&self) -> usize {
        self.ships.len()
    }

    /// Ships in play owned by `operator`.
    #[must_use]
    pub fn ship_count_of(&self, operator: OperatorId) -> usize {
        self.ships.values().filter(|s| s.owner == operator).count()
    }

    // ------------------------------------------------------------------
    // Projectiles and explosions
    // ------------------------------------------------------------------

    /// Allocate a projectile id.
    pub fn allocate_projectile_id(&mut self) -> ProjectileId {
        let id = ProjectileId(self.next_projectile_id);
        self.next_projectile_id += 1;
        id
    }

    /// Put a projectile into play.
    pub fn insert_projectile(&mut self, projectile: Projectile) -> ProjectileId {
        let id = projectile.id;
        self.projectiles.insert(id, projectile);
        id
    }

    /// Remove a projectile.
    pub fn remove_projectile(&mut self, id: ProjectileId) -> Option<Projectile> {
        self.projectiles.remove(&id)
    }

    /// Mutable projectile by id.
    pub fn projectile_mut(&mut self, id: ProjectileId) -> Option<&mut Projectile> {
        self.projectiles.get_mut(&id)
    }

    /// Projectiles in flight.
    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.values()
    }

    /// Snapshot of projectile ids.
    #[must_use]
    pub fn projectile_ids(&self) -> Vec<ProjectileId> {
        self.projectiles.keys().copied().collect()
    }

    /// Add an explosion.
    pub fn add_explosion(&mut self, explosion: Explosion) {
        self.explosions.push(explosion);
    }

    /// Active explosions.
    #[must_use]
    pub fn explosions(&self) -> &[Explosion] {
        &self.explosions
    }

    /// Drop finished explosions.
    pub fn sweep_explosions(&mut self, now: Millis) {
        self.explosions.retain(|e| !e.is_finished(now));
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    /// All operators; index 0 is the player.
    #[must_use]
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// Operator by id.
    #[must_use]
    pub fn operator(&self, id: OperatorId) -> Option<&Operator> {
        self.operators.get(id.0 as usize)
    }

    /// Bot operator ids.
    #[must_use]
    pub fn bot_ids(&self) -> Vec<OperatorId> {
        self.operators
            .iter()
            .filter(|o| !o.is_player())
            .map(|o| o.id)
            .collect()
    }

    /// Rebuild every operator's planet/ship lists from the owner fields.
    pub fn sync_operator_caches(&mut self) {
        for operator in &mut self.operators {
            operator.planets.clear();
            operator.ships.clear();
        }
        for planet in &self.planets {
            if let Some(owner) = planet.owner() {
                if let Some(op) = self.operators.get_mut(owner.0 as usize) {
                    op.planets.push(planet.id);
                }
            }
        }
        for ship in self.ships.values() {
            if let Some(op) = self.operators.get_mut(ship.owner.0 as usize) {
                op.ships.push(ship.id);
            }
        }
    }

    /// Whether every operator cache matches the owner fields.
    #[must_use]
    pub fn operator_caches_consistent(&self) -> bool {
        self.operators.iter().all(|op| {
            op.planets == self.planets_owned_by(op.id)
                && op.ships.len() == self.ship_count_of(op.id)
                && op
                    .ships
                    .iter()
                    .all(|id| self.ship(*id).is_some_and(|s| s.owner == op.id))
        })
    }

    /// Broken structural invariants; empty for a sound world.
    #[must_use]
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for (slot, planet) in self.planets.iter().enumerate() {
            if planet.id.0 as usize != slot {
                violations.push(format!("planet {} stored in slot {slot}", planet.id));
            }
            if !(0.0..=planet.max_health() + 1e-9).contains(&planet.health()) {
                violations.push(format!(
                    "planet {} health {} outside 0..={}",
                    planet.id,
                    planet.health(),
                    planet.max_health()
                ));
            }
            if planet.owner().is_some_and(|o| self.operator(o).is_none()) {
                violations.push(format!("planet {} has an unknown owner", planet.id));
            }
        }
        for ship in self.ships.values() {
            if self.operator(ship.owner).is_none() {
                violations.push(format!("ship {} has an unknown owner", ship.id));
            }
        }
        if !self.operator_caches_consistent() {
            violations.push("operator caches are stale".to_string());
        }
        violations
    }
}
