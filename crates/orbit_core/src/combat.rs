//! Ship-to-ship combat with engage/disengage hysteresis.
//!
//! A ship defends its origin planet: it engages the nearest enemy ship
//! that is inbound toward that planet once the enemy is within the
//! engagement distance, and only lets go when the enemy is destroyed,
//! retargets, or drifts past the (strictly larger) disengagement
//! distance. While engaged a ship holds position and fires at a fixed
//! rate; unstoppable ships keep moving but still fire.

use std::collections::BTreeMap;

use crate::config::GameConfig;
use crate::ids::{OperatorId, PlanetId, ShipId};
use crate::math::Vec2;
use crate::projectile::Projectile;
use crate::time::Millis;
use crate::world::World;

/// Per-ship combat state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombatState {
    /// Currently engaged.
    pub in_combat: bool,
    /// Enemy being fired at.
    pub target: Option<ShipId>,
    /// Time of the last shot.
    pub last_shot: Option<Millis>,
}

/// What one combat pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombatReport {
    /// Ships that entered combat.
    pub engaged: Vec<ShipId>,
    /// Ships that left combat.
    pub disengaged: Vec<ShipId>,
    /// Projectiles fired.
    pub shots: usize,
}

/// Combat bookkeeping for every ship in flight.
#[derive(Debug, Clone, Default)]
pub struct CombatManager {
    states: BTreeMap<ShipId, CombatState>,
}

impl CombatManager {
    /// No ship in combat.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `ship`, if it has ever been considered.
    #[must_use]
    pub fn state(&self, ship: ShipId) -> Option<&CombatState> {
        self.states.get(&ship)
    }

    /// Whether `ship` is engaged.
    #[must_use]
    pub fn in_combat(&self, ship: ShipId) -> bool {
        self.states.get(&ship).is_some_and(|s| s.in_combat)
    }

    /// Number of engaged ships.
    #[must_use]
    pub fn engaged_count(&self) -> usize {
        self.states.values().filter(|s| s.in_combat).count()
    }

    /// Forget a ship that left play.
    pub fn forget(&mut self, ship: ShipId) {
        self.states.remove(&ship);
    }

    /// Run one combat pass.
    ///
    /// `unstoppable` reports whether an operator's ships currently ignore
    /// the hold-position rule.
    pub fn update(
        &mut self,
        world: &mut World,
        config: &GameConfig,
        unstoppable: &dyn Fn(OperatorId) -> bool,
        now: Millis,
    ) -> CombatReport {
        let mut report = CombatReport::default();
        self.states.retain(|id, _| world.ship(*id).is_some());

        for id in world.ship_ids() {
            let Some((owner, origin, position, has_destination)) = world
                .ship(id)
                .map(|s| (s.owner, s.origin, s.position, s.destination.is_some()))
            else {
                continue;
            };
            let Some(origin) = origin.filter(|_| has_destination) else {
                continue;
            };
            let mut state = self.states.get(&id).copied().unwrap_or_default();

            if state.in_combat {
                let keep = state.target.and_then(|t| world.ship(t)).is_some_and(|t| {
                    t.owner != owner
                        && t.is_heading_to(origin)
                        && t.position.distance(position) <= config.disengagement_distance
                });
                if !keep {
                    state = CombatState::default();
                    if let Some(ship) = world.ship_mut(id) {
                        ship.stationary = false;
                        ship.combat_target = None;
                    }
                    report.disengaged.push(id);
                }
            }

            if !state.in_combat {
                let candidate = nearest_raider(world, owner, origin, position)
                    .filter(|(_, distance)| *distance <= config.engagement_distance);
                if let Some((target, _)) = candidate {
                    state.in_combat = true;
                    state.target = Some(target);
                    let hold = !unstoppable(owner);
                    if let Some(ship) = world.ship_mut(id) {
                        ship.stationary = hold;
                        ship.combat_target = Some(target);
                    }
                    report.engaged.push(id);
                }
            }

            if state.in_combat {
                let ready = state
                    .last_shot
                    .map_or(true, |last| now.saturating_sub(last) >= config.ship_fire_rate_ms);
                let aim = state.target.and_then(|t| world.ship(t)).map(|t| t.position);
                if let (true, Some(aim), Some(target)) = (ready, aim, state.target) {
                    fire(world, config, owner, id, target, position, aim);
                    state.last_shot = Some(now);
                    report.shots += 1;
                }
            }

            self.states.insert(id, state);
        }
        report
    }
}

/// Nearest enemy of `owner` inbound toward `origin`, with its distance.
#[must_use]
pub fn nearest_raider(
    world: &World,
    owner: OperatorId,
    origin: PlanetId,
    position: Vec2,
) -> Option<(ShipId, f64)> {
    world
        .ships()
        .filter(|s| s.owner != owner && s.is_heading_to(origin))
        .map(|s| (s.id, s.position.distance(position)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

fn fire(
    world: &mut World,
    config: &GameConfig,
    owner: OperatorId,
    shooter: ShipId,
    target: ShipId,
    from: Vec2,
    at: Vec2,
) {
    let id = world.allocate_projectile_id();
    world.insert_projectile(Projectile::aimed(
        id,
        owner,
        shooter,
        target,
        from,
        at,
        config.projectile_speed,
        config.projectile_max_range,
        config.projectile_damage,
    ));
}
