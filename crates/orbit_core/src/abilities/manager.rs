//! Cooldowns and active effects for every operator.
//!
//! Every effect is keyed by the operator that cast it, so two bots (or a
//! bot and the player) can hold independent instances of the same
//! ability. An effect is active while `now < expiry`; expired entries are
//! swept lazily in [`AbilityManager::update`].
//!
//! `update` only reads the world. Damage and kills it wants to apply come
//! back as an [`EffectOutput`] for the game to push through the normal
//! damage pipeline, so effect order within a tick never matters.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;

use crate::abilities::{AbilityType, BlackHole};
use crate::config::GameConfig;
use crate::ids::{OperatorId, PlanetId, ShipId};
use crate::math::{normalize_angle, Vec2};
use crate::time::Millis;
use crate::world::World;

/// How often infections try to spread.
pub const INFECTION_SPREAD_INTERVAL_MS: Millis = 200;
/// How often an infected planet takes damage.
pub const INFECTION_DAMAGE_INTERVAL_MS: Millis = 1000;
/// Damage per infection pulse.
pub const INFECTION_DAMAGE: f64 = 100.0;
/// How often flame beams burn.
pub const FLAME_DAMAGE_INTERVAL_MS: Millis = 250;
/// Beam sweep speed in radians per millisecond.
pub const FLAME_ROTATION_PER_MS: f64 = 0.002;
/// Planets within this distance of a beam tip burn.
pub const FLAME_PLANET_RADIUS: f64 = 30.0;
/// Ships within this distance of a beam tip are destroyed.
pub const FLAME_SHIP_RADIUS: f64 = 25.0;
/// Window in which a heal counts as "just used" for the renderer.
pub const HEALING_FLASH_MS: Millis = 100;

/// Curse on one planet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurseEntry {
    /// Expiry.
    pub expires: Millis,
    /// Ship stat reduction in percent.
    pub reduction_percent: f64,
}

/// Infection on one planet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfectionEntry {
    /// When this planet was infected.
    pub started: Millis,
    /// When this planet's infection ends.
    pub expires: Millis,
    /// Last damage pulse.
    pub last_damage: Millis,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct InfectionState {
    entries: BTreeMap<PlanetId, InfectionEntry>,
    duration_ms: Millis,
    last_spread: Millis,
}

/// Planetary flame for one operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlameState {
    /// Beam length and damage.
    pub power: f64,
    /// Current beam angle.
    pub rotation: f64,
    /// Expiry.
    pub expires: Millis,
    last_damage: Millis,
}

/// Damage an effect wants applied to a planet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectStrike {
    /// Planet hit.
    pub planet: PlanetId,
    /// Operator credited with the damage.
    pub attacker: OperatorId,
    /// Raw damage, before the planet's mitigation.
    pub damage: f64,
}

/// Everything one [`AbilityManager::update`] wants done to the world.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectOutput {
    /// Planet damage to route through the damage pipeline.
    pub strikes: Vec<EffectStrike>,
    /// Ships burned by flame beams, with the operator responsible.
    pub ship_kills: Vec<(ShipId, OperatorId)>,
    /// Effects that ran out this update.
    pub expired: Vec<(OperatorId, AbilityType)>,
}

/// Cooldown and effect bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct AbilityManager {
    cooldowns: BTreeMap<AbilityType, Millis>,
    timed: BTreeMap<(OperatorId, AbilityType), Millis>,
    curses: BTreeMap<OperatorId, BTreeMap<PlanetId, CurseEntry>>,
    orbital_freezes: BTreeMap<OperatorId, BTreeMap<PlanetId, Millis>>,
    infections: BTreeMap<OperatorId, InfectionState>,
    black_holes: Vec<BlackHole>,
    flames: BTreeMap<OperatorId, FlameState>,
    last_healing: Option<Millis>,
    last_update: Option<Millis>,
}

impl AbilityManager {
    /// Nothing active, nothing cooling down.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Player cooldowns
    // ------------------------------------------------------------------

    /// Milliseconds until the player can use `ability` again.
    #[must_use]
    pub fn cooldown_remaining(&self, ability: AbilityType, now: Millis) -> Millis {
        self.cooldowns
            .get(&ability)
            .map_or(0, |until| until.saturating_sub(now))
    }

    /// Start the player's cooldown for `ability`.
    pub fn start_cooldown(&mut self, ability: AbilityType, now: Millis, cooldown_ms: Millis) {
        self.cooldowns.insert(ability, now + cooldown_ms);
    }

    // ------------------------------------------------------------------
    // Timed flags
    // ------------------------------------------------------------------

    /// Activate a timed flag for `operator` until `now + duration`.
    pub fn activate_timed(
        &mut self,
        operator: OperatorId,
        ability: AbilityType,
        now: Millis,
        duration_ms: Millis,
    ) {
        self.timed.insert((operator, ability), now + duration_ms);
    }

    /// Expiry of `operator`'s instance of a timed flag.
    #[must_use]
    pub fn effect_expiry(&self, operator: OperatorId, ability: AbilityType) -> Option<Millis> {
        self.timed.get(&(operator, ability)).copied()
    }

    fn flag_active(&self, operator: OperatorId, ability: AbilityType, now: Millis) -> bool {
        self.timed
            .get(&(operator, ability))
            .is_some_and(|&expires| now < expires)
    }

    /// Whether `operator` has any instance of `ability` running.
    #[must_use]
    pub fn is_active(&self, operator: OperatorId, ability: AbilityType, now: Millis) -> bool {
        match ability {
            AbilityType::Curse => self
                .curses
                .get(&operator)
                .is_some_and(|m| m.values().any(|c| now < c.expires)),
            AbilityType::OrbitalFreeze => self
                .orbital_freezes
                .get(&operator)
                .is_some_and(|m| m.values().any(|&e| now < e)),
            AbilityType::PlanetaryInfection => self
                .infections
                .get(&operator)
                .is_some_and(|s| s.entries.values().any(|e| now < e.expires)),
            AbilityType::BlackHole => self
                .black_holes
                .iter()
                .any(|h| h.owner == operator && h.is_active(now)),
            AbilityType::PlanetaryFlame => self
                .flames
                .get(&operator)
                .is_some_and(|f| now < f.expires),
            AbilityType::MissileBarrage | AbilityType::AnsweredPrayers => false,
            _ => self.flag_active(operator, ability, now),
        }
    }

    /// Abilities `operator` currently has running, for the renderer.
    #[must_use]
    pub fn active_abilities(&self, operator: OperatorId, now: Millis) -> Vec<AbilityType> {
        AbilityType::ALL
            .into_iter()
            .filter(|a| self.is_active(operator, *a, now))
            .collect()
    }

    /// Whether production of a planet owned by `owner` is frozen by
    /// anyone else's Freeze.
    #[must_use]
    pub fn production_frozen(&self, owner: OperatorId, now: Millis) -> bool {
        self.timed.iter().any(|(&(caster, ability), &expires)| {
            ability == AbilityType::Freeze && caster != owner && now < expires
        })
    }

    /// Whether `operator`'s Shield is up.
    #[must_use]
    pub fn shield_active(&self, operator: OperatorId, now: Millis) -> bool {
        self.flag_active(operator, AbilityType::Shield, now)
    }

    /// Whether `operator`'s Factory Hype is running.
    #[must_use]
    pub fn factory_hype_active(&self, operator: OperatorId, now: Millis) -> bool {
        self.flag_active(operator, AbilityType::FactoryHype, now)
    }

    /// Whether `operator`'s Improved Factories is running.
    #[must_use]
    pub fn improved_factories_active(&self, operator: OperatorId, now: Millis) -> bool {
        self.flag_active(operator, AbilityType::ImprovedFactories, now)
    }

    /// Whether `operator`'s ships are unstoppable.
    #[must_use]
    pub fn unstoppable(&self, operator: OperatorId, now: Millis) -> bool {
        self.flag_active(operator, AbilityType::UnstoppableShips, now)
    }

    // ------------------------------------------------------------------
    // Per-planet effects
    // ------------------------------------------------------------------

    /// Curse `planets` on behalf of `operator`.
    pub fn curse(
        &mut self,
        operator: OperatorId,
        planets: &[PlanetId],
        now: Millis,
        duration_ms: Millis,
        reduction_percent: f64,
    ) {
        let map = self.curses.entry(operator).or_default();
        for &planet in planets {
            map.insert(
                planet,
                CurseEntry {
                    expires: now + duration_ms,
                    reduction_percent: reduction_percent.clamp(0.0, 100.0),
                },
            );
        }
    }

    /// Whether any operator's curse covers `planet`.
    #[must_use]
    pub fn is_cursed(&self, planet: PlanetId, now: Millis) -> bool {
        self.curse_reduction(planet, now) > 0.0
    }

    /// Strongest active curse on `planet`, in percent.
    #[must_use]
    pub fn curse_reduction(&self, planet: PlanetId, now: Millis) -> f64 {
        self.curses
            .values()
            .filter_map(|m| m.get(&planet))
            .filter(|c| now < c.expires)
            .map(|c| c.reduction_percent)
            .fold(0.0, f64::max)
    }

    /// Multiplier for ships produced on `planet`.
    #[must_use]
    pub fn curse_multiplier(&self, planet: PlanetId, now: Millis) -> f64 {
        1.0 - self.curse_reduction(planet, now) / 100.0
    }

    /// Freeze the orbits of `planets` on behalf of `operator`.
    pub fn freeze_orbits(
        &mut self,
        operator: OperatorId,
        planets: &[PlanetId],
        now: Millis,
        duration_ms: Millis,
    ) {
        let map = self.orbital_freezes.entry(operator).or_default();
        for &planet in planets {
            map.insert(planet, now + duration_ms);
        }
    }

    /// Whether `planet`'s orbit is frozen.
    #[must_use]
    pub fn is_orbitally_frozen(&self, planet: PlanetId, now: Millis) -> bool {
        self.orbital_freezes
            .values()
            .filter_map(|m| m.get(&planet))
            .any(|&expires| now < expires)
    }

    /// Infect `planets` on behalf of `operator`.
    pub fn infect(
        &mut self,
        operator: OperatorId,
        planets: &[PlanetId],
        now: Millis,
        duration_ms: Millis,
    ) {
        let state = self.infections.entry(operator).or_default();
        state.duration_ms = duration_ms;
        state.last_spread = now;
        for &planet in planets {
            state.entries.insert(
                planet,
                InfectionEntry {
                    started: now,
                    expires: now + duration_ms,
                    last_damage: now,
                },
            );
        }
    }

    /// Operator whose infection currently owns `planet`'s production.
    #[must_use]
    pub fn infector_of(&self, planet: PlanetId, now: Millis) -> Option<OperatorId> {
        self.infections.iter().find_map(|(&op, state)| {
            state
                .entries
                .get(&planet)
                .filter(|e| now < e.expires)
                .map(|_| op)
        })
    }

    /// Whether `planet` is infected by anyone.
    #[must_use]
    pub fn is_infected(&self, planet: PlanetId, now: Millis) -> bool {
        self.infector_of(planet, now).is_some()
    }

    /// Planets infected by `operator`.
    #[must_use]
    pub fn infected_by(&self, operator: OperatorId, now: Millis) -> Vec<PlanetId> {
        self.infections
            .get(&operator)
            .map(|s| {
                s.entries
                    .iter()
                    .filter(|(_, e)| now < e.expires)
                    .map(|(p, _)| *p)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop curse and infection entries for a planet that changed hands.
    pub fn clear_planet(&mut self, planet: PlanetId) {
        for map in self.curses.values_mut() {
            map.remove(&planet);
        }
        for state in self.infections.values_mut() {
            state.entries.remove(&planet);
        }
    }

    // ------------------------------------------------------------------
    // Black holes, flame, healing
    // ------------------------------------------------------------------

    /// Add a black hole.
    pub fn add_black_hole(&mut self, hole: BlackHole) {
        self.black_holes.push(hole);
    }

    /// Black holes in play.
    #[must_use]
    pub fn black_holes(&self) -> &[BlackHole] {
        &self.black_holes
    }

    /// Start (or restart) `operator`'s flame.
    pub fn start_flame(&mut self, operator: OperatorId, power: f64, now: Millis, duration_ms: Millis) {
        let rotation = self.flames.get(&operator).map_or(0.0, |f| f.rotation);
        self.flames.insert(
            operator,
            FlameState {
                power,
                rotation,
                expires: now + duration_ms,
                last_damage: now,
            },
        );
    }

    /// `operator`'s flame, if burning.
    #[must_use]
    pub fn flame(&self, operator: OperatorId, now: Millis) -> Option<&FlameState> {
        self.flames.get(&operator).filter(|f| now < f.expires)
    }

    /// Record an Answered Prayers cast.
    pub fn mark_healing(&mut self, now: Millis) {
        self.last_healing = Some(now);
    }

    /// Whether a heal was cast in the last moment.
    #[must_use]
    pub fn was_healing_just_used(&self, now: Millis) -> bool {
        self.last_healing
            .is_some_and(|t| now.saturating_sub(t) < HEALING_FLASH_MS)
    }

    /// Flame beam tips for `operator`: two opposite beams from the first
    /// half of its planets.
    #[must_use]
    pub fn flame_beam_tips(&self, operator: OperatorId, world: &World, now: Millis) -> Vec<Vec2> {
        let Some(flame) = self.flame(operator, now) else {
            return Vec::new();
        };
        let owned = world.planets_owned_by(operator);
        let sources = (owned.len() / 2).max(1).min(owned.len());
        owned
            .iter()
            .take(sources)
            .filter_map(|id| world.planet(*id))
            .flat_map(|p| {
                [flame.rotation, flame.rotation + PI]
                    .map(|angle| p.position + Vec2::from_angle(angle, flame.power))
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Per-tick update
    // ------------------------------------------------------------------

    /// Sweep expiries and advance ongoing effects.
    ///
    /// Calling it twice with the same `now` only sweeps the second time.
    pub fn update(&mut self, world: &World, config: &GameConfig, now: Millis) -> EffectOutput {
        let mut output = EffectOutput::default();
        self.sweep(now, &mut output);

        let elapsed = match self.last_update {
            Some(last) if last >= now => return output,
            Some(last) => now - last,
            None => 0,
        };
        self.last_update = Some(now);

        self.update_black_holes(world, &mut output);
        self.update_flames(world, now, elapsed, &mut output);
        self.update_infections(world, config, now, &mut output);
        output
    }

    fn sweep(&mut self, now: Millis, output: &mut EffectOutput) {
        self.timed.retain(|&(op, ability), &mut expires| {
            let keep = now < expires;
            if !keep {
                output.expired.push((op, ability));
            }
            keep
        });
        for (&op, map) in &mut self.curses {
            let before = map.len();
            map.retain(|_, c| now < c.expires);
            if before > 0 && map.is_empty() {
                output.expired.push((op, AbilityType::Curse));
            }
        }
        self.curses.retain(|_, m| !m.is_empty());
        for (&op, map) in &mut self.orbital_freezes {
            let before = map.len();
            map.retain(|_, &mut e| now < e);
            if before > 0 && map.is_empty() {
                output.expired.push((op, AbilityType::OrbitalFreeze));
            }
        }
        self.orbital_freezes.retain(|_, m| !m.is_empty());
        for (&op, state) in &mut self.infections {
            let before = state.entries.len();
            state.entries.retain(|_, e| now < e.expires);
            if before > 0 && state.entries.is_empty() {
                output.expired.push((op, AbilityType::PlanetaryInfection));
            }
        }
        self.infections.retain(|_, s| !s.entries.is_empty());
        self.black_holes.retain(|h| {
            let keep = h.is_active(now);
            if !keep {
                output.expired.push((h.owner, AbilityType::BlackHole));
            }
            keep
        });
        self.flames.retain(|&op, f| {
            let keep = now < f.expires;
            if !keep {
                output.expired.push((op, AbilityType::PlanetaryFlame));
            }
            keep
        });
    }

    fn update_black_holes(&mut self, world: &World, output: &mut EffectOutput) {
        for hole in &mut self.black_holes {
            hole.advance();
            for planet in world.planets() {
                if planet.is_enemy_of(hole.owner) && hole.reaches(planet.position) {
                    output.strikes.push(EffectStrike {
                        planet: planet.id,
                        attacker: hole.owner,
                        damage: hole.damage_per_update(),
                    });
                }
            }
        }
    }

    fn update_flames(
        &mut self,
        world: &World,
        now: Millis,
        elapsed: Millis,
        output: &mut EffectOutput,
    ) {
        let operators: Vec<OperatorId> = self.flames.keys().copied().collect();
        for op in operators {
            let burn = match self.flames.get_mut(&op) {
                Some(flame) => {
                    flame.rotation =
                        normalize_angle(flame.rotation + FLAME_ROTATION_PER_MS * elapsed as f64);
                    if now.saturating_sub(flame.last_damage) >= FLAME_DAMAGE_INTERVAL_MS {
                        flame.last_damage = now;
                        Some(flame.power)
                    } else {
                        None
                    }
                }
                None => None,
            };
            let Some(power) = burn else {
                continue;
            };

            let tips = self.flame_beam_tips(op, world, now);
            let mut burned = BTreeSet::new();
            for tip in &tips {
                for planet in world.planets() {
                    if planet.is_enemy_of(op)
                        && planet.position.distance(*tip) < FLAME_PLANET_RADIUS
                        && burned.insert(planet.id)
                    {
                        output.strikes.push(EffectStrike {
                            planet: planet.id,
                            attacker: op,
                            damage: power,
                        });
                    }
                }
                for ship in world.ships() {
                    if ship.owner != op
                        && ship.position.distance(*tip) < FLAME_SHIP_RADIUS
                        && !output.ship_kills.iter().any(|(id, _)| *id == ship.id)
                    {
                        output.ship_kills.push((ship.id, op));
                    }
                }
            }
        }
    }

    fn update_infections(
        &mut self,
        world: &World,
        config: &GameConfig,
        now: Millis,
        output: &mut EffectOutput,
    ) {
        let mut already: BTreeSet<PlanetId> = self
            .infections
            .values()
            .flat_map(|s| s.entries.keys().copied())
            .collect();

        for (&op, state) in &mut self.infections {
            for (&planet, entry) in &mut state.entries {
                if now.saturating_sub(entry.last_damage) >= INFECTION_DAMAGE_INTERVAL_MS {
                    entry.last_damage += INFECTION_DAMAGE_INTERVAL_MS;
                    output.strikes.push(EffectStrike {
                        planet,
                        attacker: op,
                        damage: INFECTION_DAMAGE,
                    });
                }
            }

            if now.saturating_sub(state.last_spread) < INFECTION_SPREAD_INTERVAL_MS {
                continue;
            }
            state.last_spread = now;

            let mut newly = Vec::new();
            for &infected in state.entries.keys() {
                let Some(source) = world.planet(infected) else {
                    continue;
                };
                let source_radius = source.radius(config.planet_size);
                for other in world.planets() {
                    if other.id == infected
                        || !other.is_enemy_of(op)
                        || already.contains(&other.id)
                    {
                        continue;
                    }
                    let touching = source.position.distance(other.position)
                        < source_radius + other.radius(config.planet_size);
                    if touching {
                        already.insert(other.id);
                        newly.push(other.id);
                    }
                }
            }
            for planet in newly {
                tracing::debug!(operator = %op, planet = %planet, "Infection spread");
                state.entries.insert(
                    planet,
                    InfectionEntry {
                        started: now,
                        expires: now + state.duration_ms,
                        last_damage: now,
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planet::{Orbit, Planet, PlanetType};

    fn world(positions: &[(f64, f64, Option<OperatorId>)]) -> World {
        let mut world = World::new(1200.0, 850.0, 2);
        for (i, &(x, y, owner)) in positions.iter().enumerate() {
            world.add_planet(Planet::new(
                PlanetId(i as u32),
                Orbit::stationary(Vec2::new(x, y)),
                PlanetType::Normal,
                owner,
                5000.0,
                10_000.0,
            ));
        }
        world
    }

    #[test]
    fn test_shields_are_independent_per_operator() {
        let mut manager = AbilityManager::new();
        let a = OperatorId(1);
        let b = OperatorId(2);
        manager.activate_timed(a, AbilityType::Shield, 0, 10_000);
        manager.activate_timed(b, AbilityType::Shield, 5_000, 10_000);

        let world = world(&[]);
        let output = manager.update(&world, &GameConfig::default(), 12_000);
        assert!(!manager.shield_active(a, 12_000));
        assert!(manager.shield_active(b, 12_000));
        assert_eq!(output.expired, vec![(a, AbilityType::Shield)]);
    }

    #[test]
    fn test_freeze_only_blocks_other_operators() {
        let mut manager = AbilityManager::new();
        manager.activate_timed(OperatorId::PLAYER, AbilityType::Freeze, 0, 5000);
        assert!(manager.production_frozen(OperatorId(1), 100));
        assert!(!manager.production_frozen(OperatorId::PLAYER, 100));
        assert!(!manager.production_frozen(OperatorId(1), 5000));
    }

    #[test]
    fn test_curse_takes_strongest_and_clears_on_capture() {
        let mut manager = AbilityManager::new();
        manager.curse(OperatorId::PLAYER, &[PlanetId(1)], 0, 5000, 20.0);
        manager.curse(OperatorId(2), &[PlanetId(1)], 0, 5000, 25.0);
        assert!((manager.curse_multiplier(PlanetId(1), 10) - 0.75).abs() < 1e-12);
        manager.clear_planet(PlanetId(1));
        assert!(!manager.is_cursed(PlanetId(1), 10));
    }

    #[test]
    fn test_cooldown_remaining() {
        let mut manager = AbilityManager::new();
        manager.start_cooldown(AbilityType::Curse, 1000, 50_000);
        assert_eq!(manager.cooldown_remaining(AbilityType::Curse, 11_000), 40_000);
        assert_eq!(manager.cooldown_remaining(AbilityType::Curse, 60_000), 0);
        assert_eq!(manager.cooldown_remaining(AbilityType::Shield, 0), 0);
    }

    #[test]
    fn test_black_hole_strikes_enemies_in_range() {
        let w = world(&[
            (100.0, 100.0, Some(OperatorId(1))),
            (110.0, 100.0, Some(OperatorId::PLAYER)),
            (105.0, 100.0, None),
        ]);
        let mut manager = AbilityManager::new();
        manager.add_black_hole(BlackHole::new(
            OperatorId::PLAYER,
            Vec2::new(100.0, 100.0),
            100,
            0,
            5000,
        ));
        manager.update(&w, &GameConfig::default(), 0);
        let output = manager.update(&w, &GameConfig::default(), 16);
        assert_eq!(output.strikes.len(), 1);
        assert_eq!(output.strikes[0].planet, PlanetId(0));
        assert!((output.strikes[0].damage - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_is_idempotent_per_timestamp() {
        let w = world(&[(100.0, 100.0, Some(OperatorId(1)))]);
        let mut manager = AbilityManager::new();
        manager.add_black_hole(BlackHole::new(
            OperatorId::PLAYER,
            Vec2::new(100.0, 100.0),
            100,
            0,
            5000,
        ));
        let first = manager.update(&w, &GameConfig::default(), 50);
        let second = manager.update(&w, &GameConfig::default(), 50);
        assert_eq!(first.strikes.len(), 1);
        assert!(second.strikes.is_empty());
    }

    #[test]
    fn test_infection_spreads_to_touching_enemy_planets() {
        let w = world(&[
            (100.0, 100.0, Some(OperatorId(1))),
            (120.0, 100.0, Some(OperatorId(1))),
            (600.0, 100.0, Some(OperatorId(1))),
            (130.0, 100.0, Some(OperatorId::PLAYER)),
        ]);
        let mut manager = AbilityManager::new();
        manager.infect(OperatorId::PLAYER, &[PlanetId(0)], 0, 10_000);
        manager.update(&w, &GameConfig::default(), 0);
        manager.update(&w, &GameConfig::default(), 100);
        assert!(!manager.is_infected(PlanetId(1), 100));
        manager.update(&w, &GameConfig::default(), 200);
        assert_eq!(manager.infector_of(PlanetId(1), 200), Some(OperatorId::PLAYER));
        assert!(!manager.is_infected(PlanetId(2), 200));
        assert!(!manager.is_infected(PlanetId(3), 200), "own planets stay clean");
    }

    #[test]
    fn test_infection_pulses_and_expires() {
        let w = world(&[(100.0, 100.0, Some(OperatorId(1)))]);
        let mut manager = AbilityManager::new();
        manager.infect(OperatorId::PLAYER, &[PlanetId(0)], 0, 2500);
        manager.update(&w, &GameConfig::default(), 0);
        let pulse = manager.update(&w, &GameConfig::default(), 1000);
        assert_eq!(pulse.strikes.len(), 1);
        let expired = manager.update(&w, &GameConfig::default(), 2500);
        assert!(expired
            .expired
            .contains(&(OperatorId::PLAYER, AbilityType::PlanetaryInfection)));
        assert!(!manager.is_infected(PlanetId(0), 2500));
    }

    #[test]
    fn test_orbital_freeze_per_planet() {
        let mut manager = AbilityManager::new();
        manager.freeze_orbits(OperatorId(1), &[PlanetId(3)], 0, 1000);
        assert!(manager.is_orbitally_frozen(PlanetId(3), 999));
        assert!(!manager.is_orbitally_frozen(PlanetId(4), 999));
        assert!(!manager.is_orbitally_frozen(PlanetId(3), 1000));
    }

    #[test]
    fn test_flame_burns_planets_near_beam_tip() {
        // after 250 ms the beam has turned 0.5 rad; tip lands near (187.8, 147.9)
        let w = world(&[
            (100.0, 100.0, Some(OperatorId::PLAYER)),
            (188.0, 148.0, Some(OperatorId(1))),
            (200.0, 100.0, Some(OperatorId(1))),
        ]);
        let mut manager = AbilityManager::new();
        manager.start_flame(OperatorId::PLAYER, 100.0, 0, 5000);

        let tips = manager.flame_beam_tips(OperatorId::PLAYER, &w, 0);
        assert_eq!(tips.len(), 2);
        assert!((tips[0].x - 200.0).abs() < 1e-9);

        manager.update(&w, &GameConfig::default(), 0);
        let output = manager.update(&w, &GameConfig::default(), 250);
        assert_eq!(output.strikes.len(), 1);
        assert_eq!(output.strikes[0].planet, PlanetId(1));
        assert!((output.strikes[0].damage - 100.0).abs() < f64::EPSILON);
    }
}
