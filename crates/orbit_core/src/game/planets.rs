//! Planet systems: reserve dispatch, production, regeneration, orbits,
//! and the damage pipeline every planet hit goes through.

use rand::seq::SliceRandom;
use rand::Rng;

use super::Game;
use crate::events::GameEvent;
use crate::ids::{OperatorId, PlanetId};
use crate::planet::{adjusted_spawn_interval, mitigate_damage, DamageOutcome, HealOutcome, Mitigation};
use crate::progression::UpgradeType;
use crate::ship::{Destination, Ship, ShipStats};
use crate::time::Millis;

/// Movement steps a dispatched ship gets so it clears its planet.
const DISPATCH_STEPS: usize = 2;

/// Regeneration happens once per this many milliseconds.
const REGEN_INTERVAL_MS: Millis = 1000;

impl Game {
    pub(super) fn tick_planets(&mut self, now: Millis) {
        for id in self.world.planet_ids() {
            self.dispatch_stationed(id);
            self.produce(id, now);
            self.regenerate(id, now);
            let frozen = self.abilities.is_orbitally_frozen(id, now);
            if let Some(planet) = self.world.planet_mut(id) {
                planet.advance_orbit(frozen);
            }
        }
    }

    /// Send the oldest reserve ship to the next target.
    fn dispatch_stationed(&mut self, id: PlanetId) {
        let Some(planet) = self.world.planet_mut(id) else {
            return;
        };
        if planet.targets().is_empty() || planet.stationed().is_empty() {
            return;
        }
        let (Some(mut ship), Some(target)) = (planet.take_stationed(), planet.next_target()) else {
            return;
        };
        ship.position = planet.position;
        ship.reset_for_dispatch(Destination::Planet(target));
        if let Some(aim) = self.world.planet(target).map(|p| p.position) {
            for _ in 0..DISPATCH_STEPS {
                ship.step_towards(aim);
            }
        }
        self.world.insert_ship(ship);
    }

    /// Ship stats for a ship built on `planet` for `operator`.
    fn ship_stats(&self, planet: PlanetId, operator: OperatorId, now: Millis) -> Option<ShipStats> {
        let p = self.world.planet(planet)?;
        let t = p.planet_type.stats();
        let mut speed = self.config.ship_speed
            * t.ship_speed
            * self.upgrade_multiplier(operator, UpgradeType::ShipSpeed);
        let mut health = self.config.ship_health
            * t.defence
            * self.upgrade_multiplier(operator, UpgradeType::ShipHealth);
        let mut damage = self.config.ship_damage
            * t.attack
            * self.upgrade_multiplier(operator, UpgradeType::ShipDamage);

        if self.abilities.improved_factories_active(operator, now) {
            let boost = self.config.improved_factories_multiplier;
            speed *= boost;
            health *= boost;
            damage *= boost;
        }
        let curse = self.abilities.curse_multiplier(planet, now);
        speed *= curse;
        health *= curse;
        damage *= curse;

        Some(ShipStats {
            speed,
            health: health.floor().max(1.0),
            damage: damage.floor().max(0.0),
        })
    }

    fn produce(&mut self, id: PlanetId, now: Millis) {
        let Some(planet) = self.world.planet(id) else {
            return;
        };
        let Some(owner) = planet.owner() else {
            return;
        };
        if planet.targets().is_empty() || self.abilities.production_frozen(owner, now) {
            return;
        }

        let hype = if self.abilities.factory_hype_active(owner, now) {
            self.config.factory_hype_multiplier
        } else {
            1.0
        };
        let interval = adjusted_spawn_interval(
            self.config.base_spawn_interval_ms(),
            self.upgrade_multiplier(owner, UpgradeType::ShipSpawnSpeed),
            hype,
            planet.planet_type.stats().production,
            self.config.min_spawn_interval_ms,
        );
        if now.saturating_sub(planet.last_spawn) < interval {
            return;
        }
        let position = planet.position;

        // An infected planet builds for its infector.
        let builder = self
            .abilities
            .infector_of(id, now)
            .filter(|infector| *infector != owner)
            .unwrap_or(owner);
        let Some(stats) = self.ship_stats(id, builder, now) else {
            return;
        };

        let chance = self.upgrade_percent(builder, UpgradeType::DoubleShipChance) / 100.0;
        let count = if chance > 0.0 && self.rng.gen_bool(chance.min(1.0)) {
            2
        } else {
            1
        };

        for _ in 0..count {
            let ship = self.world.build_ship(builder, Some(id), position, stats);
            if builder == owner {
                if let Some(planet) = self.world.planet_mut(id) {
                    planet.station(ship);
                }
            } else {
                self.launch_redirected(ship, id);
            }
        }
        if let Some(planet) = self.world.planet_mut(id) {
            planet.last_spawn = now;
        }
    }

    /// Dispatch a ship built for an infector at a random planet the
    /// infector does not own.
    fn launch_redirected(&mut self, mut ship: Ship, from: PlanetId) {
        let candidates: Vec<PlanetId> = self
            .world
            .planets()
            .filter(|p| p.id != from && !p.is_owned_by(ship.owner))
            .map(|p| p.id)
            .collect();
        let Some(&target) = candidates.choose(&mut self.rng) else {
            return;
        };
        ship.reset_for_dispatch(Destination::Planet(target));
        self.world.insert_ship(ship);
    }

    fn regenerate(&mut self, id: PlanetId, now: Millis) {
        let rate = self.config.planet_regen_rate;
        let Some(planet) = self.world.planet_mut(id) else {
            return;
        };
        if now.saturating_sub(planet.last_regen) < REGEN_INTERVAL_MS {
            return;
        }
        let amount = (rate * planet.planet_type.stats().regen)
            .min(planet.max_health() - planet.health())
            .max(0.0);
        planet.set_health(planet.health() + amount);
        planet.last_regen = now;
    }

    /// Damage modifiers for hits on `planet` right now.
    pub(super) fn mitigation_for(&self, planet: PlanetId, now: Millis) -> Mitigation {
        let Some(p) = self.world.planet(planet) else {
            return Mitigation::default();
        };
        let defence = p.planet_type.stats().defence;
        match p.owner() {
            None => Mitigation {
                defence,
                ..Mitigation::default()
            },
            Some(owner) if owner.is_player() => Mitigation {
                immune: self.abilities.shield_active(owner, now)
                    || self.config.debug.player_planets_invincible,
                bot_shield: None,
                reduction_percent: self.upgrade_percent(owner, UpgradeType::PlanetDamageReduction),
                defence,
            },
            Some(owner) => Mitigation {
                immune: false,
                bot_shield: self
                    .abilities
                    .shield_active(owner, now)
                    .then_some(self.config.bot_shield_factor),
                reduction_percent: 0.0,
                defence,
            },
        }
    }

    /// Run raw enemy damage through mitigation and apply it. Handles the
    /// capture flip and its bookkeeping.
    pub(super) fn strike_planet(&mut self, planet: PlanetId, attacker: OperatorId, raw: f64, now: Millis) {
        let damage = mitigate_damage(raw, &self.mitigation_for(planet, now));
        let Some(p) = self.world.planet_mut(planet) else {
            return;
        };
        let planet_type = p.planet_type;
        let DamageOutcome::Captured { previous } = p.apply_damage(damage, attacker) else {
            return;
        };

        self.abilities.clear_planet(planet);
        let max = self.effective_max_health(Some(attacker));
        if let Some(p) = self.world.planet_mut(planet) {
            p.set_max_health(max);
        }
        tracing::info!(
            tick = self.tick,
            planet = %planet,
            operator = %attacker,
            "Planet captured"
        );
        self.emit(GameEvent::PlanetCaptured {
            planet,
            by: attacker,
            previous,
            planet_type,
        });
    }

    /// A ship reached `planet`: heal or dock if friendly, strike otherwise.
    pub(super) fn ship_arrives(&mut self, mut ship: Ship, planet: PlanetId, now: Millis) {
        let Some(p) = self.world.planet_mut(planet) else {
            return;
        };
        if p.is_owned_by(ship.owner) {
            if p.heal(ship.damage) == HealOutcome::Full {
                ship.destination = None;
                ship.stationary = false;
                ship.combat_target = None;
                ship.position = p.position;
                p.station(ship);
            }
            return;
        }
        self.strike_planet(planet, ship.owner, ship.damage, now);
    }
}
