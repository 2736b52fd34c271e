//! Ability activation and the effects that follow from it.

use std::f64::consts::TAU;

use rand::seq::SliceRandom;
use rand::Rng;

use super::{Game, GameStatus};
use crate::abilities::{player_cooldown_ms, AbilityParams, AbilityType, BlackHole, EffectOutput};
use crate::events::GameEvent;
use crate::ids::OperatorId;
use crate::math::Vec2;
use crate::planet::HealOutcome;
use crate::progression::UpgradeType;
use crate::ship::{Destination, ShipStats};
use crate::time::Millis;

impl Game {
    /// Activate `ability`.
    ///
    /// `None` casts for the player and is gated on the ability being
    /// unlocked and off cooldown; a successful cast starts the cooldown.
    /// `Some(operator)` is an unconditional cast for that operator (bots,
    /// scripted scenarios). Nothing happens while paused or after the
    /// game ended. Returns whether the ability fired.
    pub fn activate_ability(&mut self, ability: AbilityType, caster: Option<OperatorId>) -> bool {
        if self.clock.is_paused() || self.status != GameStatus::Running {
            return false;
        }
        let now = self.clock.game_time();

        let (operator, params) = match caster {
            None => {
                let level = self.profile.player().ability_level(ability);
                if level == 0 || self.abilities.cooldown_remaining(ability, now) > 0 {
                    return false;
                }
                let params = ability.player_params(level);
                let cooldown = player_cooldown_ms(
                    self.config.base_ability_cooldown_ms,
                    params,
                    self.upgrade_percent(OperatorId::PLAYER, UpgradeType::AbilityCooldown),
                    self.config.debug.remove_ability_cooldowns,
                );
                self.abilities.start_cooldown(ability, now, cooldown);
                (OperatorId::PLAYER, params)
            }
            Some(operator) if operator.is_player() => {
                let level = self.profile.player().ability_level(ability).max(1);
                (operator, ability.player_params(level))
            }
            Some(operator) => (operator, ability.bot_params()),
        };

        tracing::info!(
            tick = self.tick,
            %operator,
            %ability,
            duration_ms = params.duration_ms,
            power = params.power,
            "Ability activated"
        );
        self.emit(GameEvent::AbilityUsed { operator, ability });
        self.cast(ability, operator, params, now);
        true
    }

    fn cast(&mut self, ability: AbilityType, operator: OperatorId, params: AbilityParams, now: Millis) {
        let AbilityParams { duration_ms, power } = params;
        match ability {
            AbilityType::Freeze
            | AbilityType::Shield
            | AbilityType::FactoryHype
            | AbilityType::ImprovedFactories
            | AbilityType::UnstoppableShips => {
                self.abilities.activate_timed(operator, ability, now, duration_ms);
            }
            AbilityType::PlanetaryFlame => {
                self.abilities
                    .start_flame(operator, f64::from(power), now, duration_ms);
            }
            AbilityType::MissileBarrage => self.launch_missiles(operator, power),
            AbilityType::AnsweredPrayers => self.answer_prayers(operator, power, now),
            AbilityType::Curse => {
                let targets = self.world.enemy_planets_of(operator);
                self.abilities
                    .curse(operator, &targets, now, duration_ms, f64::from(power));
            }
            AbilityType::BlackHole => self.open_black_hole(operator, power, now, duration_ms),
            AbilityType::PlanetaryInfection => {
                let enemies = self.world.enemy_planets_of(operator);
                let targets: Vec<_> = enemies
                    .choose_multiple(&mut self.rng, power as usize)
                    .copied()
                    .collect();
                self.abilities.infect(operator, &targets, now, duration_ms);
            }
            AbilityType::OrbitalFreeze => {
                let targets = self.world.enemy_planets_of(operator);
                self.abilities
                    .freeze_orbits(operator, &targets, now, duration_ms);
            }
        }
    }

    /// Launch `count` missiles from the map centre, each at a random enemy
    /// planet.
    fn launch_missiles(&mut self, operator: OperatorId, count: u32) {
        let enemies = self.world.enemy_planets_of(operator);
        if enemies.is_empty() {
            return;
        }
        let stats = ShipStats {
            speed: self.config.projectile_speed * self.config.missile_speed_multiplier,
            health: 1.0,
            damage: self.config.ship_damage
                * self.upgrade_multiplier(operator, UpgradeType::ShipDamage)
                * self.config.missile_damage_multiplier,
        };
        let center = self.world.center();
        for _ in 0..count {
            let Some(&target) = enemies.choose(&mut self.rng) else {
                break;
            };
            let mut missile = self.world.build_ship(operator, None, center, stats);
            missile.missile = true;
            missile.reset_for_dispatch(Destination::Planet(target));
            self.world.insert_ship(missile);
        }
    }

    /// Heals in place. A healing ship arriving home would add the same
    /// amount, capped at max health, so none are spawned.
    fn answer_prayers(&mut self, operator: OperatorId, percent: u32, now: Millis) {
        let fraction = f64::from(percent.min(100)) / 100.0;
        for id in self.world.planets_owned_by(operator) {
            let Some(planet) = self.world.planet_mut(id) else {
                continue;
            };
            let missing = planet.max_health() - planet.health();
            if missing <= 0.0 {
                continue;
            }
            let amount = (planet.max_health() * fraction).floor().min(missing);
            if planet.heal(amount) == HealOutcome::Full {
                tracing::trace!(planet = %id, "Prayer heal capped at max health");
            }
        }
        self.abilities.mark_healing(now);
    }

    /// Put a black hole next to one of the caster's planets, or anywhere
    /// on the map if it has none.
    fn open_black_hole(&mut self, operator: OperatorId, power: u32, now: Millis, duration_ms: Millis) {
        let owned = self.world.planets_owned_by(operator);
        let anchor = owned
            .choose(&mut self.rng)
            .and_then(|id| self.world.planet(*id))
            .map(|p| (p.position, p.radius(self.config.planet_size)));
        let position = match anchor {
            Some((center, radius)) => {
                let angle = self.rng.gen_range(0.0..TAU);
                BlackHole::placement_near(center, radius, power, angle)
            }
            None => Vec2::new(
                self.rng.gen_range(0.0..self.world.width()),
                self.rng.gen_range(0.0..self.world.height()),
            ),
        };
        self.abilities
            .add_black_hole(BlackHole::new(operator, position, power, now, duration_ms));
    }

    /// Push what the ability update produced through the damage pipeline.
    pub(super) fn apply_effect_output(&mut self, output: EffectOutput, now: Millis) {
        for strike in output.strikes {
            self.strike_planet(strike.planet, strike.attacker, strike.damage, now);
        }
        for (ship, by) in output.ship_kills {
            tracing::trace!(%ship, %by, "Ship burned");
            self.destroy_ship(ship, now);
        }
        for (operator, ability) in output.expired {
            tracing::debug!(%operator, %ability, "Ability expired");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::abilities::manager::EffectStrike;
    use crate::abilities::{AbilityType, EffectOutput};
    use crate::config::GameConfig;
    use crate::difficulty::Difficulty;
    use crate::game::{Game, GameStatus, PlayerCommand};
    use crate::generation::{PlanetSeed, WorldLayout};
    use crate::ids::{OperatorId, PlanetId};
    use crate::math::Vec2;
    use crate::persistence::Profile;
    use crate::planet::{Orbit, PlanetType};
    use crate::ship::{Destination, ShipStats};

    fn game() -> Game {
        let seed = |x: f64, owner| PlanetSeed {
            orbit: Orbit::stationary(Vec2::new(x, 400.0)),
            planet_type: PlanetType::Normal,
            owner,
            health_fraction: 1.0,
        };
        let layout = WorldLayout {
            width: 1200.0,
            height: 850.0,
            bot_count: 1,
            planets: vec![
                seed(200.0, Some(OperatorId::PLAYER)),
                seed(1000.0, Some(OperatorId(1))),
                seed(600.0, None),
            ],
        };
        let config = GameConfig::default();
        let profile = Profile::ephemeral(&config);
        Game::from_layout(config, Difficulty::Easy, layout, 5, profile).unwrap()
    }

    fn unlock(game: &mut Game, ability: AbilityType) {
        game.profile_mut().player_mut().set_ability_level(ability, 1);
    }

    #[test]
    fn test_locked_ability_does_not_fire() {
        let mut game = game();
        assert!(!game.activate_ability(AbilityType::Freeze, None));
        assert_eq!(game.cooldown_remaining(AbilityType::Freeze), 0);
    }

    #[test]
    fn test_player_cast_starts_cooldown() {
        let mut game = game();
        unlock(&mut game, AbilityType::Freeze);
        game.tick(0);
        assert!(game.activate_ability(AbilityType::Freeze, None));
        // (45000 + 6000) at level 1 with no cooldown upgrade.
        assert_eq!(game.cooldown_remaining(AbilityType::Freeze), 51_000);
        assert!(game.abilities().production_frozen(OperatorId(1), 0));
        assert!(!game.abilities().production_frozen(OperatorId::PLAYER, 0));
        assert!(!game.activate_ability(AbilityType::Freeze, None));
    }

    #[test]
    fn test_debug_flag_removes_cooldown() {
        let mut game = game();
        unlock(&mut game, AbilityType::Shield);
        game.debug_flags_mut().remove_ability_cooldowns = true;
        assert!(game.activate_ability(AbilityType::Shield, None));
        assert!(game.activate_ability(AbilityType::Shield, None));
    }

    #[test]
    fn test_rejected_while_paused_or_over() {
        let mut game = game();
        unlock(&mut game, AbilityType::Shield);
        game.tick(0);
        game.apply_command(OperatorId::PLAYER, PlayerCommand::Pause).unwrap();
        assert!(!game.activate_ability(AbilityType::Shield, None));
        assert!(!game.activate_ability(AbilityType::Shield, Some(OperatorId(1))));
        game.apply_command(OperatorId::PLAYER, PlayerCommand::Resume).unwrap();
        game.status = GameStatus::Won;
        assert!(!game.activate_ability(AbilityType::Shield, None));
    }

    #[test]
    fn test_bot_casts_are_independent() {
        let mut game = game();
        game.tick(0);
        assert!(game.activate_ability(AbilityType::Shield, Some(OperatorId(1))));
        assert!(game.activate_ability(AbilityType::Shield, Some(OperatorId(1))));
        assert_eq!(game.cooldown_remaining(AbilityType::Shield), 0);
        assert!(game.abilities().shield_active(OperatorId(1), 0));
        assert!(!game.abilities().shield_active(OperatorId::PLAYER, 0));
        assert_eq!(
            game.abilities().effect_expiry(OperatorId(1), AbilityType::Shield),
            Some(10_000)
        );
    }

    #[test]
    fn test_missile_barrage_launches_from_center() {
        let mut game = game();
        unlock(&mut game, AbilityType::MissileBarrage);
        assert!(game.activate_ability(AbilityType::MissileBarrage, None));
        let missiles: Vec<_> = game.world().ships().collect();
        assert_eq!(missiles.len(), 3);
        for m in missiles {
            assert!(m.missile);
            assert_eq!(m.origin, None);
            assert_eq!(m.position, Vec2::new(600.0, 425.0));
            assert_eq!(m.destination, Some(Destination::Planet(PlanetId(1))));
            assert!((m.damage - 1000.0).abs() < 1e-9);
            assert!((m.speed - 13.0).abs() < 1e-9);
            assert!((m.health - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_answered_prayers_heals_damaged_planets() {
        let mut game = game();
        unlock(&mut game, AbilityType::AnsweredPrayers);
        game.world.planet_mut(PlanetId(0)).unwrap().set_health(5000.0);
        assert!(game.activate_ability(AbilityType::AnsweredPrayers, None));
        // 25% of max at level 1.
        assert!((game.world().planet(PlanetId(0)).unwrap().health() - 7500.0).abs() < 1e-9);
        assert!(game.abilities().was_healing_just_used(0));
        assert_eq!(game.world().ship_count(), 0);
    }

    #[test]
    fn test_answered_prayers_caps_at_max() {
        let mut game = game();
        unlock(&mut game, AbilityType::AnsweredPrayers);
        game.world.planet_mut(PlanetId(0)).unwrap().set_health(9000.0);
        game.activate_ability(AbilityType::AnsweredPrayers, None);
        assert!((game.world().planet(PlanetId(0)).unwrap().health() - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_curse_hits_current_enemies_only() {
        let mut game = game();
        unlock(&mut game, AbilityType::Curse);
        game.activate_ability(AbilityType::Curse, None);
        assert!((game.abilities().curse_reduction(PlanetId(1), 0) - 20.0).abs() < 1e-9);
        assert!(!game.abilities().is_cursed(PlanetId(0), 0));
        assert!(!game.abilities().is_cursed(PlanetId(2), 0));
    }

    #[test]
    fn test_black_hole_orbits_own_planet() {
        let mut game = game();
        unlock(&mut game, AbilityType::BlackHole);
        game.activate_ability(AbilityType::BlackHole, None);
        let holes = game.abilities().black_holes();
        assert_eq!(holes.len(), 1);
        assert_eq!(holes[0].owner, OperatorId::PLAYER);
        // radius 17.5 + horizon 150 / 2 + gap 30
        let distance = holes[0].position.distance(Vec2::new(200.0, 400.0));
        assert!((distance - 122.5).abs() < 1e-6);
    }

    #[test]
    fn test_infection_and_orbital_freeze_target_enemies() {
        let mut game = game();
        unlock(&mut game, AbilityType::PlanetaryInfection);
        unlock(&mut game, AbilityType::OrbitalFreeze);
        game.activate_ability(AbilityType::PlanetaryInfection, None);
        game.activate_ability(AbilityType::OrbitalFreeze, None);
        assert_eq!(
            game.abilities().infector_of(PlanetId(1), 0),
            Some(OperatorId::PLAYER)
        );
        assert!(game.abilities().is_orbitally_frozen(PlanetId(1), 0));
        assert!(!game.abilities().is_orbitally_frozen(PlanetId(0), 0));
        assert!(!game.abilities().is_orbitally_frozen(PlanetId(2), 0));
    }

    #[test]
    fn test_effect_output_goes_through_damage_pipeline() {
        let mut game = game();
        let stats = ShipStats {
            speed: 3.5,
            health: 1000.0,
            damage: 500.0,
        };
        let ship = game
            .world
            .build_ship(OperatorId(1), Some(PlanetId(1)), Vec2::new(800.0, 400.0), stats);
        let ship = game.world.insert_ship(ship);
        game.activate_ability(AbilityType::Shield, Some(OperatorId::PLAYER));
        game.apply_effect_output(
            EffectOutput {
                strikes: vec![
                    EffectStrike {
                        planet: PlanetId(1),
                        attacker: OperatorId::PLAYER,
                        damage: 300.0,
                    },
                    EffectStrike {
                        planet: PlanetId(0),
                        attacker: OperatorId(1),
                        damage: 300.0,
                    },
                ],
                ship_kills: vec![(ship, OperatorId::PLAYER)],
                expired: Vec::new(),
            },
            0,
        );
        assert!((game.world().planet(PlanetId(1)).unwrap().health() - 9700.0).abs() < 1e-9);
        // Shielded player planets take nothing.
        assert!((game.world().planet(PlanetId(0)).unwrap().health() - 10_000.0).abs() < 1e-9);
        assert!(game.world().ship(ship).is_none());
        assert_eq!(game.world().explosions().len(), 1);
    }
}
