//! Bot opponents.
//!
//! Decision making is split in two:
//! - [`Policy`] is stateless. Given the world and an operator it proposes
//!   reinforcement and attack targets. The headless autopilot reuses it
//!   to drive the player.
//! - [`Bot`] wraps a policy with timing (grace period, decision
//!   interval, independent ability cooldown) and the abilities and
//!   upgrades granted at construction.
//!
//! Bots issue [`BotOrder`]s; the game applies them the same way it
//! applies player commands.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::abilities::AbilityType;
use crate::difficulty::{Difficulty, DifficultyProfile};
use crate::ids::{OperatorId, PlanetId};
use crate::planet::Planet;
use crate::progression::UpgradeType;
use crate::time::Millis;
use crate::world::World;

/// No bot decisions before this much game time.
pub const BOT_GRACE_PERIOD_MS: Millis = 5000;

/// Minimum time between two bot abilities.
pub const BOT_ABILITY_COOLDOWN_MS: Millis = 15_000;

/// Reinforcers must be above this health fraction.
const REINFORCER_HEALTH: f64 = 0.8;

/// Reinforcers must have fewer outbound targets than this.
const REINFORCER_MAX_TARGETS: usize = 2;

/// Something a bot wants done.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BotOrder {
    /// Add `to` as a target of `from`.
    Target {
        /// Own planet.
        from: PlanetId,
        /// Target planet.
        to: PlanetId,
    },
    /// Activate an ability.
    Ability(AbilityType),
}

/// Stateless targeting policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Policy {
    /// Willingness to attack with weakened planets.
    pub aggressiveness: f64,
    /// Scoring and reinforcement quality.
    pub efficiency: f64,
}

impl Policy {
    /// Policy tuned for `difficulty`.
    #[must_use]
    pub const fn for_difficulty(difficulty: Difficulty) -> Self {
        let profile = difficulty.profile();
        Self {
            aggressiveness: profile.aggressiveness,
            efficiency: profile.efficiency,
        }
    }

    /// Health fraction under which a planet asks for reinforcement.
    #[must_use]
    pub fn reinforce_threshold(&self) -> f64 {
        0.5 + (self.efficiency - 1.0) * 0.2
    }

    /// Health fraction under which a planet does not attack.
    #[must_use]
    pub fn attack_floor(&self) -> f64 {
        0.3 / self.aggressiveness.max(f64::EPSILON)
    }

    /// Most simultaneous targets an attacking planet keeps.
    #[must_use]
    pub fn target_cap(&self) -> usize {
        (2.0 * self.aggressiveness).ceil().max(1.0) as usize
    }

    /// Score of `candidate` as a target for `attacker`.
    #[must_use]
    pub fn score(&self, attacker: &Planet, candidate: &Planet) -> f64 {
        let distance = attacker.position.distance(candidate.position);
        let distance_score = 1000.0 / (distance + 1.0) * self.efficiency;
        let health_score = 1000.0 / (candidate.health() + 1.0) * self.efficiency;
        let player_bonus = if candidate.is_owned_by(OperatorId::PLAYER) {
            self.aggressiveness * 3.0
        } else {
            0.0
        };
        distance_score + health_score + player_bonus
    }

    /// Targeting orders for `operator`: reinforcement first, then
    /// attacks.
    #[must_use]
    pub fn plan(&self, world: &World, operator: OperatorId) -> Vec<BotOrder> {
        let mine: Vec<&Planet> = world.planets().filter(|p| p.is_owned_by(operator)).collect();
        if mine.is_empty() {
            return Vec::new();
        }
        let mut orders = Vec::new();
        // Targets added this plan count toward the limits below.
        let mut added: BTreeSet<(PlanetId, PlanetId)> = BTreeSet::new();
        let target_count = |planet: &Planet, added: &BTreeSet<(PlanetId, PlanetId)>| {
            planet.targets().len() + added.iter().filter(|(from, _)| *from == planet.id).count()
        };

        if mine.len() > 1 {
            let threshold = self.reinforce_threshold();
            for weak in mine.iter().filter(|p| p.health_fraction() < threshold) {
                let reinforcer = mine
                    .iter()
                    .filter(|p| {
                        p.id != weak.id
                            && p.health_fraction() > REINFORCER_HEALTH
                            && target_count(p, &added) < REINFORCER_MAX_TARGETS
                    })
                    .max_by(|a, b| a.health().total_cmp(&b.health()));
                if let Some(reinforcer) = reinforcer {
                    if !reinforcer.has_target(weak.id) && added.insert((reinforcer.id, weak.id)) {
                        orders.push(BotOrder::Target {
                            from: reinforcer.id,
                            to: weak.id,
                        });
                    }
                }
            }
        }

        let candidates: Vec<&Planet> = world.planets().filter(|p| !p.is_owned_by(operator)).collect();
        if candidates.is_empty() {
            return orders;
        }
        let floor = self.attack_floor();
        let cap = self.target_cap();
        for attacker in &mine {
            if attacker.health_fraction() < floor || target_count(attacker, &added) >= cap {
                continue;
            }
            let best = candidates
                .iter()
                .map(|c| (c, self.score(attacker, c)))
                .fold(None::<(&&Planet, f64)>, |best, (c, s)| match best {
                    Some((_, bs)) if bs >= s => best,
                    _ => Some((c, s)),
                });
            if let Some((target, _)) = best {
                if !attacker.has_target(target.id) && added.insert((attacker.id, target.id)) {
                    orders.push(BotOrder::Target {
                        from: attacker.id,
                        to: target.id,
                    });
                }
            }
        }
        orders
    }
}

/// One AI opponent.
#[derive(Debug, Clone, PartialEq)]
pub struct Bot {
    /// Operator this bot plays.
    pub operator: OperatorId,
    policy: Policy,
    decision_interval_ms: Millis,
    abilities: Vec<AbilityType>,
    upgrades: BTreeSet<UpgradeType>,
    last_decision: Option<Millis>,
    last_ability: Option<Millis>,
}

impl Bot {
    /// Bot for `difficulty`, drawing its grants from `rng`.
    pub fn new<R: Rng + ?Sized>(operator: OperatorId, difficulty: Difficulty, rng: &mut R) -> Self {
        let profile = difficulty.profile();
        let abilities = draw(&AbilityType::BOT_ELIGIBLE, profile.granted_abilities, rng);
        let upgrades = draw(&UpgradeType::BOT_ELIGIBLE, profile.granted_upgrades, rng)
            .into_iter()
            .collect();
        Self::with_grants(operator, &profile, abilities, upgrades)
    }

    /// Bot with explicit grants.
    #[must_use]
    pub fn with_grants(
        operator: OperatorId,
        profile: &DifficultyProfile,
        abilities: Vec<AbilityType>,
        upgrades: BTreeSet<UpgradeType>,
    ) -> Self {
        Self {
            operator,
            policy: Policy {
                aggressiveness: profile.aggressiveness,
                efficiency: profile.efficiency,
            },
            decision_interval_ms: profile.decision_interval_ms,
            abilities,
            upgrades,
            last_decision: None,
            last_ability: None,
        }
    }

    /// Granted abilities.
    #[must_use]
    pub fn abilities(&self) -> &[AbilityType] {
        &self.abilities
    }

    /// Granted upgrades.
    #[must_use]
    pub const fn upgrades(&self) -> &BTreeSet<UpgradeType> {
        &self.upgrades
    }

    /// The targeting policy.
    #[must_use]
    pub const fn policy(&self) -> &Policy {
        &self.policy
    }

    /// 1.5 for granted upgrades, 1 otherwise.
    #[must_use]
    pub fn upgrade_multiplier(&self, upgrade: UpgradeType) -> f64 {
        if self.upgrades.contains(&upgrade) {
            UpgradeType::BOT_MULTIPLIER
        } else {
            1.0
        }
    }

    /// Decide what to do at game time `now`.
    ///
    /// Returns nothing during the grace period or between decisions.
    pub fn decide<R: Rng + ?Sized>(&mut self, world: &World, now: Millis, rng: &mut R) -> Vec<BotOrder> {
        if now < BOT_GRACE_PERIOD_MS {
            return Vec::new();
        }
        if self
            .last_decision
            .is_some_and(|last| now.saturating_sub(last) < self.decision_interval_ms)
        {
            return Vec::new();
        }
        self.last_decision = Some(now);

        let has_planets = world.planets().any(|p| p.is_owned_by(self.operator));
        if !has_planets {
            return Vec::new();
        }

        let mut orders = Vec::new();
        let ability_ready = self
            .last_ability
            .map_or(true, |last| now.saturating_sub(last) >= BOT_ABILITY_COOLDOWN_MS);
        if ability_ready {
            if let Some(&ability) = self.abilities.choose(rng) {
                orders.push(BotOrder::Ability(ability));
                self.last_ability = Some(now);
            }
        }
        orders.extend(self.policy.plan(world, self.operator));
        orders
    }
}

fn draw<T: Copy, R: Rng + ?Sized>(pool: &[T], range: (u32, u32), rng: &mut R) -> Vec<T> {
    let (low, high) = range;
    if high == 0 {
        return Vec::new();
    }
    let count = rng.gen_range(low..=high.max(low)) as usize;
    pool.choose_multiple(rng, count.min(pool.len())).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;
    use crate::planet::{Orbit, PlanetType};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn world(planets: &[(f64, Option<OperatorId>, f64)]) -> World {
        let mut world = World::new(1200.0, 850.0, 1);
        for (i, &(x, owner, health)) in planets.iter().enumerate() {
            world.add_planet(Planet::new(
                PlanetId(i as u32),
                Orbit::stationary(Vec2::new(x, 400.0)),
                PlanetType::Normal,
                owner,
                health,
                1000.0,
            ));
        }
        world
    }

    #[test]
    fn test_grants_scale_with_difficulty() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let easy = Bot::new(OperatorId(1), Difficulty::Easy, &mut rng);
        assert!(easy.abilities().is_empty());
        assert!(easy.upgrades().is_empty());

        let extreme = Bot::new(OperatorId(1), Difficulty::Extreme, &mut rng);
        assert!((2..=4).contains(&extreme.abilities().len()));
        assert!((4..=5).contains(&extreme.upgrades().len()));
        assert!(!extreme.abilities().contains(&AbilityType::PlanetaryInfection));
        let unique: BTreeSet<_> = extreme.abilities().iter().collect();
        assert_eq!(unique.len(), extreme.abilities().len());
    }

    #[test]
    fn test_grace_period_and_interval() {
        let bot_op = OperatorId(1);
        let w = world(&[(100.0, Some(bot_op), 1000.0), (500.0, Some(OperatorId::PLAYER), 500.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut bot = Bot::new(bot_op, Difficulty::Medium, &mut rng);

        assert!(bot.decide(&w, 4999, &mut rng).is_empty());
        assert_eq!(bot.decide(&w, 5000, &mut rng).len(), 1);
        assert!(bot.decide(&w, 6000, &mut rng).is_empty(), "inside decision interval");
        assert!(!bot.decide(&w, 7200, &mut rng).is_empty());
    }

    #[test]
    fn test_attack_prefers_player_and_weak_planets() {
        let bot_op = OperatorId(1);
        let w = world(&[
            (100.0, Some(bot_op), 1000.0),
            (400.0, None, 900.0),
            (400.0, Some(OperatorId::PLAYER), 100.0),
        ]);
        let orders = Policy::for_difficulty(Difficulty::Medium).plan(&w, bot_op);
        assert_eq!(
            orders,
            vec![BotOrder::Target {
                from: PlanetId(0),
                to: PlanetId(2)
            }]
        );
    }

    #[test]
    fn test_weak_planet_gets_reinforced_by_healthiest() {
        let bot_op = OperatorId(1);
        let w = world(&[
            (100.0, Some(bot_op), 200.0),
            (200.0, Some(bot_op), 900.0),
            (300.0, Some(bot_op), 950.0),
            (900.0, Some(OperatorId::PLAYER), 1000.0),
        ]);
        let orders = Policy::for_difficulty(Difficulty::Medium).plan(&w, bot_op);
        assert_eq!(
            orders[0],
            BotOrder::Target {
                from: PlanetId(2),
                to: PlanetId(0)
            }
        );
    }

    #[test]
    fn test_attack_floor_skips_weak_attackers() {
        let bot_op = OperatorId(1);
        let w = world(&[(100.0, Some(bot_op), 250.0), (400.0, Some(OperatorId::PLAYER), 100.0)]);
        // Easy: floor 0.3 / 0.6 = 0.5
        assert!(Policy::for_difficulty(Difficulty::Easy).plan(&w, bot_op).is_empty());
        // Extreme: floor 0.3 / 1.8 ≈ 0.17
        assert_eq!(Policy::for_difficulty(Difficulty::Extreme).plan(&w, bot_op).len(), 1);
    }

    #[test]
    fn test_granted_upgrade_multiplier() {
        let profile = Difficulty::Hard.profile();
        let bot = Bot::with_grants(
            OperatorId(1),
            &profile,
            vec![AbilityType::Shield],
            [UpgradeType::ShipDamage].into_iter().collect(),
        );
        assert!((bot.upgrade_multiplier(UpgradeType::ShipDamage) - 1.5).abs() < f64::EPSILON);
        assert!((bot.upgrade_multiplier(UpgradeType::ShipSpeed) - 1.0).abs() < f64::EPSILON);
    }
}
