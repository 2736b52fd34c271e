//! The session orchestrator.
//!
//! [`Game`] owns every piece of session state (world, ability and combat
//! bookkeeping, bots, the player's profile and the seeded RNG) and
//! advances all of it once per call to [`Game::tick`].
//!
//! # System Execution Order
//!
//! Each tick, systems run in this order:
//! 1. **Planets** - dispatch reserves, produce, regenerate, orbit
//! 2. **Ships** - intercept or travel, arrive, record trails
//! 3. **Projectiles** - travel, hit, expire
//! 4. **Bots** - decide and issue orders
//! 5. **Explosions** - sweep finished ones
//! 6. **Abilities** - sweep expiries, black holes, flames, infections
//! 7. **Combat** - engage, disengage, fire
//! 8. **Termination** - win/loss check
//!
//! Later systems see this tick's changes from earlier ones.
//!
//! # Time
//!
//! `tick(now)` takes wall-clock milliseconds from the scheduler. Game
//! time starts at the first tick and excludes every paused interval, so
//! pausing never eats into cooldowns or effect windows.

mod effects;
mod planets;
mod ships;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::abilities::{AbilityManager, AbilityType};
use crate::bot::{Bot, BotOrder};
use crate::combat::CombatManager;
use crate::config::{DebugFlags, GameConfig};
use crate::difficulty::Difficulty;
use crate::error::{GameError, Result};
use crate::events::{GameEvent, TickEvents};
use crate::generation::{WorldGenerator, WorldLayout};
use crate::ids::{OperatorId, PlanetId};
use crate::persistence::Profile;
use crate::planet::Planet;
use crate::progression::UpgradeType;
use crate::ship::Destination;
use crate::time::Millis;
use crate::world::World;

/// Whether the session is still being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Still going.
    #[default]
    Running,
    /// The player owns every non-neutral planet.
    Won,
    /// The player has nothing left.
    Lost,
}

/// Discrete commands from the input collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerCommand {
    /// Add, remove or reverse the route `from → to`.
    ToggleTarget {
        /// Own planet.
        from: PlanetId,
        /// Target planet.
        to: PlanetId,
    },
    /// Activate an ability.
    ActivateAbility {
        /// Ability to activate.
        ability: AbilityType,
    },
    /// Stop advancing the simulation.
    Pause,
    /// Continue after a pause.
    Resume,
    /// Switch the reduced tick rate on or off.
    SetSlowMode {
        /// New slow mode state.
        enabled: bool,
    },
}

/// Wall-clock bookkeeping that turns scheduler time into game time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct SessionClock {
    origin: Option<Millis>,
    wall_now: Millis,
    paused_since: Option<Millis>,
    paused_total: Millis,
}

impl SessionClock {
    fn observe(&mut self, wall: Millis) {
        let wall = wall.max(self.wall_now);
        if self.origin.is_none() {
            self.origin = Some(wall);
        }
        self.wall_now = wall;
    }

    fn game_time(&self) -> Millis {
        let origin = self.origin.unwrap_or(self.wall_now);
        let paused = self.paused_total
            + self
                .paused_since
                .map_or(0, |since| self.wall_now.saturating_sub(since));
        self.wall_now.saturating_sub(origin).saturating_sub(paused)
    }

    const fn is_paused(&self) -> bool {
        self.paused_since.is_some()
    }

    fn pause(&mut self) -> bool {
        if self.paused_since.is_some() {
            return false;
        }
        self.paused_since = Some(self.wall_now);
        true
    }

    fn resume(&mut self) -> bool {
        let Some(since) = self.paused_since.take() else {
            return false;
        };
        self.paused_total += self.wall_now.saturating_sub(since);
        true
    }
}

/// Serializable view of a session, for debugging and desync reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Ticks simulated.
    pub tick: u64,
    /// Game time at the snapshot.
    pub game_time: Millis,
    /// Difficulty.
    pub difficulty: Difficulty,
    /// Session seed.
    pub seed: u64,
    /// Session status.
    pub status: GameStatus,
    /// Every entity.
    pub world: World,
}

impl GameSnapshot {
    /// Decode a snapshot written by [`Game::serialize_state`].
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize game state: {e}")))
    }
}

/// One running session.
#[derive(Debug)]
pub struct Game {
    config: GameConfig,
    difficulty: Difficulty,
    seed: u64,
    world: World,
    abilities: AbilityManager,
    combat: CombatManager,
    bots: Vec<Bot>,
    profile: Profile,
    rng: ChaCha8Rng,
    tick: u64,
    status: GameStatus,
    clock: SessionClock,
    slow_mode: bool,
    pending: Vec<GameEvent>,
}

impl Game {
    /// Start a session on a freshly generated world.
    ///
    /// Out-of-range config values are clamped (and logged) first.
    pub fn new(
        mut config: GameConfig,
        difficulty: Difficulty,
        seed: u64,
        profile: Profile,
    ) -> Result<Self> {
        config.validate();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let layout = WorldGenerator::new(&config, difficulty).generate(&mut rng);
        Self::build(config, difficulty, layout, seed, profile, rng)
    }

    /// Start a session on a prepared layout.
    ///
    /// Fails with [`GameError::InvalidWorld`] if the layout cannot start a
    /// session; nothing is created in that case.
    pub fn from_layout(
        mut config: GameConfig,
        difficulty: Difficulty,
        layout: WorldLayout,
        seed: u64,
        profile: Profile,
    ) -> Result<Self> {
        config.validate();
        let rng = ChaCha8Rng::seed_from_u64(seed);
        Self::build(config, difficulty, layout, seed, profile, rng)
    }

    fn build(
        config: GameConfig,
        difficulty: Difficulty,
        layout: WorldLayout,
        seed: u64,
        profile: Profile,
        mut rng: ChaCha8Rng,
    ) -> Result<Self> {
        layout.validate()?;
        let bots = (1..=layout.bot_count)
            .map(|index| Bot::new(OperatorId(index), difficulty, &mut rng))
            .collect();

        let mut game = Self {
            world: World::new(layout.width, layout.height, layout.bot_count),
            config,
            difficulty,
            seed,
            abilities: AbilityManager::new(),
            combat: CombatManager::new(),
            bots,
            profile,
            rng,
            tick: 0,
            status: GameStatus::Running,
            clock: SessionClock::default(),
            slow_mode: false,
            pending: Vec::new(),
        };

        for planet_seed in &layout.planets {
            let max = game.effective_max_health(planet_seed.owner);
            let planet = Planet::new(
                game.world.next_planet_id(),
                planet_seed.orbit,
                planet_seed.planet_type,
                planet_seed.owner,
                max * planet_seed.health_fraction.clamp(0.0, 1.0),
                max,
            );
            game.world.add_planet(planet);
        }
        game.world.sync_operator_caches();

        tracing::info!(
            seed,
            %difficulty,
            planets = game.world.planet_count(),
            bots = game.bots.len(),
            "Game started"
        );
        game.profile
            .observe(&GameEvent::GameStarted { difficulty }, 0);
        Ok(game)
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance the simulation by one tick at wall-clock time `now`.
    ///
    /// While paused or after the game ended this only records the time.
    pub fn tick(&mut self, now: Millis) -> TickEvents {
        self.clock.observe(now);
        if self.clock.is_paused() || self.status != GameStatus::Running {
            return TickEvents::default();
        }
        let now = self.clock.game_time();

        // 1. Planets
        self.tick_planets(now);

        // 2. Ships
        self.tick_ships(now);

        // 3. Projectiles
        self.tick_projectiles(now);

        // 4. Bots
        self.tick_bots(now);

        // 5. Explosions
        self.world.sweep_explosions(now);

        // 6. Abilities
        let output = self.abilities.update(&self.world, &self.config, now);
        self.apply_effect_output(output, now);

        // 7. Combat
        let abilities = &self.abilities;
        self.combat.update(
            &mut self.world,
            &self.config,
            &|operator| abilities.unstoppable(operator, now),
            now,
        );

        self.tick += 1;

        // Challenges must see this tick's captures and losses before a win is credited
        for event in &self.pending {
            self.profile.observe(event, now);
        }
        let observed = self.pending.len();

        // 8. Termination
        self.check_termination(now);

        self.world.sync_operator_caches();
        #[cfg(feature = "debug-validation")]
        {
            let violations = self.world.invariant_violations();
            assert!(violations.is_empty(), "tick {}: {violations:?}", self.tick);
        }
        let events = TickEvents {
            events: std::mem::take(&mut self.pending),
        };
        for event in &events.events[observed..] {
            self.profile.observe(event, now);
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Game state hash");
        }

        events
    }

    fn tick_bots(&mut self, now: Millis) {
        for index in 0..self.bots.len() {
            let operator = self.bots[index].operator;
            let orders = self.bots[index].decide(&self.world, now, &mut self.rng);
            for order in orders {
                match order {
                    BotOrder::Target { from, to } => {
                        if let Some(planet) = self.world.planet_mut(from) {
                            if planet.is_owned_by(operator) {
                                planet.add_target(to);
                            }
                        }
                    }
                    BotOrder::Ability(ability) => {
                        self.activate_ability(ability, Some(operator));
                    }
                }
            }
        }
    }

    fn check_termination(&mut self, now: Millis) {
        let player_planets = self.world.planets_owned_by(OperatorId::PLAYER).len();
        let bot_planets = self
            .world
            .planets()
            .filter(|p| p.owner().is_some_and(|o| !o.is_player()))
            .count();

        if player_planets >= 1 && bot_planets == 0 {
            self.status = GameStatus::Won;
            let uncaptured = self.world.neutral_planet_count();
            let coins = self
                .profile
                .credit_victory(self.difficulty, now, uncaptured, now);
            tracing::info!(tick = self.tick, elapsed_ms = now, coins, "Game won");
            self.emit(GameEvent::GameWon {
                elapsed_ms: now,
                difficulty: self.difficulty,
            });
        } else if player_planets == 0 && self.world.ship_count_of(OperatorId::PLAYER) == 0 {
            self.status = GameStatus::Lost;
            tracing::info!(tick = self.tick, elapsed_ms = now, "Game lost");
            self.emit(GameEvent::GameLost { elapsed_ms: now });
        }
    }

    fn emit(&mut self, event: GameEvent) {
        self.pending.push(event);
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Apply a command on behalf of `operator`.
    ///
    /// Rejections are errors for the caller to report; the session is
    /// unaffected by them.
    pub fn apply_command(&mut self, operator: OperatorId, command: PlayerCommand) -> Result<()> {
        match command {
            PlayerCommand::ToggleTarget { from, to } => self.toggle_target(operator, from, to),
            PlayerCommand::ActivateAbility { ability } => {
                if operator.is_player() {
                    if !self.profile.player().is_ability_unlocked(ability) {
                        return Err(GameError::AbilityLocked(ability));
                    }
                    let remaining = self.cooldown_remaining(ability);
                    if remaining > 0 {
                        return Err(GameError::AbilityOnCooldown {
                            ability,
                            remaining_ms: remaining,
                        });
                    }
                    if !self.activate_ability(ability, None) {
                        return Err(GameError::InvalidState(format!(
                            "{ability} cannot be used right now"
                        )));
                    }
                } else {
                    if self.world.operator(operator).is_none() {
                        return Err(GameError::OperatorNotFound(operator));
                    }
                    self.activate_ability(ability, Some(operator));
                }
                Ok(())
            }
            PlayerCommand::Pause => {
                if self.clock.pause() {
                    tracing::info!(tick = self.tick, "Game paused");
                }
                Ok(())
            }
            PlayerCommand::Resume => {
                if self.clock.resume() {
                    tracing::info!(tick = self.tick, "Game resumed");
                }
                Ok(())
            }
            PlayerCommand::SetSlowMode { enabled } => {
                self.slow_mode = enabled;
                Ok(())
            }
        }
    }

    /// Route toggle: remove an existing route, reverse a friendly one
    /// pointing back, or add a new one if there is room.
    fn toggle_target(&mut self, operator: OperatorId, from: PlanetId, to: PlanetId) -> Result<()> {
        let source = self.world.planet(from).ok_or(GameError::PlanetNotFound(from))?;
        let target = self.world.planet(to).ok_or(GameError::PlanetNotFound(to))?;
        if !source.is_owned_by(operator) {
            return Err(GameError::NotOwner {
                planet: from,
                operator,
            });
        }
        let already = source.has_target(to);
        let reverse = target.is_owned_by(operator) && target.has_target(from);

        if already {
            if let Some(p) = self.world.planet_mut(from) {
                p.remove_target(to);
            }
            return Ok(());
        }
        if reverse {
            if let Some(p) = self.world.planet_mut(to) {
                p.remove_target(from);
            }
        }
        let added = self.world.planet_mut(from).is_some_and(|p| p.add_target(to));
        if !added {
            tracing::debug!(%operator, planet = %from, target = %to, "Target not added");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Session config.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The only config values that may change mid-session.
    pub fn debug_flags_mut(&mut self) -> &mut DebugFlags {
        &mut self.config.debug
    }

    /// Difficulty.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Seed the session was started with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// All entities.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Ability cooldowns and effects.
    #[must_use]
    pub const fn abilities(&self) -> &AbilityManager {
        &self.abilities
    }

    /// Combat bookkeeping.
    #[must_use]
    pub const fn combat(&self) -> &CombatManager {
        &self.combat
    }

    /// Bot opponents.
    #[must_use]
    pub fn bots(&self) -> &[Bot] {
        &self.bots
    }

    /// Bot playing `operator`.
    #[must_use]
    pub fn bot(&self, operator: OperatorId) -> Option<&Bot> {
        self.bots.iter().find(|b| b.operator == operator)
    }

    /// The player's progression and challenges.
    #[must_use]
    pub const fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Mutable profile, for shop actions between games and notifications.
    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    /// Hand the profile back, e.g. to start the next session with it.
    #[must_use]
    pub fn into_profile(self) -> Profile {
        self.profile
    }

    /// Ticks simulated so far. Paused ticks do not count.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Game time, pauses excluded.
    #[must_use]
    pub fn game_time(&self) -> Millis {
        self.clock.game_time()
    }

    /// Session status.
    #[must_use]
    pub const fn status(&self) -> GameStatus {
        self.status
    }

    /// Whether the player won.
    #[must_use]
    pub fn is_game_won(&self) -> bool {
        self.status == GameStatus::Won
    }

    /// Whether the session ended either way.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.status != GameStatus::Running
    }

    /// Whether the session is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Whether the reduced tick rate is selected.
    #[must_use]
    pub const fn is_slow_mode(&self) -> bool {
        self.slow_mode
    }

    /// Milliseconds between ticks at the current rate.
    #[must_use]
    pub fn tick_interval_ms(&self) -> f64 {
        self.config.tick_interval_ms(self.slow_mode)
    }

    /// Milliseconds until the player may use `ability` again.
    #[must_use]
    pub fn cooldown_remaining(&self, ability: AbilityType) -> Millis {
        self.abilities
            .cooldown_remaining(ability, self.clock.game_time())
    }

    /// Abilities `operator` has running right now.
    #[must_use]
    pub fn active_abilities(&self, operator: OperatorId) -> Vec<AbilityType> {
        self.abilities
            .active_abilities(operator, self.clock.game_time())
    }

    /// Multiplier an upgrade gives `operator`: the player's purchased
    /// level, or a bot's grant.
    #[must_use]
    pub fn upgrade_multiplier(&self, operator: OperatorId, upgrade: UpgradeType) -> f64 {
        if operator.is_player() {
            self.profile.player().upgrade_multiplier(upgrade)
        } else {
            self.bot(operator)
                .map_or(1.0, |b| b.upgrade_multiplier(upgrade))
        }
    }

    /// Percentage value of a player-only upgrade; bots have none.
    fn upgrade_percent(&self, operator: OperatorId, upgrade: UpgradeType) -> f64 {
        if operator.is_player() {
            self.profile.player().upgrade_value(upgrade)
        } else {
            0.0
        }
    }

    /// Max health of a planet owned by `owner`.
    fn effective_max_health(&self, owner: Option<OperatorId>) -> f64 {
        let multiplier = owner.map_or(1.0, |o| self.upgrade_multiplier(o, UpgradeType::PlanetHealth));
        (self.config.max_planet_health * multiplier).floor()
    }

    /// Hash of everything that affects future ticks.
    ///
    /// Two sessions with the same seed and command stream hash equal.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.clock.game_time().hash(&mut hasher);
        self.status.hash(&mut hasher);

        for planet in self.world.planets() {
            planet.id.hash(&mut hasher);
            planet.owner().hash(&mut hasher);
            planet.health().to_bits().hash(&mut hasher);
            planet.max_health().to_bits().hash(&mut hasher);
            planet.position.to_bits().hash(&mut hasher);
            planet.targets().hash(&mut hasher);
            planet.stationed().len().hash(&mut hasher);
            planet.last_spawn.hash(&mut hasher);
        }

        self.world.ship_count().hash(&mut hasher);
        for ship in self.world.ships() {
            ship.id.hash(&mut hasher);
            ship.owner.hash(&mut hasher);
            ship.position.to_bits().hash(&mut hasher);
            ship.health.to_bits().hash(&mut hasher);
            ship.stationary.hash(&mut hasher);
            match ship.destination {
                Some(Destination::Planet(id)) => id.hash(&mut hasher),
                Some(Destination::Point(p)) => p.to_bits().hash(&mut hasher),
                None => 0u8.hash(&mut hasher),
            }
        }

        for projectile in self.world.projectiles() {
            projectile.id.hash(&mut hasher);
            projectile.position.to_bits().hash(&mut hasher);
        }

        for hole in self.abilities.black_holes() {
            hole.owner.hash(&mut hasher);
            hole.position.to_bits().hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Snapshot of the session.
    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            tick: self.tick,
            game_time: self.clock.game_time(),
            difficulty: self.difficulty,
            seed: self.seed,
            status: self.status,
            world: self.world.clone(),
        }
    }

    /// Serialize a snapshot of the session.
    pub fn serialize_state(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.snapshot())
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize game state: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::PlanetSeed;
    use crate::math::Vec2;
    use crate::planet::{Orbit, PlanetType};

    fn seed(x: f64, owner: Option<OperatorId>) -> PlanetSeed {
        PlanetSeed {
            orbit: Orbit::stationary(Vec2::new(x, 400.0)),
            planet_type: PlanetType::Normal,
            owner,
            health_fraction: 1.0,
        }
    }

    fn duel_layout() -> WorldLayout {
        WorldLayout {
            width: 1200.0,
            height: 850.0,
            bot_count: 1,
            planets: vec![
                seed(200.0, Some(OperatorId::PLAYER)),
                seed(1000.0, Some(OperatorId(1))),
                seed(600.0, None),
            ],
        }
    }

    fn game(layout: WorldLayout) -> Game {
        let config = GameConfig::default();
        let profile = Profile::ephemeral(&config);
        Game::from_layout(config, Difficulty::Easy, layout, 7, profile).unwrap()
    }

    #[test]
    fn test_new_game_generates_world() {
        let config = GameConfig::default();
        let profile = Profile::ephemeral(&config);
        let game = Game::new(config, Difficulty::Medium, 1, profile).unwrap();
        assert_eq!(game.world().planet_count(), 10);
        assert_eq!(game.bots().len(), 2);
        assert_eq!(game.status(), GameStatus::Running);
        assert!(game.world().operator_caches_consistent());
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let mut layout = duel_layout();
        layout.planets.truncate(1);
        let config = GameConfig::default();
        let profile = Profile::ephemeral(&config);
        let err = Game::from_layout(config, Difficulty::Easy, layout, 0, profile).unwrap_err();
        assert!(matches!(err, GameError::InvalidWorld(_)));
    }

    #[test]
    fn test_tick_increments() {
        let mut game = game(duel_layout());
        game.tick(0);
        game.tick(16);
        assert_eq!(game.tick_count(), 2);
        assert_eq!(game.game_time(), 16);
    }

    #[test]
    fn test_game_time_starts_at_first_tick() {
        let mut game = game(duel_layout());
        game.tick(5000);
        assert_eq!(game.game_time(), 0);
        game.tick(5100);
        assert_eq!(game.game_time(), 100);
    }

    #[test]
    fn test_pause_freezes_time_and_ticks() {
        let mut game = game(duel_layout());
        game.tick(0);
        game.tick(1000);
        game.apply_command(OperatorId::PLAYER, PlayerCommand::Pause).unwrap();
        assert!(game.is_paused());
        let hash = game.state_hash();
        for t in 1..=10 {
            assert!(game.tick(1000 + t * 500).is_empty());
        }
        assert_eq!(game.tick_count(), 2);
        assert_eq!(game.state_hash(), hash);
        game.apply_command(OperatorId::PLAYER, PlayerCommand::Resume).unwrap();
        game.tick(6100);
        assert_eq!(game.game_time(), 1100);
    }

    #[test]
    fn test_losing_last_planet_ends_game() {
        let mut game = game(duel_layout());
        game.tick(0);
        game.world
            .planet_mut(PlanetId(0))
            .unwrap()
            .set_owner(Some(OperatorId(1)));
        let events = game.tick(16);
        assert_eq!(game.status(), GameStatus::Lost);
        assert!(events.game_over());
        assert!(events.events.contains(&GameEvent::GameLost { elapsed_ms: 16 }));
        assert_eq!(game.profile().player().coins(), 0);

        // Nothing runs after the end.
        assert!(game.tick(32).is_empty());
        assert_eq!(game.tick_count(), 2);
    }

    #[test]
    fn test_planet_lost_on_winning_tick_spoils_perfect_game() {
        let layout = WorldLayout {
            planets: vec![
                seed(200.0, Some(OperatorId::PLAYER)),
                seed(400.0, Some(OperatorId::PLAYER)),
                seed(1000.0, Some(OperatorId(1))),
            ],
            ..duel_layout()
        };
        let mut game = game(layout);
        game.tick(0);

        // Planet 1 falls and is retaken while the last bot planet is captured.
        let bot = OperatorId(1);
        let captured = |planet, by, previous| GameEvent::PlanetCaptured {
            planet: PlanetId(planet),
            by,
            previous: Some(previous),
            planet_type: PlanetType::Normal,
        };
        game.emit(captured(1, bot, OperatorId::PLAYER));
        game.emit(captured(1, OperatorId::PLAYER, bot));
        game.emit(captured(2, OperatorId::PLAYER, bot));
        game.world
            .planet_mut(PlanetId(2))
            .unwrap()
            .set_owner(Some(OperatorId::PLAYER));

        let events = game.tick(16);
        assert_eq!(game.status(), GameStatus::Won);
        assert!(events.game_over());
        let challenges = game.profile().challenges();
        assert_eq!(challenges.counters().perfect_games.get(&Difficulty::Easy), None);
        assert_eq!(challenges.counters().planets_captured, 2);
    }

    #[test]
    fn test_clean_win_counts_as_perfect() {
        let mut game = game(duel_layout());
        game.tick(0);
        game.world
            .planet_mut(PlanetId(1))
            .unwrap()
            .set_owner(Some(OperatorId::PLAYER));
        game.tick(16);
        assert_eq!(game.status(), GameStatus::Won);
        assert_eq!(
            game.profile().challenges().counters().perfect_games.get(&Difficulty::Easy),
            Some(&1)
        );
    }

    #[test]
    fn test_toggle_target_add_remove() {
        let mut game = game(duel_layout());
        let toggle = PlayerCommand::ToggleTarget {
            from: PlanetId(0),
            to: PlanetId(1),
        };
        game.apply_command(OperatorId::PLAYER, toggle).unwrap();
        assert!(game.world().planet(PlanetId(0)).unwrap().has_target(PlanetId(1)));
        game.apply_command(OperatorId::PLAYER, toggle).unwrap();
        assert!(game.world().planet(PlanetId(0)).unwrap().targets().is_empty());
    }

    #[test]
    fn test_toggle_target_rejects_foreign_planet() {
        let mut game = game(duel_layout());
        let err = game
            .apply_command(
                OperatorId::PLAYER,
                PlayerCommand::ToggleTarget {
                    from: PlanetId(1),
                    to: PlanetId(0),
                },
            )
            .unwrap_err();
        assert!(matches!(err, GameError::NotOwner { .. }));
        let err = game
            .apply_command(
                OperatorId::PLAYER,
                PlayerCommand::ToggleTarget {
                    from: PlanetId(0),
                    to: PlanetId(9),
                },
            )
            .unwrap_err();
        assert!(matches!(err, GameError::PlanetNotFound(PlanetId(9))));
    }

    #[test]
    fn test_toggle_reverses_friendly_route() {
        let mut game = game(duel_layout());
        game.world.planet_mut(PlanetId(2)).unwrap().set_owner(Some(OperatorId::PLAYER));
        let there = PlayerCommand::ToggleTarget {
            from: PlanetId(0),
            to: PlanetId(2),
        };
        let back = PlayerCommand::ToggleTarget {
            from: PlanetId(2),
            to: PlanetId(0),
        };
        game.apply_command(OperatorId::PLAYER, there).unwrap();
        game.apply_command(OperatorId::PLAYER, back).unwrap();
        assert!(!game.world().planet(PlanetId(0)).unwrap().has_target(PlanetId(2)));
        assert!(game.world().planet(PlanetId(2)).unwrap().has_target(PlanetId(0)));
    }

    #[test]
    fn test_locked_ability_rejected() {
        let mut game = game(duel_layout());
        let err = game
            .apply_command(
                OperatorId::PLAYER,
                PlayerCommand::ActivateAbility {
                    ability: AbilityType::Shield,
                },
            )
            .unwrap_err();
        assert!(matches!(err, GameError::AbilityLocked(AbilityType::Shield)));
    }

    #[test]
    fn test_cooldown_blocks_second_use() {
        let mut game = game(duel_layout());
        game.profile_mut()
            .player_mut()
            .set_ability_level(AbilityType::Shield, 1);
        game.tick(0);
        let shield = PlayerCommand::ActivateAbility {
            ability: AbilityType::Shield,
        };
        game.apply_command(OperatorId::PLAYER, shield).unwrap();
        let err = game.apply_command(OperatorId::PLAYER, shield).unwrap_err();
        assert!(matches!(
            err,
            GameError::AbilityOnCooldown {
                remaining_ms: 54_000,
                ..
            }
        ));
    }

    #[test]
    fn test_ability_use_reaches_profile() {
        let mut game = game(duel_layout());
        game.profile_mut()
            .player_mut()
            .set_ability_level(AbilityType::Freeze, 1);
        game.tick(0);
        assert!(game.activate_ability(AbilityType::Freeze, None));
        let events = game.tick(16);
        assert!(events.events.contains(&GameEvent::AbilityUsed {
            operator: OperatorId::PLAYER,
            ability: AbilityType::Freeze,
        }));
        assert_eq!(game.profile().challenges().counters().abilities_used, 1);
    }

    #[test]
    fn test_serialize_state_roundtrip() {
        let mut game = game(duel_layout());
        game.tick(0);
        let bytes = game.serialize_state().unwrap();
        let snapshot = GameSnapshot::from_bytes(&bytes).unwrap();
        assert_eq!(snapshot.tick, 1);
        assert_eq!(snapshot.world.planet_count(), 3);
    }

    #[test]
    fn test_deterministic_hash() {
        let run = || {
            let config = GameConfig::default();
            let profile = Profile::ephemeral(&config);
            let mut game = Game::new(config, Difficulty::Hard, 99, profile).unwrap();
            for t in 0..300 {
                game.tick(t * 16);
            }
            game.state_hash()
        };
        assert_eq!(run(), run());
    }
}
