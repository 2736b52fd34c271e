//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a session produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and desync detection only work if the simulation is fully
//! deterministic. Sources of non-determinism include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The world keeps entities in `BTreeMap`s and `Vec`s keyed by id.
//!
//! - **System randomness**: every draw goes through the session's seeded
//!   `ChaCha8Rng`.
//!
//! - **Wall-clock time**: the core never reads the clock itself; tests and
//!   replays feed it from a `ManualClock`.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual system determinism (production, combat, etc.)
//! 2. **Property tests**: random seeds and command streams must still reproduce
//! 3. **Integration tests**: full sessions are reproducible
//! 4. **Parallel tests**: running N sessions on different threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use orbit_core::game::{Game, GameSnapshot};

use crate::fixtures::GameRunner;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic session).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the session was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one tick
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```ignore
/// use orbit_test_utils::determinism::verify_determinism;
/// use orbit_test_utils::fixtures::{duel_layout, fixture_game, GameRunner};
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     600, // 600 ticks each
///     || GameRunner::new(fixture_game(duel_layout(), 7)),
///     |runner| { runner.step(); },
///     |runner| runner.game().state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a session built by `setup_fn` twice and compare final hashes.
pub fn verify_game_determinism<F>(setup_fn: F, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Game,
{
    verify_determinism(
        2,
        num_ticks,
        || GameRunner::new(setup_fn()),
        |runner| {
            runner.step();
        },
        |runner| runner.game().state_hash(),
    )
}

/// Run N sessions on scoped threads and collect their final hashes.
///
/// This is useful for catching non-determinism that only manifests under
/// thread scheduling variations, memory layout differences, etc.
pub fn run_parallel_games_scoped<F>(setup_fn: F, num_games: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Game + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_games)
            .map(|_| {
                s.spawn(|| {
                    let mut runner = GameRunner::new(setup_fn());
                    runner.run(num_ticks);
                    runner.game().state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match throughout, `Some(tick)` if they diverge at
/// that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Game,
{
    let mut a = GameRunner::new(setup_fn());
    let mut b = GameRunner::new(setup_fn());

    if a.game().state_hash() != b.game().state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.step();
        b.step();

        if a.game().state_hash() != b.game().state_hash() {
            tracing::debug!(tick, "Runs diverged");
            return Some(tick);
        }
    }

    None
}

/// Verify that a snapshot survives a serialization round-trip unchanged.
pub fn verify_snapshot_roundtrip(game: &Game) -> bool {
    let Ok(bytes) = game.serialize_state() else {
        return false;
    };
    let Ok(restored) = GameSnapshot::from_bytes(&bytes) else {
        return false;
    };
    let original = game.snapshot();
    restored.tick == original.tick
        && restored.status == original.status
        && restored.world.planet_count() == original.world.planet_count()
        && restored.world.ship_count() == original.world.ship_count()
        && restored
            .world
            .planets()
            .zip(original.world.planets())
            .all(|(a, b)| a.owner() == b.owner() && a.health().to_bits() == b.health().to_bits())
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
pub mod strategies {
    use orbit_core::abilities::AbilityType;
    use orbit_core::difficulty::Difficulty;
    use orbit_core::game::PlayerCommand;
    use orbit_core::ids::PlanetId;
    use proptest::prelude::*;

    /// Any difficulty.
    pub fn arb_difficulty() -> impl Strategy<Value = Difficulty> {
        prop::sample::select(Difficulty::ALL.to_vec())
    }

    /// Any ability.
    pub fn arb_ability() -> impl Strategy<Value = AbilityType> {
        prop::sample::select(AbilityType::ALL.to_vec())
    }

    /// A planet id among the first `count`.
    pub fn arb_planet(count: u32) -> impl Strategy<Value = PlanetId> {
        (0..count).prop_map(PlanetId)
    }

    /// A player command over a world of `planets` planets.
    pub fn arb_command(planets: u32) -> impl Strategy<Value = PlayerCommand> {
        prop_oneof![
            4 => (arb_planet(planets), arb_planet(planets))
                .prop_map(|(from, to)| PlayerCommand::ToggleTarget { from, to }),
            2 => arb_ability().prop_map(|ability| PlayerCommand::ActivateAbility { ability }),
            1 => Just(PlayerCommand::Pause),
            1 => Just(PlayerCommand::Resume),
            1 => any::<bool>().prop_map(|enabled| PlayerCommand::SetSlowMode { enabled }),
        ]
    }

    /// A command stream: (step, command) pairs sorted by step.
    pub fn arb_command_stream(
        planets: u32,
        max_step: u64,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<(u64, PlayerCommand)>> {
        prop::collection::vec((0..max_step, arb_command(planets)), 0..max_len).prop_map(
            |mut stream| {
                stream.sort_by_key(|(step, _)| *step);
                stream
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{duel_layout, fixture_game, generated_game, skirmish_layout};
    use orbit_core::difficulty::Difficulty;

    #[test]
    fn test_verify_determinism_detects_match() {
        let result = verify_determinism(3, 10, || 0u64, |s| *s += 1, |s| *s);
        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![10, 10, 10]);
    }

    #[test]
    fn test_verify_determinism_detects_mismatch() {
        let counter = std::cell::Cell::new(0u64);
        let result = verify_determinism(
            3,
            1,
            || {
                counter.set(counter.get() + 1);
                counter.get()
            },
            |_| {},
            |s| *s,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 3);
    }

    #[test]
    fn test_duel_is_deterministic() {
        verify_game_determinism(|| fixture_game(duel_layout(), 7), 600).assert_deterministic();
    }

    #[test]
    fn test_parallel_generated_games_match() {
        run_parallel_games_scoped(|| generated_game(Difficulty::Hard, 11), 4, 300)
            .assert_deterministic();
    }

    #[test]
    fn test_no_divergence() {
        assert_eq!(find_first_divergence(|| fixture_game(skirmish_layout(), 3), 200), None);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut runner = GameRunner::new(fixture_game(duel_layout(), 2));
        runner.run(120);
        assert!(verify_snapshot_roundtrip(runner.game()));
    }
}
